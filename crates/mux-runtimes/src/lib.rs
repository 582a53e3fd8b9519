pub mod adapter;
pub mod error;
pub mod models;
pub mod probe;
pub mod runner;
pub mod sanitize;
pub mod types;

pub use adapter::*;
pub use error::*;
pub use models::*;
pub use probe::*;
pub use runner::*;
pub use sanitize::*;
pub use types::*;
