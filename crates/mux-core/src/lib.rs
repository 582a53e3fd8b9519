pub mod agents;
pub mod defaults;
pub mod types;
pub mod validation;

pub use agents::*;
pub use defaults::*;
pub use types::*;
pub use validation::*;
