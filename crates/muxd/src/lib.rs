pub mod delegation;
pub mod dispatcher;
pub mod paths;
pub mod session_store;
pub mod state_file;
pub mod supervisor;
pub mod tracking;

pub use delegation::detect_delegation;
pub use dispatcher::{tokenize, Dispatcher, QueryExecutor};
pub use paths::StorageLayout;
pub use session_store::SessionStore;
pub use state_file::StoreError;
pub use supervisor::Supervisor;
pub use tracking::{CancelOutcome, QueryStatus, RunningQueryStore};
