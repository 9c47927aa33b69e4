pub mod error;
pub mod run;
pub mod store;

// Re-export commonly used types
pub use error::{FlowError, Result};
pub use run::{RunRegistry, RunToken};
pub use store::{InMemoryStateStore, StateEvent, StateStore};
