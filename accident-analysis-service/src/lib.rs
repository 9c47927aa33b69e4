pub mod adapters;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod service;

pub use config::AppConfig;
pub use error::AnalysisError;
pub use models::*;
pub use orchestrator::AnalysisOrchestrator;
pub use registry::CaseRegistry;
pub use service::{AppState, create_app};
