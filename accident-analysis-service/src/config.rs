use crate::error::AnalysisError;

pub const DEFAULT_PORT: u16 = 3000;

/// Service configuration, read once at startup.
///
/// Both provider credentials are required up front so a misconfigured
/// deployment fails before any case is accepted, not on the first call.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub openrouter_api_key: String,
    pub unstructured_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AnalysisError> {
        let openrouter_api_key = require_env("OPENROUTER_API_KEY")?;
        let unstructured_api_key = require_env("UNSTRUCTURED_API_KEY")?;

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            port,
            openrouter_api_key,
            unstructured_api_key,
        })
    }
}

fn require_env(name: &str) -> Result<String, AnalysisError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AnalysisError::Configuration(format!(
            "{} environment variable is required",
            name
        ))),
    }
}
