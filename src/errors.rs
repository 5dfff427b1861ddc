use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("SETTINGS_INVALID: {0}")]
    Settings(String),
    #[error("FORMAT_INVALID: {0}")]
    Format(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("CREATE_FAILED: {0}")]
    Create(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for NavError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for NavError {
    fn from(value: serde_json::Error) -> Self {
        Self::Settings(value.to_string())
    }
}

impl From<serde_yaml::Error> for NavError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Settings(value.to_string())
    }
}

impl From<regex::Error> for NavError {
    fn from(value: regex::Error) -> Self {
        Self::Format(value.to_string())
    }
}

impl From<anyhow::Error> for NavError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type NavResult<T> = Result<T, NavError>;
