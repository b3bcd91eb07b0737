use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("module unavailable: {0}")]
    ModuleUnavailable(String),

    #[error("handler construction failed: {0}")]
    HandlerConstructionFailed(String),

    #[error("package download failed: {0}")]
    DownloadFailed(String),

    #[error("package extraction failed: {0}")]
    ExtractionFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl From<RegistryError> for conduit_core::error::ConduitError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::ModuleUnavailable(m) => conduit_core::error::ConduitError::ModuleUnavailable(m),
            RegistryError::HandlerConstructionFailed(m) => {
                conduit_core::error::ConduitError::HandlerConstructionFailed(m)
            }
            other => conduit_core::error::ConduitError::ModuleUnavailable(other.to_string()),
        }
    }
}
