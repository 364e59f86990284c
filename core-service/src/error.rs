use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error(transparent)]
    Network(#[from] core_network::NetworkError),
}

impl CoreError {
    /// HTTP status behind this error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            CoreError::Network(e) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
