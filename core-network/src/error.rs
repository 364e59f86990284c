use bridge_traits::error::BridgeError;
use std::io;
use thiserror::Error;

use crate::envelope::ApiErrorBody;

/// Local failure while turning a descriptor into a request. Never retried.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Failed to encode JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("No data received from server.")]
    NoData,

    #[error("Server returned error: {0}.")]
    RequestFailed(u16),

    #[error("{}", server_message(.status, .body))]
    Server { status: u16, body: ApiErrorBody },

    #[error("{0}")]
    Transport(#[from] BridgeError),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("File system error: {0}")]
    FileSystem(#[from] io::Error),
}

fn server_message(status: &u16, body: &ApiErrorBody) -> String {
    match &body.message {
        Some(message) => message.clone(),
        None => format!("Server error ({}).", status),
    }
}

impl NetworkError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::RequestFailed(status) | NetworkError::Server { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Transport failures and 5xx responses may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Transport(_) => true,
            _ => self.status().is_some_and(|s| (500..600).contains(&s)),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
