//! Response envelope handling.
//!
//! Successful responses usually arrive wrapped as
//! `{"status": "...", "message": "...", "data": <T>}`. Some endpoints return
//! the payload bare, so decoding falls back to reading `T` directly.

use bridge_traits::http::HttpResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{NetworkError, Result};

/// Common REST wrapper around a response payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

/// Structured error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<HashMap<String, String>>,
}

impl ApiErrorBody {
    /// Parse `bytes` as an error body. Only a JSON object carrying at least
    /// one of the known fields counts.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let body: ApiErrorBody = serde_json::from_slice(bytes).ok()?;
        let structured = body.code.is_some() || body.message.is_some() || body.errors.is_some();
        structured.then_some(body)
    }
}

/// Decode a successful response body.
///
/// The envelope's `data` wins when present and decodable as `T`; otherwise the
/// whole body is decoded as `T`.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.is_empty() {
        return Err(NetworkError::NoData);
    }

    if let Ok(Envelope { data: Some(data), .. }) = serde_json::from_slice::<Envelope<T>>(bytes) {
        return Ok(data);
    }

    serde_json::from_slice::<T>(bytes).map_err(|e| NetworkError::Decode(e.to_string()))
}

/// Map a non-2xx response to the matching error.
pub fn error_for_status(status: u16, body: &[u8]) -> NetworkError {
    match ApiErrorBody::parse(body) {
        Some(body) => NetworkError::Server { status, body },
        None => NetworkError::RequestFailed(status),
    }
}

/// Turn a response into `Ok(response)` for 2xx, or the matching error.
pub fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(error_for_status(response.status, &response.body))
    }
}
