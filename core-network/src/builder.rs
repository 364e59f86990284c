//! Request construction.
//!
//! [`RequestBuilder::build`] is a pure transform from a [`Descriptor`] and an
//! optional access token to an [`HttpRequest`]. It performs no I/O.

use bridge_traits::http::HttpRequest;
use bytes::{BufMut, Bytes, BytesMut};
use core_runtime::config::AppMetadata;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use url::Url;
use uuid::Uuid;

use crate::descriptor::{BodySpec, Descriptor, JsonPayload, MultipartPart};
use crate::error::EncodingError;

pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

const CRLF: &[u8] = b"\r\n";

#[derive(Serialize)]
struct BaseBody<'a> {
    base: &'a AppMetadata,
    payload: serde_json::Value,
}

/// Builds concrete requests from descriptors.
///
/// Owns the [`AppMetadata`] reported in the `base` block of every JSON body.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    metadata: AppMetadata,
}

impl RequestBuilder {
    pub fn new(metadata: AppMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &AppMetadata {
        &self.metadata
    }

    /// Build the request for `descriptor`.
    ///
    /// Headers are layered as default headers, then per-call headers, then
    /// `Authorization: Basic <token>` when `token` is present.
    ///
    /// # Errors
    ///
    /// - [`EncodingError::InvalidUrl`] if the base address cannot take a path
    /// - [`EncodingError::Json`] if the payload fails to serialize
    pub fn build(
        &self,
        descriptor: &Descriptor,
        token: Option<&str>,
    ) -> Result<HttpRequest, EncodingError> {
        let mut url = join_path(&descriptor.base_url, &descriptor.path)?;

        let mut headers = HashMap::new();
        for (name, value) in &descriptor.default_headers {
            set_header(&mut headers, name, value);
        }
        for (name, value) in &descriptor.headers {
            set_header(&mut headers, name, value);
        }
        if let Some(token) = token {
            set_header(&mut headers, AUTHORIZATION, &format!("Basic {}", token));
        }

        let body = match &descriptor.body {
            BodySpec::None => None,
            BodySpec::Json(payload) => {
                default_header(&mut headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
                Some(self.envelope(payload.as_ref())?)
            }
            BodySpec::Parameters { body, query } => {
                append_query(&mut url, query);
                default_header(&mut headers, CONTENT_TYPE, JSON_CONTENT_TYPE);
                Some(self.envelope(body.as_ref())?)
            }
            BodySpec::Multipart(parts) => {
                let boundary = new_boundary();
                set_header(
                    &mut headers,
                    CONTENT_TYPE,
                    &format!("multipart/form-data; boundary={}", boundary),
                );
                Some(encode_multipart(parts, &boundary))
            }
        };

        Ok(HttpRequest {
            method: descriptor.method,
            url: url.to_string(),
            headers,
            body,
            timeout: None,
        })
    }

    /// Serialize the canonical `{"base": ..., "payload": ...}` body.
    fn envelope(&self, payload: Option<&JsonPayload>) -> Result<Bytes, EncodingError> {
        let payload = match payload {
            Some(payload) => payload.to_value()?,
            None => serde_json::Value::Null,
        };
        let body = BaseBody {
            base: &self.metadata,
            payload,
        };
        Ok(Bytes::from(serde_json::to_vec(&body)?))
    }
}

/// Append `path` to `base` segment by segment.
///
/// Empty segments are dropped, so neither a trailing slash on the base nor a
/// leading slash on the path produces `//`.
pub fn join_path(base: &Url, path: &str) -> Result<Url, EncodingError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| EncodingError::InvalidUrl(base.to_string()))?;
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
    }
    Ok(url)
}

fn append_query(url: &mut Url, query: &BTreeMap<String, String>) {
    if query.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (name, value) in query {
        pairs.append_pair(name, value);
    }
}

/// Insert `name: value`, replacing any existing header with the same name
/// regardless of case.
fn set_header(headers: &mut HashMap<String, String>, name: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), value.to_string());
}

fn default_header(headers: &mut HashMap<String, String>, name: &str, value: &str) {
    if !headers.keys().any(|existing| existing.eq_ignore_ascii_case(name)) {
        headers.insert(name.to_string(), value.to_string());
    }
}

fn new_boundary() -> String {
    format!("Boundary-{}", Uuid::new_v4())
}

/// Encode `parts` as a `multipart/form-data` body delimited by `boundary`.
pub fn encode_multipart(parts: &[MultipartPart], boundary: &str) -> Bytes {
    let capacity = parts.iter().map(|p| p.data.len() + 128).sum::<usize>() + boundary.len() + 8;
    let mut body = BytesMut::with_capacity(capacity);

    for part in parts {
        body.put_slice(format!("--{}", boundary).as_bytes());
        body.put_slice(CRLF);

        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.put_slice(disposition.as_bytes());
        body.put_slice(CRLF);

        if let Some(mime_type) = &part.mime_type {
            body.put_slice(format!("Content-Type: {}", mime_type).as_bytes());
            body.put_slice(CRLF);
        }

        body.put_slice(CRLF);
        body.put_slice(&part.data);
        body.put_slice(CRLF);
    }

    body.put_slice(format!("--{}--", boundary).as_bytes());
    body.put_slice(CRLF);
    body.freeze()
}
