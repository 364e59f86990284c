//! Endpoint descriptors.
//!
//! A [`Descriptor`] is plain data describing one call: where it goes, which
//! method it uses, how its body is produced and which headers it carries.
//! Service groups model their calls as closed enums implementing
//! [`Endpoint`], which resolves a variant against a base address.

use bridge_traits::http::HttpMethod;
use bytes::Bytes;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Object-safe view of a serializable payload.
trait ErasedPayload: fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T> ErasedPayload for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Type-erased JSON payload, serialized only when a request is built.
#[derive(Clone)]
pub struct JsonPayload(Arc<dyn ErasedPayload>);

impl JsonPayload {
    pub fn new<T>(payload: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(payload))
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        self.0.to_json()
    }
}

impl fmt::Debug for JsonPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonPayload").field(&self.0).finish()
    }
}

/// One section of a `multipart/form-data` body.
#[derive(Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub data: Bytes,
}

impl MultipartPart {
    /// Plain form field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            mime_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// File field with a filename and content type.
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            mime_type: Some(mime_type.into()),
            data: data.into(),
        }
    }
}

impl fmt::Debug for MultipartPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartPart")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// How the request body is produced.
#[derive(Debug, Clone, Default)]
pub enum BodySpec {
    #[default]
    None,
    /// JSON envelope around `payload` (`null` when absent).
    Json(Option<JsonPayload>),
    /// JSON envelope plus query parameters appended to the URL.
    Parameters {
        body: Option<JsonPayload>,
        query: BTreeMap<String, String>,
    },
    Multipart(Vec<MultipartPart>),
}

/// Immutable description of one endpoint call.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub base_url: Url,
    pub path: String,
    pub method: HttpMethod,
    pub body: BodySpec,
    /// Per-call headers; override `default_headers`.
    pub headers: HashMap<String, String>,
    pub default_headers: HashMap<String, String>,
}

impl Descriptor {
    pub fn new(base_url: Url, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            base_url,
            path: path.into(),
            method,
            body: BodySpec::None,
            headers: HashMap::new(),
            default_headers: HashMap::new(),
        }
    }

    pub fn get(base_url: Url, path: impl Into<String>) -> Self {
        Self::new(base_url, path, HttpMethod::Get)
    }

    pub fn post(base_url: Url, path: impl Into<String>) -> Self {
        Self::new(base_url, path, HttpMethod::Post)
    }

    pub fn json<T>(mut self, payload: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        self.body = BodySpec::Json(Some(JsonPayload::new(payload)));
        self
    }

    pub fn body(mut self, body: BodySpec) -> Self {
        self.body = body;
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = BodySpec::Multipart(parts);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Shorthand for the `Accept: application/json` default header every
    /// service endpoint carries.
    pub fn accept_json(self) -> Self {
        self.default_header("Accept", "application/json")
    }
}

/// A closed set of calls belonging to one service group.
pub trait Endpoint: Send + Sync {
    fn descriptor(&self, base: &Url) -> Descriptor;
}

impl Endpoint for Descriptor {
    // Already resolved; the base address it carries wins.
    fn descriptor(&self, _base: &Url) -> Descriptor {
        self.clone()
    }
}
