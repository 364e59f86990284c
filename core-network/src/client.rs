//! # Transport Client
//!
//! [`ApiClient`] executes one request per call and turns the response into a
//! typed value or a [`NetworkError`]. It never retries: a failed call is
//! reported to the caller as-is, including `401`.

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_auth::TokenStore;
use core_runtime::logging::Redactor;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::builder::RequestBuilder;
use crate::descriptor::{Descriptor, Endpoint};
use crate::envelope::{check_status, decode_payload};
use crate::error::Result;

/// Single-shot HTTP client for JSON endpoints.
#[derive(Clone)]
pub struct ApiClient {
    http: Arc<dyn HttpClient>,
    builder: RequestBuilder,
    token_store: Arc<dyn TokenStore>,
    base_url: Url,
    redactor: Redactor,
}

impl ApiClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        builder: RequestBuilder,
        token_store: Arc<dyn TokenStore>,
        base_url: Url,
    ) -> Self {
        Self {
            http,
            builder,
            token_store,
            base_url,
            redactor: Redactor::default(),
        }
    }

    /// Redaction for request details in debug logs. PII is redacted by default.
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Address that [`Endpoint`]s are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the request for `descriptor` with the current access token.
    pub async fn build_request(&self, descriptor: &Descriptor) -> Result<HttpRequest> {
        let token = self.token_store.access_token().await;
        Ok(self.builder.build(descriptor, token.as_deref())?)
    }

    /// Execute `descriptor` once and decode the payload as `T`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::Encoding`](crate::NetworkError::Encoding) if the request cannot be built
    /// - [`NetworkError::Transport`](crate::NetworkError::Transport) if the exchange itself fails
    /// - [`NetworkError::Server`](crate::NetworkError::Server) or
    ///   [`NetworkError::RequestFailed`](crate::NetworkError::RequestFailed) for non-2xx statuses
    /// - [`NetworkError::Decode`](crate::NetworkError::Decode) if neither the envelope nor the
    ///   bare body decodes as `T`
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, path = %descriptor.path))]
    pub async fn send<T: DeserializeOwned>(&self, descriptor: &Descriptor) -> Result<T> {
        let response = self.execute(descriptor).await?;
        decode_payload(&response.body).inspect_err(|e| {
            warn!(error = %e, "Failed to decode response body");
        })
    }

    /// Execute `descriptor` once, discarding any response body.
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, path = %descriptor.path))]
    pub async fn send_unit(&self, descriptor: &Descriptor) -> Result<()> {
        self.execute(descriptor).await.map(|_| ())
    }

    /// Resolve `endpoint` against the base address and [`send`](Self::send) it.
    pub async fn call<T, E>(&self, endpoint: &E) -> Result<T>
    where
        T: DeserializeOwned,
        E: Endpoint + ?Sized,
    {
        self.send(&endpoint.descriptor(&self.base_url)).await
    }

    /// Resolve `endpoint` against the base address and [`send_unit`](Self::send_unit) it.
    pub async fn call_unit<E>(&self, endpoint: &E) -> Result<()>
    where
        E: Endpoint + ?Sized,
    {
        self.send_unit(&endpoint.descriptor(&self.base_url)).await
    }

    async fn execute(&self, descriptor: &Descriptor) -> Result<HttpResponse> {
        let request = self.build_request(descriptor).await?;
        debug!(
            url = %self.redactor.url(&request.url),
            headers = ?self.redactor.headers(&request.headers),
            body_bytes = request.body.as_ref().map_or(0, |b| b.len()),
            "Sending request"
        );

        let response = self.http.execute(request).await.inspect_err(|e| {
            warn!(error = %e, "Transport failure");
        })?;

        debug!(
            status = response.status,
            body_bytes = response.body.len(),
            "Received response"
        );

        check_status(response).inspect_err(|e| {
            debug!(error = %e, "Request rejected");
        })
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}
