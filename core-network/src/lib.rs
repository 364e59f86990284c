//! # Networking Core
//!
//! Request construction, single-shot JSON transport and streaming transfers.
//!
//! ## Overview
//!
//! - [`Descriptor`] / [`Endpoint`]: static description of one endpoint call
//! - [`RequestBuilder`]: descriptor + token into a concrete request, with the
//!   JSON envelope and multipart encoders
//! - [`ApiClient`]: executes a request exactly once and unwraps the response
//!   envelope
//! - [`TransferEngine`]: streamed uploads and downloads with progress,
//!   retry and cancellation
//!
//! Retry lives only in the transfer engine. The API client surfaces every
//! failure, `401` included, to its caller.

pub mod builder;
pub mod client;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod transfer;

pub use builder::{encode_multipart, join_path, RequestBuilder};
pub use client::ApiClient;
pub use descriptor::{BodySpec, Descriptor, Endpoint, JsonPayload, MultipartPart};
pub use envelope::{decode_payload, ApiErrorBody, Envelope};
pub use error::{EncodingError, NetworkError, Result};
pub use transfer::{
    DownloadProgress, TransferEngine, TransferHandle, TransferStream, UploadProgress,
    UPLOAD_CHUNK_SIZE,
};

pub use bridge_traits::http::RetryPolicy;
