//! Endpoint groups of the backend.
//!
//! Each group is a closed enum; [`Endpoint::descriptor`] resolves a variant
//! against the configured base address.

use core_network::{BodySpec, Descriptor, Endpoint, MultipartPart};
use std::collections::BTreeMap;
use url::Url;

use crate::models::{CheckInRequest, DocumentFile, OtpRequest, OtpVerification, RefreshRequest};

pub const DOCUMENT_UPLOAD_PATH: &str = "/v1/dms/upload";

#[derive(Debug, Clone)]
pub enum AuthEndpoint {
    RequestOtp(OtpRequest),
    VerifyOtp(OtpVerification),
    Logout,
}

impl Endpoint for AuthEndpoint {
    fn descriptor(&self, base: &Url) -> Descriptor {
        let descriptor = match self {
            AuthEndpoint::RequestOtp(request) => {
                Descriptor::post(base.clone(), "/auth/otp/request").json(request.clone())
            }
            AuthEndpoint::VerifyOtp(verification) => {
                Descriptor::post(base.clone(), "/auth/otp/verify").json(verification.clone())
            }
            AuthEndpoint::Logout => Descriptor::post(base.clone(), "/auth/logout"),
        };
        descriptor.accept_json()
    }
}

#[derive(Debug, Clone)]
pub enum RefreshEndpoint {
    Refresh(RefreshRequest),
}

impl Endpoint for RefreshEndpoint {
    fn descriptor(&self, base: &Url) -> Descriptor {
        let RefreshEndpoint::Refresh(request) = self;
        Descriptor::post(base.clone(), "/v1/auth/refresh")
            .accept_json()
            .json(request.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum GymsEndpoint {
    List,
}

impl Endpoint for GymsEndpoint {
    fn descriptor(&self, base: &Url) -> Descriptor {
        match self {
            GymsEndpoint::List => Descriptor::get(base.clone(), "/v1/gyms").accept_json(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SubscriptionsEndpoint {
    List,
}

impl Endpoint for SubscriptionsEndpoint {
    fn descriptor(&self, base: &Url) -> Descriptor {
        match self {
            SubscriptionsEndpoint::List => {
                Descriptor::get(base.clone(), "/v1/subscriptions").accept_json()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum CheckInEndpoint {
    CheckIn(CheckInRequest),
}

impl Endpoint for CheckInEndpoint {
    fn descriptor(&self, base: &Url) -> Descriptor {
        let CheckInEndpoint::CheckIn(request) = self;
        Descriptor::post(base.clone(), "/checkin")
            .accept_json()
            .json(request.clone())
    }
}

/// Multipart uploads to the document store.
///
/// A single file goes in a `file` part, several files in repeated `files[]`
/// parts. Metadata entries follow as plain text parts.
#[derive(Debug, Clone)]
pub enum DocumentEndpoint {
    Upload {
        file: DocumentFile,
        meta: BTreeMap<String, String>,
    },
    UploadMany {
        files: Vec<DocumentFile>,
        meta: BTreeMap<String, String>,
    },
}

impl DocumentEndpoint {
    fn parts(&self) -> Vec<MultipartPart> {
        let (files, field, meta) = match self {
            DocumentEndpoint::Upload { file, meta } => (std::slice::from_ref(file), "file", meta),
            DocumentEndpoint::UploadMany { files, meta } => (files.as_slice(), "files[]", meta),
        };

        let mut parts: Vec<MultipartPart> = files
            .iter()
            .map(|f| MultipartPart::file(field, &f.file_name, &f.mime_type, f.data.clone()))
            .collect();
        parts.extend(
            meta.iter()
                .map(|(name, value)| MultipartPart::text(name.as_str(), value.as_str())),
        );
        parts
    }
}

impl Endpoint for DocumentEndpoint {
    fn descriptor(&self, base: &Url) -> Descriptor {
        Descriptor::post(base.clone(), DOCUMENT_UPLOAD_PATH)
            .accept_json()
            .body(BodySpec::Multipart(self.parts()))
    }
}
