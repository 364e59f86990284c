//! Document uploads and file downloads

use bridge_traits::http::RetryPolicy;
use core_network::{
    ApiClient, DownloadProgress, Endpoint, TransferEngine, TransferStream, UploadProgress,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, instrument};
use url::Url;

use crate::endpoints::DocumentEndpoint;
use crate::error::Result;
use crate::models::{DocumentFile, DocumentUploadResponse};

/// Uploads to the document store, either as one request or as a streamed
/// transfer with progress.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    api: ApiClient,
    transfers: TransferEngine,
    retry: RetryPolicy,
}

impl DocumentRepository {
    pub fn new(api: ApiClient, transfers: TransferEngine, retry: RetryPolicy) -> Self {
        Self {
            api,
            transfers,
            retry,
        }
    }

    /// Upload a single file in one request.
    #[instrument(skip(self, file, meta), fields(file = %file.file_name))]
    pub async fn upload(
        &self,
        file: DocumentFile,
        meta: BTreeMap<String, String>,
    ) -> Result<DocumentUploadResponse> {
        let response: DocumentUploadResponse = self
            .api
            .call(&DocumentEndpoint::Upload { file, meta })
            .await?;
        debug!(document_id = %response.id, "Document stored");
        Ok(response)
    }

    /// Upload several files as repeated `files[]` parts in one request.
    #[instrument(skip_all, fields(count = files.len()))]
    pub async fn upload_many(
        &self,
        files: Vec<DocumentFile>,
        meta: BTreeMap<String, String>,
    ) -> Result<DocumentUploadResponse> {
        Ok(self
            .api
            .call(&DocumentEndpoint::UploadMany { files, meta })
            .await?)
    }

    /// Upload a single file through the transfer engine.
    ///
    /// The final progress event carries the raw response body, which decodes
    /// with [`core_network::decode_payload`].
    pub fn upload_with_progress(
        &self,
        file: DocumentFile,
        meta: BTreeMap<String, String>,
    ) -> TransferStream<UploadProgress> {
        let descriptor = DocumentEndpoint::Upload { file, meta }.descriptor(self.api.base_url());
        self.transfers.upload(descriptor, self.retry)
    }
}

/// Streams remote files to disk.
#[derive(Debug, Clone)]
pub struct DownloadRepository {
    transfers: TransferEngine,
    retry: RetryPolicy,
}

impl DownloadRepository {
    pub fn new(transfers: TransferEngine, retry: RetryPolicy) -> Self {
        Self { transfers, retry }
    }

    /// Download `url` to `destination`, or into the download directory when
    /// no destination is given.
    pub fn download(
        &self,
        url: Url,
        destination: Option<PathBuf>,
    ) -> TransferStream<DownloadProgress> {
        self.transfers.download(url, destination, self.retry)
    }
}
