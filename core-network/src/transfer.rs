//! # Transfer Engine
//!
//! Streaming uploads and downloads that report progress as a lazy sequence.
//!
//! ## Overview
//!
//! Each transfer runs on its own background task and hands progress events to
//! the consumer through a bounded channel, so a slow consumer slows the
//! producer down instead of buffering without limit. The consumer side is a
//! [`TransferStream`], which implements [`futures::Stream`].
//!
//! - Events arrive in generation order and `fraction` never decreases.
//! - Transport failures and 5xx responses restart the whole transfer after
//!   [`RetryPolicy::delay`], up to `max_retries` times. Events replayed by a
//!   restarted attempt are withheld until they pass the fraction already
//!   reported.
//! - Cancelling (via [`TransferHandle::cancel`] or by dropping the stream)
//!   aborts the transfer. No further events are delivered and nothing is
//!   retried.
//!
//! ## Usage
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let mut progress = engine.download(url, Some(destination), RetryPolicy::default());
//! while let Some(event) = progress.next().await {
//!     let event = event?;
//!     println!("{:.0}%", event.fraction * 100.0);
//! }
//! ```

use bridge_traits::http::{ByteStream, HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bytes::Bytes;
use core_auth::TokenStore;
use core_runtime::events::{CoreEvent, EventBus, TransferEvent, TransferKind};
use core_runtime::logging::Redactor;
use futures::stream::{self, Stream, StreamExt};
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn, Instrument};
use url::Url;
use uuid::Uuid;

use crate::builder::{join_path, RequestBuilder};
use crate::descriptor::Descriptor;
use crate::envelope::error_for_status;
use crate::error::{NetworkError, Result};

/// Size of each upload chunk handed to the transport.
pub const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Progress events buffered per transfer before the producer waits.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Upload progress.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    /// Completed share in `[0, 1]`.
    pub fraction: f64,
    pub bytes_sent: u64,
    pub total_bytes_expected: u64,
    /// Response body, present on the final event only.
    pub response: Option<Bytes>,
}

/// Download progress.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Completed share in `[0, 1]`; `0` while the size is unknown.
    pub fraction: f64,
    pub bytes_received: u64,
    pub total_bytes_expected: u64,
    /// Where the downloaded file ended up, present on the final event only.
    pub file: Option<PathBuf>,
}

/// Drives streamed uploads and downloads.
#[derive(Clone)]
pub struct TransferEngine {
    http: Arc<dyn HttpClient>,
    builder: RequestBuilder,
    token_store: Arc<dyn TokenStore>,
    event_bus: Option<EventBus>,
    download_dir: PathBuf,
    channel_capacity: usize,
    redactor: Redactor,
}

impl TransferEngine {
    pub fn new(
        http: Arc<dyn HttpClient>,
        builder: RequestBuilder,
        token_store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            http,
            builder,
            token_store,
            event_bus: None,
            download_dir: std::env::temp_dir(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            redactor: Redactor::default(),
        }
    }

    /// Publish transfer lifecycle events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Directory for in-flight downloads and for results without a destination.
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Redaction for URLs and local paths in transfer logs.
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Upload the body described by `descriptor`, streaming it in
    /// [`UPLOAD_CHUNK_SIZE`] chunks.
    ///
    /// The sequence ends after a final event with `fraction == 1.0`, or with
    /// an error.
    pub fn upload(
        &self,
        descriptor: Descriptor,
        retry: RetryPolicy,
    ) -> TransferStream<UploadProgress> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cancel = CancellationToken::new();
        let id = Uuid::new_v4();

        let job = UploadJob {
            ctx: JobContext::new(self, id, cancel.clone(), tx),
            builder: self.builder.clone(),
            token_store: self.token_store.clone(),
            descriptor,
            retry,
        };
        let span = tracing::info_span!("upload", transfer_id = %id);
        tokio::spawn(job.run().instrument(span));

        TransferStream::new(id, rx, cancel)
    }

    /// Download `url`, moving the result to `destination` (replacing any file
    /// already there) or leaving it in the download directory.
    ///
    /// The final event carries the file location.
    pub fn download(
        &self,
        url: Url,
        destination: Option<PathBuf>,
        retry: RetryPolicy,
    ) -> TransferStream<DownloadProgress> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let cancel = CancellationToken::new();
        let id = Uuid::new_v4();

        let job = DownloadJob {
            ctx: JobContext::new(self, id, cancel.clone(), tx),
            url,
            destination,
            download_dir: self.download_dir.clone(),
            retry,
        };
        let span = tracing::info_span!("download", transfer_id = %id);
        tokio::spawn(job.run().instrument(span));

        TransferStream::new(id, rx, cancel)
    }
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEngine")
            .field("download_dir", &self.download_dir)
            .field("channel_capacity", &self.channel_capacity)
            .field("redactor", &self.redactor)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Consumer side
// ============================================================================

/// Cancels a running transfer from anywhere.
#[derive(Debug, Clone)]
pub struct TransferHandle {
    id: Uuid,
    cancel: CancellationToken,
}

impl TransferHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Lazy sequence of progress events for one transfer.
///
/// Dropping the stream cancels the transfer.
pub struct TransferStream<T> {
    id: Uuid,
    rx: mpsc::Receiver<Result<T>>,
    cancel: CancellationToken,
}

impl<T> TransferStream<T> {
    fn new(id: Uuid, rx: mpsc::Receiver<Result<T>>, cancel: CancellationToken) -> Self {
        Self { id, rx, cancel }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn handle(&self) -> TransferHandle {
        TransferHandle {
            id: self.id,
            cancel: self.cancel.clone(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<T> Unpin for TransferStream<T> {}

impl<T> Stream for TransferStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Buffered events are dropped once cancelled
        if self.cancel.is_cancelled() {
            self.rx.close();
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl<T> Drop for TransferStream<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T> fmt::Debug for TransferStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferStream")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ============================================================================
// Producer side
// ============================================================================

/// Why a transfer loop stopped early.
enum Halt {
    Cancelled,
    Failed(NetworkError),
}

/// Monotonic gate over reported progress.
///
/// A later event passes only if its fraction is higher, or equal with more
/// bytes behind it (unknown totals report a constant `0.0`). Senders outside
/// the job task hold `delivery` from `admit` until their event is queued.
#[derive(Default)]
struct FractionGate {
    last: Mutex<Option<(f64, u64)>>,
    delivery: tokio::sync::Mutex<()>,
}

impl FractionGate {
    fn admit(&self, fraction: f64, bytes: u64) -> bool {
        let mut last = self.last.lock();
        let passes = match *last {
            None => true,
            Some((previous, previous_bytes)) => {
                fraction > previous || (fraction == previous && bytes > previous_bytes)
            }
        };
        if passes {
            *last = Some((fraction, bytes));
        }
        passes
    }

    /// Mark the transfer complete at `bytes`. Waits for an event already
    /// being queued; every later `admit` is rejected.
    async fn close(&self, bytes: u64) {
        let _turn = self.delivery.lock().await;
        let mut last = self.last.lock();
        let bytes = last.map_or(bytes, |(_, seen)| seen.max(bytes));
        *last = Some((1.0, bytes));
    }
}

fn fraction(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (done as f64 / total as f64).min(1.0)
    }
}

/// State shared by both job kinds.
struct JobContext<T> {
    http: Arc<dyn HttpClient>,
    event_bus: Option<EventBus>,
    id: Uuid,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<T>>,
    gate: Arc<FractionGate>,
    redactor: Redactor,
}

impl<T: Send + 'static> JobContext<T> {
    fn new(
        engine: &TransferEngine,
        id: Uuid,
        cancel: CancellationToken,
        tx: mpsc::Sender<Result<T>>,
    ) -> Self {
        Self {
            http: engine.http.clone(),
            event_bus: engine.event_bus.clone(),
            id,
            cancel,
            tx,
            gate: Arc::new(FractionGate::default()),
            redactor: engine.redactor,
        }
    }

    fn publish(&self, event: TransferEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Transfer(event));
        }
    }

    /// Deliver `item` unless the transfer was cancelled meanwhile.
    async fn deliver(&self, item: Result<T>) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(item) => sent.is_ok(),
        }
    }

    /// Sleep before retry number `attempt`. `false` if cancelled while waiting.
    async fn backoff(&self, retry: &RetryPolicy, attempt: u32, error: &NetworkError) -> bool {
        let delay = retry.delay(attempt);
        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "Retrying transfer");
        self.publish(TransferEvent::Retrying {
            transfer_id: self.id.to_string(),
            attempt,
            delay_ms: delay.as_millis() as u64,
        });

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Drive `attempt_fn` under `retry`, restarting it on retryable failures.
    async fn run_with_retry<F, Fut, R>(
        &self,
        retry: &RetryPolicy,
        mut attempt_fn: F,
    ) -> std::result::Result<R, Halt>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<R>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(Halt::Cancelled),
                outcome = attempt_fn() => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry.allows_retry(attempt) => {
                    attempt += 1;
                    if !self.backoff(retry, attempt, &e).await {
                        return Err(Halt::Cancelled);
                    }
                }
                Err(e) => return Err(Halt::Failed(e)),
            }
        }
    }

    async fn finish_with(&self, halt: Halt) {
        match halt {
            Halt::Cancelled => {
                info!("Transfer cancelled");
                self.publish(TransferEvent::Cancelled {
                    transfer_id: self.id.to_string(),
                });
            }
            Halt::Failed(error) => {
                warn!(error = %error, "Transfer failed");
                self.publish(TransferEvent::Failed {
                    transfer_id: self.id.to_string(),
                    message: error.to_string(),
                });
                self.deliver(Err(error)).await;
            }
        }
    }
}

struct UploadJob {
    ctx: JobContext<UploadProgress>,
    builder: RequestBuilder,
    token_store: Arc<dyn TokenStore>,
    descriptor: Descriptor,
    retry: RetryPolicy,
}

impl UploadJob {
    async fn run(self) {
        let ctx = &self.ctx;
        let url = join_path(&self.descriptor.base_url, &self.descriptor.path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| self.descriptor.path.clone());
        ctx.publish(TransferEvent::Started {
            transfer_id: ctx.id.to_string(),
            kind: TransferKind::Upload,
            url,
        });

        let outcome = ctx.run_with_retry(&self.retry, || self.attempt()).await;

        match outcome {
            Ok((total, body)) => {
                ctx.gate.close(total).await;
                info!(bytes = total, "Upload completed");
                ctx.publish(TransferEvent::Completed {
                    transfer_id: ctx.id.to_string(),
                    bytes: total,
                });
                ctx.deliver(Ok(UploadProgress {
                    fraction: 1.0,
                    bytes_sent: total,
                    total_bytes_expected: total,
                    response: Some(body),
                }))
                .await;
            }
            Err(halt) => ctx.finish_with(halt).await,
        }
    }

    #[instrument(skip(self))]
    async fn attempt(&self) -> Result<(u64, Bytes)> {
        let token = self.token_store.access_token().await;
        let mut request = self.builder.build(&self.descriptor, token.as_deref())?;
        let payload = request.body.take().unwrap_or_default();
        let total = payload.len() as u64;

        debug!(
            url = %self.ctx.redactor.url(&request.url),
            bytes = total,
            "Starting upload attempt"
        );

        let body = progress_body(
            payload,
            self.ctx.tx.clone(),
            self.ctx.gate.clone(),
            self.ctx.cancel.clone(),
        );
        let response = self.ctx.http.upload_stream(request, body, total).await?;

        if !response.is_success() {
            return Err(error_for_status(response.status, &response.body));
        }
        Ok((total, response.body))
    }
}

/// Body stream that reports one progress event per chunk handed out.
fn progress_body(
    payload: Bytes,
    tx: mpsc::Sender<Result<UploadProgress>>,
    gate: Arc<FractionGate>,
    cancel: CancellationToken,
) -> ByteStream {
    let total = payload.len() as u64;
    let chunks = stream::unfold(0usize, move |offset| {
        let payload = payload.clone();
        let tx = tx.clone();
        let gate = gate.clone();
        let cancel = cancel.clone();
        async move {
            if offset >= payload.len() {
                return None;
            }
            let end = (offset + UPLOAD_CHUNK_SIZE).min(payload.len());
            let chunk = payload.slice(offset..end);
            let sent = end as u64;

            let progress = fraction(sent, total);
            let _turn = gate.delivery.lock().await;
            if !cancel.is_cancelled() && gate.admit(progress, sent) {
                let event = UploadProgress {
                    fraction: progress,
                    bytes_sent: sent,
                    total_bytes_expected: total,
                    response: None,
                };
                let queued = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => true,
                    result = tx.send(Ok(event)) => result.is_ok(),
                };
                if !queued {
                    return Some((Err(io::Error::other("transfer consumer dropped")), end));
                }
            }
            Some((Ok(chunk), end))
        }
    });
    chunks.boxed()
}

struct DownloadJob {
    ctx: JobContext<DownloadProgress>,
    url: Url,
    destination: Option<PathBuf>,
    download_dir: PathBuf,
    retry: RetryPolicy,
}

impl DownloadJob {
    async fn run(self) {
        let ctx = &self.ctx;
        ctx.publish(TransferEvent::Started {
            transfer_id: ctx.id.to_string(),
            kind: TransferKind::Download,
            url: self.url.to_string(),
        });

        let temp = self
            .download_dir
            .join(format!("download-{}.tmp", Uuid::new_v4()));
        debug!(
            temp = %ctx.redactor.path(&temp),
            destination = ?self.destination.as_deref().map(|p| ctx.redactor.path(p)),
            "Starting download"
        );

        let outcome = match ctx.run_with_retry(&self.retry, || self.attempt(&temp)).await {
            Ok((received, total)) => match self.place(&temp).await {
                Ok(file) => Ok((received, total, file)),
                Err(e) => Err(Halt::Failed(NetworkError::FileSystem(e))),
            },
            Err(halt) => Err(halt),
        };

        match outcome {
            Ok((received, total, file)) => {
                info!(
                    bytes = received,
                    file = %ctx.redactor.path(&file),
                    "Download completed"
                );
                ctx.publish(TransferEvent::Completed {
                    transfer_id: ctx.id.to_string(),
                    bytes: received,
                });
                ctx.deliver(Ok(DownloadProgress {
                    fraction: 1.0,
                    bytes_received: received,
                    total_bytes_expected: total.max(received),
                    file: Some(file),
                }))
                .await;
            }
            Err(halt) => {
                remove_quietly(&temp, &ctx.redactor).await;
                ctx.finish_with(halt).await;
            }
        }
    }

    /// One download attempt into `temp`. Returns bytes received and the
    /// expected total (`0` when unknown).
    #[instrument(skip(self, temp))]
    async fn attempt(&self, temp: &Path) -> Result<(u64, u64)> {
        let request = HttpRequest::new(HttpMethod::Get, self.url.as_str());
        let response = self.ctx.http.download_stream(request).await?;

        if !response.is_success() {
            let status = response.status;
            let body = response.into_bytes().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let total = response.content_length.unwrap_or(0);
        let mut body = response.body;
        let mut file = fs::File::create(temp).await?;
        let mut received = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| NetworkError::Transport(e.into()))?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            let progress = fraction(received, total);
            if self.ctx.gate.admit(progress, received) {
                let event = DownloadProgress {
                    fraction: progress,
                    bytes_received: received,
                    total_bytes_expected: total,
                    file: None,
                };
                if !self.ctx.deliver(Ok(event)).await {
                    return Err(NetworkError::Transport(
                        io::Error::other("transfer consumer dropped").into(),
                    ));
                }
            }
        }
        file.flush().await?;
        debug!(bytes = received, "Download attempt finished");

        Ok((received, total))
    }

    /// Move the finished temp file to its final location.
    async fn place(&self, temp: &Path) -> io::Result<PathBuf> {
        let Some(destination) = &self.destination else {
            return Ok(temp.to_path_buf());
        };

        move_into_place(temp, destination, &self.ctx.redactor).await?;
        Ok(destination.clone())
    }
}

/// Rename `temp` over `destination`, copying when the rename fails (for
/// example across file systems). An existing destination is only replaced
/// once the new content is readable.
async fn move_into_place(
    temp: &Path,
    destination: &Path,
    redactor: &Redactor,
) -> io::Result<()> {
    let Err(e) = fs::rename(temp, destination).await else {
        return Ok(());
    };
    debug!(
        error = %e,
        destination = %redactor.path(destination),
        "Rename failed, copying download"
    );
    fs::copy(temp, destination).await?;
    remove_quietly(temp, redactor).await;
    Ok(())
}

async fn remove_quietly(path: &Path, redactor: &Redactor) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(
                error = %e,
                path = %redactor.path(path),
                "Failed to remove temporary download"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_gate_is_monotonic() {
        let gate = FractionGate::default();
        assert!(gate.admit(0.0, 0));
        assert!(gate.admit(0.5, 50));
        assert!(!gate.admit(0.5, 50));
        // Restarted attempt replays earlier progress
        assert!(!gate.admit(0.25, 25));
        assert!(gate.admit(0.75, 75));
    }

    #[test]
    fn test_fraction_gate_unknown_total_tracks_bytes() {
        let gate = FractionGate::default();
        assert!(gate.admit(0.0, 100));
        assert!(gate.admit(0.0, 200));
        assert!(!gate.admit(0.0, 150));
    }

    #[tokio::test]
    async fn test_closed_gate_rejects_late_events() {
        let gate = FractionGate::default();
        assert!(gate.admit(0.5, 50));
        gate.close(100).await;

        assert!(!gate.admit(1.0, 100));
        assert!(!gate.admit(0.75, 75));
        assert_eq!(*gate.last.lock(), Some((1.0, 100)));
    }

    #[tokio::test]
    async fn test_progress_body_is_silent_after_close() {
        let (tx, mut rx) = mpsc::channel(8);
        let gate = Arc::new(FractionGate::default());
        let payload = Bytes::from(vec![1u8; UPLOAD_CHUNK_SIZE * 2]);
        gate.close(payload.len() as u64).await;

        // Body still polled by the transport after the upload finished
        let body = progress_body(payload.clone(), tx, gate, CancellationToken::new());
        let chunks: Vec<Bytes> = body.map(|c| c.unwrap()).collect().await;

        assert_eq!(chunks.concat(), payload.to_vec());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_waits_for_event_being_queued() {
        let (tx, mut rx) = mpsc::channel(1);
        let gate = Arc::new(FractionGate::default());
        let payload = Bytes::from(vec![1u8; UPLOAD_CHUNK_SIZE * 2]);
        let mut body = progress_body(
            payload.clone(),
            tx.clone(),
            gate.clone(),
            CancellationToken::new(),
        );

        // First event fills the channel, the second blocks while holding the turn
        body.next().await.unwrap().unwrap();
        let pending = tokio::spawn(async move { body.next().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let closing = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.close(payload.len() as u64).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!closing.is_finished());

        let first = rx.recv().await.unwrap().unwrap();
        let second = rx.recv().await.unwrap().unwrap();
        assert!(first.bytes_sent < second.bytes_sent);
        pending.await.unwrap().unwrap().unwrap();
        closing.await.unwrap();

        // Anything after close stays out of the channel
        assert!(!gate.admit(1.0, UPLOAD_CHUNK_SIZE as u64 * 2));
        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_move_keeps_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("statement.pdf");
        std::fs::write(&destination, b"previous").unwrap();

        let missing = dir.path().join("download-gone.tmp");
        let result = move_into_place(&missing, &destination, &Redactor::default()).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&destination).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_move_replaces_existing_destination() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("statement.pdf");
        let temp = dir.path().join("download-1.tmp");
        std::fs::write(&destination, b"previous").unwrap();
        std::fs::write(&temp, b"fresh").unwrap();

        move_into_place(&temp, &destination, &Redactor::default())
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"fresh");
        assert!(!temp.exists());
    }

    #[test]
    fn test_fraction_handles_unknown_total() {
        assert_eq!(fraction(10, 0), 0.0);
        assert_eq!(fraction(5, 10), 0.5);
        assert_eq!(fraction(12, 10), 1.0);
    }

    #[tokio::test]
    async fn test_progress_body_chunks_payload() {
        let (tx, mut rx) = mpsc::channel(8);
        let payload = Bytes::from(vec![7u8; UPLOAD_CHUNK_SIZE * 2 + 10]);
        let body = progress_body(
            payload.clone(),
            tx,
            Arc::new(FractionGate::default()),
            CancellationToken::new(),
        );

        let chunks: Vec<Bytes> = body.map(|c| c.unwrap()).collect().await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), UPLOAD_CHUNK_SIZE);
        assert_eq!(chunks[2].len(), 10);
        assert_eq!(chunks.concat(), payload.to_vec());

        let mut sent = Vec::new();
        while let Ok(event) = rx.try_recv() {
            sent.push(event.unwrap().bytes_sent);
        }
        assert_eq!(
            sent,
            vec![
                UPLOAD_CHUNK_SIZE as u64,
                (UPLOAD_CHUNK_SIZE * 2) as u64,
                payload.len() as u64
            ]
        );
    }
}
