#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{
    ByteStream, DownloadResponse, HttpClient, HttpRequest, HttpResponse,
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What the fake transport does on its next call.
pub enum Step {
    Respond(u16, &'static str),
    RespondBytes(u16, Bytes),
    Fail,
    /// Never completes; used to exercise cancellation.
    Hang,
    /// Connection drops once this many body bytes went through. Downloads
    /// announce the full body first; uploads ignore it.
    FailAfter(Bytes, usize),
}

/// Transport that replays a fixed script, one step per call.
pub struct ScriptedHttp {
    steps: Mutex<VecDeque<Step>>,
    attempts: AtomicUsize,
    uploads: Mutex<Vec<(HttpRequest, Bytes)>>,
}

impl ScriptedHttp {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            attempts: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<(HttpRequest, Bytes)> {
        self.uploads.lock().clone()
    }

    fn next_step(&self) -> Step {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.steps
            .lock()
            .pop_front()
            .unwrap_or(Step::Respond(500, "script exhausted"))
    }

    async fn resolve(&self, step: Step) -> BridgeResult<HttpResponse> {
        match step {
            Step::Respond(status, body) => Ok(response(status, Bytes::from_static(body.as_bytes()))),
            Step::RespondBytes(status, body) => Ok(response(status, body)),
            Step::Fail | Step::FailAfter(..) => Err(reset()),
            Step::Hang => futures::future::pending().await,
        }
    }
}

fn reset() -> BridgeError {
    BridgeError::ConnectionFailed("connection reset".to_string())
}

fn response(status: u16, body: Bytes) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body,
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let step = self.next_step();
        self.uploads
            .lock()
            .push((request.clone(), request.body.clone().unwrap_or_default()));
        self.resolve(step).await
    }

    async fn upload_stream(
        &self,
        request: HttpRequest,
        mut body: ByteStream,
        _content_length: u64,
    ) -> BridgeResult<HttpResponse> {
        let step = self.next_step();
        let limit = match &step {
            Step::FailAfter(_, after) => Some(*after),
            _ => None,
        };
        let mut sent = Vec::new();
        while let Some(chunk) = body.next().await {
            sent.extend_from_slice(&chunk?);
            if limit.is_some_and(|after| sent.len() >= after) {
                return Err(reset());
            }
        }
        self.uploads.lock().push((request, Bytes::from(sent)));
        self.resolve(step).await
    }

    async fn download_stream(&self, _request: HttpRequest) -> BridgeResult<DownloadResponse> {
        let step = self.next_step();
        let (response, fail_after) = match step {
            Step::FailAfter(body, after) => (response(200, body), Some(after)),
            step => (self.resolve(step).await?, None),
        };
        let length = response.body.len() as u64;
        let served = match fail_after {
            Some(after) => response.body.slice(..after.min(response.body.len())),
            None => response.body.clone(),
        };
        let mut chunks: Vec<io::Result<Bytes>> = served
            .chunks(1024)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        if fail_after.is_some() {
            chunks.push(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }
        let body: ByteStream = stream::iter(chunks).boxed();
        Ok(DownloadResponse {
            status: response.status,
            headers: response.headers,
            content_length: Some(length),
            body,
        })
    }
}

/// Formatted log output captured for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
