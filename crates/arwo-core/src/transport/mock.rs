//! Scripted transport for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::TransportError;

use super::{ApiRequest, ApiResponse, Transport};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync>;

/// Scripted transport that answers from a handler closure and records
/// every request it sees, in order, for assertions.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicUsize,
}

impl MockTransport {
    /// Creates a mock that answers every request via `handler`.
    #[must_use]
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a mock that always answers with `status` and `body`.
    #[must_use]
    pub fn always(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self::new(move |_| Ok(ApiResponse::new(status, body.clone())))
    }

    /// Creates a mock that answers with `responses` in order, repeating the
    /// final response once the script is exhausted.
    #[must_use]
    pub fn sequence(responses: Vec<ApiResponse>) -> Self {
        let cursor = AtomicUsize::new(0);
        Self::new(move |request| {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            responses
                .get(index)
                .or_else(|| responses.last())
                .cloned()
                .ok_or_else(|| TransportError::Request {
                    url: request.url.clone(),
                    detail: "mock sequence is empty".to_string(),
                })
        })
    }

    /// Number of requests executed so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every recorded request, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        (self.handler)(request)
    }
}
