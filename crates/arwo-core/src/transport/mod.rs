//! HTTP transport boundary.
//!
//! Every Remedy call goes through the [`Transport`] trait so that
//! operations can be exercised against a scripted [`MockTransport`]. The
//! production implementation is [`HttpTransport`], a thin wrapper over a
//! blocking reqwest client with explicit timeouts.

use std::time::Duration;

use crate::error::TransportError;

pub mod mock;

pub use mock::MockTransport;

/// Connect deadline applied to every client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Fallback request deadline when a request does not carry its own.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP method for an API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
}

impl Method {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Connection selection for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// The shared pooled client.
    #[default]
    Shared,

    /// A fresh client with its own connection, torn down after the call.
    /// Attachment uploads use this so the multipart post never rides the
    /// shared pool.
    Dedicated,
}

/// Request body variants.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body.
    Empty,

    /// `application/x-www-form-urlencoded` key/value pairs.
    Form(Vec<(String, String)>),

    /// JSON payload.
    Json(serde_json::Value),

    /// Pre-assembled bytes with an explicit content type.
    Raw {
        /// Value for the `Content-Type` header.
        content_type: String,
        /// The body bytes, sent verbatim.
        bytes: Vec<u8>,
    },
}

/// One outbound API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Query string pairs, appended in order.
    pub query: Vec<(String, String)>,
    /// Extra headers, applied in order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Per-request deadline override.
    pub timeout: Option<Duration>,
    /// Connection selection.
    pub connection: ConnectionMode,
}

impl ApiRequest {
    /// Creates a request with no query, headers, or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
            connection: ConnectionMode::Shared,
        }
    }

    /// Appends one query pair.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Appends one header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets a per-request deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends this request over a dedicated connection.
    #[must_use]
    pub const fn dedicated(mut self) -> Self {
        self.connection = ConnectionMode::Dedicated;
        self
    }
}

/// One API response: status code plus raw body bytes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Creates a response from a status and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Boundary trait for request execution.
pub trait Transport: Send + Sync {
    /// Executes one request and returns the raw response.
    ///
    /// HTTP error statuses are not transport errors; they come back as a
    /// normal [`ApiResponse`] for the caller to interpret.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be sent or no response
    /// arrives (connection failure, timeout).
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Production transport over a shared blocking reqwest client.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates the transport and its shared client.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            client: build_client(false)?,
        })
    }

    fn send_with(
        client: &reqwest::blocking::Client,
        request: &ApiRequest,
    ) -> Result<ApiResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
            Method::Put => client.put(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Raw {
                content_type,
                bytes,
            } => builder
                .header("Content-Type", content_type.as_str())
                .body(bytes.clone()),
        };
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(|error| TransportError::Request {
            url: request.url.clone(),
            detail: error.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|error| TransportError::Request {
                url: request.url.clone(),
                detail: error.to_string(),
            })?
            .to_vec();
        Ok(ApiResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        match request.connection {
            ConnectionMode::Shared => Self::send_with(&self.client, request),
            ConnectionMode::Dedicated => {
                let client = build_client(true)?;
                Self::send_with(&client, request)
            },
        }
    }
}

fn build_client(dedicated: bool) -> Result<reqwest::blocking::Client, TransportError> {
    let mut builder = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(DEFAULT_TIMEOUT);
    if dedicated {
        // One-shot client: do not keep the connection around after the call.
        builder = builder.pool_max_idle_per_host(0);
    }
    builder
        .build()
        .map_err(|error| TransportError::Build(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_defaults() {
        let request = ApiRequest::new(Method::Get, "https://remedy.example.com/x");
        assert_eq!(request.method, Method::Get);
        assert!(request.query.is_empty());
        assert!(request.headers.is_empty());
        assert!(matches!(request.body, RequestBody::Empty));
        assert_eq!(request.timeout, None);
        assert_eq!(request.connection, ConnectionMode::Shared);
    }

    #[test]
    fn test_request_builder_accumulates() {
        let request = ApiRequest::new(Method::Post, "https://remedy.example.com/x")
            .query("fields", "values(WorkOrder_ID)")
            .header("Authorization", "AR-JWT abc")
            .timeout(Duration::from_secs(5))
            .dedicated();
        assert_eq!(
            request.query,
            vec![("fields".to_string(), "values(WorkOrder_ID)".to_string())]
        );
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "AR-JWT abc".to_string())]
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.connection, ConnectionMode::Dedicated);
    }

    #[test]
    fn test_response_text_and_json() {
        let response = ApiResponse::new(200, r#"{"entries":[]}"#);
        assert_eq!(response.text(), r#"{"entries":[]}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert!(value["entries"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Post.as_str(), "POST");
        assert_eq!(Method::Put.as_str(), "PUT");
    }
}
