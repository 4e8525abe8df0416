//! HTTP transport used by every live integration.
//!
//! Services never talk to `reqwest` directly. They build an [`HttpRequest`]
//! and hand it to a [`Transport`], which lets tests swap in a recording mock
//! and count the calls a service made.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            basic_auth: None,
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url)
        }
    }

    pub fn post_json<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self, ServiceError> {
        Ok(Self::post(url).json(serde_json::to_value(body)?))
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Body as JSON, if it was sent as JSON.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json_value(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn bytes(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx response into [`ServiceError::Status`].
    pub fn error_for_status(self) -> Result<Self, ServiceError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ServiceError::Status {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?.to_vec();

        tracing::debug!("{:?} {} -> {}", request.method, request.url, status);

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    //! Recording transport for tests.

    use super::*;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

    pub struct MockTransport {
        handler: Handler,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new(
            handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Every call fails at the transport level.
        pub fn failing(reason: &str) -> Self {
            let reason = reason.to_string();
            Self::new(move |_| Err(TransportError::Unavailable(reason.clone())))
        }

        /// Every call returns the same JSON body.
        pub fn json(status: u16, value: serde_json::Value) -> Self {
            Self::new(move |_| Ok(HttpResponse::json_value(status, &value)))
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let result = (self.handler)(&request);
            self.requests.lock().unwrap().push(request);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_json_builds_json_body() {
        let req = HttpRequest::post_json("http://x.test/api", &serde_json::json!({"a": 1}))
            .unwrap()
            .bearer("tok");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.json_body().unwrap()["a"], 1);
        assert_eq!(
            req.headers,
            vec![("Authorization".to_string(), "Bearer tok".to_string())]
        );
    }

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse::bytes(204, None, Vec::new());
        assert!(ok.error_for_status().is_ok());

        let err = HttpResponse::bytes(502, Some("text/plain"), "bad gateway")
            .error_for_status()
            .unwrap_err();
        assert_eq!(err.to_string(), "unexpected status 502: bad gateway");
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let transport = mock::MockTransport::json(200, serde_json::json!({"ok": true}));
        let resp = transport.send(HttpRequest::get("http://x.test")).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.requests()[0].url, "http://x.test");
    }
}
