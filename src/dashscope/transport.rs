//! HTTP transport seam.
//!
//! The client talks to the network only through [`Transport`], so every
//! error path can be driven by canned responses in tests.

use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Largest response body read into memory.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The request never produced a response (DNS, connect, TLS, timeout, I/O).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Blocking HTTP transport.
pub trait Transport: Send + Sync {
    /// POST `body` as JSON with `headers`.
    fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &Value,
    ) -> Result<HttpResponse, TransportFailure>;

    /// GET `url`.
    fn get(&self, url: &str) -> Result<HttpResponse, TransportFailure>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &Value,
    ) -> Result<HttpResponse, TransportFailure> {
        (**self).post_json(url, headers, body)
    }

    fn get(&self, url: &str) -> Result<HttpResponse, TransportFailure> {
        (**self).get(url)
    }
}

/// `ureq`-backed transport.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport with an optional overall timeout.
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<HttpResponse, TransportFailure> {
        // Non-2xx statuses still carry a body the classifier needs
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportFailure(transport.to_string()))
            }
        };

        let status = response.status();
        let reason = response.status_text().to_string();
        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| TransportFailure(format!("Failed reading response body: {}", e)))?;

        Ok(HttpResponse { status, reason, body })
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Transport for UreqTransport {
    fn post_json(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &Value,
    ) -> Result<HttpResponse, TransportFailure> {
        let mut request = self.agent.post(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }
        Self::finish(request.send_json(body))
    }

    fn get(&self, url: &str) -> Result<HttpResponse, TransportFailure> {
        Self::finish(self.agent.get(url).call())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Canned-response transport for tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// One request seen by [`MockTransport`].
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub body: Option<Value>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub struct MockTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportFailure>>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn push_response(&self, status: u16, reason: &str, body: impl Into<Vec<u8>>) {
            self.responses.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                reason: reason.to_string(),
                body: body.into(),
            }));
        }

        pub fn push_json(&self, status: u16, body: &Value) {
            self.push_response(status, "OK", body.to_string());
        }

        pub fn push_failure(&self, cause: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(TransportFailure(cause.to_string())));
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn next(&self, request: RecordedRequest) -> Result<HttpResponse, TransportFailure> {
            let url = request.url.clone();
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportFailure(format!("no canned response for {}", url))))
        }
    }

    impl Transport for MockTransport {
        fn post_json(
            &self,
            url: &str,
            headers: &[(&'static str, String)],
            body: &Value,
        ) -> Result<HttpResponse, TransportFailure> {
            self.next(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                headers: headers.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                body: Some(body.clone()),
            })
        }

        fn get(&self, url: &str) -> Result<HttpResponse, TransportFailure> {
            self.next(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                headers: Vec::new(),
                body: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_response_success_range() {
        let ok = HttpResponse { status: 204, reason: String::new(), body: Vec::new() };
        let redirect = HttpResponse { status: 302, reason: String::new(), body: Vec::new() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_mock_replays_in_order_and_records() {
        let mock = MockTransport::new();
        mock.push_json(200, &json!({ "ok": true }));
        mock.push_failure("connection refused");

        let transport: Box<dyn Transport> = Box::new(Arc::clone(&mock));
        let first = transport
            .post_json("https://a", &[("Authorization", "Bearer k".to_string())], &json!({ "q": 1 }))
            .unwrap();
        assert_eq!(first.status, 200);
        assert_eq!(first.text(), r#"{"ok":true}"#);

        let second = transport.get("https://b").unwrap_err();
        assert_eq!(second, TransportFailure("connection refused".to_string()));

        // Queue exhausted
        assert!(transport.get("https://c").is_err());

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].header("authorization"), Some("Bearer k"));
        assert_eq!(requests[0].body, Some(json!({ "q": 1 })));
        assert_eq!(requests[1].method, "GET");
    }
}
