use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::{ChatBackend, UploadRequest};
use crate::error::UploadError;

pub const UPLOAD_PATH: &str = "/api/upload";

/// Hard operational limits. Not configurable by the user.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(120_000);
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
struct UploadResponse {
    response: String,
}

/// Multipart client for `POST /api/upload`
#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    max_payload: usize,
}

impl UploadClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_limits(base_url, REQUEST_TIMEOUT, MAX_PAYLOAD_BYTES)
    }

    fn with_limits(base_url: &str, timeout: Duration, max_payload: usize) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_payload,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<String, UploadError> {
        let url = format!("{}{}", self.base_url, UPLOAD_PATH);
        let history = request
            .history_json()
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let mut form = Form::new();
        if let Some(file) = request.file {
            // Stands in for the transport ceiling on the request side
            if file.len() > self.max_payload {
                return Err(UploadError::PayloadTooLarge {
                    size: file.len() as u64,
                    limit: self.max_payload,
                });
            }
            let (name, bytes, mime) = file.into_parts();
            let part = Part::bytes(bytes).file_name(name).mime_str(&mime)?;
            form = form.part("file", part);
        }
        form = form.text("history", history).text("prompt", request.prompt);

        tracing::debug!(url = %url, "sending upload request");
        let mut response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_payload as u64 {
                return Err(UploadError::PayloadTooLarge {
                    size: len,
                    limit: self.max_payload,
                });
            }
        }

        // Content-Length may be absent, so the ceiling is enforced while reading too
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_payload {
                return Err(UploadError::PayloadTooLarge {
                    size: (body.len() + chunk.len()) as u64,
                    limit: self.max_payload,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let upload_response: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        Ok(upload_response.response)
    }
}

#[async_trait]
impl ChatBackend for UploadClient {
    async fn send(&self, request: UploadRequest) -> Result<String, UploadError> {
        self.upload(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::Attachment;
    use crate::state::Turn;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(prompt: &str, file: Option<Attachment>, history: Vec<Turn>) -> UploadRequest {
        UploadRequest {
            file,
            history,
            prompt: prompt.to_string(),
        }
    }

    async fn mount_reply(server: &MockServer, reply: &str) {
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": reply })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_limits_are_fixed() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_millis(120_000));
        assert_eq!(MAX_PAYLOAD_BYTES, 10 * 1024 * 1024);
    }

    #[test]
    fn test_new_uses_fixed_limits() {
        let client = UploadClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.timeout(), REQUEST_TIMEOUT);
        assert_eq!(client.max_payload(), MAX_PAYLOAD_BYTES);
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    async fn received_body(server: &MockServer) -> String {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        String::from_utf8_lossy(&requests[0].body).to_lowercase()
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_fields() {
        let server = MockServer::start().await;
        mount_reply(&server, "Hi there").await;

        let client = UploadClient::new(&server.uri()).unwrap();
        let history = vec![Turn::user("earlier"), Turn::assistant("reply")];
        let reply = client.upload(request("Hello", None, history)).await.unwrap();
        assert_eq!(reply, "Hi there");

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data"));

        let body = received_body(&server).await;
        assert!(body.contains(r#"name="prompt""#));
        assert!(body.contains("hello"));
        assert!(body.contains(r#"name="history""#));
        assert!(body.contains(
            r#"[{"role":"user","content":"earlier"},{"role":"assistant","content":"reply"}]"#
        ));
        assert!(!body.contains(r#"name="file""#));
    }

    #[tokio::test]
    async fn test_upload_attaches_file_with_name_and_type() {
        let server = MockServer::start().await;
        mount_reply(&server, "Looks like a small dataset").await;

        let client = UploadClient::new(&format!("{}/", server.uri())).unwrap();
        let file = Attachment::new("report.csv", b"a,b\n1,2\n".to_vec());
        let reply = client.upload(request("", Some(file), Vec::new())).await.unwrap();
        assert_eq!(reply, "Looks like a small dataset");

        let body = received_body(&server).await;
        assert!(body.contains(r#"name="file"; filename="report.csv""#));
        assert!(body.contains("content-type: text/csv"));
        assert!(body.contains("a,b\n1,2\n"));
        assert!(body.contains(r#"name="history""#));
        assert!(body.contains("[]"));
    }

    #[tokio::test]
    async fn test_upload_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "too late" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client =
            UploadClient::with_limits(&server.uri(), Duration::from_millis(50), MAX_PAYLOAD_BYTES)
                .unwrap();
        let err = client.upload(request("Hello", None, Vec::new())).await.unwrap_err();
        assert_eq!(err, UploadError::Timeout);
    }

    #[tokio::test]
    async fn test_upload_server_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = UploadClient::new(&server.uri()).unwrap();
        let err = client.upload(request("Hello", None, Vec::new())).await.unwrap_err();
        assert_eq!(err, UploadError::Status(500));
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_response() {
        let server = MockServer::start().await;
        mount_reply(&server, &"x".repeat(64)).await;

        let client = UploadClient::with_limits(&server.uri(), REQUEST_TIMEOUT, 32).unwrap();
        let err = client.upload(request("Hello", None, Vec::new())).await.unwrap_err();
        assert!(matches!(err, UploadError::PayloadTooLarge { limit: 32, .. }));
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = UploadClient::with_limits(&server.uri(), REQUEST_TIMEOUT, 16).unwrap();
        let file = Attachment::new("big.csv", vec![b'a'; 64]);
        let err = client.upload(request("", Some(file), Vec::new())).await.unwrap_err();
        assert_eq!(err, UploadError::PayloadTooLarge { size: 64, limit: 16 });
    }

    #[tokio::test]
    async fn test_upload_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = UploadClient::new(&server.uri()).unwrap();
        let err = client.upload(request("Hello", None, Vec::new())).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_upload_connection_refused_is_transport_error() {
        let client = UploadClient::new("http://127.0.0.1:1").unwrap();
        let err = client.upload(request("Hello", None, Vec::new())).await.unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
    }
}
