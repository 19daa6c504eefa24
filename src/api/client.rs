use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use super::types::{
    AiRequest, FileEntry, KeyStatus, MessageResponse, Overview, StatsSnapshot, SummaryResponse,
    UploadReceipt, VisualizationSet,
};
use crate::logging::{log_request, log_response, v_str, ProfileScope};

/// Every way a single backend call can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("network request failed: {0}")]
    Transport(String),

    /// Non-2xx response. `message` is the server's `detail` when the error
    /// body carried one, otherwise the status text.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        detail: Option<String>,
    },

    #[error("malformed response body: {0}")]
    Parse(String),
}

impl RequestError {
    pub fn from_status(status: u16, status_text: &str, body: &[u8]) -> Self {
        let detail = error_detail(body);
        RequestError::Status {
            status,
            message: detail.clone().unwrap_or_else(|| status_text.to_string()),
            detail,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            RequestError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    pub file_name: String,
    pub file_bytes: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: Body::Empty,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Body::Json(body),
        }
    }

    pub fn post_multipart(path: impl Into<String>, form: MultipartForm) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Body::Multipart(form),
        }
    }
}

/// Status line and undecoded body of one response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One round trip to the backend. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, RequestError>;
}

/// reqwest-backed transport. No client-side timeout is configured.
///
/// Request paths resolve under the base URL, so a base with a path prefix
/// (`http://host/explorer`) keeps it.
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    fn url(&self, path: &str) -> Result<Url, RequestError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| RequestError::Transport(format!("bad url {}: {}", path, e)))
    }

    fn form(multipart: &MultipartForm) -> Form {
        let file = Part::bytes(multipart.file_bytes.clone()).file_name(multipart.file_name.clone());
        multipart
            .fields
            .iter()
            .fold(Form::new().part("file", file), |form, (k, v)| {
                form.text(k.clone(), v.clone())
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, RequestError> {
        let url = self.url(&request.path)?;

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let builder = match &request.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(body),
            Body::Multipart(form) => builder.multipart(Self::form(form)),
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| RequestError::Transport(format!("read body failed: {}", e)))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// Server-supplied message from an error body, if any.
///
/// An absent or unparsable body yields `None`; the caller then falls back
/// to the status text.
pub fn error_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Typed access to every backend endpoint over a shared transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn http(base: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Arc::new(HttpTransport::new(base)?)))
    }

    /// Perform one call and decode a 2xx body into `T`.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, RequestError> {
        let method = request.method.as_str();
        let _timer = ProfileScope::with_context(
            "api_call",
            &[("method", v_str(method)), ("path", v_str(&request.path))],
        );
        log_request(method, &request.path);

        let raw = self.transport.send(&request).await?;
        log_response(method, &request.path, raw.status);

        if !raw.is_success() {
            return Err(RequestError::from_status(
                raw.status,
                &raw.status_text,
                &raw.body,
            ));
        }
        serde_json::from_slice(&raw.body).map_err(|e| RequestError::Parse(e.to_string()))
    }

    pub async fn upload(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        session_name: &str,
    ) -> Result<UploadReceipt, RequestError> {
        let form = MultipartForm {
            file_name: file_name.to_string(),
            file_bytes,
            fields: vec![("session_name".to_string(), session_name.to_string())],
        };
        self.call(ApiRequest::post_multipart("/api/upload", form)).await
    }

    pub async fn overview(&self, session_id: &str) -> Result<Overview, RequestError> {
        self.call(ApiRequest::get(analysis_path(session_id, "overview")))
            .await
    }

    pub async fn stats(&self, session_id: &str) -> Result<StatsSnapshot, RequestError> {
        self.call(ApiRequest::get(analysis_path(session_id, "stats")))
            .await
    }

    pub async fn visualizations(&self, session_id: &str) -> Result<VisualizationSet, RequestError> {
        self.call(ApiRequest::get(analysis_path(session_id, "visualizations")))
            .await
    }

    pub async fn summarize(&self, request: &AiRequest) -> Result<SummaryResponse, RequestError> {
        let body = serde_json::to_value(request).map_err(|e| RequestError::Parse(e.to_string()))?;
        self.call(ApiRequest::post_json("/api/ai/summarize", body))
            .await
    }

    pub async fn list_files(&self) -> Result<Vec<FileEntry>, RequestError> {
        self.call(ApiRequest::get("/api/files/list")).await
    }

    pub async fn save_key(&self, provider: &str, key: &str) -> Result<MessageResponse, RequestError> {
        let body = json!({ "provider": provider, "key": key });
        self.call(ApiRequest::post_json("/api/settings/key", body))
            .await
    }

    pub async fn has_key(&self, provider: &str) -> Result<bool, RequestError> {
        let status: KeyStatus = self
            .call(ApiRequest::get(format!(
                "/api/settings/has_key/{}",
                path_segment(provider)
            )))
            .await?;
        Ok(status.exists)
    }
}

/// Bytes escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn path_segment(raw: &str) -> String {
    utf8_percent_encode(raw, SEGMENT).to_string()
}

pub fn analysis_path(session_id: &str, section: &str) -> String {
    format!("/api/analysis/{}/{}", path_segment(session_id), section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::stub::StubTransport;

    fn client(stub: &Arc<StubTransport>) -> ApiClient {
        ApiClient::new(stub.clone())
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(
            error_detail(br#"{"detail": "Session not found"}"#),
            Some("Session not found".to_string())
        );
        assert_eq!(error_detail(b""), None);
        assert_eq!(error_detail(b"<html>oops</html>"), None);
        assert_eq!(error_detail(br#"{"other": 1}"#), None);
        assert_eq!(
            error_detail(br#"{"detail": [{"loc": ["body"]}]}"#),
            Some(r#"[{"loc":["body"]}]"#.to_string())
        );
    }

    #[test]
    fn test_status_error_display_falls_back_to_status_text() {
        let err = RequestError::from_status(500, "Internal Server Error", b"");
        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(err.detail(), None);

        let err = RequestError::from_status(400, "Bad Request", br#"{"detail": "Unsupported file format"}"#);
        assert_eq!(err.to_string(), "Unsupported file format");
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_call_decodes_success() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(Method::Get, "/api/settings/has_key/gemini", 200, json!({"exists": true}));
        assert!(client(&stub).has_key("gemini").await.unwrap());
        assert_eq!(stub.call_count("/api/settings/has_key/gemini"), 1);
    }

    #[tokio::test]
    async fn test_call_reports_status_with_detail() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(
            Method::Get,
            "/api/analysis/s1/stats",
            500,
            json!({"detail": "Analysis Error: bad csv"}),
        );
        let err = client(&stub).stats("s1").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "Analysis Error: bad csv");
    }

    #[tokio::test]
    async fn test_call_reports_parse_failure_on_malformed_success() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_raw(Method::Get, "/api/analysis/s1/overview", 200, "OK", b"not json");
        let err = client(&stub).overview("s1").await.unwrap_err();
        assert!(matches!(err, RequestError::Parse(_)));
    }

    #[tokio::test]
    async fn test_call_surfaces_transport_failure() {
        let stub = Arc::new(StubTransport::new());
        stub.fail(Method::Get, "/api/files/list", "connection refused");
        let err = client(&stub).list_files().await.unwrap_err();
        assert_eq!(
            err,
            RequestError::Transport("connection refused".to_string())
        );
    }

    #[tokio::test]
    async fn test_summarize_posts_request_body() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(Method::Post, "/api/ai/summarize", 200, json!({"summary": "ok"}));
        let req = AiRequest {
            api_key: "k".to_string(),
            provider: "gemini".to_string(),
            prompt_type: crate::api::types::PromptType::Stats,
            context_data: json!({"Age": {"mean": 3.0}}),
        };
        let resp = client(&stub).summarize(&req).await.unwrap();
        assert_eq!(resp.summary, "ok");

        let calls = stub.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0].body {
            Body::Json(body) => {
                assert_eq!(body["prompt_type"], "stats");
                assert_eq!(body["context_data"]["Age"]["mean"], 3.0);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_opaque_ids_stay_in_one_segment() {
        assert_eq!(analysis_path("abc-123", "stats"), "/api/analysis/abc-123/stats");
        assert_eq!(
            analysis_path("x?y#z", "overview"),
            "/api/analysis/x%3Fy%23z/overview"
        );
        assert_eq!(analysis_path("a/b c", "stats"), "/api/analysis/a%2Fb%20c/stats");
    }

    #[test]
    fn test_http_transport_keeps_base_prefix() {
        let transport = HttpTransport::new("http://host/explorer").unwrap();
        let url = transport.url(&analysis_path("x?y#z", "overview")).unwrap();
        assert_eq!(url.path(), "/explorer/api/analysis/x%3Fy%23z/overview");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let root = HttpTransport::new("http://host:8000").unwrap();
        assert_eq!(
            root.url("/api/files/list").unwrap().as_str(),
            "http://host:8000/api/files/list"
        );
    }

    #[tokio::test]
    async fn test_has_key_encodes_provider() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(
            Method::Get,
            "/api/settings/has_key/open%20ai",
            200,
            json!({"exists": true}),
        );
        assert!(client(&stub).has_key("open ai").await.unwrap());
    }

    #[test]
    fn test_http_transport_rejects_bad_base() {
        assert!(HttpTransport::new("not a url").is_err());
    }
}
