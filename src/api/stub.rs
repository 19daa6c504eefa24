use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

use super::client::{ApiRequest, Method, RawResponse, RequestError, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Respond(RawResponse),
    Fail(String),
}

#[derive(Clone)]
struct Route {
    reply: Reply,
    gate: Option<Arc<Barrier>>,
}

/// Scripted transport for running the client without a backend.
///
/// Unscripted routes answer `404 Not Found` with an empty body. Every
/// request is recorded in arrival order.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, method: Method, path: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let gate = routes
            .get(&(method, path.to_string()))
            .and_then(|r| r.gate.clone());
        routes.insert((method, path.to_string()), Route { reply, gate });
    }

    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: Value) {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default();
        self.respond_raw(method, path, status, status_text, body.to_string().as_bytes());
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, status_text: &str, body: &[u8]) {
        let raw = RawResponse {
            status,
            status_text: status_text.to_string(),
            body: body.to_vec(),
        };
        self.script(method, path, Reply::Respond(raw));
    }

    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.script(method, path, Reply::Fail(message.to_string()));
    }

    /// Hold replies on `path` until every party of `barrier` has arrived.
    pub fn gate(&self, method: Method, path: &str, barrier: Arc<Barrier>) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let route = routes.entry((method, path.to_string())).or_insert(Route {
            reply: Reply::Respond(not_found()),
            gate: None,
        });
        route.gate = Some(barrier);
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

fn not_found() -> RawResponse {
    RawResponse {
        status: 404,
        status_text: "Not Found".to_string(),
        body: Vec::new(),
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, RequestError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let route = self
            .routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(request.method, request.path.clone()))
            .cloned();

        let Some(route) = route else {
            return Ok(not_found());
        };
        if let Some(gate) = route.gate {
            gate.wait().await;
        }
        match route.reply {
            Reply::Respond(raw) => Ok(raw),
            Reply::Fail(message) => Err(RequestError::Transport(message)),
        }
    }
}
