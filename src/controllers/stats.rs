use async_trait::async_trait;
use std::sync::Arc;

use super::{ControllerState, SectionController, StateCell};
use crate::api::ApiClient;
use crate::page::{PageHandle, MISSING, STATS};
use crate::render::{render_describe_table, render_error, render_error_note, render_missing};
use crate::session::SessionContext;

/// Missing-value panel and description table.
///
/// The first successful fetch per session is recorded in the session
/// context; both panels render from the recorded snapshot so every
/// consumer sees the same values.
pub struct StatsController {
    client: ApiClient,
    page: PageHandle,
    ctx: Arc<SessionContext>,
    state: StateCell,
}

impl StatsController {
    const NAME: &'static str = "stats";

    pub fn new(client: ApiClient, page: PageHandle, ctx: Arc<SessionContext>) -> Self {
        Self {
            client,
            page,
            ctx,
            state: StateCell::default(),
        }
    }
}

#[async_trait]
impl SectionController for StatsController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn state(&self) -> ControllerState {
        self.state.get()
    }

    async fn load(&self, session_id: &str) -> ControllerState {
        self.state.set(Self::NAME, session_id, ControllerState::Loading);

        let next = match self.client.stats(session_id).await {
            Ok(fetched) => {
                let snapshot = self.ctx.record_stats(session_id, fetched);
                self.page.set_html(MISSING, render_missing(&snapshot.missing_values));
                self.page.set_html(STATS, render_describe_table(&snapshot.description));
                ControllerState::Rendered
            }
            Err(err) => {
                let message = format!("Failed to load statistics: {}", err);
                self.page.set_html(STATS, render_error(&message));
                self.page.set_html(MISSING, render_error_note("Error loading missing info."));
                ControllerState::Errored(message)
            }
        };
        self.state.set(Self::NAME, session_id, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, StubTransport};
    use serde_json::json;

    const PATH: &str = "/api/analysis/s1/stats";

    fn payload() -> serde_json::Value {
        json!({
            "missing_values": {"count": {"Age": 0, "Income": 5}},
            "description": {
                "Age": {"count": 10.0, "mean": 40.5},
                "Income": {"count": 5.0, "mean": null}
            },
            "correlations": {"Age": {"Age": 1.0}}
        })
    }

    #[tokio::test]
    async fn test_renders_missing_and_description() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(Method::Get, PATH, 200, payload());
        let page = PageHandle::dashboard();
        let ctx = SessionContext::new();
        let ctl = StatsController::new(ApiClient::new(stub.clone()), page.clone(), ctx.clone());

        assert_eq!(ctl.load("s1").await, ControllerState::Rendered);

        let missing = page.html(MISSING).unwrap();
        assert!(!missing.contains("No missing values found!"));
        assert_eq!(missing.matches("<li>").count(), 1);
        assert!(missing.contains("Income"));

        let stats = page.html(STATS).unwrap();
        assert!(stats.contains("<td>40.50</td><td>-</td>"));
        assert!(ctx.stats().is_some());
    }

    #[tokio::test]
    async fn test_failure_leaves_snapshot_unset() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_raw(Method::Get, PATH, 500, "Internal Server Error", b"");
        let page = PageHandle::dashboard();
        let ctx = SessionContext::new();
        let ctl = StatsController::new(ApiClient::new(stub), page.clone(), ctx.clone());

        let state = ctl.load("s1").await;

        assert_eq!(
            state,
            ControllerState::Errored("Failed to load statistics: Internal Server Error".to_string())
        );
        assert!(page.html(MISSING).unwrap().contains("Error loading missing info."));
        assert!(ctx.stats().is_none());
    }

    #[tokio::test]
    async fn test_reload_keeps_first_snapshot() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(Method::Get, PATH, 200, payload());
        let page = PageHandle::dashboard();
        let ctx = SessionContext::new();
        let ctl = StatsController::new(ApiClient::new(stub.clone()), page.clone(), ctx.clone());
        ctl.load("s1").await;
        let first = ctx.stats().unwrap();

        stub.respond_json(
            Method::Get,
            PATH,
            200,
            json!({"missing_values": {"count": {}}, "description": {}}),
        );
        assert_eq!(ctl.load("s1").await, ControllerState::Rendered);

        assert!(Arc::ptr_eq(&first, &ctx.stats().unwrap()));
        assert!(page.html(MISSING).unwrap().contains("Income"));
        assert_eq!(stub.call_count(PATH), 2);
    }

    #[tokio::test]
    async fn test_new_session_renders_its_own_stats() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_json(Method::Get, PATH, 200, payload());
        stub.respond_json(
            Method::Get,
            "/api/analysis/s2/stats",
            200,
            json!({
                "missing_values": {"count": {"Weight": 7}},
                "description": {"Weight": {"mean": 70.0}}
            }),
        );
        let page = PageHandle::dashboard();
        let ctx = SessionContext::new();
        let ctl = StatsController::new(ApiClient::new(stub), page.clone(), ctx.clone());
        ctx.record_session("s1");
        ctl.load("s1").await;

        ctx.record_session("s2");
        assert_eq!(ctl.load("s2").await, ControllerState::Rendered);

        let missing = page.html(MISSING).unwrap();
        assert!(missing.contains("Weight"));
        assert!(!missing.contains("Income"));
        assert!(ctx.stats().unwrap().column("Weight").is_some());
    }
}
