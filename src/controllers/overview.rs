use async_trait::async_trait;

use super::{ControllerState, SectionController, StateCell};
use crate::api::ApiClient;
use crate::page::{PageHandle, HEAD, INFO};
use crate::render::{render_error, render_error_note, render_info, render_table};

pub const SESSION_EXPIRED_ALERT: &str = "Session expired. Please upload again.";
pub const UPLOAD_PAGE: &str = "/upload";

/// Dataset shape, memory usage and sample rows.
///
/// A 404 means the session is gone: the user is alerted and sent back to
/// the upload page instead of seeing an inline error.
pub struct OverviewController {
    client: ApiClient,
    page: PageHandle,
    state: StateCell,
}

impl OverviewController {
    const NAME: &'static str = "overview";

    pub fn new(client: ApiClient, page: PageHandle) -> Self {
        Self {
            client,
            page,
            state: StateCell::default(),
        }
    }
}

#[async_trait]
impl SectionController for OverviewController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn state(&self) -> ControllerState {
        self.state.get()
    }

    async fn load(&self, session_id: &str) -> ControllerState {
        self.state.set(Self::NAME, session_id, ControllerState::Loading);

        let next = match self.client.overview(session_id).await {
            Ok(overview) => {
                self.page.set_html(INFO, render_info(&overview));
                self.page.set_html(HEAD, render_table(&overview.head));
                ControllerState::Rendered
            }
            Err(err) if err.is_not_found() => {
                self.page.alert(SESSION_EXPIRED_ALERT);
                self.page.navigate(UPLOAD_PAGE);
                ControllerState::Redirected(UPLOAD_PAGE.to_string())
            }
            Err(err) => {
                let message = format!("Failed to load overview: {}", err);
                self.page.set_html(INFO, render_error(&message));
                self.page.set_html(HEAD, render_error_note("Error loading data sample."));
                ControllerState::Errored(message)
            }
        };
        self.state.set(Self::NAME, session_id, next)
    }
}
