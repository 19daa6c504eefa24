use std::sync::Arc;

use crate::api::ApiClient;
use crate::controllers::{
    ControllerState, OverviewController, SectionController, StatsController,
    VisualizationsController,
};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::page::PageHandle;
use crate::session::SessionContext;

/// Terminal state of each section after `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardReport {
    pub overview: ControllerState,
    pub stats: ControllerState,
    pub visualizations: ControllerState,
}

impl DashboardReport {
    /// Navigation demanded by a section, if any.
    pub fn redirect(&self) -> Option<&str> {
        [&self.overview, &self.stats, &self.visualizations]
            .into_iter()
            .find_map(|s| match s {
                ControllerState::Redirected(to) => Some(to.as_str()),
                _ => None,
            })
    }
}

/// Results page: three independent sections over one session context.
pub struct Dashboard {
    ctx: Arc<SessionContext>,
    overview: OverviewController,
    stats: StatsController,
    visualizations: VisualizationsController,
}

impl Dashboard {
    pub fn new(client: ApiClient, page: PageHandle, ctx: Arc<SessionContext>) -> Self {
        Self {
            overview: OverviewController::new(client.clone(), page.clone()),
            stats: StatsController::new(client.clone(), page.clone(), ctx.clone()),
            visualizations: VisualizationsController::new(client, page),
            ctx,
        }
    }

    pub fn visualizations(&self) -> &VisualizationsController {
        &self.visualizations
    }

    /// Record the session, then load all sections concurrently.
    ///
    /// No section waits on another; each renders as soon as its own
    /// response arrives and contains its own failure.
    pub async fn start(&self, session_id: &str) -> DashboardReport {
        self.ctx.record_session(session_id);
        log(
            Level::Info,
            Domain::System,
            "dashboard_start",
            obj(&[("session_id", v_str(session_id))]),
        );

        let (overview, stats, visualizations) = tokio::join!(
            self.overview.load(session_id),
            self.stats.load(session_id),
            self.visualizations.load(session_id),
        );

        log(
            Level::Info,
            Domain::System,
            "dashboard_done",
            obj(&[
                ("session_id", v_str(session_id)),
                (self.overview.name(), v_str(overview.as_str())),
                (self.stats.name(), v_str(stats.as_str())),
                (self.visualizations.name(), v_str(visualizations.as_str())),
            ]),
        );

        DashboardReport {
            overview,
            stats,
            visualizations,
        }
    }
}
