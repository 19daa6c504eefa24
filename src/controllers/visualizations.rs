use async_trait::async_trait;
use std::sync::Mutex;

use super::{ControllerState, SectionController, StateCell};
use crate::api::{ApiClient, Chart};
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::page::{PageHandle, VIZ};
use crate::render::{render_chart_card, render_paragraph};

pub const VIZ_PLACEHOLDER: &str = "Could not generate visualizations.";

/// Chart cards. Any failure degrades to a placeholder; the section is
/// never reported as an error to the dashboard.
pub struct VisualizationsController {
    client: ApiClient,
    page: PageHandle,
    state: StateCell,
    charts: Mutex<Vec<Chart>>,
}

impl VisualizationsController {
    const NAME: &'static str = "visualizations";

    pub fn new(client: ApiClient, page: PageHandle) -> Self {
        Self {
            client,
            page,
            state: StateCell::default(),
            charts: Mutex::new(Vec::new()),
        }
    }

    /// Charts from the last successful load.
    pub fn charts(&self) -> Vec<Chart> {
        self.charts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SectionController for VisualizationsController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn state(&self) -> ControllerState {
        self.state.get()
    }

    async fn load(&self, session_id: &str) -> ControllerState {
        self.state.set(Self::NAME, session_id, ControllerState::Loading);

        let next = match self.client.visualizations(session_id).await {
            Ok(set) => {
                let cards: Vec<String> = set.charts.iter().map(render_chart_card).collect();
                for chart in &set.charts {
                    self.page.register_panel(&chart.key.panel_id(), VIZ);
                }
                self.page.set_html(VIZ, cards.join("\n"));
                *self.charts.lock().unwrap_or_else(|e| e.into_inner()) = set.charts;
                ControllerState::Rendered
            }
            Err(err) => {
                log(
                    Level::Warn,
                    Domain::Section,
                    "viz_degraded",
                    obj(&[("session_id", v_str(session_id)), ("msg", v_str(&err.to_string()))]),
                );
                self.page.set_html(VIZ, render_paragraph(VIZ_PLACEHOLDER));
                ControllerState::Degraded(VIZ_PLACEHOLDER.to_string())
            }
        };
        self.state.set(Self::NAME, session_id, next)
    }
}
