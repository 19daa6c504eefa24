//! Section controllers: one load operation and one set of page regions each.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::logging::log_section;

mod overview;
mod stats;
mod visualizations;

pub use overview::{OverviewController, SESSION_EXPIRED_ALERT, UPLOAD_PAGE};
pub use stats::StatsController;
pub use visualizations::{VisualizationsController, VIZ_PLACEHOLDER};

/// `Idle -> Loading -> {Rendered | Degraded | Errored | Redirected}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    Loading,
    Rendered,
    /// Placeholder shown instead of content; not a failure to the caller.
    Degraded(String),
    /// Error text shown in the section.
    Errored(String),
    /// Navigation target after a blocking alert.
    Redirected(String),
}

impl ControllerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerState::Idle => "idle",
            ControllerState::Loading => "loading",
            ControllerState::Rendered => "rendered",
            ControllerState::Degraded(_) => "degraded",
            ControllerState::Errored(_) => "errored",
            ControllerState::Redirected(_) => "redirected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerState::Rendered
                | ControllerState::Degraded(_)
                | ControllerState::Errored(_)
                | ControllerState::Redirected(_)
        )
    }
}

/// A unit owning page regions and a single load per invocation.
///
/// `load` never fails: every outcome is rendered locally and reported as
/// the terminal state. Invoking it again starts over and overwrites the
/// regions.
#[async_trait]
pub trait SectionController: Send + Sync {
    fn name(&self) -> &'static str;

    fn state(&self) -> ControllerState;

    async fn load(&self, session_id: &str) -> ControllerState;
}

/// Current state of one controller, logging every transition.
#[derive(Debug, Default)]
pub(crate) struct StateCell {
    state: Mutex<ControllerState>,
}

impl StateCell {
    pub(crate) fn get(&self) -> ControllerState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub(crate) fn set(&self, section: &str, session_id: &str, next: ControllerState) -> ControllerState {
        let detail = match &next {
            ControllerState::Degraded(msg)
            | ControllerState::Errored(msg)
            | ControllerState::Redirected(msg) => Some(msg.as_str()),
            _ => None,
        };
        log_section(section, session_id, next.as_str(), detail);
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next.clone();
        next
    }
}
