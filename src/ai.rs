//! "Explain this" requests routed to the summarization endpoint.
//!
//! Every action builds a fresh [`AiRequest`] from a slice of the session's
//! statistics and renders the returned markdown into one panel region.
//! Invoking an action on a panel that already shows content collapses it
//! without touching the network.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{AiRequest, ApiClient, Chart, ChartKind, PromptType};
use crate::logging::log_ai;
use crate::page::{PageHandle, AI_CONTENT, AI_LOADING, AI_MISSING, AI_STATS};
use crate::render::markdown::to_safe_html;
use crate::render::{html_escape, render_inline_error};
use crate::session::SessionContext;

pub const DEFAULT_PROVIDER: &str = "gemini";
const THINKING: &str = "Thinking... (AI is analyzing data)";
const OVERVIEW_NOTE: &str = "Please provide a general overview of the dataset.";

/// Which slice of the statistics grounds the request.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSelector {
    /// The whole description table.
    Description,
    /// The `missing_values` object.
    MissingValues,
    /// One column's statistics plus the chart kind it is drawn as.
    Column { column: String, kind: ChartKind },
    /// Description table when loaded, otherwise a generic note.
    Overview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOutcome {
    /// Panel was showing content and is now hidden. No request was made.
    Collapsed,
    Rendered,
    Failed(String),
}

pub struct AiBridge {
    client: ApiClient,
    page: PageHandle,
    ctx: Arc<SessionContext>,
    api_key: Option<String>,
    provider: String,
}

impl AiBridge {
    pub fn new(client: ApiClient, page: PageHandle, ctx: Arc<SessionContext>) -> Self {
        Self {
            client,
            page,
            ctx,
            api_key: None,
            provider: DEFAULT_PROVIDER.to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Context payload for `selector` from the recorded snapshot.
    pub fn context_for(&self, selector: &ContextSelector) -> Result<Value, String> {
        let stats = self.ctx.stats();
        let context = match selector {
            ContextSelector::Description => {
                let stats = stats.ok_or("statistics have not been loaded")?;
                serde_json::to_value(&stats.description)
            }
            ContextSelector::MissingValues => {
                let stats = stats.ok_or("statistics have not been loaded")?;
                serde_json::to_value(&stats.missing_values)
            }
            ContextSelector::Column { column, kind } => {
                let column_stats = stats
                    .as_deref()
                    .and_then(|s| s.column(column))
                    .map(serde_json::to_value)
                    .transpose()
                    .map_err(|e| e.to_string())?
                    .unwrap_or_else(|| json!({}));
                Ok(json!({
                    "column": column,
                    "type": kind.label(),
                    "stats": column_stats,
                }))
            }
            ContextSelector::Overview => match stats {
                Some(stats) => serde_json::to_value(&stats.description),
                None => Ok(json!({ "note": OVERVIEW_NOTE })),
            },
        };
        context.map_err(|e| e.to_string())
    }

    pub fn build_request(
        &self,
        prompt_type: PromptType,
        selector: &ContextSelector,
    ) -> Result<AiRequest, String> {
        Ok(AiRequest {
            api_key: self.api_key.clone().unwrap_or_default(),
            provider: self.provider.clone(),
            prompt_type,
            context_data: self.context_for(selector)?,
        })
    }

    /// Toggle `target`: collapse it if it shows content, otherwise request
    /// a summary and render it there.
    pub async fn summarize(
        &self,
        prompt_type: PromptType,
        selector: ContextSelector,
        target: &str,
    ) -> PanelOutcome {
        if self.page.is_showing_active(target) {
            self.page.set_visible(target, false);
            self.page.set_active(target, false);
            log_ai("collapse", prompt_type.as_str(), target);
            return PanelOutcome::Collapsed;
        }

        self.page.set_visible(target, true);
        self.page.set_active(target, true);
        let placeholder = match &selector {
            ContextSelector::Column { kind, .. } => format!("Analyzing {}...", kind.label()),
            _ => THINKING.to_string(),
        };
        self.page.set_html(target, html_escape(&placeholder));

        match self.build_request(prompt_type, &selector) {
            Ok(request) => self.send(&request, target).await,
            Err(message) => {
                self.page.set_html(target, render_inline_error(&message));
                PanelOutcome::Failed(message)
            }
        }
    }

    /// Section panels next to the missing-values list and stats table.
    pub async fn explain_section(&self, prompt_type: PromptType) -> PanelOutcome {
        match prompt_type {
            PromptType::Missing => {
                self.summarize(prompt_type, ContextSelector::MissingValues, AI_MISSING)
                    .await
            }
            PromptType::Stats => {
                self.summarize(prompt_type, ContextSelector::Description, AI_STATS)
                    .await
            }
            PromptType::Overview => self.generate_summary().await,
            PromptType::Visualization => PanelOutcome::Failed(
                "visualization prompts need a chart; use explain_chart".to_string(),
            ),
        }
    }

    /// Panel attached to one chart card.
    pub async fn explain_chart(&self, chart: &Chart) -> PanelOutcome {
        let selector = ContextSelector::Column {
            column: chart.key.column().to_string(),
            kind: chart.key.kind(),
        };
        self.summarize(PromptType::Visualization, selector, &chart.key.panel_id())
            .await
    }

    /// Whole-dataset summary. Always requests; never collapses.
    pub async fn generate_summary(&self) -> PanelOutcome {
        self.page.set_visible(AI_LOADING, true);
        self.page.set_html(AI_CONTENT, "Thinking...");

        let outcome = match self.build_request(PromptType::Overview, &ContextSelector::Overview) {
            Ok(request) => self.send(&request, AI_CONTENT).await,
            Err(message) => {
                self.page.set_html(AI_CONTENT, render_inline_error(&message));
                PanelOutcome::Failed(message)
            }
        };

        self.page.set_visible(AI_LOADING, false);
        outcome
    }

    async fn send(&self, request: &AiRequest, target: &str) -> PanelOutcome {
        log_ai("request", request.prompt_type.as_str(), target);
        match self.client.summarize(request).await {
            Ok(resp) => {
                self.page.set_html(target, to_safe_html(&resp.summary));
                PanelOutcome::Rendered
            }
            Err(err) => {
                let message = err.to_string();
                log_ai("failed", request.prompt_type.as_str(), target);
                self.page.set_html(target, render_inline_error(&message));
                PanelOutcome::Failed(message)
            }
        }
    }
}
