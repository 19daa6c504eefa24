//! Typed payloads for each backend endpoint.
//!
//! Every response is decoded here once, so rendering code can rely on the
//! fields being present.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON object that keeps the server's key order.
pub type OrderedMap<V> = IndexMap<String, V>;

// =============================================================================
// Analysis payloads
// =============================================================================

/// One sample row: column name -> cell value, in column order.
pub type Row = OrderedMap<Value>;

/// Stat name -> value for one column. `None` is a null on the wire.
pub type ColumnStats = OrderedMap<Option<f64>>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Overview {
    /// (rows, columns)
    pub shape: (u64, u64),
    pub info: DatasetInfo,
    pub head: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetInfo {
    /// Bytes.
    pub memory_usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    pub count: OrderedMap<u64>,
}

impl MissingValues {
    /// Columns with at least one missing value, in column order.
    pub fn with_missing(&self) -> impl Iterator<Item = (&str, u64)> {
        self.count.iter().filter(|(_, n)| **n > 0).map(|(c, n)| (c.as_str(), *n))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub missing_values: MissingValues,
    pub description: OrderedMap<ColumnStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlations: Option<Value>,
}

impl StatsSnapshot {
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.description.get(name)
    }
}

// =============================================================================
// Visualizations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Histogram,
    BarChart,
    Heatmap,
    Chart,
}

impl ChartKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Histogram => "Histogram",
            ChartKind::BarChart => "Bar Chart",
            ChartKind::Heatmap => "Heatmap",
            ChartKind::Chart => "Chart",
        }
    }
}

/// Chart key as generated by the backend, parsed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartKey {
    Histogram(String),
    BarChart(String),
    CorrelationHeatmap,
    /// Any key the backend adds that has no known prefix.
    Other(String),
}

impl ChartKey {
    pub fn parse(raw: &str) -> Self {
        if let Some(col) = raw.strip_prefix("hist_") {
            ChartKey::Histogram(col.to_string())
        } else if let Some(col) = raw.strip_prefix("bar_") {
            ChartKey::BarChart(col.to_string())
        } else if raw == "correlation_heatmap" {
            ChartKey::CorrelationHeatmap
        } else {
            ChartKey::Other(raw.to_string())
        }
    }

    /// The key exactly as the backend sent it.
    pub fn raw(&self) -> String {
        match self {
            ChartKey::Histogram(col) => format!("hist_{col}"),
            ChartKey::BarChart(col) => format!("bar_{col}"),
            ChartKey::CorrelationHeatmap => "correlation_heatmap".to_string(),
            ChartKey::Other(raw) => raw.clone(),
        }
    }

    pub fn title(&self) -> String {
        match self {
            ChartKey::Histogram(col) => format!("Distribution of {col}"),
            ChartKey::BarChart(col) => format!("Categories in {col}"),
            ChartKey::CorrelationHeatmap => "Correlation Heatmap".to_string(),
            ChartKey::Other(raw) => raw.clone(),
        }
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            ChartKey::Histogram(_) => ChartKind::Histogram,
            ChartKey::BarChart(_) => ChartKind::BarChart,
            ChartKey::CorrelationHeatmap => ChartKind::Heatmap,
            ChartKey::Other(_) => ChartKind::Chart,
        }
    }

    /// Column the chart describes; empty for whole-dataset charts.
    pub fn column(&self) -> &str {
        match self {
            ChartKey::Histogram(col) | ChartKey::BarChart(col) => col,
            ChartKey::CorrelationHeatmap | ChartKey::Other(_) => "",
        }
    }

    /// Region id of the AI panel attached to this chart's card.
    pub fn panel_id(&self) -> String {
        format!("ai-viz-{}", self.raw())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub key: ChartKey,
    /// Embedded image, usually a `data:image/png;base64,...` URI.
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "OrderedMap<String>")]
pub struct VisualizationSet {
    pub charts: Vec<Chart>,
}

impl From<OrderedMap<String>> for VisualizationSet {
    fn from(raw: OrderedMap<String>) -> Self {
        let charts = raw
            .iter()
            .map(|(key, src)| Chart {
                key: ChartKey::parse(key),
                src: src.clone(),
            })
            .collect();
        Self { charts }
    }
}

// =============================================================================
// Upload, AI and settings payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadReceipt {
    pub session_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Overview,
    Stats,
    Missing,
    Visualization,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::Overview => "overview",
            PromptType::Stats => "stats",
            PromptType::Missing => "missing",
            PromptType::Visualization => "visualization",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "overview" => Some(PromptType::Overview),
            "stats" => Some(PromptType::Stats),
            "missing" => Some(PromptType::Missing),
            "visualization" => Some(PromptType::Visualization),
            _ => None,
        }
    }
}

/// Body of `POST /api/ai/summarize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiRequest {
    /// Empty when the caller has no key; the server then uses its stored key.
    pub api_key: String,
    pub provider: String,
    pub prompt_type: PromptType,
    pub context_data: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileEntry {
    pub session_id: String,
    pub name: String,
    pub filename: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeyStatus {
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
