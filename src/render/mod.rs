//! Markup rendering for dashboard sections.
//!
//! Pure functions only: payload in, HTML string out. All text coming from
//! the backend is escaped before it is placed into markup.

pub mod markdown;

use serde_json::Value;

use crate::api::types::{Chart, ColumnStats, MissingValues, OrderedMap, Overview, Row};

pub const NO_MISSING_VALUES: &str = "<p>No missing values found!</p>";
pub const NO_DATA: &str = "<p>No data available.</p>";
pub const NO_STATS: &str = "<p>No statistics available.</p>";
const NULL_CELL: &str = r#"<span style="color:#ccc">NaN</span>"#;

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Inline error paragraph, e.g. `Error: Failed to load overview: ...`.
pub fn render_error(message: &str) -> String {
    format!(r#"<p style="color:red">Error: {}</p>"#, html_escape(message))
}

/// Inline error span used inside AI panels.
pub fn render_inline_error(message: &str) -> String {
    format!(r#"<span style="color:red">Error: {}</span>"#, html_escape(message))
}

/// Red paragraph with fixed text and no `Error:` prefix.
pub fn render_error_note(text: &str) -> String {
    format!(r#"<p style="color:red">{}</p>"#, html_escape(text))
}

pub fn render_paragraph(text: &str) -> String {
    format!("<p>{}</p>", html_escape(text))
}

/// Row count, column count and memory footprint.
pub fn render_info(overview: &Overview) -> String {
    let (rows, cols) = overview.shape;
    format!(
        "<p><strong>Rows:</strong> {}</p>\n<p><strong>Columns:</strong> {}</p>\n<p><strong>Memory Usage:</strong> {:.2} KB</p>",
        rows,
        cols,
        overview.info.memory_usage / 1024.0
    )
}

/// Sample rows as a table. Columns come from the first row.
pub fn render_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return NO_DATA.to_string();
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut html = String::from("<table><thead><tr>");
    for h in &headers {
        html.push_str(&format!("<th>{}</th>", html_escape(h)));
    }
    html.push_str("</tr></thead><tbody>");

    for row in rows {
        html.push_str("<tr>");
        for h in &headers {
            let cell = match row.get(*h) {
                None | Some(Value::Null) => NULL_CELL.to_string(),
                Some(value) => html_escape(&display_value(value)),
            };
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html
}

/// Display form of a cell: strings unquoted, integral floats without `.0`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// List of columns with missing values, or a notice when there are none.
pub fn render_missing(missing: &MissingValues) -> String {
    let items: Vec<String> = missing
        .with_missing()
        .map(|(col, count)| format!("<li><strong>{}:</strong> {}</li>", html_escape(col), count))
        .collect();

    if items.is_empty() {
        return NO_MISSING_VALUES.to_string();
    }
    format!("<ul>{}</ul>", items.concat())
}

/// Statistics table: one row per stat, one column per dataset column.
/// Stat names come from the first column.
pub fn render_describe_table(description: &OrderedMap<ColumnStats>) -> String {
    let Some((_, first)) = description.iter().next() else {
        return NO_STATS.to_string();
    };
    let stat_names: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut html = String::from("<table><thead><tr><th>Stat</th>");
    for col in description.keys() {
        html.push_str(&format!("<th>{}</th>", html_escape(col)));
    }
    html.push_str("</tr></thead><tbody>");

    for stat in stat_names {
        html.push_str(&format!("<tr><td><strong>{}</strong></td>", html_escape(stat)));
        for (_, stats) in description.iter() {
            html.push_str(&format!("<td>{}</td>", format_stat(stats.get(stat))));
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html
}

/// Two decimals, or `-` for null and absent values.
pub fn format_stat(value: Option<&Option<f64>>) -> String {
    match value {
        Some(Some(v)) => format!("{:.2}", v),
        _ => "-".to_string(),
    }
}

/// AI panel element nested in a card. Cards are built with the hidden,
/// empty form; the page fills it with the panel's state on export.
pub fn render_ai_panel(id: &str, html: &str, visible: bool, active: bool) -> String {
    let class = if active { "ai-summary-box active" } else { "ai-summary-box" };
    let style = if visible { "" } else { r#" style="display:none""# };
    format!(
        r#"<div id="{}" class="{}"{}>{}</div>"#,
        html_escape(id),
        class,
        style,
        html
    )
}

/// One chart card: title with an explain button, the image, and an empty
/// AI panel.
pub fn render_chart_card(chart: &Chart) -> String {
    let panel_id = chart.key.panel_id();
    format!(
        r#"<div class="card">
    <div class="card-title">
        {title}
        <button class="ai-btn" data-column="{column}" data-kind="{kind}" data-target="{target}">✨</button>
    </div>
    <img src="{src}" class="viz-img" alt="{raw}">
    {panel}
</div>"#,
        title = html_escape(&chart.key.title()),
        column = html_escape(chart.key.column()),
        kind = chart.key.kind().label(),
        target = html_escape(&panel_id),
        src = html_escape(&chart.src),
        raw = html_escape(&chart.key.raw()),
        panel = render_ai_panel(&panel_id, "", false, false),
    )
}
