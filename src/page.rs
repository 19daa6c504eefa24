//! In-memory page: the named regions controllers render into.
//!
//! Each region holds markup plus the two display flags the AI panels
//! toggle on. Blocking alerts and navigations are recorded on the page so
//! the caller (CLI or test) can act on them.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::render::{html_escape, render_ai_panel};

pub const INFO: &str = "info-container";
pub const HEAD: &str = "head-container";
pub const MISSING: &str = "missing-container";
pub const STATS: &str = "stats-container";
pub const VIZ: &str = "viz-container";
pub const AI_CONTENT: &str = "ai-content";
pub const AI_LOADING: &str = "ai-loading";
pub const AI_MISSING: &str = "ai-missing";
pub const AI_STATS: &str = "ai-stats";
pub const LOADER: &str = "loader";
pub const ERROR_MESSAGE: &str = "error-message";

/// Regions of the results page, in display order.
pub const DASHBOARD_LAYOUT: &[(&str, bool)] = &[
    (INFO, true),
    (HEAD, true),
    (MISSING, true),
    (AI_MISSING, false),
    (STATS, true),
    (AI_STATS, false),
    (VIZ, true),
    (AI_LOADING, false),
    (AI_CONTENT, true),
];

/// Regions of the upload page.
pub const UPLOAD_LAYOUT: &[(&str, bool)] = &[(LOADER, false), (ERROR_MESSAGE, false)];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub html: String,
    pub visible: bool,
    pub active: bool,
    /// Region whose markup holds this panel's element, if nested.
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    regions: Vec<(String, Region)>,
    alerts: Vec<String>,
    location: Option<String>,
}

impl Page {
    pub fn with_layout(layout: &[(&str, bool)]) -> Self {
        let mut page = Self::default();
        for (id, visible) in layout {
            page.region_mut(id).visible = *visible;
        }
        page
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|(k, _)| k == id).map(|(_, r)| r)
    }

    /// Region by id, created visible and empty on first use.
    fn region_mut(&mut self, id: &str) -> &mut Region {
        let pos = match self.regions.iter().position(|(k, _)| k == id) {
            Some(pos) => pos,
            None => {
                self.regions.push((
                    id.to_string(),
                    Region {
                        visible: true,
                        ..Region::default()
                    },
                ));
                self.regions.len() - 1
            }
        };
        &mut self.regions[pos].1
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Standalone document with every top-level region in layout order.
    /// Nested panels are written in place inside their parent's markup.
    pub fn to_html(&self, title: &str) -> String {
        let mut body = String::new();
        for (id, region) in self.regions.iter().filter(|(_, r)| r.parent.is_none()) {
            let style = if region.visible { "" } else { r#" style="display:none""# };
            let class = if region.active { r#" class="active""# } else { "" };
            body.push_str(&format!(
                "<section id=\"{}\"{}{}>\n{}\n</section>\n",
                html_escape(id),
                class,
                style,
                self.with_panels(id, &region.html)
            ));
        }
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
            html_escape(title),
            body
        )
    }

    /// Replace each empty panel element in `html` with the panel's state.
    fn with_panels(&self, parent: &str, html: &str) -> String {
        let mut out = html.to_string();
        for (id, panel) in &self.regions {
            if panel.parent.as_deref() != Some(parent) {
                continue;
            }
            out = out.replacen(
                &render_ai_panel(id, "", false, false),
                &render_ai_panel(id, &panel.html, panel.visible, panel.active),
                1,
            );
        }
        out
    }
}

/// Shared handle to one page. Locks are never held across an await.
#[derive(Debug, Clone, Default)]
pub struct PageHandle {
    inner: Arc<Mutex<Page>>,
}

impl PageHandle {
    pub fn new(page: Page) -> Self {
        Self {
            inner: Arc::new(Mutex::new(page)),
        }
    }

    pub fn dashboard() -> Self {
        Self::new(Page::with_layout(DASHBOARD_LAYOUT))
    }

    pub fn upload() -> Self {
        Self::new(Page::with_layout(UPLOAD_LAYOUT))
    }

    fn lock(&self) -> MutexGuard<'_, Page> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace a region's markup entirely.
    pub fn set_html(&self, id: &str, html: impl Into<String>) {
        self.lock().region_mut(id).html = html.into();
    }

    /// Add a hidden, empty panel nested in `parent` if it does not exist
    /// yet.
    pub fn register_panel(&self, id: &str, parent: &str) {
        let mut page = self.lock();
        if page.region(id).is_none() {
            let panel = page.region_mut(id);
            panel.visible = false;
            panel.parent = Some(parent.to_string());
        }
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.lock().region(id).map(|r| r.html.clone())
    }

    pub fn region(&self, id: &str) -> Option<Region> {
        self.lock().region(id).cloned()
    }

    pub fn set_visible(&self, id: &str, visible: bool) {
        self.lock().region_mut(id).visible = visible;
    }

    pub fn set_active(&self, id: &str, active: bool) {
        self.lock().region_mut(id).active = active;
    }

    /// Visible and active: the panel currently shows AI content.
    pub fn is_showing_active(&self, id: &str) -> bool {
        self.lock()
            .region(id)
            .map(|r| r.visible && r.active)
            .unwrap_or(false)
    }

    /// Blocking user interruption.
    pub fn alert(&self, message: &str) {
        self.lock().alerts.push(message.to_string());
    }

    pub fn navigate(&self, location: &str) {
        self.lock().location = Some(location.to_string());
    }

    pub fn location(&self) -> Option<String> {
        self.lock().location.clone()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.lock().alerts.clone()
    }

    pub fn snapshot(&self) -> Page {
        self.lock().clone()
    }

    pub async fn write_html(&self, path: impl AsRef<Path>, title: &str) -> std::io::Result<()> {
        let html = self.lock().to_html(title);
        tokio::fs::write(path, html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_visibility() {
        let page = PageHandle::dashboard();
        assert!(page.region(INFO).unwrap().visible);
        assert!(!page.region(AI_STATS).unwrap().visible);
        assert_eq!(page.html(VIZ).as_deref(), Some(""));
    }

    #[test]
    fn test_set_html_replaces_content() {
        let page = PageHandle::dashboard();
        page.set_html(STATS, "<p>one</p>");
        page.set_html(STATS, "<p>two</p>");
        assert_eq!(page.html(STATS).as_deref(), Some("<p>two</p>"));
    }

    #[test]
    fn test_register_panel_is_hidden_and_idempotent() {
        let page = PageHandle::dashboard();
        page.register_panel("ai-viz-hist_Age", VIZ);
        assert!(!page.region("ai-viz-hist_Age").unwrap().visible);
        page.set_visible("ai-viz-hist_Age", true);
        page.register_panel("ai-viz-hist_Age", VIZ);
        let panel = page.region("ai-viz-hist_Age").unwrap();
        assert!(panel.visible);
        assert_eq!(panel.parent.as_deref(), Some(VIZ));
    }

    #[test]
    fn test_nested_panel_exported_inside_parent() {
        let page = PageHandle::dashboard();
        page.set_html(
            VIZ,
            format!("<div class=\"card\">{}</div>", render_ai_panel("ai-viz-x", "", false, false)),
        );
        page.register_panel("ai-viz-x", VIZ);
        page.set_visible("ai-viz-x", true);
        page.set_active("ai-viz-x", true);
        page.set_html("ai-viz-x", "<p>summary</p>");

        let html = page.snapshot().to_html("Results");

        assert_eq!(html.matches(r#"id="ai-viz-x""#).count(), 1);
        assert!(!html.contains(r#"<section id="ai-viz-x""#));
        assert!(html.contains(
            r#"<div class="card"><div id="ai-viz-x" class="ai-summary-box active"><p>summary</p></div></div>"#
        ));
    }

    #[test]
    fn test_showing_active_needs_both_flags() {
        let page = PageHandle::dashboard();
        page.set_visible(AI_MISSING, true);
        assert!(!page.is_showing_active(AI_MISSING));
        page.set_active(AI_MISSING, true);
        assert!(page.is_showing_active(AI_MISSING));
        assert!(!page.is_showing_active("no-such-region"));
    }

    #[test]
    fn test_to_html_hides_invisible_regions() {
        let page = PageHandle::dashboard();
        page.set_html(INFO, "<p>Rows</p>");
        let html = page.snapshot().to_html("Results <1>");
        assert!(html.contains("<title>Results &lt;1&gt;</title>"));
        assert!(html.contains("<section id=\"info-container\">\n<p>Rows</p>"));
        assert!(html.contains(r#"<section id="ai-stats" style="display:none">"#));
    }

    #[tokio::test]
    async fn test_write_html_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        let page = PageHandle::dashboard();
        page.set_html(VIZ, "<p>charts</p>");
        page.write_html(&path, "Results").await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<p>charts</p>"));
    }
}
