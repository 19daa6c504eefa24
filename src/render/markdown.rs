use pulldown_cmark::{html, Event, Options, Parser};

/// Render AI summary markdown to HTML that is safe to embed.
///
/// Raw HTML in the source is emitted as escaped text.
pub fn to_safe_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_markdown() {
        let html = to_safe_html("# Insights\n\n- **Age** skews right\n- Income has gaps\n");
        assert!(html.contains("<h1>Insights</h1>"));
        assert!(html.contains("<li><strong>Age</strong> skews right</li>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = to_safe_html("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_tables_enabled() {
        let html = to_safe_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }
}
