//! Server-side HTML for the widget.
//!
//! Pages work as plain HTML forms; when htmx is loaded the form and excerpt
//! links swap only the `#results` section.

use std::fmt::Write as _;

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use serde::Deserialize;

use crate::advisor::Advisor;
use crate::widget::WidgetState;

/// How the reference list is shown under an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceLayout {
    /// Source names open the excerpt in a dismissible overlay.
    #[default]
    Modal,
    /// Each reference expands in place.
    Inline,
}

/// Presentation settings shared by every widget.
#[derive(Debug, Clone)]
pub struct WidgetView {
    pub title: String,
    pub layout: ReferenceLayout,
}

impl Default for WidgetView {
    fn default() -> Self {
        Self {
            title: "Jarvis".to_string(),
            layout: ReferenceLayout::default(),
        }
    }
}

/// Render markdown to HTML, dropping raw HTML from the source.
///
/// Link and image destinations with a scheme other than `http`, `https` or
/// `mailto` are emptied.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        })),
        other => Some(other),
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) { url } else { CowStr::Borrowed("") }
}

/// Relative URLs and `http`, `https` and `mailto` URLs.
fn is_safe_url(url: &str) -> bool {
    let Some(colon) = url.find(':') else {
        return true;
    };
    let scheme = &url[..colon];
    if scheme.contains(['/', '?', '#']) {
        return true;
    }
    // Browsers ignore whitespace and control characters inside a scheme.
    let scheme: String = scheme
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    matches!(scheme.as_str(), "http" | "https" | "mailto")
}

/// Escape text for use in HTML content and quoted attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Full page for a mounted widget.
#[must_use]
pub fn page(view: &WidgetView, widget_id: &str, state: &WidgetState, advisors: &[Advisor]) -> String {
    let content = format!(
        "{}\n{}",
        form(view, widget_id, state, advisors),
        results(view, widget_id, state)
    );
    html_shell(&view.title, &content)
}

/// Generate the HTML shell for the application.
fn html_shell(title: &str, content: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Chat with {title}</title>
    <script defer src="/static/vendor/htmx.min.js"></script>
    <link rel="stylesheet" href="/static/app.css">
    <style>
        .overlay {{ position: fixed; inset: 0; background: rgba(0,0,0,.5); display: flex; align-items: center; justify-content: center; }}
        .overlay-panel {{ background: #fff; padding: 20px; border-radius: 4px; max-width: 800px; max-height: 80vh; overflow-y: auto; }}
        .excerpt {{ white-space: pre-wrap; }}
    </style>
</head>
<body>
    <main id="app" class="chat-widget">
        <h1>Chat with {title}</h1>
        {content}
    </main>
</body>
</html>"#
    )
}

/// The question form.
#[must_use]
pub fn form(view: &WidgetView, widget_id: &str, state: &WidgetState, advisors: &[Advisor]) -> String {
    let action = format!("/widgets/{widget_id}/ask");
    let mut out = String::new();

    let _ = write!(
        out,
        r##"<form class="chat-form" method="post" action="{action}" hx-post="{action}" hx-target="#results" hx-swap="outerHTML" hx-on::before-request="const b = this.querySelector('button'); b.textContent = b.dataset.loadingLabel" hx-on::after-request="const b = this.querySelector('button'); b.textContent = b.dataset.idleLabel">"##
    );

    if advisors.len() > 1 {
        out.push_str(r#"<label for="advisor">Advisor:</label><select id="advisor" name="advisor">"#);
        for advisor in advisors {
            let selected = if *advisor == state.advisor { " selected" } else { "" };
            let _ = write!(
                out,
                r#"<option value="{}"{selected}>{}</option>"#,
                advisor.tag(),
                advisor.label()
            );
        }
        out.push_str("</select>");
    } else {
        let _ = write!(
            out,
            r#"<input type="hidden" name="advisor" value="{}">"#,
            state.advisor.tag()
        );
    }

    let _ = write!(
        out,
        r#"<label for="query">Your question:</label><textarea id="query" name="query" placeholder="Type your question here..." required>{}</textarea>"#,
        escape_html(&state.query)
    );

    let idle = escape_html(&format!("Ask {}", view.title));
    let loading = escape_html(&format!("Asking {}...", view.title));
    let label = if state.is_loading() { &loading } else { &idle };
    let _ = write!(
        out,
        r#"<button type="submit" data-idle-label="{idle}" data-loading-label="{loading}">{label}</button></form>"#
    );
    out
}

/// The `#results` section: answer, references and overlay.
#[must_use]
pub fn results(view: &WidgetView, widget_id: &str, state: &WidgetState) -> String {
    let mut out = String::from(r#"<section id="results" aria-live="polite">"#);

    if let Some(response) = state.response.as_deref().filter(|text| !text.is_empty()) {
        let _ = write!(
            out,
            r#"<div class="response"><h2>{}'s Response:</h2>{}</div>"#,
            escape_html(&view.title),
            markdown_to_html(response)
        );
    }

    if !state.references.is_empty() {
        out.push_str(&references(view.layout, widget_id, state));
    }

    if view.layout == ReferenceLayout::Modal {
        if let Some(text) = &state.displayed_excerpt {
            out.push_str(&excerpt_overlay(widget_id, text));
        }
    }

    out.push_str("</section>");
    out
}

fn references(layout: ReferenceLayout, widget_id: &str, state: &WidgetState) -> String {
    let mut out = String::from(r#"<div class="references"><h3>References:</h3><ul>"#);
    for (index, reference) in state.references.iter().enumerate() {
        let name = escape_html(&reference.source_name);
        match layout {
            ReferenceLayout::Modal => {
                let href = format!("/widgets/{widget_id}/excerpts/{index}");
                let _ = write!(
                    out,
                    r##"<li><a class="reference" href="{href}" hx-get="{href}" hx-target="#results" hx-swap="outerHTML">{name}</a></li>"##
                );
            }
            ReferenceLayout::Inline => {
                let _ = write!(
                    out,
                    r#"<li><details class="reference"><summary>{name}</summary><pre class="excerpt">{}</pre></details></li>"#,
                    escape_html(&reference.excerpt_text)
                );
            }
        }
    }
    out.push_str("</ul></div>");
    out
}

fn excerpt_overlay(widget_id: &str, text: &str) -> String {
    let close = format!("/widgets/{widget_id}/excerpts/close");
    format!(
        r##"<div class="overlay" hx-post="{close}" hx-trigger="click target:.overlay" hx-target="#results" hx-swap="outerHTML"><div class="overlay-panel" role="dialog" aria-modal="true"><pre class="excerpt">{}</pre><form method="post" action="{close}" hx-post="{close}" hx-target="#results" hx-swap="outerHTML"><button type="submit" class="close">Close</button></form></div></div>"##,
        escape_html(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::Answer;
    use crate::error::USER_FACING_ERROR;
    use crate::widget::WidgetEvent;

    fn answered(answer: Answer) -> WidgetState {
        WidgetState::default()
            .apply(WidgetEvent::SubmitStarted)
            .apply(WidgetEvent::SubmitSucceeded(answer))
    }

    #[test]
    fn test_markdown_rendered_and_raw_html_dropped() {
        let html = markdown_to_html("**hi** <script>alert(1)</script>");
        assert!(html.contains("<strong>hi</strong>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_script_links_are_emptied() {
        let html = markdown_to_html("[click](javascript:alert(document.cookie))");
        assert!(html.contains(r#"<a href="">click</a>"#));
        assert!(!html.contains("javascript"));

        let html = markdown_to_html("![x](JavaScript:alert(1)) <data:text/html,hi>");
        assert!(!html.to_lowercase().contains("javascript"));
        assert!(!html.contains(r#"href="data:"#));
    }

    #[test]
    fn test_safe_links_are_kept() {
        let html = markdown_to_html(
            "[a](https://example.com/x) [b](mailto:a@b.c) [c](/docs/readme.md) [d](#top) [e](docs/a:b)",
        );
        assert!(html.contains(r#"href="https://example.com/x""#));
        assert!(html.contains(r#"href="mailto:a@b.c""#));
        assert!(html.contains(r#"href="/docs/readme.md""#));
        assert!(html.contains(r##"href="#top""##));
        assert!(html.contains(r#"href="docs/a:b""#));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_results_without_references() {
        let view = WidgetView::default();
        let html = results(&view, "w", &answered(Answer::text("**hi**")));
        assert!(html.contains("<strong>hi</strong>"));
        assert!(!html.contains("References:"));
    }

    #[test]
    fn test_modal_reference_links_to_excerpt() {
        let view = WidgetView::default();
        let state = answered(Answer::text("ok").with_reference("a.txt", "excerpt A"));
        let html = results(&view, "w", &state);
        assert!(html.contains(r#"href="/widgets/w/excerpts/0""#));
        assert!(html.contains(">a.txt</a>"));
        assert!(!html.contains("excerpt A"));

        let opened = state.apply(WidgetEvent::ExcerptOpened("excerpt A".into()));
        let html = results(&view, "w", &opened);
        assert!(html.contains(r#"<pre class="excerpt">excerpt A</pre>"#));
        assert!(html.contains("/widgets/w/excerpts/close"));
    }

    #[test]
    fn test_inline_reference_shows_excerpt_in_place() {
        let view = WidgetView {
            layout: ReferenceLayout::Inline,
            ..WidgetView::default()
        };
        let state = answered(Answer::text("ok").with_reference("a.txt", "<b>A</b>"));
        let html = results(&view, "w", &state);
        assert!(html.contains("<summary>a.txt</summary>"));
        assert!(html.contains("&lt;b&gt;A&lt;/b&gt;"));
    }

    #[test]
    fn test_empty_response_hides_response_block() {
        let html = results(&WidgetView::default(), "w", &answered(Answer::text("")));
        assert!(!html.contains("Response:"));
    }

    #[test]
    fn test_failure_renders_fixed_message() {
        let state = WidgetState::default()
            .apply(WidgetEvent::SubmitStarted)
            .apply(WidgetEvent::SubmitFailed);
        let html = results(&WidgetView::default(), "w", &state);
        assert!(html.contains(USER_FACING_ERROR));
        assert!(!html.contains("References:"));
    }

    #[test]
    fn test_selector_only_for_multiple_advisors() {
        let view = WidgetView::default();
        let state = WidgetState::new(Advisor::SolutionArchitect);

        let single = form(&view, "w", &state, &[Advisor::SolutionArchitect]);
        assert!(!single.contains("<select"));
        assert!(single.contains(r#"name="advisor" value="solution-architect""#));
        assert!(single.contains("required"));

        let multi = form(&view, "w", &state, &Advisor::ALL);
        assert!(multi.contains("<select"));
        assert!(multi.contains(r#"<option value="solution-architect" selected>"#));
    }

    #[test]
    fn test_button_reflects_loading() {
        let view = WidgetView::default();
        let loading = WidgetState::default().apply(WidgetEvent::SubmitStarted);
        assert!(form(&view, "w", &loading, &[Advisor::default()]).contains(">Asking Jarvis...<"));
        assert!(form(&view, "w", &WidgetState::default(), &[Advisor::default()]).contains(">Ask Jarvis<"));
    }
}
