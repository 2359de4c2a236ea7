// src/markdown.rs
use pulldown_cmark::{html, Event, Options, Parser};
use std::sync::Arc;

use crate::page::{Element, Page};

/// Converts raw (possibly Markdown) text into HTML that is safe to insert.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
    fn sanitize(&self, html: &str) -> String;

    fn to_safe_html(&self, source: &str) -> String {
        self.sanitize(&self.render(source))
    }

    /// False when `sanitize` passes HTML through unchanged.
    fn is_sanitizing(&self) -> bool {
        true
    }
}

/// CommonMark with GFM extensions; single newlines become `<br />`.
#[derive(Debug, Clone)]
pub struct CommonMarkRenderer {
    options: Options,
    hard_breaks: bool,
    sanitize: bool,
}

impl CommonMarkRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self {
            options,
            hard_breaks: true,
            sanitize: true,
        }
    }

    /// Markdown conversion without the HTML cleaner.
    pub fn unsanitized() -> Self {
        Self {
            sanitize: false,
            ..Self::new()
        }
    }
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, source: &str) -> String {
        let hard_breaks = self.hard_breaks;
        let parser = Parser::new_ext(source, self.options).map(|event| match event {
            Event::SoftBreak if hard_breaks => Event::HardBreak,
            other => other,
        });
        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }

    fn sanitize(&self, html: &str) -> String {
        if self.sanitize {
            ammonia::clean(html)
        } else {
            html.to_string()
        }
    }

    fn is_sanitizing(&self) -> bool {
        self.sanitize
    }
}

/// Passes text through untouched. Used when Markdown support is switched off;
/// the output is NOT sanitized.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl MarkdownRenderer for PlainRenderer {
    fn render(&self, source: &str) -> String {
        source.to_string()
    }

    fn sanitize(&self, html: &str) -> String {
        html.to_string()
    }

    fn is_sanitizing(&self) -> bool {
        false
    }
}

/// Pick the renderer once at startup.
pub fn renderer_for(markdown_enabled: bool, sanitize_enabled: bool) -> Arc<dyn MarkdownRenderer> {
    match (markdown_enabled, sanitize_enabled) {
        (true, true) => Arc::new(CommonMarkRenderer::new()),
        (true, false) => {
            tracing::warn!("HTML sanitizing disabled; rendered Markdown is inserted unsanitized");
            Arc::new(CommonMarkRenderer::unsanitized())
        }
        (false, _) => {
            tracing::warn!("Markdown rendering disabled; text is inserted as raw HTML");
            Arc::new(PlainRenderer)
        }
    }
}

fn is_marked(element: &Element) -> bool {
    element.attributes.contains_key("data-markdown") || element.has_class("markdown")
}

/// Render every element flagged with `data-markdown` or the `markdown` class,
/// replacing its content in place. Elements added later are not seen.
pub fn render_marked_elements(page: &mut Page, renderer: &dyn MarkdownRenderer) -> usize {
    let mut rendered = 0;
    for element in page.elements.iter_mut().filter(|e| is_marked(e)) {
        element.inner_html = Some(renderer.to_safe_html(&element.text_content));
        rendered += 1;
    }
    tracing::debug!(rendered, "markdown elements rendered");
    rendered
}
