// src/page.rs
//! Minimal model of a server-rendered page: the handful of elements the
//! client glue reads configuration from or rewrites in place.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: HashMap<String, String>,
    pub text_content: String,
    /// Replaced markup, if something rewrote the element after load.
    pub inner_html: Option<String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text_content = text.to_string();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// `data-*` attributes keyed the way a dataset exposes them
    /// (`data-reverse-url` becomes `reverseUrl`).
    pub fn dataset(&self) -> HashMap<String, String> {
        self.attributes
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix("data-")
                    .map(|key| (camel_case(key), value.clone()))
            })
            .collect()
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    pub fn by_id(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id.as_deref() == Some(id))
    }
}

/// Mark nav links pointing at the current path as active.
/// Returns how many links were marked.
pub fn highlight_active_nav(page: &mut Page, current_path: &str) -> usize {
    let mut marked = 0;
    for link in page
        .elements
        .iter_mut()
        .filter(|e| e.has_class("nav-link"))
    {
        if link.attr("href") == Some(current_path) {
            link.add_class("active");
            marked += 1;
        }
    }
    tracing::debug!(current_path, marked, "nav links highlighted");
    marked
}
