// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal owned XML element tree and pretty serializer for descriptor output.
//
// Descriptors are small and written in one go, so the writer builds the whole
// document in memory and renders it with two-space indentation. Escaping is
// delegated to `html-escape`.

use std::fmt::Write as _;

/// An element with ordered attributes, optional leading text, and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Set an attribute, replacing an existing one with the same name.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Set an attribute only when a value is present.
    pub fn set_opt_attr(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set_attr(key, value);
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Append a child and return a mutable handle to it.
    pub fn push_child(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Render as a complete UTF-8 document with an XML declaration.
    pub fn to_document_string(&self) -> String {
        let mut out = String::from("<?xml version='1.0' encoding='utf-8'?>\n");
        self.render(&mut out, 0);
        out
    }

    fn render(&self, out: &mut String, depth: usize) {
        indent(out, depth);
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            let _ = write!(
                out,
                " {}=\"{}\"",
                key,
                html_escape::encode_double_quoted_attribute(value)
            );
        }

        let text = self.text.as_deref().unwrap_or("");
        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>\n");
            return;
        }

        out.push('>');
        out.push_str(&html_escape::encode_text(text));
        if self.children.is_empty() {
            let _ = writeln!(out, "</{}>", self.name);
            return;
        }

        out.push('\n');
        for child in &self.children {
            child.render(out, depth + 1);
        }
        indent(out, depth);
        let _ = writeln!(out, "</{}>", self.name);
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}
