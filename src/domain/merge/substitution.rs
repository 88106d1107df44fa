//! Placeholder substitution engine.
//!
//! The merge algorithm only depends on the [`TemplateEngine`] and
//! [`CompiledTemplate`] seams; [`PlaceholderEngine`] is the engine shipped
//! with the crate. It replaces `{{identifier}}` short codes with values from
//! a flat map and leaves everything else untouched.

use std::collections::BTreeMap;

use crate::domain::merge_tag::{find_short_codes, ShortCode};

use super::text::escape_html;
use super::MergeResult;

/// A template compiled once and rendered many times
pub trait CompiledTemplate: Send + Sync {
    /// Render with a flat identifier -> value map.
    ///
    /// Identifiers missing from the map never fail the render.
    fn render(&self, values: &BTreeMap<String, String>) -> String;
}

/// Compiles template source into a [`CompiledTemplate`]
pub trait TemplateEngine: Send + Sync {
    fn compile(&self, source: &str) -> MergeResult<Box<dyn CompiledTemplate>>;
}

/// Engine substituting `{{identifier}}` placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderEngine {
    /// Keep `{{identifier}}` in the output when no value is supplied
    pub keep_unresolved: bool,

    /// HTML-escape substituted values
    pub escape_html: bool,
}

impl PlaceholderEngine {
    /// Engine for HTML bodies: values are escaped, missing values render empty
    pub fn html() -> Self {
        Self {
            keep_unresolved: false,
            escape_html: true,
        }
    }

    /// Engine for plain text such as subjects
    pub fn plain() -> Self {
        Self {
            keep_unresolved: false,
            escape_html: false,
        }
    }

    pub fn keep_unresolved(mut self, keep: bool) -> Self {
        self.keep_unresolved = keep;
        self
    }
}

impl Default for PlaceholderEngine {
    fn default() -> Self {
        Self::html()
    }
}

impl TemplateEngine for PlaceholderEngine {
    fn compile(&self, source: &str) -> MergeResult<Box<dyn CompiledTemplate>> {
        Ok(Box::new(PlaceholderTemplate::compile(source, *self)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Placeholder(ShortCode),
}

/// Source split into literal text and placeholders
#[derive(Debug, Clone)]
pub struct PlaceholderTemplate {
    segments: Vec<Segment>,
    options: PlaceholderEngine,
}

impl PlaceholderTemplate {
    pub fn compile(source: &str, options: PlaceholderEngine) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for m in find_short_codes(source) {
            // Candidates outside the grammar stay literal text
            let Ok(code) = ShortCode::new(m.as_str()) else {
                continue;
            };
            if m.start() > last {
                segments.push(Segment::Text(source[last..m.start()].to_string()));
            }
            segments.push(Segment::Placeholder(code));
            last = m.end();
        }

        if last < source.len() {
            segments.push(Segment::Text(source[last..].to_string()));
        }

        Self { segments, options }
    }

    /// Identifiers referenced by the template, in order of appearance
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(code) => Some(code.identifier()),
            Segment::Text(_) => None,
        })
    }
}

impl CompiledTemplate for PlaceholderTemplate {
    fn render(&self, values: &BTreeMap<String, String>) -> String {
        let mut result = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => result.push_str(text),
                Segment::Placeholder(code) => match values.get(code.identifier()) {
                    Some(value) if self.options.escape_html => {
                        result.push_str(&escape_html(value))
                    }
                    Some(value) => result.push_str(value),
                    None if self.options.keep_unresolved => result.push_str(code.as_str()),
                    None => {}
                },
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_simple() {
        let template = PlaceholderEngine::plain().compile("Hello, {{name}}!").unwrap();
        assert_eq!(template.render(&values(&[("name", "World")])), "Hello, World!");
    }

    #[test]
    fn test_substitute_multiple() {
        let template = PlaceholderEngine::plain()
            .compile("Your order {{order_id}} is being delivered by {{carrier}} ({{order_id}})")
            .unwrap();
        let rendered = template.render(&values(&[("order_id", "ORD-123"), ("carrier", "FedEx")]));
        assert_eq!(
            rendered,
            "Your order ORD-123 is being delivered by FedEx (ORD-123)"
        );
    }

    #[test]
    fn test_missing_values_render_empty() {
        let template = PlaceholderEngine::html().compile("<p>{{a}}|{{b}}</p>").unwrap();
        assert_eq!(template.render(&values(&[("a", "1")])), "<p>1|</p>");
    }

    #[test]
    fn test_missing_values_can_be_kept() {
        let template = PlaceholderEngine::html()
            .keep_unresolved(true)
            .compile("{{a}}|{{b}}")
            .unwrap();
        assert_eq!(template.render(&values(&[("a", "1")])), "1|{{b}}");
    }

    #[test]
    fn test_html_values_are_escaped() {
        let template = PlaceholderEngine::html().compile("<b>{{name}}</b>").unwrap();
        assert_eq!(
            template.render(&values(&[("name", "<Tom & Jerry>")])),
            "<b>&lt;Tom &amp; Jerry&gt;</b>"
        );
    }

    #[test]
    fn test_non_grammar_braces_are_literal() {
        let source = "{{ spaced }} and {{ok}}";
        let template = PlaceholderTemplate::compile(source, PlaceholderEngine::plain());
        assert_eq!(template.identifiers().collect::<Vec<_>>(), vec!["ok"]);
        assert_eq!(
            template.render(&values(&[("ok", "yes"), ("spaced", "no")])),
            "{{ spaced }} and yes"
        );
    }
}
