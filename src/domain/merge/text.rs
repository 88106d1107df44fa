//! HTML escaping and plain-text fallback generation

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref SKIPPED_BLOCKS: Regex =
        Regex::new(r"(?is)<(style|script|head)\b.*?</(style|script|head)\s*>").unwrap();
    static ref LINE_BREAKS: Regex =
        Regex::new(r"(?i)<br\s*/?>|</(p|div|tr|h[1-6]|li)\s*>").unwrap();
    static ref TAGS: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref SPACES: Regex = Regex::new(r"[ \t\r\f]+").unwrap();
}

/// Escape a scalar value for insertion into HTML
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip markup from rendered HTML for the text/plain alternative
pub fn to_plain_text(html: &str) -> String {
    let text = SKIPPED_BLOCKS.replace_all(html, "");
    let text = LINE_BREAKS.replace_all(&text, "\n");
    let text = TAGS.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    text.lines()
        .map(|line| SPACES.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
