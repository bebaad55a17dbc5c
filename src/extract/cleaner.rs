//! HTML cleaning pass
//!
//! Rebuilds a document without scripts, styles, comments, or inline event
//! handlers. The cleaned HTML attaches to tree nodes and flat responses
//! when requested; it is never persisted to cache.

use ego_tree::NodeRef;
use scraper::{Html, Node};
use serde::{Deserialize, Serialize};

/// Which cleaning processor a request asked for
///
/// All labels currently route to the built-in pass; the label still
/// participates in cache keying so the distinction stays cache-coherent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CleaningProcessor {
    #[default]
    #[serde(rename = "cheerio-reader")]
    CheerioReader,
    #[serde(rename = "html-rewriter")]
    HtmlRewriter,
    #[serde(rename = "browser")]
    Browser,
}

impl CleaningProcessor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheerioReader => "cheerio-reader",
            Self::HtmlRewriter => "html-rewriter",
            Self::Browser => "browser",
        }
    }
}

/// Elements dropped entirely, subtree included
const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Cleans an HTML document
///
/// Drops `script`, `style`, `noscript`, and `template` subtrees, comments,
/// and `on*` event-handler attributes, then re-serializes the rest.
///
/// # Arguments
///
/// * `html` - The raw HTML
/// * `processor` - The requested processor label (see
///   [`CleaningProcessor`])
pub fn clean_html(html: &str, processor: CleaningProcessor) -> String {
    tracing::trace!("Cleaning HTML with processor {}", processor.as_str());

    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len());
    write_node(document.tree.root(), &mut out);
    out
}

/// Recursively serializes a node, applying the stripping rules
fn write_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, out);
            }
        }
        Node::Doctype(_) => out.push_str("<!DOCTYPE html>"),
        Node::Comment(_) => {}
        Node::ProcessingInstruction(_) => {}
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Element(element) => {
            let name = element.name();
            if STRIPPED_ELEMENTS.contains(&name) {
                return;
            }

            out.push('<');
            out.push_str(name);
            for (attr_name, value) in element.attrs() {
                // Inline event handlers are dropped with the scripts
                if attr_name.starts_with("on") {
                    continue;
                }
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&name) {
                return;
            }

            for child in node.children() {
                write_node(child, out);
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
