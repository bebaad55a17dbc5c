//! Page metadata extraction
//!
//! Pulls the title, description, canonical URL, Open Graph fields,
//! favicon, and document language out of an HTML document. Extraction is
//! best-effort: a field that cannot be found is simply absent.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Metadata extracted from a scraped page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.canonical_url.is_none()
            && self.og_title.is_none()
            && self.og_description.is_none()
            && self.og_image.is_none()
            && self.favicon.is_none()
            && self.language.is_none()
    }
}

/// Extracts metadata from an HTML document
///
/// # Arguments
///
/// * `html` - The raw HTML
/// * `base_url` - The page URL, for resolving relative canonical, OG
///   image, and favicon references
pub fn extract_metadata(html: &str, base_url: &Url) -> PageMetadata {
    let document = Html::parse_document(html);

    PageMetadata {
        title: select_text(&document, "title"),
        description: select_attr(&document, r#"meta[name="description"]"#, "content"),
        canonical_url: select_attr(&document, r#"link[rel="canonical"]"#, "href")
            .and_then(|href| resolve(&href, base_url)),
        og_title: select_attr(&document, r#"meta[property="og:title"]"#, "content"),
        og_description: select_attr(&document, r#"meta[property="og:description"]"#, "content"),
        og_image: select_attr(&document, r#"meta[property="og:image"]"#, "content")
            .and_then(|href| resolve(&href, base_url)),
        favicon: select_attr(&document, r#"link[rel~="icon"]"#, "href")
            .and_then(|href| resolve(&href, base_url)),
        language: select_attr(&document, "html", "lang"),
    }
}

/// Returns the trimmed text content of the first matching element
fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns the trimmed attribute value of the first matching element
fn select_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves a possibly-relative reference against the page URL
fn resolve(href: &str, base_url: &Url) -> Option<String> {
    base_url.join(href).ok().map(|url| url.to_string())
}
