//! HTML parsing and DOM navigation.
//!
//! [`Document`] wraps a `scraper::Html` tree. Parsing goes through html5ever,
//! which recovers from any malformed input, so building a document never fails.
//!
//! # Example
//!
//! ```rust
//! use stash_core::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hi</p></body></html>");
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.select("p").unwrap().len(), 1);
//! ```

use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::preprocess::{self, PreprocessConfig};
use crate::{Result, StashError};

/// A parsed HTML document with an optional base URL.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML as-is, without any cleaning.
    ///
    /// Metadata extraction works on this form because preprocessing strips the
    /// `<script>` blocks that carry JSON-LD.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Cleans the HTML with [`preprocess::preprocess_html`] and parses the result.
    ///
    /// The base URL in `config` (if any) is kept on the document.
    pub fn parse_with_preprocessing(html: &str, config: &PreprocessConfig) -> Self {
        let cleaned = preprocess::preprocess_html(html, config);
        Self { html: Html::parse_document(&cleaned), base_url: config.base_url.clone() }
    }

    /// Attaches a base URL used to resolve relative links in metadata.
    pub fn with_base_url(mut self, base_url: Option<Url>) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// Content of the `<title>` element, trimmed. `None` when missing or blank.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .and_then(non_blank)
    }
}

/// A wrapper around scraper's `ElementRef`.
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Stable identifier of this node inside its document.
    pub fn id(&self) -> NodeId {
        self.element.id()
    }

    /// Gets the outer HTML of this element.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Number of characters of text in this element.
    pub fn text_len(&self) -> usize {
        self.element.text().map(|t| t.chars().count()).sum()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name (e.g., "div", "a", "span").
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Whether more than `depth` nodes sit above this element.
    ///
    /// Walks at most `depth + 1` parents.
    pub fn is_deeper_than(&self, depth: usize) -> bool {
        self.element.ancestors().nth(depth).is_some()
    }

    /// The parent element, or `None` at the document root.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::new)
    }

    /// Direct element children, in document order.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::new).collect()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| StashError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// Trims `value`, returning `None` when nothing is left.
pub(crate) fn non_blank(value: impl AsRef<str>) -> Option<String> {
    let trimmed = value.as_ref().trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title> Test Page </title>
        </head>
        <body>
            <h1>Heading</h1>
            <div id="wrap"><p class="content">Paragraph 1</p><p class="content">Paragraph 2</p></div>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML);
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
        assert_eq!(elements[1].text_len(), 11);
    }

    #[test]
    fn test_element_attributes() {
        let doc = Document::parse(SAMPLE_HTML);
        let elements = doc.select("a").unwrap();

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attr("href"), Some("https://example.com"));
    }

    #[test]
    fn test_parent_and_children() {
        let doc = Document::parse(SAMPLE_HTML);
        let paragraphs = doc.select("p").unwrap();
        let parent = paragraphs[0].parent().unwrap();

        assert_eq!(parent.attr("id"), Some("wrap"));
        assert_eq!(parent.id(), paragraphs[1].parent().unwrap().id());
        assert_eq!(parent.children().len(), 2);
    }

    #[test]
    fn test_nesting_depth() {
        let doc = Document::parse("<html><body><div><p>deep</p></div></body></html>");
        let paragraph = doc.select("p").unwrap()[0];

        // p -> div -> body -> html -> document
        assert!(paragraph.is_deeper_than(3));
        assert!(!paragraph.is_deeper_than(4));
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML);
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(StashError::HtmlParseError(_))));
    }

    #[test]
    fn test_malformed_html_does_not_fail() {
        let doc = Document::parse("<html><body><p>Unclosed <b>bold <div>mixed</p></span>");
        let paragraphs = doc.select("p").unwrap();
        assert!(paragraphs[0].text().contains("Unclosed"));
        assert_eq!(doc.select("body").unwrap().len(), 1);
    }

    #[test]
    fn test_blank_title_is_none() {
        let doc = Document::parse("<html><head><title>   </title></head><body></body></html>");
        assert_eq!(doc.title(), None);
    }
}
