//! Page-level metadata: title, author, site name and lead image.
//!
//! Metadata is read from the raw document, independently of body extraction,
//! so it survives pages whose body cannot be extracted (and vice versa).

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::Document;
use crate::parse::non_blank;

/// Schema.org types treated as the page's main article.
const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "Report",
    "ScholarlyArticle",
    "TechArticle",
    "AnalysisNewsArticle",
    "OpinionNewsArticle",
    "ReportageNewsArticle",
    "SocialMediaPosting",
    "WebPage",
];

/// Types whose `name` is the publishing site, not the article.
const PUBLISHER_TYPES: &[&str] = &["Organization", "NewsMediaOrganization", "WebSite"];

static BYLINE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^by[\s:]+").unwrap());

/// Metadata extracted from a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub site_name: Option<String>,
    /// Absolute URL of the lead image, when a base URL is known.
    pub image: Option<String>,
}

impl Document {
    /// Extract title with priority fallback:
    /// 1. JSON-LD `headline` / `name`
    /// 2. Open Graph `og:title`
    /// 3. Twitter `twitter:title`
    /// 4. Meta `title` / `DC.title`
    /// 5. `<title>` element
    /// 6. First `<h1>` element
    pub fn extract_title(&self) -> Option<String> {
        if let Some(article) = self.json_ld_article() {
            let headline = ["headline", "name"]
                .iter()
                .find_map(|key| article.get(*key).and_then(Value::as_str).and_then(non_blank));
            if headline.is_some() {
                return headline;
            }
        }

        ["og:title", "twitter:title", "title", "DC.title"]
            .iter()
            .find_map(|key| self.get_meta_content(key))
            .or_else(|| self.title())
            .or_else(|| self.first_text("h1"))
    }

    /// Extract author with priority fallback:
    /// 1. JSON-LD `author` (string, object or array)
    /// 2. Meta `author` / `DC.creator`
    /// 3. Meta `article:author` (unless it is a profile URL)
    /// 4. `[rel="author"]` link text
    /// 5. `[itemprop="author"]` content
    /// 6. Class/ID containing "author", "byline"
    ///
    /// A leading "By " is removed from the result.
    pub fn extract_author(&self) -> Option<String> {
        self.find_author().map(|author| clean_byline(&author)).and_then(non_blank)
    }

    fn find_author(&self) -> Option<String> {
        if let Some(article) = self.json_ld_article()
            && let Some(author) = article.get("author")
            && let Some(name) = author_from_json_ld(author)
        {
            return Some(name);
        }

        if let Some(author) = self.get_meta_content("author").or_else(|| self.get_meta_content("DC.creator")) {
            return Some(author);
        }

        if let Some(author) = self.get_meta_content("article:author")
            && !author.starts_with("http")
        {
            return Some(author);
        }

        if let Some(author) = self.first_text("[rel=\"author\"]") {
            return Some(author);
        }

        if let Ok(elements) = self.select("[itemprop=\"author\"]")
            && let Some(first) = elements.first()
        {
            let value = first.attr("content").map(str::to_string).unwrap_or_else(|| first.text());
            if let Some(author) = non_blank(value) {
                return Some(author);
            }
        }

        for pattern in ["byline", "author", "writer"] {
            for attribute in ["class", "id"] {
                let selector = format!("[{}*=\"{}\"]", attribute, pattern);
                if let Ok(elements) = self.select(&selector) {
                    for el in elements.iter().take(3) {
                        let text = el.text();
                        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                        if !text.is_empty() && text.chars().count() < 100 {
                            return Some(text);
                        }
                    }
                }
            }
        }

        None
    }

    /// Extract the lead image with priority fallback:
    /// 1. Open Graph `og:image` / `og:image:url`
    /// 2. Twitter `twitter:image` / `twitter:image:src`
    /// 3. JSON-LD `image` (string, object or array)
    /// 4. `<link rel="image_src">`
    ///
    /// Relative values are resolved against the document's base URL.
    pub fn extract_lead_image(&self) -> Option<String> {
        let raw = ["og:image", "og:image:url", "twitter:image", "twitter:image:src"]
            .iter()
            .find_map(|key| self.get_meta_content(key))
            .or_else(|| {
                self.json_ld_article()
                    .and_then(|article| article.get("image").and_then(image_from_json_ld))
            })
            .or_else(|| {
                self.select("link[rel=\"image_src\"]")
                    .ok()?
                    .first()
                    .and_then(|link| link.attr("href"))
                    .and_then(non_blank)
            })?;

        match self.base_url() {
            Some(base) => base.join(&raw).ok().map(|url| url.to_string()),
            None => Some(raw),
        }
    }

    /// Extract site name with priority fallback:
    /// 1. JSON-LD `publisher.name`
    /// 2. Open Graph `og:site_name`
    /// 3. Meta `application-name`
    /// 4. JSON-LD `Organization` / `WebSite` `name`
    pub fn extract_site_name(&self) -> Option<String> {
        if let Some(article) = self.json_ld_article()
            && let Some(name) = article
                .get("publisher")
                .and_then(|publisher| publisher.get("name"))
                .and_then(Value::as_str)
                .and_then(non_blank)
        {
            return Some(name);
        }

        self.get_meta_content("og:site_name")
            .or_else(|| self.get_meta_content("application-name"))
            .or_else(|| self.json_ld_publisher_name())
    }

    /// Extract all metadata at once
    pub fn extract_metadata(&self) -> Metadata {
        Metadata {
            title: self.extract_title(),
            author: self.extract_author(),
            site_name: self.extract_site_name(),
            image: self.extract_lead_image(),
        }
    }

    /// Get meta tag content by name or property attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        ["name", "property"].iter().find_map(|kind| {
            let selector = format!("meta[{}=\"{}\"]", kind, attr);
            self.select(&selector)
                .ok()?
                .first()
                .and_then(|el| el.attr("content"))
                .and_then(non_blank)
        })
    }

    fn first_text(&self, selector: &str) -> Option<String> {
        self.select(selector).ok()?.first().map(|el| el.text()).and_then(non_blank)
    }

    /// Every JSON-LD object on the page, with arrays and `@graph` flattened
    fn json_ld_nodes(&self) -> Vec<Value> {
        let mut nodes = Vec::new();

        if let Ok(elements) = self.select("script[type=\"application/ld+json\"]") {
            for el in elements {
                if let Ok(value) = serde_json::from_str::<Value>(el.text().trim()) {
                    flatten_json_ld(value, &mut nodes);
                }
            }
        }

        nodes
    }

    /// The first article-typed JSON-LD node. Other node types never stand in
    /// for the article.
    fn json_ld_article(&self) -> Option<Value> {
        self.json_ld_nodes().into_iter().find(is_article_node)
    }

    /// `name` of the first `Organization` or `WebSite` node
    fn json_ld_publisher_name(&self) -> Option<String> {
        self.json_ld_nodes()
            .iter()
            .filter(|node| has_type(node, PUBLISHER_TYPES))
            .find_map(|node| node.get("name").and_then(Value::as_str).and_then(non_blank))
    }
}

fn flatten_json_ld(value: Value, nodes: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_json_ld(item, nodes)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, nodes);
            }
            if map.keys().any(|key| key != "@context") {
                nodes.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn is_article_node(node: &Value) -> bool {
    has_type(node, ARTICLE_TYPES)
}

fn has_type(node: &Value, types: &[&str]) -> bool {
    match node.get("@type") {
        Some(Value::String(kind)) => types.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).any(|kind| types.contains(&kind)),
        _ => false,
    }
}

/// Author name from a JSON-LD `author` value in string, object or array form
fn author_from_json_ld(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => non_blank(name),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).and_then(non_blank),
        Value::Array(items) => items.iter().find_map(author_from_json_ld),
        _ => None,
    }
}

/// Image URL from a JSON-LD `image` value in string, object or array form
fn image_from_json_ld(image: &Value) -> Option<String> {
    match image {
        Value::String(url) => non_blank(url),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).and_then(non_blank),
        Value::Array(items) => items.iter().find_map(image_from_json_ld),
        _ => None,
    }
}

fn clean_byline(author: &str) -> String {
    BYLINE_PREFIX_RE.replace(author.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page Title</title>
            <meta name="author" content="John Doe">
            <meta property="og:title" content="OG Title">
            <meta property="og:site_name" content="Example Site">
            <meta property="og:image" content="/images/lead.jpg">
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "NewsArticle",
                "headline": "JSON-LD Headline",
                "author": {
                    "@type": "Person",
                    "name": "Jane Smith"
                },
                "publisher": {
                    "@type": "Organization",
                    "name": "JSON-LD Publisher"
                }
            }
            </script>
        </head>
        <body>
            <h1>Main Heading</h1>
            <p>This is the first paragraph of the content.</p>
        </body>
        </html>
    "#;

    const HTML_WITHOUT_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Simple Page</title>
        </head>
        <body>
            <h1>Heading</h1>
            <p>This is a paragraph with some text content.</p>
        </body>
        </html>
    "#;

    #[test]
    fn test_extract_title_from_json_ld() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_title(), Some("JSON-LD Headline".to_string()));
    }

    #[test]
    fn test_extract_title_fallback_chain() {
        let doc = Document::parse(HTML_WITHOUT_META);
        assert_eq!(doc.extract_title(), Some("Simple Page".to_string()));

        let og = Document::parse(r#"<head><meta property="og:title" content=" OG Title "><title>T</title></head>"#);
        assert_eq!(og.extract_title(), Some("OG Title".to_string()));

        let h1_only = Document::parse("<body><h1> Only Heading </h1></body>");
        assert_eq!(h1_only.extract_title(), Some("Only Heading".to_string()));

        let nothing = Document::parse("<body><p>text</p></body>");
        assert_eq!(nothing.extract_title(), None);
    }

    #[test]
    fn test_extract_author_from_json_ld() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_author(), Some("Jane Smith".to_string()));
    }

    #[test]
    fn test_extract_author_from_meta() {
        let doc = Document::parse(r#"<html><head><meta name="author" content="John Doe"></head><body></body></html>"#);
        assert_eq!(doc.extract_author(), Some("John Doe".to_string()));
    }

    #[test]
    fn test_extract_author_skips_profile_url() {
        let doc = Document::parse(
            r#"<html><head><meta property="article:author" content="https://facebook.com/someone"></head>
            <body><a rel="author" href="/staff/ada">Ada Lovelace</a></body></html>"#,
        );
        assert_eq!(doc.extract_author(), Some("Ada Lovelace".to_string()));
    }

    #[test]
    fn test_extract_author_strips_by_prefix() {
        let doc = Document::parse(r#"<body><span class="byline">By   Grace Hopper</span><p>Text</p></body>"#);
        assert_eq!(doc.extract_author(), Some("Grace Hopper".to_string()));
    }

    #[test]
    fn test_extract_author_array_from_json_ld() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": "Article", "author": [{"@type": "Person", "name": "First Author"}, {"name": "Second Author"}]}
            </script>
        "#;
        let doc = Document::parse(html);
        assert_eq!(doc.extract_author(), Some("First Author".to_string()));
    }

    #[test]
    fn test_json_ld_graph_prefers_article_node() {
        let html = r#"
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@graph": [
                {"@type": "WebSite", "name": "Site Name"},
                {"@type": ["BlogPosting"], "headline": "Graph Headline", "image": {"url": "https://cdn.example.com/a.png"}}
            ]}
            </script>
        "#;
        let doc = Document::parse(html);
        assert_eq!(doc.extract_title(), Some("Graph Headline".to_string()));
        assert_eq!(doc.extract_lead_image(), Some("https://cdn.example.com/a.png".to_string()));
    }

    #[test]
    fn test_organization_json_ld_is_not_the_article() {
        let html = r#"
            <head>
                <title>Real Headline | Acme</title>
                <meta property="og:title" content="Real Headline">
                <script type="application/ld+json">{"@context": "https://schema.org", "@type": "Organization", "name": "Acme Corp"}</script>
                <script type="application/ld+json">{"@type": "BreadcrumbList", "name": "Crumbs", "author": "Nobody"}</script>
            </head>
            <body><p>Body text.</p></body>
        "#;
        let doc = Document::parse(html);

        assert_eq!(doc.extract_title(), Some("Real Headline".to_string()));
        assert_eq!(doc.extract_author(), None);
        assert_eq!(doc.extract_site_name(), Some("Acme Corp".to_string()));
    }

    #[test]
    fn test_og_site_name_beats_organization_name() {
        let html = r#"
            <meta property="og:site_name" content="Acme News">
            <script type="application/ld+json">[{"@type": "WebSite", "name": "acme.example"}]</script>
        "#;
        assert_eq!(Document::parse(html).extract_site_name(), Some("Acme News".to_string()));
    }

    #[test]
    fn test_invalid_json_ld_is_ignored() {
        let html = r#"<head><script type="application/ld+json">{not json</script><title>Fallback</title></head>"#;
        let doc = Document::parse(html);
        assert_eq!(doc.extract_title(), Some("Fallback".to_string()));
    }

    #[test]
    fn test_extract_lead_image_resolves_against_base() {
        let base = Url::parse("https://news.example.com/2024/story").unwrap();
        let doc = Document::parse(HTML_WITH_META).with_base_url(Some(base));
        assert_eq!(doc.extract_lead_image(), Some("https://news.example.com/images/lead.jpg".to_string()));
    }

    #[test]
    fn test_extract_lead_image_fallbacks() {
        let twitter = Document::parse(r#"<meta name="twitter:image" content="https://example.com/t.png">"#);
        assert_eq!(twitter.extract_lead_image(), Some("https://example.com/t.png".to_string()));

        let link = Document::parse(r#"<link rel="image_src" href="https://example.com/l.png">"#);
        assert_eq!(link.extract_lead_image(), Some("https://example.com/l.png".to_string()));

        let none = Document::parse("<p>No images</p>");
        assert_eq!(none.extract_lead_image(), None);
    }

    #[test]
    fn test_extract_site_name() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_site_name(), Some("JSON-LD Publisher".to_string()));

        let og = Document::parse(r#"<meta property="og:site_name" content="OG Site">"#);
        assert_eq!(og.extract_site_name(), Some("OG Site".to_string()));

        let app = Document::parse(r#"<meta name="application-name" content="App Site">"#);
        assert_eq!(app.extract_site_name(), Some("App Site".to_string()));
    }

    #[test]
    fn test_site_name_has_no_domain_fallback() {
        let base = Url::parse("https://www.example.com/post").unwrap();
        let doc = Document::parse(HTML_WITHOUT_META).with_base_url(Some(base));
        assert_eq!(doc.extract_site_name(), None);
    }

    #[test]
    fn test_extract_all_metadata() {
        let metadata = Document::parse(HTML_WITH_META).extract_metadata();

        assert_eq!(metadata.title, Some("JSON-LD Headline".to_string()));
        assert_eq!(metadata.author, Some("Jane Smith".to_string()));
        assert_eq!(metadata.site_name, Some("JSON-LD Publisher".to_string()));
        assert_eq!(metadata.image, Some("/images/lead.jpg".to_string()));
    }

    #[test]
    fn test_empty_document_metadata() {
        assert_eq!(Document::parse("").extract_metadata(), Metadata::default());
    }
}
