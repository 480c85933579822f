//! HTML cleanup performed before scoring.
//!
//! Each pass is a streaming `lol_html` rewrite. A pass that fails to rewrite
//! returns its input unchanged, so malformed markup degrades to "less cleaning"
//! instead of an error.

use std::sync::LazyLock;

use lol_html::{HtmlRewriter, Settings, element};
use regex::Regex;
use url::Url;

/// Tags dropped together with everything inside them.
const REMOVED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "canvas", "template", "form", "button", "nav", "aside",
    "footer",
];

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Class/id tokens of reader comment threads and ad slots.
static NOISE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(comments?|comment-(area|list|section|thread)s?|disqus(_thread)?|ads?|advert(s|isement|isements)?|ad-(banner|container|slot|unit|wrapper)|adsbygoogle|sponsored|sponsor-box|promo)$",
    )
    .unwrap()
});

static UNLIKELY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .unwrap()
});

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)").unwrap()
});

static HIDDEN_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to unwrap unlikely candidates (sidebars, menus, banners)
    pub remove_unlikely: bool,
    /// Whether to keep unlikely candidates that also match positive patterns
    pub keep_positive: bool,
    /// Whether to remove hidden elements
    pub remove_hidden: bool,
    /// Whether tables survive preprocessing
    pub include_tables: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_unlikely: true,
            keep_positive: true,
            remove_hidden: true,
            include_tables: true,
            convert_urls: true,
            base_url: None,
        }
    }
}

/// Preprocess HTML by removing unwanted elements and normalizing the document
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_unwanted_tags(html);
    processed = remove_comments(&processed);
    processed = remove_noise_containers(&processed);

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed, config.keep_positive);
    }

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if !config.include_tables {
        processed = remove_tables(&processed);
    }

    if config.convert_urls
        && let Some(base_url) = &config.base_url
    {
        processed = convert_relative_urls(&processed, base_url);
    }

    normalize_whitespace(&processed)
}

/// Runs one rewrite pass, falling back to the input when lol_html rejects it.
fn rewrite(html: &str, settings: Settings<'_, '_>) -> String {
    let mut output = String::new();
    let mut rewriter = HtmlRewriter::new(settings, |c: &[u8]| {
        output.push_str(&String::from_utf8_lossy(c));
    });

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove scripts, styles, embeds and page chrome tags along with their content
fn remove_unwanted_tags(html: &str) -> String {
    let handlers = REMOVED_TAGS
        .iter()
        .map(|tag| {
            element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    rewrite(html, Settings { element_content_handlers: handlers, ..Default::default() })
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    COMMENT_RE.replace_all(html, "").to_string()
}

fn is_noise(el: &lol_html::html_content::Element<'_, '_>) -> bool {
    if let Some(id) = el.get_attribute("id")
        && NOISE_TOKEN_RE.is_match(id.trim())
    {
        return true;
    }

    el.get_attribute("class")
        .is_some_and(|class| class.split_whitespace().any(|token| NOISE_TOKEN_RE.is_match(token)))
}

/// Remove reader comment sections and ad containers entirely
fn remove_noise_containers(html: &str) -> String {
    rewrite(
        html,
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                if is_noise(el) {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Unwrap elements that match unlikely candidate patterns, keeping their content
fn remove_unlikely_candidates(html: &str, keep_positive: bool) -> String {
    let is_unlikely = |value: &str| UNLIKELY_RE.is_match(value) && (!keep_positive || !POSITIVE_RE.is_match(value));

    rewrite(
        html,
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name();
                if tag == "body" || tag == "html" || tag == "article" || tag == "main" {
                    return Ok(());
                }

                if let Some(id) = el.get_attribute("id")
                    && is_unlikely(&id)
                {
                    el.remove_and_keep_content();
                    return Ok(());
                }

                if let Some(class) = el.get_attribute("class")
                    && class.split_whitespace().any(|token| is_unlikely(token))
                {
                    el.remove_and_keep_content();
                }

                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Remove elements hidden with inline styles or the `hidden` attribute
fn remove_hidden_elements(html: &str) -> String {
    rewrite(
        html,
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                let styled_hidden = el.get_attribute("style").is_some_and(|style| HIDDEN_STYLE_RE.is_match(&style));
                if styled_hidden || el.has_attribute("hidden") {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

fn remove_tables(html: &str) -> String {
    rewrite(
        html,
        Settings {
            element_content_handlers: vec![element!("table", |el| {
                el.remove();
                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Convert relative URLs to absolute URLs
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let absolutize = |el: &mut lol_html::html_content::Element<'_, '_>, attr: &str| {
        if let Some(value) = el.get_attribute(attr)
            && let Ok(absolute) = base_url.join(value.trim())
        {
            el.set_attribute(attr, absolute.as_str()).ok();
        }
    };

    rewrite(
        html,
        Settings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    absolutize(el, "href");
                    Ok(())
                }),
                element!("link[href]", |el| {
                    absolutize(el, "href");
                    Ok(())
                }),
                element!("img[src]", |el| {
                    absolutize(el, "src");
                    Ok(())
                }),
            ],
            ..Default::default()
        },
    )
}

/// Collapse runs of whitespace into a single space
fn normalize_whitespace(html: &str) -> String {
    WHITESPACE_RE.replace_all(html, " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_unwanted_tags() {
        let html = r#"
            <html>
                <head><script>trackPageView();</script><style>p { margin: 0 }</style></head>
                <body>
                    <nav><a href="/">Front page</a></nav>
                    <noscript>Turn on scripts to comment</noscript>
                    <iframe src="https://video.example/embed/1"></iframe>
                    <svg><circle r="4"/></svg>
                    <canvas id="tide-chart"></canvas>
                    <form><input name="email"><button>Subscribe</button></form>
                    <p>The harbor froze overnight.</p>
                    <aside>Trending now</aside>
                    <footer>All rights reserved</footer>
                </body>
            </html>
        "#;

        let result = remove_unwanted_tags(html);
        for tag in REMOVED_TAGS {
            assert!(!result.contains(&format!("<{}", tag)), "<{}> should be removed", tag);
        }
        assert!(result.contains("<p>The harbor froze overnight.</p>"));

        for text in ["trackPageView", "margin: 0", "Turn on scripts", "Subscribe", "Trending now", "All rights"] {
            assert!(!result.contains(text), "{text} should be removed with its element");
        }
    }

    #[test]
    fn test_remove_comments() {
        let html = "<p>Kept</p><!-- build 2024.11 --><p>Also kept</p><!--\n  multi\n  line\n-->";

        let result = remove_comments(html);
        assert_eq!(result, "<p>Kept</p><p>Also kept</p>");
    }

    #[test]
    fn test_remove_noise_containers() {
        let html = r#"
            <div class="post">
                <p>Article body</p>
                <div id="comments"><p>First!</p></div>
                <section class="comment-list"><p>Great read</p></section>
                <div class="ad"><p>Buy now</p></div>
                <div id="disqus_thread">Loading</div>
                <div class="comments-enabled"><p>Still here</p></div>
            </div>
        "#;

        let result = remove_noise_containers(html);
        assert!(result.contains("Article body"));
        assert!(!result.contains("First!"));
        assert!(!result.contains("Great read"));
        assert!(!result.contains("Buy now"));
        assert!(!result.contains("Loading"));
        assert!(result.contains("Still here"));
    }

    #[test]
    fn test_unlikely_candidates_are_unwrapped() {
        let html = r#"
            <body>
                <div class="site-header">Morning Edition</div>
                <div id="related-stories">See also</div>
                <div class="story-body">Council votes tonight</div>
                <div class="sidebar-content">Weather widget</div>
            </body>
        "#;

        let result = remove_unlikely_candidates(html, true);
        assert!(!result.contains("site-header"));
        assert!(!result.contains("related-stories"));
        assert!(result.contains("Morning Edition"), "unwrapped elements keep their text");
        assert!(result.contains("See also"));
        assert!(result.contains("class=\"story-body\""));
        assert!(result.contains("class=\"sidebar-content\""), "positive tokens protect the element");

        let strict = remove_unlikely_candidates(html, false);
        assert!(!strict.contains("sidebar-content"));
    }

    #[test]
    fn test_convert_relative_urls() {
        let base = Url::parse("https://news.example/2024/harbor/").unwrap();
        let html = r#"<a href="/about">About us</a><a href="photos.html">Photos</a><img src="ice.jpg"><a href="https://elsewhere.example/">Out</a>"#;

        let result = convert_relative_urls(html, &base);
        assert!(result.contains("href=\"https://news.example/about\""));
        assert!(result.contains("href=\"https://news.example/2024/harbor/photos.html\""));
        assert!(result.contains("src=\"https://news.example/2024/harbor/ice.jpg\""));
        assert!(result.contains("href=\"https://elsewhere.example/\""));
    }

    #[test]
    fn test_remove_hidden_elements() {
        let html = r#"
            <div style="display: none">Newsletter popup</div>
            <div style="color: red; visibility:hidden">Tracking pixel</div>
            <div hidden>Paywall teaser</div>
            <div style="display: block">Lead paragraph</div>
        "#;

        let result = remove_hidden_elements(html);
        assert!(!result.contains("Newsletter popup"));
        assert!(!result.contains("Tracking pixel"));
        assert!(!result.contains("Paywall teaser"));
        assert!(result.contains("Lead paragraph"));
    }

    #[test]
    fn test_tables_kept_unless_disabled() {
        let html = "<div><p>Intro</p><table><tr><td>Cell</td></tr></table></div>";

        let kept = preprocess_html(html, &PreprocessConfig::default());
        assert!(kept.contains("Cell"));

        let config = PreprocessConfig { include_tables: false, ..Default::default() };
        let dropped = preprocess_html(html, &config);
        assert!(!dropped.contains("Cell"));
        assert!(dropped.contains("Intro"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("<p>  tide\t\tpools\n\n matter </p>"), "<p> tide pools matter </p>");
    }

    #[test]
    fn test_preprocess_full_pipeline() {
        let html = r#"
            <!DOCTYPE html>
            <html>
            <head><script>window.ads = [];</script><!-- cache hit --></head>
            <body>
                <div id="menu" class="top-menu"><p>Sections</p></div>
                <article class="story">
                    <a href="/authors/lee">Sam Lee</a>
                    <p style="display:none">Subscribe for more</p>
                    <p>The ferry resumed service on Monday.</p>
                    <div class="advertisement">Sponsored</div>
                </article>
            </body>
            </html>
        "#;

        let base = Url::parse("https://news.example").unwrap();
        let config = PreprocessConfig { base_url: Some(base), ..Default::default() };

        let result = preprocess_html(html, &config);

        assert!(!result.contains("<script"));
        assert!(!result.contains("cache hit"));
        assert!(!result.contains("top-menu"));
        assert!(!result.contains("Subscribe for more"));
        assert!(!result.contains("Sponsored"));
        assert!(result.contains("class=\"story\""));
        assert!(result.contains("href=\"https://news.example/authors/lee\""));
        assert!(result.contains("The ferry resumed service on Monday."));
    }
}
