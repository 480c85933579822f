//! Cleanup of the extracted article HTML before text conversion.
//!
//! The extracted fragment is reparsed, unwanted nodes are detached from the
//! tree, and the remainder is serialized again.

use std::sync::LazyLock;

use ego_tree::NodeId;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::extract::MAX_CANDIDATE_DEPTH;
use crate::parse::Element;
use crate::scoring::link_density;

/// Configuration for HTML post-processing cleanup
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Whether to remove conditional comments
    pub remove_conditional_comments: bool,
    /// Whether to strip images, figures and pictures
    pub strip_images: bool,
    /// Whether to remove tables of contents, share bars and related links
    pub remove_chrome: bool,
    /// Whether to remove nested blocks with high link density
    pub remove_high_link_density: bool,
    /// Maximum link density threshold (0.0 to 1.0)
    pub max_link_density: f64,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_conditional_comments: true,
            strip_images: true,
            remove_chrome: true,
            remove_high_link_density: true,
            max_link_density: 0.5,
        }
    }
}

static CONDITIONAL_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\[if[^\]]*\]>.*?<!\[endif\]-->|<!--<!\[if[^\]]*\]>.*?<!\[endif\]-->").unwrap()
});

/// Class/id tokens of page chrome, matched on `-`/`_` boundaries.
static CHROME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[-_])(toc|table-of-contents|on-this-page|breadcrumbs?|share|sharing|social|share-buttons|related|newsletter|subscribe|author-bio)([-_]|$)",
    )
    .unwrap()
});

const IMAGE_SELECTOR: &str = "img, figure, picture";
const LINK_DENSITY_SELECTOR: &str = "div, section, ul, ol, li, p, table";

/// Post-process extracted HTML by cleaning up remaining unwanted content
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let html = if config.remove_conditional_comments { remove_conditional_comments(html) } else { html.to_string() };

    let mut fragment = Html::parse_fragment(&html);
    let mut doomed = Vec::new();

    if config.strip_images {
        doomed.extend(image_nodes(&fragment));
    }

    if config.remove_chrome {
        doomed.extend(chrome_nodes(&fragment));
    }

    if config.remove_high_link_density {
        doomed.extend(link_heavy_nodes(&fragment, config.max_link_density));
    }

    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }

    fragment.root_element().inner_html()
}

/// Remove Internet Explorer conditional comments
///
/// IE conditional comments have the format:
/// `<!--[if condition]>...<![endif]-->`
fn remove_conditional_comments(html: &str) -> String {
    CONDITIONAL_COMMENT_RE.replace_all(html, "").to_string()
}

fn select_elements<'a>(fragment: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(sel) => fragment.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// Images, figures (with their captions) and pictures
fn image_nodes(fragment: &Html) -> Vec<NodeId> {
    select_elements(fragment, IMAGE_SELECTOR).iter().map(|el| el.id()).collect()
}

fn is_chrome(element: &Element<'_>) -> bool {
    let class_match = element
        .attr("class")
        .is_some_and(|classes| classes.split_whitespace().any(|c| CHROME_RE.is_match(c)));
    class_match || element.attr("id").is_some_and(|id| CHROME_RE.is_match(id.trim()))
}

/// Tables of contents, breadcrumbs, share widgets and related-link blocks
fn chrome_nodes(fragment: &Html) -> Vec<NodeId> {
    select_elements(fragment, "*")
        .into_iter()
        .map(Element::new)
        .filter(is_chrome)
        .map(|el| el.id())
        .collect()
}

/// Nested blocks whose text is mostly links
///
/// Top-level blocks are the extracted candidates themselves and are never
/// dropped here. Blocks nested past [`MAX_CANDIDATE_DEPTH`] are not measured.
fn link_heavy_nodes(fragment: &Html, max_density: f64) -> Vec<NodeId> {
    let root = fragment.root_element().id();

    select_elements(fragment, LINK_DENSITY_SELECTOR)
        .into_iter()
        .map(Element::new)
        .filter(|el| el.parent().is_some_and(|parent| parent.id() != root))
        .filter(|el| !el.is_deeper_than(MAX_CANDIDATE_DEPTH))
        .filter(|el| el.text().trim().chars().count() > 0 && link_density(el) > max_density)
        .map(|el| el.id())
        .collect()
}
