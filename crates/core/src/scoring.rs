//! Candidate scoring for the content extractor.
//!
//! A candidate's score is its tag prior plus a class/id hint plus a text
//! density term, discounted by how much of its text sits inside links.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Tunable weights for [`calculate_score`].
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Added when a class or id looks like article content.
    pub positive_weight: f64,
    /// Added when a class or id looks like page chrome.
    pub negative_weight: f64,
    pub max_char_density_score: f64,
    pub max_comma_density_score: f64,
    /// One density point per this many characters.
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Breakdown of one candidate's score.
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub tag_name: String,
    pub base_score: f64,
    pub class_weight: f64,
    pub content_density: f64,
    /// Share of the text inside `<a>`, in `0.0..=1.0`.
    pub link_density: f64,
    pub final_score: f64,
}

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)").unwrap()
});

static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|highlight|code|example)",
    )
    .unwrap()
});

/// Tag prior: containers that usually wrap prose score up, lists and
/// headings score down.
///
/// | tag | score |
/// |-----|-------|
/// | `article` | 10 |
/// | `section` | 8 |
/// | `div`, `main` | 5 |
/// | `td`, `blockquote` | 3 |
/// | `address`, lists and list items | -3 |
/// | headings, `th`, `header` | -5 |
/// | anything else, `pre` included | 0 |
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" | "main" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" => 0.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" => -5.0,
        _ => 0.0,
    }
}

/// Hint from the element's id, then each class in order. The first token
/// that matches either pattern decides; positive wins within a token.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    if let Some(id) = element.attr("id") {
        if POSITIVE_RE.is_match(id) {
            return config.positive_weight;
        }
        if NEGATIVE_RE.is_match(id) {
            return config.negative_weight;
        }
    }

    if let Some(class) = element.attr("class") {
        for class_name in class.split_whitespace() {
            if POSITIVE_RE.is_match(class_name) {
                return config.positive_weight;
            }
            if NEGATIVE_RE.is_match(class_name) {
                return config.negative_weight;
            }
        }
    }

    0.0
}

/// Length and comma count of the element's text, each capped.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    density_of(&element.text(), config)
}

fn density_of(text: &str, config: &ScoreConfig) -> f64 {
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Characters of link text over characters of text; 0 for empty elements.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text_len();

    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(Element::text_len)
        .sum::<usize>();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

fn looks_like_code(text: &str) -> bool {
    let len = text.chars().count();
    if len <= 50 {
        return false;
    }

    let len = len as f64;
    let comma_ratio = text.matches(',').count() as f64 / len;
    let space_ratio = text.matches(' ').count() as f64 / len;
    let special_ratio = text.chars().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count() as f64 / len;

    special_ratio > 0.15 && comma_ratio < 0.01 && space_ratio < 0.15
}

/// Scores one candidate.
///
/// `(base + class weight + density - code penalty) * (1 - link density)`,
/// where the link discount is halved for candidates with a positive hint or
/// more than 500 characters of text, and the code penalty applies only to
/// `<pre>` blocks that read like source code.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let tag_name = element.tag_name();
    let text = element.text();

    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = density_of(&text, config);
    let ld = link_density(element);
    let raw_score = base_score + class_weight + content_density;

    let is_content_rich = text.chars().count() > 500;
    let link_penalty = if class_weight > 0.0 || is_content_rich { 1.0 - (ld * 0.5) } else { 1.0 - ld };

    let code_penalty = if tag_name == "pre" && looks_like_code(&text) { -10.0 } else { 0.0 };

    let final_score = (raw_score + code_penalty) * link_penalty;

    ScoreResult { tag_name, base_score, class_weight, content_density, link_density: ld, final_score }
}
