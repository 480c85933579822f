use std::cmp::Ordering;
use std::collections::HashMap;

use ego_tree::NodeId;
use tracing::debug;

use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::scoring::{ScoreConfig, calculate_score, link_density};
use crate::{Result, StashError};

/// Element cap applied when `max_elements` is 0.
pub const DEFAULT_MAX_ELEMENTS: usize = 2000;

/// Elements nested deeper than this are never scored.
pub const MAX_CANDIDATE_DEPTH: usize = 256;

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score threshold for top candidate
    pub min_score_threshold: f64,
    /// Minimum character threshold for content
    pub char_threshold: usize,
    /// Maximum elements to consider (0 = [`DEFAULT_MAX_ELEMENTS`])
    pub max_elements: usize,
    /// Sibling score threshold (multiplier of top score)
    pub sibling_threshold: f64,
    /// Minimum paragraph text the baseline extractor accepts
    pub min_baseline_chars: usize,
    /// Post-processing configuration
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 10.0,
            char_threshold: 500,
            max_elements: 0,
            sibling_threshold: 0.2,
            min_baseline_chars: 100,
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// A candidate element with its score
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub element: Element<'a>,
    pub score: f64,
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned HTML of the article body
    pub content: String,
    /// The top candidate score (0 for baseline extraction)
    pub top_score: f64,
    /// Number of top-level elements extracted
    pub element_count: usize,
}

/// Tags that are considered potential content containers
const CANDIDATE_SELECTOR: &str = "div, article, section, main, p, td, pre, blockquote";

/// Identify all candidate elements from the document, in document order
fn identify_candidates<'a>(
    doc: &'a Document, config: &ExtractConfig, score_config: &ScoreConfig,
) -> Vec<Candidate<'a>> {
    let max_elements = if config.max_elements == 0 { DEFAULT_MAX_ELEMENTS } else { config.max_elements };
    let min_text = config.char_threshold / 10;

    doc.select(CANDIDATE_SELECTOR)
        .unwrap_or_default()
        .into_iter()
        .filter(|element| !element.is_deeper_than(MAX_CANDIDATE_DEPTH))
        .take(max_elements)
        .filter(|element| {
            matches!(element.tag_name().as_str(), "article" | "section" | "main") || element.text_len() >= min_text
        })
        .map(|element| {
            let score = calculate_score(&element, score_config).final_score;
            Candidate { element, score }
        })
        .collect()
}

/// Propagate scores from candidates to their ancestors
///
/// The parent gains half of a candidate's own score and the grandparent a
/// third. Ancestors that were not candidates are scored first and then added.
/// Propagation stops below the `<html>` element.
fn propagate_scores<'a>(candidates: Vec<Candidate<'a>>, score_config: &ScoreConfig) -> Vec<Candidate<'a>> {
    let mut order: Vec<NodeId> = candidates.iter().map(|c| c.element.id()).collect();
    let mut by_id: HashMap<NodeId, Candidate<'a>> = candidates.iter().map(|c| (c.element.id(), c.clone())).collect();

    for candidate in &candidates {
        let mut ancestor = candidate.element.parent();

        for divisor in [2.0, 3.0] {
            let Some(parent) = ancestor.filter(|el| el.tag_name() != "html") else { break };

            by_id
                .entry(parent.id())
                .or_insert_with(|| {
                    order.push(parent.id());
                    Candidate { element: parent, score: calculate_score(&parent, score_config).final_score }
                })
                .score += candidate.score / divisor;

            ancestor = parent.parent();
        }
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

/// Select the top candidate from the list
///
/// Returns the highest scoring candidate if it meets the minimum threshold,
/// otherwise a NotReadable error.
fn select_top_candidate<'c, 'a>(candidates: &'c [Candidate<'a>], config: &ExtractConfig) -> Result<&'c Candidate<'a>> {
    let top_candidate = candidates.iter().max_by(|a, b| compare_candidates(a, b)).ok_or(StashError::NoContent)?;

    if top_candidate.score < config.min_score_threshold {
        return Err(StashError::NotReadable { score: top_candidate.score, threshold: config.min_score_threshold });
    }

    Ok(top_candidate)
}

/// Collect the top candidate together with qualifying siblings, in document order
///
/// A sibling is included if:
/// - its score is >= top_score * sibling_threshold, or
/// - it is a P with more than 80 chars of text and link density below 0.25, or
/// - it is a short P without links that ends like a sentence
fn collect_with_siblings<'a>(
    top: &Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig,
) -> Vec<Element<'a>> {
    let Some(parent) = top.element.parent() else {
        return vec![top.element];
    };

    let scores: HashMap<NodeId, f64> = candidates.iter().map(|c| (c.element.id(), c.score)).collect();
    let threshold = top.score * config.sibling_threshold;

    parent
        .children()
        .into_iter()
        .filter(|sibling| {
            if sibling.id() == top.element.id() {
                return true;
            }

            if scores.get(&sibling.id()).is_some_and(|score| *score >= threshold) {
                return true;
            }

            if sibling.tag_name() != "p" {
                return false;
            }

            let text = sibling.text();
            let text = text.trim();
            let text_len = text.chars().count();
            let density = link_density(sibling);

            (text_len > 80 && density < 0.25) || (text_len > 0 && density == 0.0 && text.ends_with('.'))
        })
        .collect()
}

/// Extract the main content from a document
///
/// This is the heuristic entry point. It:
/// 1. Identifies candidate elements
/// 2. Propagates scores to ancestors
/// 3. Selects the top candidate
/// 4. Includes relevant siblings
/// 5. Post-processes the extracted content
///
/// # Errors
///
/// [`StashError::NoContent`] when the document has no candidates and
/// [`StashError::NotReadable`] when the best one scores below the threshold.
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let score_config = ScoreConfig::default();

    let candidates = identify_candidates(doc, config, &score_config);
    let candidates = propagate_scores(candidates, &score_config);

    let top_candidate = select_top_candidate(&candidates, config)?;
    let parts = collect_with_siblings(top_candidate, &candidates, config);

    debug!(
        tag = %top_candidate.element.tag_name(),
        score = top_candidate.score,
        parts = parts.len(),
        "selected top candidate"
    );

    let content: String = parts.iter().map(Element::outer_html).collect();
    let content = postprocess_html(&content, &config.postprocess);

    Ok(ExtractedContent { content, top_score: top_candidate.score, element_count: parts.len() })
}

/// Collect every paragraph with low link density
///
/// Used when the heuristic rejects a page. Succeeds only if the paragraphs
/// hold at least `min_baseline_chars` characters of text.
///
/// # Errors
///
/// [`StashError::NoContent`] when there is not enough paragraph text.
pub fn extract_baseline(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let paragraphs: Vec<Element<'_>> = doc
        .select("p")
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.text().trim().is_empty() && link_density(p) < 0.5)
        .collect();

    let total_chars: usize = paragraphs.iter().map(|p| p.text().trim().chars().count()).sum();
    if total_chars < config.min_baseline_chars {
        debug!(total_chars, min = config.min_baseline_chars, "baseline extraction found too little text");
        return Err(StashError::NoContent);
    }

    let content: String = paragraphs.iter().map(Element::outer_html).collect();
    let content = postprocess_html(&content, &config.postprocess);

    Ok(ExtractedContent { content, top_score: 0.0, element_count: paragraphs.len() })
}

fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| candidate_priority(&a.element.tag_name()).cmp(&candidate_priority(&b.element.tag_name())))
        .then_with(|| a.element.text_len().cmp(&b.element.text_len()))
}

fn candidate_priority(tag_name: &str) -> u8 {
    match tag_name {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}
