//! Fuzzy answer locator.
//!
//! Finds the OCR region that best matches the decision-maker's answer and
//! returns its click point. OCR output is noisy and the model rarely echoes
//! the on-screen line byte for byte, so regions are scored by similarity
//! ratio instead of exact equality.

use super::fuzzy::{partial_ratio, ratio};
use super::regions::{Point, TextRegionIndex};

/// Regions shorter than this (after normalization) never match.
const MIN_REGION_CHARS: usize = 2;

/// Outcome of one lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    /// Click point, present only when `score >= threshold`
    pub point: Option<Point>,
    /// Best score seen (0-100)
    pub score: u8,
    /// Original text of the best region, empty if none scored
    pub matched_text: String,
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        self.point.is_some()
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Scores one region text against an already-normalized target.
pub fn score_region(target_norm: &str, region_text: &str) -> u8 {
    let text_norm = normalize(region_text);
    if text_norm.chars().count() < MIN_REGION_CHARS {
        return 0;
    }
    ratio(target_norm, &text_norm).max(partial_ratio(target_norm, &text_norm))
}

/// Returns the best-matching region's center if its score reaches `threshold`.
///
/// Ties keep the region seen first in OCR order.
pub fn locate(target_text: &str, index: &TextRegionIndex, threshold: u8) -> MatchResult {
    let target_norm = normalize(target_text);
    crate::log(&format!("Searching for text on screen: '{}'", target_norm));

    let mut best_score = 0u8;
    let mut best = None;

    for region in index.iter() {
        let score = score_region(&target_norm, &region.text);
        if score > best_score {
            best_score = score;
            best = Some(region);
        }
    }

    let matched_text = best.map(|r| r.text.clone()).unwrap_or_default();

    match best {
        Some(region) if best_score >= threshold => {
            crate::log(&format!(
                "Match found: '{}' (score {})",
                matched_text, best_score
            ));
            MatchResult {
                point: Some(region.quad.center()),
                score: best_score,
                matched_text,
            }
        }
        _ => {
            crate::log(&format!(
                "No strong match. Best candidate: '{}' (score {} < {})",
                matched_text, best_score, threshold
            ));
            MatchResult {
                point: None,
                score: best_score,
                matched_text,
            }
        }
    }
}
