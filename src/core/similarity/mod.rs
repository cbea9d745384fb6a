//! # Similarity Module
//!
//! Decides when two histograms describe near-duplicate images.
//!
//! ## Acceptance Rule
//! With `c = min_confidence` and `c² = 1 - (1 - c)²`, two images are similar if
//! - `similarity >= c²`, or
//! - either image is colorful and `similarity > c`
//!
//! Near-grayscale images score artificially high under the histogram metric,
//! so they must clear the higher bar.
//!
//! | min_confidence | grayscale bar | colorful bar |
//! |----------------|---------------|--------------|
//! | 0.90           | >= 0.99       | > 0.90       |
//! | 0.95 (default) | >= 0.9975     | > 0.95       |
//! | 0.98           | >= 0.9996     | > 0.98       |

mod rebuild;

pub use rebuild::{RebuildHandle, RebuildOutcome, SimilarityRebuilder};

use crate::core::histogram::Histogram;
use crate::core::model::Item;
use crate::error::LibraryError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default confidence threshold
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.95;

/// Thresholds for near-duplicate detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Similarity colorful images must exceed to count as similar
    pub min_confidence: f64,
}

impl SimilarityConfig {
    /// Create a config; `min_confidence` must lie in `(0, 1]`
    pub fn new(min_confidence: f64) -> Result<Self, LibraryError> {
        if !(min_confidence > 0.0 && min_confidence <= 1.0) {
            return Err(LibraryError::Config(format!(
                "min_confidence must be in (0, 1], got {min_confidence}"
            )));
        }
        Ok(Self { min_confidence })
    }

    /// The stricter bar applied to non-colorful images
    pub fn confidence_square(&self) -> f64 {
        1.0 - (1.0 - self.min_confidence).powi(2)
    }

    /// Returns the similarity score if the pair counts as similar
    pub fn is_similar(&self, a: &Histogram, b: &Histogram) -> Option<f64> {
        let similarity = a.similarity(b);
        let accepted = similarity >= self.confidence_square()
            || ((a.is_colorful() || b.is_colorful()) && similarity > self.min_confidence);
        accepted.then_some(similarity)
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Two media items judged to be near-duplicates
#[derive(Debug, Clone)]
pub struct SimilarPair {
    pub first: Arc<Item>,
    pub second: Arc<Item>,
    pub similarity: f64,
}

/// Media items paired with their histograms, skipping everything without one
fn with_histograms(items: &[Arc<Item>]) -> Vec<(&Arc<Item>, Arc<Histogram>)> {
    items
        .iter()
        .filter_map(|item| {
            let histogram = item.as_media()?.histogram()?;
            Some((item, histogram))
        })
        .collect()
}

/// Find every similar pair among `items`
pub fn find_similar_pairs(items: &[Arc<Item>], config: &SimilarityConfig) -> Vec<SimilarPair> {
    let candidates = with_histograms(items);
    let mut pairs = Vec::new();

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let (first, hist_a) = &candidates[i];
            let (second, hist_b) = &candidates[j];

            if let Some(similarity) = config.is_similar(hist_a, hist_b) {
                pairs.push(SimilarPair {
                    first: Arc::clone(*first),
                    second: Arc::clone(*second),
                    similarity,
                });
            }
        }
    }

    pairs
}

/// Find every item in `candidates` similar to `subject` (never `subject` itself)
pub fn find_similar_to(
    subject: &Arc<Item>,
    candidates: &[Arc<Item>],
    config: &SimilarityConfig,
) -> Vec<SimilarPair> {
    let Some(histogram) = subject.as_media().and_then(|m| m.histogram()) else {
        return Vec::new();
    };

    with_histograms(candidates)
        .into_iter()
        .filter(|(candidate, _)| candidate.id() != subject.id())
        .filter_map(|(candidate, other)| {
            config
                .is_similar(&histogram, &other)
                .map(|similarity| SimilarPair {
                    first: Arc::clone(subject),
                    second: Arc::clone(candidate),
                    similarity,
                })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::core::histogram::{Histogram, BIN_COUNT};

    /// A histogram whose pixels are split between two bins per channel.
    ///
    /// `shift` moves that fraction of every channel from the first bin to the second.
    pub fn split(colorful: bool, shift: f64) -> Histogram {
        let mut gray = [0.0; BIN_COUNT];
        gray[10] = 1.0 - shift;
        gray[11] = shift;

        let mut alpha = [0.0; BIN_COUNT];
        alpha[BIN_COUNT - 1] = 1.0;

        if colorful {
            let mut red = [0.0; BIN_COUNT];
            red[30] = 1.0 - shift;
            red[31] = shift;
            let mut blue = [0.0; BIN_COUNT];
            blue[0] = 1.0 - shift;
            blue[1] = shift;
            Histogram::from_bins(alpha, red, gray, blue)
        } else {
            Histogram::from_bins(alpha, gray, gray, gray)
        }
    }
}
