//! Candidate scoring and the tie-break ordering between candidates.
use std::collections::BTreeSet;

use serde::Serialize;

use crate::letters::{letter_counts_lossy, shared_letter_count};
use crate::stats::Counts;

/// Scores closer than this are considered tied
pub const SCORE_EPSILON: f64 = 1e-12;

/// Weights of each score component
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub layout: f64,
    pub rare_full: f64,
    pub missing: f64,
    pub overlap: f64,
    pub rare_layout: f64,
    pub seed_diff: f64,
}
impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            layout: 2.0,
            rare_full: 2.0,
            missing: 1.0,
            overlap: 1.0,
            rare_layout: 1.0,
            seed_diff: 1.0,
        }
    }
}

/// Score components, each in `[0, 1]`, and their weighted sum
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ScoreParts {
    pub p_layout: f64,
    pub p_rare_full: f64,
    pub p_missing: f64,
    pub p_overlap: f64,
    pub p_rare_layout: f64,
    pub p_seed_diff: f64,
    pub score: f64,
}

/// Everything a candidate is scored on
pub struct ScoreInputs<'a> {
    pub seed: &'a str,
    pub previous_seed: &'a str,
    pub full_words: &'a BTreeSet<String>,
    pub layout_input_words: &'a BTreeSet<String>,
    pub layout_words: &'a BTreeSet<String>,
    pub missing_words: &'a BTreeSet<String>,
    pub overlap_ratio: f64,
    pub word_stats: &'a Counts,
}

/// Fraction of `current` also present in `previous` (`0` for an empty `current`)
pub fn overlap_ratio(current: &BTreeSet<String>, previous: &BTreeSet<String>) -> f64 {
    let shared = current.intersection(previous).count();
    shared as f64 / current.len().max(1) as f64
}

/// Mean of `1 / (1 + count)` over `words`, `0` for no words
pub fn average_rarity(words: &BTreeSet<String>, word_stats: &Counts) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let rarity_sum: f64 = words
        .iter()
        .map(|word| 1.0 / (1.0 + word_stats.get(word).copied().unwrap_or(0) as f64))
        .sum();
    rarity_sum / words.len() as f64
}

/// One minus the share of letters (by multiset minimum) the two seeds have in common
///
/// Defined as `1` when there is no previous seed.
pub fn seed_difference_ratio(seed: &str, previous_seed: &str) -> f64 {
    let current = seed.trim().to_uppercase();
    let previous = previous_seed.trim().to_uppercase();
    if previous.is_empty() {
        return 1.0;
    }
    let shared = shared_letter_count(&letter_counts_lossy(&current), &letter_counts_lossy(&previous));
    let denominator = current.len().max(previous.len()).max(1);
    1.0 - shared as f64 / denominator as f64
}

/// Computes every score component and the weighted total
pub fn score(inputs: &ScoreInputs, weights: &ScoreWeights) -> ScoreParts {
    let p_layout = inputs.layout_words.len() as f64 / inputs.layout_input_words.len().max(1) as f64;
    let p_rare_full = average_rarity(inputs.full_words, inputs.word_stats);
    let p_missing = 1.0 - inputs.missing_words.len() as f64 / inputs.full_words.len().max(1) as f64;
    let p_overlap = 1.0 - inputs.overlap_ratio;
    let p_rare_layout = average_rarity(inputs.layout_words, inputs.word_stats);
    let p_seed_diff = seed_difference_ratio(inputs.seed, inputs.previous_seed);
    let score = weights.layout * p_layout
        + weights.rare_full * p_rare_full
        + weights.missing * p_missing
        + weights.overlap * p_overlap
        + weights.rare_layout * p_rare_layout
        + weights.seed_diff * p_seed_diff;
    ScoreParts { p_layout, p_rare_full, p_missing, p_overlap, p_rare_layout, p_seed_diff, score }
}

/// The fields candidates are ranked by
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RankKey<'a> {
    pub score: f64,
    pub layout_word_count: usize,
    pub overlap_ratio: f64,
    pub seed: &'a str,
}

/// Which rule decided a comparison
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareReason {
    NoCurrentBest,
    HigherTotalScore,
    TieBreakLayoutWordCount,
    TieBreakOverlapRatio,
    TieBreakSeedLexicographic,
    LowerTotalScore,
}
impl CompareReason {
    pub fn code(self) -> &'static str {
        match self {
            CompareReason::NoCurrentBest => "no_current_best",
            CompareReason::HigherTotalScore => "higher_total_score",
            CompareReason::TieBreakLayoutWordCount => "tie_break_layout_word_count",
            CompareReason::TieBreakOverlapRatio => "tie_break_overlap_ratio",
            CompareReason::TieBreakSeedLexicographic => "tie_break_seed_lexicographic",
            CompareReason::LowerTotalScore => "lower_total_score",
        }
    }
}

/// Decides whether `candidate` replaces `best`
///
/// A higher score wins outright. Scores within `SCORE_EPSILON` fall through to more layout
/// words, then a lower overlap ratio, then the lexicographically smaller seed.
/// # Returns
/// `(bool, CompareReason)` - whether the candidate is better, and the rule that decided it
pub fn is_better(candidate: &RankKey, best: Option<&RankKey>) -> (bool, CompareReason) {
    let best = match best {
        Some(best) => best,
        None => return (true, CompareReason::NoCurrentBest),
    };
    if candidate.score > best.score + SCORE_EPSILON {
        return (true, CompareReason::HigherTotalScore);
    }
    if (candidate.score - best.score).abs() <= SCORE_EPSILON {
        if candidate.layout_word_count != best.layout_word_count {
            return (candidate.layout_word_count > best.layout_word_count, CompareReason::TieBreakLayoutWordCount);
        }
        if candidate.overlap_ratio != best.overlap_ratio {
            return (candidate.overlap_ratio < best.overlap_ratio, CompareReason::TieBreakOverlapRatio);
        }
        return (candidate.seed < best.seed, CompareReason::TieBreakSeedLexicographic);
    }
    (false, CompareReason::LowerTotalScore)
}
