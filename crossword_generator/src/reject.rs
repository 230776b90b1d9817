//! Why attempts get abandoned.
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Reason an attempt was rejected before producing a candidate
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    EmptyFullWordSet,
    OverlapRatioGeThreshold,
    EmptyLayoutInputWordSet,
    LayoutWordsBelowMinimum,
    SeedLettersNotFullyUsed,
    FullWordSetBelowMinimum,
    LayoutInvalidAfterRepeatPass,
    SwapCyclesExhausted,
    AdditionPoolEmpty,
    EmptySeed,
}
impl RejectReason {
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::EmptyFullWordSet => "empty_full_word_set",
            RejectReason::OverlapRatioGeThreshold => "overlap_ratio_ge_threshold",
            RejectReason::EmptyLayoutInputWordSet => "empty_layout_input_word_set",
            RejectReason::LayoutWordsBelowMinimum => "layout_words_below_minimum",
            RejectReason::SeedLettersNotFullyUsed => "seed_letters_not_fully_used",
            RejectReason::FullWordSetBelowMinimum => "full_word_set_below_minimum",
            RejectReason::LayoutInvalidAfterRepeatPass => "layout_invalid_after_repeat_pass",
            RejectReason::SwapCyclesExhausted => "swap_cycles_exhausted",
            RejectReason::AdditionPoolEmpty => "addition_pool_empty",
            RejectReason::EmptySeed => "empty_seed",
        }
    }

    /// The check that failed
    pub fn criterion(self) -> &'static str {
        match self {
            RejectReason::EmptyFullWordSet => "full_word_set_is_empty",
            RejectReason::OverlapRatioGeThreshold => "overlap_ratio_meets_or_exceeds_threshold",
            RejectReason::EmptyLayoutInputWordSet => "layout_input_word_set_is_empty",
            RejectReason::LayoutWordsBelowMinimum => "layout_word_count_below_minimum",
            RejectReason::SeedLettersNotFullyUsed => "not_all_seed_letters_used_in_layout_words",
            RejectReason::FullWordSetBelowMinimum => "full_word_set_below_minimum_required_for_crossword",
            RejectReason::LayoutInvalidAfterRepeatPass => "layout_invalid_when_repeat_threshold_passed",
            RejectReason::SwapCyclesExhausted => "swap_cycles_limit_reached",
            RejectReason::AdditionPoolEmpty => "addition_pool_has_no_candidates",
            RejectReason::EmptySeed => "seed_became_empty",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A step of an attempt's state machine
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
    pub index: usize,
    pub name: &'static str,
}
impl Step {
    pub const fn new(index: usize, name: &'static str) -> Step {
        Step { index, name }
    }
}

/// Record of an abandoned attempt
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub step: Step,
}
impl Rejection {
    pub fn new(reason: RejectReason, step: Step) -> Rejection {
        Rejection { reason, step }
    }

    pub fn criterion(&self) -> &'static str {
        self.reason.criterion()
    }
}

/// Count of rejections per reason
pub type RejectionHistogram = BTreeMap<RejectReason, usize>;

/// Histogram keyed by reason code, for trace output
pub fn histogram_by_code(histogram: &RejectionHistogram) -> BTreeMap<&'static str, usize> {
    histogram.iter().map(|(reason, count)| (reason.code(), *count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RejectReason::OverlapRatioGeThreshold.code(), "overlap_ratio_ge_threshold");
        assert_eq!(RejectReason::EmptySeed.criterion(), "seed_became_empty");
        assert_eq!(RejectReason::AdditionPoolEmpty.to_string(), "addition_pool_empty");
    }

    #[test]
    fn histogram_uses_codes() {
        let mut histogram = RejectionHistogram::new();
        *histogram.entry(RejectReason::EmptyFullWordSet).or_insert(0) += 2;
        *histogram.entry(RejectReason::SwapCyclesExhausted).or_insert(0) += 1;
        let by_code = histogram_by_code(&histogram);
        assert_eq!(by_code.get("empty_full_word_set"), Some(&2));
        assert_eq!(by_code.get("swap_cycles_exhausted"), Some(&1));
    }

    #[test]
    fn rejection_carries_criterion() {
        let rejection = Rejection::new(RejectReason::EmptySeed, Step::new(6, "mutate_seed"));
        assert_eq!(rejection.criterion(), "seed_became_empty");
        assert_eq!(rejection.step.name, "mutate_seed");
    }
}
