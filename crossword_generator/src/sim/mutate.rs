//! First-success simulation: a run accepts the first candidate whose words repeat little enough,
//! swapping seed letters to push the repeat share down.
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rand::prelude::*;
use tracing::debug;

use super::{sorted_words, step_record, AcceptedRun, RunReport, Simulation};
use crate::config::MutateConfig;
use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::layout;
use crate::letters::{self, is_vowel};
use crate::reject::{histogram_by_code, RejectReason, Rejection, Step};
use crate::seed::{self, SeedLengthRange, VOWEL_COUNT_WEIGHTS};
use crate::stats::Counts;
use crate::timing::TimingStats;
use crate::trace::{TraceRecord, TraceSink};

const BUILD_SEED: Step = Step::new(1, "build_seed");
const BUILD_FULL_WORD_SET: Step = Step::new(2, "build_full_word_set");
const BUILD_REPEAT_SOURCE: Step = Step::new(3, "build_repeat_source_word_set");
const BUILD_LAYOUT_WORD_SET: Step = Step::new(4, "build_layout_word_set");
const VALIDATE_LAYOUT: Step = Step::new(5, "validate_layout");
const MUTATE_SEED: Step = Step::new(6, "mutate_seed");

const SEED_INIT_PHASE: &str = "seed_initialization";
const FULL_SET_PHASE: &str = "build_full_word_set";
const REPEAT_ANALYSIS_PHASE: &str = "repeat_analysis";
const LAYOUT_BUILD_PHASE: &str = "layout_build";
const VALIDATION_PHASE: &str = "validation";
const MUTATION_PHASE: &str = "mutation";

/// Repeat control used once a previous run has been accepted
pub const PREVIOUS_ROUND_CONTROL: &str = "previous_round_words";
/// Repeat control used before any run has been accepted
pub const TOP_FREQUENT_CONTROL: &str = "top_frequent_words";

/// The `max(1, ceil(len * share))` most frequent `words`, ties broken alphabetically
pub fn top_frequent_words(words: &[String], word_stats: &Counts, share: f64) -> BTreeSet<String> {
    if words.is_empty() {
        return BTreeSet::new();
    }
    let take = ((words.len() as f64 * share).ceil() as usize).max(1);
    let count_of = |word: &String| word_stats.get(word).copied().unwrap_or(0);
    let mut sorted: Vec<&String> = words.iter().collect();
    sorted.sort_by(|a, b| count_of(b).cmp(&count_of(a)).then_with(|| a.cmp(b)));
    sorted.into_iter().take(take).cloned().collect()
}

/// An accepted attempt
#[derive(Clone, Debug)]
struct Candidate {
    seed: String,
    full_words: BTreeSet<String>,
    layout_words: BTreeSet<String>,
    repeat_source_words: BTreeSet<String>,
    repeat_share: f64,
    repeat_control: &'static str,
}
impl Candidate {
    fn into_accepted(self) -> AcceptedRun {
        let missing_words = self.full_words.difference(&self.layout_words).cloned().collect();
        AcceptedRun {
            seed: self.seed,
            full_words: self.full_words,
            layout_words: self.layout_words,
            missing_words,
            overlap_ratio: None,
            score: None,
            repeat_share: Some(self.repeat_share),
            repeat_control: Some(self.repeat_control),
            repeat_source_words: self.repeat_source_words,
        }
    }
}

type Outcome = std::result::Result<Candidate, Rejection>;

/// First-success repeatability simulation
///
/// Each attempt draws a fresh weighted-vowel seed and measures how much of its full word set
/// falls in the repeat-control set: the previous run's layout words, or on the first run the most
/// frequent dictionary words. A low enough share is laid out and accepted at once. Otherwise one
/// seed letter is swapped for a new one and the check repeats, up to the swap-cycle limit.
pub struct MutateSimulation<'a> {
    config: MutateConfig,
    dictionary: &'a Dictionary,
    range: SeedLengthRange,
    top_frequent_words: BTreeSet<String>,
    previous_layout_words: BTreeSet<String>,
    timing: TimingStats,
}

impl<'a> MutateSimulation<'a> {
    pub fn new(config: MutateConfig, dictionary: &'a Dictionary, word_stats: &Counts) -> Result<MutateSimulation<'a>> {
        config.validate()?;
        let range = SeedLengthRange::for_max_size(config.max_letter_set_size);
        let top_frequent_words = top_frequent_words(dictionary.letter_words(), word_stats, config.top_frequent_share);
        debug!(count = top_frequent_words.len(), "top frequent control set built");
        Ok(MutateSimulation {
            config,
            dictionary,
            range,
            top_frequent_words,
            previous_layout_words: BTreeSet::new(),
            timing: TimingStats::new(),
        })
    }

    pub fn config(&self) -> &MutateConfig {
        &self.config
    }

    pub fn top_frequent_words(&self) -> &BTreeSet<String> {
        &self.top_frequent_words
    }

    pub fn previous_layout_words(&self) -> &BTreeSet<String> {
        &self.previous_layout_words
    }

    fn attempt<R: Rng + ?Sized>(
        &mut self,
        run: usize,
        attempt: usize,
        rng: &mut R,
        trace: &mut TraceSink,
    ) -> Result<Outcome> {
        let start = Instant::now();
        let mut seed = seed::initial_seed(self.range, rng);
        let vowel_count = seed.chars().filter(|c| is_vowel(*c)).count();
        let mut remaining = seed::remaining_addition_alphabet(&seed);
        let mut blocked: BTreeSet<char> = BTreeSet::new();
        self.timing.record(SEED_INIT_PHASE, start);
        trace.emit_with(|| {
            let distribution: BTreeMap<String, usize> =
                VOWEL_COUNT_WEIGHTS.iter().map(|(count, weight)| (count.to_string(), *weight as usize)).collect();
            step_record(run, attempt, BUILD_SEED)
                .with("seed", seed.as_str())
                .with("seed_length", seed.len())
                .with("seed_length_range_min", self.range.min)
                .with("seed_length_range_max", self.range.max)
                .with("seed_vowel_count", vowel_count)
                .with("seed_consonant_count", seed.len() - vowel_count)
                .with("seed_vowel_distribution", distribution)
                .with("remaining_addition_alphabet_size", remaining.len())
        })?;

        let (control, control_name) = if self.previous_layout_words.is_empty() {
            (&self.top_frequent_words, TOP_FREQUENT_CONTROL)
        }
        else {
            (&self.previous_layout_words, PREVIOUS_ROUND_CONTROL)
        };
        let minimum = self.config.min_layout_word_count;
        let min_word_length = self.config.min_word_length;
        let threshold = self.config.max_repeat_share;

        for swap_cycle in 1..=self.config.max_swap_cycles {
            let start = Instant::now();
            let full_words = letters::full_word_set(&seed, self.dictionary.letter_words(), min_word_length);
            self.timing.record(FULL_SET_PHASE, start);
            trace.emit_with(|| {
                step_record(run, attempt, BUILD_FULL_WORD_SET)
                    .with("swap_cycle", swap_cycle)
                    .with("seed", seed.as_str())
                    .with("full_word_count", full_words.len())
                    .with("full_words", &full_words)
                    .with("minimum_full_word_count_required", minimum)
                    .with("full_word_count_ok", full_words.len() >= minimum)
            })?;
            if full_words.len() < minimum {
                return Ok(Err(Rejection::new(RejectReason::FullWordSetBelowMinimum, BUILD_FULL_WORD_SET)));
            }

            let start = Instant::now();
            let repeat_source: BTreeSet<String> = full_words.intersection(control).cloned().collect();
            let repeat_share = repeat_source.len() as f64 / full_words.len().max(1) as f64;
            let passes = repeat_share <= threshold;
            self.timing.record(REPEAT_ANALYSIS_PHASE, start);
            trace.emit_with(|| {
                step_record(run, attempt, BUILD_REPEAT_SOURCE)
                    .with("swap_cycle", swap_cycle)
                    .with("repeat_control_name", control_name)
                    .with("repeat_control_word_count", control.len())
                    .with("repeat_source_word_count", repeat_source.len())
                    .with("repeat_source_words", &repeat_source)
                    .with("repeat_share", repeat_share)
                    .with("repeat_share_threshold", threshold)
                    .with("passes_repeat_threshold", passes)
            })?;

            if passes {
                let start = Instant::now();
                let input: Vec<&String> = full_words.iter().collect();
                let layout_words = layout::synthesize(&input, rng).word_set(min_word_length);
                self.timing.record(LAYOUT_BUILD_PHASE, start);
                trace.emit_with(|| {
                    step_record(run, attempt, BUILD_LAYOUT_WORD_SET)
                        .with("swap_cycle", swap_cycle)
                        .with("layout_word_count", layout_words.len())
                        .with("layout_words", &layout_words)
                })?;

                let start = Instant::now();
                let layout_ok = layout_words.len() >= minimum;
                self.timing.record(VALIDATION_PHASE, start);
                trace.emit_with(|| {
                    step_record(run, attempt, VALIDATE_LAYOUT)
                        .with("swap_cycle", swap_cycle)
                        .with("layout_word_count", layout_words.len())
                        .with("minimum_layout_word_count", minimum)
                        .with("layout_word_count_ok", layout_ok)
                })?;
                if !layout_ok {
                    return Ok(Err(Rejection::new(RejectReason::LayoutInvalidAfterRepeatPass, VALIDATE_LAYOUT)));
                }
                return Ok(Ok(Candidate {
                    seed,
                    full_words,
                    layout_words,
                    repeat_source_words: repeat_source,
                    repeat_share,
                    repeat_control: control_name,
                }));
            }

            let start = Instant::now();
            let removed = match seed::pick_letter_to_remove(&seed, &repeat_source, rng) {
                Some(letter) => letter,
                None => {
                    self.timing.record(MUTATION_PHASE, start);
                    trace.emit_with(|| {
                        step_record(run, attempt, MUTATE_SEED)
                            .with("swap_cycle", swap_cycle)
                            .with("seed_before", seed.as_str())
                            .with("mutation_result", "failed_empty_seed")
                    })?;
                    return Ok(Err(Rejection::new(RejectReason::EmptySeed, MUTATE_SEED)));
                }
            };
            let seed_before = seed.clone();
            let after_removal = seed::remove_first(&seed, removed);
            blocked.insert(removed);
            let pool = seed::addition_pool(&after_removal, &remaining, &blocked);
            let added = match pool.choose(rng) {
                Some(letter) => *letter,
                None => {
                    self.timing.record(MUTATION_PHASE, start);
                    trace.emit_with(|| {
                        step_record(run, attempt, MUTATE_SEED)
                            .with("swap_cycle", swap_cycle)
                            .with("seed_before", seed_before.as_str())
                            .with("removed_letter", removed)
                            .with("seed_after_removal", after_removal.as_str())
                            .with("blocked_return_letters", &blocked)
                            .with("remaining_addition_alphabet_size", remaining.len())
                            .with("mutation_result", "failed_addition_pool_empty")
                    })?;
                    return Ok(Err(Rejection::new(RejectReason::AdditionPoolEmpty, MUTATE_SEED)));
                }
            };
            remaining.remove(&added);
            let mut mutated = after_removal;
            mutated.push(added);
            seed = seed::shuffle_letters(&mutated, rng);
            self.timing.record(MUTATION_PHASE, start);
            trace.emit_with(|| {
                step_record(run, attempt, MUTATE_SEED)
                    .with("swap_cycle", swap_cycle)
                    .with("seed_before", seed_before.as_str())
                    .with("removed_letter", removed)
                    .with("added_letter", added)
                    .with("seed_after", seed.as_str())
                    .with("blocked_return_letters", &blocked)
                    .with("remaining_addition_alphabet_size", remaining.len())
            })?;
        }

        Ok(Err(Rejection::new(RejectReason::SwapCyclesExhausted, MUTATE_SEED)))
    }
}

impl<'a> Simulation for MutateSimulation<'a> {
    fn name(&self) -> &'static str {
        "mutate"
    }

    fn run_once<R: Rng + ?Sized>(&mut self, run: usize, rng: &mut R, trace: &mut TraceSink) -> Result<RunReport> {
        let mut report = RunReport::new(run);
        trace.emit_with(|| {
            TraceRecord::new("run_start")
                .run(run)
                .with("previous_round_word_count", self.previous_layout_words.len())
                .with("top_frequent_word_count", self.top_frequent_words.len())
        })?;

        let mut accepted: Option<Candidate> = None;
        for attempt in 1..=self.config.max_attempts {
            report.attempts = attempt;
            trace.emit_with(|| {
                TraceRecord::new("attempt_start")
                    .run(run)
                    .attempt(attempt)
                    .with("max_swap_cycles", self.config.max_swap_cycles)
                    .with("repeat_share_threshold", self.config.max_repeat_share)
            })?;

            let mut record = TraceRecord::new("attempt_end").run(run).attempt(attempt);
            match self.attempt(run, attempt, rng, trace)? {
                Ok(candidate) => {
                    record.insert("status", "accepted");
                    record.insert("seed", candidate.seed.as_str());
                    record.insert("repeat_share", candidate.repeat_share);
                    record.insert("full_word_count", candidate.full_words.len());
                    record.insert("layout_word_count", candidate.layout_words.len());
                    record.insert("repeat_source_word_count", candidate.repeat_source_words.len());
                    record.insert("repeat_control_name", candidate.repeat_control);
                    trace.emit(&record)?;
                    accepted = Some(candidate);
                    break;
                },
                Err(rejection) => {
                    report.reject(&rejection);
                    tracing::trace!(run, attempt, reason = rejection.reason.code(), "attempt rejected");
                    record.insert("status", "rejected");
                    record.insert("reject_reason", rejection.reason.code());
                    record.insert("reject_step_index", rejection.step.index);
                    record.insert("reject_step_name", rejection.step.name);
                    record.insert("reject_criterion", rejection.criterion());
                    trace.emit_with(|| {
                        TraceRecord::new("attempt_reject")
                            .run(run)
                            .attempt(attempt)
                            .with("reject_reason", rejection.reason.code())
                            .with("reject_step_index", rejection.step.index)
                            .with("reject_step_name", rejection.step.name)
                            .with("reject_criterion", rejection.criterion())
                    })?;
                    trace.emit(&record)?;
                }
            }
        }

        let candidate = match accepted {
            Some(candidate) => candidate,
            None => {
                trace.emit_with(|| {
                    TraceRecord::new("run_end")
                        .run(run)
                        .with("status", "failure")
                        .with("rejected_by_reason", histogram_by_code(&report.rejections))
                })?;
                return Ok(report);
            }
        };

        self.previous_layout_words = candidate.layout_words.clone();
        trace.emit_with(|| {
            TraceRecord::new("run_end")
                .run(run)
                .with("status", "success")
                .with("seed", candidate.seed.as_str())
                .with("repeat_share", candidate.repeat_share)
                .with("repeat_control_name", candidate.repeat_control)
                .with("full_word_count", candidate.full_words.len())
                .with("layout_word_count", candidate.layout_words.len())
                .with("repeat_source_word_count", candidate.repeat_source_words.len())
                .with("full_words", sorted_words(&candidate.full_words))
                .with("layout_words", sorted_words(&candidate.layout_words))
                .with("repeat_source_words", sorted_words(&candidate.repeat_source_words))
                .with("rejected_by_reason", histogram_by_code(&report.rejections))
        })?;
        report.accepted = Some(candidate.into_accepted());
        Ok(report)
    }

    fn timing(&self) -> &TimingStats {
        &self.timing
    }
}
