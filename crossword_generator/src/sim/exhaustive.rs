//! Exhaustive-best simulation: every attempt that passes the gates is scored, and a run keeps the
//! best candidate over all of its attempts.
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use super::{record_phase, sorted_words, step_record, AcceptedRun, RunReport, Simulation};
use crate::config::{ExhaustiveConfig, SeedPolicy};
use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::layout;
use crate::letters;
use crate::reject::{histogram_by_code, RejectReason, Rejection, Step};
use crate::score::{self, RankKey, ScoreInputs, ScoreParts};
use crate::seed::{self, Exclusion, SeedLengthRange};
use crate::stats::Counts;
use crate::timing::{millis, TimingStats};
use crate::trace::{TraceRecord, TraceSink};

const SELECT_EXCLUDED_LETTERS: Step = Step::new(1, "select_excluded_letters");
const BUILD_SEED: Step = Step::new(2, "build_seed");
const BUILD_FULL_WORD_SET: Step = Step::new(3, "build_full_word_set");
const CHECK_OVERLAP: Step = Step::new(4, "check_overlap");
const BUILD_LAYOUT_INPUT: Step = Step::new(5, "build_layout_input_word_set");
const BUILD_LAYOUT_WORD_SET: Step = Step::new(6, "build_layout_word_set");
const VALIDATE_LAYOUT: Step = Step::new(7, "validate_layout");
const SCORE_CANDIDATE: Step = Step::new(8, "score_candidate");
const COMPARE_CANDIDATE: Step = Step::new(9, "compare_candidate");

const EXCLUDE_PHASE: &str = "exclude_letters";
const SEED_PHASE: &str = "seed_generation";
const FULL_SET_PHASE: &str = "build_full_word_set";
const OVERLAP_PHASE: &str = "overlap_check";
const LAYOUT_INPUT_PHASE: &str = "prepare_layout_input";
const LAYOUT_BUILD_PHASE: &str = "layout_build";
const VALIDATION_PHASE: &str = "validation";
const SCORE_PHASE: &str = "score";
const COMPARE_PHASE: &str = "compare_best";

const RARE_MERGE_FALLBACK_REASON: &str = "rare_word_merge_insufficient_letters_fallback_to_random_alphabet";

/// What the previous successful run left behind
#[derive(Clone, Debug, Default)]
struct CarriedState {
    seed: String,
    full_words: BTreeSet<String>,
    layout_words: BTreeSet<String>,
}

/// A fully scored attempt
#[derive(Clone, Debug)]
struct Candidate {
    seed: String,
    full_words: BTreeSet<String>,
    layout_words: BTreeSet<String>,
    missing_words: BTreeSet<String>,
    overlap_ratio: f64,
    score: ScoreParts,
}
impl Candidate {
    fn rank(&self) -> RankKey<'_> {
        RankKey {
            score: self.score.score,
            layout_word_count: self.layout_words.len(),
            overlap_ratio: self.overlap_ratio,
            seed: &self.seed,
        }
    }

    fn into_accepted(self) -> AcceptedRun {
        AcceptedRun {
            seed: self.seed,
            full_words: self.full_words,
            layout_words: self.layout_words,
            missing_words: self.missing_words,
            overlap_ratio: Some(self.overlap_ratio),
            score: Some(self.score),
            repeat_share: None,
            repeat_control: None,
            repeat_source_words: BTreeSet::new(),
        }
    }
}

/// The random-alphabet policy's draw
struct RandomAlphabetDraw {
    exclusion: Exclusion,
    reduced_alphabet: Vec<char>,
    seed: String,
    exclude_time: Duration,
    seed_time: Duration,
}

type Outcome = std::result::Result<Candidate, Rejection>;

/// Exhaustive-best repeatability simulation
///
/// Each attempt draws a seed, builds its full word set, rejects it when it overlaps the previous
/// run's full word set too much, lays out the words not placed last run, validates the layout
/// and scores it. The best candidate over all attempts becomes the run's result and the state
/// the next run avoids.
pub struct ExhaustiveSimulation<'a> {
    config: ExhaustiveConfig,
    dictionary: &'a Dictionary,
    word_stats: &'a Counts,
    letter_stats: &'a Counts,
    range: SeedLengthRange,
    state: CarriedState,
    timing: TimingStats,
}

impl<'a> ExhaustiveSimulation<'a> {
    /// # Arguments
    /// * `config` - Validated before use
    /// * `dictionary` - Words to build crosswords from
    /// * `word_stats` - Historical word counts, used for rarity
    /// * `letter_stats` - Letter counts, used to pick letters to exclude
    pub fn new(
        config: ExhaustiveConfig,
        dictionary: &'a Dictionary,
        word_stats: &'a Counts,
        letter_stats: &'a Counts,
    ) -> Result<ExhaustiveSimulation<'a>> {
        config.validate()?;
        let range = SeedLengthRange::for_max_size(config.max_letter_set_size);
        Ok(ExhaustiveSimulation {
            config,
            dictionary,
            word_stats,
            letter_stats,
            range,
            state: CarriedState::default(),
            timing: TimingStats::new(),
        })
    }

    pub fn config(&self) -> &ExhaustiveConfig {
        &self.config
    }

    pub fn previous_seed(&self) -> &str {
        &self.state.seed
    }

    pub fn previous_full_words(&self) -> &BTreeSet<String> {
        &self.state.full_words
    }

    pub fn previous_layout_words(&self) -> &BTreeSet<String> {
        &self.state.layout_words
    }

    fn random_alphabet_draw<R: Rng + ?Sized>(&self, letter_stats: &Counts, rng: &mut R) -> RandomAlphabetDraw {
        let exclude_start = Instant::now();
        let exclusion = seed::select_exclusion(
            &self.state.seed,
            letter_stats,
            self.config.exclude_min..=self.config.exclude_max,
            rng,
        );
        let exclude_time = exclude_start.elapsed();

        let seed_start = Instant::now();
        let reduced_alphabet = exclusion.reduced_alphabet();
        let seed = seed::random_alphabet_letters(self.range, &reduced_alphabet, rng);
        let seed_time = seed_start.elapsed();
        RandomAlphabetDraw { exclusion, reduced_alphabet, seed, exclude_time, seed_time }
    }

    fn random_alphabet_seed<R: Rng + ?Sized>(
        &mut self,
        run: usize,
        attempt: usize,
        rng: &mut R,
        trace: &mut TraceSink,
        record: &mut TraceRecord,
    ) -> Result<String> {
        let letter_stats = self.letter_stats;
        let draw = self.random_alphabet_draw(letter_stats, rng);
        let policy = SeedPolicy::RandomAlphabet;

        self.timing.add(EXCLUDE_PHASE, draw.exclude_time);
        record.insert("exclude_letters_ms", millis(draw.exclude_time));
        record.insert("exclude_count", draw.exclusion.exclude_count);
        record.insert("excluded_letters", draw.exclusion.excluded.iter().collect::<String>());
        trace.emit_with(|| {
            let count_of = |c: &char| letter_stats.get(&c.to_string()).copied().unwrap_or(0);
            let previous_counts: BTreeMap<char, usize> =
                draw.exclusion.ranked_previous.iter().map(|c| (*c, count_of(c))).collect();
            let excluded_counts: BTreeMap<char, usize> =
                draw.exclusion.excluded.iter().map(|c| (*c, count_of(c))).collect();
            step_record(run, attempt, SELECT_EXCLUDED_LETTERS)
                .with("seed_selection_approach_id", policy.id() as usize)
                .with("seed_selection_approach_name", policy.name())
                .with("previous_seed", self.state.seed.as_str())
                .with("previous_seed_letters_sorted_by_frequency", draw.exclusion.ranked_previous.clone())
                .with("previous_seed_letter_counts", previous_counts)
                .with("exclude_count_requested", draw.exclusion.exclude_count)
                .with("excluded_letters", draw.exclusion.excluded.iter().collect::<String>())
                .with("excluded_letter_counts", excluded_counts)
        })?;

        self.timing.add(SEED_PHASE, draw.seed_time);
        record.insert("seed_generation_ms", millis(draw.seed_time));
        record.insert("seed", draw.seed.as_str());
        trace.emit_with(|| {
            step_record(run, attempt, BUILD_SEED)
                .with("seed_selection_approach_id", policy.id() as usize)
                .with("seed_selection_approach_name", policy.name())
                .with("seed", draw.seed.as_str())
                .with("seed_length", draw.seed.len())
                .with("seed_length_range_min", self.range.min)
                .with("seed_length_range_max", self.range.max)
                .with("reduced_alphabet", draw.reduced_alphabet.iter().collect::<String>())
                .with("reduced_alphabet_count", draw.reduced_alphabet.len())
        })?;
        Ok(draw.seed)
    }

    /// Rare word merge, falling back to the random-alphabet draw without letter statistics when
    /// the merge comes up short
    fn rare_word_merge_seed<R: Rng + ?Sized>(
        &mut self,
        run: usize,
        attempt: usize,
        rng: &mut R,
        trace: &mut TraceSink,
        record: &mut TraceRecord,
    ) -> Result<String> {
        let seed_start = Instant::now();
        let dictionary = self.dictionary;
        let pool = dictionary.letter_words();
        let merge = seed::rare_word_merge(pool, self.word_stats, self.range, rng);
        let merged_seed = seed::seed_from_letters(&merge.letters, rng);
        let fallback = if merged_seed.len() < self.range.min {
            Some(self.random_alphabet_draw(&Counts::new(), rng))
        }
        else {
            None
        };
        let seed_time = seed_start.elapsed();
        let seed = match &fallback {
            Some(draw) => draw.seed.clone(),
            None => merged_seed,
        };
        if let Some(draw) = &fallback {
            debug!(run, attempt, picks = merge.pick_attempts, "rare word merge fell back to random alphabet");
            record.insert("exclude_count", draw.exclusion.exclude_count);
            record.insert("excluded_letters", draw.exclusion.excluded.iter().collect::<String>());
        }
        else {
            record.insert("exclude_count", 0usize);
            record.insert("excluded_letters", "");
        }

        self.timing.add(EXCLUDE_PHASE, Duration::ZERO);
        record.insert("exclude_letters_ms", 0.0);
        self.timing.add(SEED_PHASE, seed_time);
        record.insert("seed_generation_ms", millis(seed_time));
        record.insert("seed", seed.as_str());

        let policy = SeedPolicy::RareWordMerge;
        let word_stats = self.word_stats;
        trace.emit_with(|| {
            let selected_counts: BTreeMap<&str, usize> = merge
                .selected_words
                .iter()
                .map(|w| (w.as_str(), word_stats.get(w).copied().unwrap_or(0)))
                .collect();
            let (reduced_alphabet, reduced_alphabet_count) = match &fallback {
                Some(draw) => (draw.reduced_alphabet.iter().collect::<String>(), draw.reduced_alphabet.len()),
                None => (String::new(), 0),
            };
            step_record(run, attempt, BUILD_SEED)
                .with("seed_selection_approach_id", policy.id() as usize)
                .with("seed_selection_approach_name", policy.name())
                .with("seed", seed.as_str())
                .with("seed_length", seed.len())
                .with("seed_length_range_min", self.range.min)
                .with("seed_length_range_max", self.range.max)
                .with("seed_length_rule", "accept_any_length_within_range")
                .with("final_merged_length", merge.length())
                .with("source_word_pool_size", pool.len())
                .with("pick_attempt_limit", merge.pick_limit)
                .with("pick_attempts_used", merge.pick_attempts)
                .with("reset_round_count", merge.reset_rounds)
                .with("pick_history_count", merge.pick_history.total)
                .with("pick_history_sample", &merge.pick_history.sample)
                .with("pick_history_sample_truncated", merge.pick_history.is_truncated())
                .with("selected_source_words", merge.selected_words.clone())
                .with("selected_source_word_counts", selected_counts)
                .with("rejected_source_word_count", merge.rejected_words)
                .with("rejected_source_words_sample", &merge.rejected_history.sample)
                .with("rejected_source_words_sample_truncated", merge.rejected_history.is_truncated())
                .with("fallback_used", fallback.is_some())
                .with("fallback_reason", if fallback.is_some() { RARE_MERGE_FALLBACK_REASON } else { "" })
                .with("reduced_alphabet", reduced_alphabet)
                .with("reduced_alphabet_count", reduced_alphabet_count)
        })?;
        Ok(seed)
    }

    /// Runs one attempt through every gate
    /// # Returns
    /// `Result<Outcome>` - the scored candidate or the rejection that stopped it; `Err` only for
    /// trace write failures
    fn evaluate<R: Rng + ?Sized>(
        &mut self,
        run: usize,
        attempt: usize,
        rng: &mut R,
        trace: &mut TraceSink,
        record: &mut TraceRecord,
    ) -> Result<Outcome> {
        let seed = match self.config.seed_policy {
            SeedPolicy::RandomAlphabet => self.random_alphabet_seed(run, attempt, rng, trace, record)?,
            SeedPolicy::RareWordMerge => self.rare_word_merge_seed(run, attempt, rng, trace, record)?,
        };
        let min_word_length = self.config.min_word_length;

        let start = Instant::now();
        let matched = letters::match_words(&seed, self.dictionary.letter_words());
        let raw_word_count = matched.len();
        let full_words: BTreeSet<String> = matched.into_iter().filter(|w| w.len() >= min_word_length).collect();
        record_phase(&mut self.timing, record, FULL_SET_PHASE, start);
        record.insert("full_word_count", full_words.len());
        trace.emit_with(|| {
            step_record(run, attempt, BUILD_FULL_WORD_SET)
                .with("seed", seed.as_str())
                .with("raw_word_count", raw_word_count)
                .with("ignored_short_words_count", raw_word_count - full_words.len())
                .with("min_word_length", min_word_length)
                .with("full_word_count", full_words.len())
                .with("full_words", &full_words)
        })?;
        if full_words.is_empty() {
            return Ok(Err(Rejection::new(RejectReason::EmptyFullWordSet, BUILD_FULL_WORD_SET)));
        }

        let start = Instant::now();
        let overlap_ratio = score::overlap_ratio(&full_words, &self.state.full_words);
        let overlap_words: BTreeSet<String> = full_words.intersection(&self.state.full_words).cloned().collect();
        record_phase(&mut self.timing, record, OVERLAP_PHASE, start);
        record.insert("overlap_ratio", overlap_ratio);
        record.insert("overlap_word_count", overlap_words.len());
        let threshold = self.config.overlap_reject_threshold;
        trace.emit_with(|| {
            step_record(run, attempt, CHECK_OVERLAP)
                .with("current_seed", seed.as_str())
                .with("previous_seed", self.state.seed.as_str())
                .with("current_full_word_count", full_words.len())
                .with("current_full_words", &full_words)
                .with("previous_full_word_count", self.state.full_words.len())
                .with("previous_full_words", &self.state.full_words)
                .with("overlap_ratio", overlap_ratio)
                .with("overlap_threshold", threshold)
                .with("overlap_word_count", overlap_words.len())
                .with("overlap_words", &overlap_words)
                .with("passes_overlap_check", overlap_ratio < threshold)
        })?;
        if overlap_ratio >= threshold {
            return Ok(Err(Rejection::new(RejectReason::OverlapRatioGeThreshold, CHECK_OVERLAP)));
        }

        let start = Instant::now();
        let layout_input_words: BTreeSet<String> = full_words.difference(&self.state.layout_words).cloned().collect();
        let pre_marked_missing: BTreeSet<String> = full_words.intersection(&self.state.layout_words).cloned().collect();
        record_phase(&mut self.timing, record, LAYOUT_INPUT_PHASE, start);
        record.insert("layout_input_word_count", layout_input_words.len());
        record.insert("pre_marked_missing_word_count", pre_marked_missing.len());
        trace.emit_with(|| {
            step_record(run, attempt, BUILD_LAYOUT_INPUT)
                .with("layout_input_word_count", layout_input_words.len())
                .with("layout_input_words", &layout_input_words)
                .with("pre_marked_missing_word_count", pre_marked_missing.len())
                .with("pre_marked_missing_words", &pre_marked_missing)
                .with("passes_layout_input_check", !layout_input_words.is_empty())
        })?;
        if layout_input_words.is_empty() {
            return Ok(Err(Rejection::new(RejectReason::EmptyLayoutInputWordSet, BUILD_LAYOUT_INPUT)));
        }

        let start = Instant::now();
        let input: Vec<&String> = layout_input_words.iter().collect();
        let layout_words = layout::synthesize(&input, rng).word_set(min_word_length);
        let dropped: BTreeSet<String> = layout_input_words.difference(&layout_words).cloned().collect();
        record_phase(&mut self.timing, record, LAYOUT_BUILD_PHASE, start);
        record.insert("layout_word_count", layout_words.len());
        record.insert("dropped_by_layout_word_count", dropped.len());
        trace.emit_with(|| {
            step_record(run, attempt, BUILD_LAYOUT_WORD_SET)
                .with("layout_word_count", layout_words.len())
                .with("layout_words", &layout_words)
                .with("dropped_by_layout_word_count", dropped.len())
                .with("dropped_by_layout_words", &dropped)
        })?;

        let start = Instant::now();
        let minimum = self.config.min_layout_word_count;
        let layout_word_count_ok = layout_words.len() >= minimum;
        let all_used = letters::all_seed_letters_used(&seed, &layout_words);
        let unused = letters::unused_seed_letters(&seed, &layout_words);
        record_phase(&mut self.timing, record, VALIDATION_PHASE, start);
        trace.emit_with(|| {
            step_record(run, attempt, VALIDATE_LAYOUT)
                .with("layout_word_count", layout_words.len())
                .with("minimum_layout_word_count", minimum)
                .with("layout_word_count_ok", layout_word_count_ok)
                .with("all_seed_letters_used", all_used)
                .with("unused_seed_letters", unused.clone())
        })?;
        if !layout_word_count_ok {
            return Ok(Err(Rejection::new(RejectReason::LayoutWordsBelowMinimum, VALIDATE_LAYOUT)));
        }
        if !all_used {
            return Ok(Err(Rejection::new(RejectReason::SeedLettersNotFullyUsed, VALIDATE_LAYOUT)));
        }

        let start = Instant::now();
        let missing_words: BTreeSet<String> = full_words.difference(&layout_words).cloned().collect();
        let inputs = ScoreInputs {
            seed: &seed,
            previous_seed: &self.state.seed,
            full_words: &full_words,
            layout_input_words: &layout_input_words,
            layout_words: &layout_words,
            missing_words: &missing_words,
            overlap_ratio,
            word_stats: self.word_stats,
        };
        let parts = score::score(&inputs, &self.config.weights);
        record_phase(&mut self.timing, record, SCORE_PHASE, start);
        record.insert("missing_word_count", missing_words.len());
        record.insert("score", parts.score);
        let weights = self.config.weights;
        trace.emit_with(|| {
            let weight_map: BTreeMap<&str, f64> = [
                ("layout", weights.layout),
                ("rare_full", weights.rare_full),
                ("missing", weights.missing),
                ("overlap", weights.overlap),
                ("rare_layout", weights.rare_layout),
                ("seed_diff", weights.seed_diff),
            ]
            .into_iter()
            .collect();
            step_record(run, attempt, SCORE_CANDIDATE)
                .with("missing_word_count", missing_words.len())
                .with("missing_words", &missing_words)
                .with("score", parts.score)
                .with("p_layout", parts.p_layout)
                .with("p_rare_full", parts.p_rare_full)
                .with("p_missing", parts.p_missing)
                .with("p_overlap", parts.p_overlap)
                .with("p_rare_layout", parts.p_rare_layout)
                .with("p_seed_diff", parts.p_seed_diff)
                .with("weights", weight_map)
        })?;

        Ok(Ok(Candidate {
            seed,
            full_words,
            layout_words,
            missing_words,
            overlap_ratio,
            score: parts,
        }))
    }
}

impl<'a> Simulation for ExhaustiveSimulation<'a> {
    fn name(&self) -> &'static str {
        "exhaustive"
    }

    fn run_once<R: Rng + ?Sized>(&mut self, run: usize, rng: &mut R, trace: &mut TraceSink) -> Result<RunReport> {
        let mut report = RunReport::new(run);
        let mut best: Option<Candidate> = None;
        trace.emit_with(|| {
            TraceRecord::new("run_start")
                .run(run)
                .with("previous_seed", self.state.seed.as_str())
                .with("previous_full_word_count", self.state.full_words.len())
                .with("previous_layout_word_count", self.state.layout_words.len())
        })?;

        for attempt in 1..=self.config.max_attempts {
            report.attempts = attempt;
            let best_score = best.as_ref().map(|b| b.score.score);
            trace.emit_with(|| {
                TraceRecord::new("attempt_start")
                    .run(run)
                    .attempt(attempt)
                    .with("previous_seed", self.state.seed.as_str())
                    .with("previous_full_word_count", self.state.full_words.len())
                    .with("previous_layout_word_count", self.state.layout_words.len())
                    .with("current_best_score", best_score)
            })?;

            let mut record = TraceRecord::new("attempt_end").run(run).attempt(attempt);
            let candidate = match self.evaluate(run, attempt, rng, trace, &mut record)? {
                Ok(candidate) => candidate,
                Err(rejection) => {
                    report.reject(&rejection);
                    tracing::trace!(run, attempt, reason = rejection.reason.code(), "attempt rejected");
                    record.insert("status", "rejected");
                    record.insert("reject_reason", rejection.reason.code());
                    record.insert("reject_step_index", rejection.step.index);
                    record.insert("reject_step_name", rejection.step.name);
                    record.insert("reject_criterion", rejection.criterion());
                    trace.emit_with(|| {
                        let field = |key: &str| record.get(key).cloned().unwrap_or(serde_json::Value::Null);
                        TraceRecord::new("attempt_reject")
                            .run(run)
                            .attempt(attempt)
                            .with("reject_reason", rejection.reason.code())
                            .with("reject_step_index", rejection.step.index)
                            .with("reject_step_name", rejection.step.name)
                            .with("reject_criterion", rejection.criterion())
                            .with("seed", field("seed"))
                            .with("full_word_count", field("full_word_count"))
                            .with("layout_input_word_count", field("layout_input_word_count"))
                            .with("layout_word_count", field("layout_word_count"))
                            .with("overlap_ratio", field("overlap_ratio"))
                    })?;
                    trace.emit(&record)?;
                    continue;
                }
            };

            let start = Instant::now();
            let best_rank = best.as_ref().map(|b| b.rank());
            let (better, reason) = score::is_better(&candidate.rank(), best_rank.as_ref());
            record_phase(&mut self.timing, &mut record, COMPARE_PHASE, start);
            let candidate_score = candidate.score.score;
            trace.emit_with(|| {
                TraceRecord::new("attempt_compare")
                    .run(run)
                    .attempt(attempt)
                    .step(COMPARE_CANDIDATE.index, COMPARE_CANDIDATE.name)
                    .with("seed", candidate.seed.as_str())
                    .with("candidate_score", candidate_score)
                    .with("best_score_before", best_score)
                    .with("is_better", better)
                    .with("compare_reason", reason.code())
            })?;
            if better {
                best = Some(candidate);
                record.insert("status", "accepted_as_best");
            }
            else {
                record.insert("status", "accepted_not_best");
            }
            record.insert("candidate_score", candidate_score);
            trace.emit(&record)?;
        }

        let best = match best {
            Some(best) => best,
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

        self.state = CarriedState {
            seed: best.seed.clone(),
            full_words: best.full_words.clone(),
            layout_words: best.layout_words.clone(),
        };
        trace.emit_with(|| {
            TraceRecord::new("run_end")
                .run(run)
                .with("status", "success")
                .with("best_seed", best.seed.as_str())
                .with("best_score", best.score.score)
                .with("best_layout_word_count", best.layout_words.len())
                .with("best_full_word_count", best.full_words.len())
                .with("best_missing_word_count", best.missing_words.len())
                .with("best_full_words", sorted_words(&best.full_words))
                .with("best_layout_words", sorted_words(&best.layout_words))
                .with("best_missing_words", sorted_words(&best.missing_words))
                .with("rejected_by_reason", histogram_by_code(&report.rejections))
        })?;
        debug!(run, seed = %best.seed, score = best.score.score, "best candidate kept");
        report.accepted = Some(best.into_accepted());
        Ok(report)
    }

    fn timing(&self) -> &TimingStats {
        &self.timing
    }
}
