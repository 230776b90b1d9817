//! Repeatability simulations: many sequential runs, each carrying state into the next.
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::reject::{RejectReason, Rejection, RejectionHistogram, Step};
use crate::score::ScoreParts;
use crate::timing::{millis, TimingStats};
use crate::trace::{TraceRecord, TraceSink};

pub mod exhaustive;
pub mod mutate;

pub use exhaustive::ExhaustiveSimulation;
pub use mutate::MutateSimulation;

/// The candidate a run accepted
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AcceptedRun {
    pub seed: String,
    pub full_words: BTreeSet<String>,
    pub layout_words: BTreeSet<String>,
    pub missing_words: BTreeSet<String>,
    /// Overlap with the previous accepted full word set (exhaustive mode)
    pub overlap_ratio: Option<f64>,
    pub score: Option<ScoreParts>,
    /// Share of the full word set found in the repeat-control set (mutate mode)
    pub repeat_share: Option<f64>,
    pub repeat_control: Option<&'static str>,
    pub repeat_source_words: BTreeSet<String>,
}

/// Outcome of one run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub run: usize,
    /// Attempts spent, including the accepting one
    pub attempts: usize,
    pub accepted: Option<AcceptedRun>,
    pub rejections: RejectionHistogram,
}
impl RunReport {
    pub fn new(run: usize) -> RunReport {
        RunReport { run, attempts: 0, accepted: None, rejections: RejectionHistogram::new() }
    }

    pub fn is_success(&self) -> bool {
        self.accepted.is_some()
    }

    pub fn reject(&mut self, rejection: &Rejection) {
        *self.rejections.entry(rejection.reason).or_insert(0) += 1;
    }

    pub fn rejected_count(&self, reason: RejectReason) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    /// One line per run: `SEED attempts full_count layout_count [W1, W2, ...]`, or
    /// `- attempts 0 0 []` for a failed run
    pub fn summary_line(&self) -> String {
        match &self.accepted {
            Some(accepted) => {
                let words: Vec<&str> = accepted.full_words.iter().map(|w| w.as_str()).collect();
                format!(
                    "{} {} {} {} [{}]",
                    accepted.seed,
                    self.attempts,
                    accepted.full_words.len(),
                    accepted.layout_words.len(),
                    words.join(", ")
                )
            },
            None => format!("- {} 0 0 []", self.attempts),
        }
    }
}

/// A simulation mode that can be driven run by run
pub trait Simulation {
    /// Prefix of this mode's report keys
    fn name(&self) -> &'static str;

    /// Executes run `run` (1-based); carried state is updated only when the run succeeds
    fn run_once<R: Rng + ?Sized>(&mut self, run: usize, rng: &mut R, trace: &mut TraceSink) -> Result<RunReport>;

    fn timing(&self) -> &TimingStats;
}

/// Totals over every run of a simulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationResult {
    /// How many accepted full word sets each word appeared in
    pub frequency: BTreeMap<String, usize>,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub runs: Vec<RunReport>,
    pub timing: TimingStats,
}
impl SimulationResult {
    pub fn summaries(&self) -> Vec<String> {
        self.runs.iter().map(|run| run.summary_line()).collect()
    }

    /// Rejections per reason over all runs
    pub fn rejections(&self) -> RejectionHistogram {
        let mut total = RejectionHistogram::new();
        for run in self.runs.iter() {
            for (reason, count) in run.rejections.iter() {
                *total.entry(*reason).or_insert(0) += count;
            }
        }
        total
    }
}

/// Drives `runs` sequential runs of `simulation`
/// # Arguments
/// * `simulation` - The mode to run; owns all carried state
/// * `runs` - Number of runs
/// * `rng` - The single source of randomness for every run
/// * `trace` - Diagnostic trace sink, possibly disabled
/// * `progress` - Called with the run number after each run
/// # Returns
/// `Result<SimulationResult>` - totals, or the first fatal error
pub fn simulate<S, R>(
    simulation: &mut S,
    runs: usize,
    rng: &mut R,
    trace: &mut TraceSink,
    mut progress: Option<&mut dyn FnMut(usize)>,
) -> Result<SimulationResult>
where
    S: Simulation,
    R: Rng + ?Sized,
{
    let mut result = SimulationResult::default();
    for run in 1..=runs {
        let report = simulation.run_once(run, rng, trace)?;
        match &report.accepted {
            Some(accepted) => {
                result.successful_runs += 1;
                for word in accepted.full_words.iter() {
                    *result.frequency.entry(word.clone()).or_insert(0) += 1;
                }
                debug!(run, seed = %accepted.seed, attempts = report.attempts, "run accepted");
            },
            None => {
                result.failed_runs += 1;
                debug!(run, attempts = report.attempts, "run failed");
            }
        }
        result.runs.push(report);
        if let Some(callback) = progress.as_deref_mut() {
            callback(run);
        }
    }
    trace.flush()?;
    result.timing = simulation.timing().clone();
    debug!(
        mode = simulation.name(),
        successful = result.successful_runs,
        failed = result.failed_runs,
        "simulation finished"
    );
    Ok(result)
}

/// Owned sorted copy of a word set, for trace payloads
pub(crate) fn sorted_words(words: &BTreeSet<String>) -> Vec<String> {
    words.iter().cloned().collect()
}

pub(crate) fn step_record(run: usize, attempt: usize, step: Step) -> TraceRecord {
    TraceRecord::new("attempt_step").run(run).attempt(attempt).step(step.index, step.name)
}

/// Records a phase's time since `start` and notes it as `<phase>_ms` on the attempt record
pub(crate) fn record_phase(timing: &mut TimingStats, record: &mut TraceRecord, phase: &'static str, start: Instant) {
    let elapsed = timing.record(phase, start);
    record.insert(&format!("{}_ms", phase), millis(elapsed));
}
