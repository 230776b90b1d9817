use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossword_generator::dictionary::{filter_forbidden, load_optional_word_set, load_word_list};
use crossword_generator::stats::{count_dictionary_letters, load_counted_keys, render_counted_keys};
use crossword_generator::{
    simulate, CountedKeys, Counts, Dictionary, ExhaustiveConfig, ExhaustiveSimulation, GeneratorError, KeyKind,
    MutateConfig, MutateSimulation, ScoreWeights, SeedPolicy, Simulation, SimulationResult, TraceSink,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod report;

use report::ReportHeader;

const DEFAULT_LOG_FILTER: &str = "repeatability=info,crossword_generator=info";

/// Measures how often crossword words repeat across many simulated generations
#[derive(Parser)]
#[command(name = "repeatability", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep the best-scoring candidate over every attempt of each run
    Exhaustive(ExhaustiveArgs),
    /// Accept the first candidate of each run that repeats few enough words, mutating seeds on the way
    Mutate(MutateArgs),
    /// Count letter frequencies over the dictionary
    LetterStats(LetterStatsArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Newline-delimited dictionary
    #[arg(short, long, default_value = "words.txt")]
    dictionary: PathBuf,
    /// Words removed from the dictionary; a missing file removes nothing
    #[arg(short, long, default_value = "forbidden_words.txt")]
    forbidden: PathBuf,
}

#[derive(Args)]
struct CommonArgs {
    /// Number of simulated runs
    runs: usize,
    #[command(flatten)]
    source: SourceArgs,
    /// Report path (default: <mode>.<YYYYMMDDHHMMSS>.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Seed of the random source; drawn from entropy when absent
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 9)]
    max_letter_set_size: usize,
    #[arg(long, default_value_t = 100)]
    max_attempts: usize,
    #[arg(long, default_value_t = 4)]
    min_word_length: usize,
    #[arg(long, default_value_t = 9)]
    min_layout_word_count: usize,
    /// Diagnostic trace log path
    #[arg(long)]
    trace_log: Option<PathBuf>,
    /// Optional path for one summary line per run
    #[arg(long)]
    summaries: Option<PathBuf>,
    /// Optional JSON output path for per-run reports
    #[arg(long)]
    json: Option<PathBuf>,
    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

#[derive(Args)]
struct ExhaustiveArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Word statistics; missing means no word has been seen yet
    #[arg(long, default_value = "exhaustive.words.txt")]
    word_stats: PathBuf,
    /// Letter statistics; missing means counted from the dictionary
    #[arg(long, default_value = "exhaustive.letters.txt")]
    letter_stats: PathBuf,
    #[arg(long, default_value_t = 0.10)]
    overlap_reject_threshold: f64,
    #[arg(long, default_value_t = 1)]
    exclude_min: usize,
    #[arg(long, default_value_t = 3)]
    exclude_max: usize,
    /// 0/random_alphabet or 1/rare_word_merge
    #[arg(long, default_value = "random_alphabet")]
    seed_policy: SeedPolicy,
    #[arg(long, default_value_t = 2.0)]
    weight_layout: f64,
    #[arg(long, default_value_t = 2.0)]
    weight_rare_full: f64,
    #[arg(long, default_value_t = 1.0)]
    weight_missing: f64,
    #[arg(long, default_value_t = 1.0)]
    weight_overlap: f64,
    #[arg(long, default_value_t = 1.0)]
    weight_rare_layout: f64,
    #[arg(long, default_value_t = 1.0)]
    weight_seed_diff: f64,
}
impl ExhaustiveArgs {
    fn config(&self) -> ExhaustiveConfig {
        ExhaustiveConfig {
            max_letter_set_size: self.common.max_letter_set_size,
            max_attempts: self.common.max_attempts,
            min_word_length: self.common.min_word_length,
            min_layout_word_count: self.common.min_layout_word_count,
            overlap_reject_threshold: self.overlap_reject_threshold,
            exclude_min: self.exclude_min,
            exclude_max: self.exclude_max,
            seed_policy: self.seed_policy,
            weights: ScoreWeights {
                layout: self.weight_layout,
                rare_full: self.weight_rare_full,
                missing: self.weight_missing,
                overlap: self.weight_overlap,
                rare_layout: self.weight_rare_layout,
                seed_diff: self.weight_seed_diff,
            },
        }
    }
}

#[derive(Args)]
struct MutateArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Word statistics; missing means no word has been seen yet
    #[arg(long, default_value = "mutate.words.txt")]
    word_stats: PathBuf,
    #[arg(long, default_value_t = 5)]
    max_swap_cycles: usize,
    /// Share of the dictionary forming the first run's repeat-control set
    #[arg(long, default_value_t = 0.10)]
    top_frequent_share: f64,
    #[arg(long, default_value_t = 0.40)]
    max_repeat_share: f64,
}
impl MutateArgs {
    fn config(&self) -> MutateConfig {
        MutateConfig {
            max_letter_set_size: self.common.max_letter_set_size,
            max_attempts: self.common.max_attempts,
            min_word_length: self.common.min_word_length,
            min_layout_word_count: self.common.min_layout_word_count,
            max_swap_cycles: self.max_swap_cycles,
            top_frequent_share: self.top_frequent_share,
            max_repeat_share: self.max_repeat_share,
        }
    }
}

#[derive(Args)]
struct LetterStatsArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(short, long, default_value = "exhaustive.letters.txt")]
    output: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Exhaustive(args) => run_exhaustive(&args),
        Command::Mutate(args) => run_mutate(&args),
        Command::LetterStats(args) => run_letter_stats(&args),
    }
}

fn load_dictionary(source: &SourceArgs) -> Result<Dictionary> {
    let dictionary = Dictionary::load(&source.dictionary, &source.forbidden)
        .with_context(|| format!("loading dictionary {}", source.dictionary.display()))?;
    info!(
        path = %source.dictionary.display(),
        words = dictionary.len(),
        letter_words = dictionary.letter_words().len(),
        "dictionary loaded"
    );
    Ok(dictionary)
}

/// Loads a statistics file, or builds the counts in memory when the file does not exist
/// # Returns
/// `Result<(CountedKeys, String)>` - the counts and a description of where they came from
fn load_stats<F>(path: &Path, kind: KeyKind, bootstrap: F) -> Result<(CountedKeys, String)>
where
    F: FnOnce() -> (Counts, &'static str),
{
    match load_counted_keys(path, kind) {
        Ok(keys) => {
            info!(path = %path.display(), keys = keys.counts.len(), "stats loaded");
            Ok((keys, path.display().to_string()))
        },
        Err(GeneratorError::StatsNotFound { .. }) => {
            let (counts, method) = bootstrap();
            info!(path = %path.display(), method, "stats file missing, bootstrapped in memory");
            Ok((CountedKeys { counts, crosswords_generated: None }, format!("bootstrap:{}", method)))
        },
        Err(e) => Err(e).with_context(|| format!("loading stats {}", path.display())),
    }
}

/// Runs `simulation` and writes its optional side outputs
fn drive<S: Simulation>(simulation: &mut S, common: &CommonArgs) -> Result<SimulationResult> {
    let mut rng = match common.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut trace = match &common.trace_log {
        Some(path) => TraceSink::create(path).with_context(|| format!("creating trace log {}", path.display()))?,
        None => TraceSink::disabled(),
    };

    let bar = if common.progress {
        let bar = ProgressBar::new(common.runs as u64);
        bar.set_style(ProgressStyle::with_template("{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})")?);
        bar.set_prefix(simulation.name());
        bar
    }
    else {
        ProgressBar::hidden()
    };
    let mut on_run = |run: usize| bar.set_position(run as u64);

    let result = simulate(simulation, common.runs, &mut rng, &mut trace, Some(&mut on_run))
        .with_context(|| format!("{} simulation failed", simulation.name()))?;
    bar.finish_and_clear();
    info!(
        mode = simulation.name(),
        successful = result.successful_runs,
        failed = result.failed_runs,
        distinct_words = result.frequency.len(),
        "simulation finished"
    );

    if let Some(path) = &common.summaries {
        report::write_summaries(path, &result)?;
        info!(path = %path.display(), "summaries saved");
    }
    if let Some(path) = &common.json {
        report::write_json(path, &result)?;
        info!(path = %path.display(), "run reports saved");
    }
    Ok(result)
}

fn check_runs(common: &CommonArgs) -> Result<()> {
    if common.runs < 1 {
        bail!("runs must be at least 1");
    }
    Ok(())
}

fn output_path(common: &CommonArgs, prefix: &str) -> PathBuf {
    common.output.clone().unwrap_or_else(|| report::default_output_path(prefix, Utc::now()))
}

fn run_exhaustive(args: &ExhaustiveArgs) -> Result<()> {
    let common = &args.common;
    check_runs(common)?;
    let dictionary = load_dictionary(&common.source)?;
    let (word_stats, word_stats_source) =
        load_stats(&args.word_stats, KeyKind::Word, || (Counts::new(), "empty_word_stats"))?;
    let (letter_stats, letter_stats_source) = load_stats(&args.letter_stats, KeyKind::Letter, || {
        (count_dictionary_letters(dictionary.words()).counts, "from_dictionary")
    })?;

    let config = args.config();
    let mut simulation = ExhaustiveSimulation::new(config.clone(), &dictionary, &word_stats.counts, &letter_stats.counts)?;
    let result = drive(&mut simulation, common)?;

    let output = output_path(common, simulation.name());
    let mut header = ReportHeader::new("repeatability exhaustive", Utc::now(), &output);
    header.push_run_counts(common.runs, &result);
    header.push("source_dictionary", common.source.dictionary.display());
    header.push("source_forbidden", common.source.forbidden.display());
    header.push("input_word_stats", word_stats_source);
    header.push("input_letter_stats", letter_stats_source);
    header.push("exhaustive_seed_policy", config.seed_policy);
    header.push("exhaustive_overlap_reject_threshold", config.overlap_reject_threshold);
    header.push("exhaustive_exclude_min", config.exclude_min);
    header.push("exhaustive_exclude_max", config.exclude_max);
    header.push("exhaustive_max_attempts", config.max_attempts);
    header.extend(result.timing.header_entries(simulation.name()));
    report::write_counted_keys(&output, &header, &result.frequency)?;
    info!(path = %output.display(), "report saved");
    Ok(())
}

fn run_mutate(args: &MutateArgs) -> Result<()> {
    let common = &args.common;
    check_runs(common)?;
    let dictionary = load_dictionary(&common.source)?;
    let (word_stats, word_stats_source) =
        load_stats(&args.word_stats, KeyKind::Word, || (Counts::new(), "empty_word_stats"))?;

    let config = args.config();
    let mut simulation = MutateSimulation::new(config.clone(), &dictionary, &word_stats.counts)?;
    info!(control_words = simulation.top_frequent_words().len(), "first-run repeat control set ready");
    let result = drive(&mut simulation, common)?;

    let output = output_path(common, simulation.name());
    let mut header = ReportHeader::new("repeatability mutate", Utc::now(), &output);
    header.push_run_counts(common.runs, &result);
    header.push("crosswords_generated", result.successful_runs);
    if let Some(previous) = word_stats.crosswords_generated {
        header.push("input_crosswords_generated", previous);
    }
    header.push("source_dictionary", common.source.dictionary.display());
    header.push("source_forbidden", common.source.forbidden.display());
    header.push("input_word_stats", word_stats_source);
    header.push("mutate_top_frequent_share", config.top_frequent_share);
    header.push("mutate_max_repeat_share", config.max_repeat_share);
    header.push("mutate_max_swap_cycles", config.max_swap_cycles);
    header.push("mutate_max_generation_attempts", config.max_attempts);
    header.extend(result.timing.header_entries(simulation.name()));
    report::write_counted_keys(&output, &header, &result.frequency)?;
    info!(path = %output.display(), "report saved");
    Ok(())
}

fn run_letter_stats(args: &LetterStatsArgs) -> Result<()> {
    let source = &args.source;
    let words = load_word_list(&source.dictionary)
        .with_context(|| format!("loading dictionary {}", source.dictionary.display()))?;
    let forbidden = load_optional_word_set(&source.forbidden)
        .with_context(|| format!("loading forbidden words {}", source.forbidden.display()))?;
    let dictionary_words = words.len();
    let allowed = filter_forbidden(words, &forbidden);
    let tally = count_dictionary_letters(&allowed);

    let header = vec![
        ("format".to_string(), report::FORMAT_VERSION.to_string()),
        ("generated_by".to_string(), "repeatability letter-stats".to_string()),
        ("source_dictionary".to_string(), source.dictionary.display().to_string()),
        ("source_forbidden".to_string(), source.forbidden.display().to_string()),
        ("dictionary_words".to_string(), dictionary_words.to_string()),
        ("forbidden_words".to_string(), forbidden.len().to_string()),
        ("allowed_words_before_ascii_filter".to_string(), allowed.len().to_string()),
        ("skipped_non_ascii_words".to_string(), tally.skipped_non_ascii_words.to_string()),
        ("total_letters_counted".to_string(), tally.total_letters.to_string()),
    ];
    report::create_parent(&args.output)?;
    std::fs::write(&args.output, render_counted_keys(&header, tally.counts.iter()))
        .with_context(|| format!("writing letter stats {}", args.output.display()))?;
    info!(path = %args.output.display(), letters = tally.counts.len(), "letter stats saved");
    Ok(())
}
