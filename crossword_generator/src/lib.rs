//! Crossword content generation: seed letter sets, word matching, grid layout synthesis, candidate
//! scoring, and repeatability simulations that measure how often words recur across many runs.
pub mod config;
pub mod dictionary;
pub mod error;
pub mod layout;
pub mod letters;
pub mod reject;
pub mod score;
pub mod seed;
pub mod sim;
pub mod stats;
pub mod timing;
pub mod trace;

pub use config::{ExhaustiveConfig, MutateConfig, SeedPolicy};
pub use dictionary::Dictionary;
pub use error::{GeneratorError, Result};
pub use layout::{synthesize, Layout};
pub use reject::{RejectReason, Rejection};
pub use score::{ScoreParts, ScoreWeights};
pub use sim::{simulate, AcceptedRun, ExhaustiveSimulation, MutateSimulation, RunReport, Simulation, SimulationResult};
pub use stats::{CountedKeys, Counts, KeyKind};
pub use timing::TimingStats;
pub use trace::{TraceRecord, TraceSink};
