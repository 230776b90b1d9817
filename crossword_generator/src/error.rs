use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The required dictionary file does not exist.
    #[error("dictionary file not found: {}", path.display())]
    DictionaryNotFound { path: PathBuf },

    /// A counted-key statistics file does not exist.
    #[error("stats file not found: {}", path.display())]
    StatsNotFound { path: PathBuf },

    /// A statistics line could not be parsed.
    #[error("invalid stats line at {}:{line}. {message}", path.display())]
    StatsParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Seed selection policy identifier that is neither known by id nor by name.
    #[error("unsupported seed selection policy: {0}. Supported: 0 (random_alphabet), 1 (rare_word_merge)")]
    UnknownSeedPolicy(String),

    /// A configuration value outside of its allowed range.
    #[error("config error: {0}")]
    InvalidConfig(String),

    /// Propagated I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
