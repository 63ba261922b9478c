use thiserror::Error;

/// Unified error type for the lot pipeline.
///
/// Recoverable conditions (an item dropped for bad data, an infeasible
/// bid, a failed evidence append) never surface here; they are reported
/// as fields on results and as `ok=false` evidence records. Only
/// conditions that make the whole invocation meaningless fail fast.
#[derive(Error, Debug)]
pub enum LotError {
    /// Invalid configuration: non-finite threshold, negative fee,
    /// empty or inverted search bracket.
    #[error("invalid config: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LotResult<T> = Result<T, LotError>;
