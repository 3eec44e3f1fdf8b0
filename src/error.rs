use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("capture session is already active")]
    AlreadyActive,

    #[error("output file numbers exhausted")]
    CounterExhausted,

    #[error("encoder `{name}` not found in any of {} search path entries", checked.len())]
    EncoderNotFound { name: String, checked: Vec<PathBuf> },

    #[error("failed to spawn encoder: {0}")]
    Spawn(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid search path entry: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}
