use thiserror::Error;

use crate::types::Conflict;

#[derive(Error, Debug)]
pub enum RuleboardError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown filter field '{0}'")]
    UnknownFilter(String),

    #[error("unknown sort field '{0}'")]
    UnknownSort(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    // Read errors: recoverable, previously fetched data stays visible
    #[error("list fetch failed: {0}")]
    TransientFetch(String),

    // Write errors
    #[error("write rejected: {0}")]
    MutationRejected(String),

    #[error("write blocked by {} conflicting rule(s)", .conflicts.len())]
    MutationConflict { conflicts: Vec<Conflict> },

    #[error("conflict resolution incomplete: {0}")]
    ResolutionPartialFailure(String),

    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RuleboardError>;
