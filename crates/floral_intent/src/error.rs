use floral_taxonomy::TaxonomyCategory;
use std::time::Duration;
use thiserror::Error;

/// A caller hint that could not be applied. Never fatal: the hint is
/// dropped and reported back as a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HintError {
    #[error("unknown hint category '{0}'")]
    UnknownCategory(String),

    #[error("unknown {category} '{id}'")]
    UnknownEntry {
        category: TaxonomyCategory,
        id: String,
    },
}

/// Why the external synthesis call produced nothing usable.
/// Always recovered through the direct-format path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisError {
    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("synthesis failed: {0}")]
    Failed(String),

    #[error("synthesis returned an empty response")]
    Empty,

    #[error("synthesis worker exited without a response")]
    Disconnected,
}
