use crate::category::TaxonomyCategory;
use std::path::PathBuf;
use thiserror::Error;

/// Load-time failures. Any of these prevents the process from serving.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse taxonomy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("taxonomy category '{0}' has no entries")]
    EmptyTaxonomy(TaxonomyCategory),

    #[error("duplicate {category} id '{id}'")]
    DuplicateId {
        category: TaxonomyCategory,
        id: String,
    },

    #[error("{entry} references unknown entry '{reference}'")]
    DanglingReference { entry: String, reference: String },

    #[error("invalid attribute on {entry}: {message}")]
    InvalidAttribute { entry: String, message: String },
}

pub type Result<T> = std::result::Result<T, TaxonomyError>;
