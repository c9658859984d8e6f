use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("no region in the reference table matches {0}; check the genome build of the inputs")]
    MissingRegion(String),

    #[error("invalid prevalence {value} for phenotype {phenotype}: must lie strictly between 0 and 1")]
    InvalidPrevalence { phenotype: String, value: f64 },

    #[error("duplicate key {key} in {origin}")]
    DuplicateKey { origin: String, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("distribution error: {0}")]
    Distribution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CollectError>;
