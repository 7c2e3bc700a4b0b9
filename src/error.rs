use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("invalid analysis id: {0}")]
    InvalidAnalysisId(String),

    #[error("invalid project name: {0}")]
    InvalidProjectName(String),

    #[error("invalid metadata entry (expected key:value): {0}")]
    InvalidMetadata(String),

    #[error("missing source table: {0}")]
    MissingTable(String),

    #[error("missing column {column} in table {table}")]
    MissingColumn { table: String, column: String },

    #[error("no results file found for table {table} under {dir}")]
    ResultsNotFound { table: String, dir: String },

    #[error("failed to read results file {path}: {message}")]
    ResultsRead { path: String, message: String },

    #[error("search engine credentials missing: set {0}")]
    MissingCredentials(String),

    #[error("store request failed: {0}")]
    StoreHttp(String),

    #[error("store returned status {status}: {message}")]
    StoreStatus { status: u16, message: String },

    #[error("bulk load mismatch for {collection}: {loaded} of {submitted} records confirmed")]
    BulkMismatch {
        collection: String,
        submitted: usize,
        loaded: usize,
    },

    #[error("analyses are not loaded: {}", .0.join(", "))]
    AnalysesNotLoaded(Vec<String>),

    #[error("projects do not exist: {}", .0.join(", "))]
    ProjectsMissing(Vec<String>),

    #[error("project already exists: {0}")]
    ProjectExists(String),
}
