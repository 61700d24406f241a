use std::path::PathBuf;

/// Reading the log or the price catalog failed. Read-only callers carry on
/// with an empty log or catalog; appending to a log that exists but cannot be
/// read must stop, or the rewrite would drop the stored entries.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no data file at {0}")]
    NotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
}

/// Writing the log back failed; the new entry is not saved.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
