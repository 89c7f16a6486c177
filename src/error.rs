use thiserror::Error;

pub type SheetdocResult<T> = Result<T, SheetdocError>;

#[derive(Error, Debug)]
pub enum SheetdocError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Output write error: {0}")]
    OutputWrite(String),
}

impl SheetdocError {
    /// Row-level template failure, prefixed with the offending row index.
    pub fn template_at_row(row: usize, message: impl AsRef<str>) -> Self {
        SheetdocError::Template(format!("row {}: {}", row, message.as_ref()))
    }

    /// Process exit code for this error kind. 0 is reserved for full
    /// success and 1 for a run completed with skipped row failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            SheetdocError::Config(_) => 2,
            SheetdocError::SourceRead(_) => 3,
            SheetdocError::Template(_) => 4,
            SheetdocError::OutputWrite(_) => 5,
        }
    }
}
