use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum ReportError {
    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}
