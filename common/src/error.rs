use thiserror::Error;

/// Errors produced while reading benchmark result files.
///
/// Line numbers are 1-based and count every line of the input, including
/// the lines skipped before the warmup marker.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: invalid item count {value:?}")]
    InvalidItemCount { line: usize, value: String },
    #[error("line {line}: invalid time {value:?}")]
    InvalidTime { line: usize, value: String },
    #[error("line {line}, column {column}: invalid number {value:?}")]
    InvalidField {
        line: usize,
        column: usize,
        value: String,
    },
    #[error("line {line}: expected at least {expected} columns, found {found}")]
    TooFewColumns {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("table has no rows")]
    EmptyTable,
    #[error("median filter kernel size must be odd, got {0}")]
    InvalidKernel(usize),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
