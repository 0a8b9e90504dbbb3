use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum HazGridError {
    #[error("line {line}: cannot parse column {column} value {value:?} as a number")]
    Parse {
        line: usize,
        column: usize,
        value: String,
    },
    #[error("line {line}: expected {expected} columns, got {got}")]
    MalformedInput {
        line: usize,
        expected: String,
        got: usize,
    },
    #[error("forecast {0} contains a header but no data rows")]
    EmptyInput(String),
    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),
    #[error("hazard engine run failed: {0}")]
    RunFailed(String),
    #[error("result database: {0}")]
    Database(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Convenience type for `Result<T, HazGridError>`.
pub type HazGridResult<T> = Result<T, HazGridError>;
