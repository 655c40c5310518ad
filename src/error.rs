use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("unparseable time: {0}")]
    Parse(String),

    #[error("invalid availability record: {0}")]
    Validation(String),

    #[error("solver failed: {0}")]
    Matching(String),

    #[error("data integrity: {0}")]
    DataIntegrity(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
