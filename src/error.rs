use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelerError {
    /// A reading is missing a required field or carries a value the core cannot use.
    #[error("Input shape error at row {row}: {reason}")]
    InputShape { row: usize, reason: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("DB error: {0}")]
    Db(#[from] sqlx::Error),
}

impl LabelerError {
    pub fn shape(row: usize, reason: impl Into<String>) -> Self {
        LabelerError::InputShape {
            row,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LabelerError>;
