use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("No data found for stock code: {0}")]
    UnknownStock(String),

    #[error("Data file not found: {0}")]
    NotFound(String),
}

impl From<DataError> for AnalysisError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::UnknownStock(code) => AnalysisError::NotFound(code),
            DataError::NotFound(path) => AnalysisError::NotFound(path),
            other => AnalysisError::InvalidData(other.to_string()),
        }
    }
}
