use thiserror::Error;

#[derive(Error, Debug)]
pub enum RspError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid coordinate at index {index}: ({x}, {y}) is not finite")]
    InvalidCoordinate { index: usize, x: f64, y: f64 },

    #[error("Invalid p-value at index {index}: {value} is outside [0, 1]")]
    InvalidPValue { index: usize, value: f64 },

    #[error("Embedding not found: {0}")]
    EmbeddingNotFound(String),

    #[error("Label column not found: {0}")]
    LabelNotFound(String),

    #[error("Statistical computation failed: {0}")]
    StatsError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data access error: {0}")]
    DataError(String),
}

impl RspError {
    pub fn empty(what: impl Into<String>) -> Self {
        Self::EmptyInput(what.into())
    }

    pub fn dimension(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

pub type Result<T> = std::result::Result<T, RspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pvalue_message_names_index_and_value() {
        let error = RspError::InvalidPValue {
            index: 3,
            value: 1.5,
        };
        let message = error.to_string();
        assert!(message.contains("index 3"));
        assert!(message.contains("1.5"));
    }

    #[test]
    fn test_dimension_helper() {
        let error = RspError::dimension("vantage point", 2, 3);
        assert!(matches!(
            error,
            RspError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
        assert!(error.to_string().contains("vantage point"));
    }
}
