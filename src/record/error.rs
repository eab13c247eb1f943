//! Normalizer error types.

/// Reasons a raw line produced no record.
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    /// The line is not valid JSON.
    #[error("Invalid log format: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The line is JSON but matches no known schema.
    #[error("Unrecognized log format")]
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_display() {
        assert_eq!(
            NormalizeError::Unrecognized.to_string(),
            "Unrecognized log format"
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not-json").unwrap_err();
        let err: NormalizeError = json_err.into();
        assert!(matches!(err, NormalizeError::InvalidJson(_)));
        assert!(err.to_string().starts_with("Invalid log format"));
    }
}
