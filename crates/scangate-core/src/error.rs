//! Error types for ScanGate

/// Result type alias using ScanGate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while producing a completion
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model backend failed or returned an unusable reply
    #[error("generation error: {0}")]
    Generation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new generation error
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generation(_) => "generation",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::generation("backend down").kind(), "generation");

        let err: Error = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "serialization");
        assert!(err.to_string().starts_with("serialization error"));
    }
}
