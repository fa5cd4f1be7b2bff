//! Result helpers for shared error handling.

use crate::errors::ErrorEnvelope;

/// Shared result type used across the workspace.
pub type Result<T, E = ErrorEnvelope> = std::result::Result<T, E>;

/// Context helpers for envelope results.
pub trait ResultExt<T> {
    /// Tag the error with the stage that produced it.
    fn with_stage(self, stage: &str) -> Result<T>;

    /// Attach one metadata entry to the error.
    fn with_error_metadata(self, key: &str, value: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_stage(self, stage: &str) -> Result<T> {
        self.map_err(|error| error.with_stage(stage))
    }

    fn with_error_metadata(self, key: &str, value: impl Into<String>) -> Result<T> {
        self.map_err(|error| error.with_metadata(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn ok_values_pass_through() {
        let value: Result<i32> = Ok(3);
        assert!(matches!(value.with_stage("fetch"), Ok(3)));
    }

    #[test]
    fn error_metadata_is_attached() -> Result<(), ErrorEnvelope> {
        let value: Result<i32> = Err(ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad"));
        let mapped = value
            .with_error_metadata("pr", "42")
            .with_stage("fetch_changed_files");

        let Err(error) = mapped else {
            return Err(ErrorEnvelope::expected(ErrorCode::internal(), "expected an error"));
        };
        assert_eq!(error.metadata.get("pr").map(String::as_str), Some("42"));
        assert_eq!(error.stage(), Some("fetch_changed_files"));
        Ok(())
    }
}
