//! Test fixtures for shared error codes and envelopes.

use prcheck_shared::{ErrorClass, ErrorCode, ErrorEnvelope};

/// Return a list of common error codes used in tests.
pub fn common_error_codes() -> Vec<ErrorCode> {
    vec![
        ErrorCode::cancelled(),
        ErrorCode::invalid_input(),
        ErrorCode::permission_denied(),
        ErrorCode::rate_limited(),
        ErrorCode::dependency_unavailable(),
        ErrorCode::timeout(),
        ErrorCode::internal(),
    ]
}

/// A cancellation error fixture.
pub fn cancelled_error() -> ErrorEnvelope {
    ErrorEnvelope::cancelled("cancelled")
}

/// A source outage, as the GitHub adapter reports a 5xx.
pub fn source_unavailable_error() -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::dependency_unavailable(),
        "GitHub request failed with status 502",
        ErrorClass::Retriable,
    )
    .with_metadata("status", "502")
}

/// A rejected token, as the GitHub adapter reports a 401.
pub fn permission_denied_error() -> ErrorEnvelope {
    ErrorEnvelope::expected(ErrorCode::permission_denied(), "Bad credentials")
        .with_metadata("status", "401")
}
