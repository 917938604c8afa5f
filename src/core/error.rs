//! Infrastructure errors.
//!
//! User-facing activation failures are not errors in this sense: they are
//! reported through [`RitualResult`](crate::ritual::RitualResult) so the
//! host can render a parameterized message. `RitualError` covers the
//! plumbing around rituals: configuration, persisted documents and range
//! requests that name something that does not exist.

use thiserror::Error;

/// Error type for configuration and persistence operations.
#[derive(Debug, Error)]
pub enum RitualError {
    /// A configuration document could not be parsed.
    #[error("invalid ritual configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// A persisted anchor document could not be decoded.
    #[error("invalid anchor snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),

    /// A persisted document references a ritual that is not registered.
    #[error("unknown ritual `{0}`")]
    UnknownRitual(String),

    /// A range operation targeted an anchor without an active ritual.
    #[error("no active ritual")]
    NoActiveRitual,

    /// A range operation named a key the active ritual does not declare.
    #[error("ritual `{ritual}` has no range `{key}`")]
    UnknownRange { ritual: String, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = RitualError::UnknownRitual("water".to_string());
        assert_eq!(err.to_string(), "unknown ritual `water`");

        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = RitualError::Config(parse);
        assert!(err.to_string().starts_with("invalid ritual configuration"));
    }
}
