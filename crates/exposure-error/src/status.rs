//! Retry classification for errors.

use std::fmt;

use crate::ErrorKind;

/// Whether an error is worth retrying.
///
/// Nothing in exposure retries. The status is for a caller that wraps snapshot
/// acquisition (a scheduler, a web handler) and has to decide what to do with
/// a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorStatus {
    /// Needs an external change first (bad file, bad JSON, unknown name).
    #[default]
    Permanent,

    /// May succeed on the next attempt (provider throttled, network hiccup).
    Temporary,
}

impl ErrorStatus {
    /// Status a fresh error of `kind` starts with.
    pub fn for_kind(kind: ErrorKind) -> Self {
        if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        }
    }

    pub fn is_retryable(&self) -> bool {
        *self == ErrorStatus::Temporary
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_kind() {
        assert_eq!(
            ErrorStatus::for_kind(ErrorKind::SnapshotUnavailable),
            ErrorStatus::Temporary
        );
        assert_eq!(
            ErrorStatus::for_kind(ErrorKind::DeserializationFailed),
            ErrorStatus::Permanent
        );
        assert_eq!(
            ErrorStatus::for_kind(ErrorKind::ConfigInvalid),
            ErrorStatus::Permanent
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorStatus::Temporary.to_string(), "temporary");
        assert!(!ErrorStatus::default().is_retryable());
    }
}
