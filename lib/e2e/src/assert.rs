use std::fmt::Debug;

use crate::error::{Outcome, Rejection};

/// A failed expectation about on-chain results.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("assertion failed: {message}")]
pub struct AssertionFailed {
    /// Description of what was expected.
    pub message: String,
}

/// Fail with `message` unless `condition` holds.
///
/// # Errors
///
/// Returns [`AssertionFailed`] carrying `message` if `condition` is false.
pub fn ensure(
    condition: bool,
    message: impl Into<String>,
) -> Result<(), AssertionFailed> {
    if condition {
        Ok(())
    } else {
        let message = message.into();
        tracing::error!(%message, "assertion failed");
        Err(AssertionFailed { message })
    }
}

/// Fail unless `actual` equals `expected`.
///
/// # Errors
///
/// Returns [`AssertionFailed`] describing `what` and both values.
pub fn ensure_eq<T: PartialEq + Debug>(
    actual: T,
    expected: T,
    what: &str,
) -> Result<(), AssertionFailed> {
    ensure(
        actual == expected,
        format!("{what}: expected {expected:?}, got {actual:?}"),
    )
}

impl<T> Outcome<T> {
    /// Expect the call to be rejected with exit code `code`.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionFailed`] if the call succeeded or was rejected
    /// differently.
    pub fn expect_exit_code(&self, code: u32) -> Result<(), AssertionFailed> {
        match self {
            Self::Rejected(Rejection::Exit(actual)) if *actual == code => Ok(()),
            Self::Rejected(rejection) => ensure(
                false,
                format!("expected exit code {code}, got {rejection}"),
            ),
            Self::Success(_) => ensure(
                false,
                format!("expected exit code {code}, but the call succeeded"),
            ),
        }
    }

    /// Expect the call to succeed and return its value.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionFailed`] if the call was rejected.
    pub fn into_success(self) -> Result<T, AssertionFailed> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Rejected(rejection) => Err(AssertionFailed {
                message: format!("expected success, got {rejection}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_carries_message() {
        assert!(ensure(true, "unused").is_ok());
        let err = ensure(false, "balance should be 2000000000").unwrap_err();
        assert_eq!(err.message, "balance should be 2000000000");
        assert_eq!(
            err.to_string(),
            "assertion failed: balance should be 2000000000"
        );
    }

    #[test]
    fn ensure_eq_describes_both_values() {
        assert!(ensure_eq(2, 2, "supply").is_ok());
        let err = ensure_eq(1, 2, "supply").unwrap_err();
        assert_eq!(err.message, "supply: expected 2, got 1");
    }

    #[test]
    fn expects_exit_codes() {
        let rejected: Outcome<()> = Outcome::Rejected(Rejection::Exit(102));
        assert!(rejected.expect_exit_code(102).is_ok());
        assert_eq!(
            rejected.expect_exit_code(103).unwrap_err().message,
            "expected exit code 103, got exit code 102"
        );

        let ok: Outcome<()> = Outcome::Success(());
        assert!(ok.expect_exit_code(102).is_err());
        assert!(ok.into_success().is_ok());

        let panicked: Outcome<()> = Outcome::Rejected(Rejection::Panic(0x11));
        assert_eq!(
            panicked.into_success().unwrap_err().message,
            "expected success, got panic 0x11"
        );
    }
}
