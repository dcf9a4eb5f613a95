//! Shared error-code interface.
//!
//! Every error enum in the harness crates implements [`ErrorCode`] so that
//! supervisors can react to failures without matching on concrete types:
//! the code is stable and machine-readable, the recoverability flag tells a
//! caller whether retrying is worthwhile.
//!
//! # Example
//!
//! ```
//! use harness_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum PumpError {
//!     Clogged,
//!     Dry,
//! }
//!
//! impl ErrorCode for PumpError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Clogged => "PUMP_CLOGGED",
//!             Self::Dry => "PUMP_DRY",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Dry)
//!     }
//! }
//!
//! assert_eq!(PumpError::Clogged.code(), "PUMP_CLOGGED");
//! assert!(PumpError::Dry.is_recoverable());
//! ```

/// Machine-readable classification of an error.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE, prefixed with the owning layer (`COMPONENT_`,
///   `STREAM_`, `CONFIG_`)
/// - Stable once published: supervisors and dashboards key on it
///
/// # Recoverability
///
/// `true` means the same operation may succeed later without any change
/// by the caller (a timeout, a full buffer). Protocol violations and
/// invariant breaks are never recoverable.
pub trait ErrorCode {
    /// Returns the stable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code is non-empty, prefixed and UPPER_SNAKE_CASE.
///
/// # Panics
///
/// Panics with a descriptive message when any check fails.
///
/// ```
/// use harness_types::{assert_error_code, ErrorCode};
///
/// struct Stalled;
///
/// impl ErrorCode for Stalled {
///     fn code(&self) -> &'static str { "LOOP_STALLED" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Stalled, "LOOP_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    if let Some(problem) = code_violation(err.code(), expected_prefix) {
        panic!("{problem}");
    }
}

/// Runs [`assert_error_code`] over every variant in `errors`.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    errors
        .iter()
        .for_each(|err| assert_error_code(err, expected_prefix));
}

/// First rule `code` breaks, if any.
fn code_violation(code: &str, prefix: &str) -> Option<String> {
    if code.is_empty() {
        return Some("error code must not be empty".to_string());
    }
    if !code.starts_with(prefix) {
        return Some(format!("error code '{code}' must start with prefix '{prefix}'"));
    }
    if !is_upper_snake_case(code) {
        return Some(format!("error code '{code}' must be UPPER_SNAKE_CASE"));
    }
    None
}

/// Non-empty `_`-separated words of `A-Z0-9`.
fn is_upper_snake_case(s: &str) -> bool {
    s.split('_').all(|word| {
        !word.is_empty()
            && word
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum SampleError {
        Flaky,
        Broken,
    }

    impl ErrorCode for SampleError {
        fn code(&self) -> &'static str {
            match self {
                Self::Flaky => "SAMPLE_FLAKY",
                Self::Broken => "SAMPLE_BROKEN",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Flaky)
        }
    }

    #[test]
    fn codes_and_recoverability() {
        assert_eq!(SampleError::Flaky.code(), "SAMPLE_FLAKY");
        assert!(SampleError::Flaky.is_recoverable());
        assert!(!SampleError::Broken.is_recoverable());
    }

    #[test]
    fn all_variants_pass_conformance() {
        assert_error_codes(&[SampleError::Flaky, SampleError::Broken], "SAMPLE_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&SampleError::Flaky, "STREAM_");
    }

    #[test]
    fn violations_are_reported_in_order() {
        assert_eq!(
            code_violation("", "X_"),
            Some("error code must not be empty".to_string())
        );
        assert!(code_violation("Y_BAD", "X_").unwrap().contains("prefix"));
        assert!(code_violation("X_bad", "X_").unwrap().contains("UPPER_SNAKE_CASE"));
        assert_eq!(code_violation("X_GOOD_1", "X_"), None);
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("TIMEOUT"));
        assert!(is_upper_snake_case("STREAM_TIMEOUT_2"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("stream_timeout"));
        assert!(!is_upper_snake_case("_STREAM"));
        assert!(!is_upper_snake_case("STREAM_"));
        assert!(!is_upper_snake_case("STREAM__TIMEOUT"));
    }
}
