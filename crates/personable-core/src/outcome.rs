//! Uniform outcome type returned by every repository and service operation.
//!
//! `Outcome` separates storage and business results from their transport
//! representation. The transport layer matches on it exhaustively; there is
//! no catch-all arm because the set of variants is closed.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Problem payload carried by [`Outcome::BadRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub message: String,
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a record operation.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation succeeded and produced a value.
    Successful(T),
    /// The referenced record does not exist.
    NotFound,
    /// The request was malformed or violates a business rule.
    BadRequest(Problem),
    /// Storage or internal fault. The cause is for logs, not for callers.
    Failed(Error),
}

impl<T> Outcome<T> {
    pub fn not_found() -> Self {
        Outcome::NotFound
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Outcome::BadRequest(Problem::new(message))
    }

    pub fn failed(err: impl Into<Error>) -> Self {
        Outcome::Failed(err.into())
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, Outcome::Successful(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound)
    }

    /// Consume the outcome, keeping only a successful value.
    pub fn successful(self) -> Option<T> {
        match self {
            Outcome::Successful(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the successful value, passing other variants through.
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Successful(value) => Outcome::Successful(f(value)),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::BadRequest(problem) => Outcome::BadRequest(problem),
            Outcome::Failed(err) => Outcome::Failed(err),
        }
    }

    /// Chain a synchronous step that itself yields an outcome.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        match self {
            Outcome::Successful(value) => f(value),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::BadRequest(problem) => Outcome::BadRequest(problem),
            Outcome::Failed(err) => Outcome::Failed(err),
        }
    }

    /// Re-type a non-successful outcome.
    ///
    /// Returns `Err(value)` when the outcome was successful so the caller
    /// can keep going; otherwise returns the same failure for type `U`.
    pub fn into_failure<U>(self) -> std::result::Result<Outcome<U>, T> {
        match self {
            Outcome::Successful(value) => Err(value),
            Outcome::NotFound => Ok(Outcome::NotFound),
            Outcome::BadRequest(problem) => Ok(Outcome::BadRequest(problem)),
            Outcome::Failed(err) => Ok(Outcome::Failed(err)),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Successful(_) => "successful",
            Outcome::NotFound => "not_found",
            Outcome::BadRequest(_) => "bad_request",
            Outcome::Failed(_) => "failed",
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Successful(value),
            Err(Error::NotFound(_)) => Outcome::NotFound,
            Err(Error::InvalidInput(msg)) => Outcome::BadRequest(Problem::new(msg)),
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Unwrap a successful outcome or return the failure from the enclosing
/// function, re-typed to the function's outcome type.
#[macro_export]
macro_rules! try_outcome {
    ($outcome:expr) => {
        match $outcome.into_failure() {
            Ok(failure) => return failure,
            Err(value) => value,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ok_is_successful() {
        let outcome: Outcome<i32> = Ok(7).into();
        assert_eq!(outcome.successful(), Some(7));
    }

    #[test]
    fn test_from_not_found_error() {
        let outcome: Outcome<i32> = Err(Error::NotFound("x".into())).into();
        assert!(outcome.is_not_found());
    }

    #[test]
    fn test_from_invalid_input_is_bad_request() {
        let outcome: Outcome<i32> = Err(Error::InvalidInput("name required".into())).into();
        match outcome {
            Outcome::BadRequest(problem) => assert_eq!(problem.message, "name required"),
            other => panic!("expected BadRequest, got {}", other.kind()),
        }
    }

    #[test]
    fn test_other_errors_are_failed_with_cause() {
        let outcome: Outcome<i32> = Err(Error::Unacknowledged("delete".into())).into();
        match outcome {
            Outcome::Failed(err) => assert!(!err.to_string().is_empty()),
            other => panic!("expected Failed, got {}", other.kind()),
        }
    }

    #[test]
    fn test_map_passes_failures_through() {
        let outcome: Outcome<i32> = Outcome::NotFound;
        assert!(outcome.map(|v| v * 2).is_not_found());

        let outcome = Outcome::Successful(2).map(|v| v * 2);
        assert_eq!(outcome.successful(), Some(4));
    }

    #[test]
    fn test_and_then_short_circuits() {
        let outcome: Outcome<i32> = Outcome::bad_request("nope");
        let chained: Outcome<String> = outcome.and_then(|v| Outcome::Successful(v.to_string()));
        assert_eq!(chained.kind(), "bad_request");
    }

    fn double_or_propagate(input: Outcome<i32>) -> Outcome<i64> {
        let value = try_outcome!(input);
        Outcome::Successful(i64::from(value) * 2)
    }

    #[test]
    fn test_try_outcome_macro() {
        assert_eq!(
            double_or_propagate(Outcome::Successful(21)).successful(),
            Some(42)
        );
        assert!(double_or_propagate(Outcome::NotFound).is_not_found());
    }
}
