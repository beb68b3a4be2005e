//! Dual-state result for expected remote and process failures.
//!
//! Used instead of `Result` where a failure is an ordinary outcome the
//! owning parameter inspects and translates (warning, abort, retry by the
//! user), not an error to bubble up. Exactly one branch is ever populated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Either<T> {
    Success(T),
    Failure(String),
}

impl<T> Either<T> {
    pub fn success(value: T) -> Self {
        Either::Success(value)
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Either::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Either::Success(_))
    }

    /// The success value. Callers must branch on [`is_success`](Self::is_success)
    /// first; calling this on a failure is a logic defect, not a recoverable
    /// condition, and panics.
    pub fn get(&self) -> &T {
        match self {
            Either::Success(value) => value,
            Either::Failure(reason) => panic!("get() called on a failed Either: {reason}"),
        }
    }

    /// The failure reason. Valid only on the failure branch; panics otherwise.
    pub fn why_not(&self) -> &str {
        match self {
            Either::Success(_) => panic!("why_not() called on a successful Either"),
            Either::Failure(reason) => reason,
        }
    }
}
