use std::fmt;
use thiserror::Error;

/// Unified error type for all meanfold operations.
///
/// Errors propagate upward with the `?` operator. Variants that wrap another failure
/// keep it as their `source`, so callers can walk the full cause chain with
/// [`std::error::Error::source`].
///
/// `Error` implements `Send` and `Sync`, so failures raised on a worker thread that
/// owns one aggregate context can be handed back to the coordinating thread.
#[derive(Error, Debug)]
pub enum Error {
    /// Arrow library error during columnar data operations.
    ///
    /// Raised when building result arrays or record batches, typically because of
    /// a schema mismatch or an invalid decimal precision/scale combination.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid API parameter.
    ///
    /// This error indicates a problem with arguments passed to meanfold APIs:
    /// - Wrong number of aggregate arguments for the evaluation mode
    /// - Column references outside the bounds of the row being evaluated
    /// - Literals whose value does not match their declared type
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// An input expression failed to evaluate against a row.
    ///
    /// `context` names what was being evaluated (for example `"AVG value"`), and
    /// `source` is the failure raised deeper in the expression tree. The update
    /// that hit this error did not mutate its aggregate context.
    #[error("failed to evaluate {context}")]
    Evaluation {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// The distinct filter failed while checking a value.
    ///
    /// The value was neither accumulated nor recorded as seen.
    #[error("distinct check failed")]
    DistinctCheck {
        #[source]
        source: Box<Error>,
    },

    /// A bounded resource (such as a distinct set) reached its limit.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Decimal overflow, invalid numeric conversion, or rounding anomaly.
    ///
    /// During accumulation this error is always propagated. During result
    /// production it is only returned under a strict arithmetic policy; otherwise
    /// it is logged and the best available value is produced instead.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Expression type casting error.
    ///
    /// This error occurs when a value cannot be read as a number:
    /// - Unsupported Arrow column types
    /// - Text that does not parse as a number
    /// - Integer overflow inside nested arithmetic
    #[error("expression cast error: {0}")]
    ExprCast(String),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// Seeing this error means an invariant was violated, for example a decimal sum
    /// and a floating sum being mixed inside one aggregate context. It points at a
    /// type-resolution bug rather than bad input.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create an expression cast error from any displayable error.
    ///
    /// # Examples
    ///
    /// ```
    /// use meanfold_result::Error;
    ///
    /// fn parse_number(input: &str) -> Result<f64, Error> {
    ///     input.parse::<f64>().map_err(Error::expr_cast)
    /// }
    ///
    /// assert_eq!(parse_number("4.5").unwrap(), 4.5);
    /// assert!(matches!(parse_number("abc"), Err(Error::ExprCast(_))));
    /// ```
    #[inline]
    pub fn expr_cast<E: fmt::Display>(err: E) -> Self {
        Error::ExprCast(err.to_string())
    }

    /// Create an arithmetic error from any displayable error.
    #[inline]
    pub fn arithmetic<E: fmt::Display>(err: E) -> Self {
        Error::Arithmetic(err.to_string())
    }

    /// Wrap `source` as an evaluation failure of `context`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::error::Error as _;
    /// use meanfold_result::Error;
    ///
    /// let err = Error::evaluation("AVG value", Error::ExprCast("bad text".into()));
    /// assert_eq!(err.to_string(), "failed to evaluate AVG value");
    /// assert!(err.source().unwrap().to_string().contains("bad text"));
    /// ```
    #[inline]
    pub fn evaluation(context: impl Into<String>, source: Error) -> Self {
        Error::Evaluation {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wrap `source` as a distinct check failure.
    #[inline]
    pub fn distinct_check(source: Error) -> Self {
        Error::DistinctCheck {
            source: Box::new(source),
        }
    }

    /// Return the innermost error of the cause chain.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Evaluation { source, .. } | Error::DistinctCheck { source } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_walks_nested_wrappers() {
        let err = Error::distinct_check(Error::evaluation(
            "AVG value",
            Error::ResourceExhausted("distinct set full".into()),
        ));
        assert!(matches!(err.root_cause(), Error::ResourceExhausted(_)));
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
