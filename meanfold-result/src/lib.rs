//! Error types and result definitions for the meanfold aggregation crates.
//!
//! Every crate in the workspace returns [`Result<T>`] and reports failures through the
//! single [`Error`] enum, so errors propagate across crate boundaries with `?`.
//!
//! # Error Categories
//!
//! - **Evaluation failures** ([`Error::Evaluation`]): an input expression could not be
//!   evaluated against a row. Wraps the underlying cause.
//! - **Distinct check failures** ([`Error::DistinctCheck`]): the duplicate filter failed.
//! - **Arithmetic diagnostics** ([`Error::Arithmetic`]): decimal overflow, invalid
//!   conversion, or a rounding anomaly.
//! - **Cast errors** ([`Error::ExprCast`]): a value could not be read as the expected type.
//! - **Data format errors** ([`Error::Arrow`]): Arrow array or batch construction issues.
//! - **User input errors** ([`Error::InvalidArgumentError`]): bad construction parameters.
//! - **Internal errors** ([`Error::Internal`]): violated invariants.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;

/// Tracing target for arithmetic diagnostics raised while producing results.
pub const DIAGNOSTICS_TARGET: &str = "meanfold::diagnostics";
