//! Value model and numeric type system shared by the meanfold crates.
//!
//! - [`Value`]: nullable scalar (integer, exact decimal, double).
//! - [`DecimalValue`]: exact decimal backed by a scaled `i256`.
//! - [`FieldType`]: declared type of an expression or aggregate output.
//! - [`NumericLimits`]: division digits and decimal width/scale caps.
//! - [`StatementContext`]: per-call arithmetic policy.

pub mod context;
pub mod decimal;
pub mod field_type;
pub mod value;

pub use context::{
    ArithmeticPolicy, DIV_FRAC_INCR, MAX_DECIMAL_SCALE, MAX_DECIMAL_WIDTH, MAX_REAL_WIDTH,
    NumericLimits, StatementContext,
};
pub use decimal::{DecimalError, DecimalValue, MAX_DECIMAL_PRECISION};
pub use field_type::{FieldType, TypeKind};
pub use value::{Value, ValueKind};
