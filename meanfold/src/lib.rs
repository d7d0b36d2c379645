//! meanfold: streaming, mergeable `AVG` over Arrow record batches.
//!
//! This crate is the entrypoint of the meanfold workspace. It re-exports the
//! aggregate, the input expressions it evaluates and the value model they share,
//! so most users only need this one dependency.
//!
//! # Quick Start
//!
//! Average an integer column in one pass:
//!
//! ```rust
//! use std::sync::Arc;
//! use arrow::array::{Int64Array, RecordBatch};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use meanfold::{AggMode, AvgAggregate, ColumnRef, InputExpr, StatementContext};
//!
//! let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)]));
//! let batch = RecordBatch::try_new(
//!     schema.clone(),
//!     vec![Arc::new(Int64Array::from(vec![1, 2, 4]))],
//! )
//! .unwrap();
//!
//! let column = ColumnRef::from_schema(&schema, "v").unwrap();
//! let avg =
//!     AvgAggregate::try_new(AggMode::Complete, vec![InputExpr::Column(column)], false).unwrap();
//! let mut ctx = avg.create_context();
//! avg.update_batch(&mut ctx, &batch).unwrap();
//!
//! let result = avg.result(&StatementContext::new(), &ctx).unwrap();
//! assert_eq!(result.to_string(), "2.3333");
//! ```
//!
//! # Architecture
//!
//! meanfold is organized as a layered workspace:
//!
//! - **Errors** (`meanfold-result`): The shared `Error` enum and `Result` alias.
//! - **Types** (`meanfold-types`): Values, exact decimals, type descriptors and numeric limits.
//! - **Expressions** (`meanfold-expr`): Input expressions evaluated against batch rows.
//! - **Aggregation** (`meanfold-aggregate`): The `AVG` accumulator, finalizer and stream.
//!
//! # Two-phase evaluation
//!
//! A [`AggMode::Partial`] aggregate exports one `(count, sum)` row per group with
//! [`AvgAggregate::partial_batch`]. Its [`AvgAggregate::final_stage`] consumes those
//! rows, from any number of workers, and produces the same result a single
//! complete pass would.

pub use meanfold_aggregate::{
    AggMode, AggregateContext, AvgAggregate, AvgStream, DIAGNOSTICS_TARGET, DistinctChecker,
    HashDistinctChecker, SumState, resolve_output_type,
};
pub use meanfold_expr::{BatchRow, BinaryOp, ColumnRef, InputExpr, Literal, NestedExpr};
pub use meanfold_result::{Error, Result};
pub use meanfold_types::{
    ArithmeticPolicy, DecimalError, DecimalValue, FieldType, NumericLimits, StatementContext,
    TypeKind, Value, ValueKind,
};
