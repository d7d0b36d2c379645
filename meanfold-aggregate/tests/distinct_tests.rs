use std::sync::Arc;

use arrow::array::{Decimal128Array, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use meanfold_aggregate::{AggMode, AggregateContext, AvgAggregate, HashDistinctChecker};
use meanfold_expr::InputExpr;
use meanfold_result::Error;
use meanfold_types::{FieldType, StatementContext};

fn int_batch(values: &[Option<i64>]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)]));
    RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values.to_vec()))]).unwrap()
}

fn avg(distinct: bool) -> AvgAggregate {
    AvgAggregate::try_new(
        AggMode::Complete,
        vec![InputExpr::column(0, FieldType::bigint())],
        distinct,
    )
    .unwrap()
}

fn run(agg: &AvgAggregate, values: &[Option<i64>]) -> String {
    let mut ctx = agg.create_context();
    agg.update_batch(&mut ctx, &int_batch(values)).unwrap();
    agg.result(&StatementContext::new(), &ctx).unwrap().to_string()
}

#[test]
fn duplicates_are_counted_once() {
    let distinct = avg(true);
    assert!(distinct.is_distinct());
    assert_eq!(
        run(&distinct, &[Some(3), Some(3), Some(5)]),
        run(&avg(false), &[Some(3), Some(5)])
    );
    assert_eq!(run(&distinct, &[Some(3), Some(3), Some(5)]), "4.0000");
    assert_eq!(run(&avg(false), &[Some(3), Some(3), Some(5)]), "3.6667");
    assert_eq!(run(&distinct, &[None, Some(2), None, Some(2)]), "2.0000");
}

#[test]
fn equal_decimals_with_different_scales_are_duplicates() {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "d",
        DataType::Decimal128(10, 2),
        true,
    )]));
    let values = Decimal128Array::from(vec![150, 150, 250])
        .with_precision_and_scale(10, 2)
        .unwrap();
    let batch = RecordBatch::try_new(schema, vec![Arc::new(values)]).unwrap();
    let agg = AvgAggregate::try_new(
        AggMode::Complete,
        vec![InputExpr::column(0, FieldType::decimal(10, Some(2)))],
        true,
    )
    .unwrap();
    let mut ctx = agg.create_context();
    agg.update_batch(&mut ctx, &batch).unwrap();
    assert_eq!(ctx.count(), 2);
    assert_eq!(
        agg.result(&StatementContext::new(), &ctx).unwrap().to_string(),
        "2.000000"
    );
}

#[test]
fn reset_forgets_seen_values() {
    let agg = avg(true);
    let mut ctx = agg.create_context();
    agg.update_batch(&mut ctx, &int_batch(&[Some(8)])).unwrap();
    agg.reset_context(&mut ctx);
    assert!(ctx.is_empty());
    agg.update_batch(&mut ctx, &int_batch(&[Some(8), Some(8)])).unwrap();
    assert_eq!(ctx.count(), 1);
}

#[test]
fn checker_failures_surface_as_distinct_errors() {
    let agg = avg(true);
    let mut ctx = agg.create_context_with(Box::new(HashDistinctChecker::with_max_entries(1)));
    let err = agg
        .update_batch(&mut ctx, &int_batch(&[Some(1), Some(1), Some(2)]))
        .unwrap_err();
    assert!(matches!(err, Error::DistinctCheck { .. }));
    assert!(matches!(err.root_cause(), Error::ResourceExhausted(_)));
    assert_eq!(ctx.count(), 1);
}

#[test]
fn distinct_needs_an_aggregate_created_context() {
    let agg = avg(true);
    let mut ctx = AggregateContext::new();
    let err = agg.update_batch(&mut ctx, &int_batch(&[Some(1)])).unwrap_err();
    assert!(matches!(err, Error::InvalidArgumentError(_)));
    assert!(ctx.is_empty());
}

#[test]
fn final_mode_ignores_distinct() {
    let agg = AvgAggregate::try_new(
        AggMode::Final,
        vec![
            InputExpr::partial_count(0),
            InputExpr::partial_sum(1, FieldType::decimal(65, Some(4))),
        ],
        true,
    )
    .unwrap();
    assert!(!agg.is_distinct());
    assert!(!agg.create_context().has_distinct());
    assert!(
        !agg.create_context_with(Box::new(HashDistinctChecker::new()))
            .has_distinct()
    );
}
