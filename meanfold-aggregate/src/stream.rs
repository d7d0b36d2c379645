use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use meanfold_result::Error;
use meanfold_types::StatementContext;

use crate::{AggMode, AggregateContext, AvgAggregate};

/// Drives one `AVG` over a stream of batches that all belong to a single group.
///
/// The input is drained on the first call to `next`, which yields one batch: the
/// partial `(count, sum)` row in partial mode, the averaged row otherwise.
pub struct AvgStream<I> {
    aggregate: AvgAggregate,
    statement: StatementContext,
    context: AggregateContext,
    input: I,
    done: bool,
}

impl<I> AvgStream<I>
where
    I: Iterator<Item = Result<RecordBatch, Error>>,
{
    pub fn new(input: I, aggregate: AvgAggregate, statement: StatementContext) -> Self {
        let context = aggregate.create_context();
        Self {
            aggregate,
            statement,
            context,
            input,
            done: false,
        }
    }

    pub fn schema(&self) -> SchemaRef {
        match self.aggregate.mode() {
            AggMode::Partial => self.aggregate.partial_schema(),
            AggMode::Complete | AggMode::Final => self.aggregate.result_schema(),
        }
    }

    fn drain(&mut self) -> Result<RecordBatch, Error> {
        for batch in self.input.by_ref() {
            let batch = batch?;
            self.aggregate.update_batch(&mut self.context, &batch)?;
        }
        tracing::debug!(
            alias = self.aggregate.alias(),
            rows = self.context.count(),
            "AVG stream exhausted"
        );
        match self.aggregate.mode() {
            AggMode::Partial => self.aggregate.partial_batch([&self.context]),
            AggMode::Complete | AggMode::Final => self
                .aggregate
                .result_batch(&self.statement, [&self.context]),
        }
    }
}

impl<I> Iterator for AvgStream<I>
where
    I: Iterator<Item = Result<RecordBatch, Error>>,
{
    type Item = Result<RecordBatch, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(self.drain())
    }
}
