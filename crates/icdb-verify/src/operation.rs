//! Aggregate post-processing over verified records.

use icdb_common_core::{AggregateFunction, AggregateOperation, Row};

/// Running state of an [`AggregateOperation`]; mergeable across chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationState {
    operation: AggregateOperation,
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl OperationState {
    pub fn new(operation: AggregateOperation) -> Self {
        Self {
            operation,
            count: 0,
            sum: 0.0,
            min: None,
            max: None,
        }
    }

    pub fn operation(&self) -> &AggregateOperation {
        &self.operation
    }

    /// Feed one record. `count` over `*` counts rows; every other function
    /// skips nulls and non-numeric values.
    pub fn apply(&mut self, row: &Row) {
        if self.operation.function == AggregateFunction::Count && self.operation.column == "*" {
            self.count += 1;
            return;
        }

        let Some(column) = row.get_by_name(&self.operation.column) else {
            return;
        };
        if column.value.is_null() {
            return;
        }
        if self.operation.function == AggregateFunction::Count {
            self.count += 1;
            return;
        }
        if let Some(value) = column.value.as_f64() {
            self.absorb(value);
        }
    }

    fn absorb(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Fold in the state of another chunk.
    pub fn merge(&mut self, other: OperationState) {
        self.count += other.count;
        self.sum += other.sum;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Final value; `None` when no value contributed (except `count`, which
    /// is zero).
    pub fn result(&self) -> Option<f64> {
        match self.operation.function {
            AggregateFunction::Count => Some(self.count as f64),
            AggregateFunction::Sum => (self.count > 0).then_some(self.sum),
            AggregateFunction::Avg => (self.count > 0).then(|| self.sum / self.count as f64),
            AggregateFunction::Min => self.min,
            AggregateFunction::Max => self.max,
        }
    }
}
