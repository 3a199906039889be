//! Multi-step emulations.

use std::future::Future;

use crate::{Error, Operation, Result};

/// Ordered record of the committed steps of one emulated operation.
///
/// The first failing step short-circuits the sequence and is reported as
/// [`Error::Partial`] with the number of steps that committed before it.
/// A step that is itself an emulation reporting `Partial` is flattened: its
/// committed steps are added to the count and its cause becomes the
/// source. Nothing is rolled back.
#[derive(Debug)]
pub(crate) struct Saga {
    operation: Operation,
    committed: Vec<String>,
}

impl Saga {
    pub(crate) fn new(operation: Operation) -> Self {
        Self {
            operation,
            committed: Vec::new(),
        }
    }

    /// Run one step. `label` names it in logs, e.g. `delete dir/a`.
    pub(crate) async fn step<T>(
        &mut self,
        label: impl Into<String>,
        step: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let label = label.into();
        match step.await {
            Ok(value) => {
                tracing::trace!(operation = %self.operation, step = %label, "step committed");
                self.committed.push(label);
                Ok(value)
            }
            Err(err) => {
                let (committed, source) = match err {
                    Error::Partial {
                        committed, source, ..
                    } => (self.committed.len() + committed, source),
                    other => (self.committed.len(), Box::new(other)),
                };
                tracing::debug!(
                    operation = %self.operation,
                    step = %label,
                    committed,
                    error = %source,
                    "step failed"
                );
                Err(Error::Partial {
                    operation: self.operation,
                    committed,
                    source,
                })
            }
        }
    }

    /// Labels of the steps that committed so far.
    pub(crate) fn committed(&self) -> &[String] {
        &self.committed
    }
}
