//! Batch application of property updates with per-path failure
//! aggregation.
//!
//! Every update in a batch is attempted; a failing path never blocks
//! the rest, and writes that succeeded stay applied. The aggregated
//! [`BatchUpdateError`] attributes each failure to its path.

use std::fmt;

use propex_model::Accessible;
use thiserror::Error;

use crate::accessor::Accessor;
use crate::error::PropertyAccessError;

// -----------------------------------------------------------------------------
// PropertyUpdate

/// One pending write in a batch.
pub struct PropertyUpdate {
    path: String,
    value: Box<dyn Accessible>,
    optional: bool,
}

impl PropertyUpdate {
    /// A mandatory update.
    pub fn new(path: impl Into<String>, value: impl Accessible) -> Self {
        Self::boxed(path, Box::new(value))
    }

    /// A mandatory update from an already boxed value.
    pub fn boxed(path: impl Into<String>, value: Box<dyn Accessible>) -> Self {
        Self {
            path: path.into(),
            value,
            optional: false,
        }
    }

    /// Marks the update as optional: an unknown property is skipped
    /// instead of failing the batch.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Returns the target path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Debug for PropertyUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyUpdate")
            .field("path", &self.path)
            .field("value", &self.value.rendered().to_string())
            .field("optional", &self.optional)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Outcomes

/// How one update in a batch ended.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The write went through.
    Applied,
    /// The property was unknown and the update was optional (or the
    /// batch ignores unknowns).
    Skipped,
    /// The write failed; earlier and later updates are unaffected.
    Failed(PropertyAccessError),
}

/// Per-path outcomes of one batch, in submission order.
#[derive(Debug, Default)]
pub struct BatchReport {
    outcomes: Vec<(String, UpdateOutcome)>,
}

impl BatchReport {
    /// Returns every `(path, outcome)` pair, in submission order.
    pub fn outcomes(&self) -> &[(String, UpdateOutcome)] {
        &self.outcomes
    }

    /// Returns the number of applied updates.
    pub fn applied(&self) -> usize {
        self.count(|outcome| matches!(outcome, UpdateOutcome::Applied))
    }

    /// Returns the number of skipped updates.
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, UpdateOutcome::Skipped))
    }

    /// Returns the number of failed updates.
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, UpdateOutcome::Failed(_)))
    }

    /// Iterates the failures, each attributed to its path.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &PropertyAccessError)> {
        self.outcomes.iter().filter_map(|(path, outcome)| match outcome {
            UpdateOutcome::Failed(error) => Some((path.as_str(), error)),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&UpdateOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, outcome)| pred(outcome)).count()
    }
}

/// A batch with at least one failed update.
///
/// The full [`BatchReport`] rides along, so callers can still see what
/// was applied and attribute every failure.
#[derive(Debug, Error)]
#[error("{failed} of {total} property updates failed")]
pub struct BatchUpdateError {
    pub report: BatchReport,
    failed: usize,
    total: usize,
}

// -----------------------------------------------------------------------------
// Application

impl Accessor {
    /// Applies every update in order, aggregating failures.
    ///
    /// With `ignore_unknown`, updates whose property does not exist are
    /// skipped batch-wide; otherwise only updates marked
    /// [`optional`](PropertyUpdate::optional) get that treatment. Any
    /// other failure is recorded and the batch continues; successful
    /// writes are never rolled back.
    pub fn apply_updates(
        &self,
        root: &mut dyn Accessible,
        updates: Vec<PropertyUpdate>,
        ignore_unknown: bool,
    ) -> Result<BatchReport, BatchUpdateError> {
        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            let PropertyUpdate { path, value, optional } = update;
            let outcome = match self.set(root, &path, value) {
                Ok(()) => UpdateOutcome::Applied,
                Err(error) => {
                    let unknown = matches!(
                        error,
                        PropertyAccessError::NotWritable { .. }
                            | PropertyAccessError::NotReadable { .. }
                    );
                    if unknown && (optional || ignore_unknown) {
                        log::debug!("skipping update for unknown property `{path}`");
                        UpdateOutcome::Skipped
                    } else {
                        log::debug!("update for `{path}` failed: {error}");
                        UpdateOutcome::Failed(error)
                    }
                }
            };
            outcomes.push((path, outcome));
        }

        let report = BatchReport { outcomes };
        let failed = report.failed();
        if failed > 0 {
            let total = report.outcomes.len();
            Err(BatchUpdateError { report, failed, total })
        } else {
            Ok(report)
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Sensor {
        label: String,
        interval: i32,
    }

    propex_model::define_properties! {
        Sensor default {
            label: String => get set,
            interval: i32 => get set,
        }
    }

    #[test]
    fn clean_batch_reports_applied_counts() {
        let accessor = Accessor::new();
        let mut sensor = Sensor::default();

        let report = accessor
            .apply_updates(
                &mut sensor,
                vec![
                    PropertyUpdate::new("label", "roof".to_string()),
                    PropertyUpdate::new("interval", "30".to_string()),
                ],
                false,
            )
            .unwrap();

        assert_eq!(report.applied(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(sensor.label, "roof");
        assert_eq!(sensor.interval, 30);
    }

    #[test]
    fn failures_are_attributed_and_do_not_block() {
        let accessor = Accessor::new();
        let mut sensor = Sensor::default();

        let err = accessor
            .apply_updates(
                &mut sensor,
                vec![
                    PropertyUpdate::new("label", "roof".to_string()),
                    PropertyUpdate::new("interval", "soon".to_string()),
                    PropertyUpdate::new("nonexistent", 1_i32),
                ],
                false,
            )
            .unwrap_err();

        assert_eq!(err.report.failed(), 2);
        assert_eq!(err.report.applied(), 1);
        let paths: Vec<&str> = err.report.failures().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["interval", "nonexistent"]);

        // The successful write stays applied.
        assert_eq!(sensor.label, "roof");
    }

    #[test]
    fn optional_and_ignored_unknowns_are_skipped() {
        let accessor = Accessor::new();
        let mut sensor = Sensor::default();

        let report = accessor
            .apply_updates(
                &mut sensor,
                vec![
                    PropertyUpdate::new("label", "attic".to_string()),
                    PropertyUpdate::new("nonexistent", 1_i32).optional(),
                ],
                false,
            )
            .unwrap();
        assert_eq!(report.applied(), 1);
        assert_eq!(report.skipped(), 1);

        let report = accessor
            .apply_updates(
                &mut sensor,
                vec![PropertyUpdate::new("also_missing", 2_i32)],
                true,
            )
            .unwrap();
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn type_failures_are_never_skipped() {
        let accessor = Accessor::new();
        let mut sensor = Sensor::default();

        let err = accessor
            .apply_updates(
                &mut sensor,
                vec![PropertyUpdate::new("interval", "soon".to_string()).optional()],
                true,
            )
            .unwrap_err();
        assert_eq!(err.report.failed(), 1);
    }
}
