//! The archive of best-known records, one per target.

use crate::fitness::FitnessRecord;
use crate::log;
use crate::target::{Contribution, TargetKey};
use crate::test_case::TestCaseId;
use serde::Serialize;
use std::collections::btree_map::{BTreeMap, Entry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct Slot {
    best: Arc<FitnessRecord>,
    contribution: Contribution,
    improved_at: u64,
}

#[derive(Debug, Default)]
struct State {
    slots: BTreeMap<TargetKey, Slot>,
    evaluations: u64,
}

/// The best-known fitness record for every target discovered so far.
///
/// The archive is the engine's only long-lived shared state. Every
/// [`consider_for_inclusion`][Archive::consider_for_inclusion] call runs as
/// one critical section, and since a target only ever keeps the maximum of
/// its contributions under a total order, the final contents do not depend
/// on the order concurrent workers report in. Targets are never removed.
///
/// # Example
///
/// ```
/// use taintfit::{Archive, Coverage, FitnessRecord, TargetKey, TestCaseId};
///
/// let archive = Archive::new();
/// let record = FitnessRecord::builder(TestCaseId::new(1))
///     .coverage(Coverage::new().with("GET /users:200", 1.0))
///     .build();
///
/// let report = archive.consider_for_inclusion(record);
/// assert!(report.is_improvement());
/// assert_eq!(report.newly_reached, vec![TargetKey::structural("GET /users:200")]);
/// ```
#[derive(Debug, Default)]
pub struct Archive {
    state: Mutex<State>,
}

/// What one call to [`Archive::consider_for_inclusion`] changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementReport {
    /// The test case whose record was considered.
    pub test_case: Option<TestCaseId>,
    /// The archive's evaluation counter after this call.
    pub evaluation: u64,
    /// Every target whose best record is now the considered one.
    pub improved: Vec<TargetKey>,
    /// The subset of `improved` that was not tracked before.
    pub new_targets: Vec<TargetKey>,
    /// The subset of `improved` that went from unreached to reached.
    pub newly_reached: Vec<TargetKey>,
}

impl ImprovementReport {
    /// Did the record improve any target?
    pub fn is_improvement(&self) -> bool {
        !self.improved.is_empty()
    }
}

/// One target's entry in an [`ArchiveSnapshot`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSummary {
    /// The target.
    pub target: TargetKey,
    /// Its best contribution.
    pub contribution: Contribution,
    /// The test case that produced it.
    pub test_case: TestCaseId,
    /// The evaluation at which it was last improved.
    pub improved_at: u64,
    /// Evaluations considered since then.
    pub executions_since_improvement: u64,
}

/// A point-in-time copy of the archive, for reporting and deciding when to
/// stop.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSnapshot {
    /// How many records have been considered.
    pub evaluations: u64,
    /// Every tracked target, in target order.
    pub targets: Vec<TargetSummary>,
}

impl ArchiveSnapshot {
    /// The summary for one target.
    pub fn get(&self, target: &TargetKey) -> Option<&TargetSummary> {
        self.targets
            .binary_search_by(|summary| summary.target.cmp(target))
            .ok()
            .map(|at| &self.targets[at])
    }

    /// How many structural targets have been reached.
    pub fn reached(&self) -> usize {
        self.targets
            .iter()
            .filter(|summary| summary.contribution.reached())
            .count()
    }
}

impl Archive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic elsewhere cannot leave a half-written slot behind: slots are
        // replaced whole.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compare every target of `record` against the best known record for
    /// that target, and keep `record` wherever it is strictly better.
    pub fn consider_for_inclusion(&self, record: FitnessRecord) -> ImprovementReport {
        let record = Arc::new(record);
        let mut state = self.lock();
        state.evaluations += 1;
        let evaluation = state.evaluations;

        let mut report = ImprovementReport {
            test_case: Some(record.test_case()),
            evaluation,
            ..ImprovementReport::default()
        };

        for (target, contribution) in record.targets() {
            match state.slots.entry(target.clone()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(Slot {
                        best: Arc::clone(&record),
                        contribution: *contribution,
                        improved_at: evaluation,
                    });
                    report.improved.push(target.clone());
                    report.new_targets.push(target.clone());
                    if contribution.reached() {
                        report.newly_reached.push(target.clone());
                    }
                }
                Entry::Occupied(mut occupied) => {
                    let slot = occupied.get_mut();
                    if !contribution.is_better_than(&slot.contribution) {
                        continue;
                    }
                    if contribution.reached() && !slot.contribution.reached() {
                        report.newly_reached.push(target.clone());
                    }
                    *slot = Slot {
                        best: Arc::clone(&record),
                        contribution: *contribution,
                        improved_at: evaluation,
                    };
                    report.improved.push(target.clone());
                }
            }
        }

        if report.is_improvement() {
            log::debug!(
                "test case {} improved {} targets ({} new, {} newly reached)",
                record.test_case(),
                report.improved.len(),
                report.new_targets.len(),
                report.newly_reached.len()
            );
        }
        report
    }

    /// The best record for `target`.
    pub fn best(&self, target: &TargetKey) -> Option<Arc<FitnessRecord>> {
        self.lock()
            .slots
            .get(target)
            .map(|slot| Arc::clone(&slot.best))
    }

    /// The best contribution for `target`.
    pub fn contribution(&self, target: &TargetKey) -> Option<Contribution> {
        self.lock().slots.get(target).map(|slot| slot.contribution)
    }

    /// Structural targets that have been seen but not yet reached.
    pub fn uncovered_targets(&self) -> Vec<TargetKey> {
        self.lock()
            .slots
            .iter()
            .filter(|(target, slot)| target.is_structural() && !slot.contribution.reached())
            .map(|(target, _)| target.clone())
            .collect()
    }

    /// How many targets are tracked.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Whether no target is tracked yet.
    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// How many records have been considered.
    pub fn evaluations(&self) -> u64 {
        self.lock().evaluations
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> ArchiveSnapshot {
        let state = self.lock();
        let targets = state
            .slots
            .iter()
            .map(|(target, slot)| TargetSummary {
                target: target.clone(),
                contribution: slot.contribution,
                test_case: slot.best.test_case(),
                improved_at: slot.improved_at,
                executions_since_improvement: state.evaluations - slot.improved_at,
            })
            .collect();
        ArchiveSnapshot {
            evaluations: state.evaluations,
            targets,
        }
    }
}
