//! Per-execution fitness records.

use crate::heuristics::{MalformedEntry, Normalized};
use crate::target::{Confidence, Contribution, TargetKey};
use crate::taint::TaintObservation;
use crate::test_case::TestCaseId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Structural coverage reported by the execution collaborator: an opaque
/// target identifier mapped to a proximity score, where `1.0` means reached.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coverage {
    scores: BTreeMap<String, f64>,
}

impl Coverage {
    /// Empty coverage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a proximity score for a target, keeping the higher of two
    /// readings for the same identifier. NaN readings are ignored.
    pub fn insert(&mut self, id: impl Into<String>, score: f64) {
        if score.is_nan() {
            return;
        }
        let slot = self.scores.entry(id.into()).or_insert(score);
        if score > *slot || slot.is_nan() {
            *slot = score;
        }
    }

    /// Builder-style [`insert`][Coverage::insert].
    pub fn with(mut self, id: impl Into<String>, score: f64) -> Self {
        self.insert(id, score);
        self
    }

    /// Iterate over the raw readings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(id, score)| (id.as_str(), *score))
    }

    /// The number of targets with a reading.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether there are no readings.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Coverage {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut coverage = Coverage::new();
        for (id, score) in iter {
            coverage.insert(id, score);
        }
        coverage
    }
}

/// The outcome of comparing two records over a set of targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dominance {
    /// At least as good on every target and better on one.
    Dominates,
    /// The other record dominates this one.
    DominatedBy,
    /// Neither dominates the other.
    NonDominated,
}

/// The aggregate of one execution: structural coverage and normalized
/// heuristic contributions, plus the taint observations the execution
/// reported.
///
/// Records are immutable once built. The [`Archive`][crate::Archive] shares
/// them between every target they are the best record for.
#[derive(Clone, Debug, PartialEq)]
pub struct FitnessRecord {
    test_case: TestCaseId,
    targets: BTreeMap<TargetKey, Contribution>,
    observations: Vec<TaintObservation>,
    malformed: Vec<MalformedEntry>,
    timed_out: bool,
}

impl FitnessRecord {
    /// Start building a record for the given test case.
    pub fn builder(test_case: TestCaseId) -> FitnessRecordBuilder {
        FitnessRecordBuilder {
            test_case,
            coverage: Coverage::new(),
            covered_threshold: 1.0,
            heuristics: Normalized::default(),
            observations: Vec::new(),
            timed_out: false,
        }
    }

    /// The test case this record was produced for.
    pub fn test_case(&self) -> TestCaseId {
        self.test_case
    }

    /// Every target this execution contributed to.
    pub fn targets(&self) -> impl Iterator<Item = (&TargetKey, &Contribution)> {
        self.targets.iter()
    }

    /// The contribution for one target, if any.
    pub fn contribution(&self, target: &TargetKey) -> Option<&Contribution> {
        self.targets.get(target)
    }

    /// The number of targets this execution contributed to.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether this execution contributed to no target at all.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The taint observations reported by this execution.
    pub fn observations(&self) -> &[TaintObservation] {
        &self.observations
    }

    /// Heuristic entries dropped while building this record.
    pub fn malformed(&self) -> &[MalformedEntry] {
        &self.malformed
    }

    /// Whether the execution ran out of budget.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Compare this record with `other` on the given targets.
    ///
    /// A target missing from a record ranks below any contribution to it.
    pub fn dominance<'a>(
        &self,
        other: &FitnessRecord,
        targets: impl IntoIterator<Item = &'a TargetKey>,
    ) -> Dominance {
        let mut better = false;
        let mut worse = false;
        for target in targets {
            match cmp_optional(self.contribution(target), other.contribution(target)) {
                Ordering::Greater => better = true,
                Ordering::Less => worse = true,
                Ordering::Equal => {}
            }
            if better && worse {
                return Dominance::NonDominated;
            }
        }
        match (better, worse) {
            (true, false) => Dominance::Dominates,
            (false, true) => Dominance::DominatedBy,
            _ => Dominance::NonDominated,
        }
    }
}

fn cmp_optional(a: Option<&Contribution>, b: Option<&Contribution>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.rank_cmp(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Builds a [`FitnessRecord`].
#[derive(Debug)]
pub struct FitnessRecordBuilder {
    test_case: TestCaseId,
    coverage: Coverage,
    covered_threshold: f64,
    heuristics: Normalized,
    observations: Vec<TaintObservation>,
    timed_out: bool,
}

impl FitnessRecordBuilder {
    /// Set the structural coverage reported for the execution.
    pub fn coverage(mut self, coverage: Coverage) -> Self {
        self.coverage = coverage;
        self
    }

    /// Set the proximity at which a structural target counts as reached.
    ///
    /// Defaults to `1.0`.
    pub fn covered_threshold(mut self, threshold: f64) -> Self {
        self.covered_threshold = threshold;
        self
    }

    /// Set the normalized heuristic contributions.
    pub fn heuristics(mut self, heuristics: Normalized) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Set the taint observations reported for the execution.
    pub fn observations(mut self, observations: Vec<TaintObservation>) -> Self {
        self.observations = observations;
        self
    }

    /// Mark the execution as timed out: structural coverage becomes low
    /// confidence, and heuristic entries are discarded.
    pub fn timed_out(mut self) -> Self {
        self.timed_out = true;
        self
    }

    /// Finish building the record.
    pub fn build(self) -> FitnessRecord {
        let structural_confidence = if self.timed_out {
            Confidence::Low
        } else {
            Confidence::Normal
        };

        let mut targets = BTreeMap::new();
        for (id, score) in self.coverage.iter() {
            if score.is_nan() {
                continue;
            }
            let score = score.clamp(0.0, 1.0);
            let reached = score >= self.covered_threshold;
            targets.insert(
                TargetKey::structural(id),
                Contribution::structural(score, structural_confidence, reached),
            );
        }

        let mut malformed = Vec::new();
        if !self.timed_out {
            targets.extend(self.heuristics.contributions);
            malformed = self.heuristics.malformed;
        }

        FitnessRecord {
            test_case: self.test_case,
            targets,
            observations: self.observations,
            malformed,
            timed_out: self.timed_out,
        }
    }
}
