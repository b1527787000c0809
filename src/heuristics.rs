//! Heuristic entries reported by instrumented data-access calls, and their
//! normalization onto the common improvement scale.
//!
//! Each entry measures one target (for example one SQL command) in one
//! execution. The two objectives point in opposite directions, so raw values
//! are never compared with each other; [`normalize`] turns them into
//! [`Contribution`]s first.

use crate::log;
use crate::target::{Confidence, Contribution, TargetKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;

/// Where a heuristic came from.
///
/// The set of kinds is open: any kind this crate does not know is kept
/// verbatim in [`HeuristicKind::Other`] and treated as an independent target,
/// never rejected.
///
/// ```
/// use taintfit::HeuristicKind;
///
/// assert_eq!(HeuristicKind::from("SQL"), HeuristicKind::Relational);
/// assert_eq!(HeuristicKind::from("REDIS"), HeuristicKind::Other("REDIS".into()));
/// assert_eq!(HeuristicKind::from("REDIS").as_str(), "REDIS");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HeuristicKind {
    /// Relational database queries. Wire name `SQL`.
    Relational,
    /// Document store commands. Wire name `MONGO`.
    DocumentStore,
    /// Any other kind, by its wire name.
    Other(String),
}

impl HeuristicKind {
    /// The wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            HeuristicKind::Relational => "SQL",
            HeuristicKind::DocumentStore => "MONGO",
            HeuristicKind::Other(name) => name,
        }
    }
}

impl From<&str> for HeuristicKind {
    fn from(s: &str) -> Self {
        match s {
            "SQL" => HeuristicKind::Relational,
            "MONGO" => HeuristicKind::DocumentStore,
            other => HeuristicKind::Other(other.to_string()),
        }
    }
}

impl From<String> for HeuristicKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "SQL" => HeuristicKind::Relational,
            "MONGO" => HeuristicKind::DocumentStore,
            _ => HeuristicKind::Other(s),
        }
    }
}

impl From<HeuristicKind> for String {
    fn from(kind: HeuristicKind) -> Self {
        match kind {
            HeuristicKind::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which direction of a heuristic's value is an improvement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Objective {
    /// Lower is better, with a floor at zero. The value is a distance.
    MinimizeToZero,
    /// Higher is better, unbounded.
    Maximize,
    /// An objective this crate does not understand. Such entries cannot be
    /// normalized and are dropped as malformed.
    Unrecognized,
}

impl Objective {
    /// The wire name of this objective.
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::MinimizeToZero => "MINIMIZE_TO_ZERO",
            Objective::Maximize => "MAXIMIZE",
            Objective::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl Serialize for Objective {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Objective {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(match name.as_str() {
            "MINIMIZE_TO_ZERO" => Objective::MinimizeToZero,
            "MAXIMIZE" => Objective::Maximize,
            _ => Objective::Unrecognized,
        })
    }
}

/// One measured signal from one execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicEntry {
    /// Where the heuristic came from.
    #[serde(rename = "type")]
    pub kind: HeuristicKind,

    /// Which direction is an improvement.
    pub objective: Objective,

    /// What was measured. Comparable across executions only together with
    /// `kind`.
    pub id: String,

    /// The measured score, if it could be measured at all.
    #[serde(default)]
    pub value: Option<f64>,

    /// How many rows or documents were considered when computing `value`.
    /// Zero means the measurement is present but uninformative.
    #[serde(rename = "numberOfEvaluatedRecords", default)]
    pub evaluated_records: u32,
}

impl HeuristicEntry {
    /// Create a new heuristic entry.
    pub fn new(
        kind: HeuristicKind,
        objective: Objective,
        id: impl Into<String>,
        value: Option<f64>,
        evaluated_records: u32,
    ) -> Self {
        HeuristicEntry {
            kind,
            objective,
            id: id.into(),
            value,
            evaluated_records,
        }
    }

    /// The target this entry measures.
    pub fn target(&self) -> TargetKey {
        TargetKey::heuristic(self.kind.clone(), self.id.clone())
    }

    /// Normalize this single entry.
    pub fn contribution(&self) -> Result<Contribution, MalformedReason> {
        let confidence = if self.evaluated_records == 0 {
            Confidence::Low
        } else {
            Confidence::Normal
        };
        let value = self.value.ok_or(MalformedReason::MissingValue)?;
        if value.is_nan() {
            return Err(MalformedReason::NotANumber);
        }
        let score = match self.objective {
            Objective::Maximize => value,
            Objective::MinimizeToZero => {
                if value.is_infinite() {
                    return Err(MalformedReason::Infinite);
                }
                if value < 0.0 {
                    return Err(MalformedReason::Negative);
                }
                // `-0.0` and `0.0` must be the same best score.
                if value == 0.0 {
                    0.0
                } else {
                    -value
                }
            }
            Objective::Unrecognized => return Err(MalformedReason::UnrecognizedObjective),
        };
        Ok(Contribution::heuristic(score, confidence))
    }
}

/// Why an entry could not be normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// The entry had no value. Absent is not the same as zero.
    MissingValue,
    /// The value was NaN.
    NotANumber,
    /// A negative distance under `MINIMIZE_TO_ZERO`.
    Negative,
    /// An infinite distance under `MINIMIZE_TO_ZERO`.
    Infinite,
    /// The objective was not recognized.
    UnrecognizedObjective,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MalformedReason::MissingValue => "no value",
            MalformedReason::NotANumber => "value is NaN",
            MalformedReason::Negative => "negative distance",
            MalformedReason::Infinite => "infinite distance",
            MalformedReason::UnrecognizedObjective => "unrecognized objective",
        })
    }
}

/// An entry that was dropped during normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct MalformedEntry {
    /// The target the entry claimed to measure.
    pub target: TargetKey,
    /// Why it was dropped.
    pub reason: MalformedReason,
}

/// The result of normalizing one execution's heuristic entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    /// The best contribution per target.
    pub contributions: BTreeMap<TargetKey, Contribution>,
    /// Entries that were dropped.
    pub malformed: Vec<MalformedEntry>,
}

/// Normalize the heuristic entries of one execution.
///
/// This is a pure function of `entries`. When the same target appears more
/// than once, the best single observation is kept rather than summing
/// repeated executions of the same query.
///
/// # Example
///
/// ```
/// use taintfit::{normalize, HeuristicEntry, HeuristicKind, Objective, TargetKey};
///
/// let query = "SELECT * FROM users WHERE id=?";
/// let entries = [
///     HeuristicEntry::new(HeuristicKind::Relational, Objective::MinimizeToZero, query, Some(3.0), 10),
///     HeuristicEntry::new(HeuristicKind::Relational, Objective::MinimizeToZero, query, Some(1.5), 10),
/// ];
///
/// let normalized = normalize(&entries);
/// let key = TargetKey::heuristic(HeuristicKind::Relational, query);
/// assert_eq!(normalized.contributions[&key].score(), -1.5);
/// ```
pub fn normalize(entries: &[HeuristicEntry]) -> Normalized {
    let mut normalized = Normalized::default();

    for entry in entries {
        let contribution = match entry.contribution() {
            Ok(c) => c,
            Err(reason) => {
                if reason == MalformedReason::MissingValue {
                    log::debug!("dropping unmeasured heuristic {}:{}", entry.kind, entry.id);
                } else {
                    log::warn!(
                        "dropping malformed heuristic {}:{} ({reason})",
                        entry.kind,
                        entry.id
                    );
                }
                normalized.malformed.push(MalformedEntry {
                    target: entry.target(),
                    reason,
                });
                continue;
            }
        };

        match normalized.contributions.entry(entry.target()) {
            Entry::Vacant(slot) => {
                slot.insert(contribution);
            }
            Entry::Occupied(mut slot) => {
                if within_execution_better(&contribution, slot.get()) {
                    slot.insert(contribution);
                }
            }
        }
    }

    log::trace!(
        "normalized {} heuristic entries into {} targets",
        entries.len(),
        normalized.contributions.len()
    );
    normalized
}

// Within one execution the value decides; confidence only breaks ties.
fn within_execution_better(candidate: &Contribution, current: &Contribution) -> bool {
    match candidate.score().total_cmp(&current.score()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Equal => candidate.confidence() > current.confidence(),
        std::cmp::Ordering::Less => false,
    }
}
