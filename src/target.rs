//! Targets and the common improvement scale.
//!
//! Every signal the engine tracks, structural or heuristic, is reduced to a
//! [`Contribution`] keyed by a [`TargetKey`]. Contributions are totally
//! ordered, and that single order drives every improvement decision.

use crate::heuristics::HeuristicKind;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Something the search tries to improve against.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "target")]
pub enum TargetKey {
    /// A structural coverage target, identified opaquely by the execution
    /// collaborator (a line, a branch, a status code for an endpoint...).
    Structural {
        /// The collaborator's identifier.
        id: String,
    },

    /// A data-access heuristic target. The `id` is only meaningful together
    /// with its `kind`.
    Heuristic {
        /// Where the heuristic came from.
        kind: HeuristicKind,
        /// What was measured, e.g. a normalized SQL command.
        id: String,
    },
}

impl TargetKey {
    /// A structural coverage target.
    pub fn structural(id: impl Into<String>) -> Self {
        TargetKey::Structural { id: id.into() }
    }

    /// A heuristic target.
    pub fn heuristic(kind: HeuristicKind, id: impl Into<String>) -> Self {
        TargetKey::Heuristic {
            kind,
            id: id.into(),
        }
    }

    /// Is this a structural coverage target?
    pub fn is_structural(&self) -> bool {
        matches!(self, TargetKey::Structural { .. })
    }

    /// The identifier, without its kind.
    pub fn id(&self) -> &str {
        match self {
            TargetKey::Structural { id } | TargetKey::Heuristic { id, .. } => id,
        }
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKey::Structural { id } => write!(f, "structural:{id}"),
            TargetKey::Heuristic { kind, id } => write!(f, "{kind}:{id}"),
        }
    }
}

/// How much a contribution can be trusted.
///
/// `Low` marks measurements that were present but uninformative, such as a
/// query heuristic computed over zero records or the coverage of a timed-out
/// execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    /// Present but uninformative.
    Low,
    /// An ordinary measurement.
    Normal,
}

/// One target's normalized score from one execution. Higher is better.
///
/// # Ordering
///
/// Contributions compare first on whether a structural target was reached,
/// then on confidence, then on score. So reaching a target always wins, and a
/// low-confidence contribution never displaces a normal-confidence one no
/// matter its score.
///
/// The archive never moves backwards on this order, which is not the same as
/// never moving backwards on [`score`][Contribution::score]: a
/// normal-confidence contribution replaces a low-confidence one even when its
/// score is lower.
///
/// ```
/// use taintfit::{Confidence, Contribution};
///
/// let lucky = Contribution::heuristic(0.0, Confidence::Low);
/// let earned = Contribution::heuristic(-5.0, Confidence::Normal);
/// assert!(earned.is_better_than(&lucky));
/// assert!(!lucky.is_better_than(&earned));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    score: f64,
    confidence: Confidence,
    reached: bool,
}

impl Contribution {
    /// A heuristic contribution. Heuristic targets have no binary reached
    /// dimension.
    pub fn heuristic(score: f64, confidence: Confidence) -> Self {
        Contribution {
            score,
            confidence,
            reached: false,
        }
    }

    /// A structural coverage contribution.
    pub fn structural(score: f64, confidence: Confidence, reached: bool) -> Self {
        Contribution {
            score,
            confidence,
            reached,
        }
    }

    /// The score on the common higher-is-better scale.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The confidence of the measurement.
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Whether this is a low-confidence contribution.
    pub fn is_low_confidence(&self) -> bool {
        self.confidence == Confidence::Low
    }

    /// Whether a structural target was reached.
    pub fn reached(&self) -> bool {
        self.reached
    }

    /// Compare two contributions on the improvement order.
    pub fn rank_cmp(&self, other: &Contribution) -> Ordering {
        self.reached
            .cmp(&other.reached)
            .then(self.confidence.cmp(&other.confidence))
            .then(self.score.total_cmp(&other.score))
    }

    /// Strictly better on the improvement order. Equal contributions are not
    /// improvements, so the incumbent is kept on ties.
    pub fn is_better_than(&self, other: &Contribution) -> bool {
        self.rank_cmp(other) == Ordering::Greater
    }
}
