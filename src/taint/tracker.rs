//! Per-test-case taint state and the ranked proposals derived from it.

use super::{FormatTag, TaintAllocator, TaintId, TaintObservation, TaintValue, Usage};
use crate::log;
use crate::rng::Rng;
use crate::test_case::SiteId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// How strongly a proposal is supported by the evidence.
///
/// An exact literal outranks a format constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strength {
    /// A value synthesized to match a revealed format.
    Format,
    /// A literal the target compared the input against.
    Exact,
}

/// The evidence a proposal was derived from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProposalBasis {
    /// The target compared the taint value with this literal.
    Literal,
    /// The target parsed the taint value as this format.
    Format(FormatTag),
}

/// A proposal to replace the input at `site` with `value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InputUpdateProposal {
    /// The input site to update.
    pub site: SiteId,
    /// The replacement value.
    pub value: String,
    /// Why this value is proposed.
    pub basis: ProposalBasis,
}

impl InputUpdateProposal {
    /// How strongly this proposal is supported.
    pub fn strength(&self) -> Strength {
        match self.basis {
            ProposalBasis::Literal => Strength::Exact,
            ProposalBasis::Format(_) => Strength::Format,
        }
    }

    /// Ranking within one site: stronger first, then by value so the order
    /// does not depend on which execution reported first.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .strength()
            .cmp(&self.strength())
            .then_with(|| self.value.cmp(&other.value))
    }
}

/// Where a site is in the taint lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiteStatus {
    /// The site currently carries a taint value.
    Tainted,
    /// A proposal was applied; the site is no longer tainted.
    Resolved,
    /// The site was never observed influencing the target and is no longer
    /// worth tainting.
    Abandoned,
}

#[derive(Clone, Debug)]
struct SiteState {
    status: SiteStatus,
    current: Option<TaintValue>,
    unused_streak: u32,
    proposals: Vec<InputUpdateProposal>,
}

impl SiteState {
    fn insert(&mut self, proposal: InputUpdateProposal) -> bool {
        let duplicate = self.proposals.iter().any(|p| match (&p.basis, &proposal.basis) {
            // One synthesized value per format is enough.
            (ProposalBasis::Format(a), ProposalBasis::Format(b)) => a == b,
            (ProposalBasis::Literal, ProposalBasis::Literal) => p.value == proposal.value,
            _ => false,
        });
        if duplicate {
            return false;
        }
        let at = self
            .proposals
            .binary_search_by(|p| p.rank_cmp(&proposal))
            .unwrap_or_else(|at| at);
        self.proposals.insert(at, proposal);
        true
    }
}

#[derive(Default)]
struct Activity {
    used: bool,
    unused: bool,
}

/// What one call to [`TaintTracker::absorb`] did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Absorbed {
    /// Proposals that were not known before.
    pub proposals: Vec<InputUpdateProposal>,
    /// Observations that referred to no taint value of this test case and
    /// were discarded.
    pub unknown_references: usize,
    /// Sites that stopped being tainted.
    pub abandoned: Vec<SiteId>,
}

/// Tracks the taint values of one test case.
///
/// A tracker belongs to a single test case and is only touched by the worker
/// evaluating it, so it needs no synchronization. Call
/// [`absorb`][TaintTracker::absorb] exactly once per execution: the unused
/// threshold counts consecutive executions, not observations.
#[derive(Clone, Debug)]
pub struct TaintTracker {
    unused_threshold: u32,
    rng: Rng,
    sites: BTreeMap<SiteId, SiteState>,
    owners: HashMap<TaintId, SiteId>,
}

impl TaintTracker {
    /// Create a tracker that abandons a site after `unused_threshold`
    /// consecutive executions in which its taint went unused.
    pub fn new(unused_threshold: u32, rng: Rng) -> Self {
        TaintTracker {
            unused_threshold: unused_threshold.max(1),
            rng,
            sites: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    /// Taint `site` with a fresh value from `allocator`.
    ///
    /// Returns `None` when the site is resolved or abandoned. Values handed
    /// out earlier for the same site stay attributed to it, so late reports
    /// about them are still understood.
    pub fn taint(&mut self, site: &SiteId, allocator: &TaintAllocator) -> Option<TaintValue> {
        let state = self.sites.entry(site.clone()).or_insert_with(|| SiteState {
            status: SiteStatus::Tainted,
            current: None,
            unused_streak: 0,
            proposals: Vec::new(),
        });
        if state.status != SiteStatus::Tainted {
            log::debug!("not tainting {site}: {:?}", state.status);
            return None;
        }
        let value = allocator.create(site);
        self.owners.insert(value.id(), site.clone());
        state.current = Some(value.clone());
        Some(value)
    }

    /// Interpret the taint observations of one execution.
    pub fn absorb(&mut self, observations: &[TaintObservation]) -> Absorbed {
        let mut absorbed = Absorbed::default();
        let mut activity: BTreeMap<SiteId, Activity> = BTreeMap::new();

        for observation in observations {
            let Some(site) = observation
                .taint_id()
                .and_then(|id| self.owners.get(&id))
                .cloned()
            else {
                log::debug!("discarding observation of unknown taint {:?}", observation.taint);
                absorbed.unknown_references += 1;
                continue;
            };
            let Some(state) = self.sites.get_mut(&site) else {
                absorbed.unknown_references += 1;
                continue;
            };
            if state.status != SiteStatus::Tainted {
                log::trace!("ignoring observation for settled site {site}");
                continue;
            }
            if observation.usage == Usage::Unrecognized {
                log::debug!("skipping observation with unrecognized usage for {site}");
                continue;
            }

            let seen = activity.entry(site.clone()).or_default();
            let proposal = match &observation.usage {
                Usage::Unused => {
                    seen.unused = true;
                    None
                }
                Usage::Unrecognized => None,
                Usage::EqualityCompared { literal } => {
                    seen.used = true;
                    literal
                        .as_ref()
                        .filter(|l| TaintId::find_all(l).is_empty())
                        .map(|l| InputUpdateProposal {
                            site: site.clone(),
                            value: l.clone(),
                            basis: ProposalBasis::Literal,
                        })
                }
                Usage::ParsedAs { format } => {
                    seen.used = true;
                    let already = state
                        .proposals
                        .iter()
                        .any(|p| p.basis == ProposalBasis::Format(format.clone()));
                    if already {
                        None
                    } else {
                        match format.synthesize(&mut self.rng) {
                            Some(value) => Some(InputUpdateProposal {
                                site: site.clone(),
                                value,
                                basis: ProposalBasis::Format(format.clone()),
                            }),
                            None => {
                                log::debug!("cannot synthesize a value for format {format}");
                                None
                            }
                        }
                    }
                }
            };

            if let Some(proposal) = proposal {
                if state.insert(proposal.clone()) {
                    log::debug!("new proposal for {site}: {:?}", proposal.value);
                    absorbed.proposals.push(proposal);
                }
            }
        }

        for (site, seen) in activity {
            let Some(state) = self.sites.get_mut(&site) else {
                continue;
            };
            if seen.used {
                state.unused_streak = 0;
            } else if seen.unused {
                state.unused_streak += 1;
                if state.unused_streak >= self.unused_threshold && state.proposals.is_empty() {
                    log::debug!(
                        "abandoning taint at {site} after {} unused executions",
                        state.unused_streak
                    );
                    state.status = SiteStatus::Abandoned;
                    state.current = None;
                    absorbed.abandoned.push(site);
                }
            }
        }

        absorbed
    }

    /// Every pending proposal, grouped by site in site order, best first
    /// within each site. Resolved and abandoned sites have none.
    pub fn proposals(&self) -> Vec<InputUpdateProposal> {
        self.sites
            .values()
            .filter(|state| state.status == SiteStatus::Tainted)
            .flat_map(|state| state.proposals.iter().cloned())
            .collect()
    }

    /// The best pending proposal for `site`.
    pub fn best_proposal(&self, site: &SiteId) -> Option<&InputUpdateProposal> {
        self.sites
            .get(site)
            .filter(|state| state.status == SiteStatus::Tainted)
            .and_then(|state| state.proposals.first())
    }

    /// Mark `site` resolved: it will not be tainted again.
    pub fn resolve(&mut self, site: &SiteId) {
        if let Some(state) = self.sites.get_mut(site) {
            state.status = SiteStatus::Resolved;
            state.current = None;
        }
    }

    /// The lifecycle status of `site`, if it was ever tainted.
    pub fn status(&self, site: &SiteId) -> Option<SiteStatus> {
        self.sites.get(site).map(|state| state.status)
    }

    /// The taint value currently injected at `site`.
    pub fn current(&self, site: &SiteId) -> Option<&TaintValue> {
        self.sites.get(site).and_then(|state| state.current.as_ref())
    }

    /// How many consecutive executions left `site`'s taint unused.
    pub fn unused_streak(&self, site: &SiteId) -> u32 {
        self.sites.get(site).map_or(0, |state| state.unused_streak)
    }

    /// Sites that are currently tainted.
    pub fn tainted_sites(&self) -> BTreeSet<&SiteId> {
        self.sites
            .iter()
            .filter(|(_, state)| state.status == SiteStatus::Tainted)
            .map(|(site, _)| site)
            .collect()
    }
}
