//! Test cases, as far as the fitness engine is concerned: a set of named input
//! sites, each holding a literal or a taint value.

use crate::config::Config;
use crate::fitness::FitnessRecord;
use crate::log;
use crate::rng::Rng;
use crate::taint::{Absorbed, InputUpdateProposal, TaintAllocator, TaintTracker, TaintValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a test case within one search run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestCaseId(u64);

impl TestCaseId {
    /// Wrap a raw id.
    pub fn new(id: u64) -> Self {
        TestCaseId(id)
    }

    /// The raw id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Names one input of a test case, e.g. `POST /users#body` or
/// `GET /items?page`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    /// Create a site id.
    pub fn new(id: impl Into<String>) -> Self {
        SiteId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SiteId {
    fn from(s: &str) -> Self {
        SiteId(s.to_string())
    }
}

impl From<String> for SiteId {
    fn from(s: String) -> Self {
        SiteId(s)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The value at one input site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputValue {
    /// An ordinary value.
    Literal(String),
    /// A taint marker.
    Tainted(TaintValue),
}

impl InputValue {
    /// The text sent to the target.
    pub fn as_str(&self) -> &str {
        match self {
            InputValue::Literal(s) => s,
            InputValue::Tainted(t) => t.as_str(),
        }
    }
}

/// A test case: its inputs and the taint state of those inputs.
///
/// # Example
///
/// ```
/// use taintfit::{Config, SiteId, TaintAllocator, TestCase, TestCaseId};
///
/// let config = Config::new();
/// let allocator = TaintAllocator::with_run_tag(1);
/// let body = SiteId::new("POST /orders#body");
///
/// let mut test_case = TestCase::new(TestCaseId::new(0), &config)
///     .with_input(body.clone(), "{}");
/// let marker = test_case.taint_input(&body, &allocator).unwrap().to_string();
///
/// assert_eq!(test_case.input(&body), Some(marker.as_str()));
/// ```
#[derive(Clone, Debug)]
pub struct TestCase {
    id: TestCaseId,
    inputs: BTreeMap<SiteId, InputValue>,
    // Literals displaced by a taint, restored if the taint is abandoned.
    displaced: BTreeMap<SiteId, String>,
    tracker: TaintTracker,
}

impl TestCase {
    /// Create an empty test case.
    ///
    /// Its tracker's random stream is derived from the configured seed and
    /// the id, so a test case behaves the same in every run with that seed.
    pub fn new(id: TestCaseId, config: &Config) -> Self {
        let seed = config
            .seed
            .wrapping_add(id.get().wrapping_mul(0x9e37_79b9_7f4a_7c15));
        TestCase {
            id,
            inputs: BTreeMap::new(),
            displaced: BTreeMap::new(),
            tracker: TaintTracker::new(config.unused_taint_threshold, Rng::new(seed)),
        }
    }

    /// This test case's id.
    pub fn id(&self) -> TestCaseId {
        self.id
    }

    /// Set the literal value at `site`.
    pub fn set_input(&mut self, site: impl Into<SiteId>, value: impl Into<String>) {
        self.inputs
            .insert(site.into(), InputValue::Literal(value.into()));
    }

    /// Builder-style [`set_input`][TestCase::set_input].
    pub fn with_input(mut self, site: impl Into<SiteId>, value: impl Into<String>) -> Self {
        self.set_input(site, value);
        self
    }

    /// Replace the value at `site` with a fresh taint value.
    ///
    /// Returns `None`, leaving the input alone, when the site's taint was
    /// resolved or abandoned.
    pub fn taint_input(&mut self, site: &SiteId, allocator: &TaintAllocator) -> Option<&TaintValue> {
        let value = self.tracker.taint(site, allocator)?;
        if let Some(InputValue::Literal(old)) = self
            .inputs
            .insert(site.clone(), InputValue::Tainted(value))
        {
            self.displaced.insert(site.clone(), old);
        }
        match self.inputs.get(site) {
            Some(InputValue::Tainted(value)) => Some(value),
            _ => None,
        }
    }

    /// The value at `site`, as sent to the target.
    pub fn input(&self, site: &SiteId) -> Option<&str> {
        self.inputs.get(site).map(InputValue::as_str)
    }

    /// Every input, with taint markers and literals substituted, in site
    /// order.
    pub fn rendered_inputs(&self) -> impl Iterator<Item = (&SiteId, &str)> {
        self.inputs.iter().map(|(site, value)| (site, value.as_str()))
    }

    /// Feed the taint observations of one evaluation to the tracker.
    ///
    /// An abandoned site gets back the literal its taint displaced, or is
    /// removed if it had none.
    pub fn absorb(&mut self, record: &FitnessRecord) -> Absorbed {
        if record.test_case() != self.id {
            log::warn!(
                "absorbing feedback for {} into test case {}",
                record.test_case(),
                self.id
            );
        }
        let absorbed = self.tracker.absorb(record.observations());
        for site in &absorbed.abandoned {
            match self.displaced.remove(site) {
                Some(literal) => {
                    self.inputs.insert(site.clone(), InputValue::Literal(literal));
                }
                None => {
                    self.inputs.remove(site);
                }
            }
        }
        absorbed
    }

    /// Ranked proposals derived from every evaluation absorbed so far.
    pub fn propose_input_updates(&self) -> Vec<InputUpdateProposal> {
        self.tracker.proposals()
    }

    /// Apply a proposal: write its value and mark the site resolved.
    ///
    /// Returns `false` if the proposal is for a site this test case does not
    /// have.
    pub fn apply(&mut self, proposal: &InputUpdateProposal) -> bool {
        let Some(slot) = self.inputs.get_mut(&proposal.site) else {
            return false;
        };
        *slot = InputValue::Literal(proposal.value.clone());
        self.displaced.remove(&proposal.site);
        self.tracker.resolve(&proposal.site);
        true
    }

    /// The taint tracker of this test case.
    pub fn tracker(&self) -> &TaintTracker {
        &self.tracker
    }
}
