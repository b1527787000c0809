#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod _guide;
pub mod archive;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod fitness;
pub mod heuristics;
mod log;
mod rng;
pub mod taint;
pub mod target;
pub mod test_case;

use std::sync::atomic::{AtomicU64, Ordering};

pub use archive::{Archive, ArchiveSnapshot, ImprovementReport, TargetSummary};
pub use config::Config;
pub use error::{Error, ErrorKind, ErrorMessage, Result, ResultExt};
pub use evaluator::{
    from_fn, Evaluator, ExecutionFeedback, ExecutionOutcome, ExecutionRequest, Executor, FromFn,
};
pub use fitness::{Coverage, Dominance, FitnessRecord, FitnessRecordBuilder};
pub use heuristics::{
    normalize, HeuristicEntry, HeuristicKind, MalformedEntry, MalformedReason, Normalized,
    Objective,
};
pub use rng::Rng;
pub use taint::{
    Absorbed, FormatTag, InputUpdateProposal, ProposalBasis, SiteStatus, Strength, TaintAllocator,
    TaintId, TaintObservation, TaintTracker, TaintValue, Usage,
};
pub use target::{Confidence, Contribution, TargetKey};
pub use test_case::{InputValue, SiteId, TestCase, TestCaseId};

/// A search run's fitness engine: one evaluator, one archive and one taint
/// allocator, shared by every worker.
///
/// All methods take `&self`, and a `Session` is `Sync` whenever its executor
/// is, so workers evaluate test cases concurrently through a shared
/// reference. Test cases themselves are owned by the worker evaluating them.
///
/// # Example
///
/// ```
/// # fn foo() -> taintfit::Result<()> {
/// use taintfit::{
///     from_fn, Coverage, ExecutionFeedback, ExecutionOutcome, Session, SiteId, TargetKey,
/// };
///
/// // A stand-in target that only answers 200 when the id is numeric.
/// let executor = from_fn(|request| {
///     let id = request.input(&SiteId::new("GET /items/{id}")).unwrap_or("");
///     let status = if id.parse::<u32>().is_ok() { "GET /items:200" } else { "GET /items:400" };
///     ExecutionOutcome::Completed(ExecutionFeedback {
///         coverage: Coverage::new().with(status, 1.0),
///         ..ExecutionFeedback::default()
///     })
/// });
///
/// let session = Session::new(executor).seed(0x1984);
///
/// let mut test_case = session.test_case().with_input("GET /items/{id}", "42");
/// let report = session.evaluate_and_archive(&mut test_case)?;
///
/// assert!(report.is_improvement());
/// assert!(session.archive().contribution(&TargetKey::structural("GET /items:200")).is_some());
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
#[derive(Debug)]
pub struct Session<E> {
    config: Config,
    evaluator: Evaluator<E>,
    archive: Archive,
    allocator: TaintAllocator,
    next_test_case: AtomicU64,
}

impl<E> Session<E>
where
    E: Executor,
{
    /// Create a new session with the default configuration.
    pub fn new(executor: E) -> Self {
        let config = Config::default();
        let allocator = TaintAllocator::new(&mut Rng::new(config.seed));
        Session {
            evaluator: Evaluator::new(executor, &config),
            config,
            archive: Archive::new(),
            allocator,
            next_test_case: AtomicU64::new(0),
        }
    }

    /// Create a new session, checking `config` first.
    pub fn with_config(executor: E, config: Config) -> Result<Self> {
        Session::new(executor).config(config)
    }

    /// Replace this session's configuration.
    ///
    /// Fails with [`ErrorKind::InvalidConfig`] if `config` does not
    /// [validate][Config::validate].
    pub fn config(self, config: Config) -> Result<Self> {
        config.validate()?;
        log::info!(
            "configured session: seed {:#x}, unused taint threshold {}, unreachable threshold {}",
            config.seed,
            config.unused_taint_threshold,
            config.unreachable_threshold
        );
        let executor = self.evaluator.into_executor();
        Ok(Session {
            evaluator: Evaluator::new(executor, &config),
            allocator: TaintAllocator::new(&mut Rng::new(config.seed)),
            config,
            ..self
        })
    }

    /// Set the seed for every random choice made by this session.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self.allocator = TaintAllocator::new(&mut Rng::new(seed));
        self
    }

    /// Create an empty test case with a fresh id.
    pub fn test_case(&self) -> TestCase {
        let id = self.next_test_case.fetch_add(1, Ordering::Relaxed);
        TestCase::new(TestCaseId::new(id), &self.config)
    }

    /// Replace the input at `site` of `test_case` with a fresh taint value.
    ///
    /// Returns `None` when the site's taint was resolved or abandoned.
    pub fn taint(&self, test_case: &mut TestCase, site: &SiteId) -> Option<TaintValue> {
        test_case.taint_input(site, &self.allocator).cloned()
    }

    /// Execute `test_case` once and build its fitness record.
    ///
    /// See [`Evaluator::evaluate`] for the errors this returns.
    pub fn evaluate(&self, test_case: &TestCase) -> Result<FitnessRecord> {
        self.evaluator.evaluate(test_case)
    }

    /// Offer `record` to the archive.
    pub fn consider_for_inclusion(&self, record: FitnessRecord) -> ImprovementReport {
        self.archive.consider_for_inclusion(record)
    }

    /// Feed the taint observations from `record` to `test_case`'s tracker.
    pub fn absorb(&self, test_case: &mut TestCase, record: &FitnessRecord) -> Absorbed {
        test_case.absorb(record)
    }

    /// Ranked proposals for updating `test_case`'s inputs.
    pub fn propose_input_updates(&self, test_case: &TestCase) -> Vec<InputUpdateProposal> {
        test_case.propose_input_updates()
    }

    /// Evaluate `test_case`, absorb its taint feedback, and offer its record to
    /// the archive.
    ///
    /// A timeout is not an error here: its partial record is archived like
    /// any other.
    pub fn evaluate_and_archive(&self, test_case: &mut TestCase) -> Result<ImprovementReport> {
        let record = self.evaluate(test_case).recover_timeout()?;
        self.absorb(test_case, &record);
        Ok(self.consider_for_inclusion(record))
    }

    /// Copy out the archive's current state.
    pub fn snapshot(&self) -> ArchiveSnapshot {
        self.archive.snapshot()
    }

    /// The configuration.
    pub fn configuration(&self) -> &Config {
        &self.config
    }

    /// The evaluator.
    pub fn evaluator(&self) -> &Evaluator<E> {
        &self.evaluator
    }

    /// The archive.
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// The taint allocator.
    pub fn allocator(&self) -> &TaintAllocator {
        &self.allocator
    }
}
