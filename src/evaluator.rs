//! Running one test case and turning its feedback into a fitness record.

use crate::config::Config;
use crate::error::{Error, ErrorMessage, Result};
use crate::fitness::{Coverage, FitnessRecord};
use crate::heuristics::{self, HeuristicEntry};
use crate::log;
use crate::taint::TaintObservation;
use crate::test_case::{SiteId, TestCase, TestCaseId};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// What the execution collaborator is asked to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionRequest<'a> {
    /// The test case being run.
    pub test_case: TestCaseId,
    /// Every input, taint markers and literals already substituted.
    pub inputs: Vec<(&'a SiteId, &'a str)>,
    /// How long the collaborator may let the execution run.
    pub budget: Duration,
}

impl<'a> ExecutionRequest<'a> {
    /// The value sent at `site`.
    pub fn input(&self, site: &SiteId) -> Option<&'a str> {
        self.inputs
            .iter()
            .find(|(s, _)| *s == site)
            .map(|(_, value)| *value)
    }
}

/// Everything one completed execution reported.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionFeedback {
    /// Structural coverage.
    pub coverage: Coverage,
    /// Heuristic measurements from instrumented data-access calls.
    #[serde(rename = "extraHeuristics")]
    pub heuristics: Vec<HeuristicEntry>,
    /// Reports about taint values.
    pub observations: Vec<TaintObservation>,
}

/// How one execution ended.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionOutcome {
    /// The execution finished and reported feedback.
    Completed(ExecutionFeedback),
    /// There was no response within the budget. Whatever coverage was
    /// collected so far is still reported.
    TimedOut {
        /// Partial structural coverage.
        coverage: Coverage,
    },
    /// The collaborator could not be reached.
    Unreachable(ErrorMessage),
    /// The target process died.
    Crashed(ErrorMessage),
}

/// The external collaborator that sends a test case to the target and
/// collects its feedback.
///
/// `execute` is the only place evaluation waits, and must return (with
/// [`ExecutionOutcome::TimedOut`] if need be) once
/// [`budget`][ExecutionRequest::budget] has elapsed. Implementations shared
/// between workers must be `Sync`.
pub trait Executor {
    /// Run one execution.
    fn execute(&self, request: &ExecutionRequest<'_>) -> ExecutionOutcome;
}

impl<E> Executor for &E
where
    E: Executor + ?Sized,
{
    fn execute(&self, request: &ExecutionRequest<'_>) -> ExecutionOutcome {
        (**self).execute(request)
    }
}

impl<E> Executor for Box<E>
where
    E: Executor + ?Sized,
{
    fn execute(&self, request: &ExecutionRequest<'_>) -> ExecutionOutcome {
        (**self).execute(request)
    }
}

/// An [`Executor`] backed by a closure.
///
/// See [`from_fn`] to create one.
#[derive(Clone, Debug)]
pub struct FromFn<F> {
    f: F,
}

/// Create an executor from a closure.
///
/// # Example
///
/// ```
/// use taintfit::{from_fn, ExecutionFeedback, ExecutionOutcome};
///
/// let executor = from_fn(|_request| ExecutionOutcome::Completed(ExecutionFeedback::default()));
/// # let _ = executor;
/// ```
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(&ExecutionRequest<'_>) -> ExecutionOutcome,
{
    FromFn { f }
}

impl<F> Executor for FromFn<F>
where
    F: Fn(&ExecutionRequest<'_>) -> ExecutionOutcome,
{
    fn execute(&self, request: &ExecutionRequest<'_>) -> ExecutionOutcome {
        (self.f)(request)
    }
}

/// Evaluates test cases against an [`Executor`].
///
/// An evaluator never changes a test case. It is shared by every worker; the
/// only state it keeps is the run of consecutive unreachable executions,
/// which is what distinguishes a dead target from one failed request.
#[derive(Debug)]
pub struct Evaluator<E> {
    executor: E,
    budget: Duration,
    covered_threshold: f64,
    unreachable_threshold: u32,
    consecutive_unreachable: AtomicU32,
}

impl<E> Evaluator<E>
where
    E: Executor,
{
    /// Create an evaluator.
    pub fn new(executor: E, config: &Config) -> Self {
        Evaluator {
            executor,
            budget: config.execution_budget,
            covered_threshold: config.covered_threshold,
            unreachable_threshold: config.unreachable_threshold.max(1),
            consecutive_unreachable: AtomicU32::new(0),
        }
    }

    /// Execute `test_case` once and build its fitness record.
    ///
    /// # Errors
    ///
    /// * [`Unreachable`][crate::ErrorKind::Unreachable]: retryable.
    /// * [`TargetDown`][crate::ErrorKind::TargetDown]: the configured number
    ///   of consecutive executions, across all workers, were unreachable.
    /// * [`Timeout`][crate::ErrorKind::Timeout]: carries a partial record; see
    ///   [`ResultExt::recover_timeout`][crate::ResultExt::recover_timeout].
    /// * [`Crashed`][crate::ErrorKind::Crashed]: not retried here.
    pub fn evaluate(&self, test_case: &TestCase) -> Result<FitnessRecord> {
        let request = ExecutionRequest {
            test_case: test_case.id(),
            inputs: test_case.rendered_inputs().collect(),
            budget: self.budget,
        };
        log::trace!("executing test case {}", request.test_case);

        let outcome = self.executor.execute(&request);
        let record = FitnessRecord::builder(request.test_case).covered_threshold(self.covered_threshold);

        match outcome {
            ExecutionOutcome::Completed(feedback) => {
                self.consecutive_unreachable.store(0, Ordering::Relaxed);
                let normalized = heuristics::normalize(&feedback.heuristics);
                if !normalized.malformed.is_empty() {
                    log::warn!(
                        "test case {}: dropped {} malformed heuristic entries",
                        request.test_case,
                        normalized.malformed.len()
                    );
                }
                Ok(record
                    .coverage(feedback.coverage)
                    .heuristics(normalized)
                    .observations(feedback.observations)
                    .build())
            }
            ExecutionOutcome::TimedOut { coverage } => {
                self.consecutive_unreachable.store(0, Ordering::Relaxed);
                log::debug!("test case {} timed out", request.test_case);
                Err(Error::timeout(record.coverage(coverage).timed_out().build()))
            }
            ExecutionOutcome::Unreachable(msg) => {
                let streak = self.consecutive_unreachable.fetch_add(1, Ordering::Relaxed) + 1;
                if streak >= self.unreachable_threshold {
                    log::error!("target unreachable {streak} times in a row: {msg}");
                    Err(Error::target_down(streak))
                } else {
                    log::debug!("target unreachable ({streak} in a row): {msg}");
                    Err(Error::unreachable(msg))
                }
            }
            ExecutionOutcome::Crashed(msg) => {
                self.consecutive_unreachable.store(0, Ordering::Relaxed);
                log::error!("target crashed running test case {}: {msg}", request.test_case);
                Err(Error::crashed(msg))
            }
        }
    }

    /// How many executions in a row were unreachable.
    pub fn consecutive_unreachable(&self) -> u32 {
        self.consecutive_unreachable.load(Ordering::Relaxed)
    }

    /// The execution collaborator.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Take back the execution collaborator.
    pub fn into_executor(self) -> E {
        self.executor
    }
}
