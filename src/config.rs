//! Tuning knobs for a search run.

use crate::error::{Error, Result};
use crate::rng::DEFAULT_SEED;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Session`][crate::Session].
///
/// Every field has a default, so a partial configuration deserializes; the
/// setters allow building one in code.
///
/// # Example
///
/// ```
/// # fn foo() -> taintfit::Result<()> {
/// use std::time::Duration;
/// use taintfit::Config;
///
/// let config = Config::new()
///     .seed(0x1984)
///     .unused_taint_threshold(5)
///     .execution_budget(Duration::from_secs(2));
/// config.validate()?;
/// # Ok(())
/// # }
/// # foo().unwrap();
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Seed for every random choice made by the engine.
    pub seed: u64,

    /// Consecutive executions in which a site's taint went unused before the
    /// site stops being tainted.
    pub unused_taint_threshold: u32,

    /// Consecutive unreachable executions before the target is reported as
    /// down.
    pub unreachable_threshold: u32,

    /// Time budget for one execution, enforced by the execution collaborator.
    #[serde(rename = "executionBudgetMs", with = "millis")]
    pub execution_budget: Duration,

    /// Proximity at which a structural target counts as reached.
    pub covered_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// The default configuration.
    pub fn new() -> Self {
        Config {
            seed: DEFAULT_SEED,
            unused_taint_threshold: 3,
            unreachable_threshold: 3,
            execution_budget: Duration::from_secs(10),
            covered_threshold: 1.0,
        }
    }

    /// Set the seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set how many consecutive unused executions abandon a tainted site.
    pub fn unused_taint_threshold(mut self, threshold: u32) -> Self {
        self.unused_taint_threshold = threshold;
        self
    }

    /// Set how many consecutive unreachable executions mean the target is
    /// down.
    pub fn unreachable_threshold(mut self, threshold: u32) -> Self {
        self.unreachable_threshold = threshold;
        self
    }

    /// Set the per-execution time budget.
    pub fn execution_budget(mut self, budget: Duration) -> Self {
        self.execution_budget = budget;
        self
    }

    /// Set the proximity at which a structural target counts as reached.
    pub fn covered_threshold(mut self, threshold: f64) -> Self {
        self.covered_threshold = threshold;
        self
    }

    /// Check that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if self.unused_taint_threshold == 0 {
            return Err(Error::invalid_config("unused_taint_threshold must be at least 1"));
        }
        if self.unreachable_threshold == 0 {
            return Err(Error::invalid_config("unreachable_threshold must be at least 1"));
        }
        if self.execution_budget.is_zero() {
            return Err(Error::invalid_config("execution_budget must be non-zero"));
        }
        if !(self.covered_threshold > 0.0 && self.covered_threshold <= 1.0) {
            return Err(Error::invalid_config("covered_threshold must be in (0, 1]"));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
