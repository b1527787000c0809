//! Taint values and the observations reported back about them.
//!
//! A taint value is a marked placeholder injected into an input whose valid
//! form is unknown. The instrumented target reports how it consumed the value
//! (compared it with a literal, tried to parse it, ignored it) and the
//! [`TaintTracker`] turns those reports into input proposals.
//!
//! Markers look like `_TF0badf00d_17_`: the reserved `_TF` prefix, the
//! allocator's run tag as eight hex digits, and a sequence number. They
//! survive being embedded in larger strings, so a marker is recognised inside
//! a JSON body just as well as on its own.

use crate::log;
use crate::rng::Rng;
use crate::test_case::SiteId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod format;
pub mod tracker;

pub use format::FormatTag;
pub use tracker::{Absorbed, InputUpdateProposal, ProposalBasis, SiteStatus, Strength, TaintTracker};

const MARKER_PREFIX: &str = "_TF";
const RUN_TAG_DIGITS: usize = 8;

/// The identity of one taint value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaintId {
    run: u32,
    seq: u64,
}

impl TaintId {
    /// The run tag of the allocator that created this id.
    pub fn run(&self) -> u32 {
        self.run
    }

    /// The sequence number within its run.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Parse a string that is exactly one marker.
    ///
    /// ```
    /// use taintfit::TaintId;
    ///
    /// let id = TaintId::parse("_TF0badf00d_17_").unwrap();
    /// assert_eq!(id.seq(), 17);
    /// assert!(TaintId::parse("_TF0badf00d_17_ trailing").is_none());
    /// assert!(TaintId::parse("hello").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<TaintId> {
        match parse_prefix(s) {
            Some((id, len)) if len == s.len() => Some(id),
            _ => None,
        }
    }

    /// Find every marker embedded in `text`, in order of appearance.
    pub fn find_all(text: &str) -> Vec<TaintId> {
        let mut found = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(MARKER_PREFIX) {
            let candidate = &rest[start..];
            match parse_prefix(candidate) {
                Some((id, len)) => {
                    found.push(id);
                    rest = &candidate[len..];
                }
                None => rest = &candidate[MARKER_PREFIX.len()..],
            }
        }
        found
    }
}

impl fmt::Display for TaintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MARKER_PREFIX}{:08x}_{}_", self.run, self.seq)
    }
}

// Parses one marker at the start of `s`, returning it and its length.
fn parse_prefix(s: &str) -> Option<(TaintId, usize)> {
    let body = s.strip_prefix(MARKER_PREFIX)?;
    let tag = body.get(..RUN_TAG_DIGITS)?;
    if !tag.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let run = u32::from_str_radix(tag, 16).ok()?;

    let rest = body[RUN_TAG_DIGITS..].strip_prefix('_')?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || rest.as_bytes().get(digits) != Some(&b'_') {
        return None;
    }
    let seq = rest[..digits].parse().ok()?;

    let len = MARKER_PREFIX.len() + RUN_TAG_DIGITS + 1 + digits + 1;
    Some((TaintId { run, seq }, len))
}

/// A taint value tied to the input site it was injected at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaintValue {
    id: TaintId,
    site: SiteId,
    marker: String,
}

impl TaintValue {
    /// The identity of this value.
    pub fn id(&self) -> TaintId {
        self.id
    }

    /// The site this value was injected at.
    pub fn site(&self) -> &SiteId {
        &self.site
    }

    /// The marker text sent to the target.
    pub fn as_str(&self) -> &str {
        &self.marker
    }
}

impl fmt::Display for TaintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marker)
    }
}

/// Allocates taint values for one search run.
///
/// The allocator is the only process-wide taint state. It is shared by every
/// worker (`&TaintAllocator` is enough, allocation is a single atomic
/// increment) and is created explicitly per run, so several independent runs
/// can live in one process.
#[derive(Debug)]
pub struct TaintAllocator {
    run: u32,
    next: AtomicU64,
}

impl TaintAllocator {
    /// Create an allocator whose run tag is drawn from `rng`.
    pub fn new(rng: &mut Rng) -> Self {
        Self::with_run_tag(rng.gen_u32())
    }

    /// Create an allocator with a fixed run tag.
    pub fn with_run_tag(run: u32) -> Self {
        TaintAllocator {
            run,
            next: AtomicU64::new(0),
        }
    }

    /// This allocator's run tag.
    pub fn run_tag(&self) -> u32 {
        self.run
    }

    /// Create a fresh taint value for `site`.
    ///
    /// ```
    /// use taintfit::{SiteId, TaintAllocator, TaintId};
    ///
    /// let allocator = TaintAllocator::with_run_tag(0x0badf00d);
    /// let site = SiteId::new("POST /users#body");
    /// let a = allocator.create(&site);
    /// let b = allocator.create(&site);
    ///
    /// assert_ne!(a.id(), b.id());
    /// assert_eq!(TaintId::parse(a.as_str()), Some(a.id()));
    /// ```
    pub fn create(&self, site: &SiteId) -> TaintValue {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let id = TaintId { run: self.run, seq };
        log::trace!("allocated taint {id} for site {site}");
        TaintValue {
            id,
            site: site.clone(),
            marker: id.to_string(),
        }
    }

    /// How many values this allocator has handed out.
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// How the target consumed a taint value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "usage", rename_all = "kebab-case")]
pub enum Usage {
    /// The value was compared for equality, possibly against a revealed
    /// literal constant.
    EqualityCompared {
        /// The constant it was compared against, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        literal: Option<String>,
    },

    /// The value was parsed or validated as the given format.
    ParsedAs {
        /// The expected format.
        format: FormatTag,
    },

    /// The value never influenced the execution.
    Unused,

    /// A usage this crate does not know. Observations carrying it are
    /// skipped, without failing to decode the rest of the feedback.
    #[serde(other)]
    Unrecognized,
}

/// One report, from one execution, about one taint value.
///
/// The producing side is an untrusted external process, so `taint` is kept as
/// the raw text it reported.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintObservation {
    /// The marker text the target reported.
    pub taint: String,

    /// What the target did with it.
    #[serde(flatten)]
    pub usage: Usage,
}

impl TaintObservation {
    /// An observation about `taint`.
    pub fn new(taint: impl fmt::Display, usage: Usage) -> Self {
        TaintObservation {
            taint: taint.to_string(),
            usage,
        }
    }

    /// The value was compared against `literal`.
    pub fn compared_with(taint: impl fmt::Display, literal: impl Into<String>) -> Self {
        Self::new(
            taint,
            Usage::EqualityCompared {
                literal: Some(literal.into()),
            },
        )
    }

    /// The value was parsed as `format`.
    pub fn parsed_as(taint: impl fmt::Display, format: FormatTag) -> Self {
        Self::new(taint, Usage::ParsedAs { format })
    }

    /// The value was not used.
    pub fn unused(taint: impl fmt::Display) -> Self {
        Self::new(taint, Usage::Unused)
    }

    /// The identity this observation refers to, if its text holds a marker.
    ///
    /// An exact marker is preferred; otherwise the first embedded one is used.
    pub fn taint_id(&self) -> Option<TaintId> {
        TaintId::parse(&self.taint).or_else(|| TaintId::find_all(&self.taint).into_iter().next())
    }
}
