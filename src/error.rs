//! Error and result types for the `taintfit` crate.
//!
//! Only execution failures and configuration mistakes are errors. Malformed
//! feedback from the target (bad heuristic entries, stale taint markers) is
//! untrusted data: it is logged, reported alongside the result, and dropped.

use crate::fitness::FitnessRecord;
use std::borrow::Cow;
use std::fmt;

/// A result that is either `Ok(T)` or `Err(taintfit::Error)`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An extension trait for [`taintfit::Result`][crate::Result] that provides
/// additional methods.
pub trait ResultExt {
    /// Turns a [`Timeout`][ErrorKind::Timeout] error into its partial,
    /// zero-confidence fitness record, leaving every other error untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use taintfit::{Error, FitnessRecord, Result, ResultExt, TestCaseId};
    ///
    /// let partial = FitnessRecord::builder(TestCaseId::new(7)).timed_out().build();
    /// let result: Result<FitnessRecord> = Err(Error::timeout(partial));
    ///
    /// let record = result.recover_timeout().unwrap();
    /// assert!(record.timed_out());
    /// ```
    fn recover_timeout(self) -> Result<FitnessRecord>;
}

impl ResultExt for Result<FitnessRecord> {
    #[inline]
    fn recover_timeout(self) -> Result<FitnessRecord> {
        match self {
            Ok(record) => Ok(record),
            Err(err) => match err.into_kind() {
                ErrorKind::Timeout { partial } => Ok(partial),
                kind => Err(kind.into()),
            },
        }
    }
}

/// An error that can occur when using the `taintfit` crate.
///
/// This type is a thin wrapper around [`ErrorKind`], which contains the
/// specific kind of error that occurred.
///
/// # Examples
///
/// ```
/// use taintfit::{Error, ErrorKind};
///
/// let error = Error::unreachable("connection refused");
///
/// if error.is_retryable() {
///     println!("try again later");
/// }
///
/// match error.kind() {
///     ErrorKind::Unreachable(msg) => println!("unreachable: {msg}"),
///     ErrorKind::Crashed(msg) => println!("crashed: {msg}"),
///
///     // The `ErrorKind` type is not exhaustive, so we always need a catch-all arm.
///     other => println!("other: {other:?}"),
/// }
/// ```
pub struct Error {
    kind: Box<ErrorKind>,
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Unreachable(msg) => {
                write!(f, "the execution collaborator is unreachable: {msg}")
            }
            ErrorKind::Timeout { partial } => write!(
                f,
                "execution of test case {} did not complete within its budget",
                partial.test_case()
            ),
            ErrorKind::Crashed(msg) => write!(f, "the target under test crashed: {msg}"),
            ErrorKind::TargetDown {
                consecutive_unreachable,
            } => write!(
                f,
                "the target appears to be down: {consecutive_unreachable} consecutive \
                 executions were unreachable"
            ),
            ErrorKind::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            ErrorKind::Other(msg) => write!(f, "an unknown error occurred: {msg}"),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Returns a new error indicating that the execution collaborator could
    /// not be reached.
    #[must_use]
    pub fn unreachable(msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::Unreachable(msg.into()).into()
    }

    /// Returns a new error indicating that an execution ran out of budget,
    /// carrying the partial record it still produced.
    #[must_use]
    pub fn timeout(partial: FitnessRecord) -> Self {
        ErrorKind::Timeout { partial }.into()
    }

    /// Returns a new error indicating that the target process died.
    #[must_use]
    pub fn crashed(msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::Crashed(msg.into()).into()
    }

    /// Returns a new error indicating that too many consecutive executions
    /// were unreachable.
    #[must_use]
    pub fn target_down(consecutive_unreachable: u32) -> Self {
        ErrorKind::TargetDown {
            consecutive_unreachable,
        }
        .into()
    }

    /// Returns a new error indicating an invalid configuration.
    #[must_use]
    pub fn invalid_config(msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::InvalidConfig(msg.into()).into()
    }

    /// Returns a new error with the given message.
    #[must_use]
    pub fn other(msg: impl Into<ErrorMessage>) -> Self {
        ErrorKind::Other(msg.into()).into()
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Consumes this error, returning its kind.
    #[must_use]
    pub fn into_kind(self) -> ErrorKind {
        *self.kind
    }

    /// Returns `true` if the error's kind is
    /// [`Unreachable`][ErrorKind::Unreachable].
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(*self.kind, ErrorKind::Unreachable(_))
    }

    /// Returns `true` if the error's kind is [`Timeout`][ErrorKind::Timeout].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ErrorKind::Timeout { .. })
    }

    /// Returns `true` if the error's kind is [`Crashed`][ErrorKind::Crashed].
    #[must_use]
    pub fn is_crashed(&self) -> bool {
        matches!(*self.kind, ErrorKind::Crashed(_))
    }

    /// Returns `true` if the error's kind is
    /// [`TargetDown`][ErrorKind::TargetDown].
    #[must_use]
    pub fn is_target_down(&self) -> bool {
        matches!(*self.kind, ErrorKind::TargetDown { .. })
    }

    /// Whether the caller may simply retry the same evaluation.
    ///
    /// Only a lone unreachable collaborator is retryable; the retry budget
    /// belongs to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_unreachable()
    }

    /// Whether the outer loop should pause generation until the target is
    /// restarted.
    #[must_use]
    pub fn requires_intervention(&self) -> bool {
        self.is_crashed() || self.is_target_down()
    }

    /// The partial record of a timed-out execution, if this is a timeout.
    #[must_use]
    pub fn timeout_record(&self) -> Option<&FitnessRecord> {
        match &*self.kind {
            ErrorKind::Timeout { partial } => Some(partial),
            _ => None,
        }
    }
}

/// The kind of an error that can occur when using the `taintfit` crate.
///
/// This enum is not exhaustive, and new variants may be added in the future.
/// When matching on this enum, a catch-all arm should be used to handle any
/// new variants that are added.
#[non_exhaustive]
#[derive(Debug)]
pub enum ErrorKind {
    /// The execution collaborator is unavailable. Retryable.
    Unreachable(ErrorMessage),

    /// The execution did not complete within its budget. The partial record
    /// holds low-confidence structural coverage and no heuristic entries.
    Timeout {
        /// What the execution still contributed.
        partial: FitnessRecord,
    },

    /// The target process died.
    Crashed(ErrorMessage),

    /// A run of consecutive unreachable executions reached the configured
    /// threshold.
    TargetDown {
        /// How many executions in a row were unreachable.
        consecutive_unreachable: u32,
    },

    /// A configuration value was out of range.
    InvalidConfig(ErrorMessage),

    /// Some other error occurred.
    Other(ErrorMessage),
}

impl From<Error> for ErrorKind {
    #[inline]
    fn from(err: Error) -> Self {
        err.into_kind()
    }
}

/// A message that can be attached to an error.
///
/// # Examples
///
/// ```
/// use taintfit::ErrorMessage;
///
/// let msg = ErrorMessage::new("connection reset");
/// assert_eq!(msg.as_str(), "connection reset");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage {
    inner: Cow<'static, str>,
}

impl ErrorMessage {
    /// Returns a new error message with the given string.
    #[must_use]
    pub fn new(msg: impl Into<ErrorMessage>) -> Self {
        msg.into()
    }

    /// Returns the message as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for ErrorMessage {
    #[inline]
    fn from(s: &'static str) -> Self {
        Self {
            inner: Cow::Borrowed(s),
        }
    }
}

impl From<Cow<'static, str>> for ErrorMessage {
    #[inline]
    fn from(s: Cow<'static, str>) -> Self {
        Self { inner: s }
    }
}

impl From<String> for ErrorMessage {
    #[inline]
    fn from(s: String) -> Self {
        Self {
            inner: Cow::Owned(s),
        }
    }
}
