//! Logging facade.
//!
//! With the `log` feature these are the `log` crate's macros. Without it they
//! expand to nothing, so call sites are identical either way.

#![allow(unused_macros, unused_imports)]

#[cfg(feature = "log")]
pub(crate) use ::log::{debug, error, info, trace, warn};

#[cfg(not(feature = "log"))]
mod disabled {
    macro_rules! trace {
        ($($tt:tt)*) => {};
    }
    macro_rules! debug {
        ($($tt:tt)*) => {};
    }
    macro_rules! info {
        ($($tt:tt)*) => {};
    }
    macro_rules! error {
        ($($tt:tt)*) => {};
    }
    // `warn` is also a builtin attribute, so define it under another name.
    macro_rules! warn_disabled {
        ($($tt:tt)*) => {};
    }

    pub(crate) use {debug, error, info, trace, warn_disabled as warn};
}

#[cfg(not(feature = "log"))]
pub(crate) use disabled::{debug, error, info, trace, warn};
