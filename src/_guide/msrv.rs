// XXX: Keep this documented MSRV in sync with the `rust-version` in
// `Cargo.toml`.

/*!

# Minimum Supported Rust Version

`taintfit` currently requires Rust **1.80.0** or newer.

The MSRV is only raised in a minor release, never in a patch release.

 */
