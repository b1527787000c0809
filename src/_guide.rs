/*!

Tutorials and overviews for the `taintfit` crate.

All the documentation that isn't API reference.

# Table of Contents

* [Heuristics and the Archive][heuristics]
* [Taint Feedback][taint_feedback]
* [Running Workers Concurrently][concurrency]
* [Cargo Features][cargo_features]
* [Minimum Supported Rust Version][msrv]

 */

pub mod cargo_features;
pub mod concurrency;
pub mod heuristics;
pub mod msrv;
pub mod taint_feedback;
