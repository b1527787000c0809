/*!

# Cargo Features

None of this crate's features are enabled by default.

* **`log`**: Enable logging with [the `log` crate](https://docs.rs/log).
  Dropped heuristic entries and unknown taint references are logged at `warn`
  and `debug`, archive improvements at `debug`, and a target that stopped
  answering at `error`. Without this feature every logging call compiles to
  nothing.

 */
