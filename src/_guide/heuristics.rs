/*!

# Heuristics and the Archive

Structural coverage only says whether a target was reached. Heuristics say how
close an execution came: an instrumented SQL or MongoDB call reports, for each
query condition, a distance to satisfying it.

## Normalization

Every [`HeuristicEntry`][crate::HeuristicEntry] carries an
[`Objective`][crate::Objective]. [`normalize`][crate::normalize] turns every
entry into a score where larger is always better:

* `MAXIMIZE` values pass through unchanged.
* `MINIMIZE_TO_ZERO` values are negated, so a distance of `0` becomes the
  best possible score.
* An entry measured over zero records is kept, but with
  [`Confidence::Low`][crate::Confidence::Low]: a query against an empty table
  tells us little about the query.
* Entries without a value, with a NaN, or with an objective this crate does
  not know are dropped and reported in
  [`Normalized::malformed`][crate::Normalized::malformed].

```
use taintfit::{normalize, Confidence, HeuristicEntry, HeuristicKind, Objective, TargetKey};

let entries = [
    HeuristicEntry::new(HeuristicKind::Relational, Objective::MinimizeToZero, "q1", Some(3.0), 10),
    HeuristicEntry::new(HeuristicKind::Relational, Objective::MinimizeToZero, "q1", Some(1.0), 10),
    HeuristicEntry::new(HeuristicKind::DocumentStore, Objective::Maximize, "find", Some(2.0), 0),
];
let normalized = normalize(&entries);

let q1 = normalized.contributions[&TargetKey::heuristic(HeuristicKind::Relational, "q1")];
assert_eq!(q1.score(), -1.0);

let find = normalized.contributions[&TargetKey::heuristic(HeuristicKind::DocumentStore, "find")];
assert_eq!(find.confidence(), Confidence::Low);
```

## Keeping the best

The [`Archive`][crate::Archive] keeps, for every target, the record with the
greatest [`Contribution`][crate::Contribution] under one total order:

1. reached structural targets beat unreached ones,
2. normal confidence beats low confidence,
3. a greater score wins, and a tie keeps the record already archived.

Because only the maximum is kept, the archive ends up in the same state no
matter which order workers report in.

 */
