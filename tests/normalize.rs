use taintfit::{
    normalize, Confidence, HeuristicEntry, HeuristicKind, MalformedReason, Objective, TargetKey,
};
use test_case::test_case;

const QUERY: &str = "SELECT * FROM users WHERE id=?";

fn sql(objective: Objective, value: Option<f64>, records: u32) -> HeuristicEntry {
    HeuristicEntry::new(HeuristicKind::Relational, objective, QUERY, value, records)
}

fn key() -> TargetKey {
    TargetKey::heuristic(HeuristicKind::Relational, QUERY)
}

#[test_case(Objective::Maximize, 0.25, 0.25 ; "maximize passes through")]
#[test_case(Objective::Maximize, -3.0, -3.0 ; "maximize keeps negative values")]
#[test_case(Objective::MinimizeToZero, 4.0, -4.0 ; "minimize is negated")]
#[test_case(Objective::MinimizeToZero, 0.0, 0.0 ; "minimize zero is the best score")]
#[test_case(Objective::MinimizeToZero, -0.0, 0.0 ; "minimize negative zero is zero")]
fn score_is_higher_is_better(objective: Objective, value: f64, expected: f64) {
    let normalized = normalize(&[sql(objective, Some(value), 1)]);
    let contribution = normalized.contributions[&key()];
    assert_eq!(contribution.score(), expected);
    assert_eq!(contribution.confidence(), Confidence::Normal);
    assert!(normalized.malformed.is_empty());
}

#[test_case(Objective::Maximize, None, MalformedReason::MissingValue ; "absent maximize")]
#[test_case(Objective::MinimizeToZero, None, MalformedReason::MissingValue ; "absent minimize")]
#[test_case(Objective::Maximize, Some(f64::NAN), MalformedReason::NotANumber ; "nan")]
#[test_case(Objective::MinimizeToZero, Some(-1.0), MalformedReason::Negative ; "negative distance")]
#[test_case(Objective::MinimizeToZero, Some(f64::INFINITY), MalformedReason::Infinite ; "infinite distance")]
#[test_case(Objective::Unrecognized, Some(1.0), MalformedReason::UnrecognizedObjective ; "unknown objective")]
fn malformed_entries_are_dropped(objective: Objective, value: Option<f64>, reason: MalformedReason) {
    let normalized = normalize(&[sql(objective, value, 3)]);
    assert!(normalized.contributions.is_empty());
    assert_eq!(normalized.malformed.len(), 1);
    assert_eq!(normalized.malformed[0].reason, reason);
    assert_eq!(normalized.malformed[0].target, key());
}

#[test]
fn zero_records_is_low_confidence_not_dropped() {
    let normalized = normalize(&[sql(Objective::MinimizeToZero, Some(2.0), 0)]);
    let contribution = normalized.contributions[&key()];
    assert_eq!(contribution.score(), -2.0);
    assert!(contribution.is_low_confidence());
}

#[test]
fn duplicates_keep_the_best_observation() {
    let normalized = normalize(&[
        sql(Objective::MinimizeToZero, Some(7.0), 5),
        sql(Objective::MinimizeToZero, Some(2.0), 5),
        sql(Objective::MinimizeToZero, Some(9.0), 5),
    ]);
    assert_eq!(normalized.contributions.len(), 1);
    assert_eq!(normalized.contributions[&key()].score(), -2.0);
}

#[test]
fn equal_duplicates_prefer_normal_confidence() {
    for entries in [
        [
            sql(Objective::MinimizeToZero, Some(1.0), 0),
            sql(Objective::MinimizeToZero, Some(1.0), 4),
        ],
        [
            sql(Objective::MinimizeToZero, Some(1.0), 4),
            sql(Objective::MinimizeToZero, Some(1.0), 0),
        ],
    ] {
        let normalized = normalize(&entries);
        assert_eq!(normalized.contributions[&key()].confidence(), Confidence::Normal);
    }
}

#[test]
fn same_id_with_different_kinds_are_different_targets() {
    let normalized = normalize(&[
        HeuristicEntry::new(HeuristicKind::Relational, Objective::Maximize, "users", Some(1.0), 1),
        HeuristicEntry::new(HeuristicKind::DocumentStore, Objective::Maximize, "users", Some(2.0), 1),
        HeuristicEntry::new(HeuristicKind::from("REDIS"), Objective::Maximize, "users", Some(3.0), 1),
    ]);
    assert_eq!(normalized.contributions.len(), 3);
    let redis = TargetKey::heuristic(HeuristicKind::Other("REDIS".into()), "users");
    assert_eq!(normalized.contributions[&redis].score(), 3.0);
}

#[test]
fn normalization_is_order_independent() {
    let entries = vec![
        sql(Objective::MinimizeToZero, Some(3.0), 0),
        sql(Objective::MinimizeToZero, Some(3.0), 2),
        HeuristicEntry::new(HeuristicKind::DocumentStore, Objective::Maximize, "find", Some(0.5), 1),
        sql(Objective::MinimizeToZero, None, 2),
    ];
    let forward = normalize(&entries);
    let mut reversed = entries.clone();
    reversed.reverse();
    let backward = normalize(&reversed);
    assert_eq!(forward.contributions, backward.contributions);
    assert_eq!(forward.malformed.len(), backward.malformed.len());
}

#[test]
fn normalizing_twice_gives_the_same_result() {
    let entries = vec![
        sql(Objective::MinimizeToZero, Some(4.0), 1),
        sql(Objective::MinimizeToZero, Some(4.0), 0),
        sql(Objective::MinimizeToZero, Some(1.0), 2),
        sql(Objective::MinimizeToZero, Some(-1.0), 2),
        sql(Objective::Maximize, None, 2),
        HeuristicEntry::new(HeuristicKind::DocumentStore, Objective::Maximize, "find", Some(0.5), 0),
        HeuristicEntry::new(HeuristicKind::DocumentStore, Objective::Unrecognized, "find", Some(9.0), 3),
    ];
    let first = normalize(&entries);
    let second = normalize(&entries);
    assert_eq!(first, second);
    assert_eq!(first.contributions.len(), 2);
    assert_eq!(first.malformed.len(), 3);
}
