//! The shapes exchanged with the instrumented target.

use serde_json::json;
use taintfit::{
    normalize, Config, ExecutionFeedback, FormatTag, HeuristicEntry, HeuristicKind,
    MalformedReason, Objective, TaintObservation, Usage,
};

#[test]
fn heuristic_entries_use_dto_field_names() -> anyhow::Result<()> {
    let entry: HeuristicEntry = serde_json::from_value(json!({
        "type": "SQL",
        "objective": "MINIMIZE_TO_ZERO",
        "id": "SELECT * FROM users WHERE id=?",
        "value": 5.0,
        "numberOfEvaluatedRecords": 0,
    }))?;
    assert_eq!(entry.kind, HeuristicKind::Relational);
    assert_eq!(entry.objective, Objective::MinimizeToZero);
    assert_eq!(entry.value, Some(5.0));
    assert_eq!(entry.evaluated_records, 0);

    let back = serde_json::to_value(&entry)?;
    assert_eq!(back["type"], "SQL");
    assert_eq!(back["numberOfEvaluatedRecords"], 0);
    Ok(())
}

#[test]
fn unknown_kind_is_preserved() -> anyhow::Result<()> {
    let entry: HeuristicEntry = serde_json::from_value(json!({
        "type": "CASSANDRA",
        "objective": "MAXIMIZE",
        "id": "select",
        "value": 1.0,
        "numberOfEvaluatedRecords": 2,
    }))?;
    assert_eq!(entry.kind, HeuristicKind::Other("CASSANDRA".into()));
    assert_eq!(serde_json::to_value(&entry)?["type"], "CASSANDRA");
    assert_eq!(normalize(&[entry]).contributions.len(), 1);
    Ok(())
}

#[test]
fn unrecognized_objective_is_malformed_not_a_decode_error() -> anyhow::Result<()> {
    let entries: Vec<HeuristicEntry> = serde_json::from_value(json!([
        { "type": "MONGO", "objective": "MINIMIZE_SOMETIMES", "id": "find", "value": 1.0 },
        { "type": "MONGO", "objective": "MAXIMIZE", "id": "find", "value": null },
    ]))?;
    assert_eq!(entries[0].objective, Objective::Unrecognized);

    let normalized = normalize(&entries);
    assert!(normalized.contributions.is_empty());
    let reasons: Vec<_> = normalized.malformed.iter().map(|m| m.reason).collect();
    assert_eq!(
        reasons,
        vec![MalformedReason::UnrecognizedObjective, MalformedReason::MissingValue]
    );
    Ok(())
}

#[test]
fn observations_are_tagged_by_usage() -> anyhow::Result<()> {
    let observations: Vec<TaintObservation> = serde_json::from_value(json!([
        { "taint": "_TF00000001_0_", "usage": "equality-compared", "literal": "ABC123" },
        { "taint": "_TF00000001_1_", "usage": "equality-compared" },
        { "taint": "_TF00000001_2_", "usage": "parsed-as", "format": "digits:4" },
        { "taint": "_TF00000001_3_", "usage": "unused" },
    ]))?;
    assert_eq!(
        observations[0].usage,
        Usage::EqualityCompared {
            literal: Some("ABC123".into())
        }
    );
    assert_eq!(observations[1].usage, Usage::EqualityCompared { literal: None });
    assert_eq!(
        observations[2].usage,
        Usage::ParsedAs {
            format: FormatTag::Digits(4)
        }
    );
    assert_eq!(observations[3].usage, Usage::Unused);
    assert_eq!(observations[2].taint_id().map(|id| id.seq()), Some(2));

    let back = serde_json::to_value(&observations[2])?;
    assert_eq!(back, json!({ "taint": "_TF00000001_2_", "usage": "parsed-as", "format": "digits:4" }));
    Ok(())
}

#[test]
fn feedback_fields_default_when_absent() -> anyhow::Result<()> {
    let feedback: ExecutionFeedback = serde_json::from_value(json!({
        "coverage": { "GET /users:200": 1.0 },
    }))?;
    assert_eq!(feedback.coverage.len(), 1);
    assert!(feedback.heuristics.is_empty());
    assert!(feedback.observations.is_empty());
    Ok(())
}

#[test]
fn partial_config_fills_in_defaults() -> anyhow::Result<()> {
    let config: Config = serde_json::from_value(json!({
        "unusedTaintThreshold": 5,
        "executionBudgetMs": 1500,
    }))?;
    assert_eq!(config.unused_taint_threshold, 5);
    assert_eq!(config.execution_budget.as_millis(), 1500);
    assert_eq!(config.unreachable_threshold, Config::new().unreachable_threshold);
    config.validate()?;
    Ok(())
}

#[test]
fn unknown_usage_does_not_spoil_the_feedback() -> anyhow::Result<()> {
    let feedback: ExecutionFeedback = serde_json::from_value(json!({
        "coverage": { "POST /coupons:400": 1.0 },
        "extraHeuristics": [
            { "type": "SQL", "objective": "MAXIMIZE", "id": "q", "value": 1.0, "numberOfEvaluatedRecords": 1 },
        ],
        "observations": [
            { "taint": "_TF00000001_0_", "usage": "length-checked" },
            { "taint": "_TF00000001_0_", "usage": "equality-compared", "literal": "X" },
        ],
    }))?;
    assert_eq!(feedback.coverage.len(), 1);
    assert_eq!(feedback.heuristics.len(), 1);
    assert_eq!(feedback.observations[0].usage, Usage::Unrecognized);
    assert_eq!(
        feedback.observations[1].usage,
        Usage::EqualityCompared {
            literal: Some("X".into())
        }
    );
    Ok(())
}
