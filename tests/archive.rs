use taintfit::{
    normalize, Archive, Confidence, Coverage, Dominance, FitnessRecord, HeuristicEntry,
    HeuristicKind, Objective, TargetKey, TestCaseId,
};

const QUERY: &str = "SELECT * FROM users WHERE id=?";

fn query_key() -> TargetKey {
    TargetKey::heuristic(HeuristicKind::Relational, QUERY)
}

fn query_record(test_case: u64, distance: f64, records: u32) -> FitnessRecord {
    let entry = HeuristicEntry::new(
        HeuristicKind::Relational,
        Objective::MinimizeToZero,
        QUERY,
        Some(distance),
        records,
    );
    FitnessRecord::builder(TestCaseId::new(test_case))
        .heuristics(normalize(&[entry]))
        .build()
}

fn coverage_record(test_case: u64, coverage: Coverage) -> FitnessRecord {
    FitnessRecord::builder(TestCaseId::new(test_case))
        .coverage(coverage)
        .build()
}

#[test]
fn reaching_zero_distance_improves_on_low_confidence_entry() -> anyhow::Result<()> {
    let archive = Archive::new();

    let first = archive.consider_for_inclusion(query_record(1, 5.0, 0));
    assert_eq!(first.new_targets, vec![query_key()]);

    let second = archive.consider_for_inclusion(query_record(2, 0.0, 1));
    assert!(second.is_improvement());
    assert_eq!(second.improved, vec![query_key()]);
    assert!(second.new_targets.is_empty());

    let best = archive.best(&query_key()).ok_or_else(|| anyhow::anyhow!("no best record"))?;
    assert_eq!(best.test_case(), TestCaseId::new(2));
    Ok(())
}

#[test]
fn low_confidence_entry_never_displaces_normal_one() -> anyhow::Result<()> {
    let archive = Archive::new();
    archive.consider_for_inclusion(query_record(1, 0.0, 1));

    for (test_case, distance) in [(2, 5.0), (3, 0.0)] {
        let report = archive.consider_for_inclusion(query_record(test_case, distance, 0));
        assert!(!report.is_improvement(), "test case {test_case} displaced the best record");
    }

    let contribution = archive
        .contribution(&query_key())
        .ok_or_else(|| anyhow::anyhow!("target missing"))?;
    assert_eq!(contribution.confidence(), Confidence::Normal);
    assert_eq!(contribution.score(), 0.0);
    Ok(())
}

#[test]
fn ties_keep_the_incumbent() {
    let archive = Archive::new();
    archive.consider_for_inclusion(query_record(1, 2.0, 3));
    let report = archive.consider_for_inclusion(query_record(2, 2.0, 3));
    assert!(!report.is_improvement());
    assert_eq!(
        archive.best(&query_key()).map(|r| r.test_case()),
        Some(TestCaseId::new(1))
    );
}

#[test]
fn best_contribution_never_decreases() -> anyhow::Result<()> {
    let archive = Archive::new();
    let sequence = [
        (9.0, 1),
        (3.0, 0),
        (12.0, 4),
        (4.0, 2),
        (4.0, 0),
        (0.5, 1),
        (7.0, 1),
        (0.0, 0),
    ];

    let mut previous: Option<taintfit::Contribution> = None;
    for (i, (distance, records)) in sequence.into_iter().enumerate() {
        archive.consider_for_inclusion(query_record(i as u64, distance, records));
        let current = archive
            .contribution(&query_key())
            .ok_or_else(|| anyhow::anyhow!("target missing"))?;
        if let Some(previous) = previous {
            assert!(!previous.is_better_than(&current), "regressed at step {i}");
        }
        previous = Some(current);
    }
    assert_eq!(previous.map(|c| c.score()), Some(-0.5));
    Ok(())
}

#[test]
fn final_state_does_not_depend_on_arrival_order() {
    let records = || {
        vec![
            query_record(1, 3.0, 1),
            query_record(2, 1.0, 0),
            query_record(3, 1.0, 2),
            coverage_record(4, Coverage::new().with("branch:7", 0.4)),
            coverage_record(5, Coverage::new().with("branch:7", 1.0)),
        ]
    };

    let forward = Archive::new();
    for record in records() {
        forward.consider_for_inclusion(record);
    }
    let backward = Archive::new();
    for record in records().into_iter().rev() {
        backward.consider_for_inclusion(record);
    }

    let strip = |archive: &Archive| {
        archive
            .snapshot()
            .targets
            .into_iter()
            .map(|t| (t.target, t.contribution, t.test_case))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&forward), strip(&backward));
}

#[test]
fn reaching_a_structural_target_is_reported() {
    let archive = Archive::new();
    let branch = TargetKey::structural("branch:7");

    let partial = archive.consider_for_inclusion(coverage_record(1, Coverage::new().with("branch:7", 0.5)));
    assert_eq!(partial.new_targets, vec![branch.clone()]);
    assert!(partial.newly_reached.is_empty());
    assert_eq!(archive.uncovered_targets(), vec![branch.clone()]);

    let full = archive.consider_for_inclusion(coverage_record(2, Coverage::new().with("branch:7", 1.0)));
    assert_eq!(full.newly_reached, vec![branch]);
    assert!(archive.uncovered_targets().is_empty());
}

#[test]
fn coverage_is_clamped_and_nan_dropped() {
    let record = coverage_record(
        1,
        Coverage::new()
            .with("over", 3.0)
            .with("under", -1.0)
            .with("nan", f64::NAN),
    );
    let over = record.contribution(&TargetKey::structural("over"));
    assert_eq!(over.map(|c| (c.score(), c.reached())), Some((1.0, true)));
    let under = record.contribution(&TargetKey::structural("under"));
    assert_eq!(under.map(|c| c.score()), Some(0.0));
    assert!(record.contribution(&TargetKey::structural("nan")).is_none());
}

#[test]
fn nan_reading_does_not_shadow_a_later_one() {
    let coverage = Coverage::new().with("b", f64::NAN).with("b", 0.8);
    assert_eq!(coverage.len(), 1);

    let record = coverage_record(1, coverage);
    let b = record.contribution(&TargetKey::structural("b"));
    assert_eq!(b.map(|c| c.score()), Some(0.8));
}

#[test]
fn normal_confidence_replaces_low_confidence_with_lower_score() -> anyhow::Result<()> {
    let archive = Archive::new();
    archive.consider_for_inclusion(query_record(1, 0.0, 0));

    let report = archive.consider_for_inclusion(query_record(2, 5.0, 1));
    assert!(report.is_improvement());

    // The score goes down, the rank does not.
    let contribution = archive
        .contribution(&query_key())
        .ok_or_else(|| anyhow::anyhow!("target missing"))?;
    assert_eq!(contribution.score(), -5.0);
    assert_eq!(contribution.confidence(), Confidence::Normal);
    Ok(())
}

#[test]
fn snapshot_tracks_staleness() -> anyhow::Result<()> {
    let archive = Archive::new();
    archive.consider_for_inclusion(coverage_record(1, Coverage::new().with("a", 1.0)));
    archive.consider_for_inclusion(coverage_record(2, Coverage::new().with("b", 0.2)));
    archive.consider_for_inclusion(coverage_record(3, Coverage::new().with("a", 1.0)));

    let snapshot = archive.snapshot();
    assert_eq!(snapshot.evaluations, 3);
    assert_eq!(snapshot.reached(), 1);

    let a = snapshot
        .get(&TargetKey::structural("a"))
        .ok_or_else(|| anyhow::anyhow!("a missing"))?;
    assert_eq!(a.test_case, TestCaseId::new(1));
    assert_eq!(a.improved_at, 1);
    assert_eq!(a.executions_since_improvement, 2);

    let json = serde_json::to_value(&snapshot)?;
    assert_eq!(json["evaluations"], 3);
    assert_eq!(json["targets"][0]["target"]["target"], "structural");
    assert_eq!(json["targets"][0]["executionsSinceImprovement"], 2);
    Ok(())
}

#[test]
fn dominance_compares_target_by_target() {
    let a = TargetKey::structural("a");
    let b = TargetKey::structural("b");
    let targets = [a.clone(), b.clone()];

    let both = coverage_record(1, Coverage::new().with("a", 1.0).with("b", 0.5));
    let only_a = coverage_record(2, Coverage::new().with("a", 1.0));
    let only_b = coverage_record(3, Coverage::new().with("b", 0.9));

    assert_eq!(both.dominance(&only_a, &targets), Dominance::Dominates);
    assert_eq!(only_a.dominance(&both, &targets), Dominance::DominatedBy);
    assert_eq!(only_a.dominance(&only_b, &targets), Dominance::NonDominated);
    assert_eq!(both.dominance(&both, &targets), Dominance::NonDominated);
}
