use taintfit::{
    from_fn, Config, Coverage, ExecutionFeedback, ExecutionOutcome, ExecutionRequest, FormatTag,
    Session, SiteId, TaintObservation, TargetKey,
};

const BODY: &str = "POST /orders#body";

/// A mocked endpoint that answers 200 only when the body is an integer, and
/// otherwise reports that it tried to parse the body as one.
fn orders(request: &ExecutionRequest<'_>) -> ExecutionOutcome {
    let body = request.input(&SiteId::new(BODY)).unwrap_or_default();
    if body.trim().parse::<i64>().is_ok() {
        ExecutionOutcome::Completed(ExecutionFeedback {
            coverage: Coverage::new().with("POST /orders:200", 1.0),
            ..ExecutionFeedback::default()
        })
    } else {
        ExecutionOutcome::Completed(ExecutionFeedback {
            coverage: Coverage::new().with("POST /orders:400", 1.0),
            observations: vec![TaintObservation::parsed_as(body, FormatTag::Integer)],
            ..ExecutionFeedback::default()
        })
    }
}

#[test]
fn rejected_request_becomes_accepted() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let session = Session::new(from_fn(orders)).seed(0xdecaf);
    let body = SiteId::new(BODY);

    let mut test_case = session.test_case().with_input(body.clone(), "{}");
    session
        .taint(&mut test_case, &body)
        .ok_or_else(|| anyhow::anyhow!("could not taint the body"))?;

    let first = session.evaluate_and_archive(&mut test_case)?;
    assert_eq!(first.newly_reached, vec![TargetKey::structural("POST /orders:400")]);

    let proposals = session.propose_input_updates(&test_case);
    let proposal = proposals
        .first()
        .ok_or_else(|| anyhow::anyhow!("no proposal"))?;
    assert!(proposal.value.parse::<i64>().is_ok());
    assert!(test_case.apply(proposal));

    let second = session.evaluate_and_archive(&mut test_case)?;
    assert_eq!(second.newly_reached, vec![TargetKey::structural("POST /orders:200")]);
    assert!(session.archive().uncovered_targets().is_empty());
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected() {
    let err = Session::with_config(from_fn(orders), Config::new().unused_taint_threshold(0))
        .err()
        .unwrap();
    assert!(matches!(err.kind(), taintfit::ErrorKind::InvalidConfig(_)));

    assert!(Session::with_config(from_fn(orders), Config::new().covered_threshold(0.0)).is_err());
    assert!(Session::with_config(from_fn(orders), Config::new().covered_threshold(1.5)).is_err());
}

#[test]
fn same_seed_same_run_tag() -> anyhow::Result<()> {
    let a = Session::with_config(from_fn(orders), Config::new().seed(11))?;
    let b = Session::new(from_fn(orders)).seed(11);
    let c = Session::new(from_fn(orders)).seed(12);
    assert_eq!(a.allocator().run_tag(), b.allocator().run_tag());
    assert_ne!(a.allocator().run_tag(), c.allocator().run_tag());
    assert_eq!(a.configuration().seed, 11);
    Ok(())
}

#[test]
fn test_case_ids_are_unique() {
    let session = Session::new(from_fn(orders));
    let a = session.test_case();
    let b = session.test_case();
    assert_ne!(a.id(), b.id());
}

#[test]
fn workers_share_one_session() -> anyhow::Result<()> {
    const WORKERS: u64 = 8;
    const PER_WORKER: u64 = 25;

    let session = Session::new(from_fn(|request| {
        let n = request.test_case.get();
        ExecutionOutcome::Completed(ExecutionFeedback {
            coverage: Coverage::new().with(format!("branch:{}", n % 10), (n % 7) as f64 / 6.0),
            ..ExecutionFeedback::default()
        })
    }));
    let site = SiteId::new("GET /x?y");

    let results: Vec<taintfit::Result<()>> = std::thread::scope(|scope| {
        let workers: Vec<_> = (0..WORKERS)
            .map(|_| {
                scope.spawn(|| -> taintfit::Result<()> {
                    for _ in 0..PER_WORKER {
                        let mut test_case = session.test_case().with_input(site.clone(), "v");
                        session.taint(&mut test_case, &site);
                        session.evaluate_and_archive(&mut test_case)?;
                    }
                    Ok(())
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });
    for result in results {
        result?;
    }

    let snapshot = session.snapshot();
    assert_eq!(snapshot.evaluations, WORKERS * PER_WORKER);
    assert_eq!(snapshot.targets.len(), 10);
    assert_eq!(session.allocator().allocated(), WORKERS * PER_WORKER);

    // Every target holds the best score any test case produced for it,
    // whichever worker got there first.
    for summary in &snapshot.targets {
        let branch: u64 = summary.target.id().trim_start_matches("branch:").parse()?;
        let best = (0..WORKERS * PER_WORKER)
            .filter(|n| n % 10 == branch)
            .map(|n| (n % 7) as f64 / 6.0)
            .fold(0.0, f64::max);
        assert_eq!(summary.contribution.score(), best);
    }
    Ok(())
}
