/*!

# Running Workers Concurrently

A [`Session`][crate::Session] is shared by reference. The archive serializes
its updates internally, the taint allocator hands out identities with one
atomic increment, and the evaluator's unreachable counter is atomic too. Each
[`TestCase`][crate::TestCase] and its taint tracker belong to the one worker
evaluating it.

```
# fn foo() -> taintfit::Result<()> {
use taintfit::{from_fn, Coverage, ExecutionFeedback, ExecutionOutcome, Session};

let session = Session::new(from_fn(|request| {
    ExecutionOutcome::Completed(ExecutionFeedback {
        coverage: Coverage::new().with(format!("line:{}", request.test_case.get() % 4), 1.0),
        ..ExecutionFeedback::default()
    })
}));

let results: Vec<taintfit::Result<()>> = std::thread::scope(|scope| {
    let workers: Vec<_> = (0..4)
        .map(|_| {
            scope.spawn(|| -> taintfit::Result<()> {
                for _ in 0..8 {
                    let mut test_case = session.test_case();
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

assert_eq!(session.archive().evaluations(), 32);
assert_eq!(session.archive().len(), 4);
# Ok(())
# }
# foo().unwrap();
```

If a worker hits [`ErrorKind::TargetDown`][crate::ErrorKind::TargetDown], every
worker is talking to the same dead target: stop the run rather than retrying.

 */
