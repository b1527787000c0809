/*!

# Taint Feedback

To learn what an input must look like, the engine sends a marker instead of a
value and asks the target how the marker was used.

1. [`Session::taint`][crate::Session::taint] replaces one input of a test case
   with a fresh [`TaintValue`][crate::TaintValue], a string such as
   `_TF0badf00d_17_` that cannot occur by accident.

2. The instrumented target reports a
   [`TaintObservation`][crate::TaintObservation] for every marker it sees: it
   was compared with a literal, it failed to parse as some
   [`FormatTag`][crate::FormatTag], or it went unused. Markers are found even
   when embedded in a larger string, such as a JSON body.

3. [`Session::absorb`][crate::Session::absorb] turns those observations into
   [`InputUpdateProposal`s][crate::InputUpdateProposal]. A literal the target
   compared against is an exact proposal and ranks above a value synthesized
   for a format.

4. The outer loop applies a proposal with
   [`TestCase::apply`][crate::TestCase::apply], which also stops tainting that
   input.

A site whose marker goes unused for
[`unused_taint_threshold`][crate::Config::unused_taint_threshold] executions
in a row, and which never produced a proposal, is abandoned and gets its
original value back.

```
# fn foo() -> taintfit::Result<()> {
use taintfit::{
    from_fn, ExecutionFeedback, ExecutionOutcome, ProposalBasis, Session, SiteId,
    TaintObservation,
};

let code = SiteId::new("POST /coupons#code");
let site = code.clone();

// The target compares the coupon code against "ABC123".
let executor = from_fn(move |request| {
    let value = request.input(&site).unwrap_or_default();
    ExecutionOutcome::Completed(ExecutionFeedback {
        observations: vec![TaintObservation::compared_with(value, "ABC123")],
        ..ExecutionFeedback::default()
    })
});
let session = Session::new(executor);

let mut test_case = session.test_case().with_input(code.clone(), "placeholder");
session.taint(&mut test_case, &code);
session.evaluate_and_archive(&mut test_case)?;

let proposals = session.propose_input_updates(&test_case);
assert_eq!(proposals[0].value, "ABC123");
assert_eq!(proposals[0].basis, ProposalBasis::Literal);
# Ok(())
# }
# foo().unwrap();
```

 */
