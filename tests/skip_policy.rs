//! Tests for skip policies and listeners.

use chunkbeam::*;
use parking_lot::Mutex;

fn malformed() -> TransformError {
    TransformError::malformed("contactNo", "not a number")
}

fn invalid() -> TransformError {
    TransformError::validation("email", "invalid email format")
}

fn unexpected() -> TransformError {
    TransformError::unexpected("boom")
}

#[test]
fn default_policy_tolerates_only_malformed_fields() {
    let policy = default_policy();
    assert_eq!(policy.classify(&malformed(), 0), SkipDecision::Skip);
    assert_eq!(policy.classify(&malformed(), 1_000_000), SkipDecision::Skip);
    assert_eq!(policy.classify(&invalid(), 0), SkipDecision::Fail);
    assert_eq!(policy.classify(&unexpected(), 0), SkipDecision::Fail);
}

#[test]
fn allow_list_with_several_categories() {
    let policy = AllowListSkipPolicy::new([ErrorCategory::MalformedField, ErrorCategory::Validation]);
    assert!(policy.allows(ErrorCategory::Validation));
    assert_eq!(policy.classify(&invalid(), 3), SkipDecision::Skip);
    assert_eq!(policy.classify(&unexpected(), 0), SkipDecision::Fail);
}

#[test]
fn limit_escalates_once_ceiling_is_reached() {
    let policy = default_policy().with_limit(2);
    assert_eq!(policy.classify(&malformed(), 0), SkipDecision::Skip);
    assert_eq!(policy.classify(&malformed(), 1), SkipDecision::Skip);
    assert_eq!(policy.classify(&malformed(), 2), SkipDecision::Fail);
    // the ceiling never turns a fatal category into a skip
    assert_eq!(policy.classify(&invalid(), 0), SkipDecision::Fail);
}

#[test]
fn limit_of_zero_skips_nothing() {
    let policy = AlwaysSkip.with_limit(0);
    assert_eq!(policy.classify(&malformed(), 0), SkipDecision::Fail);
}

#[test]
fn classification_is_deterministic() {
    let policies: Vec<Box<dyn SkipPolicy>> = vec![
        Box::new(default_policy()),
        Box::new(default_policy().with_limit(5)),
        Box::new(NeverSkip),
        Box::new(AlwaysSkip),
    ];
    for policy in &policies {
        for error in [malformed(), invalid(), unexpected()] {
            for count in [0, 4, 5, 6, 100] {
                let first = policy.classify(&error, count);
                for _ in 0..3 {
                    assert_eq!(policy.classify(&error, count), first);
                }
            }
        }
    }
}

#[test]
fn decide_keeps_the_error() {
    let outcome = NeverSkip.decide(invalid(), 0);
    assert_eq!(outcome.decision, SkipDecision::Fail);
    assert_eq!(outcome.error, invalid());
}

#[test]
fn closures_are_policies() {
    let only_dob = |e: &TransformError, _count: u64| {
        if e.field.as_deref() == Some("dob") {
            SkipDecision::Skip
        } else {
            SkipDecision::Fail
        }
    };
    assert_eq!(
        only_dob.classify(&TransformError::malformed("dob", "bad date"), 0),
        SkipDecision::Skip
    );
    assert_eq!(only_dob.classify(&malformed(), 0), SkipDecision::Fail);
}

#[derive(Default)]
struct Recording {
    seen: Mutex<Vec<(String, i64, ErrorCategory)>>,
}

impl SkipListener<Customer> for Recording {
    fn on_skip(&self, partition: &str, item: &Customer, error: &TransformError) {
        self.seen.lock().push((partition.to_string(), item.id, error.category));
    }
}

#[test]
fn listeners_receive_skipped_records() {
    let listener = Recording::default();
    let c = chunkbeam::testing::customer(9);
    listener.on_skip("partition1", &c, &malformed());
    LoggingSkipListener.on_skip("partition1", &c, &malformed());
    assert_eq!(
        listener.seen.lock().clone(),
        vec![("partition1".to_string(), 9, ErrorCategory::MalformedField)]
    );
}

#[test]
fn transform_error_display() {
    assert_eq!(
        malformed().to_string(),
        "malformed_field error in `contactNo`: not a number"
    );
    assert_eq!(unexpected().to_string(), "unexpected error: boom");
}
