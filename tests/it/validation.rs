use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::BoxFuture;
use reactive_form::prelude::*;

type Gates = Arc<Mutex<VecDeque<oneshot::Receiver<Vec<String>>>>>;

/// An async validator whose runs resolve only when the test answers them, in call order.
fn gated_validator(
    policy: StaleResultPolicy,
) -> (
    FormValidator<FormField<String>>,
    Vec<oneshot::Sender<Vec<String>>>,
) {
    let gates: Gates = Arc::default();
    let mut senders = Vec::new();
    for _ in 0..2 {
        let (sender, receiver) = oneshot::channel();
        senders.push(sender);
        gates.lock().unwrap().push_back(receiver);
    }

    let field = FormField::new("alice".to_string());
    let options = FormValidatorOptions::new()
        .async_validator(move |_value: String| {
            let gate = gates.lock().unwrap().pop_front();
            async move {
                match gate {
                    Some(gate) => gate.await.unwrap_or_default(),
                    None => Vec::new(),
                }
            }
        })
        .stale_results(policy);
    (FormValidator::new(field, options), senders)
}

#[test]
fn discard_stale_ignores_superseded_results() {
    let (validator, mut senders) = gated_validator(StaleResultPolicy::DiscardStale);
    let field = validator.control().clone();

    let mut first = Box::pin(validator.validate());
    assert!(first.as_mut().now_or_never().is_none());
    let mut second = Box::pin(validator.validate());
    assert!(second.as_mut().now_or_never().is_none());
    assert!(field.is_validating());

    let older = senders.remove(0);
    let newer = senders.remove(0);
    newer.send(Vec::new()).unwrap();
    block_on(second).expect("newer run");
    assert!(!field.is_validating());

    older.send(vec!["name taken".into()]).unwrap();
    block_on(first).expect("older run");
    assert!(field.errors().is_empty());
    assert!(field.is_valid());
    assert!(!field.is_validating());
}

#[test]
fn overlapping_runs_let_the_last_result_win_by_default() {
    assert_eq!(StaleResultPolicy::default(), StaleResultPolicy::LastWriteWins);
    let (validator, mut senders) = gated_validator(StaleResultPolicy::default());
    let field = validator.control().clone();

    let mut first = Box::pin(validator.validate());
    assert!(first.as_mut().now_or_never().is_none());
    let mut second = Box::pin(validator.validate());
    assert!(second.as_mut().now_or_never().is_none());

    let older = senders.remove(0);
    let newer = senders.remove(0);
    newer.send(Vec::new()).unwrap();
    block_on(second).expect("newer run");

    older.send(vec!["name taken".into()]).unwrap();
    block_on(first).expect("older run");
    assert_eq!(field.errors(), vec!["name taken".to_string()]);
    assert!(!field.is_valid());
    assert!(!field.is_validating());
}

#[test]
fn debounce_skips_superseded_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let validator = FormValidator::new(
        FormField::new("alice".to_string()),
        FormValidatorOptions::new()
            .async_validator(move |_value: String| {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Vec::new() }
            })
            .debounce(Duration::from_millis(20)),
    );

    let (first, second) =
        block_on(async { futures::join!(validator.validate(), validator.validate()) });
    assert_eq!(first.expect("first run").0 + 1, second.expect("second run").0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!validator.control().is_validating());
}

#[test]
fn validating_a_group_marks_only_the_group() {
    let group = FieldGroup::builder()
        .field("password", FormField::new("secret".to_string()))
        .field("confirm", FormField::new("secret".to_string()))
        .build();
    let validator = FormValidator::new(
        group.clone(),
        FormValidatorOptions::new().validator(|value: &serde_json::Map<String, serde_json::Value>| {
            if value.get("password") == value.get("confirm") {
                Vec::new()
            } else {
                vec!["passwords differ".into()]
            }
        }),
    );

    group
        .field::<FormField<String>>("confirm")
        .expect("confirm")
        .set_value("other".into())
        .expect("set confirm");
    block_on(validator.validate()).expect("validate");

    assert_eq!(group.errors(), vec!["passwords differ".to_string()]);
    let confirm = group.field::<FormField<String>>("confirm").expect("confirm");
    assert!(confirm.is_valid());
    assert!(!group.is_valid());
}

#[test]
fn trigger_runs_closures_and_honors_removal() {
    let trigger = ValidationTrigger::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let counted = calls.clone();
    let kept = trigger.add_validator(move || -> BoxFuture<'static, FormResult<()>> {
        let counted = counted.clone();
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok::<(), FormError>(())
        }
        .boxed()
    });
    let counted = calls.clone();
    let removed = trigger.add_validator(move || -> BoxFuture<'static, FormResult<()>> {
        let counted = counted.clone();
        async move {
            counted.fetch_add(10, Ordering::SeqCst);
            Ok::<(), FormError>(())
        }
        .boxed()
    });
    assert_ne!(kept, removed);
    assert_eq!(trigger.len(), 2);

    assert!(trigger.remove_validator(removed));
    assert!(!trigger.remove_validator(removed));
    block_on(trigger.validate());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn trigger_reports_each_outcome() {
    let trigger = ValidationTrigger::new();
    let field = FormField::new(String::new());
    let ok = trigger.add_validator(FormValidator::new(
        field.clone(),
        FormValidatorOptions::new().validator(|value: &String| {
            if value.is_empty() {
                vec!["required".into()]
            } else {
                Vec::new()
            }
        }),
    ));
    let broken = trigger.add_validator(FormValidator::new(
        FormField::new(0_u32),
        FormValidatorOptions::new()
            .try_async_validator(|_value: u32| async { Err::<Vec<String>, _>("backend down") }),
    ));

    let outcomes = block_on(trigger.validate_settled());
    assert_eq!(outcomes.len(), 2);
    for (id, outcome) in outcomes {
        if id == ok {
            assert!(outcome.is_ok());
        } else {
            assert_eq!(id, broken);
            assert!(matches!(
                outcome,
                Err(FormError::ValidatorFailed(reason)) if reason == "backend down"
            ));
        }
    }
    assert_eq!(field.errors(), vec!["required".to_string()]);
}
