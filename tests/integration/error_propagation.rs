//! Errors and panics pass through the wrapper untouched.

use super::test_utils::{current_label, enabled_propagation, labeled, subscribe_from_b};
use parking_lot::Mutex;
use rx_context::error::{failure, Failure, SignalError};
use rx_context::rx::{Completable, Flowable, Maybe, Observable, Single};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type Received = Arc<Mutex<Option<(Failure, Option<&'static str>)>>>;

fn record(received: &Received) -> impl FnOnce(Failure) + Send + 'static {
    let received = received.clone();
    move |error| *received.lock() = Some((error, current_label()))
}

fn assert_same_error(received: &Received, expected: &Failure) {
    let (error, _) = received.lock().clone().expect("no error delivered");
    assert!(Arc::ptr_eq(&error, expected));
    assert_eq!(error.to_string(), "boom");
}

#[test]
fn test_single_error_instance_is_preserved() {
    let (hooks, _propagation) = enabled_propagation();
    let error = failure(SignalError::new("boom"));
    let single = labeled("A").in_scope(|| Single::<u32>::error(&hooks, error.clone()));

    let received: Received = Arc::default();
    let on_error = record(&received);
    let (_, after) = subscribe_from_b(move || {
        single.subscribe_with(|_| panic!("unexpected success"), on_error);
        None
    });

    assert_same_error(&received, &error);
    assert_eq!(after, Some("B"));
}

#[test]
fn test_every_shape_delivers_the_same_error() {
    let (hooks, _propagation) = enabled_propagation();
    let error = failure(SignalError::new("boom"));
    let (maybe, completable, observable, flowable) = labeled("A").in_scope(|| {
        (
            Maybe::<u32>::error(&hooks, error.clone()),
            Completable::error(&hooks, error.clone()),
            Observable::<u32>::error(&hooks, error.clone()),
            Flowable::<u32>::error(&hooks, error.clone()),
        )
    });

    let _b = labeled("B").attach();
    let from_maybe = maybe.blocking_get().unwrap_err();
    let from_completable = completable.blocking_await().unwrap_err();
    let from_observable = observable.blocking_collect().unwrap_err();
    let from_flowable = flowable.blocking_collect().unwrap_err();
    for received in [from_maybe, from_completable, from_observable, from_flowable] {
        assert!(Arc::ptr_eq(&received, &error));
    }
    assert_eq!(current_label(), Some("B"));
}

#[test]
fn test_error_signalled_later_reaches_subscriber_outside_the_scope() {
    let (hooks, _propagation) = enabled_propagation();
    let error = failure(SignalError::new("boom"));
    let pending = Arc::new(Mutex::new(None));
    let stash = pending.clone();
    let single = labeled("A").in_scope(|| {
        Single::<u32>::create(&hooks, move |emitter| {
            *stash.lock() = Some(emitter);
        })
    });

    let received: Received = Arc::default();
    let _b = labeled("B").attach();
    single.subscribe_with(|_| panic!("unexpected success"), record(&received));
    assert!(received.lock().is_none());

    let emitter = pending.lock().take().expect("subscription ran");
    emitter.on_error(error.clone());

    assert_same_error(&received, &error);
    let (_, observed_in) = received.lock().clone().unwrap();
    assert_eq!(observed_in, Some("B"));
}

#[test]
fn test_panicking_source_restores_subscriber_context() {
    let (hooks, _propagation) = enabled_propagation();
    let single = labeled("A").in_scope(|| {
        Single::<u32>::from_subscribe(&hooks, |_observer| {
            assert_eq!(current_label(), Some("A"));
            panic!("source failed while subscribing");
        })
    });

    let _b = labeled("B").attach();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        single.subscribe_with(|_| {}, |_| {});
    }));
    assert!(outcome.is_err());
    assert_eq!(current_label(), Some("B"));

    // The registry and the computation stay usable after the panic.
    let again = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));
    assert_eq!(again.blocking_get().unwrap(), Some("A"));
    assert_eq!(current_label(), Some("B"));
}
