//! Every shape subscribes under the context it was assembled in.

use super::test_utils::{current_label, enabled_propagation, labeled, subscribe_from_b};
use parking_lot::Mutex;
use rx_context::rx::scheduler::{self, NewThread};
use rx_context::rx::{
    AssemblyHooks, Completable, Flowable, Maybe, Observable, Single, Subscription,
};
use std::sync::Arc;

struct NoDemand;

impl Subscription for NoDemand {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}

#[test]
fn test_single_observes_assembly_context() {
    let (hooks, _propagation) = enabled_propagation();
    let single = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));

    let (during, after) = subscribe_from_b(move || single.blocking_get().unwrap());
    assert_eq!(during, Some("A"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_maybe_observes_assembly_context() {
    let (hooks, _propagation) = enabled_propagation();
    let maybe = labeled("A").in_scope(|| Maybe::from_fn(&hooks, || Ok(Some(current_label()))));

    let (during, after) = subscribe_from_b(move || maybe.blocking_get().unwrap().flatten());
    assert_eq!(during, Some("A"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_completable_observes_assembly_context() {
    let (hooks, _propagation) = enabled_propagation();
    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    let completable = labeled("A").in_scope(|| {
        Completable::from_fn(&hooks, move || {
            *slot.lock() = current_label();
            Ok(())
        })
    });

    let (during, after) = subscribe_from_b(move || {
        completable.blocking_await().unwrap();
        seen.lock().take()
    });
    assert_eq!(during, Some("A"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_observable_observes_assembly_context() {
    let (hooks, _propagation) = enabled_propagation();
    let observable = labeled("A").in_scope(|| {
        Observable::create(&hooks, |mut emitter| {
            emitter.on_next(current_label());
            emitter.on_next(current_label());
            emitter.on_complete();
        })
    });

    let (during, after) = subscribe_from_b(move || {
        let values = observable.blocking_collect().unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| *v == values[0]));
        values[0]
    });
    assert_eq!(during, Some("A"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_flowable_observes_assembly_context() {
    let (hooks, _propagation) = enabled_propagation();
    let flowable = labeled("A").in_scope(|| {
        Flowable::from_subscribe(&hooks, |mut subscriber| {
            subscriber.on_subscribe(Arc::new(NoDemand));
            subscriber.on_next(current_label());
            subscriber.on_complete();
        })
    });

    let (during, after) = subscribe_from_b(move || flowable.blocking_collect().unwrap()[0]);
    assert_eq!(during, Some("A"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_without_interceptor_subscription_sees_subscriber_context() {
    let hooks = AssemblyHooks::shared();
    let single = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));

    let (during, after) = subscribe_from_b(move || single.blocking_get().unwrap());
    assert_eq!(during, Some("B"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_subscribe_on_new_thread_carries_context() {
    let (hooks, _propagation) = enabled_propagation();
    let scheduler = Arc::new(NewThread::new("shape-test"));
    let single = labeled("A").in_scope(|| {
        Single::from_fn(&hooks, || {
            let thread = std::thread::current();
            assert!(thread.name().unwrap_or_default().starts_with("shape-test-"));
            Ok(current_label())
        })
        .subscribe_on(scheduler)
    });

    let _b = labeled("B").attach();
    assert_eq!(single.blocking_get().unwrap(), Some("A"));
    assert_eq!(current_label(), Some("B"));
}

#[test]
fn test_innermost_assembly_scope_wins_during_signals() {
    let (hooks, _propagation) = enabled_propagation();
    let upstream = labeled("upstream").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));
    let mapped = labeled("operator").in_scope(|| {
        upstream
            .map(|inner| (inner, current_label()))
            .subscribe_on(scheduler::new_thread())
    });

    let (inner, outer) = mapped.blocking_get().unwrap();
    assert_eq!(inner, Some("upstream"));
    // The map function runs in the signal path, which stays inside the upstream scope here.
    assert_eq!(outer, Some("upstream"));
    assert_eq!(current_label(), None);
}

#[test]
fn test_resubscription_reuses_captured_context() {
    let (hooks, _propagation) = enabled_propagation();
    let single = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));

    for _ in 0..3 {
        let single = single.clone();
        let (during, after) = subscribe_from_b(move || single.blocking_get().unwrap());
        assert_eq!(during, Some("A"));
        assert_eq!(after, Some("B"));
    }
}
