//! Interceptor lifecycle: enable, disable, double enable and concurrent toggling.

use super::test_utils::{current_label, labeled, subscribe_from_b, with_enter_counter};
use rx_context::context::in_span;
use rx_context::error::PropagationError;
use rx_context::propagation::{ContextPropagation, PropagationConfig, PropagationState};
use rx_context::rx::shape;
use rx_context::rx::{transform, AssemblyHooks, Single, Transform};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info_span;

fn counting_marker(count: Arc<AtomicUsize>) -> Transform<shape::Single> {
    transform(move |assembled| {
        count.fetch_add(1, Ordering::SeqCst);
        assembled
    })
}

#[test]
fn test_enable_then_disable_is_invisible() {
    let hooks = AssemblyHooks::shared();
    let assemblies = Arc::new(AtomicUsize::new(0));
    let marker = counting_marker(assemblies.clone());
    hooks.set::<shape::Single>(Some(marker.clone()));

    let propagation = ContextPropagation::bind(hooks.clone(), PropagationConfig::default()).unwrap();
    propagation.enable();
    propagation.disable();

    let current = hooks.get::<shape::Single>().unwrap();
    assert!(Arc::ptr_eq(&current, &marker));
    assert!(hooks.get::<shape::Optional>().is_none());
    assert!(hooks.get::<shape::Backpressured>().is_none());

    let single = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));
    assert_eq!(assemblies.load(Ordering::SeqCst), 1);
    let (during, after) = subscribe_from_b(move || single.blocking_get().unwrap());
    assert_eq!(during, Some("B"));
    assert_eq!(after, Some("B"));
}

#[test]
fn test_disable_before_enable_is_noop() {
    let hooks = AssemblyHooks::shared();
    let marker = counting_marker(Arc::new(AtomicUsize::new(0)));
    hooks.set::<shape::Single>(Some(marker.clone()));

    let propagation = ContextPropagation::bind(hooks.clone(), PropagationConfig::default()).unwrap();
    propagation.disable();
    propagation.disable();

    assert_eq!(propagation.state(), PropagationState::Disabled);
    assert!(Arc::ptr_eq(&hooks.get::<shape::Single>().unwrap(), &marker));
}

#[test]
fn test_double_enable_activates_context_once() {
    with_enter_counter(|counter| {
        let hooks = AssemblyHooks::shared();
        let propagation =
            ContextPropagation::bind(hooks.clone(), PropagationConfig::default()).unwrap();
        propagation.enable();
        propagation.enable();
        assert!(propagation.is_enabled());

        let span = info_span!("assembly");
        let single = in_span(span, || Single::just(&hooks, 1u8));
        let before = counter.enters("assembly");

        assert_eq!(single.blocking_get().unwrap(), 1);
        assert_eq!(counter.enters("assembly") - before, 1);

        assert_eq!(single.blocking_get().unwrap(), 1);
        assert_eq!(counter.enters("assembly") - before, 2);
    });
}

#[test]
fn test_reenable_after_disable_propagates_again() {
    let hooks = AssemblyHooks::shared();
    let propagation = ContextPropagation::bind(hooks.clone(), PropagationConfig::default()).unwrap();

    propagation.enable();
    propagation.disable();
    propagation.enable();

    let single = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));
    let (during, _) = subscribe_from_b(move || single.blocking_get().unwrap());
    assert_eq!(during, Some("A"));
}

#[test]
fn test_already_wrapped_computations_keep_their_context_after_disable() {
    let hooks = AssemblyHooks::shared();
    let propagation = ContextPropagation::install(hooks.clone(), PropagationConfig::default()).unwrap();
    let single = labeled("A").in_scope(|| Single::from_fn(&hooks, || Ok(current_label())));
    propagation.disable();

    let (during, _) = subscribe_from_b(move || single.blocking_get().unwrap());
    assert_eq!(during, Some("A"));
}

#[test]
fn test_concurrent_toggling_never_double_wraps() {
    with_enter_counter(|counter| {
        let hooks = AssemblyHooks::shared();
        let marker = counting_marker(Arc::new(AtomicUsize::new(0)));
        hooks.set::<shape::Single>(Some(marker.clone()));
        let propagation = Arc::new(
            ContextPropagation::bind(hooks.clone(), PropagationConfig::default()).unwrap(),
        );

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let propagation = propagation.clone();
                std::thread::spawn(move || {
                    for round in 0..200 {
                        if (i + round) % 2 == 0 {
                            propagation.enable();
                        } else {
                            propagation.disable();
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        propagation.disable();
        assert_eq!(propagation.state(), PropagationState::Disabled);
        assert!(Arc::ptr_eq(&hooks.get::<shape::Single>().unwrap(), &marker));
        assert_eq!(hooks.snapshot().installed().len(), 1);

        propagation.enable();
        let single = in_span(info_span!("toggled"), || Single::just(&hooks, ()));
        let before = counter.enters("toggled");
        single.blocking_get().unwrap();
        assert_eq!(counter.enters("toggled") - before, 1);
    });
}

#[test]
fn test_one_interceptor_per_registry() {
    let hooks = AssemblyHooks::shared();
    let first = ContextPropagation::install(hooks.clone(), PropagationConfig::default()).unwrap();
    assert!(matches!(
        ContextPropagation::install(hooks.clone(), PropagationConfig::default()),
        Err(PropagationError::AlreadyBound)
    ));

    // Independent registries are unaffected.
    let other = AssemblyHooks::shared();
    assert!(ContextPropagation::bind(other, PropagationConfig::default()).is_ok());

    first.teardown();
    assert!(hooks.snapshot().is_empty());
    assert!(ContextPropagation::bind(hooks, PropagationConfig::default()).is_ok());
}
