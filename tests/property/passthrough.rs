//! Property-based tests: the interceptor never alters signals

use parking_lot::Mutex;
use proptest::prelude::*;
use rx_context::context::Context;
use rx_context::error::Failure;
use rx_context::propagation::{ContextPropagation, PropagationConfig};
use rx_context::rx::{AssemblyHooks, Flowable, Observable, Single, Subscriber, Subscription};
use std::sync::Arc;

struct Collect {
    subscription: Arc<Mutex<Option<Arc<dyn Subscription>>>>,
    values: Arc<Mutex<Vec<i64>>>,
}

impl Subscriber<i64> for Collect {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        *self.subscription.lock() = Some(subscription);
    }

    fn on_next(&mut self, value: i64) {
        self.values.lock().push(value);
    }

    fn on_complete(&mut self) {}

    fn on_error(&mut self, _error: Failure) {}
}

/// Values pass through every wrapped shape unchanged and in order
#[test]
fn test_values_pass_through_unchanged() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(prop::collection::vec(any::<i64>(), 0..64), any::<u8>()), |(items, tag)| {
            let hooks = AssemblyHooks::shared();
            let _propagation =
                ContextPropagation::install(hooks.clone(), PropagationConfig::default()).unwrap();

            let (observable, flowable, single) = Context::root().with_value(tag).in_scope(|| {
                (
                    Observable::from_iter(&hooks, items.clone()),
                    Flowable::from_iter(&hooks, items.clone()),
                    Single::just(&hooks, items.len()),
                )
            });

            prop_assert_eq!(observable.blocking_collect().unwrap(), items.clone());
            prop_assert_eq!(flowable.blocking_collect().unwrap(), items.clone());
            prop_assert_eq!(single.blocking_get().unwrap(), items.len());
            Ok(())
        })
        .unwrap();
}

/// Delivered items never exceed accumulated demand
#[test]
fn test_demand_bounds_delivery() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::vec(any::<i64>(), 0..40),
                prop::collection::vec(1u64..8, 0..12),
            ),
            |(items, requests)| {
                let hooks = AssemblyHooks::shared();
                let _propagation =
                    ContextPropagation::install(hooks.clone(), PropagationConfig::default())
                        .unwrap();
                let flowable = Context::root()
                    .with_value(0u8)
                    .in_scope(|| Flowable::from_iter(&hooks, items.clone()));

                let subscription = Arc::new(Mutex::new(None));
                let values = Arc::new(Mutex::new(Vec::new()));
                flowable.subscribe(Collect {
                    subscription: subscription.clone(),
                    values: values.clone(),
                });
                let handle = subscription.lock().clone().expect("subscribed");

                let mut demand = 0u64;
                for n in requests {
                    handle.request(n);
                    demand += n;
                    let delivered = values.lock().len() as u64;
                    prop_assert_eq!(delivered, demand.min(items.len() as u64));
                }
                let delivered = values.lock().clone();
                prop_assert_eq!(&delivered[..], &items[..delivered.len()]);
                Ok(())
            },
        )
        .unwrap();
}
