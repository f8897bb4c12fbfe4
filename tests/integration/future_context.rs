//! Context attachment for async code.

use super::test_utils::{current_label, labeled};
use rx_context::context::{Context, FutureExt};
use std::time::Duration;

#[tokio::test]
async fn test_with_context_attaches_across_polls() {
    let future = async {
        let first = current_label();
        tokio::task::yield_now().await;
        (first, current_label())
    }
    .with_context(labeled("A"));

    assert_eq!(future.await, (Some("A"), Some("A")));
    assert_eq!(current_label(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_spawned_future_keeps_context() {
    let handle = tokio::spawn(
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            current_label()
        }
        .with_context(labeled("A")),
    );

    assert_eq!(handle.await.unwrap(), Some("A"));
}

#[tokio::test]
async fn test_with_current_context_captures_at_call_time() {
    let future = labeled("A").in_scope(|| async { current_label() }.with_current_context());
    assert_eq!(future.context().get::<super::test_utils::Label>().map(|l| l.0), Some("A"));

    let _b = labeled("B").attach();
    assert_eq!(future.await, Some("A"));
    assert_eq!(current_label(), Some("B"));
}

#[tokio::test]
async fn test_cancelled_future_leaves_no_context_behind() {
    let slow = async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        current_label()
    }
    .with_context(labeled("A"));

    let outcome = tokio::time::timeout(Duration::from_millis(10), slow).await;
    assert!(outcome.is_err());
    assert_eq!(current_label(), None);
    assert!(Context::current().is_empty());
}
