//! Property-based tests for nested context attachment

use proptest::prelude::*;
use rx_context::context::{Context, ContextGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Depth(u32);

fn current_depth() -> Option<u32> {
    Context::map_current(|ctx| ctx.get::<Depth>().map(|d| d.0))
}

/// Nested attachments always unwind back to the enclosing context
#[test]
fn test_nested_attach_restores_enclosing_context() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(any::<u32>(), 0..24), |values| {
            let mut guards: Vec<ContextGuard> = Vec::new();
            let mut expected: Vec<u32> = Vec::new();

            for value in &values {
                guards.push(Context::current_with_value(Depth(*value)).attach());
                expected.push(*value);
                prop_assert_eq!(current_depth(), expected.last().copied());
            }

            while let Some(guard) = guards.pop() {
                drop(guard);
                expected.pop();
                prop_assert_eq!(current_depth(), expected.last().copied());
            }

            prop_assert_eq!(current_depth(), None);
            Ok(())
        })
        .unwrap();
}

/// Attaching and detaching in arbitrary interleavings with scoped calls keeps the stack sound
#[test]
fn test_in_scope_nesting_matches_stack_discipline() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(any::<bool>(), 1..32), |ops| {
            fn descend(ops: &[bool], depth: u32) -> Result<(), TestCaseError> {
                let Some((&scoped, rest)) = ops.split_first() else {
                    return Ok(());
                };
                let before = current_depth();
                if scoped {
                    Context::current_with_value(Depth(depth)).in_scope(|| {
                        prop_assert_eq!(current_depth(), Some(depth));
                        descend(rest, depth + 1)
                    })?;
                } else {
                    let guard = Context::root().attach();
                    prop_assert_eq!(current_depth(), None);
                    descend(rest, depth + 1)?;
                    drop(guard);
                }
                prop_assert_eq!(current_depth(), before);
                Ok(())
            }

            descend(&ops, 0)
        })
        .unwrap();
}

/// Values of other types survive derivation untouched
#[test]
fn test_with_value_keeps_unrelated_entries() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<u32>(), any::<String>(), any::<u32>()), |(first, name, second)| {
            let base = Context::root().with_value(Depth(first)).with_value(name.clone());
            let derived = base.with_value(Depth(second));

            prop_assert_eq!(base.get::<Depth>(), Some(&Depth(first)));
            prop_assert_eq!(derived.get::<Depth>(), Some(&Depth(second)));
            prop_assert_eq!(derived.get::<String>(), Some(&name));
            Ok(())
        })
        .unwrap();
}
