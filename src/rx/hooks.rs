//! Assembly hook registry.
//!
//! Every computation passes through [`AssemblyHooks::on_assembly`] when it is built. Each shape
//! has one slot holding an optional [`Transform`]; instrumentation layers chain themselves by
//! composing with whatever the slot held before.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::rx::raw::Assembled;
use crate::rx::shape::{self, Shape, ShapeKind};

/// Shape-preserving assembly transformation.
pub type Transform<K> = Arc<dyn Fn(Assembled<K>) -> Assembled<K> + Send + Sync>;

/// Build a [`Transform`] from a closure.
pub fn transform<K, F>(f: F) -> Transform<K>
where
    K: Shape,
    F: Fn(Assembled<K>) -> Assembled<K> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// `before` then `after`. With no `before`, `after` alone.
pub fn compose<K: Shape>(before: Option<Transform<K>>, after: Transform<K>) -> Transform<K> {
    match before {
        None => after,
        Some(before) => Arc::new(move |assembled| after(before(assembled))),
    }
}

/// One optional hook per shape.
#[derive(Clone, Default)]
pub struct HookSet {
    pub(crate) action: Option<Transform<shape::Action>>,
    pub(crate) optional: Option<Transform<shape::Optional>>,
    pub(crate) single: Option<Transform<shape::Single>>,
    pub(crate) eager_stream: Option<Transform<shape::EagerStream>>,
    pub(crate) backpressured: Option<Transform<shape::Backpressured>>,
}

impl HookSet {
    pub fn get<K: Shape>(&self) -> Option<&Transform<K>> {
        K::slot(self).as_ref()
    }

    /// Install `hook` for `K`, returning the hook it replaces.
    pub fn set<K: Shape>(&mut self, hook: Option<Transform<K>>) -> Option<Transform<K>> {
        std::mem::replace(K::slot_mut(self), hook)
    }

    /// Shapes that currently have a hook.
    pub fn installed(&self) -> Vec<ShapeKind> {
        let mut kinds = Vec::new();
        push_if_installed::<shape::Action>(self, &mut kinds);
        push_if_installed::<shape::Optional>(self, &mut kinds);
        push_if_installed::<shape::Single>(self, &mut kinds);
        push_if_installed::<shape::EagerStream>(self, &mut kinds);
        push_if_installed::<shape::Backpressured>(self, &mut kinds);
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.installed().is_empty()
    }

    /// Shapes whose slot holds a different hook (by identity) than in `other`.
    pub fn differing(&self, other: &HookSet) -> Vec<ShapeKind> {
        let mut kinds = Vec::new();
        push_if_differs::<shape::Action>(self, other, &mut kinds);
        push_if_differs::<shape::Optional>(self, other, &mut kinds);
        push_if_differs::<shape::Single>(self, other, &mut kinds);
        push_if_differs::<shape::EagerStream>(self, other, &mut kinds);
        push_if_differs::<shape::Backpressured>(self, other, &mut kinds);
        kinds
    }
}

fn push_if_installed<K: Shape>(set: &HookSet, kinds: &mut Vec<ShapeKind>) {
    if set.get::<K>().is_some() {
        kinds.push(K::KIND);
    }
}

fn push_if_differs<K: Shape>(a: &HookSet, b: &HookSet, kinds: &mut Vec<ShapeKind>) {
    let same = match (a.get::<K>(), b.get::<K>()) {
        (Some(x), Some(y)) => Arc::ptr_eq(x, y),
        (None, None) => true,
        _ => false,
    };
    if !same {
        kinds.push(K::KIND);
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookSet")
            .field("installed", &self.installed())
            .finish()
    }
}

/// Registry of assembly hooks shared by every computation built against it.
///
/// Tests and applications create their own registry and pass it to the code that assembles
/// computations; nothing here is process-global.
#[derive(Default)]
pub struct AssemblyHooks {
    hooks: RwLock<HookSet>,
    interceptor_bound: AtomicBool,
}

impl AssemblyHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get<K: Shape>(&self) -> Option<Transform<K>> {
        self.hooks.read().get::<K>().cloned()
    }

    pub fn set<K: Shape>(&self, hook: Option<Transform<K>>) {
        let previous = self.hooks.write().set::<K>(hook);
        debug!(
            shape = %K::KIND,
            replaced = previous.is_some(),
            "Assembly hook updated"
        );
    }

    pub fn snapshot(&self) -> HookSet {
        self.hooks.read().clone()
    }

    /// Run `f` with exclusive access to every slot. Assemblies on other threads observe either
    /// the set before `f` or the set after it, never a mix.
    pub fn transact<R>(&self, f: impl FnOnce(&mut HookSet) -> R) -> R {
        let mut hooks = self.hooks.write();
        f(&mut hooks)
    }

    /// Remove every hook.
    pub fn reset(&self) {
        *self.hooks.write() = HookSet::default();
    }

    /// Pass a freshly assembled computation through the hook for its shape.
    ///
    /// A hook that returns a computation of a different value type is ignored.
    pub fn on_assembly<K: Shape>(&self, assembled: Assembled<K>) -> Assembled<K> {
        let Some(hook) = self.get::<K>() else {
            return assembled;
        };
        let value_type = assembled.value_type();
        let original = assembled.clone();
        let hooked = hook(assembled);
        if hooked.value_type() != value_type {
            error!(
                shape = %K::KIND,
                expected = original.value_type_name(),
                actual = hooked.value_type_name(),
                "Assembly hook changed the value type; keeping the unhooked computation"
            );
            return original;
        }
        hooked
    }

    pub(crate) fn claim_interceptor(&self) -> bool {
        self.interceptor_bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn release_interceptor(&self) {
        self.interceptor_bound.store(false, Ordering::Release);
    }
}

impl fmt::Debug for AssemblyHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyHooks")
            .field("hooks", &*self.hooks.read())
            .field(
                "interceptor_bound",
                &self.interceptor_bound.load(Ordering::Acquire),
            )
            .finish()
    }
}
