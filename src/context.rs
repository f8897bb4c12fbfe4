//! Ambient Context
//!
//! Thread-local "current context" with immutable snapshots and scoped activation. A [`Context`]
//! is the capsule captured when a computation is assembled; [`Context::attach`] makes it current
//! for the calling thread until the returned guard is dropped.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::span::EnteredSpan;
use tracing::Span;

mod future;

pub use future::{FutureExt, WithContext};

thread_local! {
    static CURRENT: RefCell<Context> = RefCell::new(Context::default());
}

type Entries = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Immutable snapshot of ambient execution state.
///
/// Values are keyed by their type. Cloning is cheap; every `with_*` call returns a new context
/// and leaves the receiver untouched.
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<Entries>,
    span: Option<Span>,
}

impl Context {
    /// The empty root context.
    pub fn root() -> Self {
        Self::default()
    }

    /// Snapshot of the calling thread's current context.
    ///
    /// Returns the root context when nothing is attached, including during thread teardown.
    pub fn current() -> Self {
        CURRENT
            .try_with(|current| current.borrow().clone())
            .unwrap_or_default()
    }

    /// The current context extended with `value`.
    pub fn current_with_value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::current().with_value(value)
    }

    /// Run `f` against the current context, or the root context during thread teardown.
    pub fn map_current<R>(f: impl FnOnce(&Context) -> R) -> R {
        f(&Self::current())
    }

    /// A copy of this context with `value` stored under its type, replacing any previous value
    /// of the same type.
    pub fn with_value<T: Send + Sync + 'static>(&self, value: T) -> Self {
        let mut entries = Entries::clone(&self.entries);
        entries.insert(TypeId::of::<T>(), Arc::new(value));
        Self {
            entries: Arc::new(entries),
            span: self.span.clone(),
        }
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    /// A copy of this context carrying `span`. The span is entered whenever the context is
    /// attached.
    pub fn with_span(&self, span: Span) -> Self {
        Self {
            entries: self.entries.clone(),
            span: Some(span),
        }
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    /// True if the context carries a span that is enabled for the active subscriber.
    pub fn has_active_span(&self) -> bool {
        self.span.as_ref().is_some_and(|span| !span.is_disabled())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.span.is_none()
    }

    /// Make this context current for the calling thread.
    ///
    /// The previous context is restored exactly once when the guard drops, whether the scope
    /// ends normally or by unwinding. Guards must be dropped in reverse order of creation.
    #[must_use = "the context is detached as soon as the guard is dropped"]
    pub fn attach(self) -> ContextGuard {
        let entered = self.span.clone().map(Span::entered);
        let previous = CURRENT.with(|current| current.replace(self));
        ContextGuard {
            previous: Some(previous),
            entered,
            _not_send: PhantomData,
        }
    }

    /// Run `f` with this context attached.
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.clone().attach();
        f()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .field(
                "span",
                &self
                    .span
                    .as_ref()
                    .and_then(|span| span.metadata())
                    .map(|meta| meta.name()),
            )
            .finish()
    }
}

/// Restores the previously current context on drop.
pub struct ContextGuard {
    previous: Option<Context>,
    entered: Option<EnteredSpan>,
    // Restoration touches the attaching thread's slot; the guard must stay there.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        drop(self.entered.take());
        if let Some(previous) = self.previous.take() {
            let _ = CURRENT.try_with(|current| {
                current.replace(previous);
            });
        }
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard")
            .field("span_entered", &self.entered.is_some())
            .finish()
    }
}

/// Run `f` in a context derived from the current one that carries `span`.
pub fn in_span<R>(span: Span, f: impl FnOnce() -> R) -> R {
    Context::current().with_span(span).in_scope(f)
}
