//! Type-erased sources and subscribers.
//!
//! Hooks operate on every computation of a shape regardless of its value type, so they see
//! computations through [`Assembled`], which erases the value type but keeps the shape.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::error;

use crate::rx::shape::{Shape, ShapeKind};

/// A subscriber whose concrete observer type is hidden.
///
/// Decorators forward it verbatim; only the source it was built for can open it.
pub struct RawSubscriber {
    observer: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl RawSubscriber {
    pub(crate) fn new<O: Send + 'static>(observer: O) -> Self {
        Self {
            observer: Box::new(observer),
            type_name: std::any::type_name::<O>(),
        }
    }

    pub(crate) fn downcast<O: 'static>(self) -> Result<O, Self> {
        let type_name = self.type_name;
        self.observer
            .downcast::<O>()
            .map(|observer| *observer)
            .map_err(|observer| Self {
                observer,
                type_name,
            })
    }

    /// Type name of the wrapped observer.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for RawSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSubscriber")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Subscription logic of an assembled computation.
pub trait RawSource: Send + Sync {
    fn subscribe_raw(&self, subscriber: RawSubscriber);
}

/// Raw adapter over a typed subscribe function taking `Box<O>`.
pub(crate) struct TypedSource<O: ?Sized> {
    subscribe: Box<dyn Fn(Box<O>) + Send + Sync>,
}

impl<O: ?Sized + 'static> TypedSource<O> {
    pub(crate) fn new(subscribe: impl Fn(Box<O>) + Send + Sync + 'static) -> Self {
        Self {
            subscribe: Box::new(subscribe),
        }
    }
}

impl<O: ?Sized + 'static> RawSource for TypedSource<O> {
    fn subscribe_raw(&self, subscriber: RawSubscriber) {
        match subscriber.downcast::<Box<O>>() {
            Ok(observer) => (self.subscribe)(observer),
            Err(subscriber) => error!(
                expected = std::any::type_name::<Box<O>>(),
                actual = subscriber.type_name(),
                "Dropping subscriber forwarded to a source of another value type"
            ),
        }
    }
}

/// A computation of shape `K` as seen by assembly hooks.
pub struct Assembled<K: Shape> {
    source: Arc<dyn RawSource>,
    value_type: TypeId,
    value_type_name: &'static str,
    _shape: PhantomData<fn() -> K>,
}

impl<K: Shape> Assembled<K> {
    pub(crate) fn new<T: 'static>(source: Arc<dyn RawSource>) -> Self {
        Self {
            source,
            value_type: TypeId::of::<T>(),
            value_type_name: std::any::type_name::<T>(),
            _shape: PhantomData,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        K::KIND
    }

    pub fn value_type_name(&self) -> &'static str {
        self.value_type_name
    }

    pub(crate) fn value_type(&self) -> TypeId {
        self.value_type
    }

    /// Replace the subscription logic with a decorator around the current one.
    ///
    /// The value type is kept, so the typed computation rebuilt from the result still accepts
    /// the same observers.
    pub fn decorate<D, F>(self, decorator: F) -> Self
    where
        D: RawSource + 'static,
        F: FnOnce(Arc<dyn RawSource>) -> D,
    {
        Self {
            source: Arc::new(decorator(self.source)),
            value_type: self.value_type,
            value_type_name: self.value_type_name,
            _shape: PhantomData,
        }
    }

    pub fn subscribe_raw(&self, subscriber: RawSubscriber) {
        self.source.subscribe_raw(subscriber);
    }
}

impl<K: Shape> Clone for Assembled<K> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            value_type: self.value_type,
            value_type_name: self.value_type_name,
            _shape: PhantomData,
        }
    }
}

impl<K: Shape> fmt::Debug for Assembled<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembled")
            .field("kind", &K::KIND)
            .field("value_type", &self.value_type_name)
            .finish()
    }
}
