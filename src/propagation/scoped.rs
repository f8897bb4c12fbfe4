//! Context-scoped subscription wrapper.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::trace;

use crate::context::Context;
use crate::rx::raw::{RawSource, RawSubscriber};
use crate::rx::shape::Shape;

/// Subscribes to `delegate` with the assembly-time context attached.
///
/// The subscriber is handed over untouched, so every signal (values, completion, errors,
/// `request`/`cancel`) flows exactly as the delegate produces it. The context covers only the
/// synchronous subscribe call; work the delegate hands off elsewhere is not covered.
pub struct ScopedSource<K: Shape> {
    context: Context,
    delegate: Arc<dyn RawSource>,
    _shape: PhantomData<fn() -> K>,
}

impl<K: Shape> ScopedSource<K> {
    pub fn new(context: Context, delegate: Arc<dyn RawSource>) -> Self {
        Self {
            context,
            delegate,
            _shape: PhantomData,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl<K: Shape> RawSource for ScopedSource<K> {
    fn subscribe_raw(&self, subscriber: RawSubscriber) {
        let _guard = self.context.clone().attach();
        trace!(shape = %K::KIND, "Subscribing under assembly context");
        self.delegate.subscribe_raw(subscriber);
    }
}

impl<K: Shape> fmt::Debug for ScopedSource<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedSource")
            .field("shape", &K::KIND)
            .field("context", &self.context)
            .finish()
    }
}
