//! Context attachment for futures.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use super::Context;

/// Future that attaches a [`Context`] around every poll of the inner future.
///
/// The context is only attached while `poll` runs, so dropping the future between polls
/// (cancellation) never leaves it current.
#[must_use = "futures do nothing unless polled"]
pub struct WithContext<F> {
    inner: Pin<Box<F>>,
    context: Context,
}

impl<F> WithContext<F> {
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _guard = this.context.clone().attach();
        this.inner.as_mut().poll(cx)
    }
}

pub trait FutureExt: Future + Sized {
    /// Attach `context` whenever this future is polled.
    fn with_context(self, context: Context) -> WithContext<Self> {
        WithContext {
            inner: Box::pin(self),
            context,
        }
    }

    /// Attach the context current at the time of this call whenever this future is polled.
    fn with_current_context(self) -> WithContext<Self> {
        self.with_context(Context::current())
    }
}

impl<F: Future> FutureExt for F {}
