//! `Completable`: completion or error, no value.

use std::sync::{mpsc, Arc};

use tracing::debug;

use crate::error::{failure, Failure, SignalError};
use crate::rx::disposable::Disposable;
use crate::rx::hooks::AssemblyHooks;
use crate::rx::raw::{Assembled, RawSubscriber, TypedSource};
use crate::rx::scheduler::Scheduler;
use crate::rx::shape;

pub trait CompletableObserver: Send + 'static {
    fn on_subscribe(&mut self, _disposable: Disposable) {}

    fn on_complete(&mut self);

    fn on_error(&mut self, error: Failure);
}

pub struct CompletableEmitter {
    observer: Box<dyn CompletableObserver>,
    disposable: Disposable,
}

impl CompletableEmitter {
    pub fn on_complete(mut self) {
        if self.disposable.is_disposed() {
            return;
        }
        self.observer.on_complete();
        self.disposable.dispose();
    }

    pub fn on_error(mut self, error: Failure) {
        if self.disposable.is_disposed() {
            debug!(error = %error, "Dropping error for disposed completable observer");
            return;
        }
        self.observer.on_error(error);
        self.disposable.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }
}

/// Deferred computation that only signals completion or failure.
#[derive(Clone)]
pub struct Completable {
    assembled: Assembled<shape::Action>,
    hooks: Arc<AssemblyHooks>,
}

impl Completable {
    pub fn from_subscribe<F>(hooks: &Arc<AssemblyHooks>, subscribe: F) -> Self
    where
        F: Fn(Box<dyn CompletableObserver>) + Send + Sync + 'static,
    {
        let source = TypedSource::<dyn CompletableObserver>::new(subscribe);
        let assembled = hooks.on_assembly(Assembled::new::<()>(Arc::new(source)));
        Self {
            assembled,
            hooks: hooks.clone(),
        }
    }

    pub fn create<F>(hooks: &Arc<AssemblyHooks>, emit: F) -> Self
    where
        F: Fn(CompletableEmitter) + Send + Sync + 'static,
    {
        Self::from_subscribe(hooks, move |mut observer| {
            let disposable = Disposable::new();
            observer.on_subscribe(disposable.clone());
            emit(CompletableEmitter {
                observer,
                disposable,
            });
        })
    }

    /// Run `f` on every subscription and signal its outcome.
    pub fn from_fn<F>(hooks: &Arc<AssemblyHooks>, f: F) -> Self
    where
        F: Fn() -> Result<(), Failure> + Send + Sync + 'static,
    {
        Self::create(hooks, move |emitter| match f() {
            Ok(()) => emitter.on_complete(),
            Err(error) => emitter.on_error(error),
        })
    }

    pub fn complete(hooks: &Arc<AssemblyHooks>) -> Self {
        Self::create(hooks, |emitter| emitter.on_complete())
    }

    pub fn error(hooks: &Arc<AssemblyHooks>, error: Failure) -> Self {
        Self::create(hooks, move |emitter| emitter.on_error(error.clone()))
    }

    pub fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Self {
        let upstream = self.clone();
        Self::from_subscribe(&self.hooks, move |observer| {
            let upstream = upstream.clone();
            scheduler.schedule(Box::new(move || upstream.subscribe_boxed(observer)));
        })
    }

    pub fn subscribe(&self, observer: impl CompletableObserver) {
        self.subscribe_boxed(Box::new(observer));
    }

    pub fn subscribe_with<C, E>(&self, on_complete: C, on_error: E)
    where
        C: FnOnce() + Send + 'static,
        E: FnOnce(Failure) + Send + 'static,
    {
        self.subscribe(CallbackObserver {
            on_complete: Some(on_complete),
            on_error: Some(on_error),
        });
    }

    /// Subscribe and wait for termination.
    pub fn blocking_await(&self) -> Result<(), Failure> {
        let (tx, rx) = mpsc::channel();
        let error_tx = tx.clone();
        self.subscribe_with(
            move || {
                let _ = tx.send(Ok(()));
            },
            move |error| {
                let _ = error_tx.send(Err(error));
            },
        );
        rx.recv().unwrap_or_else(|_| {
            Err(failure(SignalError::new(
                "completable terminated without a signal",
            )))
        })
    }

    pub fn hooks(&self) -> &Arc<AssemblyHooks> {
        &self.hooks
    }

    fn subscribe_boxed(&self, observer: Box<dyn CompletableObserver>) {
        self.assembled.subscribe_raw(RawSubscriber::new(observer));
    }
}

struct CallbackObserver<C, E> {
    on_complete: Option<C>,
    on_error: Option<E>,
}

impl<C, E> CompletableObserver for CallbackObserver<C, E>
where
    C: FnOnce() + Send + 'static,
    E: FnOnce(Failure) + Send + 'static,
{
    fn on_complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }

    fn on_error(&mut self, error: Failure) {
        if let Some(on_error) = self.on_error.take() {
            on_error(error);
        }
    }
}
