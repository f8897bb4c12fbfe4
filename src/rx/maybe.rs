//! `Maybe`: zero or one value, or an error.

use std::marker::PhantomData;
use std::sync::{mpsc, Arc};

use tracing::debug;

use crate::error::{failure, Failure, SignalError};
use crate::rx::disposable::Disposable;
use crate::rx::hooks::AssemblyHooks;
use crate::rx::raw::{Assembled, RawSubscriber, TypedSource};
use crate::rx::scheduler::Scheduler;
use crate::rx::shape;

pub trait MaybeObserver<T>: Send + 'static {
    fn on_subscribe(&mut self, _disposable: Disposable) {}

    fn on_success(&mut self, value: T);

    fn on_complete(&mut self);

    fn on_error(&mut self, error: Failure);
}

pub struct MaybeEmitter<T> {
    observer: Box<dyn MaybeObserver<T>>,
    disposable: Disposable,
}

impl<T: 'static> MaybeEmitter<T> {
    pub fn on_success(mut self, value: T) {
        if self.disposable.is_disposed() {
            return;
        }
        self.observer.on_success(value);
        self.disposable.dispose();
    }

    pub fn on_complete(mut self) {
        if self.disposable.is_disposed() {
            return;
        }
        self.observer.on_complete();
        self.disposable.dispose();
    }

    pub fn on_error(mut self, error: Failure) {
        if self.disposable.is_disposed() {
            debug!(error = %error, "Dropping error for disposed maybe observer");
            return;
        }
        self.observer.on_error(error);
        self.disposable.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }
}

/// Deferred computation producing at most one value.
pub struct Maybe<T> {
    assembled: Assembled<shape::Optional>,
    hooks: Arc<AssemblyHooks>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Maybe<T> {
    fn clone(&self) -> Self {
        Self {
            assembled: self.assembled.clone(),
            hooks: self.hooks.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Send + 'static> Maybe<T> {
    pub fn from_subscribe<F>(hooks: &Arc<AssemblyHooks>, subscribe: F) -> Self
    where
        F: Fn(Box<dyn MaybeObserver<T>>) + Send + Sync + 'static,
    {
        let source = TypedSource::<dyn MaybeObserver<T>>::new(subscribe);
        let assembled = hooks.on_assembly(Assembled::new::<T>(Arc::new(source)));
        Self {
            assembled,
            hooks: hooks.clone(),
            _value: PhantomData,
        }
    }

    pub fn create<F>(hooks: &Arc<AssemblyHooks>, emit: F) -> Self
    where
        F: Fn(MaybeEmitter<T>) + Send + Sync + 'static,
    {
        Self::from_subscribe(hooks, move |mut observer| {
            let disposable = Disposable::new();
            observer.on_subscribe(disposable.clone());
            emit(MaybeEmitter {
                observer,
                disposable,
            });
        })
    }

    /// Run `f` on every subscription; `Ok(None)` completes empty.
    pub fn from_fn<F>(hooks: &Arc<AssemblyHooks>, f: F) -> Self
    where
        F: Fn() -> Result<Option<T>, Failure> + Send + Sync + 'static,
    {
        Self::create(hooks, move |emitter| match f() {
            Ok(Some(value)) => emitter.on_success(value),
            Ok(None) => emitter.on_complete(),
            Err(error) => emitter.on_error(error),
        })
    }

    pub fn just(hooks: &Arc<AssemblyHooks>, value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::create(hooks, move |emitter| emitter.on_success(value.clone()))
    }

    pub fn empty(hooks: &Arc<AssemblyHooks>) -> Self {
        Self::create(hooks, |emitter| emitter.on_complete())
    }

    pub fn error(hooks: &Arc<AssemblyHooks>, error: Failure) -> Self {
        Self::create(hooks, move |emitter| emitter.on_error(error.clone()))
    }

    pub fn map<U, F>(&self, f: F) -> Maybe<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f: Arc<dyn Fn(T) -> U + Send + Sync> = Arc::new(f);
        Maybe::from_subscribe(&self.hooks, move |downstream| {
            upstream.subscribe(MapObserver {
                downstream,
                f: f.clone(),
            });
        })
    }

    pub fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Self {
        let upstream = self.clone();
        Self::from_subscribe(&self.hooks, move |observer| {
            let upstream = upstream.clone();
            scheduler.schedule(Box::new(move || upstream.subscribe_boxed(observer)));
        })
    }

    pub fn subscribe(&self, observer: impl MaybeObserver<T>) {
        self.subscribe_boxed(Box::new(observer));
    }

    pub fn subscribe_with<S, C, E>(&self, on_success: S, on_complete: C, on_error: E)
    where
        S: FnOnce(T) + Send + 'static,
        C: FnOnce() + Send + 'static,
        E: FnOnce(Failure) + Send + 'static,
    {
        self.subscribe(CallbackObserver {
            on_success: Some(on_success),
            on_complete: Some(on_complete),
            on_error: Some(on_error),
        });
    }

    /// Subscribe and wait for the outcome; `Ok(None)` when the source completed empty.
    pub fn blocking_get(&self) -> Result<Option<T>, Failure> {
        let (tx, rx) = mpsc::channel();
        let complete_tx = tx.clone();
        let error_tx = tx.clone();
        self.subscribe_with(
            move |value| {
                let _ = tx.send(Ok(Some(value)));
            },
            move || {
                let _ = complete_tx.send(Ok(None));
            },
            move |error| {
                let _ = error_tx.send(Err(error));
            },
        );
        rx.recv().unwrap_or_else(|_| {
            Err(failure(SignalError::new(
                "maybe terminated without a signal",
            )))
        })
    }

    pub fn hooks(&self) -> &Arc<AssemblyHooks> {
        &self.hooks
    }

    fn subscribe_boxed(&self, observer: Box<dyn MaybeObserver<T>>) {
        self.assembled.subscribe_raw(RawSubscriber::new(observer));
    }
}

struct MapObserver<T, U> {
    downstream: Box<dyn MaybeObserver<U>>,
    f: Arc<dyn Fn(T) -> U + Send + Sync>,
}

impl<T: 'static, U: 'static> MaybeObserver<T> for MapObserver<T, U> {
    fn on_subscribe(&mut self, disposable: Disposable) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_success(&mut self, value: T) {
        self.downstream.on_success((self.f)(value));
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }

    fn on_error(&mut self, error: Failure) {
        self.downstream.on_error(error);
    }
}

struct CallbackObserver<S, C, E> {
    on_success: Option<S>,
    on_complete: Option<C>,
    on_error: Option<E>,
}

impl<T, S, C, E> MaybeObserver<T> for CallbackObserver<S, C, E>
where
    S: FnOnce(T) + Send + 'static,
    C: FnOnce() + Send + 'static,
    E: FnOnce(Failure) + Send + 'static,
{
    fn on_success(&mut self, value: T) {
        if let Some(on_success) = self.on_success.take() {
            on_success(value);
        }
    }

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
