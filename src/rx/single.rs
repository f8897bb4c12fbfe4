//! `Single`: exactly one value or an error.

use std::marker::PhantomData;
use std::sync::{mpsc, Arc};

use tracing::debug;

use crate::error::{failure, Failure, SignalError};
use crate::rx::disposable::Disposable;
use crate::rx::hooks::AssemblyHooks;
use crate::rx::raw::{Assembled, RawSubscriber, TypedSource};
use crate::rx::scheduler::Scheduler;
use crate::rx::shape;

pub trait SingleObserver<T>: Send + 'static {
    fn on_subscribe(&mut self, _disposable: Disposable) {}

    fn on_success(&mut self, value: T);

    fn on_error(&mut self, error: Failure);
}

/// Signals one outcome to a `Single` observer. Terminal methods consume the emitter.
pub struct SingleEmitter<T> {
    observer: Box<dyn SingleObserver<T>>,
    disposable: Disposable,
}

impl<T: 'static> SingleEmitter<T> {
    pub fn on_success(mut self, value: T) {
        if self.disposable.is_disposed() {
            return;
        }
        self.observer.on_success(value);
        self.disposable.dispose();
    }

    pub fn on_error(mut self, error: Failure) {
        if self.disposable.is_disposed() {
            debug!(error = %error, "Dropping error for disposed single observer");
            return;
        }
        self.observer.on_error(error);
        self.disposable.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }
}

/// Deferred computation producing exactly one value.
pub struct Single<T> {
    assembled: Assembled<shape::Single>,
    hooks: Arc<AssemblyHooks>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Single<T> {
    fn clone(&self) -> Self {
        Self {
            assembled: self.assembled.clone(),
            hooks: self.hooks.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Send + 'static> Single<T> {
    /// Assemble a `Single` from raw subscription logic.
    pub fn from_subscribe<F>(hooks: &Arc<AssemblyHooks>, subscribe: F) -> Self
    where
        F: Fn(Box<dyn SingleObserver<T>>) + Send + Sync + 'static,
    {
        let source = TypedSource::<dyn SingleObserver<T>>::new(subscribe);
        let assembled = hooks.on_assembly(Assembled::new::<T>(Arc::new(source)));
        Self {
            assembled,
            hooks: hooks.clone(),
            _value: PhantomData,
        }
    }

    pub fn create<F>(hooks: &Arc<AssemblyHooks>, emit: F) -> Self
    where
        F: Fn(SingleEmitter<T>) + Send + Sync + 'static,
    {
        Self::from_subscribe(hooks, move |mut observer| {
            let disposable = Disposable::new();
            observer.on_subscribe(disposable.clone());
            emit(SingleEmitter {
                observer,
                disposable,
            });
        })
    }

    /// Run `f` on every subscription and emit its outcome.
    pub fn from_fn<F>(hooks: &Arc<AssemblyHooks>, f: F) -> Self
    where
        F: Fn() -> Result<T, Failure> + Send + Sync + 'static,
    {
        Self::create(hooks, move |emitter| match f() {
            Ok(value) => emitter.on_success(value),
            Err(error) => emitter.on_error(error),
        })
    }

    pub fn just(hooks: &Arc<AssemblyHooks>, value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::create(hooks, move |emitter| emitter.on_success(value.clone()))
    }

    pub fn error(hooks: &Arc<AssemblyHooks>, error: Failure) -> Self {
        Self::create(hooks, move |emitter| emitter.on_error(error.clone()))
    }

    pub fn map<U, F>(&self, f: F) -> Single<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f: Arc<dyn Fn(T) -> U + Send + Sync> = Arc::new(f);
        Single::from_subscribe(&self.hooks, move |downstream| {
            upstream.subscribe(MapObserver {
                downstream,
                f: f.clone(),
            });
        })
    }

    /// Move the subscription call onto `scheduler`.
    pub fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Self {
        let upstream = self.clone();
        Self::from_subscribe(&self.hooks, move |observer| {
            let upstream = upstream.clone();
            scheduler.schedule(Box::new(move || upstream.subscribe_boxed(observer)));
        })
    }

    pub fn subscribe(&self, observer: impl SingleObserver<T>) {
        self.subscribe_boxed(Box::new(observer));
    }

    pub fn subscribe_with<S, E>(&self, on_success: S, on_error: E)
    where
        S: FnOnce(T) + Send + 'static,
        E: FnOnce(Failure) + Send + 'static,
    {
        self.subscribe(CallbackObserver {
            on_success: Some(on_success),
            on_error: Some(on_error),
        });
    }

    /// Subscribe and wait for the outcome on the calling thread.
    pub fn blocking_get(&self) -> Result<T, Failure> {
        let (tx, rx) = mpsc::channel();
        let error_tx = tx.clone();
        self.subscribe_with(
            move |value| {
                let _ = tx.send(Ok(value));
            },
            move |error| {
                let _ = error_tx.send(Err(error));
            },
        );
        rx.recv().unwrap_or_else(|_| {
            Err(failure(SignalError::new(
                "single terminated without a signal",
            )))
        })
    }

    pub fn hooks(&self) -> &Arc<AssemblyHooks> {
        &self.hooks
    }

    fn subscribe_boxed(&self, observer: Box<dyn SingleObserver<T>>) {
        self.assembled.subscribe_raw(RawSubscriber::new(observer));
    }
}

struct MapObserver<T, U> {
    downstream: Box<dyn SingleObserver<U>>,
    f: Arc<dyn Fn(T) -> U + Send + Sync>,
}

impl<T: 'static, U: 'static> SingleObserver<T> for MapObserver<T, U> {
    fn on_subscribe(&mut self, disposable: Disposable) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_success(&mut self, value: T) {
        self.downstream.on_success((self.f)(value));
    }

    fn on_error(&mut self, error: Failure) {
        self.downstream.on_error(error);
    }
}

struct CallbackObserver<S, E> {
    on_success: Option<S>,
    on_error: Option<E>,
}

impl<T, S, E> SingleObserver<T> for CallbackObserver<S, E>
where
    S: FnOnce(T) + Send + 'static,
    E: FnOnce(Failure) + Send + 'static,
{
    fn on_success(&mut self, value: T) {
        if let Some(on_success) = self.on_success.take() {
            on_success(value);
        }
    }

    fn on_error(&mut self, error: Failure) {
        if let Some(on_error) = self.on_error.take() {
            on_error(error);
        }
    }
}
