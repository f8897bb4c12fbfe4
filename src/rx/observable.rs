//! `Observable`: push-based stream of zero or more values without backpressure.

use std::marker::PhantomData;
use std::sync::{mpsc, Arc};

use tracing::debug;

use crate::error::{failure, Failure, SignalError};
use crate::rx::disposable::Disposable;
use crate::rx::hooks::AssemblyHooks;
use crate::rx::raw::{Assembled, RawSubscriber, TypedSource};
use crate::rx::scheduler::Scheduler;
use crate::rx::shape;

pub trait Observer<T>: Send + 'static {
    fn on_subscribe(&mut self, _disposable: Disposable) {}

    fn on_next(&mut self, value: T);

    fn on_complete(&mut self);

    fn on_error(&mut self, error: Failure);
}

/// Pushes values to an `Observable` observer until a terminal signal consumes it.
pub struct ObservableEmitter<T> {
    observer: Box<dyn Observer<T>>,
    disposable: Disposable,
}

impl<T: 'static> ObservableEmitter<T> {
    pub fn on_next(&mut self, value: T) {
        if !self.disposable.is_disposed() {
            self.observer.on_next(value);
        }
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
            debug!(error = %error, "Dropping error for disposed observer");
            return;
        }
        self.observer.on_error(error);
        self.disposable.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposable.is_disposed()
    }
}

/// Deferred push-based stream.
pub struct Observable<T> {
    assembled: Assembled<shape::EagerStream>,
    hooks: Arc<AssemblyHooks>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            assembled: self.assembled.clone(),
            hooks: self.hooks.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    pub fn from_subscribe<F>(hooks: &Arc<AssemblyHooks>, subscribe: F) -> Self
    where
        F: Fn(Box<dyn Observer<T>>) + Send + Sync + 'static,
    {
        let source = TypedSource::<dyn Observer<T>>::new(subscribe);
        let assembled = hooks.on_assembly(Assembled::new::<T>(Arc::new(source)));
        Self {
            assembled,
            hooks: hooks.clone(),
            _value: PhantomData,
        }
    }

    pub fn create<F>(hooks: &Arc<AssemblyHooks>, emit: F) -> Self
    where
        F: Fn(ObservableEmitter<T>) + Send + Sync + 'static,
    {
        Self::from_subscribe(hooks, move |mut observer| {
            let disposable = Disposable::new();
            observer.on_subscribe(disposable.clone());
            emit(ObservableEmitter {
                observer,
                disposable,
            });
        })
    }

    /// Emit every item of `items` on each subscription, then complete.
    pub fn from_iter<I>(hooks: &Arc<AssemblyHooks>, items: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Self::create(hooks, move |mut emitter| {
            for item in items.clone() {
                if emitter.is_disposed() {
                    return;
                }
                emitter.on_next(item);
            }
            emitter.on_complete();
        })
    }

    pub fn empty(hooks: &Arc<AssemblyHooks>) -> Self {
        Self::create(hooks, |emitter| emitter.on_complete())
    }

    pub fn error(hooks: &Arc<AssemblyHooks>, error: Failure) -> Self {
        Self::create(hooks, move |emitter| emitter.on_error(error.clone()))
    }

    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f: Arc<dyn Fn(T) -> U + Send + Sync> = Arc::new(f);
        Observable::from_subscribe(&self.hooks, move |downstream| {
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

    pub fn subscribe(&self, observer: impl Observer<T>) {
        self.subscribe_boxed(Box::new(observer));
    }

    pub fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_complete: C)
    where
        N: FnMut(T) + Send + 'static,
        E: FnOnce(Failure) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.subscribe(CallbackObserver {
            on_next,
            on_error: Some(on_error),
            on_complete: Some(on_complete),
        });
    }

    /// Subscribe and wait for termination, collecting every value.
    pub fn blocking_collect(&self) -> Result<Vec<T>, Failure> {
        let (tx, rx) = mpsc::channel();
        let error_tx = tx.clone();
        let complete_tx = tx.clone();
        self.subscribe_with(
            move |value| {
                let _ = tx.send(Signal::Next(value));
            },
            move |error| {
                let _ = error_tx.send(Signal::Error(error));
            },
            move || {
                let _ = complete_tx.send(Signal::Complete);
            },
        );
        collect_signals(rx)
    }

    pub fn hooks(&self) -> &Arc<AssemblyHooks> {
        &self.hooks
    }

    fn subscribe_boxed(&self, observer: Box<dyn Observer<T>>) {
        self.assembled.subscribe_raw(RawSubscriber::new(observer));
    }
}

pub(crate) enum Signal<T> {
    Next(T),
    Error(Failure),
    Complete,
}

pub(crate) fn collect_signals<T>(rx: mpsc::Receiver<Signal<T>>) -> Result<Vec<T>, Failure> {
    let mut values = Vec::new();
    loop {
        match rx.recv() {
            Ok(Signal::Next(value)) => values.push(value),
            Ok(Signal::Complete) => return Ok(values),
            Ok(Signal::Error(error)) => return Err(error),
            Err(_) => {
                return Err(failure(SignalError::new(
                    "stream terminated without a signal",
                )))
            }
        }
    }
}

struct MapObserver<T, U> {
    downstream: Box<dyn Observer<U>>,
    f: Arc<dyn Fn(T) -> U + Send + Sync>,
}

impl<T: 'static, U: 'static> Observer<T> for MapObserver<T, U> {
    fn on_subscribe(&mut self, disposable: Disposable) {
        self.downstream.on_subscribe(disposable);
    }

    fn on_next(&mut self, value: T) {
        self.downstream.on_next((self.f)(value));
    }

    fn on_complete(&mut self) {
        self.downstream.on_complete();
    }

    fn on_error(&mut self, error: Failure) {
        self.downstream.on_error(error);
    }
}

struct CallbackObserver<N, E, C> {
    on_next: N,
    on_error: Option<E>,
    on_complete: Option<C>,
}

impl<T, N, E, C> Observer<T> for CallbackObserver<N, E, C>
where
    N: FnMut(T) + Send + 'static,
    E: FnOnce(Failure) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    fn on_next(&mut self, value: T) {
        (self.on_next)(value);
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
