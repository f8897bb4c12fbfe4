//! `Flowable`: pull-based stream of zero or more values with backpressure.
//!
//! Subscribers receive a [`Subscription`] and must `request` items before any are delivered.

use std::iter::Peekable;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use parking_lot::Mutex;

use crate::error::{failure, Failure, SignalError};
use crate::rx::hooks::AssemblyHooks;
use crate::rx::observable::{collect_signals, Signal};
use crate::rx::raw::{Assembled, RawSubscriber, TypedSource};
use crate::rx::scheduler::Scheduler;
use crate::rx::shape;

/// Demand channel from a subscriber back to its source.
pub trait Subscription: Send + Sync {
    /// Allow `n` more items. Demand accumulates and saturates at `u64::MAX` (unbounded).
    fn request(&self, n: u64);

    fn cancel(&self);
}

pub trait Subscriber<T>: Send + 'static {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>);

    fn on_next(&mut self, value: T);

    fn on_complete(&mut self);

    fn on_error(&mut self, error: Failure);
}

/// Deferred backpressured stream.
pub struct Flowable<T> {
    assembled: Assembled<shape::Backpressured>,
    hooks: Arc<AssemblyHooks>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Flowable<T> {
    fn clone(&self) -> Self {
        Self {
            assembled: self.assembled.clone(),
            hooks: self.hooks.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Send + 'static> Flowable<T> {
    pub fn from_subscribe<F>(hooks: &Arc<AssemblyHooks>, subscribe: F) -> Self
    where
        F: Fn(Box<dyn Subscriber<T>>) + Send + Sync + 'static,
    {
        let source = TypedSource::<dyn Subscriber<T>>::new(subscribe);
        let assembled = hooks.on_assembly(Assembled::new::<T>(Arc::new(source)));
        Self {
            assembled,
            hooks: hooks.clone(),
            _value: PhantomData,
        }
    }

    /// Emit the items of `items` as they are requested, then complete.
    pub fn from_iter<I>(hooks: &Arc<AssemblyHooks>, items: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::from_subscribe(hooks, move |mut subscriber| {
            let subscription = Arc::new(IterSubscription::new(items.clone().into_iter()));
            subscriber.on_subscribe(subscription.clone());
            subscription.start(subscriber);
        })
    }

    pub fn empty(hooks: &Arc<AssemblyHooks>) -> Self {
        Self::from_subscribe(hooks, |mut subscriber| {
            subscriber.on_subscribe(Arc::new(EmptySubscription));
            subscriber.on_complete();
        })
    }

    pub fn error(hooks: &Arc<AssemblyHooks>, error: Failure) -> Self {
        Self::from_subscribe(hooks, move |mut subscriber| {
            subscriber.on_subscribe(Arc::new(EmptySubscription));
            subscriber.on_error(error.clone());
        })
    }

    pub fn map<U, F>(&self, f: F) -> Flowable<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f: Arc<dyn Fn(T) -> U + Send + Sync> = Arc::new(f);
        Flowable::from_subscribe(&self.hooks, move |downstream| {
            upstream.subscribe(MapSubscriber {
                downstream,
                f: f.clone(),
            });
        })
    }

    pub fn subscribe_on(&self, scheduler: Arc<dyn Scheduler>) -> Self {
        let upstream = self.clone();
        Self::from_subscribe(&self.hooks, move |subscriber| {
            let upstream = upstream.clone();
            scheduler.schedule(Box::new(move || upstream.subscribe_boxed(subscriber)));
        })
    }

    pub fn subscribe(&self, subscriber: impl Subscriber<T>) {
        self.subscribe_boxed(Box::new(subscriber));
    }

    /// Subscribe with callbacks, requesting unbounded demand.
    pub fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_complete: C)
    where
        N: FnMut(T) + Send + 'static,
        E: FnOnce(Failure) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.subscribe(CallbackSubscriber {
            on_next,
            on_error: Some(on_error),
            on_complete: Some(on_complete),
        });
    }

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

    fn subscribe_boxed(&self, subscriber: Box<dyn Subscriber<T>>) {
        self.assembled.subscribe_raw(RawSubscriber::new(subscriber));
    }
}

struct EmptySubscription;

impl Subscription for EmptySubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}

struct IterState<T, I: Iterator> {
    subscriber: Option<Box<dyn Subscriber<T>>>,
    iter: Peekable<I>,
}

/// Emits from an iterator strictly within outstanding demand. Completion needs no demand: it
/// is signalled as soon as the iterator is exhausted.
///
/// `wip` serializes emission: only the caller that raises it from zero drains, and anyone
/// requesting or cancelling while a drain runs (including the subscriber itself from inside
/// `on_next`) just bumps it so the drainer loops again.
struct IterSubscription<T, I: Iterator> {
    state: Mutex<IterState<T, I>>,
    requested: AtomicU64,
    wip: AtomicUsize,
    cancelled: AtomicBool,
    invalid_request: AtomicBool,
}

impl<T, I> IterSubscription<T, I>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    fn new(iter: I) -> Self {
        Self {
            state: Mutex::new(IterState {
                subscriber: None,
                iter: iter.peekable(),
            }),
            requested: AtomicU64::new(0),
            wip: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            invalid_request: AtomicBool::new(false),
        }
    }

    fn start(&self, subscriber: Box<dyn Subscriber<T>>) {
        self.state.lock().subscriber = Some(subscriber);
        self.drain();
    }

    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1;
        loop {
            self.emit();
            let remaining = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if remaining == 0 {
                break;
            }
            missed = remaining;
        }
    }

    fn emit(&self) {
        let mut state = self.state.lock();
        let IterState { subscriber, iter } = &mut *state;
        if subscriber.is_none() {
            return;
        }
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                *subscriber = None;
                return;
            }
            if self.invalid_request.load(Ordering::Acquire) {
                self.cancelled.store(true, Ordering::Release);
                if let Some(mut subscriber) = subscriber.take() {
                    subscriber.on_error(failure(SignalError::new(
                        "request amount must be positive",
                    )));
                }
                return;
            }
            if iter.peek().is_none() {
                if let Some(mut subscriber) = subscriber.take() {
                    subscriber.on_complete();
                }
                return;
            }
            let demand = self.requested.load(Ordering::Acquire);
            if demand == 0 {
                return;
            }
            if let Some(item) = iter.next() {
                if let Some(subscriber) = subscriber.as_mut() {
                    subscriber.on_next(item);
                }
                if demand != u64::MAX {
                    self.requested.fetch_sub(1, Ordering::AcqRel);
                }
            }
        }
    }
}

impl<T, I> Subscription for IterSubscription<T, I>
where
    T: Send + 'static,
    I: Iterator<Item = T> + Send + 'static,
{
    fn request(&self, n: u64) {
        if n == 0 {
            self.invalid_request.store(true, Ordering::Release);
        } else {
            let _ = self
                .requested
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    Some(current.saturating_add(n))
                });
        }
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.drain();
    }
}

struct MapSubscriber<T, U> {
    downstream: Box<dyn Subscriber<U>>,
    f: Arc<dyn Fn(T) -> U + Send + Sync>,
}

impl<T: 'static, U: 'static> Subscriber<T> for MapSubscriber<T, U> {
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        self.downstream.on_subscribe(subscription);
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

struct CallbackSubscriber<N, E, C> {
    on_next: N,
    on_error: Option<E>,
    on_complete: Option<C>,
}

impl<T, N, E, C> Subscriber<T> for CallbackSubscriber<N, E, C>
where
    N: FnMut(T) + Send + 'static,
    E: FnOnce(Failure) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    fn on_subscribe(&mut self, subscription: Arc<dyn Subscription>) {
        subscription.request(u64::MAX);
    }

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
