//! Minimal reactive runtime.
//!
//! Five deferred computation types, one per [`ShapeKind`]. Building any of them (a constructor
//! or an operator) passes the new computation through the [`AssemblyHooks`] registry it was
//! built against; subscribing runs whatever the hooks left in place.

pub mod completable;
pub mod disposable;
pub mod flowable;
pub mod hooks;
pub mod maybe;
pub mod observable;
pub mod raw;
pub mod scheduler;
pub mod shape;
pub mod single;

pub use completable::{Completable, CompletableEmitter, CompletableObserver};
pub use disposable::Disposable;
pub use flowable::{Flowable, Subscriber, Subscription};
pub use hooks::{compose, transform, AssemblyHooks, HookSet, Transform};
pub use maybe::{Maybe, MaybeEmitter, MaybeObserver};
pub use observable::{Observable, ObservableEmitter, Observer};
pub use raw::{Assembled, RawSource, RawSubscriber};
pub use scheduler::{Immediate, NewThread, Scheduler};
pub use shape::{Shape, ShapeKind};
pub use single::{Single, SingleEmitter, SingleObserver};
