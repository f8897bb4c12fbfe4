//! rx-context: Ambient Context Propagation for Reactive Pipelines
//!
//! A deferred computation is often assembled inside one execution context (a trace span, a
//! request scope) and subscribed later on another thread. This crate captures the ambient
//! [`context::Context`] at assembly time and re-attaches it for the duration of each
//! subscription call, through assembly hooks exposed by a small reactive runtime ([`rx`]).
//!
//! ```no_run
//! use rx_context::context::Context;
//! use rx_context::propagation::{ContextPropagation, PropagationConfig};
//! use rx_context::rx::{scheduler, AssemblyHooks, Single};
//!
//! #[derive(Debug)]
//! struct RequestId(u64);
//!
//! let hooks = AssemblyHooks::shared();
//! let _propagation = ContextPropagation::install(hooks.clone(), PropagationConfig::default())?;
//!
//! let single = Context::current_with_value(RequestId(7)).in_scope(|| {
//!     Single::from_fn(&hooks, || {
//!         Ok(Context::map_current(|ctx| ctx.get::<RequestId>().map(|id| id.0)))
//!     })
//!     .subscribe_on(scheduler::new_thread())
//! });
//! assert_eq!(single.blocking_get().ok().flatten(), Some(7));
//! # Ok::<(), rx_context::error::PropagationError>(())
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod propagation;
pub mod rx;
