//! Context Propagation Interceptor
//!
//! Installs an assembly hook for every computation shape that captures the ambient
//! [`Context`] when a computation is built and re-attaches it whenever that computation is
//! subscribed, on whichever thread the subscription happens. Existing hooks keep running: each
//! slot becomes `previous hook, then wrap`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Span};

use crate::context::Context;
use crate::error::PropagationError;
use crate::rx::hooks::{compose, AssemblyHooks, HookSet, Transform};
use crate::rx::raw::Assembled;
use crate::rx::shape::{self, Shape};

mod scoped;

pub use scoped::ScopedSource;

/// Propagation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// Enable the interceptor at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Also capture the current `tracing` span at assembly time
    #[serde(default = "default_true")]
    pub capture_tracing_span: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            capture_tracing_span: default_true(),
        }
    }
}

/// Lifecycle state of a [`ContextPropagation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationState {
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

const DISABLED: u8 = 0;
const ENABLING: u8 = 1;
const ENABLED: u8 = 2;
const DISABLING: u8 = 3;

impl PropagationState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            ENABLING => PropagationState::Enabling,
            ENABLED => PropagationState::Enabled,
            DISABLING => PropagationState::Disabling,
            _ => PropagationState::Disabled,
        }
    }
}

#[derive(Clone, Copy)]
struct Capture {
    tracing_span: bool,
}

impl Capture {
    fn snapshot(self) -> Context {
        let context = Context::current();
        if !self.tracing_span {
            return context;
        }
        let span = Span::current();
        if span.is_none() || context.span().map(Span::id) == Some(span.id()) {
            return context;
        }
        context.with_span(span)
    }
}

#[derive(Default)]
struct Recorded {
    /// Hooks present right before the last successful enable.
    previous: HookSet,
    /// Hooks this interceptor installed.
    installed: HookSet,
}

/// Assembly interceptor bound to one [`AssemblyHooks`] registry.
///
/// At most one interceptor can be bound to a registry at a time. Dropping it disables it and
/// releases the registry.
pub struct ContextPropagation {
    hooks: Arc<AssemblyHooks>,
    config: PropagationConfig,
    state: AtomicU8,
    recorded: Mutex<Recorded>,
}

impl ContextPropagation {
    /// Bind an interceptor to `hooks`, initially disabled.
    pub fn bind(
        hooks: Arc<AssemblyHooks>,
        config: PropagationConfig,
    ) -> Result<Self, PropagationError> {
        if !hooks.claim_interceptor() {
            return Err(PropagationError::AlreadyBound);
        }
        debug!(?config, "Context propagation bound to hook registry");
        Ok(Self {
            hooks,
            config,
            state: AtomicU8::new(DISABLED),
            recorded: Mutex::new(Recorded::default()),
        })
    }

    /// Bind and, if `config.enabled`, enable.
    pub fn install(
        hooks: Arc<AssemblyHooks>,
        config: PropagationConfig,
    ) -> Result<Self, PropagationError> {
        let enabled = config.enabled;
        let propagation = Self::bind(hooks, config)?;
        if enabled {
            propagation.enable();
        }
        Ok(propagation)
    }

    /// Chain the context-capturing wrap after every installed hook.
    ///
    /// Does nothing unless the interceptor is currently disabled, so a second call (or one racing
    /// a `disable`) never wraps computations twice.
    pub fn enable(&self) {
        if self
            .state
            .compare_exchange(DISABLED, ENABLING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(state = ?self.state(), "Context propagation enable skipped");
            return;
        }

        let capture = Capture {
            tracing_span: self.config.capture_tracing_span,
        };
        let mut recorded = self.recorded.lock();
        self.hooks.transact(|set| {
            let previous = set.clone();
            install::<shape::Action>(set, capture);
            install::<shape::Optional>(set, capture);
            install::<shape::Single>(set, capture);
            install::<shape::EagerStream>(set, capture);
            install::<shape::Backpressured>(set, capture);
            recorded.previous = previous;
            recorded.installed = set.clone();
        });
        let chained = recorded.previous.installed();
        drop(recorded);

        self.state.store(ENABLED, Ordering::Release);
        info!(chained = ?chained, "Context propagation enabled");
    }

    /// Reinstall the hooks that were present before the last `enable`.
    ///
    /// Does nothing unless the interceptor is currently enabled.
    pub fn disable(&self) {
        if self
            .state
            .compare_exchange(ENABLED, DISABLING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(state = ?self.state(), "Context propagation disable skipped");
            return;
        }

        let mut recorded = self.recorded.lock();
        let Recorded {
            previous,
            installed,
        } = std::mem::take(&mut *recorded);
        self.hooks.transact(|set| {
            let replaced = set.differing(&installed);
            if !replaced.is_empty() {
                warn!(
                    shapes = ?replaced,
                    "Hooks installed after context propagation was enabled are being discarded"
                );
            }
            *set = previous;
        });
        drop(recorded);

        self.state.store(DISABLED, Ordering::Release);
        info!("Context propagation disabled");
    }

    pub fn state(&self) -> PropagationState {
        PropagationState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == PropagationState::Enabled
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    pub fn hooks(&self) -> &Arc<AssemblyHooks> {
        &self.hooks
    }

    /// Disable and release the registry.
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for ContextPropagation {
    fn drop(&mut self) {
        self.disable();
        self.hooks.release_interceptor();
        debug!("Context propagation released hook registry");
    }
}

impl fmt::Debug for ContextPropagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPropagation")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

fn install<K: Shape>(set: &mut HookSet, capture: Capture) {
    let previous = set.get::<K>().cloned();
    let wrap: Transform<K> = Arc::new(move |assembled: Assembled<K>| {
        let context = capture.snapshot();
        assembled.decorate(|delegate| ScopedSource::<K>::new(context, delegate))
    });
    set.set::<K>(Some(compose(previous, wrap)));
}
