//! CLI route: single route table and run context.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};
use parking_lot::Mutex;
use tracing::{debug, info, info_span};

use crate::cli::parse::Commands;
use crate::config::{Settings, SettingsLoader};
use crate::context::Context;
use crate::error::Failure;
use crate::propagation::ContextPropagation;
use crate::rx::scheduler::NewThread;
use crate::rx::{AssemblyHooks, Completable, Flowable, Maybe, Observable, Scheduler, ShapeKind, Single};

/// Label carried by the demo's assembly contexts.
#[derive(Debug, Clone)]
struct DemoLabel(String);

fn observed_label() -> Option<String> {
    Context::map_current(|ctx| ctx.get::<DemoLabel>().map(|label| label.0.clone()))
}

/// What one delegate saw when it was subscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub round: usize,
    pub shape: ShapeKind,
    pub expected: String,
    pub observed: Option<String>,
}

impl Observation {
    pub fn propagated(&self) -> bool {
        self.observed.as_deref() == Some(self.expected.as_str())
    }
}

/// Result of a `demo` run.
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub propagation_enabled: bool,
    pub observations: Vec<Observation>,
}

impl DemoReport {
    pub fn all_propagated(&self) -> bool {
        self.observations.iter().all(Observation::propagated)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "context propagation: {}",
            if self.propagation_enabled { "enabled" } else { "disabled" }
        );
        let _ = writeln!(out, "{:<6} {:<12} {:<14} {}", "round", "shape", "assembled", "observed");
        for obs in &self.observations {
            let _ = writeln!(
                out,
                "{:<6} {:<12} {:<14} {}",
                obs.round,
                obs.shape.type_name(),
                obs.expected,
                obs.observed.as_deref().unwrap_or("<none>")
            );
        }
        let propagated = self.observations.iter().filter(|o| o.propagated()).count();
        let _ = write!(
            out,
            "{}/{} subscriptions observed their assembly context",
            propagated,
            self.observations.len()
        );
        out
    }
}

/// Runtime context for CLI execution: effective settings.
pub struct RunContext {
    settings: Settings,
    config_path: Option<PathBuf>,
}

impl RunContext {
    /// Load settings from `config_path`, or from the default locations when it is `None`.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let settings = match config_path.as_deref() {
            Some(path) => SettingsLoader::load_from_file(path),
            None => SettingsLoader::load(None),
        }
        .context("failed to load settings")?;
        Ok(Self::with_settings(settings, config_path))
    }

    pub fn with_settings(settings: Settings, config_path: Option<PathBuf>) -> Self {
        Self {
            settings,
            config_path,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Route table: dispatch a parsed command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String> {
        debug!(?command, config = ?self.config_path, "Executing command");
        match command {
            Commands::Demo {
                disable_propagation,
                rounds,
            } => {
                let report = self.run_demo(*disable_propagation, *rounds)?;
                Ok(report.render())
            }
            Commands::Config => Ok(self.settings.to_toml()?),
        }
    }

    /// Assemble one computation of each shape per round under a labeled context, subscribe
    /// each on a fresh thread, and record the label the delegate observed.
    pub fn run_demo(&self, disable_propagation: bool, rounds: usize) -> Result<DemoReport> {
        let hooks = AssemblyHooks::shared();
        let mut config = self.settings.propagation.clone();
        if disable_propagation {
            config.enabled = false;
        }
        let propagation = ContextPropagation::install(hooks.clone(), config)?;
        let scheduler: Arc<dyn Scheduler> = Arc::new(NewThread::new("rx-context-demo"));

        let mut observations = Vec::new();
        for round in 0..rounds.max(1) {
            let expected = format!("request-{}", round);
            let context = Context::current()
                .with_value(DemoLabel(expected.clone()))
                .with_span(info_span!("demo_round", round));

            let pipelines = context.in_scope(|| Pipelines::assemble(&hooks, &scheduler));
            for (shape, observed) in pipelines.run()? {
                observations.push(Observation {
                    round,
                    shape,
                    expected: expected.clone(),
                    observed,
                });
            }
        }

        let report = DemoReport {
            propagation_enabled: propagation.is_enabled(),
            observations,
        };
        info!(
            enabled = report.propagation_enabled,
            propagated = report.all_propagated(),
            "Demo finished"
        );
        propagation.teardown();
        Ok(report)
    }
}

struct Pipelines {
    action: Completable,
    action_seen: Arc<Mutex<Option<String>>>,
    optional: Maybe<Option<String>>,
    single: Single<Option<String>>,
    eager: Observable<Option<String>>,
    backpressured: Flowable<Option<String>>,
}

impl Pipelines {
    fn assemble(hooks: &Arc<AssemblyHooks>, scheduler: &Arc<dyn Scheduler>) -> Self {
        let action_seen = Arc::new(Mutex::new(None));
        let slot = action_seen.clone();
        Self {
            action: Completable::from_fn(hooks, move || {
                *slot.lock() = observed_label();
                Ok(())
            })
            .subscribe_on(scheduler.clone()),
            action_seen,
            optional: Maybe::from_fn(hooks, || Ok(Some(observed_label())))
                .subscribe_on(scheduler.clone()),
            single: Single::from_fn(hooks, || Ok(observed_label())).subscribe_on(scheduler.clone()),
            eager: Observable::create(hooks, |mut emitter| {
                emitter.on_next(observed_label());
                emitter.on_complete();
            })
            .subscribe_on(scheduler.clone()),
            backpressured: Flowable::from_iter(hooks, [(); 1])
                .map(|()| observed_label())
                .subscribe_on(scheduler.clone()),
        }
    }

    fn run(self) -> Result<Vec<(ShapeKind, Option<String>)>> {
        self.action
            .blocking_await()
            .map_err(|e| shape_failed(ShapeKind::Action, e))?;
        let action = self.action_seen.lock().take();

        let optional = self
            .optional
            .blocking_get()
            .map_err(|e| shape_failed(ShapeKind::Optional, e))?
            .flatten();
        let single = self
            .single
            .blocking_get()
            .map_err(|e| shape_failed(ShapeKind::Single, e))?;
        let eager = first(
            self.eager
                .blocking_collect()
                .map_err(|e| shape_failed(ShapeKind::EagerStream, e))?,
        );
        let backpressured = first(
            self.backpressured
                .blocking_collect()
                .map_err(|e| shape_failed(ShapeKind::BackpressuredStream, e))?,
        );

        Ok(vec![
            (ShapeKind::Action, action),
            (ShapeKind::Optional, optional),
            (ShapeKind::Single, single),
            (ShapeKind::EagerStream, eager),
            (ShapeKind::BackpressuredStream, backpressured),
        ])
    }
}

fn first(values: Vec<Option<String>>) -> Option<String> {
    values.into_iter().next().flatten()
}

fn shape_failed(shape: ShapeKind, error: Failure) -> anyhow::Error {
    anyhow!("{} subscription failed: {}", shape, error)
}
