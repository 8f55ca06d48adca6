//! # Calc Engine
//!
//! One engine per document. It owns the seed scope, the scheduler, the
//! active rendering strategy and the output of the most recent pass. Nothing
//! is process-wide, so several engines can run side by side.

use crate::config::EngineConfig;
use expr_core::{ExpressionEngine, MathEngine};
use serde::{Deserialize, Serialize};
use services_recalc_scheduler::{
    Instant, NotifyOutcome, RecalcScheduler, SchedulerEvent, SchedulerState, SchedulerStats,
};
use sheet_core::{
    caret_after_marker, evaluate_document, list_variables, GlobalsError, GlobalsLoader,
    LoadedGlobals, PassOutput, Scope,
};
use sheet_renderer_host::{DocumentSurface, RenderReport, RenderStrategy};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Engine identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineId(Uuid);

impl EngineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "engine:{}", self.0)
    }
}

pub struct CalcEngine {
    id: EngineId,
    config: EngineConfig,
    evaluator: Box<dyn ExpressionEngine>,
    globals: Scope,
    scheduler: RecalcScheduler,
    renderer: Box<dyn RenderStrategy>,
    last_output: Option<PassOutput>,
    last_report: Option<RenderReport>,
    /// Caret line index and text as of the last notification or pass
    caret_line: Option<(usize, String)>,
}

impl CalcEngine {
    pub fn new(config: EngineConfig) -> Self {
        let evaluator = Box::new(MathEngine::with_max_call_depth(config.max_call_depth));
        Self::with_evaluator(config, evaluator)
    }

    /// Engine with a substitute expression evaluator
    pub fn with_evaluator(config: EngineConfig, evaluator: Box<dyn ExpressionEngine>) -> Self {
        let id = EngineId::new();
        let scheduler = RecalcScheduler::new(config.debounce());
        let renderer = config.render_mode.strategy(config.overlay_anchor);
        tracing::info!(
            engine = %id,
            render_mode = %config.render_mode,
            debounce_ms = config.debounce_ms,
            "engine created"
        );
        Self {
            id,
            config,
            evaluator,
            globals: Scope::new(),
            scheduler,
            renderer,
            last_output: None,
            last_report: None,
            caret_line: None,
        }
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn last_output(&self) -> Option<&PassOutput> {
        self.last_output.as_ref()
    }

    pub fn last_report(&self) -> Option<&RenderReport> {
        self.last_report.as_ref()
    }

    /// Replaces the seed scope with definitions parsed from `text`
    pub fn load_globals_from_str(&mut self, text: &str) -> LoadedGlobals {
        let loaded = GlobalsLoader::load_from_str(self.evaluator.as_ref(), text);
        self.install_globals(&loaded);
        loaded
    }

    /// Replaces the seed scope with the resource at `path`
    ///
    /// On error the current seed is left as it was.
    pub fn load_globals_from_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<LoadedGlobals, GlobalsError> {
        let loaded = GlobalsLoader::load_from_path(self.evaluator.as_ref(), path)?;
        self.install_globals(&loaded);
        Ok(loaded)
    }

    fn install_globals(&mut self, loaded: &LoadedGlobals) {
        if !loaded.skipped_lines.is_empty() {
            tracing::warn!(
                engine = %self.id,
                skipped = ?loaded.skipped_lines,
                "definition lines skipped"
            );
        }
        self.globals = loaded.scope.clone();
    }

    /// Records a document change
    ///
    /// The zero-delay path is taken only when this change edited the caret's
    /// line and left the caret on an empty result slot after its marker.
    pub fn notify_document_changed(
        &mut self,
        surface: &dyn DocumentSurface,
        now: Instant,
    ) -> NotifyOutcome {
        let caret = surface.caret();
        let line = surface.line(caret.line).unwrap_or_default();
        let edited = self
            .caret_line
            .as_ref()
            .map_or(true, |(index, text)| *index != caret.line || text != line);
        let fast_path = edited && caret_after_marker(line, caret.column);
        self.caret_line = Some((caret.line, line.to_string()));
        let outcome = self.scheduler.notify(now, fast_path);
        self.log_scheduler_events();
        outcome
    }

    /// Runs a pass right away
    pub fn evaluate_now(
        &mut self,
        surface: &mut dyn DocumentSurface,
        now: Instant,
    ) -> Option<RenderReport> {
        self.scheduler.request_now(now);
        self.poll(surface, now)
    }

    /// Runs the pending pass if it is due
    pub fn poll(&mut self, surface: &mut dyn DocumentSurface, now: Instant) -> Option<RenderReport> {
        if !self.scheduler.poll(now) {
            self.log_scheduler_events();
            return None;
        }

        let text = surface.text();
        let output = evaluate_document(self.evaluator.as_ref(), &self.globals, &text);
        let report = self.renderer.render(surface, &output);

        // Changes raised by our own edits reach the scheduler while it is
        // still evaluating and are dropped there.
        for _ in 0..surface.take_change_notifications() {
            self.scheduler.notify(now, false);
        }
        self.scheduler.complete(now);
        self.log_scheduler_events();
        let caret = surface.caret();
        self.caret_line = surface
            .line(caret.line)
            .map(|line| (caret.line, line.to_string()));

        tracing::info!(
            engine = %self.id,
            lines = output.line_count(),
            results = output.results.len(),
            errors = output.error_count,
            touched = report.lines_touched.len(),
            "pass rendered"
        );
        self.last_output = Some(output);
        self.last_report = Some(report.clone());
        Some(report)
    }

    fn log_scheduler_events(&mut self) {
        for event in self.scheduler.take_events() {
            match event {
                SchedulerEvent::Notified {
                    at,
                    outcome: NotifyOutcome::Dropped,
                    ..
                } => {
                    tracing::debug!(engine = %self.id, at_ms = at.as_millis(), "notification dropped during pass")
                }
                SchedulerEvent::Notified {
                    at,
                    outcome,
                    fast_path,
                } => {
                    tracing::debug!(engine = %self.id, at_ms = at.as_millis(), ?outcome, fast_path, "notification")
                }
                SchedulerEvent::PassStarted { at } => {
                    tracing::debug!(engine = %self.id, at_ms = at.as_millis(), "pass started")
                }
                SchedulerEvent::PassCompleted { at } => {
                    tracing::debug!(engine = %self.id, at_ms = at.as_millis(), "pass completed")
                }
                SchedulerEvent::Cancelled => {
                    tracing::debug!(engine = %self.id, "pending pass cancelled")
                }
            }
        }
    }

    /// Scope the inspection command reads: the last pass, else the seed
    pub fn current_scope(&self) -> &Scope {
        self.last_output
            .as_ref()
            .map(|output| &output.scope)
            .unwrap_or(&self.globals)
    }

    pub fn list_variables(&self) -> String {
        list_variables(self.current_scope())
    }

    pub fn scope_snapshot_json(&self) -> Result<String, serde_json::Error> {
        self.current_scope().to_json()
    }

    /// Forgets pass output and any pending pass; config and seed are kept
    pub fn reset(&mut self) {
        self.scheduler.cancel();
        self.log_scheduler_events();
        self.last_output = None;
        self.last_report = None;
        self.caret_line = None;
        tracing::info!(engine = %self.id, "engine reset");
    }
}
