//! # Host Runtime
//!
//! Drives one engine against one in-memory document on a virtual clock.
//! Script commands play the part of a user at the keyboard; every edit
//! reaches the engine as a change notification, exactly as an editor would
//! deliver it.

use crate::config::{ConfigError, EngineConfig};
use crate::engine::CalcEngine;
use crate::input_script::{InputScript, InputScriptError, ScriptCommand};
use services_recalc_scheduler::{Duration, Instant};
use sheet_core::GlobalsError;
use sheet_renderer_host::{overlay_view, Caret, DocumentSurface, RenderMode, RenderReport, SheetBuffer};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Definitions error: {0}")]
    Globals(#[from] GlobalsError),

    #[error("Script error: {0}")]
    Script(#[from] InputScriptError),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Line {line} is out of range (document has {count} lines)")]
    InvalidLine { line: usize, count: usize },

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

#[derive(Debug, Clone)]
pub struct HostRuntimeConfig {
    pub engine: EngineConfig,
    /// Initial document text
    pub document: Option<String>,
    /// Edit script to replay
    pub script: Option<String>,
    /// Load the definitions resource named by `engine.globals_path`
    pub load_globals: bool,
    /// Directory that relative `load` paths resolve against
    pub base_dir: PathBuf,
    /// Maximum script steps to run (0 = unlimited)
    pub max_steps: usize,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            document: None,
            script: None,
            load_globals: true,
            base_dir: PathBuf::from("."),
            max_steps: 0,
        }
    }
}

/// Something the runtime observed while replaying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    Pass {
        at_ms: u64,
        lines_touched: Vec<usize>,
        overlay_revision: Option<u64>,
    },
    Variables(String),
    Document(String),
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::Pass {
                at_ms,
                lines_touched,
                overlay_revision: Some(revision),
            } => write!(
                f,
                "[{}ms] pass: overlay revision {} ({} lines rewritten)",
                at_ms,
                revision,
                lines_touched.len()
            ),
            TranscriptEntry::Pass {
                at_ms,
                lines_touched,
                overlay_revision: None,
            } => write!(f, "[{}ms] pass: {} lines rewritten", at_ms, lines_touched.len()),
            TranscriptEntry::Variables(listing) => write!(f, "{}", listing),
            TranscriptEntry::Document(text) => write!(f, "{}", text),
        }
    }
}

pub struct HostRuntime {
    config: HostRuntimeConfig,
    engine: CalcEngine,
    buffer: SheetBuffer,
    script: Option<InputScript>,
    clock: Instant,
    transcript: Vec<TranscriptEntry>,
    steps: usize,
}

impl HostRuntime {
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        config.engine.validate()?;
        let mut engine = CalcEngine::new(config.engine.clone());
        if config.load_globals {
            if let Err(err) = engine.load_globals_from_path(&config.engine.globals_path) {
                tracing::warn!(error = %err, "continuing without definitions");
            }
        }

        let buffer = SheetBuffer::from_text(config.document.as_deref().unwrap_or_default());
        let script = config
            .script
            .as_deref()
            .map(InputScript::from_text)
            .transpose()?;

        tracing::info!(engine = %engine.id(), "host runtime started");
        Ok(Self {
            config,
            engine,
            buffer,
            script,
            clock: Instant::ZERO,
            transcript: Vec::new(),
            steps: 0,
        })
    }

    /// Replays the whole script, then lets any pending pass run
    pub fn run(&mut self) -> Result<(), HostRuntimeError> {
        while self.has_more() {
            if self.config.max_steps > 0 && self.steps >= self.config.max_steps {
                tracing::warn!(steps = self.steps, "step limit reached");
                break;
            }
            self.step()?;
        }
        self.settle();
        Ok(())
    }

    fn has_more(&self) -> bool {
        self.script.as_ref().is_some_and(InputScript::has_more)
    }

    /// Runs one script command
    pub fn step(&mut self) -> Result<(), HostRuntimeError> {
        let Some(command) = self.script.as_mut().and_then(InputScript::next_command) else {
            return Ok(());
        };
        self.steps += 1;
        self.execute(command)
    }

    pub fn execute(&mut self, command: ScriptCommand) -> Result<(), HostRuntimeError> {
        tracing::debug!(step = self.steps, ?command, "executing");
        let is_edit = command.is_edit();
        match command {
            ScriptCommand::Load(path) => {
                let path = self.config.base_dir.join(path);
                let text = fs::read_to_string(&path).map_err(|err| HostRuntimeError::Io {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })?;
                self.buffer.replace_all(&text);
            }
            ScriptCommand::Set { line, text } => {
                let index = self.line_index(line, self.buffer.line_count())?;
                self.buffer.set_line(index, &text);
            }
            ScriptCommand::Insert { line, text } => {
                let index = self.line_index(line, self.buffer.line_count() + 1)?;
                self.buffer.insert_line(index, &text);
            }
            ScriptCommand::Append(text) => self.buffer.append_line(&text),
            ScriptCommand::Delete(line) => {
                let index = self.line_index(line, self.buffer.line_count())?;
                self.buffer.delete_line(index);
            }
            ScriptCommand::Caret { line, column } => {
                let index = self.line_index(line, self.buffer.line_count())?;
                self.buffer.move_caret(Caret::new(index, column));
            }
            ScriptCommand::Type(text) => self.buffer.type_text(&text),
            ScriptCommand::Backspace(count) => {
                for _ in 0..count {
                    if !self.buffer.backspace() {
                        break;
                    }
                }
            }
            ScriptCommand::Wait(millis) => self.advance(Duration::from_millis(millis)),
            ScriptCommand::Eval => {
                let report = self.engine.evaluate_now(&mut self.buffer, self.clock);
                self.record_pass(report);
            }
            ScriptCommand::Vars => {
                let listing = self.engine.list_variables();
                self.transcript.push(TranscriptEntry::Variables(listing));
            }
            ScriptCommand::Show => {
                let view = self.document_view();
                self.transcript.push(TranscriptEntry::Document(view));
            }
        }

        if is_edit {
            self.deliver_notifications();
        }
        Ok(())
    }

    /// Converts a 1-based line number, checking it against `limit`
    fn line_index(&self, line: usize, limit: usize) -> Result<usize, HostRuntimeError> {
        if line == 0 || line > limit {
            return Err(HostRuntimeError::InvalidLine {
                line,
                count: self.buffer.line_count(),
            });
        }
        Ok(line - 1)
    }

    fn deliver_notifications(&mut self) {
        for _ in 0..self.buffer.take_change_notifications() {
            self.engine.notify_document_changed(&self.buffer, self.clock);
        }
        let report = self.engine.poll(&mut self.buffer, self.clock);
        self.record_pass(report);
    }

    fn record_pass(&mut self, report: Option<RenderReport>) {
        if let Some(report) = report {
            self.transcript.push(TranscriptEntry::Pass {
                at_ms: self.clock.as_millis(),
                lines_touched: report.lines_touched,
                overlay_revision: report.overlay_revision,
            });
        }
    }

    /// Moves the clock forward, running passes at their deadlines on the way
    pub fn advance(&mut self, by: Duration) {
        let target = self.clock + by;
        while let Some(deadline) = self.engine.next_deadline() {
            if deadline > target {
                break;
            }
            self.clock = self.clock.max(deadline);
            let report = self.engine.poll(&mut self.buffer, self.clock);
            self.record_pass(report);
        }
        self.clock = target;
    }

    /// Lets a pending pass run, however far off its deadline is
    pub fn settle(&mut self) {
        if let Some(deadline) = self.engine.next_deadline() {
            self.advance(deadline.duration_since(self.clock));
        }
    }

    /// Reloads the definitions resource, replacing the seed scope
    ///
    /// Returns the number of lines that were skipped.
    pub fn reload_globals(&mut self) -> Result<usize, HostRuntimeError> {
        let path = self.config.engine.globals_path.clone();
        let loaded = self.engine.load_globals_from_path(path)?;
        Ok(loaded.skipped_lines.len())
    }

    /// Runs a pass right away, outside any script
    pub fn evaluate_now(&mut self) -> Option<RenderReport> {
        let report = self.engine.evaluate_now(&mut self.buffer, self.clock);
        self.record_pass(report.clone());
        report
    }

    /// Document text, with annotations drawn in when rendering as an overlay
    pub fn document_view(&self) -> String {
        match self.engine.config().render_mode {
            RenderMode::Rewrite => self.buffer.text(),
            RenderMode::Overlay => overlay_view(&self.buffer),
        }
    }

    pub fn scope_snapshot_json(&self) -> Result<String, HostRuntimeError> {
        self.engine
            .scope_snapshot_json()
            .map_err(|err| HostRuntimeError::Snapshot(err.to_string()))
    }

    pub fn engine(&self) -> &CalcEngine {
        &self.engine
    }

    pub fn buffer(&self) -> &SheetBuffer {
        &self.buffer
    }

    pub fn clock(&self) -> Instant {
        self.clock
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn step_count(&self) -> usize {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime(document: &str, script: &str) -> HostRuntime {
        HostRuntime::new(HostRuntimeConfig {
            document: Some(document.to_string()),
            script: Some(script.to_string()),
            load_globals: false,
            ..HostRuntimeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_runtime_creation() {
        let runtime = HostRuntime::new(HostRuntimeConfig {
            load_globals: false,
            ..HostRuntimeConfig::default()
        })
        .unwrap();
        assert_eq!(runtime.step_count(), 0);
        assert_eq!(runtime.clock(), Instant::ZERO);
        assert_eq!(runtime.buffer().line_count(), 1);
    }

    #[test]
    fn test_unreadable_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EngineConfig::default();
        engine.globals_path = dir.path().to_path_buf();
        let mut runtime = HostRuntime::new(HostRuntimeConfig {
            engine,
            ..HostRuntimeConfig::default()
        })
        .unwrap();
        assert!(runtime.engine().globals().is_empty());
        assert!(matches!(runtime.reload_globals(), Err(HostRuntimeError::Globals(_))));
    }

    #[test]
    fn test_invalid_script_rejected() {
        let result = HostRuntime::new(HostRuntimeConfig {
            script: Some("fly away".to_string()),
            load_globals: false,
            ..HostRuntimeConfig::default()
        });
        assert!(matches!(result, Err(HostRuntimeError::Script(_))));
    }

    #[test]
    fn test_edit_then_wait_runs_one_pass() {
        let mut runtime = runtime("", "set 1 \"6 * 7 =>\"\nwait 100ms\nappend \"x = 1\"\nwait 1s");
        runtime.run().unwrap();
        assert_eq!(runtime.buffer().line(0), Some("6 * 7 => 42"));
        assert_eq!(
            runtime.transcript(),
            &[TranscriptEntry::Pass {
                at_ms: 350,
                lines_touched: vec![0],
                overlay_revision: None
            }]
        );
        assert_eq!(runtime.step_count(), 4);
    }

    #[test]
    fn test_run_settles_pending_pass() {
        let mut runtime = runtime("", "type \"2 ^ 8 =>\"\ncaret 1 0\ntype \" \"");
        runtime.run().unwrap();
        assert_eq!(runtime.buffer().line(0), Some(" 2 ^ 8 => 256"));
        assert_eq!(runtime.clock(), Instant::from_millis(250));
    }

    #[test]
    fn test_line_numbers_checked() {
        let mut runtime = runtime("one", "delete 2");
        assert!(matches!(
            runtime.run(),
            Err(HostRuntimeError::InvalidLine { line: 2, count: 1 })
        ));
    }

    #[test]
    fn test_max_steps() {
        let mut runtime = HostRuntime::new(HostRuntimeConfig {
            script: Some("append \"a\"\nappend \"b\"\nappend \"c\"".to_string()),
            load_globals: false,
            max_steps: 2,
            ..HostRuntimeConfig::default()
        })
        .unwrap();
        runtime.run().unwrap();
        assert_eq!(runtime.step_count(), 2);
        assert_eq!(runtime.buffer().text(), "\na\nb");
    }

    #[test]
    fn test_transcript_display() {
        let pass = TranscriptEntry::Pass {
            at_ms: 250,
            lines_touched: vec![1, 2],
            overlay_revision: None,
        };
        assert_eq!(pass.to_string(), "[250ms] pass: 2 lines rewritten");
        assert_eq!(TranscriptEntry::Variables("a = 1".to_string()).to_string(), "a = 1");
    }
}
