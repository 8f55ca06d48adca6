//! # Calcsheet Host
//!
//! Engine instances, configuration and the scripted host runtime.
//!
//! ## Philosophy
//!
//! - **Explicit engines**: every document gets its own [`CalcEngine`]; nothing is global
//! - **Deterministic hosting**: time is virtual and edits come from scripts
//! - **Thin binary**: `main.rs` only parses flags and prints
//!
//! ## Flow
//!
//! ```text
//! edit -> SheetBuffer notification -> CalcEngine::notify_document_changed
//!      -> RecalcScheduler (debounce / fast path)
//!      -> CalcEngine::poll -> document pass -> RenderStrategy -> SheetBuffer
//! ```

pub mod config;
pub mod engine;
pub mod input_script;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, EngineConfig, CONFIG_FILE_NAME};
pub use engine::{CalcEngine, EngineId};
pub use input_script::{InputScript, InputScriptError, ScriptCommand};
pub use runtime::{HostRuntime, HostRuntimeConfig, HostRuntimeError, TranscriptEntry};
