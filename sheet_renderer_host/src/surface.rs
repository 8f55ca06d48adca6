//! Document surface types
//!
//! A surface is whatever holds the text the user sees: lines, a caret, and a
//! slot for one overlay frame. Renderers only talk to it through
//! [`DocumentSurface`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caret position; both fields are zero-based, `column` counts chars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caret {
    pub line: usize,
    pub column: usize,
}

impl Caret {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub const fn origin() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for Caret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Replacement of one whole line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    pub line: usize,
    pub text: String,
}

impl LineEdit {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

/// Where a result annotation sits on its line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayAnchor {
    /// Just past the `=>` marker
    #[default]
    AfterMarker,
    /// After the last character of the line
    EndOfContent,
}

/// A rendered result positioned on a line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub line: usize,
    pub column: usize,
    pub text: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    Variable,
    Function,
}

/// Occurrence of a bound name; columns are a half-open char range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

/// Complete overlay state; frames are replaced whole, never patched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayFrame {
    /// Monotonic; a frame only replaces an older one
    pub revision: u64,
    pub annotations: Vec<Annotation>,
    pub highlights: Vec<Highlight>,
}

impl OverlayFrame {
    pub fn annotation(&self, line: usize) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.line == line)
    }
}

/// Text, caret and overlay access for renderers
pub trait DocumentSurface {
    fn line_count(&self) -> usize;

    fn line(&self, index: usize) -> Option<&str>;

    /// Whole document, lines joined with `\n`
    fn text(&self) -> String;

    fn caret(&self) -> Caret;

    fn set_caret(&mut self, caret: Caret);

    /// Applies every edit as one change; edits outside the document are ignored
    fn apply_edits(&mut self, edits: &[LineEdit]);

    fn overlay(&self) -> Option<&OverlayFrame>;

    /// Installs `frame` if it is newer than the current one
    fn swap_overlay(&mut self, frame: OverlayFrame) -> bool;

    /// Change notifications raised since the last call
    fn take_change_notifications(&mut self) -> usize;
}
