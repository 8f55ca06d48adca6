//! In-memory document surface

use crate::surface::{Caret, DocumentSurface, LineEdit, OverlayFrame};
use sheet_core::split_lines;

/// Line storage with a caret and an overlay slot
///
/// Every user edit and every applied batch of renderer edits raises one
/// change notification, mirroring an editor that reports each transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBuffer {
    lines: Vec<String>,
    caret: Caret,
    overlay: Option<OverlayFrame>,
    pending_notifications: usize,
    applied_batches: usize,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of char column `column`, clamped to the end
fn byte_offset(text: &str, column: usize) -> usize {
    text.char_indices()
        .nth(column)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

impl SheetBuffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            lines: split_lines(text).into_iter().map(String::from).collect(),
            caret: Caret::origin(),
            overlay: None,
            pending_notifications: 0,
            applied_batches: 0,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of renderer edit batches applied so far
    pub fn applied_batches(&self) -> usize {
        self.applied_batches
    }

    fn notify(&mut self) {
        self.pending_notifications += 1;
    }

    fn clamp_caret(&mut self) {
        let line = self.caret.line.min(self.lines.len().saturating_sub(1));
        let column = self
            .caret
            .column
            .min(self.lines.get(line).map(|l| char_len(l)).unwrap_or(0));
        self.caret = Caret::new(line, column);
    }

    /// Replaces the whole document and puts the caret at the origin
    pub fn replace_all(&mut self, text: &str) {
        self.lines = split_lines(text).into_iter().map(String::from).collect();
        self.caret = Caret::origin();
        self.notify();
    }

    pub fn set_line(&mut self, index: usize, text: &str) -> bool {
        let Some(line) = self.lines.get_mut(index) else {
            return false;
        };
        *line = text.to_string();
        self.clamp_caret();
        self.notify();
        true
    }

    /// Inserts a line before `index`; `index == line_count()` appends
    pub fn insert_line(&mut self, index: usize, text: &str) -> bool {
        if index > self.lines.len() {
            return false;
        }
        self.lines.insert(index, text.to_string());
        self.notify();
        true
    }

    pub fn append_line(&mut self, text: &str) {
        self.lines.push(text.to_string());
        self.notify();
    }

    /// Removes a line; the last remaining line is cleared instead
    pub fn delete_line(&mut self, index: usize) -> bool {
        if index >= self.lines.len() {
            return false;
        }
        if self.lines.len() > 1 {
            self.lines.remove(index);
        } else {
            self.lines[index].clear();
        }
        self.clamp_caret();
        self.notify();
        true
    }

    /// Moves the caret, clamped to the document
    pub fn move_caret(&mut self, caret: Caret) {
        self.caret = caret;
        self.clamp_caret();
    }

    /// Types `text` at the caret; `\n` splits the line
    pub fn type_text(&mut self, text: &str) {
        self.clamp_caret();
        for ch in text.chars() {
            let Caret { line, column } = self.caret;
            let current = &mut self.lines[line];
            let offset = byte_offset(current, column);
            if ch == '\n' {
                let rest = current.split_off(offset);
                self.lines.insert(line + 1, rest);
                self.caret = Caret::new(line + 1, 0);
            } else {
                current.insert(offset, ch);
                self.caret = Caret::new(line, column + 1);
            }
        }
        self.notify();
    }

    /// Deletes the char before the caret, joining lines at column 0
    pub fn backspace(&mut self) -> bool {
        self.clamp_caret();
        let Caret { line, column } = self.caret;
        if column > 0 {
            let current = &mut self.lines[line];
            let offset = byte_offset(current, column - 1);
            current.remove(offset);
            self.caret = Caret::new(line, column - 1);
        } else if line > 0 {
            let removed = self.lines.remove(line);
            let previous = &mut self.lines[line - 1];
            let joined_at = char_len(previous);
            previous.push_str(&removed);
            self.caret = Caret::new(line - 1, joined_at);
        } else {
            return false;
        }
        self.notify();
        true
    }
}

impl Default for SheetBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSurface for SheetBuffer {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn caret(&self) -> Caret {
        self.caret
    }

    fn set_caret(&mut self, caret: Caret) {
        self.move_caret(caret);
    }

    fn apply_edits(&mut self, edits: &[LineEdit]) {
        let mut changed = false;
        for edit in edits {
            if let Some(line) = self.lines.get_mut(edit.line) {
                *line = edit.text.clone();
                changed = true;
            }
        }
        if changed {
            self.applied_batches += 1;
            self.notify();
        }
    }

    fn overlay(&self) -> Option<&OverlayFrame> {
        self.overlay.as_ref()
    }

    fn swap_overlay(&mut self, frame: OverlayFrame) -> bool {
        if let Some(current) = &self.overlay {
            if frame.revision <= current.revision {
                return false;
            }
        }
        self.overlay = Some(frame);
        true
    }

    fn take_change_notifications(&mut self) -> usize {
        std::mem::take(&mut self.pending_notifications)
    }
}
