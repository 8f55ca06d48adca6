//! Text-rewrite rendering
//!
//! Writes canonical lines back into the document. Only lines whose text
//! differs are replaced, all in one batch, and the caret is put back where
//! it was (clamped if its line got shorter).

use crate::surface::{Caret, DocumentSurface, LineEdit};
use crate::{RenderReport, RenderStrategy};
use sheet_core::PassOutput;

#[derive(Debug, Default, Clone)]
pub struct TextRewriteRenderer {
    batches_applied: u64,
}

impl TextRewriteRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches_applied(&self) -> u64 {
        self.batches_applied
    }
}

/// Edits that turn the surface into `canonical`, one per differing line
pub fn diff_lines(surface: &dyn DocumentSurface, canonical: &[String]) -> Vec<LineEdit> {
    canonical
        .iter()
        .enumerate()
        .filter(|(index, text)| surface.line(*index) != Some(text.as_str()))
        .filter(|(index, _)| *index < surface.line_count())
        .map(|(index, text)| LineEdit::new(index, text.as_str()))
        .collect()
}

impl RenderStrategy for TextRewriteRenderer {
    fn name(&self) -> &'static str {
        "rewrite"
    }

    fn render(&mut self, surface: &mut dyn DocumentSurface, output: &PassOutput) -> RenderReport {
        let edits = diff_lines(surface, &output.canonical);
        if edits.is_empty() {
            return RenderReport::default();
        }

        let caret = surface.caret();
        surface.apply_edits(&edits);
        let width = surface
            .line(caret.line)
            .map(|line| line.chars().count())
            .unwrap_or(0);
        surface.set_caret(Caret::new(caret.line, caret.column.min(width)));
        self.batches_applied += 1;

        tracing::debug!(lines = edits.len(), caret = %caret, "rewrote changed lines");
        RenderReport {
            lines_touched: edits.iter().map(|edit| edit.line).collect(),
            ..RenderReport::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SheetBuffer;
    use expr_core::MathEngine;
    use sheet_core::{evaluate_document, Scope};

    fn pass(surface: &SheetBuffer) -> PassOutput {
        evaluate_document(&MathEngine::new(), &Scope::new(), &surface.text())
    }

    #[test]
    fn test_only_changed_lines_are_touched() {
        let mut buffer = SheetBuffer::from_text("a = 1\nb = a + 1 =>\nnotes\nc = 3 => 3");
        let output = pass(&buffer);
        let report = TextRewriteRenderer::new().render(&mut buffer, &output);
        assert_eq!(report.lines_touched, vec![1]);
        assert_eq!(buffer.line(1), Some("b = a + 1 => 2"));
    }

    #[test]
    fn test_canonical_document_is_untouched() {
        let mut buffer = SheetBuffer::from_text("x = 2 => 2\nx * 3 => 6");
        let mut renderer = TextRewriteRenderer::new();
        let output = pass(&buffer);
        let report = renderer.render(&mut buffer, &output);
        assert!(report.lines_touched.is_empty());
        assert_eq!(buffer.applied_batches(), 0);
        assert_eq!(renderer.batches_applied(), 0);
    }

    #[test]
    fn test_caret_restored_and_clamped() {
        let mut buffer = SheetBuffer::from_text("2 + 2 => 4444444\nnotes");
        buffer.move_caret(Caret::new(0, 16));
        let output = pass(&buffer);
        TextRewriteRenderer::new().render(&mut buffer, &output);
        assert_eq!(buffer.line(0), Some("2 + 2 => 4"));
        assert_eq!(buffer.caret(), Caret::new(0, 10));

        buffer.move_caret(Caret::new(1, 3));
        buffer.set_line(0, "2 + 3 =>");
        buffer.move_caret(Caret::new(1, 3));
        let output = pass(&buffer);
        TextRewriteRenderer::new().render(&mut buffer, &output);
        assert_eq!(buffer.caret(), Caret::new(1, 3));
    }
}
