//! Overlay rendering
//!
//! The document text is left alone. Each pass builds a complete
//! [`OverlayFrame`] (result annotations plus name highlights) and swaps it
//! into the surface in one step.

use crate::surface::{
    Annotation, DocumentSurface, Highlight, HighlightKind, OverlayAnchor, OverlayFrame,
};
use crate::{RenderReport, RenderStrategy};
use expr_core::lexer::is_ident_continue;
use sheet_core::{result_text, split_marker, PassOutput, Scope};

#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    anchor: OverlayAnchor,
    revision: u64,
}

impl OverlayRenderer {
    pub fn new(anchor: OverlayAnchor) -> Self {
        Self { anchor, revision: 0 }
    }

    pub fn anchor(&self) -> OverlayAnchor {
        self.anchor
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn annotations(&self, surface: &dyn DocumentSurface, output: &PassOutput) -> Vec<Annotation> {
        output
            .results
            .iter()
            .filter_map(|(&line, value)| {
                let text = surface.line(line)?;
                let column = match self.anchor {
                    OverlayAnchor::AfterMarker => {
                        let end = split_marker(text).marker_end()?;
                        text[..end].chars().count()
                    }
                    OverlayAnchor::EndOfContent => text.chars().count(),
                };
                Some(Annotation {
                    line,
                    column,
                    text: result_text(value),
                    is_error: value.is_error(),
                })
            })
            .collect()
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayAnchor::default())
    }
}

/// Every word-boundary occurrence of a bound name, in document order
///
/// Matching is case-sensitive over the raw text; string literal contents
/// are not skipped.
pub fn find_highlights(surface: &dyn DocumentSurface, scope: &Scope) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    if scope.is_empty() {
        return highlights;
    }

    for line in 0..surface.line_count() {
        let Some(text) = surface.line(line) else {
            continue;
        };
        let mut word_start: Option<(usize, usize)> = None;
        let mut column = 0;
        for (offset, ch) in text.char_indices().chain(std::iter::once((text.len(), ' '))) {
            if is_ident_continue(ch) && offset < text.len() {
                word_start.get_or_insert((offset, column));
            } else if let Some((start_offset, start_column)) = word_start.take() {
                let word = &text[start_offset..offset];
                if scope.get_variable(word).is_some() {
                    highlights.push(Highlight {
                        line,
                        start: start_column,
                        end: column,
                        kind: HighlightKind::Variable,
                    });
                }
                if scope.get_function(word).is_some() {
                    highlights.push(Highlight {
                        line,
                        start: start_column,
                        end: column,
                        kind: HighlightKind::Function,
                    });
                }
            }
            column += 1;
        }
    }
    highlights
}

/// Plain-text view of a surface with its overlay drawn in
///
/// Each annotation is inserted as ` [text]` at its column; highlights are
/// not drawn.
pub fn overlay_view(surface: &dyn DocumentSurface) -> String {
    let mut lines = Vec::with_capacity(surface.line_count());
    for line in 0..surface.line_count() {
        let text = surface.line(line).unwrap_or_default();
        let annotation = surface.overlay().and_then(|frame| frame.annotation(line));
        match annotation {
            Some(annotation) => {
                let split = text
                    .char_indices()
                    .nth(annotation.column)
                    .map(|(offset, _)| offset)
                    .unwrap_or(text.len());
                lines.push(format!(
                    "{} [{}]{}",
                    &text[..split],
                    annotation.text,
                    &text[split..]
                ));
            }
            None => lines.push(text.to_string()),
        }
    }
    lines.join("\n")
}

impl RenderStrategy for OverlayRenderer {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn render(&mut self, surface: &mut dyn DocumentSurface, output: &PassOutput) -> RenderReport {
        self.revision += 1;
        let frame = OverlayFrame {
            revision: self.revision,
            annotations: self.annotations(surface, output),
            highlights: find_highlights(surface, &output.scope),
        };
        let annotations = frame.annotations.len();
        let highlights = frame.highlights.len();
        let swapped = surface.swap_overlay(frame);

        tracing::debug!(
            revision = self.revision,
            annotations,
            highlights,
            swapped,
            "overlay frame built"
        );
        RenderReport {
            lines_touched: Vec::new(),
            annotations,
            highlights,
            overlay_revision: swapped.then_some(self.revision),
        }
    }
}
