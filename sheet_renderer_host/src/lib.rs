//! # Sheet Renderer Host
//!
//! Presents pass output on a document surface.
//!
//! ## Philosophy
//!
//! - **Rendering is a host concern**: the document pass never knows which strategy is active
//! - **Minimal change**: rewrite touches only lines that differ
//! - **Frames, not patches**: overlay state is swapped whole, by revision
//!
//! ## Strategies
//!
//! - [`TextRewriteRenderer`]: writes canonical lines into the text
//! - [`OverlayRenderer`]: leaves the text alone and publishes annotations and highlights

pub mod buffer;
pub mod overlay;
pub mod rewrite;
pub mod surface;

use serde::{Deserialize, Serialize};
use sheet_core::PassOutput;
use std::fmt;
use std::str::FromStr;

pub use buffer::SheetBuffer;
pub use overlay::{find_highlights, overlay_view, OverlayRenderer};
pub use rewrite::{diff_lines, TextRewriteRenderer};
pub use surface::{
    Annotation, Caret, DocumentSurface, Highlight, HighlightKind, LineEdit, OverlayAnchor,
    OverlayFrame,
};

/// What a single render did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Lines rewritten in the document text
    pub lines_touched: Vec<usize>,
    pub annotations: usize,
    pub highlights: usize,
    /// Revision of the overlay frame installed, if one was
    pub overlay_revision: Option<u64>,
}

impl RenderReport {
    pub fn is_noop(&self) -> bool {
        self.lines_touched.is_empty() && self.overlay_revision.is_none()
    }
}

/// Turns pass output into a visible change on a surface
pub trait RenderStrategy {
    fn name(&self) -> &'static str;

    fn render(&mut self, surface: &mut dyn DocumentSurface, output: &PassOutput) -> RenderReport;
}

/// Selects a rendering strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Rewrite,
    Overlay,
}

impl RenderMode {
    pub fn strategy(self, anchor: OverlayAnchor) -> Box<dyn RenderStrategy> {
        match self {
            RenderMode::Rewrite => Box::new(TextRewriteRenderer::new()),
            RenderMode::Overlay => Box::new(OverlayRenderer::new(anchor)),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Rewrite => write!(f, "rewrite"),
            RenderMode::Overlay => write!(f, "overlay"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rewrite" => Ok(RenderMode::Rewrite),
            "overlay" => Ok(RenderMode::Overlay),
            other => Err(format!("Unknown render mode: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mode_parsing() {
        assert_eq!("overlay".parse::<RenderMode>(), Ok(RenderMode::Overlay));
        assert!("fancy".parse::<RenderMode>().is_err());
        assert_eq!(RenderMode::default().to_string(), "rewrite");
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(RenderMode::Rewrite.strategy(OverlayAnchor::default()).name(), "rewrite");
        assert_eq!(
            RenderMode::Overlay.strategy(OverlayAnchor::EndOfContent).name(),
            "overlay"
        );
    }

    #[test]
    fn test_mode_serde() {
        let json = serde_json::to_string(&RenderMode::Overlay).unwrap();
        assert_eq!(json, "\"overlay\"");
        let anchor: OverlayAnchor = serde_json::from_str("\"end_of_content\"").unwrap();
        assert_eq!(anchor, OverlayAnchor::EndOfContent);
    }
}
