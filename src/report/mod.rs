mod png;

pub use png::{frame_grid, heatmap, label_font, GridLayout, PngReport};

use crate::background::Background;
use crate::decompose::Algorithm;
use crate::frames::FrameMatrix;
use anyhow::Result;

/// Trait for exporting pipeline results
pub trait ReportingSink {
    /// Export the raw frame-matrix
    fn frame_matrix(&mut self, matrix: &FrameMatrix) -> Result<()>;

    /// Export a rank-r background and its per-frame comparison
    fn background(
        &mut self,
        algorithm: Algorithm,
        matrix: &FrameMatrix,
        background: &Background,
        frame_ids: &[usize],
    ) -> Result<()>;
}
