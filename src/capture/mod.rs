mod sequence;

pub use sequence::ImageSequence;

use anyhow::Result;
use image::DynamicImage;

/// Trait for timed video frame sources
pub trait FrameSource {
    /// Fetch the frame shown at time `t` (seconds from the start)
    fn frame_at(&mut self, t: f64) -> Result<DynamicImage>;

    /// Frames per second
    fn fps(&self) -> f64;

    /// Total length in seconds
    fn duration(&self) -> f64;

    /// Get the resolution of delivered frames
    ///
    /// Returns (width, height)
    fn resolution(&self) -> (u32, u32);
}
