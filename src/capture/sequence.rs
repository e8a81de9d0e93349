use super::FrameSource;
use anyhow::{bail, Context, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// A video stored as a directory of still frames, played back at a fixed rate
///
/// Frames are ordered by file name and decoded lazily on every request.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    fps: f64,
    width: u32,
    height: u32,
}

impl ImageSequence {
    pub fn open<P: AsRef<Path>>(dir: P, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        if !(fps.is_finite() && fps > 0.0) {
            bail!("frame rate must be positive, got {fps}");
        }

        tracing::info!("Opening image sequence at {} ({} fps)", dir.display(), fps);

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_frame {
                paths.push(path);
            }
        }
        paths.sort();

        let first = match paths.first() {
            Some(first) => first,
            None => bail!("No frame images found in {}", dir.display()),
        };
        let (width, height) = image::image_dimensions(first)
            .with_context(|| format!("Failed to read dimensions of {}", first.display()))?;

        tracing::info!("Found {} frames at {}x{}", paths.len(), width, height);

        Ok(Self {
            paths,
            fps,
            width,
            height,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn index_at(&self, t: f64) -> usize {
        let index = (t * self.fps).round().max(0.0) as usize;
        index.min(self.paths.len().saturating_sub(1))
    }
}

impl FrameSource for ImageSequence {
    fn frame_at(&mut self, t: f64) -> Result<DynamicImage> {
        let path = &self.paths[self.index_at(t)];
        let frame = image::open(path)
            .with_context(|| format!("Failed to decode frame {}", path.display()))?;

        if frame.width() != self.width || frame.height() != self.height {
            bail!(
                "Frame {} is {}x{}, expected {}x{}",
                path.display(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            );
        }
        Ok(frame)
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn duration(&self) -> f64 {
        playback_duration(self.paths.len(), self.fps)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Smallest duration d >= frames / fps with floor(fps * d) == frames
fn playback_duration(frames: usize, fps: f64) -> f64 {
    let target = frames as f64;
    let mut duration = target / fps;
    while (fps * duration).floor() < target {
        // next representable f64 above a positive finite value
        duration = f64::from_bits(duration.to_bits() + 1);
    }
    duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_frames(dir: &Path, count: u8) {
        for i in 0..count {
            let frame = GrayImage::from_pixel(4, 3, Luma([i * 10]));
            frame.save(dir.join(format!("frame_{i:03}.png"))).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "not a frame").unwrap();
    }

    #[test]
    fn frames_are_ordered_and_timed() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 5);

        let mut seq = ImageSequence::open(dir.path(), 10.0).unwrap();
        assert_eq!(seq.frame_count(), 5);
        assert_eq!(seq.resolution(), (4, 3));
        assert!((seq.duration() - 0.5).abs() < 1e-12);

        let third = seq.frame_at(2.0 / 10.0).unwrap().to_luma8();
        assert_eq!(third.get_pixel(0, 0)[0], 20);

        // past the end clamps to the last frame
        let last = seq.frame_at(10.0).unwrap().to_luma8();
        assert_eq!(last.get_pixel(0, 0)[0], 40);
    }

    #[test]
    fn duration_covers_every_frame() {
        for fps in [23.976, 25.0, 29.97, 30.0, 59.94, 7.0] {
            for frames in 1..=500 {
                let duration = playback_duration(frames, fps);
                assert_eq!((fps * duration).floor() as usize, frames, "{frames} @ {fps}");
                assert!(duration - frames as f64 / fps < 1e-9);
            }
        }
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequence::open(dir.path(), 30.0).is_err());
    }

    #[test]
    fn non_positive_fps_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 1);
        assert!(ImageSequence::open(dir.path(), 0.0).is_err());
    }
}
