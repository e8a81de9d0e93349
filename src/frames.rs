use crate::capture::FrameSource;
use crate::error::{Error, Result, Stage};
use image::{imageops, ImageBuffer, Luma};
use ndarray::{Array2, ArrayView1, Axis};

type GrayF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Downsampled frame resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDims {
    pub height: u32,
    pub width: u32,
}

impl FrameDims {
    pub fn new(height: u32, width: u32) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(Error::invalid(
                Stage::FrameMatrix,
                format!("target resolution {height}x{width} must be at least 1x1"),
            ));
        }
        Ok(Self { height, width })
    }

    /// Scale a source resolution given as (width, height)
    pub fn from_scale(resolution: (u32, u32), scale: f64) -> Result<Self> {
        if !(scale.is_finite() && scale > 0.0 && scale <= 1.0) {
            return Err(Error::invalid(
                Stage::FrameMatrix,
                format!("scale factor {scale} outside (0, 1]"),
            ));
        }
        let (width, height) = resolution;
        let height = (height as f64 * scale).floor() as u32;
        let width = (width as f64 * scale).floor() as u32;
        Self::new(height, width)
    }

    pub fn pixels(&self) -> usize {
        self.height as usize * self.width as usize
    }
}

/// Video as a (pixels, frames) matrix, one flattened grayscale frame per column
#[derive(Debug, Clone)]
pub struct FrameMatrix {
    data: Array2<f64>,
    dims: FrameDims,
}

impl FrameMatrix {
    pub fn from_array(data: Array2<f64>, dims: FrameDims) -> Result<Self> {
        if data.nrows() != dims.pixels() {
            return Err(Error::invalid(
                Stage::FrameMatrix,
                format!(
                    "{} rows do not match {}x{} frames",
                    data.nrows(),
                    dims.height,
                    dims.width
                ),
            ));
        }
        if data.ncols() == 0 {
            return Err(Error::invalid(Stage::FrameMatrix, "matrix has no frames"));
        }
        Ok(Self { data, dims })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    pub fn pixels(&self) -> usize {
        self.data.nrows()
    }

    pub fn frames(&self) -> usize {
        self.data.ncols()
    }

    /// Flattened frame at index `t`
    pub fn frame(&self, t: usize) -> Result<ArrayView1<'_, f64>> {
        if t >= self.frames() {
            return Err(Error::invalid(
                Stage::FrameMatrix,
                format!("frame index {t} outside [0, {})", self.frames()),
            ));
        }
        Ok(self.data.column(t))
    }
}

/// Samples a frame source into a FrameMatrix
pub struct FrameMatrixBuilder {
    dims: FrameDims,
}

impl FrameMatrixBuilder {
    pub fn new(dims: FrameDims) -> Self {
        Self { dims }
    }

    /// Build with dims scaled from the source's own resolution
    pub fn scaled<S: FrameSource + ?Sized>(source: &S, scale: f64) -> Result<Self> {
        Ok(Self::new(FrameDims::from_scale(source.resolution(), scale)?))
    }

    pub fn dims(&self) -> FrameDims {
        self.dims
    }

    pub fn build<S: FrameSource + ?Sized>(&self, source: &mut S) -> Result<FrameMatrix> {
        let _span = tracing::debug_span!("frame_matrix").entered();

        let fps = source.fps();
        let frame_count = (fps * source.duration()).floor();
        if !(frame_count.is_finite() && frame_count >= 1.0) {
            return Err(Error::invalid(
                Stage::FrameMatrix,
                format!(
                    "video has no frames (fps={fps}, duration={}s)",
                    source.duration()
                ),
            ));
        }
        let frame_count = frame_count as usize;

        let mut data = Array2::<f64>::zeros((self.dims.pixels(), frame_count));
        for (i, mut column) in data.axis_iter_mut(Axis(1)).enumerate() {
            let t = i as f64 / fps;
            let frame = source
                .frame_at(t)
                .map_err(|source| Error::Source { time: t, source })?;

            let small = self.downsample(&to_gray(&frame));
            for (dst, src) in column.iter_mut().zip(small.as_raw()) {
                *dst = *src as f64 * 255.0;
            }
        }

        tracing::debug!(
            "Built {}x{} frame matrix from {} frames",
            data.nrows(),
            data.ncols(),
            frame_count
        );

        FrameMatrix::from_array(data, self.dims)
    }

    fn downsample(&self, gray: &GrayF32Image) -> GrayF32Image {
        if gray.dimensions() == (self.dims.width, self.dims.height) {
            return gray.clone();
        }
        // Triangle weights are non-negative, so samples stay within the input range
        imageops::resize(
            gray,
            self.dims.width,
            self.dims.height,
            imageops::FilterType::Triangle,
        )
    }
}

/// Mean of the first three channels, floored, normalized to [0, 1]
///
/// Float resizing clamps samples to [0, 1], so intensities are rescaled
/// back to [0, 255] only once they land in the matrix.
fn to_gray(frame: &image::DynamicImage) -> GrayF32Image {
    let rgb = frame.to_rgb8();
    GrayF32Image::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let mean = (p[0] as u32 + p[1] as u32 + p[2] as u32) / 3;
        Luma([mean as f32 / 255.0])
    })
}
