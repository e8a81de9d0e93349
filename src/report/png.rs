use super::ReportingSink;
use crate::background::Background;
use crate::decompose::Algorithm;
use crate::frames::{FrameDims, FrameMatrix};
use ab_glyph::{FontRef, PxScale};
use anyhow::{Context, Result};
use image::{imageops, GrayImage, Luma};
use imageproc::drawing::{draw_text_mut, text_size};
use ndarray::{Array2, ArrayView1};
use std::path::{Path, PathBuf};

const GRID_GAP: u32 = 4;
const LABEL_PAD: u32 = 4;
const LABEL_SCALE: f32 = 14.0;
const COLUMN_TITLES: [&str; 3] = ["Original video", "Background", "Foreground"];

// Embedded font data
const FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Font used for grid labels
pub fn label_font() -> Result<FontRef<'static>> {
    FontRef::try_from_slice(FONT_DATA).context("Failed to load embedded label font")
}

fn row_label(t: usize) -> String {
    format!("Frame {t}")
}

/// Rendered (width, height) of a label
fn label_size(font: &FontRef<'_>, text: &str) -> (u32, u32) {
    let (width, height) = text_size(PxScale::from(LABEL_SCALE), font, text);
    (width as u32, height as u32)
}

/// Writes grayscale PNG heat-maps and frame grids into a directory
pub struct PngReport {
    out_dir: PathBuf,
    font: FontRef<'static>,
    heatmap_width: u32,
    heatmap_height: u32,
}

impl PngReport {
    pub fn new<P: AsRef<Path>>(out_dir: P, heatmap_width: u32, heatmap_height: u32) -> Result<Self> {
        let out_dir = out_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        tracing::info!("Writing reports to {}", out_dir.display());

        Ok(Self {
            out_dir,
            font: label_font()?,
            heatmap_width: heatmap_width.max(1),
            heatmap_height: heatmap_height.max(1),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn save(&self, image: &GrayImage, name: &str) -> Result<()> {
        let path = self.out_dir.join(name);
        image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Saved {}", path.display());
        Ok(())
    }
}

impl ReportingSink for PngReport {
    fn frame_matrix(&mut self, matrix: &FrameMatrix) -> Result<()> {
        let _span = tracing::debug_span!("report_matrix").entered();
        let image = heatmap(matrix.data(), self.heatmap_width, self.heatmap_height);
        self.save(&image, "aspect_of_A.png")
    }

    fn background(
        &mut self,
        algorithm: Algorithm,
        matrix: &FrameMatrix,
        background: &Background,
        frame_ids: &[usize],
    ) -> Result<()> {
        let _span = tracing::debug_span!("report_background", algorithm = algorithm.name()).entered();
        let stem = algorithm.file_stem();

        let image = heatmap(background.matrix(), self.heatmap_width, self.heatmap_height);
        self.save(&image, &format!("{stem}_bkg.png"))?;

        if !frame_ids.is_empty() {
            let grid = frame_grid(matrix, background, frame_ids, &self.font)?;
            self.save(&grid, &format!("{stem}_frames.png"))?;
        }
        Ok(())
    }
}

/// Matrix rendered with rows as y and columns as x, stretched to a fixed canvas
pub fn heatmap(m: &Array2<f64>, width: u32, height: u32) -> GrayImage {
    let (rows, cols) = m.dim();
    let (lo, hi) = value_range(m.iter());
    let raw = GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([to_gray(m[[y as usize, x as usize]], lo, hi)])
    });

    if raw.dimensions() == (width, height) {
        raw
    } else {
        imageops::resize(&raw, width, height, imageops::FilterType::Triangle)
    }
}

/// Placement of labels and tiles in a frame comparison grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    dims: FrameDims,
    rows: u32,
    label_width: u32,
    header_height: u32,
    cell_width: u32,
}

impl GridLayout {
    pub fn new(dims: FrameDims, frame_ids: &[usize], font: &FontRef<'_>) -> Self {
        let label_width = frame_ids
            .iter()
            .map(|&t| label_size(font, &row_label(t)).0)
            .max()
            .unwrap_or(0)
            + 2 * LABEL_PAD;
        let (title_width, title_height) = COLUMN_TITLES
            .iter()
            .map(|title| label_size(font, title))
            .fold((0, 0), |(w, h), (tw, th)| (w.max(tw), h.max(th)));

        Self {
            dims,
            rows: frame_ids.len() as u32,
            label_width,
            header_height: title_height + 2 * LABEL_PAD,
            cell_width: dims.width.max(title_width + LABEL_PAD),
        }
    }

    /// Canvas (width, height)
    pub fn size(&self) -> (u32, u32) {
        let width = self.label_width + 3 * self.cell_width + 2 * GRID_GAP;
        let height = self.header_height
            + self.rows * self.dims.height
            + self.rows.saturating_sub(1) * GRID_GAP;
        (width, height)
    }

    /// Top-left corner of the tile in `row`, `col`
    pub fn tile_origin(&self, row: u32, col: u32) -> (u32, u32) {
        (
            self.label_width + col * (self.cell_width + GRID_GAP),
            self.header_height + row * (self.dims.height + GRID_GAP),
        )
    }
}

/// One row per frame index: original, background, foreground
///
/// Columns carry a title and rows a "Frame t" label. Each tile is
/// normalized on its own.
pub fn frame_grid(
    matrix: &FrameMatrix,
    background: &Background,
    frame_ids: &[usize],
    font: &FontRef<'_>,
) -> Result<GrayImage> {
    let dims = matrix.dims();
    let layout = GridLayout::new(dims, frame_ids, font);
    let (width, height) = layout.size();
    let mut grid = GrayImage::from_pixel(width, height, Luma([255]));
    let scale = PxScale::from(LABEL_SCALE);
    let ink = Luma([0]);

    for (col, title) in COLUMN_TITLES.iter().enumerate() {
        let (x, _) = layout.tile_origin(0, col as u32);
        draw_text_mut(&mut grid, ink, x as i32, LABEL_PAD as i32, scale, font, title);
    }

    for (row, &t) in frame_ids.iter().enumerate() {
        let original = matrix.frame(t)?;
        let bkg = background.frame(t)?;
        let fg = background.foreground(matrix.data(), t)?;

        let (_, y) = layout.tile_origin(row as u32, 0);
        let label = row_label(t);
        let label_height = label_size(font, &label).1;
        let label_y = y + dims.height.saturating_sub(label_height) / 2;
        draw_text_mut(&mut grid, ink, LABEL_PAD as i32, label_y as i32, scale, font, &label);

        for (col, values) in [original, bkg, fg.view()].into_iter().enumerate() {
            let (x, y) = layout.tile_origin(row as u32, col as u32);
            let tile = frame_tile(values, dims);
            imageops::replace(&mut grid, &tile, x as i64, y as i64);
        }
    }
    Ok(grid)
}

fn frame_tile(values: ArrayView1<'_, f64>, dims: FrameDims) -> GrayImage {
    let (lo, hi) = value_range(values.iter());
    GrayImage::from_fn(dims.width, dims.height, |x, y| {
        let idx = (y * dims.width + x) as usize;
        Luma([to_gray(values[idx], lo, hi)])
    })
}

fn value_range<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

fn to_gray(v: f64, lo: f64, hi: f64) -> u8 {
    let span = hi - lo;
    if !(span > f64::EPSILON) {
        return 0;
    }
    ((v - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8
}
