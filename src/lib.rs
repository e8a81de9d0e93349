//! Static background extraction from video through low-rank approximation.
//!
//! Each downsampled grayscale frame becomes one column of a frame matrix.
//! A rank-r factorization of that matrix is the background and the
//! residual is the foreground. Two factorizations are available: the exact
//! economy SVD and a randomized SVD built from a single random projection.

pub mod background;
pub mod capture;
pub mod decompose;
pub mod error;
pub mod frames;
pub mod pipeline;
pub mod report;

pub use background::Background;
pub use capture::{FrameSource, ImageSequence};
pub use decompose::{Algorithm, Decomposer, Decomposition, ExactSvd, RandomizedSvd};
pub use error::{Error, Result, Stage};
pub use frames::{FrameDims, FrameMatrix, FrameMatrixBuilder};
pub use pipeline::{DecomposerRun, Pipeline, PipelineConfig, PipelineReport};
pub use report::{PngReport, ReportingSink};
