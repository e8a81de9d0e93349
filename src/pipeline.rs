use crate::background::Background;
use crate::capture::FrameSource;
use crate::decompose::{Algorithm, Decomposer, ExactSvd, RandomizedSvd};
use crate::error::{Error, Stage};
use crate::frames::{FrameDims, FrameMatrixBuilder};
use crate::report::ReportingSink;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};

/// Parameters for one background-extraction run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Downsampling factor in (0, 1]
    pub scale: f64,
    /// Target rank k of the randomized projection
    pub rank: usize,
    /// Truncation rank r of the background reconstruction
    pub truncation: usize,
    /// Frames exported in the comparison grid
    pub frame_ids: Vec<usize>,
    /// Seed for the randomized projection; fresh entropy when unset
    pub seed: Option<u64>,
    pub algorithms: Vec<Algorithm>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scale: 0.5,
            rank: 10,
            truncation: 1,
            frame_ids: vec![0, 150, 300, 450],
            seed: None,
            algorithms: vec![Algorithm::Exact, Algorithm::Randomized],
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0 && self.scale <= 1.0) {
            return Err(Error::invalid(
                Stage::FrameMatrix,
                format!("scale factor {} outside (0, 1]", self.scale),
            ));
        }
        if self.algorithms.is_empty() {
            return Err(Error::invalid(Stage::Config, "no algorithm selected"));
        }
        if self.truncation == 0 {
            return Err(Error::invalid(Stage::Background, "truncation rank must be at least 1"));
        }
        if self.algorithms.contains(&Algorithm::Randomized) {
            if self.rank == 0 {
                return Err(Error::invalid(Stage::RandomizedSvd, "target rank must be at least 1"));
            }
            // r > k is a caller error, never silently clamped
            if self.truncation > self.rank {
                return Err(Error::invalid(
                    Stage::Background,
                    format!(
                        "truncation rank {} exceeds randomized target rank {}",
                        self.truncation, self.rank
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome of one decomposer
#[derive(Debug, Clone)]
pub struct DecomposerRun {
    pub algorithm: Algorithm,
    pub elapsed: Duration,
    /// Components k returned by the decomposer
    pub components: usize,
    /// Leading singular values, up to the truncation rank
    pub leading_singular_values: Vec<f64>,
    /// ‖A - background‖ / ‖A‖ at the truncation rank
    pub relative_error: f64,
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub dims: FrameDims,
    /// (pixels, frames)
    pub matrix_shape: (usize, usize),
    pub runs: Vec<DecomposerRun>,
}

impl PipelineReport {
    pub fn run(&self, algorithm: Algorithm) -> Option<&DecomposerRun> {
        self.runs.iter().find(|run| run.algorithm == algorithm)
    }
}

/// Frame extraction → decompositions → backgrounds → reports, in that order
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decomposer for `algorithm`, configured from this pipeline
    pub fn decomposer(&self, algorithm: Algorithm) -> Box<dyn Decomposer> {
        match algorithm {
            Algorithm::Exact => Box::new(ExactSvd::new()),
            Algorithm::Randomized => match self.config.seed {
                Some(seed) => Box::new(RandomizedSvd::seeded(self.config.rank, seed)),
                None => Box::new(RandomizedSvd::from_entropy(self.config.rank)),
            },
        }
    }

    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<PipelineReport>
    where
        S: FrameSource + ?Sized,
        K: ReportingSink + ?Sized,
    {
        let builder = FrameMatrixBuilder::scaled(source, self.config.scale)?;
        let dims = builder.dims();
        tracing::info!("Frame size: {}x{}", dims.height, dims.width);

        let extract_start = Instant::now();
        let matrix = builder
            .build(source)
            .context("Failed to build frame matrix")?;
        tracing::info!(
            "Video matrix size: {}x{} ({:.2}s)",
            matrix.pixels(),
            matrix.frames(),
            extract_start.elapsed().as_secs_f64()
        );

        if let Some(&t) = self.config.frame_ids.iter().find(|&&t| t >= matrix.frames()) {
            return Err(Error::invalid(
                Stage::Report,
                format!("frame index {t} outside [0, {})", matrix.frames()),
            )
            .into());
        }

        sink.frame_matrix(&matrix)
            .context("Failed to export frame matrix")?;

        let mut runs = Vec::with_capacity(self.config.algorithms.len());
        for &algorithm in &self.config.algorithms {
            let mut decomposer = self.decomposer(algorithm);

            let start = Instant::now();
            let decomposition = decomposer
                .decompose(matrix.data())
                .with_context(|| format!("{} failed", algorithm.name()))?;
            let elapsed = start.elapsed();

            tracing::info!(
                "{} elapsed time {:.2} seconds",
                algorithm.name(),
                elapsed.as_secs_f64()
            );
            tracing::info!(
                "SVD decomposition: U {:?}, S ({},), VT {:?}",
                decomposition.u().dim(),
                decomposition.rank(),
                decomposition.vt().dim()
            );

            let background = Background::reconstruct(&decomposition, self.config.truncation)
                .with_context(|| format!("Failed to reconstruct {} background", algorithm.name()))?;
            let relative_error = background.relative_error(matrix.data())?;
            tracing::info!(
                "{} rank-{} background relative error {:.3e}",
                algorithm.name(),
                background.rank(),
                relative_error
            );

            sink.background(algorithm, &matrix, &background, &self.config.frame_ids)
                .with_context(|| format!("Failed to export {} background", algorithm.name()))?;

            runs.push(DecomposerRun {
                algorithm,
                elapsed,
                components: decomposition.rank(),
                leading_singular_values: decomposition
                    .singular_values()
                    .iter()
                    .take(self.config.truncation)
                    .copied()
                    .collect(),
                relative_error,
            });
        }

        Ok(PipelineReport {
            dims,
            matrix_shape: (matrix.pixels(), matrix.frames()),
            runs,
        })
    }
}
