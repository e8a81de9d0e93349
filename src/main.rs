use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lowrank_bg::{Algorithm, ImageSequence, Pipeline, PipelineConfig, PngReport};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AlgorithmArg {
    Exact,
    Randomized,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Exact => Algorithm::Exact,
            AlgorithmArg::Randomized => Algorithm::Randomized,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory of video frames (png, jpg, bmp, tiff), ordered by file name
    #[arg(short, long)]
    input: String,

    /// Frame rate of the sequence
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Downsampling factor in (0, 1]
    #[arg(short, long, default_value_t = 0.5)]
    scale: f64,

    /// Target rank k of the randomized projection
    #[arg(short = 'k', long, default_value_t = 10)]
    rank: usize,

    /// Truncation rank r of the reconstructed background
    #[arg(short = 'r', long, default_value_t = 1)]
    truncation: usize,

    /// Frame indices shown in the comparison grid
    #[arg(long, value_delimiter = ',', default_value = "0,150,300,450")]
    frame_ids: Vec<usize>,

    /// Seed for the random projection
    /// If not provided, a fresh seed is drawn from the OS
    #[arg(long)]
    seed: Option<u64>,

    /// Decomposition to run (repeat for several)
    #[arg(short, long, value_enum, default_values_t = [AlgorithmArg::Exact, AlgorithmArg::Randomized])]
    algorithm: Vec<AlgorithmArg>,

    /// Directory for the exported images
    #[arg(short, long, default_value = ".")]
    output_dir: String,

    /// Heat-map canvas width
    #[arg(long, default_value_t = 1200)]
    heatmap_width: u32,

    /// Heat-map canvas height
    #[arg(long, default_value_t = 600)]
    heatmap_height: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scale: self.scale,
            rank: self.rank,
            truncation: self.truncation,
            frame_ids: self.frame_ids.clone(),
            seed: self.seed,
            algorithms: self.algorithm.iter().map(|&a| a.into()).collect(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("lowrank-bg starting");
    tracing::info!("Scale: {}, k={}, r={}", args.scale, args.rank, args.truncation);

    let pipeline = Pipeline::new(args.pipeline_config()).context("Invalid configuration")?;

    let mut source = ImageSequence::open(&args.input, args.fps)
        .context("Failed to open frame sequence")?;
    tracing::info!("Loaded {} frames from {}", source.frame_count(), args.input);

    let mut report = PngReport::new(&args.output_dir, args.heatmap_width, args.heatmap_height)
        .context("Failed to initialize report output")?;

    let summary = pipeline.run(&mut source, &mut report)?;

    for run in &summary.runs {
        tracing::info!(
            "{}: {} components in {:.2}s, rank-{} error {:.3e}",
            run.algorithm.name(),
            run.components,
            run.elapsed.as_secs_f64(),
            pipeline.config().truncation,
            run.relative_error
        );
    }

    Ok(())
}
