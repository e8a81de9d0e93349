use image::{DynamicImage, Rgb, RgbImage};
use lowrank_bg::report::{label_font, GridLayout};
use lowrank_bg::{
    Algorithm, Background, Error, FrameDims, FrameMatrix, FrameSource, Pipeline, PipelineConfig,
    PngReport, ReportingSink, Stage,
};

/// Static gradient with a bright square sliding left to right
struct SlidingSquare {
    width: u32,
    height: u32,
    fps: f64,
    frames: u32,
}

impl FrameSource for SlidingSquare {
    fn frame_at(&mut self, t: f64) -> anyhow::Result<DynamicImage> {
        let index = (t * self.fps).round() as u32;
        let left = index * 2;
        let img = RgbImage::from_fn(self.width, self.height, |x, y| {
            if x >= left && x < left + 4 && y >= 8 && y < 12 {
                Rgb([255, 255, 255])
            } else {
                let v = (40 + x * 3 + y) as u8;
                Rgb([v, v, v])
            }
        });
        Ok(DynamicImage::ImageRgb8(img))
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn duration(&self) -> f64 {
        self.frames as f64 / self.fps
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn source() -> SlidingSquare {
    SlidingSquare {
        width: 40,
        height: 20,
        fps: 10.0,
        frames: 16,
    }
}

#[derive(Default)]
struct Collect {
    matrix_shape: Option<(usize, usize)>,
    backgrounds: Vec<(Algorithm, usize, Vec<usize>)>,
}

impl ReportingSink for Collect {
    fn frame_matrix(&mut self, matrix: &FrameMatrix) -> anyhow::Result<()> {
        self.matrix_shape = Some((matrix.pixels(), matrix.frames()));
        Ok(())
    }

    fn background(
        &mut self,
        algorithm: Algorithm,
        matrix: &FrameMatrix,
        background: &Background,
        frame_ids: &[usize],
    ) -> anyhow::Result<()> {
        assert_eq!(background.matrix().dim(), matrix.data().dim());
        self.backgrounds
            .push((algorithm, background.rank(), frame_ids.to_vec()));
        Ok(())
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        scale: 0.5,
        rank: 5,
        truncation: 1,
        frame_ids: vec![0, 7, 15],
        seed: Some(3),
        algorithms: vec![Algorithm::Exact, Algorithm::Randomized],
    }
}

#[test]
fn runs_both_decomposers_in_order() {
    let pipeline = Pipeline::new(config()).unwrap();
    let mut sink = Collect::default();
    let report = pipeline.run(&mut source(), &mut sink).unwrap();

    assert_eq!(report.dims.height, 10);
    assert_eq!(report.dims.width, 20);
    assert_eq!(report.matrix_shape, (200, 16));
    assert_eq!(sink.matrix_shape, Some((200, 16)));

    let algorithms: Vec<_> = sink.backgrounds.iter().map(|b| b.0).collect();
    assert_eq!(algorithms, vec![Algorithm::Exact, Algorithm::Randomized]);
    assert!(sink.backgrounds.iter().all(|b| b.1 == 1 && b.2 == vec![0, 7, 15]));

    let exact = report.run(Algorithm::Exact).unwrap();
    let randomized = report.run(Algorithm::Randomized).unwrap();
    assert_eq!(exact.components, 16);
    assert_eq!(randomized.components, 5);

    // the static gradient dominates, so rank one already explains most of it
    assert!(exact.relative_error < 0.5);
    // Eckart-Young: nothing beats the truncated exact SVD
    assert!(exact.relative_error <= randomized.relative_error + 1e-9);
}

#[test]
fn randomized_run_is_reproducible_with_seed() {
    let pipeline = Pipeline::new(PipelineConfig {
        algorithms: vec![Algorithm::Randomized],
        ..config()
    })
    .unwrap();

    let first = pipeline.run(&mut source(), &mut Collect::default()).unwrap();
    let second = pipeline.run(&mut source(), &mut Collect::default()).unwrap();
    assert_eq!(
        first.runs[0].leading_singular_values,
        second.runs[0].leading_singular_values
    );
}

#[test]
fn out_of_range_frame_id_fails_before_decomposing() {
    let pipeline = Pipeline::new(PipelineConfig {
        frame_ids: vec![0, 16],
        ..config()
    })
    .unwrap();
    let mut sink = Collect::default();
    let err = pipeline.run(&mut source(), &mut sink).unwrap_err();

    let typed = err.downcast_ref::<Error>().unwrap();
    assert_eq!(typed.stage(), Some(Stage::Report));
    assert!(sink.matrix_shape.is_none());
}

#[test]
fn truncation_beyond_exact_rank_is_invalid() {
    let mut short = SlidingSquare {
        frames: 3,
        ..source()
    };
    let pipeline = Pipeline::new(PipelineConfig {
        rank: 5,
        truncation: 4,
        frame_ids: vec![0],
        algorithms: vec![Algorithm::Exact],
        ..config()
    })
    .unwrap();

    let err = pipeline.run(&mut short, &mut Collect::default()).unwrap_err();
    let typed = err.downcast_ref::<Error>().unwrap();
    assert!(matches!(
        typed,
        Error::InvalidInput {
            stage: Stage::Background,
            ..
        }
    ));
}

#[test]
fn degenerate_video_is_invalid_input() {
    let mut empty = SlidingSquare {
        frames: 0,
        ..source()
    };
    let pipeline = Pipeline::new(config()).unwrap();
    let err = pipeline.run(&mut empty, &mut Collect::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidInput {
            stage: Stage::FrameMatrix,
            ..
        })
    ));
}

#[test]
fn png_report_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config()).unwrap();
    let mut report = PngReport::new(dir.path(), 120, 60).unwrap();
    pipeline.run(&mut source(), &mut report).unwrap();

    for name in [
        "aspect_of_A.png",
        "exact_svd_bkg.png",
        "exact_svd_frames.png",
        "randomized_svd_bkg.png",
        "randomized_svd_frames.png",
    ] {
        assert!(dir.path().join(name).is_file(), "{name} missing");
    }

    let grid = image::open(dir.path().join("randomized_svd_frames.png")).unwrap();
    let font = label_font().unwrap();
    let dims = FrameDims::new(10, 20).unwrap();
    let layout = GridLayout::new(dims, &config().frame_ids, &font);
    assert_eq!((grid.width(), grid.height()), layout.size());
    // labels add room beyond three 20x10 tiles per row
    assert!(grid.width() > 3 * 20 && grid.height() > 3 * 10);
}
