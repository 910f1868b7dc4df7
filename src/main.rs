use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nodule_contour::{DisplaySurface, Figure, MorphSnakes, NoduleExample, PreviewFile, Preprocess, RerunViewer};

/// Segment a nodule with a morphological geodesic active contour and watch it evolve.
#[derive(Parser, Debug)]
#[command(name = "nodule_contour")]
struct Args {
    /// Input image; defaults to the bundled ultrasound slice
    image: Option<PathBuf>,

    /// Write each frame to this PNG instead of opening the rerun viewer
    #[arg(short, long)]
    preview: Option<PathBuf>,

    /// Convert RGB to gray instead of keeping a single channel
    #[arg(short, long, conflicts_with = "channel")]
    grayscale: bool,

    /// Channel kept from the decoded image
    #[arg(short, long)]
    channel: Option<usize>,

    /// Pause after each redraw, in milliseconds
    #[arg(long, default_value_t = 1)]
    pause_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut example = NoduleExample::default();
    if let Some(image) = args.image {
        example.image_path = image;
    }
    example.preprocess = if args.grayscale {
        Preprocess::Luma
    } else {
        Preprocess::Channel(args.channel.unwrap_or(0))
    };
    example.pause = Duration::from_millis(args.pause_ms);

    let surface: Box<dyn DisplaySurface> = match &args.preview {
        Some(path) => Box::new(PreviewFile::new(path)),
        None => Box::new(RerunViewer::spawn("nodule_contour").context("opening the rerun viewer")?),
    };
    let figure = Figure::new(surface);
    let levelset = example
        .run(&MorphSnakes::new(), figure)
        .with_context(|| format!("segmenting {}", example.image_path.display()))?;

    info!(
        area = levelset.iter().filter(|v| **v > 0.5).count(),
        "done"
    );
    Ok(())
}
