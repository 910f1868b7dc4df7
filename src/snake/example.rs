use std::path::PathBuf;
use std::time::Duration;

use ndarray::Array2;
use tracing::{info, warn};

use super::backend::{GacParams, SegmentationBackend, Threshold};
use super::error::Result;
use super::figure::{DisplaySurface, Figure};
use super::grayscale::{load_channel, load_grayscale};
use super::visualizer::{IterationVisualizer, DEFAULT_PAUSE};

/// How the input image is reduced to one intensity plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preprocess {
    /// Keep one channel of the decoded image.
    Channel(usize),
    /// Mix the RGB channels with luma weights.
    Luma,
}

/// Fixed configuration of the thyroid nodule ultrasound example.
#[derive(Clone, Debug)]
pub struct NoduleExample {
    pub image_path: PathBuf,
    pub preprocess: Preprocess,
    /// Edge indicator contrast sensitivity.
    pub alpha: f64,
    /// Edge indicator smoothing scale.
    pub sigma: f64,
    /// Initial circle centre as `(row, col)`.
    pub center: (f64, f64),
    pub radius: f64,
    pub gac: GacParams,
    /// Pause after each redraw.
    pub pause: Duration,
}

impl Default for NoduleExample {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("Dataset/US0023_0171.png"),
            preprocess: Preprocess::Channel(0),
            alpha: 1000.0,
            sigma: 5.48,
            center: (130.0, 170.0),
            radius: 20.0,
            gac: GacParams {
                iterations: 36,
                smoothing: 10,
                threshold: Threshold::Value(0.4),
                balloon: 1.0,
            },
            pause: DEFAULT_PAUSE,
        }
    }
}

impl NoduleExample {
    pub fn load(&self) -> Result<Array2<f64>> {
        match self.preprocess {
            Preprocess::Channel(channel) => load_channel(&self.image_path, channel),
            Preprocess::Luma => load_grayscale(&self.image_path),
        }
    }

    /// Load the image, segment it with `backend` while drawing every
    /// iteration on `figure`, then wait on the display.
    pub fn run<B, S>(&self, backend: &B, figure: Figure<S>) -> Result<Array2<f64>>
    where
        B: SegmentationBackend + ?Sized,
        S: DisplaySurface,
    {
        let img = self.load()?;
        info!(path = %self.image_path.display(), shape = ?img.dim(), "image loaded");

        let levelset = self.segment(img, backend, figure)?;
        Ok(levelset)
    }

    /// Everything after loading, for callers that already hold the image.
    pub fn segment<B, S>(&self, img: Array2<f64>, backend: &B, figure: Figure<S>) -> Result<Array2<f64>>
    where
        B: SegmentationBackend + ?Sized,
        S: DisplaySurface,
    {
        let (rows, cols) = img.dim();
        let (cy, cx) = self.center;
        if cy < 0.0 || cx < 0.0 || cy >= rows as f64 || cx >= cols as f64 {
            warn!(center = ?self.center, shape = ?img.dim(), "initial circle centre lies outside the image");
        }

        let gimg = backend.edge_indicator(img.view(), self.alpha, self.sigma)?;
        let init_ls = backend.circle_level_set(img.dim(), self.center, self.radius)?;

        let mut visualizer = IterationVisualizer::new(img.view(), figure)?.with_pause(self.pause);
        let levelset = backend.geodesic_active_contour(gimg.view(), init_ls.view(), &self.gac, &mut visualizer)?;
        info!(
            iterations = self.gac.iterations,
            updates = visualizer.updates(),
            area = levelset.iter().filter(|v| **v > 0.5).count(),
            "segmentation finished"
        );

        visualizer.show()?;
        Ok(levelset)
    }
}
