//! The boundary to the segmentation algorithm.
//!
//! Everything that evolves a contour lives behind [`SegmentationBackend`], so
//! the visualizer can be driven by the reference [`MorphSnakes`] backend or by
//! a scripted double in tests.
//!
//! [`MorphSnakes`]: super::morphsnakes::MorphSnakes

use ndarray::{Array2, ArrayView2};

use super::error::Result;

/// Receives the level-set after each solver iteration.
///
/// The view is only valid for the duration of the call. An error aborts the
/// solver loop and is returned from it unchanged.
pub trait IterationSink {
    fn on_iteration(&mut self, levelset: ArrayView2<'_, f64>) -> Result<()>;
}

impl<F> IterationSink for F
where
    F: FnMut(ArrayView2<'_, f64>) -> Result<()>,
{
    fn on_iteration(&mut self, levelset: ArrayView2<'_, f64>) -> Result<()> {
        self(levelset)
    }
}

/// Stopping threshold for the balloon force.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Threshold {
    /// Use the 40th percentile of the edge indicator.
    Auto,
    Value(f64),
}

/// Solver configuration besides the fields themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GacParams {
    pub iterations: usize,
    /// Curvature smoothing rounds per iteration.
    pub smoothing: usize,
    pub threshold: Threshold,
    /// Positive inflates, negative deflates, zero disables.
    pub balloon: f64,
}

impl Default for GacParams {
    fn default() -> Self {
        Self {
            iterations: 100,
            smoothing: 1,
            threshold: Threshold::Auto,
            balloon: 0.0,
        }
    }
}

pub trait SegmentationBackend {
    /// Edge indicator: close to 1 in flat regions, close to 0 on strong edges.
    fn edge_indicator(&self, image: ArrayView2<'_, f64>, alpha: f64, sigma: f64) -> Result<Array2<f64>>;

    /// Binary disk of `radius` around `center` given as `(row, col)`.
    fn circle_level_set(&self, shape: (usize, usize), center: (f64, f64), radius: f64) -> Result<Array2<f64>>;

    /// Run a geodesic active contour, reporting each iteration to `sink`.
    fn geodesic_active_contour(
        &self,
        edge: ArrayView2<'_, f64>,
        init: ArrayView2<'_, f64>,
        params: &GacParams,
        sink: &mut dyn IterationSink,
    ) -> Result<Array2<f64>>;
}
