use std::time::Duration;

use ndarray::ArrayView2;
use tracing::debug;

use super::backend::IterationSink;
use super::error::{Result, SnakeError};
use super::figure::{DisplaySurface, Figure, HeatmapAxes, ImageAxes};
use super::isocontour::find_isocontour;

/// Level traced on the background panel.
pub const CONTOUR_LEVEL: f64 = 0.5;
/// Fixed colour range of the level-set panel.
pub const LEVELSET_CLIM: (f64, f64) = (0.0, 1.0);
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualizerState {
    /// Background shown, no level-set received yet.
    Uninitialized,
    /// At least one level-set has been drawn.
    Steady,
}

/// Redraws the evolving level-set over its source image, one solver iteration
/// at a time.
pub struct IterationVisualizer<S: DisplaySurface> {
    figure: Figure<S>,
    image_axes: ImageAxes,
    levelset_axes: HeatmapAxes,
    pause: Duration,
    updates: usize,
}

impl<S: DisplaySurface> IterationVisualizer<S> {
    /// Set up both panels on `figure`, clearing whatever it showed before, and
    /// present the initial frame.
    pub fn new(background: ArrayView2<'_, f64>, mut figure: Figure<S>) -> Result<Self> {
        figure.clear();
        let image_axes = ImageAxes::new(background);
        let levelset_axes = HeatmapAxes::zeros(background.dim(), LEVELSET_CLIM);

        let mut visualizer = Self {
            figure,
            image_axes,
            levelset_axes,
            pause: DEFAULT_PAUSE,
            updates: 0,
        };
        visualizer.redraw()?;
        Ok(visualizer)
    }

    /// Like [`IterationVisualizer::new`] on a fresh figure over `surface`.
    pub fn on_surface(background: ArrayView2<'_, f64>, surface: S) -> Result<Self> {
        Self::new(background, Figure::new(surface))
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Draw `levelset`: swap the contour overlay, replace the heatmap data,
    /// redraw and pause.
    ///
    /// A level-set whose shape differs from the background fails with
    /// [`SnakeError::ShapeMismatch`] before anything is touched.
    pub fn update(&mut self, levelset: ArrayView2<'_, f64>) -> Result<()> {
        SnakeError::check_shape(self.image_axes.shape(), levelset.dim())?;

        self.image_axes.remove_contour();
        let contour = find_isocontour(levelset, CONTOUR_LEVEL);
        debug!(iteration = self.updates, segments = contour.len(), "contour traced");
        self.image_axes.set_contour(contour);
        self.levelset_axes.set_data(levelset)?;

        self.updates += 1;
        self.redraw()
    }

    fn redraw(&mut self) -> Result<()> {
        self.figure.redraw(&self.image_axes, &self.levelset_axes, self.pause)
    }

    pub fn state(&self) -> VisualizerState {
        if self.updates == 0 {
            VisualizerState::Uninitialized
        } else {
            VisualizerState::Steady
        }
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn image_axes(&self) -> &ImageAxes {
        &self.image_axes
    }

    pub fn levelset_axes(&self) -> &HeatmapAxes {
        &self.levelset_axes
    }

    pub fn figure(&self) -> &Figure<S> {
        &self.figure
    }

    /// Present the final frame and wait on the display surface.
    pub fn show(&mut self) -> Result<()> {
        self.figure.block()
    }

    pub fn into_figure(self) -> Figure<S> {
        self.figure
    }
}

impl<S: DisplaySurface> IterationSink for IterationVisualizer<S> {
    fn on_iteration(&mut self, levelset: ArrayView2<'_, f64>) -> Result<()> {
        self.update(levelset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::display::FrameRecorder;
    use ndarray::Array2;

    #[test]
    fn construction_draws_background_once() {
        let background = Array2::<f64>::zeros((3, 4));
        let vis = IterationVisualizer::on_surface(background.view(), FrameRecorder::new()).unwrap();

        assert_eq!(vis.state(), VisualizerState::Uninitialized);
        assert_eq!(vis.figure().surface().frames().len(), 1);
        assert_eq!(vis.figure().surface().pauses(), 1);
        assert!(vis.levelset_axes().data().iter().all(|v| *v == 0.0));
        assert_eq!(vis.levelset_axes().clim(), (0.0, 1.0));
        assert!(vis.image_axes().contour().is_none());
    }

    #[test]
    fn mismatch_leaves_state_untouched() {
        let background = Array2::<f64>::zeros((3, 3));
        let mut vis = IterationVisualizer::on_surface(background.view(), FrameRecorder::new()).unwrap();
        vis.update(Array2::from_elem((3, 3), 1.0).view()).unwrap();

        let err = vis.update(Array2::<f64>::zeros((3, 4)).view()).unwrap_err();
        assert!(matches!(err, SnakeError::ShapeMismatch { .. }));
        assert_eq!(vis.updates(), 1);
        assert!(vis.levelset_axes().data().iter().all(|v| *v == 1.0));
        assert_eq!(vis.figure().surface().frames().len(), 2);
    }

    #[test]
    fn reused_figure_is_cleared() {
        let background = Array2::<f64>::zeros((2, 2));
        let mut vis = IterationVisualizer::on_surface(background.view(), FrameRecorder::new()).unwrap();
        vis.update(background.view()).unwrap();

        let vis = IterationVisualizer::new(background.view(), vis.into_figure()).unwrap();
        assert_eq!(vis.figure().frames_drawn(), 1);
        assert_eq!(vis.figure().surface().frames().len(), 3);
        assert_eq!(vis.state(), VisualizerState::Uninitialized);
    }
}
