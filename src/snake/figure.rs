//! A two panel figure rendered into an RGB frame.
//!
//! The left panel shows a grayscale background with at most one contour
//! overlay. The right panel shows a heatmap with a fixed colour range.

use std::time::Duration;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use ndarray::{Array2, ArrayView2};

use super::error::{Result, SnakeError};
use super::isocontour::ContourSet;

/// Where rendered frames go.
pub trait DisplaySurface {
    /// Present a freshly rendered frame.
    fn draw(&mut self, frame: &RgbImage) -> Result<()>;

    /// Yield to the display so it can catch up before the caller continues.
    fn pause(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }

    /// Wait until the user is done looking at the last frame.
    fn block(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for &mut S {
    fn draw(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).draw(frame)
    }

    fn pause(&mut self, interval: Duration) {
        (**self).pause(interval)
    }

    fn block(&mut self) -> Result<()> {
        (**self).block()
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn draw(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).draw(frame)
    }

    fn pause(&mut self, interval: Duration) {
        (**self).pause(interval)
    }

    fn block(&mut self) -> Result<()> {
        (**self).block()
    }
}

#[derive(Clone, Debug)]
pub struct FigureLayout {
    /// Output pixels per grid cell along each axis.
    pub scale: u32,
    /// Horizontal gap between the two panels, in output pixels.
    pub gap: u32,
    pub contour_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
}

impl Default for FigureLayout {
    fn default() -> Self {
        Self {
            scale: 2,
            gap: 8,
            contour_color: Rgb([255, 0, 0]),
            background_color: Rgb([255, 255, 255]),
        }
    }
}

/// Left panel: a grayscale raster plus an optional contour.
#[derive(Clone, Debug)]
pub struct ImageAxes {
    background: Array2<f64>,
    range: (f64, f64),
    contour: Option<ContourSet>,
}

impl ImageAxes {
    pub fn new(background: ArrayView2<'_, f64>) -> Self {
        // Autoscale to the data like an image viewer would.
        let range = background.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
        Self {
            background: background.to_owned(),
            range,
            contour: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.background.dim()
    }

    pub fn background(&self) -> ArrayView2<'_, f64> {
        self.background.view()
    }

    pub fn contour(&self) -> Option<&ContourSet> {
        self.contour.as_ref()
    }

    /// Number of contour overlays currently drawn; never more than one.
    pub fn overlay_count(&self) -> usize {
        self.contour.iter().count()
    }

    pub fn remove_contour(&mut self) -> Option<ContourSet> {
        self.contour.take()
    }

    pub fn set_contour(&mut self, contour: ContourSet) {
        self.contour = Some(contour);
    }

    fn gray(&self, value: f64) -> u8 {
        let (lo, hi) = self.range;
        if hi <= lo {
            return 0;
        }
        (((value - lo) / (hi - lo)).clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Right panel: raw data mapped through a fixed colour range.
#[derive(Clone, Debug)]
pub struct HeatmapAxes {
    data: Array2<f64>,
    clim: (f64, f64),
}

impl HeatmapAxes {
    pub fn zeros(shape: (usize, usize), clim: (f64, f64)) -> Self {
        Self {
            data: Array2::zeros(shape),
            clim,
        }
    }

    pub fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn clim(&self) -> (f64, f64) {
        self.clim
    }

    /// Replace the displayed values. The shape must not change.
    pub fn set_data(&mut self, data: ArrayView2<'_, f64>) -> Result<()> {
        SnakeError::check_shape(self.data.dim(), data.dim())?;
        self.data.assign(&data);
        Ok(())
    }

    fn color(&self, value: f64) -> Rgb<u8> {
        let (vmin, vmax) = self.clim;
        if value.is_nan() {
            return Rgb([0, 0, 0]);
        }
        let t = if vmax > vmin { (value - vmin) / (vmax - vmin) } else { 0.0 };
        viridis(t.clamp(0.0, 1.0))
    }
}

// Sampled control points of the viridis colour map.
const VIRIDIS: [[f64; 3]; 9] = [
    [68.0, 1.0, 84.0],
    [71.0, 44.0, 122.0],
    [59.0, 81.0, 139.0],
    [44.0, 113.0, 142.0],
    [33.0, 144.0, 141.0],
    [39.0, 173.0, 129.0],
    [92.0, 200.0, 99.0],
    [170.0, 220.0, 50.0],
    [253.0, 231.0, 37.0],
];

fn viridis(t: f64) -> Rgb<u8> {
    let pos = t * (VIRIDIS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = pos - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    let mix = |k: usize| (a[k] + (b[k] - a[k]) * frac).round() as u8;
    Rgb([mix(0), mix(1), mix(2)])
}

/// Owns the display surface and turns axes into frames.
pub struct Figure<S: DisplaySurface> {
    surface: S,
    layout: FigureLayout,
    frames_drawn: usize,
}

impl<S: DisplaySurface> Figure<S> {
    pub fn new(surface: S) -> Self {
        Self::with_layout(surface, FigureLayout::default())
    }

    pub fn with_layout(surface: S, layout: FigureLayout) -> Self {
        Self {
            surface,
            layout,
            frames_drawn: 0,
        }
    }

    /// Reset the frame counter before the figure is reused.
    pub fn clear(&mut self) {
        self.frames_drawn = 0;
    }

    pub fn layout(&self) -> &FigureLayout {
        &self.layout
    }

    pub fn frames_drawn(&self) -> usize {
        self.frames_drawn
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Compose both panels side by side.
    pub fn render(&self, image_axes: &ImageAxes, levelset_axes: &HeatmapAxes) -> RgbImage {
        let (rows, cols) = image_axes.shape();
        let scale = self.layout.scale.max(1);
        let panel_w = cols as u32 * scale;
        let panel_h = rows as u32 * scale;
        let right_x = panel_w + self.layout.gap;

        let mut frame = RgbImage::from_pixel(2 * panel_w + self.layout.gap, panel_h, self.layout.background_color);
        for (x, y, pixel) in frame.enumerate_pixels_mut() {
            let (r, c) = ((y / scale) as usize, (x / scale) as usize);
            if x < panel_w {
                let g = image_axes.gray(image_axes.background[[r, c]]);
                *pixel = Rgb([g, g, g]);
            } else if x >= right_x {
                let c = ((x - right_x) / scale) as usize;
                if let Some(v) = levelset_axes.data.get((r, c)) {
                    *pixel = levelset_axes.color(*v);
                }
            }
        }

        if let Some(contour) = image_axes.contour() {
            // Sample (row, col) is centred on its scale x scale block.
            let offset = (scale as f32 - 1.0) / 2.0;
            let to_px = |v: f64| v as f32 * scale as f32 + offset;
            for [a, b] in contour.segments() {
                draw_line_segment_mut(
                    &mut frame,
                    (to_px(a.x), to_px(a.y)),
                    (to_px(b.x), to_px(b.y)),
                    self.layout.contour_color,
                );
            }
        }

        frame
    }

    /// Render and present a frame, then pause for `interval`.
    pub fn redraw(&mut self, image_axes: &ImageAxes, levelset_axes: &HeatmapAxes, interval: Duration) -> Result<()> {
        let frame = self.render(image_axes, levelset_axes);
        self.surface.draw(&frame)?;
        self.frames_drawn += 1;
        self.surface.pause(interval);
        Ok(())
    }

    pub fn block(&mut self) -> Result<()> {
        self.surface.block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::isocontour::find_isocontour;
    use ndarray::array;

    struct Discard;

    impl DisplaySurface for Discard {
        fn draw(&mut self, _frame: &RgbImage) -> Result<()> {
            Ok(())
        }

        fn pause(&mut self, _interval: Duration) {}
    }

    #[test]
    fn frame_holds_both_panels() {
        let figure = Figure::with_layout(
            Discard,
            FigureLayout {
                scale: 3,
                gap: 4,
                ..Default::default()
            },
        );
        let image_axes = ImageAxes::new(Array2::<f64>::zeros((5, 7)).view());
        let heatmap = HeatmapAxes::zeros((5, 7), (0.0, 1.0));

        let frame = figure.render(&image_axes, &heatmap);
        assert_eq!(frame.dimensions(), (2 * 21 + 4, 15));
        assert_eq!(*frame.get_pixel(21 + 1, 0), Rgb([255, 255, 255]));
    }

    #[test]
    fn background_is_autoscaled() {
        let axes = ImageAxes::new(array![[0.2, 0.4], [0.6, 0.2]].view());
        assert_eq!(axes.gray(0.2), 0);
        assert_eq!(axes.gray(0.6), 255);
    }

    #[test]
    fn heatmap_clips_out_of_range_values() {
        let mut heatmap = HeatmapAxes::zeros((1, 2), (0.0, 1.0));
        heatmap.set_data(array![[-3.0, 7.0]].view()).unwrap();

        assert_eq!(heatmap.color(-3.0), heatmap.color(0.0));
        assert_eq!(heatmap.color(7.0), heatmap.color(1.0));
        assert_eq!(heatmap.data()[[0, 1]], 7.0);
    }

    #[test]
    fn heatmap_rejects_new_shape() {
        let mut heatmap = HeatmapAxes::zeros((2, 2), (0.0, 1.0));
        let err = heatmap.set_data(Array2::<f64>::zeros((3, 2)).view()).unwrap_err();
        assert!(matches!(
            err,
            SnakeError::ShapeMismatch {
                expected: (2, 2),
                found: (3, 2)
            }
        ));
    }

    #[test]
    fn contour_is_drawn_in_its_colour() {
        let figure = Figure::with_layout(
            Discard,
            FigureLayout {
                scale: 1,
                gap: 0,
                ..Default::default()
            },
        );
        let field = array![[0.0, 1.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 1.0]];
        let mut image_axes = ImageAxes::new(Array2::<f64>::zeros((3, 3)).view());
        image_axes.set_contour(find_isocontour(field.view(), 0.5));

        let frame = figure.render(&image_axes, &HeatmapAxes::zeros((3, 3), (0.0, 1.0)));
        let red = (0..3).filter(|&x| *frame.get_pixel(x, 1) == Rgb([255, 0, 0])).count();
        assert!(red >= 1);
    }
}
