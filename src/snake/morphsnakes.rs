//! Reference backend: morphological geodesic active contours on 2D grids.
//!
//! Level-sets are binary (`0`/`1`). Each iteration applies the balloon force,
//! the image attachment term and `smoothing` rounds of the morphological
//! curvature operator, alternating `SI∘IS` and `IS∘SI`.

use itertools::iproduct;
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use tracing::debug;

use super::backend::{GacParams, IterationSink, SegmentationBackend, Threshold};
use super::error::{Result, SnakeError};

// Offsets of the four 3-pixel line elements through the centre.
const LINES: [[(isize, isize); 3]; 4] = [
    [(-1, -1), (0, 0), (1, 1)],
    [(-1, 0), (0, 0), (1, 0)],
    [(-1, 1), (0, 0), (1, -1)],
    [(0, -1), (0, 0), (0, 1)],
];

const TRUNCATE: f64 = 4.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct MorphSnakes;

impl MorphSnakes {
    pub fn new() -> Self {
        MorphSnakes
    }
}

impl SegmentationBackend for MorphSnakes {
    fn edge_indicator(&self, image: ArrayView2<'_, f64>, alpha: f64, sigma: f64) -> Result<Array2<f64>> {
        if sigma.is_nan() || sigma <= 0.0 {
            return Err(SnakeError::InvalidParameter {
                name: "sigma",
                reason: format!("must be positive, got {sigma}"),
            });
        }
        if alpha.is_nan() || alpha < 0.0 {
            return Err(SnakeError::InvalidParameter {
                name: "alpha",
                reason: format!("must be non-negative, got {alpha}"),
            });
        }

        let gradnorm = gaussian_gradient_magnitude(image, sigma);
        Ok(gradnorm.mapv(|g| 1.0 / (1.0 + alpha * g).sqrt()))
    }

    fn circle_level_set(&self, shape: (usize, usize), center: (f64, f64), radius: f64) -> Result<Array2<f64>> {
        let (cy, cx) = center;
        Ok(Array2::from_shape_fn(shape, |(r, c)| {
            let d = ((r as f64 - cy).powi(2) + (c as f64 - cx).powi(2)).sqrt();
            if radius - d > 0.0 {
                1.0
            } else {
                0.0
            }
        }))
    }

    fn geodesic_active_contour(
        &self,
        edge: ArrayView2<'_, f64>,
        init: ArrayView2<'_, f64>,
        params: &GacParams,
        sink: &mut dyn IterationSink,
    ) -> Result<Array2<f64>> {
        SnakeError::check_shape(edge.dim(), init.dim())?;

        let threshold = match params.threshold {
            Threshold::Auto => percentile(edge, 40.0),
            Threshold::Value(v) => v,
        };
        debug!(?params, threshold, shape = ?edge.dim(), "starting geodesic active contour");

        let (d_edge_r, d_edge_c) = gradient(edge);
        let balloon_mask = (params.balloon != 0.0).then(|| edge.mapv(|g| g > threshold / params.balloon.abs()));

        let mut u: Array2<u8> = init.mapv(|v| (v > 0.0) as u8);
        sink.on_iteration(u.mapv(f64::from).view())?;

        let mut smooth_turn = 0usize;
        for _ in 0..params.iterations {
            if let Some(mask) = &balloon_mask {
                let aux = if params.balloon > 0.0 { dilate_square(&u) } else { erode_square(&u) };
                Zip::from(&mut u).and(mask).and(&aux).for_each(|u, &m, &a| {
                    if m {
                        *u = a;
                    }
                });
            }

            let (du_r, du_c) = gradient(u.mapv(f64::from).view());
            Zip::from(&mut u)
                .and(&d_edge_r)
                .and(&d_edge_c)
                .and(&du_r)
                .and(&du_c)
                .for_each(|u, &er, &ec, &ur, &uc| {
                    let aux = er * ur + ec * uc;
                    if aux > 0.0 {
                        *u = 1;
                    } else if aux < 0.0 {
                        *u = 0;
                    }
                });

            for _ in 0..params.smoothing {
                u = if smooth_turn % 2 == 0 { sup_inf(&inf_sup(&u)) } else { inf_sup(&sup_inf(&u)) };
                smooth_turn += 1;
            }

            sink.on_iteration(u.mapv(f64::from).view())?;
        }

        Ok(u.mapv(f64::from))
    }
}

fn offset(idx: usize, delta: isize, len: usize) -> Option<usize> {
    let i = idx as isize + delta;
    (i >= 0 && (i as usize) < len).then_some(i as usize)
}

// Out-of-bounds neighbours are ignored.
fn dilate_square(u: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = u.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        iproduct!(-1..=1, -1..=1)
            .filter_map(|(dr, dc)| Some(u[[offset(r, dr, rows)?, offset(c, dc, cols)?]]))
            .max()
            .unwrap_or(0)
    })
}

// Out-of-bounds neighbours count as zero.
fn erode_square(u: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = u.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        iproduct!(-1..=1, -1..=1)
            .map(|(dr, dc)| match (offset(r, dr, rows), offset(c, dc, cols)) {
                (Some(rr), Some(cc)) => u[[rr, cc]],
                _ => 0,
            })
            .min()
            .unwrap_or(0)
    })
}

fn sup_inf(u: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = u.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        LINES
            .iter()
            .map(|line| {
                line.iter()
                    .map(|&(dr, dc)| match (offset(r, dr, rows), offset(c, dc, cols)) {
                        (Some(rr), Some(cc)) => u[[rr, cc]],
                        _ => 0,
                    })
                    .min()
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0)
    })
}

fn inf_sup(u: &Array2<u8>) -> Array2<u8> {
    let (rows, cols) = u.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        LINES
            .iter()
            .map(|line| {
                line.iter()
                    .filter_map(|&(dr, dc)| Some(u[[offset(r, dr, rows)?, offset(c, dc, cols)?]]))
                    .max()
                    .unwrap_or(0)
            })
            .min()
            .unwrap_or(0)
    })
}

/// Central differences inside, one-sided at the borders; axes shorter than
/// two samples get a zero derivative.
fn gradient(field: ArrayView2<'_, f64>) -> (Array2<f64>, Array2<f64>) {
    (gradient_along(field, Axis(0)), gradient_along(field, Axis(1)))
}

fn gradient_along(field: ArrayView2<'_, f64>, axis: Axis) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros(field.dim());
    let n = field.len_of(axis);
    if n < 2 {
        return out;
    }
    for (mut dst, src) in out.lanes_mut(axis).into_iter().zip(field.lanes(axis)) {
        dst[0] = src[1] - src[0];
        dst[n - 1] = src[n - 1] - src[n - 2];
        for i in 1..n - 1 {
            dst[i] = (src[i + 1] - src[i - 1]) / 2.0;
        }
    }
    out
}

fn gaussian_kernel(sigma: f64, order: u8) -> Array1<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    let mut kernel = Array1::from_iter((-radius..=radius).map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp()));
    let sum = kernel.sum();
    kernel /= sum;
    if order == 1 {
        for (k, x) in kernel.iter_mut().zip(-radius..=radius) {
            *k *= -(x as f64) / (sigma * sigma);
        }
    }
    kernel
}

// Correlate every lane along `axis` with `kernel`, repeating edge samples.
fn correlate_axis(field: ArrayView2<'_, f64>, kernel: &Array1<f64>, axis: Axis) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros(field.dim());
    let n = field.len_of(axis);
    if n == 0 {
        return out;
    }
    let radius = (kernel.len() / 2) as isize;
    for (mut dst, src) in out.lanes_mut(axis).into_iter().zip(field.lanes(axis)) {
        for i in 0..n {
            dst[i] = kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let j = (i as isize + k as isize - radius).clamp(0, n as isize - 1) as usize;
                    w * src[j]
                })
                .sum();
        }
    }
    out
}

fn gaussian_gradient_magnitude(image: ArrayView2<'_, f64>, sigma: f64) -> Array2<f64> {
    let smooth = gaussian_kernel(sigma, 0);
    let deriv = gaussian_kernel(sigma, 1);

    let d_rows = correlate_axis(correlate_axis(image, &deriv, Axis(0)).view(), &smooth, Axis(1));
    let d_cols = correlate_axis(correlate_axis(image, &smooth, Axis(0)).view(), &deriv, Axis(1));
    Zip::from(&d_rows).and(&d_cols).map_collect(|a, b| a.hypot(*b))
}

/// Percentile with linear interpolation between closest ranks.
fn percentile(field: ArrayView2<'_, f64>, q: f64) -> f64 {
    let mut values: Vec<f64> = field.iter().copied().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let pos = q / 100.0 * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}
