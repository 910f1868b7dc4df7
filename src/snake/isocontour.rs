//! Marching squares isocontour extraction.
//!
//! Coordinates follow image convention: `x` is the column, `y` the row, and
//! sample `(row, col)` sits at point `(col, row)`. A sample counts as above the
//! level only when it is strictly greater, so a field that equals the level
//! everywhere has no contour at all.

use itertools::iproduct;
use nalgebra::Point2;
use ndarray::ArrayView2;

pub type Segment = [Point2<f64>; 2];

/// Line segments tracing `field == level`.
#[derive(Clone, Debug, PartialEq)]
pub struct ContourSet {
    level: f64,
    segments: Vec<Segment>,
}

impl ContourSet {
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// Trace the `level` isocontour of `field`.
pub fn find_isocontour(field: ArrayView2<'_, f64>, level: f64) -> ContourSet {
    let (rows, cols) = field.dim();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 {
        return ContourSet { level, segments };
    }

    for (r, c) in iproduct!(0..rows - 1, 0..cols - 1) {
        let tl = field[[r, c]];
        let tr = field[[r, c + 1]];
        let br = field[[r + 1, c + 1]];
        let bl = field[[r + 1, c]];

        let case = (tl > level) as u8 | ((tr > level) as u8) << 1 | ((br > level) as u8) << 2 | ((bl > level) as u8) << 3;

        let point = |edge: Edge| -> Point2<f64> {
            let (r, c) = (r as f64, c as f64);
            match edge {
                Edge::Top => Point2::new(c + crossing(tl, tr, level), r),
                Edge::Right => Point2::new(c + 1.0, r + crossing(tr, br, level)),
                Edge::Bottom => Point2::new(c + crossing(bl, br, level), r + 1.0),
                Edge::Left => Point2::new(c, r + crossing(tl, bl, level)),
            }
        };
        let mut push = |a: Edge, b: Edge| segments.push([point(a), point(b)]);

        // Saddles are resolved by the mean of the four corners.
        let centre_above = (tl + tr + br + bl) / 4.0 > level;
        match case {
            0 | 15 => {}
            1 | 14 => push(Edge::Left, Edge::Top),
            2 | 13 => push(Edge::Top, Edge::Right),
            3 | 12 => push(Edge::Left, Edge::Right),
            4 | 11 => push(Edge::Right, Edge::Bottom),
            6 | 9 => push(Edge::Top, Edge::Bottom),
            7 | 8 => push(Edge::Left, Edge::Bottom),
            5 => {
                if centre_above {
                    push(Edge::Top, Edge::Right);
                    push(Edge::Bottom, Edge::Left);
                } else {
                    push(Edge::Left, Edge::Top);
                    push(Edge::Right, Edge::Bottom);
                }
            }
            10 => {
                if centre_above {
                    push(Edge::Left, Edge::Top);
                    push(Edge::Right, Edge::Bottom);
                } else {
                    push(Edge::Top, Edge::Right);
                    push(Edge::Bottom, Edge::Left);
                }
            }
            _ => unreachable!("marching squares case out of range"),
        }
    }

    ContourSet { level, segments }
}

// Fraction of the way from `a` to `b` where the level is crossed. A
// non-finite endpoint pulls the crossing onto the finite one.
fn crossing(a: f64, b: f64, level: f64) -> f64 {
    let t = (level - a) / (b - a);
    if t.is_finite() {
        return t.clamp(0.0, 1.0);
    }
    match (a.is_finite(), b.is_finite()) {
        (false, true) => 1.0,
        (true, false) => 0.0,
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn constant_field_at_level_has_no_contour() {
        let field = Array2::from_elem((4, 4), 0.5);
        assert!(find_isocontour(field.view(), 0.5).is_empty());
    }

    #[test]
    fn block_is_enclosed_by_a_closed_ring() {
        let mut field = Array2::<f64>::zeros((4, 4));
        field.slice_mut(ndarray::s![1..3, 1..3]).fill(1.0);

        let contour = find_isocontour(field.view(), 0.5);
        // Every cell around the centre block is crossed once, the centre cell is inside.
        assert_eq!(contour.len(), 8);
        for [a, b] in contour.segments() {
            for p in [a, b] {
                assert!(p.x >= 0.5 && p.x <= 2.5);
                assert!(p.y >= 0.5 && p.y <= 2.5);
            }
        }
    }

    #[test]
    fn crossing_is_interpolated() {
        let field = array![[0.0, 1.0], [0.0, 1.0]];
        let contour = find_isocontour(field.view(), 0.25);
        assert_eq!(contour.len(), 1);
        let [a, b] = contour.segments()[0];
        assert_relative_eq!(a.x, 0.25);
        assert_relative_eq!(b.x, 0.25);
        assert_relative_eq!((a.y - b.y).abs(), 1.0);
    }

    #[test]
    fn saddle_yields_two_segments() {
        let field = array![[1.0, 0.0], [0.0, 1.0]];
        assert_eq!(find_isocontour(field.view(), 0.5).len(), 2);
    }

    #[test]
    fn non_finite_samples_give_finite_points() {
        let field = array![
            [f64::INFINITY, 0.0, f64::NAN],
            [0.0, 1.0, 0.0],
            [f64::NEG_INFINITY, 2.0, 0.0]
        ];

        let contour = find_isocontour(field.view(), 0.5);
        assert!(!contour.is_empty());
        for [a, b] in contour.segments() {
            for p in [a, b] {
                assert!(p.x.is_finite() && p.y.is_finite(), "{p:?}");
                assert!((0.0..=2.0).contains(&p.x) && (0.0..=2.0).contains(&p.y));
            }
        }
    }

    #[test]
    fn infinite_corner_snaps_to_the_finite_one() {
        assert_eq!(crossing(f64::INFINITY, 0.0, 0.5), 1.0);
        assert_eq!(crossing(0.0, f64::NEG_INFINITY, 0.5), 0.0);
        assert_eq!(crossing(f64::INFINITY, f64::NEG_INFINITY, 0.5), 0.5);
    }

    #[test]
    fn thin_fields_have_no_cells() {
        let field = array![[0.0, 1.0, 0.0]];
        assert!(find_isocontour(field.view(), 0.5).is_empty());
    }
}
