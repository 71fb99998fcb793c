use kurbo::Vec2;

use crate::{
    error::{ReeflineError, ReeflineResult},
    geom::{self, Shape},
    morph::{MidpointSubdivision, PathMorpher, path_to_points, points_to_path},
};

/// Interpolates between two keyframe geometries of the same shape.
///
/// Operates on the flat persisted point arrays; the Y-axis inversion commutes
/// with the lerp, so no codec round-trip is needed here.
pub struct Interpolator {
    morpher: Box<dyn PathMorpher>,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self::new(Box::new(MidpointSubdivision))
    }
}

impl Interpolator {
    pub fn new(morpher: Box<dyn PathMorpher>) -> Self {
        Self { morpher }
    }

    /// `t` is clamped to `[0, 1]`. At exactly 0 or 1 the corresponding
    /// keyframe array is returned bit-for-bit.
    pub fn interpolate(
        &self,
        shape: Shape,
        a: &[f64],
        b: &[f64],
        t: f64,
    ) -> ReeflineResult<Vec<f64>> {
        geom::validate_flat(shape, a)?;
        geom::validate_flat(shape, b)?;

        let t = t.clamp(0.0, 1.0);
        if t == 0.0 {
            return Ok(a.to_vec());
        }
        if t == 1.0 {
            return Ok(b.to_vec());
        }

        match shape {
            Shape::Rectangle | Shape::Ellipse => {
                let boxed = OrientedBox::lerp(
                    &OrientedBox::from_corners(a),
                    &OrientedBox::from_corners(b),
                    t,
                );
                Ok(boxed.to_corners().to_vec())
            }
            Shape::LineString | Shape::Polygon if a.len() != b.len() => {
                let path = self
                    .morpher
                    .morph(&points_to_path(a), &points_to_path(b), t)?;
                let flat = path_to_points(&path)?;
                geom::validate_flat(shape, &flat)?;
                Ok(flat)
            }
            _ => lerp_flat(shape, a, b, t),
        }
    }
}

fn lerp_flat(shape: Shape, a: &[f64], b: &[f64], t: f64) -> ReeflineResult<Vec<f64>> {
    if a.len() != b.len() {
        return Err(ReeflineError::invalid_shape_data(format!(
            "{} keyframes with {} and {} coordinates cannot be lerped",
            shape.tag(),
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x + (y - x) * t).collect())
}

/// Canonical 6-number form of a rectangle/ellipse: center, unit direction of
/// the first edge, width, height. Interpolating this form instead of raw
/// corners makes rotated boxes move rigidly; a naive per-corner lerp would
/// self-intersect during rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientedBox {
    pub center: Vec2,
    pub dir: Vec2,
    pub width: f64,
    pub height: f64,
}

impl OrientedBox {
    /// Expects 8 numbers (4 corners in edge order); callers validate arity.
    pub fn from_corners(flat: &[f64]) -> Self {
        let p = |i: usize| Vec2::new(flat[2 * i], flat[2 * i + 1]);
        let (p0, p1, p2, p3) = (p(0), p(1), p(2), p(3));

        let center = (p0 + p1 + p2 + p3) / 4.0;
        let edge = p1 - p0;
        let width = edge.hypot();
        let dir = if width > 0.0 {
            edge / width
        } else {
            Vec2::new(1.0, 0.0)
        };
        let height = (p3 - p0).hypot();

        Self {
            center,
            dir,
            width,
            height,
        }
    }

    pub fn to_corners(&self) -> [f64; 8] {
        let half_w = self.dir * (self.width / 2.0);
        let ortho = Vec2::new(-self.dir.y, self.dir.x);
        let half_h = ortho * (self.height / 2.0);

        let p0 = self.center - half_w - half_h;
        let p1 = self.center + half_w - half_h;
        let p2 = self.center + half_w + half_h;
        let p3 = self.center - half_w + half_h;
        [p0.x, p0.y, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y]
    }

    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let dir = a.dir + (b.dir - a.dir) * t;
        let norm = dir.hypot();
        // Opposite directions can cancel out; fall back to the start pose.
        let dir = if norm > 1e-9 { dir / norm } else { a.dir };

        Self {
            center: a.center + (b.center - a.center) * t,
            dir,
            width: a.width + (b.width - a.width) * t,
            height: a.height + (b.height - a.height) * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_10: [f64; 8] = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0];
    const SQUARE_20: [f64; 8] = [0.0, 0.0, 20.0, 0.0, 20.0, 20.0, 0.0, 20.0];

    #[test]
    fn endpoints_are_bit_for_bit() {
        let interp = Interpolator::default();
        for shape in [Shape::Point, Shape::Circle, Shape::Rectangle, Shape::LineString] {
            let (a, b): (Vec<f64>, Vec<f64>) = match shape {
                Shape::Point => (vec![0.0, 0.0], vec![10.0, 10.0]),
                Shape::Circle => (vec![0.0, 0.0, 1.0, 0.0], vec![5.0, 5.0, 2.0, 0.0]),
                Shape::Rectangle => (SQUARE_10.to_vec(), SQUARE_20.to_vec()),
                _ => (
                    vec![0.0, 0.0, 1.0, 1.0],
                    vec![0.0, 0.0, 1.0, 1.0, 2.0, 0.0],
                ),
            };
            assert_eq!(interp.interpolate(shape, &a, &b, 0.0).unwrap(), a);
            assert_eq!(interp.interpolate(shape, &a, &b, 1.0).unwrap(), b);
        }
    }

    #[test]
    fn point_midpoint() {
        let interp = Interpolator::default();
        let out = interp
            .interpolate(Shape::Point, &[0.0, 0.0], &[10.0, 10.0], 0.5)
            .unwrap();
        assert_eq!(out, vec![5.0, 5.0]);
    }

    #[test]
    fn circle_lerps_center_and_radius() {
        let interp = Interpolator::default();
        let out = interp
            .interpolate(
                Shape::Circle,
                &[0.0, 0.0, 2.0, 0.0],
                &[10.0, 0.0, 6.0, 0.0],
                0.5,
            )
            .unwrap();
        assert_eq!(out, vec![5.0, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn growing_rectangle_canonical_midpoint() {
        let interp = Interpolator::default();
        let out = interp
            .interpolate(Shape::Rectangle, &SQUARE_10, &SQUARE_20, 0.5)
            .unwrap();
        let boxed = OrientedBox::from_corners(&out);
        assert!((boxed.width - 15.0).abs() < 1e-9);
        assert!((boxed.height - 15.0).abs() < 1e-9);
        assert!((boxed.center.x - 7.5).abs() < 1e-9);
        assert!((boxed.center.y - 7.5).abs() < 1e-9);
    }

    #[test]
    fn rotated_rectangle_keeps_extent() {
        // Same square, corner order rotated a quarter turn.
        let rotated: [f64; 8] = [10.0, 0.0, 10.0, 10.0, 0.0, 10.0, 0.0, 0.0];
        let interp = Interpolator::default();
        let out = interp
            .interpolate(Shape::Rectangle, &SQUARE_10, &rotated, 0.5)
            .unwrap();
        let boxed = OrientedBox::from_corners(&out);
        assert!((boxed.width - 10.0).abs() < 1e-9);
        assert!((boxed.height - 10.0).abs() < 1e-9);
        // Halfway through a quarter turn the edge points along (1,1).
        assert!((boxed.dir.x - boxed.dir.y).abs() < 1e-9);
    }

    #[test]
    fn polygon_vertex_count_mismatch_morphs() {
        let interp = Interpolator::default();
        let a = [0.0, 0.0, 10.0, 0.0, 5.0, 10.0];
        let b = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0];
        let out = interp.interpolate(Shape::Polygon, &a, &b, 0.5).unwrap();
        assert_eq!(out.len(), 8, "morph output carries the larger vertex count");
        assert!(geom::validate_flat(Shape::Polygon, &out).is_ok());
    }

    #[test]
    fn equal_count_linestring_lerps_directly() {
        let interp = Interpolator::default();
        let out = interp
            .interpolate(
                Shape::LineString,
                &[0.0, 0.0, 10.0, 0.0],
                &[0.0, 10.0, 10.0, 10.0],
                0.5,
            )
            .unwrap();
        assert_eq!(out, vec![0.0, 5.0, 10.0, 5.0]);
    }
}
