use std::fmt::Write as _;

use kurbo::{BezPath, PathEl, Point};

use crate::error::{ReeflineError, ReeflineResult};

/// Interchangeable path-morphing strategy for line strings and polygons whose
/// keyframes carry different vertex counts. Paths are SVG-style
/// `M x y L x y ...` strings; implementations must return `a` at `t = 0` and
/// `b` at `t = 1` up to float formatting.
pub trait PathMorpher {
    fn morph(&self, a: &str, b: &str, t: f64) -> ReeflineResult<String>;
}

/// Default morph strategy: equalize vertex counts by splitting the longest
/// segment of the shorter path at its midpoint, then lerp vertex-by-vertex.
///
/// There is no guarantee that vertex `i` keeps its semantic identity across
/// the morph; the result is only used for smooth playback visualization.
#[derive(Clone, Copy, Debug, Default)]
pub struct MidpointSubdivision;

impl PathMorpher for MidpointSubdivision {
    fn morph(&self, a: &str, b: &str, t: f64) -> ReeflineResult<String> {
        let mut pa = parse_polyline(a)?;
        let mut pb = parse_polyline(b)?;

        equalize(&mut pa, pb.len());
        equalize(&mut pb, pa.len());

        let t = t.clamp(0.0, 1.0);
        let morphed: Vec<Point> = pa
            .iter()
            .zip(&pb)
            .map(|(p, q)| Point::new(p.x + (q.x - p.x) * t, p.y + (q.y - p.y) * t))
            .collect();
        Ok(polyline_to_path(&morphed))
    }
}

fn equalize(points: &mut Vec<Point>, target: usize) {
    while points.len() < target {
        if points.len() < 2 {
            // Degenerate single-vertex path: grow by duplication.
            let last = points[points.len() - 1];
            points.push(last);
            continue;
        }
        let split = longest_segment(points);
        let mid = points[split].midpoint(points[split + 1]);
        points.insert(split + 1, mid);
    }
}

fn longest_segment(points: &[Point]) -> usize {
    let mut best = 0;
    let mut best_len = -1.0f64;
    for (i, w) in points.windows(2).enumerate() {
        let len = w[0].distance(w[1]);
        if len > best_len {
            best = i;
            best_len = len;
        }
    }
    best
}

/// Builds an `M x y L x y ...` path string from a flat persisted point array.
pub fn points_to_path(flat: &[f64]) -> String {
    let mut out = String::new();
    for (i, pair) in flat.chunks_exact(2).enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{cmd} {} {}", pair[0], pair[1]);
    }
    out
}

/// Parses a morphed path string back into a flat point array. Only move/line
/// elements are meaningful here; close-path is tolerated (polygons are
/// implicitly closed), curves are rejected.
pub fn path_to_points(path: &str) -> ReeflineResult<Vec<f64>> {
    let bez = BezPath::from_svg(path)
        .map_err(|e| ReeflineError::invalid_shape_data(format!("unparseable path: {e}")))?;

    let mut flat = Vec::new();
    for el in bez.elements() {
        match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => {
                flat.push(p.x);
                flat.push(p.y);
            }
            PathEl::ClosePath => {}
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {
                return Err(ReeflineError::invalid_shape_data(
                    "curved path elements are not supported",
                ));
            }
        }
    }
    Ok(flat)
}

fn parse_polyline(path: &str) -> ReeflineResult<Vec<Point>> {
    let flat = path_to_points(path)?;
    if flat.is_empty() {
        return Err(ReeflineError::invalid_shape_data("empty morph path"));
    }
    Ok(flat
        .chunks_exact(2)
        .map(|c| Point::new(c[0], c[1]))
        .collect())
}

fn polyline_to_path(points: &[Point]) -> String {
    let flat: Vec<f64> = points.iter().flat_map(|p| [p.x, p.y]).collect();
    points_to_path(&flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_string_round_trip() {
        let flat = vec![0.0, 0.0, 5.5, 2.25, 10.0, 0.0];
        let path = points_to_path(&flat);
        assert_eq!(path, "M 0 0 L 5.5 2.25 L 10 0");
        assert_eq!(path_to_points(&path).unwrap(), flat);
    }

    #[test]
    fn curves_are_rejected() {
        assert!(path_to_points("M 0 0 C 1 1 2 2 3 3").is_err());
    }

    #[test]
    fn equal_vertex_counts_lerp_directly() {
        let m = MidpointSubdivision;
        let out = m.morph("M 0 0 L 10 0", "M 0 10 L 10 10", 0.5).unwrap();
        assert_eq!(path_to_points(&out).unwrap(), vec![0.0, 5.0, 10.0, 5.0]);
    }

    #[test]
    fn mismatched_counts_equalize_by_subdivision() {
        let m = MidpointSubdivision;
        // 2 vertices against 3: the longer side wins, every output has 3.
        let out = m.morph("M 0 0 L 10 0", "M 0 0 L 5 5 L 10 0", 1.0).unwrap();
        assert_eq!(
            path_to_points(&out).unwrap(),
            vec![0.0, 0.0, 5.0, 5.0, 10.0, 0.0]
        );

        let half = m.morph("M 0 0 L 10 0", "M 0 0 L 5 5 L 10 0", 0.5).unwrap();
        // a equalizes to (0,0) (5,0) (10,0); midpoint lerp lands halfway up.
        assert_eq!(
            path_to_points(&half).unwrap(),
            vec![0.0, 0.0, 5.0, 2.5, 10.0, 0.0]
        );
    }

    #[test]
    fn endpoints_reproduce_inputs() {
        let m = MidpointSubdivision;
        let a = "M 0 0 L 4 0 L 4 4";
        let b = "M 1 1 L 2 2";
        let at_zero = m.morph(a, b, 0.0).unwrap();
        assert_eq!(
            path_to_points(&at_zero).unwrap(),
            vec![0.0, 0.0, 4.0, 0.0, 4.0, 4.0]
        );
        let at_one = m.morph(a, b, 1.0).unwrap();
        // b was equalized to 3 vertices; all of them lie on b's segment.
        let pts = path_to_points(&at_one).unwrap();
        assert_eq!(pts.len(), 6);
        for pair in pts.chunks_exact(2) {
            assert!((pair[0] - pair[1]).abs() < 1e-12, "on the y = x segment");
            assert!((1.0..=2.0).contains(&pair[0]));
        }
    }
}
