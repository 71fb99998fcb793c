use kurbo::Point;

use crate::error::{ReeflineError, ReeflineResult};

/// Shape tag of a persisted annotation geometry.
///
/// Tags arrive from the persistence layer as strings; parsing an unknown tag
/// fails with [`ReeflineError::UnknownShape`] rather than defaulting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Shape {
    Point,
    Rectangle,
    Circle,
    LineString,
    Polygon,
    Ellipse,
}

impl Shape {
    pub fn from_tag(tag: &str) -> ReeflineResult<Self> {
        match tag {
            "Point" => Ok(Self::Point),
            "Rectangle" => Ok(Self::Rectangle),
            "Circle" => Ok(Self::Circle),
            "LineString" => Ok(Self::LineString),
            "Polygon" => Ok(Self::Polygon),
            "Ellipse" => Ok(Self::Ellipse),
            other => Err(ReeflineError::unknown_shape(other)),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::Rectangle => "Rectangle",
            Self::Circle => "Circle",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
            Self::Ellipse => "Ellipse",
        }
    }
}

impl TryFrom<String> for Shape {
    type Error = ReeflineError;

    fn try_from(value: String) -> ReeflineResult<Self> {
        Self::from_tag(&value)
    }
}

impl From<Shape> for &'static str {
    fn from(shape: Shape) -> Self {
        shape.tag()
    }
}

/// Decoded in-memory geometry, in on-screen coordinates (Y grows downward).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Geometry {
    Point(Point),
    Rectangle([Point; 4]),
    Circle { center: Point, radius: f64 },
    LineString(Vec<Point>),
    Polygon(Vec<Point>),
    Ellipse([Point; 4]),
}

impl Geometry {
    pub fn shape(&self) -> Shape {
        match self {
            Self::Point(_) => Shape::Point,
            Self::Rectangle(_) => Shape::Rectangle,
            Self::Circle { .. } => Shape::Circle,
            Self::LineString(_) => Shape::LineString,
            Self::Polygon(_) => Shape::Polygon,
            Self::Ellipse(_) => Shape::Ellipse,
        }
    }
}

/// Checks that a flat persisted point array satisfies the arity rules of a
/// shape, without decoding it.
pub fn validate_flat(shape: Shape, flat: &[f64]) -> ReeflineResult<()> {
    if flat.len() % 2 != 0 {
        return Err(ReeflineError::invalid_shape_data(format!(
            "{} has odd coordinate count {}",
            shape.tag(),
            flat.len()
        )));
    }
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(ReeflineError::invalid_shape_data(format!(
            "{} has non-finite coordinate",
            shape.tag()
        )));
    }

    let pairs = flat.len() / 2;
    let ok = match shape {
        Shape::Point => pairs == 1,
        Shape::Rectangle | Shape::Ellipse => pairs == 4,
        Shape::Circle => pairs == 2,
        Shape::LineString => pairs >= 2,
        Shape::Polygon => pairs >= 3,
    };
    if !ok {
        return Err(ReeflineError::invalid_shape_data(format!(
            "{} cannot be built from {pairs} point pair(s)",
            shape.tag()
        )));
    }

    if shape == Shape::Circle && flat[2] < 0.0 {
        return Err(ReeflineError::invalid_shape_data("Circle radius is negative"));
    }
    Ok(())
}

/// Decodes a flat persisted point array into a [`Geometry`].
///
/// Persisted coordinates carry the Y axis inverted relative to on-screen
/// rendering; `height` is the video frame pixel height used to un-invert it.
/// The circle's synthetic radius point carries the radius in its x slot and
/// is not subject to the inversion.
pub fn decode(shape: Shape, flat: &[f64], height: f64) -> ReeflineResult<Geometry> {
    validate_flat(shape, flat)?;

    let pt = |i: usize| Point::new(flat[2 * i], height - flat[2 * i + 1]);
    Ok(match shape {
        Shape::Point => Geometry::Point(pt(0)),
        Shape::Rectangle => Geometry::Rectangle([pt(0), pt(1), pt(2), pt(3)]),
        Shape::Ellipse => Geometry::Ellipse([pt(0), pt(1), pt(2), pt(3)]),
        Shape::Circle => Geometry::Circle {
            center: pt(0),
            radius: flat[2],
        },
        Shape::LineString => Geometry::LineString((0..flat.len() / 2).map(pt).collect()),
        Shape::Polygon => Geometry::Polygon((0..flat.len() / 2).map(pt).collect()),
    })
}

/// Inverse of [`decode`]: re-inverts the Y axis and flattens back to the
/// persisted representation.
pub fn encode(geometry: &Geometry, height: f64) -> Vec<f64> {
    fn push(out: &mut Vec<f64>, p: Point, height: f64) {
        out.push(p.x);
        out.push(height - p.y);
    }

    let mut out = Vec::new();
    match geometry {
        Geometry::Point(p) => push(&mut out, *p, height),
        Geometry::Rectangle(corners) | Geometry::Ellipse(corners) => {
            for p in corners {
                push(&mut out, *p, height);
            }
        }
        Geometry::Circle { center, radius } => {
            push(&mut out, *center, height);
            out.push(*radius);
            out.push(0.0);
        }
        Geometry::LineString(points) | Geometry::Polygon(points) => {
            for p in points {
                push(&mut out, *p, height);
            }
        }
    }
    out
}
