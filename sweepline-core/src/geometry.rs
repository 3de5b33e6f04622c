//! Geometry kernel: points, boxes and the predicates the sweep relies on.
//!
//! The sweep line advances in increasing `y`. Every parabola is the locus of
//! points equidistant from a site and the sweep line, so the beach line is the
//! upper envelope of downward-opening parabolas.

use crate::{Result, VoronoiError};

/// Relative tolerance used when no explicit epsilon is configured.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// 2D position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another position
    pub fn dist_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another position
    pub fn dist(&self, other: &Point) -> f64 {
        self.dist_sq(other).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    pub fn sub(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(&self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product.
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Counter-clockwise quarter turn.
    pub fn perp(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle the diagram is clipped to. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Point::new(xmin, ymin),
            max: Point::new(xmax, ymax),
        }
    }

    /// Box anchored at the origin, the usual canvas/image layout.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Rejects non-finite or inverted boxes.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(VoronoiError::InvalidInput(format!(
                "bounding box has non-finite coordinates: {:?}",
                self
            )));
        }
        if self.min.x > self.max.x || self.min.y > self.max.y {
            return Err(VoronoiError::InvalidInput(format!(
                "bounding box is inverted: {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// A directed line `origin + t * dir`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub origin: Point,
    pub dir: Point,
}

impl Line {
    pub fn at(&self, t: f64) -> Point {
        self.origin.add(&self.dir.scale(t))
    }
}

/// Numeric tolerance scaled to the magnitude of the input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Relative epsilon, dimensionless.
    pub relative: f64,
    /// Absolute distance below which two points coincide.
    pub absolute: f64,
}

impl Tolerance {
    pub fn new(relative: f64, scale: f64) -> Self {
        Self {
            relative,
            absolute: relative * scale.max(1.0),
        }
    }

    /// Tolerance for a site set: scale is the largest coordinate magnitude.
    pub fn for_sites(relative: f64, sites: &[Point]) -> Self {
        let scale = sites
            .iter()
            .map(|p| p.x.abs().max(p.y.abs()))
            .fold(0.0f64, f64::max);
        Self::new(relative, scale)
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON, 1.0)
    }
}

/// Twice the signed area of triangle `abc`; positive when counter-clockwise.
pub fn orient(a: &Point, b: &Point, c: &Point) -> f64 {
    b.sub(a).cross(&c.sub(a))
}

/// Strict counter-clockwise test. Triples whose turn is within `eps` of a
/// straight line (relative to the side lengths) count as collinear.
pub fn is_ccw(a: &Point, b: &Point, c: &Point, eps: f64) -> bool {
    let ab = b.sub(a);
    let ac = c.sub(a);
    ab.cross(&ac) > eps * ab.norm() * ac.norm()
}

/// Offset from `a` to the circumcenter of `a`, `b`, `c`, or `None` when the
/// triple is collinear within `eps`.
fn circumcenter_offset(a: &Point, b: &Point, c: &Point, eps: f64) -> Option<Point> {
    let ab = b.sub(a);
    let ac = c.sub(a);
    let d = 2.0 * ab.cross(&ac);
    if d.abs() <= 2.0 * eps * ab.norm() * ac.norm() || d == 0.0 {
        return None;
    }
    let ab2 = ab.dot(&ab);
    let ac2 = ac.dot(&ac);
    let offset = Point::new((ac.y * ab2 - ab.y * ac2) / d, (ab.x * ac2 - ac.x * ab2) / d);
    offset.is_finite().then_some(offset)
}

/// Point equidistant from `a`, `b` and `c`, or `None` for collinear input.
pub fn circumcenter(a: &Point, b: &Point, c: &Point, eps: f64) -> Option<Point> {
    let center = a.add(&circumcenter_offset(a, b, c, eps)?);
    center.is_finite().then_some(center)
}

/// Perpendicular bisector of `a` and `b`, directed so that `a` lies on its
/// left.
pub fn bisector(a: &Point, b: &Point) -> Line {
    Line {
        origin: a.midpoint(b),
        dir: b.sub(a).perp(),
    }
}

/// The sweep coordinate at which the circle through `a`, `b`, `c` is fully
/// swept, together with its center. `None` for collinear triples.
pub fn circle_event_y(a: &Point, b: &Point, c: &Point, eps: f64) -> Option<(f64, Point)> {
    let offset = circumcenter_offset(a, b, c, eps)?;
    let center = a.add(&offset);
    let r = offset.norm();
    // center.y + r measured from a. A huge circle centered far below a
    // (nearly flat triple) cancels in r + offset.y, so use the conjugate.
    let rise = if offset.y < 0.0 {
        offset.x * offset.x / (r - offset.y)
    } else {
        r + offset.y
    };
    let y = a.y + rise;
    (center.is_finite() && y.is_finite()).then_some((y, center))
}

/// x-coordinate of the breakpoint between the arc of `left` and the arc of
/// `right` (in that order along the beach line) for the given sweep line.
pub fn breakpoint_x(left: &Point, right: &Point, sweep_y: f64) -> f64 {
    // An arc whose site sits on the sweep line is a vertical ray.
    if left.y == sweep_y {
        return left.x;
    }
    if right.y == sweep_y {
        return right.x;
    }
    if left.y == right.y {
        return 0.5 * (left.x + right.x);
    }

    // Each arc is y = (x - s.x)^2 / (2 d) + (s.y + l) / 2 with d = s.y - l.
    // Solve for u = x - left.x so nothing is squared at full magnitude.
    let dl = left.y - sweep_y;
    let dr = right.y - sweep_y;
    let rx = right.x - left.x;
    let a = 0.5 / dl - 0.5 / dr;
    let b = rx / dr;
    let c = 0.5 * (left.y - right.y) - 0.5 * rx * rx / dr;

    let (r1, r2) = if a == 0.0 {
        (-c / b, -c / b)
    } else {
        let disc = (b * b - 4.0 * a * c).max(0.0).sqrt();
        let q = -0.5 * (b + b.signum() * disc);
        if q == 0.0 {
            (0.0, 0.0)
        } else {
            (q / a, c / q)
        }
    };
    let u = if left.y < right.y { r1.min(r2) } else { r1.max(r2) };
    let x = left.x + u;
    if x.is_finite() {
        x
    } else {
        0.5 * (left.x + right.x)
    }
}

/// Height of the parabola of `site` at `x` for the given sweep line.
pub fn parabola_y(site: &Point, x: f64, sweep_y: f64) -> f64 {
    let dx = x - site.x;
    (sweep_y * sweep_y - site.y * site.y - dx * dx) / (2.0 * (sweep_y - site.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_circumcenter_triangle() {
        let c = circumcenter(
            &Point::new(0.0, 0.0),
            &Point::new(10.0, 0.0),
            &Point::new(5.0, 10.0),
            DEFAULT_EPSILON,
        )
        .unwrap();
        assert_relative_eq!(c.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 3.75, epsilon = 1e-12);
    }

    #[test]
    fn test_circumcenter_collinear_is_none() {
        let c = circumcenter(
            &Point::new(0.0, 0.0),
            &Point::new(1.0, 1.0),
            &Point::new(2.0, 2.0 + 1e-14),
            DEFAULT_EPSILON,
        );
        assert!(c.is_none());
    }

    #[test]
    fn test_orientation() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(0.0, 1.0);
        assert!(orient(&a, &b, &c) > 0.0);
        assert!(is_ccw(&a, &b, &c, DEFAULT_EPSILON));
        assert!(!is_ccw(&a, &c, &b, DEFAULT_EPSILON));
        assert!(!is_ccw(&a, &b, &Point::new(2.0, 0.0), DEFAULT_EPSILON));
    }

    #[test]
    fn test_bisector_keeps_first_site_on_left() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        let line = bisector(&a, &b);
        assert_eq!(line.origin, Point::new(5.0, 0.0));
        let ahead = line.at(1.0);
        assert!(orient(&line.origin, &ahead, &a) > 0.0);
        assert_relative_eq!(line.at(3.0).dist(&a), line.at(3.0).dist(&b), epsilon = 1e-9);
    }

    #[test]
    fn test_breakpoint_is_equidistant() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 3.0);
        let l = 7.0;
        for (left, right) in [(a, b), (b, a)] {
            let x = breakpoint_x(&left, &right, l);
            let y = parabola_y(&left, x, l);
            assert_relative_eq!(y, parabola_y(&right, x, l), epsilon = 1e-9);
            let p = Point::new(x, y);
            assert_relative_eq!(p.dist(&left), l - y, epsilon = 1e-9);
        }
        // The two orders pick the two different intersections.
        assert!(breakpoint_x(&a, &b, l) < breakpoint_x(&b, &a, l));
    }

    #[test]
    fn test_breakpoint_degenerate_cases() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(5.0, 2.0);
        assert_eq!(breakpoint_x(&a, &b, 4.0), 3.0);
        assert_eq!(breakpoint_x(&a, &Point::new(9.0, 4.0), 4.0), 9.0);
    }

    #[test]
    fn test_circle_event_y_is_circle_top() {
        let (y, center) = circle_event_y(
            &Point::new(0.0, 0.0),
            &Point::new(10.0, 0.0),
            &Point::new(5.0, 10.0),
            DEFAULT_EPSILON,
        )
        .unwrap();
        assert_relative_eq!(center.y, 3.75, epsilon = 1e-12);
        assert_relative_eq!(y, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_circle_event_y_for_nearly_flat_triple() {
        // The circle through (0,0), (1,h), (2,0) tops out at (1,h); for tiny h
        // its center lies half a billion units below.
        let h = 1e-9;
        let (y, center) = circle_event_y(&Point::new(0.0, 0.0), &Point::new(1.0, h), &Point::new(2.0, 0.0), 0.0)
            .unwrap();
        assert_relative_eq!(center.x, 1.0, epsilon = 1e-6);
        assert!(center.y < -1e8);
        assert_relative_eq!(y, h, max_relative = 1e-6);
    }

    #[test]
    fn test_breakpoint_for_nearly_equal_heights() {
        let left = Point::new(0.0, 0.0);
        let right = Point::new(3.0, 1e-12);
        assert_relative_eq!(breakpoint_x(&left, &right, 1.0), 1.5, epsilon = 1e-9);
        assert_relative_eq!(breakpoint_x(&right, &left, 1.0), 1.5, epsilon = 1e-9);

        // Far from the origin the answer is still measured from the sites.
        let left = Point::new(1e6, 50.0);
        let right = Point::new(1e6 + 3.0, 50.0 + 1e-9);
        assert_relative_eq!(breakpoint_x(&left, &right, 60.0), 1e6 + 1.5, epsilon = 1e-6);
    }

    #[test]
    fn test_bounding_box_validation() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).validate().is_ok());
        assert!(BoundingBox::new(1.0, 0.0, 0.0, 1.0).validate().is_err());
        assert!(BoundingBox::new(0.0, f64::NAN, 1.0, 1.0).validate().is_err());
    }
}
