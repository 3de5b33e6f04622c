//! Liang–Barsky clipping of parametric lines against the bounding box.

use crate::geometry::{BoundingBox, Line};

/// Clip the part of `line` with parameter in `[t0, t1]` to `bbox`.
///
/// Either bound may be infinite, which covers segments (`[0, 1]` with
/// `dir = b - a`), rays and full lines. Returns the clipped parameter range,
/// or `None` when the line misses the box.
pub(crate) fn clip_range(line: &Line, t0: f64, t1: f64, bbox: &BoundingBox) -> Option<(f64, f64)> {
    let (o, d) = (line.origin, line.dir);
    let (mut lo, mut hi) = (t0, t1);
    let constraints = [
        (-d.x, o.x - bbox.min.x),
        (d.x, bbox.max.x - o.x),
        (-d.y, o.y - bbox.min.y),
        (d.y, bbox.max.y - o.y),
    ];
    for (p, q) in constraints {
        if p == 0.0 {
            // Parallel to this side: entirely inside or entirely outside.
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            lo = lo.max(r);
        } else {
            hi = hi.min(r);
        }
        if lo > hi {
            return None;
        }
    }
    (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
}
