//! Turns the finished graph into clipped output segments.

use crate::clip::clip_range;
use crate::dcel::{Graph, HalfEdgeId};
use crate::diagram::Edge;
use crate::geometry::{BoundingBox, Line, Tolerance};

/// Half-edge of a twin pair whose face has the smaller site id.
fn canonical(graph: &Graph, even: HalfEdgeId) -> HalfEdgeId {
    let own = graph.face_site(graph.face(even)).id;
    let other = graph.face_site(graph.face(even.twin())).id;
    if own < other {
        even
    } else {
        even.twin()
    }
}

/// One clipped [`Edge`] per twin pair, in half-edge order. Pairs that miss the
/// box or clip to less than the absolute tolerance are dropped.
pub(crate) fn extract(graph: &Graph, bbox: &BoundingBox, tol: &Tolerance) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(graph.half_edge_count() / 2);
    let mut dropped = 0usize;

    for pair in graph.edge_pairs() {
        let h = canonical(graph, pair);
        let dir = graph.direction(h);
        let start = graph.origin(h).map(|v| graph.vertex_pos(v));
        let end = graph.destination(h).map(|v| graph.vertex_pos(v));

        let (line, t0, t1) = match (start, end) {
            (Some(a), Some(b)) => (Line { origin: a, dir: b.sub(&a) }, 0.0, 1.0),
            (Some(a), None) => (Line { origin: a, dir }, 0.0, f64::INFINITY),
            (None, Some(b)) => (Line { origin: b, dir }, f64::NEG_INFINITY, 0.0),
            (None, None) => {
                let own = graph.face_site(graph.face(h)).pos;
                let other = graph.face_site(graph.face(h.twin())).pos;
                (Line { origin: own.midpoint(&other), dir }, f64::NEG_INFINITY, f64::INFINITY)
            }
        };

        let Some((lo, hi)) = clip_range(&line, t0, t1, bbox) else {
            dropped += 1;
            continue;
        };
        let edge = Edge {
            a: line.at(lo),
            b: line.at(hi),
        };
        if edge.length() < tol.absolute {
            dropped += 1;
            continue;
        }
        edges.push(edge);
    }

    log::trace!("extracted {} edges, {} outside or degenerate", edges.len(), dropped);
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::BuildOptions;
    use crate::geometry::Point;
    use crate::sweep::Sweep;

    fn graph(points: &[(f64, f64)]) -> Graph {
        let points: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Sweep::new(&points, &BuildOptions::default()).unwrap().into_graph()
    }

    #[test]
    fn test_full_line_oriented_by_lower_site() {
        let g = graph(&[(10.0, 0.0), (0.0, 0.0)]);
        let bbox = BoundingBox::new(-50.0, -50.0, 50.0, 50.0);
        let edges = extract(&g, &bbox, &Tolerance::default());
        assert_eq!(edges.len(), 1);
        // Site 0 sits at (10, 0), so it is on the left of the edge.
        assert_eq!(edges[0].a, Point::new(5.0, 50.0));
        assert_eq!(edges[0].b, Point::new(5.0, -50.0));
    }

    #[test]
    fn test_rays_meet_at_vertex() {
        let g = graph(&[(0.0, 0.0), (2.0, 0.0), (1.0, 1.0)]);
        let bbox = BoundingBox::new(-10.0, -10.0, 10.0, 10.0);
        let edges = extract(&g, &bbox, &Tolerance::default());
        assert_eq!(edges.len(), 3);
        let v = Point::new(1.0, 0.0);
        for e in &edges {
            let touches = e.a.dist(&v) < 1e-9 || e.b.dist(&v) < 1e-9;
            assert!(touches, "edge {:?} does not reach the vertex", e);
            assert!(bbox.contains(&e.a) && bbox.contains(&e.b));
        }
    }

    #[test]
    fn test_edges_outside_box_are_dropped() {
        let g = graph(&[(0.0, 0.0), (2.0, 0.0), (1.0, 1.0)]);
        // Only the downward ray from (1, 0) passes through this box.
        let bbox = BoundingBox::new(0.5, -5.0, 1.5, -1.0);
        let edges = extract(&g, &bbox, &Tolerance::default());
        assert_eq!(edges.len(), 1);
        assert!((edges[0].a.x - 1.0).abs() < 1e-12);
        assert!((edges[0].b.x - 1.0).abs() < 1e-12);
    }
}
