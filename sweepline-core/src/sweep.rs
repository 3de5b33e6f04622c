//! Fortune's sweep: drives the event queue, beach line and graph together.

use crate::beach_line::{ArcId, BeachLine};
use crate::dcel::{FaceId, Graph, VertexId};
use crate::diagram::BuildOptions;
use crate::event::{EventKind, EventQueue};
use crate::geometry::{circle_event_y, orient, Point, Tolerance};
use crate::site::{prepare_sites, PreparedSites, Site, SiteId};
use crate::Result;

/// What a single call to [`Sweep::step`] processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepStep {
    /// A site reached the sweep line and split an arc.
    Site { site: SiteId, sweep_y: f64 },
    /// An arc vanished, producing a diagram vertex.
    Circle { vertex: VertexId, pos: Point, sweep_y: f64 },
}

#[derive(Debug, Default, Clone, Copy)]
struct SweepStats {
    site_events: usize,
    circle_events: usize,
    stale_events: usize,
    degenerate_triples: usize,
}

/// State of a sweep over one set of sites.
///
/// Sites are processed in increasing `y`. The sweep can be run to completion
/// with [`finish`](Sweep::finish) or advanced one event at a time.
pub struct Sweep {
    sites: Vec<Site>,
    points: Vec<Point>,
    queue: EventQueue,
    beach: BeachLine,
    graph: Graph,
    sweep_y: f64,
    /// True while every processed site lies on the lowest row.
    bottom_row: bool,
    closed: bool,
    merged: usize,
    stats: SweepStats,
}

impl Sweep {
    /// Validate and prepare `points`, then seed the event queue.
    pub fn new(points: &[Point], options: &BuildOptions) -> Result<Self> {
        options.validate()?;
        let tol = Tolerance::for_sites(options.epsilon, points);
        let prepared = prepare_sites(points, &tol)?;
        Ok(Self::from_prepared(prepared))
    }

    pub(crate) fn from_prepared(prepared: PreparedSites) -> Self {
        let PreparedSites { sites, merged } = prepared;
        let n = sites.len();
        let points: Vec<Point> = sites.iter().map(|s| s.pos).collect();

        let mut queue = EventQueue::with_capacity(n * 3);
        for (i, p) in points.iter().enumerate() {
            queue.push_site(i, *p);
        }

        Self {
            graph: Graph::with_faces(&sites),
            sites,
            points,
            queue,
            beach: BeachLine::with_capacity(2 * n),
            sweep_y: f64::NEG_INFINITY,
            bottom_row: true,
            closed: false,
            merged,
            stats: SweepStats::default(),
        }
    }

    /// Sweep coordinate of the last processed event.
    pub fn sweep_y(&self) -> f64 {
        self.sweep_y
    }

    pub fn is_finished(&self) -> bool {
        self.closed
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    /// Events still queued, including circle events that have gone stale.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Number of arcs currently on the beach line.
    pub fn arc_count(&self) -> usize {
        self.beach.len()
    }

    /// Unique sites in sweep order; face `i` belongs to `sites()[i]`.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Number of input sites merged into a duplicate.
    pub fn merged_sites(&self) -> usize {
        self.merged
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Site ids of the beach line arcs from left to right.
    pub fn beach_line(&self) -> Vec<SiteId> {
        self.beach
            .iter()
            .map(|arc| self.sites[self.beach.site(arc)].id)
            .collect()
    }

    /// Process the next live event. Returns `None` once the queue is drained,
    /// after closing the unbounded faces.
    pub fn step(&mut self) -> Option<SweepStep> {
        while let Some(event) = self.queue.pop() {
            match event.kind {
                EventKind::Site(index) => {
                    self.sweep_y = event.y;
                    self.handle_site(index);
                    self.stats.site_events += 1;
                    return Some(SweepStep::Site {
                        site: self.sites[index].id,
                        sweep_y: event.y,
                    });
                }
                EventKind::Circle { arc, center } => {
                    // Removed arcs and superseded events both fail this check.
                    if self.beach.circle_event(arc) != Some(event.serial) {
                        self.stats.stale_events += 1;
                        continue;
                    }
                    self.sweep_y = event.y;
                    if let Some(vertex) = self.handle_circle(arc, center) {
                        self.stats.circle_events += 1;
                        return Some(SweepStep::Circle {
                            vertex,
                            pos: center,
                            sweep_y: event.y,
                        });
                    }
                }
            }
        }
        self.close();
        None
    }

    /// Run the remaining events.
    pub fn finish(&mut self) {
        while self.step().is_some() {}
    }

    /// Finish the sweep and hand over the graph.
    pub fn into_graph(mut self) -> Graph {
        self.finish();
        self.graph
    }

    fn face(&self, arc: ArcId) -> FaceId {
        FaceId(self.beach.site(arc) as u32)
    }

    fn handle_site(&mut self, index: usize) {
        let p = self.points[index];
        log::trace!("site event {} at ({}, {})", self.sites[index].id, p.x, p.y);

        let Some(rightmost) = self.beach.rightmost() else {
            self.beach.insert_first(index);
            return;
        };

        // Sites sharing the lowest y never split each other's arcs: they sit
        // side by side, separated by vertical bisectors. Equal y sorts by x,
        // so each one lands on the right end.
        if self.bottom_row && self.points[self.beach.site(rightmost)].y == p.y {
            let left_face = self.face(rightmost);
            let arc = self.beach.append_right(index);
            let (left_edge, _) = self.graph.add_edge(left_face, self.face(arc));
            self.beach.set_edge(rightmost, left_edge);
            return;
        }
        self.bottom_row = false;

        let Some(base) = self.beach.locate(p.x, self.sweep_y, &self.points) else {
            unreachable!("beach line is non-empty");
        };
        // Whatever was about to happen to the split arc no longer applies.
        self.beach.set_circle_event(base, None);

        let base_face = self.face(base);
        let (left_piece, arc) = self.beach.split(base, index);
        let (left_edge, right_edge) = self.graph.add_edge(base_face, FaceId(index as u32));
        self.beach.set_edge(left_piece, left_edge);
        self.beach.set_edge(arc, right_edge);

        self.try_circle_event(left_piece);
        self.try_circle_event(base);
    }

    fn handle_circle(&mut self, arc: ArcId, center: Point) -> Option<VertexId> {
        let (Some(left), Some(right)) = (self.beach.left(arc), self.beach.right(arc)) else {
            log::warn!("circle event on boundary arc {:?} ignored", arc);
            return None;
        };
        let (Some(left_edge), Some(right_edge)) = (self.beach.edge(left), self.beach.edge(arc)) else {
            log::warn!("circle event on arc {:?} without traced edges ignored", arc);
            return None;
        };
        log::trace!("circle event at ({}, {}), sweep y {}", center.x, center.y, self.sweep_y);

        let (out_edge, in_edge) = self.graph.add_edge(self.face(left), self.face(right));
        let vertex = self.graph.add_vertex(center, in_edge, left_edge, right_edge);
        self.beach.set_edge(left, out_edge);

        // The neighbours' pending events involved the vanishing arc.
        self.beach.set_circle_event(left, None);
        self.beach.set_circle_event(right, None);
        self.beach.remove(arc);

        self.try_circle_event(left);
        self.try_circle_event(right);
        Some(vertex)
    }

    /// Schedule the event where `arc` shrinks to nothing, if its two
    /// breakpoints converge.
    fn try_circle_event(&mut self, arc: ArcId) {
        let (Some(left), Some(right)) = (self.beach.left(arc), self.beach.right(arc)) else {
            return;
        };
        let (ls, ms, rs) = (self.beach.site(left), self.beach.site(arc), self.beach.site(right));
        if ls == rs {
            return;
        }
        let (a, b, c) = (self.points[ls], self.points[ms], self.points[rs]);
        // Exact sign: a nearly flat triple still converges, just soon.
        if orient(&a, &b, &c) <= 0.0 {
            return;
        }
        let Some((y, center)) = circle_event_y(&a, &b, &c, 0.0) else {
            self.stats.degenerate_triples += 1;
            return;
        };
        // Rounding can put the event slightly behind the sweep line.
        let y = y.max(self.sweep_y);
        let serial = self.queue.push_circle(y, arc, center);
        self.beach.set_circle_event(arc, Some(serial));
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.graph.close_unbounded_faces();
        self.closed = true;
        log::debug!(
            "sweep done: {} sites ({} merged), {} site events, {} circle events, {} stale, {} degenerate, {} vertices",
            self.sites.len(),
            self.merged,
            self.stats.site_events,
            self.stats.circle_events,
            self.stats.stale_events,
            self.stats.degenerate_triples,
            self.graph.vertex_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sweep(points: &[(f64, f64)]) -> Sweep {
        let points: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Sweep::new(&points, &BuildOptions::default()).unwrap()
    }

    #[test]
    fn test_empty_and_single() {
        let graph = sweep(&[]).into_graph();
        assert_eq!(graph.face_count(), 0);
        assert_eq!(graph.half_edge_count(), 0);

        let graph = sweep(&[(0.0, 0.0)]).into_graph();
        assert_eq!(graph.face_count(), 1);
        assert_eq!(graph.half_edge_count(), 0);
        assert_eq!(graph.boundary_edge(FaceId(0)), None);
    }

    #[test]
    fn test_two_sites() {
        let graph = sweep(&[(0.0, 0.0), (1.0, 0.0)]).into_graph();
        assert_eq!(graph.face_count(), 2);
        assert_eq!(graph.half_edge_count(), 2);
        assert_eq!(graph.vertex_count(), 0);
        for e in 0..2 {
            let e = crate::dcel::HalfEdgeId(e);
            assert_eq!(graph.next(e), Some(e));
            assert_eq!(graph.prev(e), Some(e));
        }
    }

    #[test]
    fn test_three_sites_one_vertex() {
        for points in [
            [(0.0, 0.0), (2.0, 0.0), (1.0, 1.0)],
            [(2.0, 0.0), (0.0, 0.0), (1.0, 1.0)],
        ] {
            let graph = sweep(&points).into_graph();
            assert_eq!(graph.face_count(), 3);
            assert_eq!(graph.half_edge_count(), 6);
            assert_eq!(graph.vertex_count(), 1);
            let v = graph.vertex_pos(VertexId(0));
            assert_relative_eq!(v.x, 1.0, epsilon = 1e-12);
            assert_relative_eq!(v.y, 0.0, epsilon = 1e-12);
            assert!(graph.validate().is_ok());

            for face in 0..3 {
                let boundary = graph.face_boundary(FaceId(face));
                assert_eq!(boundary.len(), 2);
                let to_vertex = boundary
                    .iter()
                    .copied()
                    .find(|&e| graph.destination(e) == Some(VertexId(0)))
                    .unwrap();
                let from_vertex = graph.next(to_vertex).unwrap();
                assert_eq!(graph.origin(from_vertex), Some(VertexId(0)));
                assert_eq!(graph.origin(to_vertex), None);
                assert_eq!(graph.destination(from_vertex), None);
                assert_eq!(graph.next(from_vertex), Some(to_vertex));
            }
        }
    }

    #[test]
    fn test_stepwise_matches_finish() {
        let points = [(0.0, 0.0), (10.0, 0.0), (5.0, 10.0), (3.0, 4.0), (8.0, 7.0)];
        let mut s = sweep(&points);
        let mut last_y = f64::NEG_INFINITY;
        let mut sites = 0;
        let mut circles = 0;
        while let Some(step) = s.step() {
            let y = match step {
                SweepStep::Site { sweep_y, .. } => {
                    sites += 1;
                    sweep_y
                }
                SweepStep::Circle { sweep_y, .. } => {
                    circles += 1;
                    sweep_y
                }
            };
            assert!(y >= last_y, "sweep went backwards: {} < {}", y, last_y);
            last_y = y;
        }
        assert!(s.is_finished());
        assert_eq!(sites, 5);
        assert_eq!(circles, s.vertex_count());

        let whole = sweep(&points).into_graph();
        assert_eq!(whole.vertex_count(), s.vertex_count());
        assert_eq!(whole.half_edge_count(), s.graph().half_edge_count());
    }

    #[test]
    fn test_vertices_are_equidistant_from_three_sites() {
        let points = [
            (1.0, 1.0), (7.0, 2.0), (4.0, 6.0), (9.0, 8.0), (2.0, 9.0), (5.5, 3.5),
        ];
        let s = sweep(&points);
        let sites: Vec<Point> = s.sites().iter().map(|x| x.pos).collect();
        let graph = s.into_graph();
        assert!(graph.vertex_count() > 0);
        for v in graph.vertices() {
            let mut d: Vec<f64> = sites.iter().map(|p| p.dist(v)).collect();
            d.sort_by(f64::total_cmp);
            // The three nearest sites are all at the same distance.
            assert_relative_eq!(d[0], d[2], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_collinear_column_has_no_vertices() {
        let graph = sweep(&[(0.0, 0.0), (0.0, 10.0), (0.0, 20.0)]).into_graph();
        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.half_edge_count(), 4);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_bottom_row_then_apex() {
        let mut s = sweep(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (10.0, 5.0)]);
        s.step();
        s.step();
        s.step();
        assert_eq!(s.beach_line(), vec![SiteId(0), SiteId(1), SiteId(2)]);
        s.finish();
        assert_eq!(s.vertex_count(), 2);
        assert!(s.graph().validate().is_ok());
    }

    #[test]
    fn test_nearly_level_sites_form_the_bottom_row() {
        let mut s = sweep(&[
            (0.0, 49.999999928),
            (3.0, 49.999999931),
            (6.0, 49.999999936),
            (9.0, 49.999999933),
        ]);
        assert_eq!(s.pending_events(), 4);
        s.finish();
        assert_eq!(s.beach_line(), vec![SiteId(0), SiteId(1), SiteId(2), SiteId(3)]);
        assert_eq!(s.arc_count(), 4);
        assert_eq!(s.vertex_count(), 0);
        assert_eq!(s.graph().half_edge_count(), 6);
    }

    #[test]
    fn test_flat_triple_still_closes_its_arc() {
        // Heights differ by far less than the spacing but more than the
        // tolerance; all four sites are on the hull.
        let mut s = sweep(&[(0.0, 50.0), (3.0, 50.0 + 3e-7), (6.0, 50.0 + 1e-7), (9.0, 50.0 + 6e-7)]);
        s.finish();
        assert_eq!(s.vertex_count(), 2);
        assert_eq!(s.graph().half_edge_count(), 10);
        assert_eq!(
            s.beach_line(),
            vec![SiteId(0), SiteId(1), SiteId(3), SiteId(2), SiteId(0)]
        );
        assert_eq!(s.pending_events(), 0);
        assert!(s.graph().validate().is_ok());
    }
}
