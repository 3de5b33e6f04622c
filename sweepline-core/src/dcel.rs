//! Doubly-connected edge list holding the diagram while the sweep builds it.
//!
//! Half-edges come in twin pairs `2k` / `2k + 1`. Each half-edge borders one
//! face and runs counter-clockwise around it, so its face lies on its left. A
//! half-edge with no end vertex runs off to infinity.

use std::fmt;

use crate::geometry::Point;
use crate::site::{Site, SiteId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HalfEdgeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u32);

/// One face per merged site, numbered in sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(pub u32);

impl HalfEdgeId {
    pub fn twin(self) -> HalfEdgeId {
        HalfEdgeId(self.0 ^ 1)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct HalfEdge {
    face: FaceId,
    end: Option<VertexId>,
    next: Option<HalfEdgeId>,
    prev: Option<HalfEdgeId>,
}

#[derive(Debug, Clone)]
struct Face {
    site: Site,
    boundary: Option<HalfEdgeId>,
}

/// Structural defect found by [`Graph::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDefect {
    pub half_edge: HalfEdgeId,
    pub reason: &'static str,
}

impl fmt::Display for GraphDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "half-edge {}: {}", self.half_edge.0, self.reason)
    }
}

/// Vertices, half-edges and faces of a Voronoi diagram.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    faces: Vec<Face>,
    half_edges: Vec<HalfEdge>,
    vertices: Vec<Point>,
}

impl Graph {
    /// One face for each site, in the given order.
    pub fn with_faces(sites: &[Site]) -> Self {
        Self {
            faces: sites
                .iter()
                .map(|&site| Face { site, boundary: None })
                .collect(),
            half_edges: Vec::with_capacity(sites.len() * 6),
            vertices: Vec::with_capacity(sites.len() * 2),
        }
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn half_edge_count(&self) -> usize {
        self.half_edges.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face(&self, edge: HalfEdgeId) -> FaceId {
        self.half_edges[edge.index()].face
    }

    pub fn twin(&self, edge: HalfEdgeId) -> HalfEdgeId {
        edge.twin()
    }

    /// Vertex the half-edge starts from, `None` if it comes from infinity.
    pub fn origin(&self, edge: HalfEdgeId) -> Option<VertexId> {
        self.half_edges[edge.twin().index()].end
    }

    /// Vertex the half-edge ends in, `None` if it runs to infinity.
    pub fn destination(&self, edge: HalfEdgeId) -> Option<VertexId> {
        self.half_edges[edge.index()].end
    }

    pub fn next(&self, edge: HalfEdgeId) -> Option<HalfEdgeId> {
        self.half_edges[edge.index()].next
    }

    pub fn prev(&self, edge: HalfEdgeId) -> Option<HalfEdgeId> {
        self.half_edges[edge.index()].prev
    }

    pub fn vertex_pos(&self, vertex: VertexId) -> Point {
        self.vertices[vertex.0 as usize]
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn face_site(&self, face: FaceId) -> Site {
        self.faces[face.0 as usize].site
    }

    /// Face owned by the site with the given caller id.
    pub fn face_of_site(&self, id: SiteId) -> Option<FaceId> {
        self.faces
            .iter()
            .position(|f| f.site.id == id)
            .map(|i| FaceId(i as u32))
    }

    /// Some half-edge on the boundary of `face`; `None` for a lone site.
    pub fn boundary_edge(&self, face: FaceId) -> Option<HalfEdgeId> {
        self.faces[face.0 as usize].boundary
    }

    /// The even half-edge of every twin pair.
    pub fn edge_pairs(&self) -> impl Iterator<Item = HalfEdgeId> {
        (0..self.half_edges.len() as u32).step_by(2).map(HalfEdgeId)
    }

    /// Direction a half-edge runs in: along the bisector of its two sites
    /// with its own face on the left.
    pub fn direction(&self, edge: HalfEdgeId) -> Point {
        let own = self.face_site(self.face(edge)).pos;
        let other = self.face_site(self.face(edge.twin())).pos;
        other.sub(&own).perp()
    }

    /// Create a twin pair between two faces. The first half-edge borders
    /// `face_a`, the second `face_b`.
    pub fn add_edge(&mut self, face_a: FaceId, face_b: FaceId) -> (HalfEdgeId, HalfEdgeId) {
        let a = HalfEdgeId(self.half_edges.len() as u32);
        let b = a.twin();
        for face in [face_a, face_b] {
            self.half_edges.push(HalfEdge {
                face,
                end: None,
                next: None,
                prev: None,
            });
        }
        for (face, edge) in [(face_a, a), (face_b, b)] {
            let slot = &mut self.faces[face.0 as usize].boundary;
            if slot.is_none() {
                *slot = Some(edge);
            }
        }
        (a, b)
    }

    /// Add a vertex where three half-edges end. The half-edges are given in
    /// counter-clockwise order around the vertex.
    pub fn add_vertex(&mut self, pos: Point, e1: HalfEdgeId, e2: HalfEdgeId, e3: HalfEdgeId) -> VertexId {
        let vertex = VertexId(self.vertices.len() as u32);
        self.vertices.push(pos);
        for e in [e1, e2, e3] {
            self.half_edges[e.index()].end = Some(vertex);
        }
        self.link(e1, e3.twin());
        self.link(e2, e1.twin());
        self.link(e3, e2.twin());
        vertex
    }

    /// Mark `second` as following `first` around their common face.
    pub fn link(&mut self, first: HalfEdgeId, second: HalfEdgeId) {
        self.half_edges[first.index()].next = Some(second);
        self.half_edges[second.index()].prev = Some(first);
    }

    /// Chain the dangling ends of unbounded faces so every face boundary is
    /// a closed `next` cycle. Run once the sweep is done.
    pub fn close_unbounded_faces(&mut self) {
        let mut ends: Vec<Vec<HalfEdgeId>> = vec![Vec::new(); self.faces.len()];
        let mut starts: Vec<Vec<HalfEdgeId>> = vec![Vec::new(); self.faces.len()];
        for (i, he) in self.half_edges.iter().enumerate() {
            let id = HalfEdgeId(i as u32);
            if he.next.is_none() {
                ends[he.face.0 as usize].push(id);
            }
            if he.prev.is_none() {
                starts[he.face.0 as usize].push(id);
            }
        }

        for (face, (face_ends, mut face_starts)) in ends.into_iter().zip(starts).enumerate() {
            if face_ends.len() != face_starts.len() {
                log::warn!(
                    "face {} has {} open ends but {} open starts; left unchained",
                    face,
                    face_ends.len(),
                    face_starts.len()
                );
                continue;
            }
            for end in face_ends {
                // Prefer a different half-edge; a lone line links to itself.
                let pick = face_starts
                    .iter()
                    .position(|&s| s != end)
                    .unwrap_or(0);
                let start = face_starts.remove(pick);
                self.link(end, start);
            }
        }
    }

    /// Half-edges around `face` following `next`, starting at its boundary
    /// edge. Stops when the cycle closes or the chain is open.
    pub fn face_boundary(&self, face: FaceId) -> Vec<HalfEdgeId> {
        let mut out = Vec::new();
        let Some(start) = self.boundary_edge(face) else {
            return out;
        };
        let mut current = start;
        loop {
            out.push(current);
            match self.next(current) {
                Some(next) if next != start && out.len() <= self.half_edges.len() => current = next,
                _ => break,
            }
        }
        out
    }

    /// Check the structural invariants of the planar subdivision.
    pub fn validate(&self) -> std::result::Result<(), GraphDefect> {
        let defect = |i: usize, reason| GraphDefect {
            half_edge: HalfEdgeId(i as u32),
            reason,
        };
        if self.half_edges.len() % 2 != 0 {
            return Err(defect(self.half_edges.len() - 1, "half-edge without twin"));
        }
        for (i, he) in self.half_edges.iter().enumerate() {
            let id = HalfEdgeId(i as u32);
            if he.face == self.face(id.twin()) {
                return Err(defect(i, "twins border the same face"));
            }
            if let Some(next) = he.next {
                if self.prev(next) != Some(id) {
                    return Err(defect(i, "next/prev mismatch"));
                }
                if self.face(next) != he.face {
                    return Err(defect(i, "next half-edge on another face"));
                }
                if he.end.is_some() && self.origin(next) != he.end {
                    return Err(defect(i, "next half-edge starts elsewhere"));
                }
            }
            if let Some(prev) = he.prev {
                if self.next(prev) != Some(id) {
                    return Err(defect(i, "prev/next mismatch"));
                }
            }
        }
        Ok(())
    }
}
