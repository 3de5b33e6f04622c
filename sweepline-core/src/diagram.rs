//! Built diagrams and the handle callers hold them through.

use crate::dcel::Graph;
use crate::extract::extract;
use crate::geometry::{BoundingBox, Point, Tolerance, DEFAULT_EPSILON};
use crate::site::{points_from_flat, prepare_sites, Site};
use crate::sweep::Sweep;
use crate::{Result, VoronoiError};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A clipped Voronoi edge. Finite, inside the bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub a: Point,
    pub b: Point,
}

impl Edge {
    pub fn length(&self) -> f64 {
        self.a.dist(&self.b)
    }
}

/// Build configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuildOptions {
    /// Relative tolerance, scaled by the largest site coordinate.
    pub epsilon: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl BuildOptions {
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(VoronoiError::InvalidInput(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Most edges a Voronoi diagram of `n` distinct sites can have.
fn max_edges(n: usize) -> usize {
    match n {
        0 | 1 => 0,
        2 => 1,
        n => 3 * n - 6,
    }
}

/// A complete diagram: merged sites, the graph, and the clipped edges.
#[derive(Debug, Clone)]
pub struct Diagram {
    sites: Vec<Site>,
    merged: usize,
    graph: Graph,
    edges: Vec<Edge>,
    bounds: BoundingBox,
}

impl Diagram {
    /// Run the sweep and extraction for `points` clipped to `bounds`.
    pub fn compute(points: &[Point], bounds: BoundingBox, options: &BuildOptions) -> Result<Self> {
        bounds.validate()?;
        options.validate()?;

        let tol = Tolerance::for_sites(options.epsilon, points);
        let prepared = prepare_sites(points, &tol)?;
        let sites = prepared.sites.clone();
        let merged = prepared.merged;

        let graph = Sweep::from_prepared(prepared).into_graph();
        let edges = extract(&graph, &bounds, &tol);

        // A violation means the sweep produced a broken graph; there is no
        // meaningful diagram to hand back.
        assert!(
            edges.len() <= max_edges(sites.len()),
            "{} edges for {} distinct sites exceeds the planar bound",
            edges.len(),
            sites.len()
        );

        log::debug!(
            "built diagram: {} input sites, {} distinct, {} half-edges, {} vertices, {} clipped edges",
            points.len(),
            sites.len(),
            graph.half_edge_count(),
            graph.vertex_count(),
            edges.len()
        );

        Ok(Self {
            sites,
            merged,
            graph,
            edges,
            bounds,
        })
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[cfg(test)]
    pub(crate) fn edges_mut(&mut self) -> &mut Vec<Edge> {
        &mut self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Distinct sites in sweep order, each carrying its first caller index.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn merged_sites(&self) -> usize {
        self.merged
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }
}

#[derive(Debug)]
enum HandleState {
    Built(Box<Diagram>),
    Released,
}

/// Owner of a built diagram until [`release`](DiagramHandle::release) is
/// called or the handle is dropped. Queries after release fail with
/// [`VoronoiError::UseAfterRelease`].
#[derive(Debug)]
pub struct DiagramHandle {
    state: HandleState,
}

impl DiagramHandle {
    pub fn new(diagram: Diagram) -> Self {
        Self {
            state: HandleState::Built(Box::new(diagram)),
        }
    }

    pub fn diagram(&self) -> Result<&Diagram> {
        match &self.state {
            HandleState::Built(d) => Ok(d),
            HandleState::Released => Err(VoronoiError::UseAfterRelease),
        }
    }

    pub fn into_diagram(self) -> Result<Diagram> {
        match self.state {
            HandleState::Built(d) => Ok(*d),
            HandleState::Released => Err(VoronoiError::UseAfterRelease),
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(self.state, HandleState::Released)
    }

    pub fn edge_count(&self) -> Result<u32> {
        Ok(self.diagram()?.edges.len() as u32)
    }

    pub fn edge_at(&self, index: u32) -> Result<Edge> {
        let edges = &self.diagram()?.edges;
        edges
            .get(index as usize)
            .copied()
            .ok_or(VoronoiError::OutOfRange {
                index,
                len: edges.len() as u32,
            })
    }

    /// Free the diagram. Releasing twice is an error.
    pub fn release(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, HandleState::Released) {
            HandleState::Built(_) => Ok(()),
            HandleState::Released => Err(VoronoiError::UseAfterRelease),
        }
    }
}

/// Build the diagram of `sites` clipped to `bounds` with default options.
pub fn build(sites: &[Point], bounds: BoundingBox) -> Result<DiagramHandle> {
    build_with(sites, bounds, &BuildOptions::default())
}

pub fn build_with(sites: &[Point], bounds: BoundingBox, options: &BuildOptions) -> Result<DiagramHandle> {
    Diagram::compute(sites, bounds, options).map(DiagramHandle::new)
}

/// Build from an interleaved `[x0, y0, x1, y1, ...]` buffer.
pub fn build_flat(buf: &[f64], bounds: BoundingBox) -> Result<DiagramHandle> {
    let points = points_from_flat(buf)?;
    build(&points, bounds)
}

/// Build several independent diagrams, in parallel when the `parallel`
/// feature is on. Results keep the order of `jobs`.
pub fn build_batch(jobs: &[(Vec<Point>, BoundingBox)], options: &BuildOptions) -> Vec<Result<DiagramHandle>> {
    #[cfg(feature = "parallel")]
    let iter = jobs.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = jobs.iter();

    iter.map(|(sites, bounds)| build_with(sites, *bounds, options))
        .collect()
}
