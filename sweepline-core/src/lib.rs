//! Core Voronoi diagram construction library.
//!
//! Builds the exact edge set of a planar Voronoi diagram with Fortune's sweep,
//! clips it to a bounding box and hands it back behind an explicitly released
//! handle. Raster labelling and coverage validation helpers cross-check the
//! result against brute-force nearest-site queries.

pub mod geometry;
mod site;
mod event;
mod beach_line;
pub mod dcel;
mod sweep;
mod clip;
mod extract;
mod diagram;
mod engine;
mod board;
pub mod raster;
pub mod validation;

pub use board::{SiteBoard, Velocity, MAX_SITES};
pub use diagram::{build, build_batch, build_flat, build_with, BuildOptions, Diagram, DiagramHandle, Edge};
pub use engine::{DiagramEngine, FortuneEngine};
pub use geometry::{BoundingBox, Point, DEFAULT_EPSILON};
pub use site::{points_from_flat, Site, SiteId};
pub use sweep::{Sweep, SweepStep};

/// Error type for Voronoi operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VoronoiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Edge index {index} out of range (edge count {len})")]
    OutOfRange { index: u32, len: u32 },

    #[error("Diagram handle used after release")]
    UseAfterRelease,
}

pub type Result<T> = std::result::Result<T, VoronoiError>;
