//! Engine trait for collaborators that need to (re)build diagrams.

use crate::diagram::{build_with, BuildOptions, DiagramHandle};
use crate::geometry::{BoundingBox, Point};
use crate::Result;

/// Something that turns a site set into a diagram.
///
/// Interactive front-ends take an engine instead of calling [`crate::build`]
/// directly, so tests can swap in a recording or failing engine.
pub trait DiagramEngine {
    fn build(&self, sites: &[Point], bounds: BoundingBox) -> Result<DiagramHandle>;
}

/// Fortune's sweep with fixed build options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FortuneEngine {
    options: BuildOptions,
}

impl FortuneEngine {
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }
}

impl DiagramEngine for FortuneEngine {
    fn build(&self, sites: &[Point], bounds: BoundingBox) -> Result<DiagramHandle> {
        build_with(sites, bounds, &self.options)
    }
}

impl<E: DiagramEngine + ?Sized> DiagramEngine for &E {
    fn build(&self, sites: &[Point], bounds: BoundingBox) -> Result<DiagramHandle> {
        (**self).build(sites, bounds)
    }
}
