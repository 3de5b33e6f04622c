//! WASM bindings for sweepline-core.
//!
//! `build` returns a `VoronoiHandle` whose edges are read one at a time and
//! which must be released by the caller. `Playground` keeps an editable site
//! set for interactive pages, and `SweepStepper` exposes the sweep one event
//! at a time for visualisation. Coordinates cross the boundary as flat
//! `[x0, y0, x1, y1, ...]` arrays.

use wasm_bindgen::prelude::*;

use sweepline_core::{
    build_flat, points_from_flat, BoundingBox, BuildOptions, DiagramHandle, FortuneEngine, Point, SiteBoard, Sweep,
    SweepStep, VoronoiError,
};

#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();
    init_logger();
}

#[cfg(feature = "debug_logs")]
fn init_logger() {
    use log::LevelFilter;
    use wasm_bindgen_console_logger::DEFAULT_LOGGER;
    if log::set_logger(&DEFAULT_LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(not(feature = "debug_logs"))]
fn init_logger() {}

fn js_error(err: VoronoiError) -> JsError {
    JsError::new(&err.to_string())
}

fn points_to_flat(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

fn build_handle(sites: &[f64], xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> sweepline_core::Result<VoronoiHandle> {
    let handle = build_flat(sites, BoundingBox::new(xmin, ymin, xmax, ymax))?;
    log::debug!("built diagram with {} edges", handle.edge_count()?);
    Ok(VoronoiHandle { inner: handle })
}

/// Build the diagram of `sites` (flat `x, y` pairs) clipped to the box.
#[wasm_bindgen]
pub fn build(sites: &[f64], xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<VoronoiHandle, JsError> {
    build_handle(sites, xmin, ymin, xmax, ymax).map_err(js_error)
}

/// A built diagram. Call `release()` when done; any query afterwards throws.
#[wasm_bindgen]
pub struct VoronoiHandle {
    inner: DiagramHandle,
}

#[wasm_bindgen]
impl VoronoiHandle {
    pub fn edge_count(&self) -> Result<u32, JsError> {
        self.inner.edge_count().map_err(js_error)
    }

    /// Edge `index` as `[x1, y1, x2, y2]`.
    pub fn edge_at(&self, index: u32) -> Result<Vec<f64>, JsError> {
        let e = self.inner.edge_at(index).map_err(js_error)?;
        Ok(vec![e.a.x, e.a.y, e.b.x, e.b.y])
    }

    /// All edges as `[x1, y1, x2, y2, ...]`.
    pub fn edges(&self) -> Result<Vec<f64>, JsError> {
        let diagram = self.inner.diagram().map_err(js_error)?;
        Ok(diagram
            .edges()
            .iter()
            .flat_map(|e| [e.a.x, e.a.y, e.b.x, e.b.y])
            .collect())
    }

    pub fn release(&mut self) -> Result<(), JsError> {
        self.inner.release().map_err(js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn released(&self) -> bool {
        self.inner.is_released()
    }
}

/// Editable site set for interactive pages. Rebuilds through the Fortune
/// engine after each change.
#[wasm_bindgen]
pub struct Playground {
    board: SiteBoard<FortuneEngine>,
}

impl Playground {
    fn create(width: f64, height: f64, seed: u32) -> sweepline_core::Result<Self> {
        let board = SiteBoard::new(
            FortuneEngine::new(BuildOptions::default()),
            BoundingBox::from_size(width, height),
            seed as u64,
        )?;
        Ok(Self { board })
    }

    fn rebuild_inner(&mut self) -> sweepline_core::Result<u32> {
        self.board.rebuild()?.edge_count()
    }
}

#[wasm_bindgen]
impl Playground {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, seed: u32) -> Result<Playground, JsError> {
        Self::create(width, height, seed).map_err(js_error)
    }

    /// Grow or shrink to `count` sites (at most 500). Returns the new count.
    pub fn set_site_count(&mut self, count: u32) -> u32 {
        self.board.set_count(count as usize) as u32
    }

    pub fn add_site(&mut self, x: f64, y: f64) -> bool {
        self.board.add_site(Point::new(x, y))
    }

    /// Move the site nearest to `(x, y)` there. Returns its index.
    pub fn drag(&mut self, x: f64, y: f64) -> Option<u32> {
        self.board.drag_nearest(Point::new(x, y)).map(|i| i as u32)
    }

    /// Let the sites drift for `dt` seconds.
    pub fn step(&mut self, speed: f64, dt: f64) {
        self.board.step(speed, dt);
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), JsError> {
        self.board
            .resize(BoundingBox::from_size(width, height))
            .map_err(js_error)
    }

    pub fn site_count(&self) -> u32 {
        self.board.len() as u32
    }

    pub fn positions(&self) -> Vec<f64> {
        points_to_flat(&self.board.positions())
    }

    /// Rebuild the diagram from the current sites. Returns the edge count.
    pub fn rebuild(&mut self) -> Result<u32, JsError> {
        self.rebuild_inner().map_err(js_error)
    }

    /// Edges of the last rebuild as `[x1, y1, x2, y2, ...]`.
    pub fn edges(&self) -> Vec<f64> {
        self.board
            .diagram()
            .and_then(|h| h.diagram().ok())
            .map(|d| d.edges().iter().flat_map(|e| [e.a.x, e.a.y, e.b.x, e.b.y]).collect())
            .unwrap_or_default()
    }
}

/// Runs the sweep one event at a time.
#[wasm_bindgen]
pub struct SweepStepper {
    sweep: Sweep,
}

impl SweepStepper {
    fn create(sites: &[f64]) -> sweepline_core::Result<Self> {
        let sweep = Sweep::new(&points_from_flat(sites)?, &BuildOptions::default())?;
        Ok(Self { sweep })
    }
}

#[wasm_bindgen]
impl SweepStepper {
    #[wasm_bindgen(constructor)]
    pub fn new(sites: &[f64]) -> Result<SweepStepper, JsError> {
        Self::create(sites).map_err(js_error)
    }

    /// Process one event. Returns false once the sweep is finished.
    pub fn step(&mut self) -> bool {
        match self.sweep.step() {
            Some(SweepStep::Site { site, .. }) => {
                log::trace!("site {}", site);
                true
            }
            Some(SweepStep::Circle { pos, .. }) => {
                log::trace!("vertex at ({}, {})", pos.x, pos.y);
                true
            }
            None => false,
        }
    }

    pub fn finish(&mut self) {
        self.sweep.finish();
    }

    #[wasm_bindgen(getter)]
    pub fn sweep_y(&self) -> f64 {
        self.sweep.sweep_y()
    }

    #[wasm_bindgen(getter)]
    pub fn finished(&self) -> bool {
        self.sweep.is_finished()
    }

    pub fn vertex_count(&self) -> u32 {
        self.sweep.vertex_count() as u32
    }

    /// Queued events, stale circle events included.
    pub fn pending_events(&self) -> u32 {
        self.sweep.pending_events() as u32
    }

    /// Vertices found so far as `[x0, y0, x1, y1, ...]`.
    pub fn vertices(&self) -> Vec<f64> {
        points_to_flat(self.sweep.graph().vertices())
    }

    /// Caller indices of the sites owning the beach line arcs, left to right.
    pub fn beach_line(&self) -> Vec<u32> {
        self.sweep.beach_line().iter().map(|id| id.0).collect()
    }
}
