//! Brute-force cross-check of a built diagram.
//!
//! Samples a lattice over the bounding box, finds each sample's nearest site
//! directly, and checks the clipped edges against it: the way from a sample to
//! its own site is never blocked by an edge, and the way to a clearly farther
//! site always crosses one.

use crate::diagram::{Diagram, Edge};
use crate::geometry::{orient, Point};
use crate::raster::{pixel_center, SiteGrid};
use crate::site::SiteId;

/// Outcome of a successful [`check_coverage`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoverageReport {
    pub samples: usize,
    /// Samples too close to a cell boundary to judge.
    pub skipped: usize,
    /// Samples whose separation from the second-nearest site was checked.
    pub separated: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoverageError {
    #[error("edge {edge} cuts sample {sample:?} off from its nearest site {site}")]
    Blocked { sample: Point, site: SiteId, edge: usize },

    #[error("no edge separates sample {sample:?} from site {site}")]
    Unseparated { sample: Point, site: SiteId },
}

/// True when the open segments `pq` and `ab` cross at a single interior point.
fn crosses_strictly(p: &Point, q: &Point, e: &Edge) -> bool {
    let d1 = orient(p, q, &e.a);
    let d2 = orient(p, q, &e.b);
    let d3 = orient(&e.a, &e.b, p);
    let d4 = orient(&e.a, &e.b, q);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Like [`crosses_strictly`] but touching within `slack` counts.
fn touches(p: &Point, q: &Point, e: &Edge, slack: f64) -> bool {
    let pq = q.sub(p).norm();
    let ab = e.b.sub(&e.a).norm();
    let d1 = orient(p, q, &e.a) / pq.max(f64::MIN_POSITIVE);
    let d2 = orient(p, q, &e.b) / pq.max(f64::MIN_POSITIVE);
    let d3 = orient(&e.a, &e.b, p) / ab.max(f64::MIN_POSITIVE);
    let d4 = orient(&e.a, &e.b, q) / ab.max(f64::MIN_POSITIVE);
    let opposite = |u: f64, v: f64| (u <= slack && v >= -slack) || (u >= -slack && v <= slack);
    opposite(d1, d2) && opposite(d3, d4)
}

/// Check `diagram` on a `resolution` x `resolution` sample lattice.
///
/// `margin` is the distance gap below which a sample counts as sitting on a
/// cell boundary and is skipped.
pub fn check_coverage(diagram: &Diagram, resolution: u32, margin: f64) -> Result<CoverageReport, CoverageError> {
    let sites: Vec<Point> = diagram.sites().iter().map(|s| s.pos).collect();
    let bounds = diagram.bounds();
    let edges = diagram.edges();
    let grid = SiteGrid::new(&sites, &bounds);
    let mut report = CoverageReport::default();

    for row in 0..resolution {
        for col in 0..resolution {
            let p = pixel_center(&bounds, resolution, resolution, col, row);
            report.samples += 1;

            let (Some((near, d1)), second) = grid.nearest_two(&p) else {
                continue;
            };
            let near_id = diagram.sites()[near].id;
            if let Some((_, d2)) = second {
                if d2.sqrt() - d1.sqrt() < margin {
                    report.skipped += 1;
                    continue;
                }
            }

            let s = sites[near];
            if let Some(edge) = edges.iter().position(|e| crosses_strictly(&p, &s, e)) {
                return Err(CoverageError::Blocked {
                    sample: p,
                    site: near_id,
                    edge,
                });
            }

            if let Some((far, _)) = second {
                let t = sites[far];
                if bounds.contains(&t) {
                    report.separated += 1;
                    if !edges.iter().any(|e| touches(&p, &t, e, margin)) {
                        return Err(CoverageError::Unseparated {
                            sample: p,
                            site: diagram.sites()[far].id,
                        });
                    }
                }
            }
        }
    }

    log::debug!(
        "coverage: {} samples, {} skipped near boundaries, {} separation checks",
        report.samples,
        report.skipped,
        report.separated
    );
    Ok(report)
}
