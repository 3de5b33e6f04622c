//! Site types and input preparation for the sweep.

use std::fmt;

use crate::geometry::{Point, Tolerance};
use crate::{Result, VoronoiError};

/// Index of a site in the caller-supplied order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteId(pub u32);

impl SiteId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A Voronoi site: a stable identifier and its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    pub id: SiteId,
    pub pos: Point,
}

impl Site {
    pub fn new(id: SiteId, pos: Point) -> Self {
        Self { id, pos }
    }
}

/// Decode an interleaved `[x0, y0, x1, y1, ...]` buffer. Odd lengths are
/// rejected.
pub fn points_from_flat(buf: &[f64]) -> Result<Vec<Point>> {
    if buf.len() % 2 != 0 {
        return Err(VoronoiError::InvalidInput(format!(
            "site buffer has odd length {}",
            buf.len()
        )));
    }
    Ok(buf
        .chunks_exact(2)
        .map(|xy| Point::new(xy[0], xy[1]))
        .collect())
}

/// Sites ready for the sweep: validated, merged and in sweep order.
#[derive(Debug, Clone)]
pub(crate) struct PreparedSites {
    /// Unique sites sorted by `(y, x)` ascending.
    pub sites: Vec<Site>,
    /// Number of input sites folded into an earlier duplicate.
    pub merged: usize,
}

/// Validate and deduplicate input positions.
///
/// Sites closer than the absolute tolerance to an already kept site are
/// merged into it; the kept site is the one that comes first in the caller's
/// order, so the result does not depend on sorting. Kept sites whose `y` lies
/// within the tolerance above the first site of a row are moved onto that
/// row.
pub(crate) fn prepare_sites(points: &[Point], tol: &Tolerance) -> Result<PreparedSites> {
    if let Some((i, p)) = points.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        return Err(VoronoiError::InvalidInput(format!(
            "site {} has non-finite coordinates ({}, {})",
            i, p.x, p.y
        )));
    }
    if points.len() > u32::MAX as usize / 4 {
        return Err(VoronoiError::InvalidInput(format!(
            "too many sites: {}",
            points.len()
        )));
    }

    let mut order: Vec<Site> = points
        .iter()
        .enumerate()
        .map(|(i, &pos)| Site::new(SiteId(i as u32), pos))
        .collect();
    // Ties on position keep caller order, so the first occurrence is seen first.
    order.sort_by(|a, b| {
        a.pos
            .y
            .total_cmp(&b.pos.y)
            .then(a.pos.x.total_cmp(&b.pos.x))
            .then(a.id.cmp(&b.id))
    });

    let eps = tol.absolute;
    let eps_sq = eps * eps;
    let mut kept: Vec<Site> = Vec::with_capacity(order.len());
    let mut merged = 0;
    for site in order {
        // Everything within eps has |dy| <= eps, so only the tail needs a look.
        let duplicate_of = kept
            .iter()
            .rev()
            .take_while(|k| site.pos.y - k.pos.y <= eps)
            .position(|k| k.pos.dist_sq(&site.pos) <= eps_sq)
            .map(|back| kept.len() - 1 - back);
        match duplicate_of {
            Some(j) => {
                merged += 1;
                // Keep the earliest caller id on the surviving site.
                if site.id < kept[j].id {
                    kept[j].id = site.id;
                }
            }
            None => kept.push(site),
        }
    }

    let mut row_y = f64::NEG_INFINITY;
    for site in &mut kept {
        if site.pos.y - row_y <= eps {
            site.pos.y = row_y;
        } else {
            row_y = site.pos.y;
        }
    }
    kept.sort_by(|a, b| {
        a.pos
            .y
            .total_cmp(&b.pos.y)
            .then(a.pos.x.total_cmp(&b.pos.x))
            .then(a.id.cmp(&b.id))
    });

    Ok(PreparedSites { sites: kept, merged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DEFAULT_EPSILON;

    fn tol() -> Tolerance {
        Tolerance::new(DEFAULT_EPSILON, 10.0)
    }

    #[test]
    fn test_sorted_by_y_then_x() {
        let points = [
            Point::new(3.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, -2.0),
        ];
        let prepared = prepare_sites(&points, &tol()).unwrap();
        let ids: Vec<u32> = prepared.sites.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![2, 1, 0]);
        assert_eq!(prepared.merged, 0);
    }

    #[test]
    fn test_duplicates_merge_to_first_occurrence() {
        let points = [
            Point::new(5.0, 5.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 1.0 + 1e-12),
            Point::new(1.0, 1.0),
        ];
        let prepared = prepare_sites(&points, &tol()).unwrap();
        assert_eq!(prepared.sites.len(), 2);
        assert_eq!(prepared.merged, 2);
        assert_eq!(prepared.sites[0].id, SiteId(1));
    }

    #[test]
    fn test_nearly_level_sites_share_a_row() {
        // Tolerance 1e-8: the first three lie on one row, the last does not.
        let points = [
            Point::new(6.0, 1.0 + 6e-9),
            Point::new(0.0, 1.0),
            Point::new(3.0, 1.0 + 9e-9),
            Point::new(9.0, 1.0 + 2e-8),
        ];
        let prepared = prepare_sites(&points, &tol()).unwrap();
        let ids: Vec<u32> = prepared.sites.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![1, 2, 0, 3]);
        for site in &prepared.sites[..3] {
            assert_eq!(site.pos.y, 1.0);
        }
        assert_eq!(prepared.sites[3].pos.y, 1.0 + 2e-8);
        assert_eq!(prepared.merged, 0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let points = [Point::new(0.0, 0.0), Point::new(f64::NAN, 1.0)];
        let err = prepare_sites(&points, &tol()).unwrap_err();
        assert!(matches!(err, VoronoiError::InvalidInput(_)));

        let points = [Point::new(f64::INFINITY, 0.0)];
        assert!(prepare_sites(&points, &tol()).is_err());
    }

    #[test]
    fn test_points_from_flat() {
        let pts = points_from_flat(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(pts, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        assert!(points_from_flat(&[1.0, 2.0, 3.0]).is_err());
    }
}
