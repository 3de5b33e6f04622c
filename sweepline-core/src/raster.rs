//! Nearest-site lookups on a uniform grid, and pixel labelling built on them.
//!
//! Used to paint cell fills and as an independent reference when checking a
//! diagram: every lookup here is a direct distance comparison, nothing is
//! shared with the sweep.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geometry::{BoundingBox, Point};

/// Bucket grid over the sites for amortized O(1) nearest-site queries.
pub struct SiteGrid<'a> {
    sites: &'a [Point],
    origin: Point,
    extent: BoundingBox,
    cols: usize,
    rows: usize,
    cell_w: f64,
    cell_h: f64,
    buckets: Vec<Vec<u32>>,
}

/// A site index and its squared distance to the query point.
pub type Hit = (usize, f64);

impl<'a> SiteGrid<'a> {
    /// Grid covering `bounds` and every site, roughly one site per bucket.
    pub fn new(sites: &'a [Point], bounds: &BoundingBox) -> Self {
        let mut extent = *bounds;
        for p in sites {
            extent.min.x = extent.min.x.min(p.x);
            extent.min.y = extent.min.y.min(p.y);
            extent.max.x = extent.max.x.max(p.x);
            extent.max.y = extent.max.y.max(p.y);
        }
        let side = ((sites.len() as f64).sqrt().ceil() as usize).max(1);
        let (cols, rows) = (side, side);
        // Degenerate extents still need a positive bucket size.
        let cell_w = (extent.width() / cols as f64).max(f64::MIN_POSITIVE);
        let cell_h = (extent.height() / rows as f64).max(f64::MIN_POSITIVE);

        let mut grid = Self {
            sites,
            origin: extent.min,
            extent,
            cols,
            rows,
            cell_w,
            cell_h,
            buckets: vec![Vec::new(); cols * rows],
        };
        for (i, p) in sites.iter().enumerate() {
            let (c, r) = grid.bucket_of(p);
            grid.buckets[r * cols + c].push(i as u32);
        }
        grid
    }

    fn bucket_of(&self, p: &Point) -> (usize, usize) {
        let c = (((p.x - self.origin.x) / self.cell_w) as usize).min(self.cols - 1);
        let r = (((p.y - self.origin.y) / self.cell_h) as usize).min(self.rows - 1);
        (c, r)
    }

    /// Nearest site to `p`. Ties go to the lower index.
    pub fn nearest(&self, p: &Point) -> Option<Hit> {
        self.search(p, false).0
    }

    /// Nearest and second-nearest sites to `p`.
    pub fn nearest_two(&self, p: &Point) -> (Option<Hit>, Option<Hit>) {
        self.search(p, true)
    }

    /// Expanding ring search. Stops once the worst wanted hit is closer than
    /// anything in the unvisited rings.
    fn search(&self, p: &Point, want_second: bool) -> (Option<Hit>, Option<Hit>) {
        if self.sites.is_empty() {
            return (None, None);
        }
        let (gc, gr) = self.bucket_of(p);
        let ox = p.x - self.origin.x - gc as f64 * self.cell_w;
        let oy = p.y - self.origin.y - gr as f64 * self.cell_h;
        // Outside the grid the ring bound does not hold; scan everything.
        let inside = self.extent.contains(p);

        let mut best: Option<Hit> = None;
        let mut second: Option<Hit> = None;
        let better = |a: Hit, b: Option<Hit>| match b {
            None => true,
            Some(b) => a.1 < b.1 || (a.1 == b.1 && a.0 < b.0),
        };

        for radius in 0usize.. {
            let r_start = gr.saturating_sub(radius);
            let r_end = (gr + radius + 1).min(self.rows);
            let c_start = gc.saturating_sub(radius);
            let c_end = (gc + radius + 1).min(self.cols);

            for ri in r_start..r_end {
                for ci in c_start..c_end {
                    if radius > 0 && ri > r_start && ri < r_end - 1 && ci > c_start && ci < c_end - 1 {
                        continue;
                    }
                    for &i in &self.buckets[ri * self.cols + ci] {
                        let hit = (i as usize, p.dist_sq(&self.sites[i as usize]));
                        if better(hit, best) {
                            second = best;
                            best = Some(hit);
                        } else if want_second && better(hit, second) {
                            second = Some(hit);
                        }
                    }
                }
            }

            if r_start == 0 && c_start == 0 && r_end == self.rows && c_end == self.cols {
                break;
            }
            if inside {
                let rf = radius as f64;
                let unchecked = (ox + rf * self.cell_w)
                    .min(self.cell_w * (rf + 1.0) - ox)
                    .min(oy + rf * self.cell_h)
                    .min(self.cell_h * (rf + 1.0) - oy);
                let bound = if want_second { second } else { best };
                if let Some((_, d)) = bound {
                    // Strict, so equidistant sites in the next ring are still seen.
                    if d < unchecked * unchecked {
                        break;
                    }
                }
            }
        }
        (best, second)
    }
}

/// Nearest-site label for every pixel of a `width` x `height` lattice laid
/// over the bounding box.
#[derive(Debug, Clone)]
pub struct Labels {
    pub width: u32,
    pub height: u32,
    /// Site index per pixel, row-major, row 0 at `bounds.min.y`.
    pub cells: Vec<u32>,
    /// Pixel count per site.
    pub areas: Vec<u32>,
}

impl Labels {
    pub fn cell_at(&self, col: u32, row: u32) -> u32 {
        self.cells[(row * self.width + col) as usize]
    }
}

/// Center of pixel `(col, row)` in diagram coordinates.
pub fn pixel_center(bounds: &BoundingBox, width: u32, height: u32, col: u32, row: u32) -> Point {
    Point::new(
        bounds.min.x + (col as f64 + 0.5) * bounds.width() / width as f64,
        bounds.min.y + (row as f64 + 0.5) * bounds.height() / height as f64,
    )
}

fn label_row(grid: &SiteGrid<'_>, bounds: &BoundingBox, width: u32, height: u32, row: u32, areas: &mut [u32]) -> Vec<u32> {
    (0..width)
        .map(|col| {
            let p = pixel_center(bounds, width, height, col, row);
            let cell = grid.nearest(&p).map_or(0, |(i, _)| i);
            areas[cell] += 1;
            cell as u32
        })
        .collect()
}

/// Label each pixel with its nearest site. `None` when there are no sites.
pub fn label(sites: &[Point], bounds: &BoundingBox, width: u32, height: u32) -> Option<Labels> {
    if sites.is_empty() {
        return None;
    }
    let n = sites.len();
    let grid = SiteGrid::new(sites, bounds);
    let grid = &grid;

    #[cfg(feature = "parallel")]
    let (cells, areas) = (0..height)
        .into_par_iter()
        .fold(
            || (Vec::new(), vec![0u32; n]),
            |(mut cells, mut areas), row| {
                cells.extend(label_row(grid, bounds, width, height, row, &mut areas));
                (cells, areas)
            },
        )
        .reduce(
            || (Vec::new(), vec![0u32; n]),
            |(mut cells1, mut areas1), (cells2, areas2)| {
                cells1.extend(cells2);
                for (a, b) in areas1.iter_mut().zip(areas2) {
                    *a += b;
                }
                (cells1, areas1)
            },
        );

    #[cfg(not(feature = "parallel"))]
    let (cells, areas) = {
        let mut cells = Vec::with_capacity((width * height) as usize);
        let mut areas = vec![0u32; n];
        for row in 0..height {
            cells.extend(label_row(grid, bounds, width, height, row, &mut areas));
        }
        (cells, areas)
    };

    Some(Labels {
        width,
        height,
        cells,
        areas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn brute_force(sites: &[Point], p: &Point) -> usize {
        let mut best = 0;
        for (i, s) in sites.iter().enumerate() {
            if s.dist_sq(p) < sites[best].dist_sq(p) {
                best = i;
            }
        }
        best
    }

    #[test]
    fn test_two_halves() {
        let bounds = BoundingBox::from_size(100.0, 100.0);
        let sites = [Point::new(25.0, 25.0), Point::new(75.0, 75.0)];
        let labels = label(&sites, &bounds, 100, 100).unwrap();
        assert_eq!(labels.cells.len(), 10_000);
        assert_eq!(labels.areas.iter().sum::<u32>(), 10_000);
        assert_eq!(labels.cell_at(0, 0), 0);
        assert_eq!(labels.cell_at(99, 99), 1);
        assert!(label(&[], &bounds, 10, 10).is_none());
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let bounds = BoundingBox::new(-20.0, 10.0, 180.0, 90.0);
        // A few sites outside the box as well.
        let sites: Vec<Point> = (0..60)
            .map(|_| Point::new(rng.gen_range(-40.0..200.0), rng.gen_range(0.0..100.0)))
            .collect();
        let grid = SiteGrid::new(&sites, &bounds);
        for _ in 0..2000 {
            let p = Point::new(rng.gen_range(-20.0..180.0), rng.gen_range(10.0..90.0));
            let (i, d) = grid.nearest(&p).unwrap();
            let j = brute_force(&sites, &p);
            assert_eq!(d, sites[j].dist_sq(&p), "query {:?}: got {} want {}", p, i, j);

            let (first, second) = grid.nearest_two(&p);
            let (_, d2) = second.unwrap();
            assert_eq!(first.unwrap().1, d);
            let mut all: Vec<f64> = sites.iter().map(|s| s.dist_sq(&p)).collect();
            all.sort_by(f64::total_cmp);
            assert_eq!(d2, all[1]);
        }
    }

    #[test]
    fn test_single_site_and_outside_query() {
        let bounds = BoundingBox::from_size(10.0, 10.0);
        let sites = [Point::new(3.0, 3.0)];
        let grid = SiteGrid::new(&sites, &bounds);
        assert_eq!(grid.nearest(&Point::new(50.0, -5.0)).map(|h| h.0), Some(0));
        assert_eq!(grid.nearest_two(&Point::new(1.0, 1.0)).1, None);
    }
}
