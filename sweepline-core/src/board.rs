//! Caller-side site store for interactive front-ends.
//!
//! A [`SiteBoard`] owns the editable site list, keeps the most recent diagram
//! alive, and rebuilds it through an injected [`DiagramEngine`] after every
//! change.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::diagram::DiagramHandle;
use crate::engine::DiagramEngine;
use crate::geometry::{BoundingBox, Point};
use crate::{Result, VoronoiError};

/// Upper bound on the number of sites a board holds.
pub const MAX_SITES: usize = 500;

/// Unit velocity vector (magnitude 1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
}

impl Velocity {
    /// Create from angle in radians
    pub fn from_angle(angle: f64) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::from_angle(rng.gen::<f64>() * std::f64::consts::TAU)
    }

    /// Bounce off a vertical wall
    pub fn reflect_x(&mut self) {
        self.x = -self.x;
    }

    /// Bounce off a horizontal wall
    pub fn reflect_y(&mut self) {
        self.y = -self.y;
    }
}

#[derive(Debug, Clone)]
struct BoardSite {
    pos: Point,
    vel: Velocity,
}

impl BoardSite {
    /// Move by `vel * distance`, bouncing off the box walls.
    fn drift(&mut self, distance: f64, bounds: &BoundingBox) {
        self.pos.x += self.vel.x * distance;
        self.pos.y += self.vel.y * distance;

        if self.pos.x < bounds.min.x || self.pos.x > bounds.max.x {
            self.vel.reflect_x();
            self.pos.x = self.pos.x.clamp(bounds.min.x, bounds.max.x);
        }
        if self.pos.y < bounds.min.y || self.pos.y > bounds.max.y {
            self.vel.reflect_y();
            self.pos.y = self.pos.y.clamp(bounds.min.y, bounds.max.y);
        }
    }
}

/// Editable site set plus the diagram last built from it.
pub struct SiteBoard<E: DiagramEngine> {
    engine: E,
    bounds: BoundingBox,
    sites: Vec<BoardSite>,
    rng: ChaCha8Rng,
    diagram: Option<DiagramHandle>,
}

impl<E: DiagramEngine> SiteBoard<E> {
    /// Empty board. `seed` fixes every random placement and heading.
    pub fn new(engine: E, bounds: BoundingBox, seed: u64) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            engine,
            bounds,
            sites: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            diagram: None,
        })
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn random_site(&mut self) -> BoardSite {
        let b = self.bounds;
        let pos = Point::new(
            b.min.x + self.rng.gen::<f64>() * b.width(),
            b.min.y + self.rng.gen::<f64>() * b.height(),
        );
        BoardSite {
            pos,
            vel: Velocity::random(&mut self.rng),
        }
    }

    /// Grow with random sites or drop the newest ones until `count` sites
    /// remain. The count is clamped to `[0, MAX_SITES]`; returns the count in
    /// effect.
    pub fn set_count(&mut self, count: usize) -> usize {
        let count = count.min(MAX_SITES);
        if count < self.sites.len() {
            self.sites.truncate(count);
        }
        while self.sites.len() < count {
            let site = self.random_site();
            self.sites.push(site);
        }
        count
    }

    /// Add a site at `pos`, clamped into the box. Returns false when full.
    pub fn add_site(&mut self, pos: Point) -> bool {
        if self.sites.len() >= MAX_SITES {
            return false;
        }
        let vel = Velocity::random(&mut self.rng);
        self.sites.push(BoardSite {
            pos: self.clamp(pos),
            vel,
        });
        true
    }

    /// Add a site exactly at `pos`, even outside the box. Returns false when
    /// full.
    pub fn place_site(&mut self, pos: Point) -> Result<bool> {
        if !pos.is_finite() {
            return Err(VoronoiError::InvalidInput(format!(
                "site has non-finite coordinates ({}, {})",
                pos.x, pos.y
            )));
        }
        if self.sites.len() >= MAX_SITES {
            return Ok(false);
        }
        let vel = Velocity::random(&mut self.rng);
        self.sites.push(BoardSite { pos, vel });
        Ok(true)
    }

    /// Move the site nearest to `target` onto it. Returns the moved index.
    pub fn drag_nearest(&mut self, target: Point) -> Option<usize> {
        let index = self
            .sites
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.pos.dist_sq(&target).total_cmp(&b.pos.dist_sq(&target)))
            .map(|(i, _)| i)?;
        self.sites[index].pos = self.clamp(target);
        Some(index)
    }

    /// Let every site drift `speed * dt` along its heading.
    pub fn step(&mut self, speed: f64, dt: f64) {
        let distance = speed * dt;
        let bounds = self.bounds;
        for site in &mut self.sites {
            site.drift(distance, &bounds);
        }
    }

    /// Switch to a new box, scaling site positions along with it.
    pub fn resize(&mut self, bounds: BoundingBox) -> Result<()> {
        bounds.validate()?;
        let old = self.bounds;
        let scale = |v: f64, from_min: f64, from_len: f64, to_min: f64, to_len: f64| {
            if from_len > 0.0 {
                to_min + (v - from_min) / from_len * to_len
            } else {
                to_min + 0.5 * to_len
            }
        };
        for site in &mut self.sites {
            site.pos = Point::new(
                scale(site.pos.x, old.min.x, old.width(), bounds.min.x, bounds.width()),
                scale(site.pos.y, old.min.y, old.height(), bounds.min.y, bounds.height()),
            );
        }
        self.bounds = bounds;
        Ok(())
    }

    pub fn positions(&self) -> Vec<Point> {
        self.sites.iter().map(|s| s.pos).collect()
    }

    /// Release the previous diagram and build a fresh one from the current
    /// sites.
    pub fn rebuild(&mut self) -> Result<&DiagramHandle> {
        if let Some(mut old) = self.diagram.take() {
            old.release()?;
        }
        let handle = self.engine.build(&self.positions(), self.bounds)?;
        Ok(self.diagram.insert(handle))
    }

    /// Diagram from the last successful [`rebuild`](SiteBoard::rebuild).
    pub fn diagram(&self) -> Option<&DiagramHandle> {
        self.diagram.as_ref()
    }

    fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.bounds.min.x, self.bounds.max.x),
            p.y.clamp(self.bounds.min.y, self.bounds.max.y),
        )
    }
}
