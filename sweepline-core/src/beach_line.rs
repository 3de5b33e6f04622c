//! The beach line: the ordered sequence of parabolic arcs under the sweep.

use slotmap::{new_key_type, SlotMap};

use crate::dcel::HalfEdgeId;
use crate::geometry::{breakpoint_x, Point};

new_key_type! {
    /// Key of an arc on the beach line. Keys are generational, so a key
    /// held by a stale circle event stops resolving once its arc is removed.
    pub(crate) struct ArcId;
}

#[derive(Debug, Clone)]
struct Arc {
    /// Index of the origin site in the prepared site list.
    site: usize,
    prev: Option<ArcId>,
    next: Option<ArcId>,
    /// Serial of the pending circle event for this arc, if any.
    circle_event: Option<u64>,
    /// Half-edge traced by the breakpoint on this arc's right.
    edge: Option<HalfEdgeId>,
}

/// Doubly-linked list of arcs ordered by x, stored in a slot map.
#[derive(Debug, Default)]
pub(crate) struct BeachLine {
    arcs: SlotMap<ArcId, Arc>,
    head: Option<ArcId>,
    tail: Option<ArcId>,
}

impl BeachLine {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arcs: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    /// Number of live arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    fn alloc(&mut self, site: usize) -> ArcId {
        self.arcs.insert(Arc {
            site,
            prev: None,
            next: None,
            circle_event: None,
            edge: None,
        })
    }

    /// Link a fresh arc directly before `before`, or at the tail for `None`.
    fn link_before(&mut self, id: ArcId, before: Option<ArcId>) {
        let prev = match before {
            Some(b) => self.arcs[b].prev,
            None => self.tail,
        };
        let arc = &mut self.arcs[id];
        arc.prev = prev;
        arc.next = before;
        match prev {
            Some(p) => self.arcs[p].next = Some(id),
            None => self.head = Some(id),
        }
        match before {
            Some(b) => self.arcs[b].prev = Some(id),
            None => self.tail = Some(id),
        }
    }

    /// Start the beach line with its first arc.
    pub fn insert_first(&mut self, site: usize) -> ArcId {
        debug_assert!(self.arcs.is_empty());
        let id = self.alloc(site);
        self.link_before(id, None);
        id
    }

    /// Append an arc at the right end. Used for sites sharing the lowest y,
    /// which never split each other.
    pub fn append_right(&mut self, site: usize) -> ArcId {
        let id = self.alloc(site);
        self.link_before(id, None);
        id
    }

    /// Split `base` around a new arc for `site`.
    ///
    /// Returns `(left_piece, new_arc)`: the left part of the old arc gets a
    /// new key, `base` keeps the right part and therefore its right
    /// breakpoint.
    pub fn split(&mut self, base: ArcId, site: usize) -> (ArcId, ArcId) {
        let base_site = self.arcs[base].site;
        let left_piece = self.alloc(base_site);
        self.link_before(left_piece, Some(base));
        let new_arc = self.alloc(site);
        self.link_before(new_arc, Some(base));
        (left_piece, new_arc)
    }

    pub fn remove(&mut self, id: ArcId) {
        let Some(arc) = self.arcs.remove(id) else {
            return;
        };
        match arc.prev {
            Some(p) => self.arcs[p].next = arc.next,
            None => self.head = arc.next,
        }
        match arc.next {
            Some(n) => self.arcs[n].prev = arc.prev,
            None => self.tail = arc.prev,
        }
    }

    pub fn left(&self, id: ArcId) -> Option<ArcId> {
        self.arcs[id].prev
    }

    pub fn right(&self, id: ArcId) -> Option<ArcId> {
        self.arcs[id].next
    }

    pub fn rightmost(&self) -> Option<ArcId> {
        self.tail
    }

    pub fn site(&self, id: ArcId) -> usize {
        self.arcs[id].site
    }

    pub fn edge(&self, id: ArcId) -> Option<HalfEdgeId> {
        self.arcs[id].edge
    }

    pub fn set_edge(&mut self, id: ArcId, edge: HalfEdgeId) {
        self.arcs[id].edge = Some(edge);
    }

    /// Serial of the live circle event of `id`; `None` for removed arcs too.
    pub fn circle_event(&self, id: ArcId) -> Option<u64> {
        self.arcs.get(id).and_then(|arc| arc.circle_event)
    }

    pub fn set_circle_event(&mut self, id: ArcId, serial: Option<u64>) {
        self.arcs[id].circle_event = serial;
    }

    /// Arcs from left to right.
    pub fn iter(&self) -> impl Iterator<Item = ArcId> + '_ {
        std::iter::successors(self.head, move |&id| self.arcs[id].next)
    }

    /// Find the arc directly below `x` for the given sweep position: the arc
    /// whose breakpoints enclose `x`. On an exact breakpoint the left arc wins.
    pub fn locate(&self, x: f64, sweep_y: f64, sites: &[Point]) -> Option<ArcId> {
        let mut current = self.head?;
        while let Some(next) = self.arcs[current].next {
            let bp = breakpoint_x(&sites[self.arcs[current].site], &sites[self.arcs[next].site], sweep_y);
            if x <= bp {
                return Some(current);
            }
            current = next;
        }
        Some(current)
    }
}
