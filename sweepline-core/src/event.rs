//! Event schedule for the sweep.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::beach_line::ArcId;
use crate::geometry::Point;

/// What happens when the sweep line reaches an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum EventKind {
    /// Index into the prepared (sorted) site list.
    Site(usize),
    /// The arc `arc` shrinks to nothing at `center`.
    Circle { arc: ArcId, center: Point },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Event {
    /// Sweep coordinate.
    pub y: f64,
    /// Tie-break coordinate: the site x, or the circle center x.
    pub x: f64,
    pub kind: EventKind,
    /// Insertion order; also identifies circle events for invalidation.
    pub serial: u64,
}

impl Event {
    fn rank(&self) -> u8 {
        match self.kind {
            EventKind::Circle { .. } => 0,
            EventKind::Site(_) => 1,
        }
    }

    /// Ascending sweep order: `y`, then `x`, circles before sites, then serial.
    fn sweep_cmp(&self, other: &Self) -> Ordering {
        self.y
            .total_cmp(&other.y)
            .then(self.x.total_cmp(&other.x))
            .then(self.rank().cmp(&other.rank()))
            .then(self.serial.cmp(&other.serial))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.sweep_cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    // BinaryHeap is a max-heap; reverse so the earliest event pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.sweep_cmp(self)
    }
}

/// Min-priority queue of pending events.
///
/// Circle events are never removed eagerly. The beach line remembers the
/// serial of the one live circle event per arc; anything else popped for that
/// arc is stale and the sweep skips it.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    heap: BinaryHeap<Event>,
    next_serial: u64,
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_serial: 0,
        }
    }

    fn push(&mut self, y: f64, x: f64, kind: EventKind) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.heap.push(Event { y, x, kind, serial });
        serial
    }

    pub fn push_site(&mut self, index: usize, pos: Point) -> u64 {
        self.push(pos.y, pos.x, EventKind::Site(index))
    }

    pub fn push_circle(&mut self, y: f64, arc: ArcId, center: Point) -> u64 {
        self.push(y, center.x, EventKind::Circle { arc, center })
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.heap.pop()
    }

    /// Events still queued, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_sweep_order() {
        let mut q = EventQueue::with_capacity(4);
        q.push_site(0, Point::new(5.0, 2.0));
        q.push_site(1, Point::new(1.0, 2.0));
        q.push_site(2, Point::new(9.0, -1.0));
        let arc = ArcId::default();
        q.push_circle(2.0, arc, Point::new(1.0, 0.0));

        let order: Vec<EventKind> = std::iter::from_fn(|| q.pop()).map(|e| e.kind).collect();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], EventKind::Site(2));
        // Same (y, x): the circle event comes before the site.
        assert!(matches!(order[1], EventKind::Circle { arc: a, .. } if a == arc));
        assert_eq!(order[2], EventKind::Site(1));
        assert_eq!(order[3], EventKind::Site(0));
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn test_serials_are_unique() {
        let mut q = EventQueue::default();
        let a = q.push_circle(1.0, ArcId::default(), Point::new(0.0, 0.0));
        let b = q.push_circle(1.0, ArcId::default(), Point::new(0.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop().map(|e| e.serial), Some(a));
    }
}
