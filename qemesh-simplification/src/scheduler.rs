//! Collapse scheduler
//!
//! Keeps live edges ordered by ascending collapse cost. Equal costs are
//! served in the order the edges were first scheduled.

use crate::topology::{EdgeId, MeshTopology};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
struct CollapsePriority {
    cost: f64,
    order: u64,
}

impl PartialEq for CollapsePriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for CollapsePriority {}

impl PartialOrd for CollapsePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapsePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: cheaper and older edges rank higher
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Ordered worklist of edges awaiting collapse.
#[derive(Debug, Clone)]
pub struct CollapseScheduler {
    queue: PriorityQueue<EdgeId, CollapsePriority>,
    next_order: u64,
}

impl Default for CollapseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CollapseScheduler {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            next_order: 0,
        }
    }

    /// Schedule every live edge of the store in edge id order.
    pub fn from_topology(topology: &MeshTopology) -> Self {
        let mut scheduler = Self::new();
        for id in topology.live_edge_ids() {
            if let Some(edge) = topology.edge(id) {
                scheduler.schedule(id, edge.cost);
            }
        }
        scheduler
    }

    /// Add an edge, or update its cost if it is already scheduled.
    pub fn schedule(&mut self, edge: EdgeId, cost: f64) {
        if !self.reschedule(edge, cost) {
            let order = self.next_order;
            self.next_order += 1;
            self.queue.push(edge, CollapsePriority { cost, order });
        }
    }

    /// Cheapest live edge and its cost, without removing it.
    pub fn peek_cheapest(&self) -> Option<(EdgeId, f64)> {
        self.queue.peek().map(|(&id, p)| (id, p.cost))
    }

    pub fn pop_cheapest(&mut self) -> Option<(EdgeId, f64)> {
        self.queue.pop().map(|(id, p)| (id, p.cost))
    }

    /// Re-position an edge after its cost changed, keeping its tie-break
    /// order. Returns false if the edge is not scheduled.
    pub fn reschedule(&mut self, edge: EdgeId, cost: f64) -> bool {
        let Some(order) = self.queue.get_priority(&edge).map(|p| p.order) else {
            return false;
        };
        self.queue.change_priority(&edge, CollapsePriority { cost, order });
        true
    }

    pub fn remove(&mut self, edge: EdgeId) -> bool {
        self.queue.remove(&edge).is_some()
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        self.queue.get_priority(&edge).is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.next_order = 0;
    }
}
