use std::cmp::Ordering;

use petgraph::graph::NodeIndex;

use crate::{Meters, NodeId};

/// Heap entry for the shortest-path search
#[derive(Copy, Clone, Debug)]
pub(super) struct State {
    pub(super) cost: Meters,
    /// Stable node id, used to order equal costs
    pub(super) id: NodeId,
    pub(super) node: NodeIndex,
}

// Min-heap by cost, equal costs pop the lowest node id first
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}
