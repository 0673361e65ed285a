use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// Min-heap entry for `BinaryHeap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct State<N> {
    pub(crate) cost: OrderedFloat<f64>,
    pub(crate) node: N,
}

impl<N> State<N> {
    pub(crate) fn new(cost: f64, node: N) -> Self {
        Self {
            cost: OrderedFloat(cost),
            node,
        }
    }
}

// Costs are flipped so `BinaryHeap` pops the cheapest entry first.
// Ties go to the lowest node to keep runs reproducible.
impl<N: Ord> Ord for State<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl<N: Ord> PartialOrd for State<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
