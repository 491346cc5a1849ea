mod building;
mod traversal;

pub use building::HierarchyBuilder;

use assert2::assert;

use crate::geometry::{Aabb, Ray};

use super::Traceable;

/// Interior binary node of a bounding volume hierarchy.
///
/// Owns its two subtrees and remembers which axis the builder split on, so
/// traversal can visit the child nearer to the ray origin first.
pub struct BvhNode {
    aabb: Aabb,
    node_a: Box<dyn Traceable>,
    node_b: Box<dyn Traceable>,
    split_axis: usize,
}

impl BvhNode {
    pub fn new(node_a: Box<dyn Traceable>, node_b: Box<dyn Traceable>, split_axis: usize) -> BvhNode {
        // The children are immutable from here on, so the union box can be
        // computed once and cached
        let aabb = node_a.bounding_box() + node_b.bounding_box();
        BvhNode {
            aabb,
            node_a,
            node_b,
            split_axis,
        }
    }

    pub fn split_axis(&self) -> usize {
        self.split_axis
    }

    pub fn children(&self) -> (&dyn Traceable, &dyn Traceable) {
        (self.node_a.as_ref(), self.node_b.as_ref())
    }

    /// Children ordered front to back along the ray, near child first.
    fn traversal_order(&self, ray: &Ray) -> (&dyn Traceable, &dyn Traceable) {
        if ray.direction[self.split_axis] < 0.0 {
            (self.node_b.as_ref(), self.node_a.as_ref())
        } else {
            (self.node_a.as_ref(), self.node_b.as_ref())
        }
    }
}

/// Flat group of traceables for which the builder found no split that would
/// pay for itself. Queries fall back to a linear scan over the members.
pub struct UnboundCollection {
    items: Vec<Box<dyn Traceable>>,
}

impl UnboundCollection {
    pub fn new(items: Vec<Box<dyn Traceable>>) -> UnboundCollection {
        assert!(!items.is_empty(), "an unbound collection needs at least one item");
        UnboundCollection { items }
    }

    pub fn items(&self) -> &[Box<dyn Traceable>] {
        &self.items
    }
}
