use std::ops::Index;

use assert2::assert;

use super::{Aabb, FloatType, Ray, WorldPoint, WorldVector};

/// A fixed group of rays that are expected to be coherent (for example rays of
/// adjacent pixels), traversed together to amortize per-node box tests.
#[derive(Clone, Debug)]
pub struct RayBundle {
    rays: Vec<Ray>,

    // Componentwise bounds over all rays, for the combined rejection test
    origin_min: WorldPoint,
    origin_max: WorldPoint,
    inv_direction_min: WorldVector,
    inv_direction_max: WorldVector,
}

impl RayBundle {
    pub fn new(rays: Vec<Ray>) -> RayBundle {
        assert!(!rays.is_empty(), "a ray bundle needs at least one ray");

        let mut origin_min = rays[0].origin;
        let mut origin_max = rays[0].origin;
        let mut inv_direction_min = rays[0].inv_direction;
        let mut inv_direction_max = rays[0].inv_direction;
        for ray in &rays[1..] {
            origin_min = origin_min.coords.inf(&ray.origin.coords).into();
            origin_max = origin_max.coords.sup(&ray.origin.coords).into();
            inv_direction_min = inv_direction_min.inf(&ray.inv_direction);
            inv_direction_max = inv_direction_max.sup(&ray.inv_direction);
        }

        RayBundle {
            rays,
            origin_min,
            origin_max,
            inv_direction_min,
            inv_direction_max,
        }
    }

    pub fn len(&self) -> usize {
        self.rays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    /// Cheap conservative test whether any ray of the bundle can hit the box.
    /// False guarantees that no ray intersects; true promises nothing.
    ///
    /// Works like the slab test of a single ray, but with interval arithmetic
    /// over the componentwise origin and inverse direction bounds of the whole
    /// bundle, so the per-axis distance ranges cover every ray at once.
    pub fn may_hit(&self, bounds: &Aabb) -> bool {
        let mut bundle_min_t = FloatType::NEG_INFINITY;
        let mut bundle_max_t = FloatType::INFINITY;

        for k in 0..3 {
            let origin = (self.origin_min[k], self.origin_max[k]);
            let inv_direction = (self.inv_direction_min[k], self.inv_direction_max[k]);

            let (to_min_lo, to_min_hi) = slab_distance_interval(bounds.min[k], origin, inv_direction);
            let (to_max_lo, to_max_hi) = slab_distance_interval(bounds.max[k], origin, inv_direction);

            // No ray can enter this slab earlier or leave it later than these
            bundle_min_t = bundle_min_t.max(to_min_lo.min(to_max_lo));
            bundle_max_t = bundle_max_t.min(to_min_hi.max(to_max_hi));
        }

        bundle_min_t <= bundle_max_t && bundle_max_t >= 0.0
    }
}

impl Index<usize> for RayBundle {
    type Output = Ray;

    fn index(&self, index: usize) -> &Ray {
        &self.rays[index]
    }
}

/// Range of distances at which rays with origins in `origin` and inverse
/// directions in `inv_direction` can cross the axis plane at `plane`.
fn slab_distance_interval(
    plane: FloatType,
    origin: (FloatType, FloatType),
    inv_direction: (FloatType, FloatType),
) -> (FloatType, FloatType) {
    let offset = (plane - origin.1, plane - origin.0);
    let products = [
        offset.0 * inv_direction.0,
        offset.0 * inv_direction.1,
        offset.1 * inv_direction.0,
        offset.1 * inv_direction.1,
    ];

    let mut lo = FloatType::INFINITY;
    let mut hi = FloatType::NEG_INFINITY;
    for p in products {
        // 0 * inf, the plane crossing distance is unconstrained
        if p.is_nan() {
            return (FloatType::NEG_INFINITY, FloatType::INFINITY);
        }
        lo = lo.min(p);
        hi = hi.max(p);
    }
    (lo, hi)
}
