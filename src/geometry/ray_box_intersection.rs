use super::{Aabb, FloatType, Ray};

impl Aabb {
    /// Calculates ray intersection with the box.
    /// Returns minimum and maximum distance along the ray, ray intersects if min <= max.
    pub fn intersect_range(&self, ray: &Ray) -> (FloatType, FloatType) {
        // Componentwise distances along the ray to the box's min and max corners
        // The multiplication is NAN if the ray is starting inside the slab bounding plane
        // and is parallel to it. In this case we blend to +-infinity, so that the range
        // becomes infinite
        let to_box_min = (self.min - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if x.is_nan() { FloatType::NEG_INFINITY } else { x });
        let to_box_max = (self.max - ray.origin)
            .component_mul(&ray.inv_direction)
            .map(|x| if x.is_nan() { FloatType::INFINITY } else { x });

        // Correctly ordered (min_t <= max_t)
        let componentwise_min_t = to_box_min.zip_map(&to_box_max, FloatType::min);
        let componentwise_max_t = to_box_min.zip_map(&to_box_max, FloatType::max);

        let min_t = componentwise_min_t
            .x
            .max(componentwise_min_t.y.max(componentwise_min_t.z));
        let max_t = componentwise_max_t
            .x
            .min(componentwise_max_t.y.min(componentwise_max_t.z));

        (min_t, max_t)
    }
}

impl Ray {
    /// True if the ray passes through the box closer than its current distance bound.
    /// Rays starting inside the box count as intersecting.
    pub fn intersects(&self, bounds: &Aabb) -> bool {
        let (min_t, max_t) = bounds.intersect_range(self);
        min_t <= max_t && min_t < self.max_distance_to_consider && max_t > 0.0
    }
}
