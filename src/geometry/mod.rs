mod aabb;
mod ray_box_intersection;
mod ray_bundle;

pub use aabb::Aabb;
pub use ray_bundle::RayBundle;

pub type FloatType = f64;

pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: WorldVector,

    /// Componentwise inverse of the ray direction
    /// Zeros in direction get turned into positive infinity regardless of the sign of the zero
    pub inv_direction: WorldVector,

    /// Upper bound on hit distances this ray still cares about.
    /// Traversal narrows this monotonically as closer hits are found;
    /// reset it before reusing the ray for a new query.
    pub max_distance_to_consider: FloatType,

    /// Shadow rays only need to know whether anything is hit at all,
    /// traversal may stop at the first hit found.
    pub is_shadow_ray: bool,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        let direction = direction.normalize();
        let inv_direction = direction.map(|x| {
            if x == 0.0 {
                FloatType::INFINITY
            } else {
                1.0 / x
            }
        });

        Ray {
            origin,
            direction,
            inv_direction,
            max_distance_to_consider: FloatType::INFINITY,
            is_shadow_ray: false,
        }
    }

    pub fn new_shadow(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            is_shadow_ray: true,
            ..Ray::new(origin, direction)
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }

    /// Makes the ray consider arbitrarily distant hits again,
    /// undoing the narrowing done by previous traversals.
    pub fn reset_distance_bound(&mut self) {
        self.max_distance_to_consider = FloatType::INFINITY;
    }
}
