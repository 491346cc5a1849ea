use std::any::Any;

use arrayvec::ArrayVec;

use crate::geometry::{Aabb, FloatType, Ray, WorldPoint, WorldVector};

use super::{HitKind, IntersectInfo, Material, StructuralNodeError, Traceable};

pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    material: Material,
}

impl Sphere {
    /// See `Traceable::intersect_cost`.
    pub const INTERSECT_COST: FloatType = 670.0;

    pub fn new(center: WorldPoint, radius: FloatType, material: Material) -> Sphere {
        Sphere {
            center,
            radius,
            material,
        }
    }

    /// Distances to both crossings of the sphere surface, unordered validity:
    /// entry first, exit second, either may be negative. None if the ray line
    /// misses entirely.
    fn crossing_distances(&self, ray: &Ray) -> Option<(FloatType, FloatType)> {
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        Some((-b - sqrt_disc, -b + sqrt_disc))
    }

    fn info_at(&self, ray: &Ray, t: FloatType) -> IntersectInfo {
        let hit_position = ray.point_at(t);
        IntersectInfo {
            hit_kind: HitKind::Hit,
            distance_to_hit: t,
            hit_position,
            normal_at_hit: (hit_position - self.center) / self.radius,
            material: self.material.clone(),
        }
    }
}

impl Traceable for Sphere {
    fn closest_intersection(&self, ray: &mut Ray) -> Option<IntersectInfo> {
        let (t1, t2) = self.crossing_distances(ray)?;
        let t = if t1 > 0.0 {
            t1
        } else if t2 > 0.0 {
            t2
        } else {
            return None;
        };
        if t > ray.max_distance_to_consider {
            return None;
        }

        Some(self.info_at(ray, t))
    }

    fn contained<'a>(&'a self, results: &mut Vec<&'a dyn Traceable>, region: &Aabb) -> bool {
        if region.contains(&self.bounding_box()) {
            results.push(self);
            true
        } else {
            false
        }
    }

    fn intersection_iterator<'a>(&'a self, ray: &Ray) -> Box<dyn Iterator<Item = IntersectInfo> + 'a> {
        let mut hits = ArrayVec::<IntersectInfo, 2>::new();
        if let Some((t1, t2)) = self.crossing_distances(ray) {
            for t in [t1, t2] {
                if t > 0.0 {
                    hits.push(self.info_at(ray, t));
                }
            }
        }
        Box::new(hits.into_iter())
    }

    fn surface_area(&self) -> FloatType {
        4.0 * std::f64::consts::PI * self.radius * self.radius
    }

    fn bounding_box(&self) -> Aabb {
        let r_vec = WorldVector::repeat(self.radius);
        Aabb {
            min: self.center - r_vec,
            max: self.center + r_vec,
        }
    }

    fn intersect_cost(&self) -> FloatType {
        Sphere::INTERSECT_COST
    }

    fn material(&self) -> Result<&Material, StructuralNodeError> {
        Ok(&self.material)
    }

    fn set_material(&mut self, material: Material) -> Result<(), StructuralNodeError> {
        self.material = material;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single two-sided triangle, the building block of imported meshes.
pub struct MeshTriangle {
    vertices: [WorldPoint; 3],
    material: Material,
}

impl MeshTriangle {
    /// See `Traceable::intersect_cost`.
    pub const INTERSECT_COST: FloatType = 350.0;

    pub fn new(a: WorldPoint, b: WorldPoint, c: WorldPoint, material: Material) -> MeshTriangle {
        MeshTriangle {
            vertices: [a, b, c],
            material,
        }
    }

    pub fn vertices(&self) -> &[WorldPoint; 3] {
        &self.vertices
    }

    /// Distance along the ray and the surface normal facing against the ray.
    /// Adapted from https://en.wikipedia.org/wiki/M%C3%B6ller%E2%80%93Trumbore_intersection_algorithm
    fn crossing(&self, ray: &Ray) -> Option<(FloatType, WorldVector)> {
        let e1 = self.vertices[1] - self.vertices[0];
        let e2 = self.vertices[2] - self.vertices[0];

        let ray_cross_e2 = ray.direction.cross(&e2);
        let det = e1.dot(&ray_cross_e2);

        let inv_det = 1.0 / det; // May be infinite
        let s = ray.origin - self.vertices[0];
        let u = inv_det * s.dot(&ray_cross_e2);

        let s_cross_e1 = s.cross(&e1);
        let v = inv_det * ray.direction.dot(&s_cross_e1);
        let t = inv_det * e2.dot(&s_cross_e1);

        if u < 0.0 || v < 0.0 || u + v > 1.0 || !t.is_finite() || t <= 0.0 {
            return None;
        }

        let normal = e1.cross(&e2).normalize();
        let normal = if normal.dot(&ray.direction) > 0.0 {
            -normal
        } else {
            normal
        };
        Some((t, normal))
    }

    fn info_at(&self, ray: &Ray, t: FloatType, normal: WorldVector) -> IntersectInfo {
        IntersectInfo {
            hit_kind: HitKind::Hit,
            distance_to_hit: t,
            hit_position: ray.point_at(t),
            normal_at_hit: normal,
            material: self.material.clone(),
        }
    }
}

impl Traceable for MeshTriangle {
    fn closest_intersection(&self, ray: &mut Ray) -> Option<IntersectInfo> {
        let (t, normal) = self.crossing(ray)?;
        if t > ray.max_distance_to_consider {
            return None;
        }
        Some(self.info_at(ray, t, normal))
    }

    fn contained<'a>(&'a self, results: &mut Vec<&'a dyn Traceable>, region: &Aabb) -> bool {
        if region.contains(&self.bounding_box()) {
            results.push(self);
            true
        } else {
            false
        }
    }

    fn intersection_iterator<'a>(&'a self, ray: &Ray) -> Box<dyn Iterator<Item = IntersectInfo> + 'a> {
        let mut hits = ArrayVec::<IntersectInfo, 1>::new();
        if let Some((t, normal)) = self.crossing(ray) {
            hits.push(self.info_at(ray, t, normal));
        }
        Box::new(hits.into_iter())
    }

    fn surface_area(&self) -> FloatType {
        let e1 = self.vertices[1] - self.vertices[0];
        let e2 = self.vertices[2] - self.vertices[0];
        e1.cross(&e2).norm() / 2.0
    }

    fn bounding_box(&self) -> Aabb {
        let [a, b, c] = &self.vertices;
        Aabb {
            min: a.coords.inf(&b.coords).inf(&c.coords).into(),
            max: a.coords.sup(&b.coords).sup(&c.coords).into(),
        }
    }

    fn intersect_cost(&self) -> FloatType {
        MeshTriangle::INTERSECT_COST
    }

    fn material(&self) -> Result<&Material, StructuralNodeError> {
        Ok(&self.material)
    }

    fn set_material(&mut self, material: Material) -> Result<(), StructuralNodeError> {
        self.material = material;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
