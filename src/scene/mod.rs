pub mod bvh;
pub mod mesh;
pub mod primitives;

use std::any::Any;

use thiserror::Error;

use crate::geometry::{Aabb, FloatType, Ray, RayBundle, WorldPoint, WorldVector};

pub type Color = rgb::RGB<f32>;

/// Solid surface description carried by leaf primitives and handed out with
/// every hit. The traversal code never looks inside.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub reflection: FloatType,
    pub transparency: FloatType,
    pub gloss: FloatType,
}

impl Material {
    pub fn solid(
        color: Color,
        reflection: FloatType,
        transparency: FloatType,
        gloss: FloatType,
    ) -> Material {
        Material {
            color,
            reflection,
            transparency,
            gloss,
        }
    }
}

impl Default for Material {
    fn default() -> Material {
        Material {
            color: Color::new(0.5, 0.5, 0.5),
            reflection: 0.0,
            transparency: 0.0,
            gloss: 0.0,
        }
    }
}

/// Materials live only on leaf primitives. Asking a hierarchy node or an
/// unbound collection for one is a caller bug and gets refused loudly.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{node_type} is a structural node and does not carry a material")]
pub struct StructuralNodeError {
    pub node_type: &'static str,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HitKind {
    None,
    Hit,
}

/// Result of a single ray/surface intersection.
/// A negative distance marks an intersection behind the ray origin.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectInfo {
    pub hit_kind: HitKind,
    pub distance_to_hit: FloatType,
    pub hit_position: WorldPoint,
    pub normal_at_hit: WorldVector,
    pub material: Material,
}

impl IntersectInfo {
    pub fn is_valid_hit(&self) -> bool {
        self.hit_kind != HitKind::None && self.distance_to_hit >= 0.0
    }
}

/// Anything that rays can be traced against: geometry primitives, flat
/// collections and hierarchy nodes all expose this same interface, so the
/// recursive algorithms are written once and do not care what they recurse
/// into.
pub trait Traceable: Send + Sync {
    /// Nearest valid hit of the ray, None if the ray misses.
    ///
    /// May narrow `ray.max_distance_to_consider` to prune farther geometry;
    /// the caller resets the ray before reusing it. For shadow rays any hit
    /// may be returned, not necessarily the nearest one.
    fn closest_intersection(&self, ray: &mut Ray) -> Option<IntersectInfo>;

    /// Collects the parts of this subtree whose bounds lie completely inside
    /// `region`, returns whether anything was found.
    fn contained<'a>(&'a self, results: &mut Vec<&'a dyn Traceable>, region: &Aabb) -> bool;

    /// Index of the first ray at or after `start_index` that hits this node's
    /// bounds, or `bundle.len()` if there is none.
    ///
    /// Only hierarchy nodes support this; a bare leaf has no useful bounds
    /// test to offer the bundle.
    fn find_first_ray(&self, bundle: &RayBundle, start_index: usize) -> usize {
        let _ = (bundle, start_index);
        unimplemented!("ray bundle traversal is only supported on hierarchy nodes");
    }

    /// Batched variant of `closest_intersection` over a bundle of coherent
    /// rays, writing into one result slot per ray.
    ///
    /// No distance bound is shared between rays or subtrees, so a slot ends up
    /// with the nearest hit among the leaves that were visited, which the
    /// caller must still treat as a candidate rather than a final answer.
    fn closest_intersections(
        &self,
        bundle: &RayBundle,
        start_index: usize,
        results: &mut [Option<IntersectInfo>],
    ) {
        for i in start_index..bundle.len() {
            let mut ray = bundle[i];
            if let Some(info) = self.closest_intersection(&mut ray) {
                if !info.is_valid_hit() {
                    continue;
                }
                let closer = results[i]
                    .as_ref()
                    .is_none_or(|old| info.distance_to_hit < old.distance_to_hit);
                if closer {
                    results[i] = Some(info);
                }
            }
        }
    }

    /// Lazily yields every intersection the ray has within this subtree, in no
    /// particular distance order. Each call starts a fresh, finite iteration.
    fn intersection_iterator<'a>(&'a self, ray: &Ray) -> Box<dyn Iterator<Item = IntersectInfo> + 'a>;

    fn surface_area(&self) -> FloatType;

    fn bounding_box(&self) -> Aabb;

    /// Computation cost of intersecting one ray with this object, in average
    /// CPU cycles. Fixed per object type, used by the hierarchy builder's
    /// cost model.
    fn intersect_cost(&self) -> FloatType;

    fn material(&self) -> Result<&Material, StructuralNodeError>;

    fn set_material(&mut self, material: Material) -> Result<(), StructuralNodeError>;

    /// Escape hatch for inspecting the concrete node type of a built tree.
    fn as_any(&self) -> &dyn Any;
}
