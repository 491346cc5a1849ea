use std::any::Any;

use crate::geometry::{Aabb, FloatType, Ray, RayBundle};
use crate::scene::{HitKind, IntersectInfo, Material, StructuralNodeError, Traceable};

use super::{BvhNode, UnboundCollection};

impl Traceable for BvhNode {
    fn closest_intersection(&self, ray: &mut Ray) -> Option<IntersectInfo> {
        if !ray.intersects(&self.aabb) {
            return None;
        }

        let (check_first, check_second) = self.traversal_order(ray);

        let info_first = check_first.closest_intersection(ray);
        if let Some(info) = &info_first {
            if info.hit_kind != HitKind::None {
                if ray.is_shadow_ray {
                    // Any hit settles a shadow query
                    return info_first;
                }
                ray.max_distance_to_consider = info.distance_to_hit;
            }
        }

        let info_second = check_second.closest_intersection(ray);
        if let Some(info) = &info_second {
            if info.hit_kind != HitKind::None {
                if ray.is_shadow_ray {
                    return info_second;
                }
                ray.max_distance_to_consider = info.distance_to_hit;
            }
        }

        match (info_first, info_second) {
            (Some(first), Some(second)) if first.is_valid_hit() && second.is_valid_hit() => {
                if second.distance_to_hit < first.distance_to_hit {
                    Some(second)
                } else {
                    Some(first)
                }
            }
            (Some(first), _) if first.is_valid_hit() => Some(first),
            (_, second) => second,
        }
    }

    fn contained<'a>(&'a self, results: &mut Vec<&'a dyn Traceable>, region: &Aabb) -> bool {
        if self.aabb.contains(region) {
            let result_a = self.node_a.contained(results, region);
            let result_b = self.node_b.contained(results, region);
            return result_a | result_b;
        }

        false
    }

    fn find_first_ray(&self, bundle: &RayBundle, start_index: usize) -> usize {
        let count = bundle.len();
        if start_index >= count {
            return count;
        }

        // check if the representative ray hits the bounding box directly
        if bundle[start_index].intersects(&self.aabb) {
            return start_index;
        }

        // check if the whole bundle misses
        if !bundle.may_hit(&self.aabb) {
            return count;
        }

        // check each ray until one hits or all miss
        for i in start_index + 1..count {
            if bundle[i].intersects(&self.aabb) {
                return i;
            }
        }

        count
    }

    fn closest_intersections(
        &self,
        bundle: &RayBundle,
        start_index: usize,
        results: &mut [Option<IntersectInfo>],
    ) {
        let start_ray_index = self.find_first_ray(bundle, start_index);
        if start_ray_index == bundle.len() {
            // no ray of the bundle reaches this subtree
            return;
        }

        let (check_first, check_second) = self.traversal_order(&bundle[start_ray_index]);
        check_first.closest_intersections(bundle, start_ray_index, results);
        check_second.closest_intersections(bundle, start_ray_index, results);
    }

    fn intersection_iterator<'a>(&'a self, ray: &Ray) -> Box<dyn Iterator<Item = IntersectInfo> + 'a> {
        if !ray.intersects(&self.aabb) {
            return Box::new(std::iter::empty());
        }

        let (check_first, check_second) = self.traversal_order(ray);
        Box::new(
            check_first
                .intersection_iterator(ray)
                .chain(check_second.intersection_iterator(ray))
                .filter(|info| info.hit_kind != HitKind::None),
        )
    }

    fn surface_area(&self) -> FloatType {
        self.aabb.surface_area()
    }

    fn bounding_box(&self) -> Aabb {
        self.aabb.clone()
    }

    fn intersect_cost(&self) -> FloatType {
        Aabb::INTERSECT_COST
    }

    fn material(&self) -> Result<&Material, StructuralNodeError> {
        Err(StructuralNodeError {
            node_type: "BvhNode",
        })
    }

    fn set_material(&mut self, _material: Material) -> Result<(), StructuralNodeError> {
        Err(StructuralNodeError {
            node_type: "BvhNode",
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Traceable for UnboundCollection {
    fn closest_intersection(&self, ray: &mut Ray) -> Option<IntersectInfo> {
        let mut best_info: Option<IntersectInfo> = None;
        for item in &self.items {
            if let Some(info) = item.closest_intersection(ray) {
                if !info.is_valid_hit() {
                    continue;
                }
                if ray.is_shadow_ray {
                    return Some(info);
                }
                let better = best_info
                    .as_ref()
                    .is_none_or(|best| info.distance_to_hit < best.distance_to_hit);
                if better {
                    best_info = Some(info);
                }
            }
        }

        best_info
    }

    fn contained<'a>(&'a self, results: &mut Vec<&'a dyn Traceable>, region: &Aabb) -> bool {
        if !region.contains(&self.bounding_box()) {
            return false;
        }

        let mut found_item = false;
        for item in &self.items {
            found_item |= item.contained(results, region);
        }

        found_item
    }

    fn intersection_iterator<'a>(&'a self, ray: &Ray) -> Box<dyn Iterator<Item = IntersectInfo> + 'a> {
        let ray = *ray;
        Box::new(
            self.items
                .iter()
                .flat_map(move |item| item.intersection_iterator(&ray)),
        )
    }

    fn surface_area(&self) -> FloatType {
        self.items.iter().map(|item| item.surface_area()).sum()
    }

    fn bounding_box(&self) -> Aabb {
        let mut total_bounds = self.items[0].bounding_box();
        for item in &self.items[1..] {
            total_bounds += item.bounding_box();
        }
        total_bounds
    }

    fn intersect_cost(&self) -> FloatType {
        self.items.iter().map(|item| item.intersect_cost()).sum()
    }

    fn material(&self) -> Result<&Material, StructuralNodeError> {
        Err(StructuralNodeError {
            node_type: "UnboundCollection",
        })
    }

    fn set_material(&mut self, _material: Material) -> Result<(), StructuralNodeError> {
        Err(StructuralNodeError {
            node_type: "UnboundCollection",
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
