use assert2::debug_assert;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;

use crate::geometry::{Aabb, FloatType};
use crate::scene::Traceable;

use super::{BvhNode, UnboundCollection};

/// Groups above this size are split at the median without evaluating the cost
/// model, keeping construction cost bounded for very large inputs.
const BIG_GROUP_SIZE: usize = 100;

/// Split costs this close together count as a tie and are broken by center
/// spread instead.
const COST_TIE_TOLERANCE: FloatType = 1e-9;

/// Builds a bounding volume hierarchy bottom layer by layer, recursively
/// partitioning the input with a surface area heuristic.
///
/// The builder carries the rotating axis choice used for oversized groups, so
/// two builders fed the same input produce the same tree and concurrent
/// builds cannot disturb each other.
pub struct HierarchyBuilder {
    next_axis_for_big_groups: usize,
}

impl HierarchyBuilder {
    pub fn new() -> HierarchyBuilder {
        HierarchyBuilder {
            next_axis_for_big_groups: 0,
        }
    }

    /// Turns a flat list of traceables into a query-ready tree.
    ///
    /// An empty list has no tree, a single item is returned unchanged, and
    /// groups where no split pays off become flat collections. The input
    /// items must all have finite bounding boxes and intersect costs.
    pub fn build(&mut self, items: Vec<Box<dyn Traceable>>) -> Option<Box<dyn Traceable>> {
        if items.is_empty() {
            return None;
        }
        Some(self.build_group(items))
    }

    fn build_group(&mut self, mut items: Vec<Box<dyn Traceable>>) -> Box<dyn Traceable> {
        if items.len() == 1 {
            return items.remove(0);
        }

        let split = if items.len() > BIG_GROUP_SIZE {
            let axis = self.next_axis_for_big_groups;
            self.next_axis_for_big_groups = (self.next_axis_for_big_groups + 1) % 3;
            Some(SplitChoice {
                axis,
                index: items.len() / 2,
            })
        } else {
            best_split(&mut items)
        };

        let Some(split) = split else {
            // No split would beat testing all items in place
            return Box::new(UnboundCollection::new(items));
        };

        sort_by_center_on_axis(&mut items, split.axis);
        // The boundary item goes into the left half
        let right_items = items.split_off(split.index + 1);
        let left_items = items;

        let node_a = self.build_group(left_items);
        let node_b = self.build_group(right_items);
        Box::new(BvhNode::new(node_a, node_b, split.axis))
    }
}

impl Default for HierarchyBuilder {
    fn default() -> HierarchyBuilder {
        HierarchyBuilder::new()
    }
}

#[derive(Copy, Clone, Debug)]
struct SplitChoice {
    axis: usize,
    index: usize,
}

/// Evaluates every candidate split position on every axis and returns the
/// cheapest one, or None if leaving the group unsplit is cheapest.
///
/// The candidate cost is the price of two child box tests plus each side's
/// intersection cost weighted by its bounding box area relative to the whole
/// group, the usual surface area heuristic. Both sides' cumulative areas and
/// costs come from one forward and one backward sweep per axis.
fn best_split(items: &mut [Box<dyn Traceable>]) -> Option<SplitChoice> {
    let num_items = items.len();

    let total_intersect_cost: FloatType = items.iter().map(|item| item.intersect_cost()).sum();

    let mut total_bounds = items[0].bounding_box();
    for item in &items[1..] {
        total_bounds += item.bounding_box();
    }
    let area_of_total_bounds = total_bounds.surface_area();
    debug_assert!(total_intersect_cost.is_finite() && area_of_total_bounds.is_finite());

    // Leaving the group unsplit is a candidate too, any split has to beat it
    let mut best_cost = total_intersect_cost;
    let mut best: Option<SplitChoice> = None;

    let mut deviation_on_axis = [0.0; 3];
    let mut left_areas = vec![0.0; num_items - 1];
    let mut right_areas = vec![0.0; num_items - 1];

    for axis in 0..3 {
        sort_by_center_on_axis(items, axis);
        let bounding_boxes: Vec<Aabb> = items.iter().map(|item| item.bounding_box()).collect();

        // Union areas left of every candidate split position
        let mut left_bounds = bounding_boxes[0].clone();
        left_areas[0] = left_bounds.surface_area();
        for i in 1..num_items - 1 {
            left_bounds += bounding_boxes[i].clone();
            left_areas[i] = left_bounds.surface_area();
        }

        // ...and right of every candidate split position
        let mut right_bounds = bounding_boxes[num_items - 1].clone();
        right_areas[num_items - 2] = right_bounds.surface_area();
        for i in (2..num_items).rev() {
            right_bounds += bounding_boxes[i - 1].clone();
            right_areas[i - 2] = right_bounds.surface_area();
        }

        deviation_on_axis[axis] = bounding_boxes[..num_items - 1]
            .iter()
            .map(|bounds| bounds.center()[axis])
            .tuple_windows()
            .map(|(previous, next)| (next - previous).abs())
            .sum();

        let mut intersect_cost_on_left = 0.0;
        for i in 0..num_items - 1 {
            intersect_cost_on_left += items[i].intersect_cost();
            let intersect_cost_on_right = total_intersect_cost - intersect_cost_on_left;

            let left_cost = (left_areas[i] / area_of_total_bounds) * intersect_cost_on_left;
            let right_cost = (right_areas[i] / area_of_total_bounds) * intersect_cost_on_right;
            let this_cost = 2.0 * Aabb::INTERSECT_COST + left_cost + right_cost;

            if this_cost < best_cost + COST_TIE_TOLERANCE {
                if this_cost > best_cost - COST_TIE_TOLERANCE {
                    // Same cost within tolerance: only switch to a new axis if
                    // its centers are spread out more than the previous axis's
                    if axis > 0
                        && best.map(|choice| choice.axis) != Some(axis)
                        && deviation_on_axis[axis] > deviation_on_axis[axis - 1]
                    {
                        best_cost = this_cost;
                        best = Some(SplitChoice { axis, index: i });
                    }
                } else {
                    best_cost = this_cost;
                    best = Some(SplitChoice { axis, index: i });
                }
            }
        }
    }

    best
}

fn sort_by_center_on_axis(items: &mut [Box<dyn Traceable>], axis: usize) {
    items.sort_by_cached_key(|item| OrderedFloat(item.bounding_box().center()[axis]));
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use assert2::{assert, let_assert};

    use super::*;
    use crate::geometry::{Ray, RayBundle, WorldPoint, WorldVector};
    use crate::scene::primitives::Sphere;
    use crate::scene::{HitKind, IntersectInfo, Material, StructuralNodeError};

    /// Minimal box shaped primitive for exercising the builder.
    struct Brick {
        bounds: Aabb,
        material: Material,
    }

    impl Brick {
        const INTERSECT_COST: FloatType = 400.0;

        fn unit_cube(x: FloatType, y: FloatType, z: FloatType) -> Brick {
            let center = WorldPoint::new(x, y, z);
            let half = WorldVector::new(0.5, 0.5, 0.5);
            Brick {
                bounds: Aabb::new(center - half, center + half),
                material: Material::default(),
            }
        }
    }

    impl Traceable for Brick {
        fn closest_intersection(&self, ray: &mut Ray) -> Option<IntersectInfo> {
            let (min_t, max_t) = self.bounds.intersect_range(ray);
            if min_t > max_t || max_t <= 0.0 || min_t >= ray.max_distance_to_consider {
                return None;
            }
            let t = min_t.max(0.0);
            Some(IntersectInfo {
                hit_kind: HitKind::Hit,
                distance_to_hit: t,
                hit_position: ray.point_at(t),
                normal_at_hit: WorldVector::new(1.0, 0.0, 0.0),
                material: self.material.clone(),
            })
        }

        fn contained<'a>(&'a self, results: &mut Vec<&'a dyn Traceable>, region: &Aabb) -> bool {
            if region.contains(&self.bounds) {
                results.push(self);
                true
            } else {
                false
            }
        }

        fn intersection_iterator<'a>(
            &'a self,
            ray: &Ray,
        ) -> Box<dyn Iterator<Item = IntersectInfo> + 'a> {
            let mut ray = *ray;
            ray.reset_distance_bound();
            Box::new(self.closest_intersection(&mut ray).into_iter())
        }

        fn surface_area(&self) -> FloatType {
            self.bounds.surface_area()
        }

        fn bounding_box(&self) -> Aabb {
            self.bounds.clone()
        }

        fn intersect_cost(&self) -> FloatType {
            Brick::INTERSECT_COST
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

    fn sphere(x: FloatType, y: FloatType, z: FloatType, radius: FloatType) -> Box<dyn Traceable> {
        Box::new(Sphere::new(WorldPoint::new(x, y, z), radius, Material::default()))
    }

    fn sphere_grid(nx: usize, ny: usize, nz: usize) -> Vec<Box<dyn Traceable>> {
        let mut items = Vec::new();
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    items.push(sphere(
                        3.0 * i as FloatType,
                        3.0 * j as FloatType,
                        3.0 * k as FloatType,
                        1.0,
                    ));
                }
            }
        }
        items
    }

    fn check_box_invariant(node: &dyn Traceable) {
        if let Some(bvh) = node.as_any().downcast_ref::<BvhNode>() {
            let (a, b) = bvh.children();
            assert!(bvh.bounding_box() == a.bounding_box() + b.bounding_box());
            check_box_invariant(a);
            check_box_invariant(b);
        } else if let Some(collection) = node.as_any().downcast_ref::<UnboundCollection>() {
            for item in collection.items() {
                check_box_invariant(item.as_ref());
            }
        }
    }

    fn structure_signature(node: &dyn Traceable, out: &mut Vec<(u8, usize)>) {
        if let Some(bvh) = node.as_any().downcast_ref::<BvhNode>() {
            out.push((b'n', bvh.split_axis()));
            let (a, b) = bvh.children();
            structure_signature(a, out);
            structure_signature(b, out);
        } else if let Some(collection) = node.as_any().downcast_ref::<UnboundCollection>() {
            out.push((b'c', collection.items().len()));
        } else {
            out.push((b'l', 0));
        }
    }

    #[test]
    fn empty_input_builds_nothing() {
        assert!(HierarchyBuilder::new().build(Vec::new()).is_none());
    }

    #[test]
    fn single_item_is_returned_unchanged() {
        let tree = HierarchyBuilder::new()
            .build(vec![sphere(0.0, 0.0, 0.0, 1.0)])
            .unwrap();
        assert!(tree.as_any().downcast_ref::<Sphere>().is_some());
    }

    #[test]
    fn separated_cubes_split_on_their_axis() {
        let items: Vec<Box<dyn Traceable>> = vec![
            Box::new(Brick::unit_cube(0.0, 0.0, 0.0)),
            Box::new(Brick::unit_cube(10.0, 0.0, 0.0)),
            Box::new(Brick::unit_cube(20.0, 0.0, 0.0)),
        ];
        let tree = HierarchyBuilder::new().build(items).unwrap();

        let_assert!(Some(root) = tree.as_any().downcast_ref::<BvhNode>());
        assert!(root.split_axis() == 0);
        check_box_invariant(tree.as_ref());
    }

    #[test]
    fn tied_axes_resolve_by_center_spread() {
        // Identical group shape as above, but spread along y; the x axis ties
        // on cost and must lose to the better spread y axis
        let items: Vec<Box<dyn Traceable>> = vec![
            Box::new(Brick::unit_cube(0.0, 0.0, 0.0)),
            Box::new(Brick::unit_cube(0.0, 10.0, 0.0)),
            Box::new(Brick::unit_cube(0.0, 20.0, 0.0)),
        ];
        let tree = HierarchyBuilder::new().build(items).unwrap();

        let_assert!(Some(root) = tree.as_any().downcast_ref::<BvhNode>());
        assert!(root.split_axis() == 1);
    }

    #[test]
    fn overlapping_items_stay_unsplit() {
        let items = vec![sphere(0.0, 0.0, 0.0, 1.0), sphere(0.0, 0.0, 0.0, 1.0)];
        let tree = HierarchyBuilder::new().build(items).unwrap();

        let_assert!(Some(collection) = tree.as_any().downcast_ref::<UnboundCollection>());
        assert!(collection.items().len() == 2);
    }

    #[test]
    fn small_cloud_keeps_box_invariant() {
        let tree = HierarchyBuilder::new().build(sphere_grid(4, 4, 4)).unwrap();
        check_box_invariant(tree.as_ref());
    }

    #[test]
    fn big_group_keeps_box_invariant() {
        let tree = HierarchyBuilder::new().build(sphere_grid(6, 6, 4)).unwrap();
        check_box_invariant(tree.as_ref());
    }

    #[test]
    fn big_group_rotates_the_axis_between_builds() {
        let mut builder = HierarchyBuilder::new();

        let first = builder.build(sphere_grid(6, 5, 5)).unwrap();
        let_assert!(Some(root) = first.as_any().downcast_ref::<BvhNode>());
        assert!(root.split_axis() == 0);
        assert!(builder.next_axis_for_big_groups == 1);

        let second = builder.build(sphere_grid(6, 5, 5)).unwrap();
        let_assert!(Some(root) = second.as_any().downcast_ref::<BvhNode>());
        assert!(root.split_axis() == 1);
    }

    #[test]
    fn identical_inputs_build_identical_trees() {
        let first = HierarchyBuilder::new().build(sphere_grid(6, 6, 4)).unwrap();
        let second = HierarchyBuilder::new().build(sphere_grid(6, 6, 4)).unwrap();

        let mut first_signature = Vec::new();
        let mut second_signature = Vec::new();
        structure_signature(first.as_ref(), &mut first_signature);
        structure_signature(second.as_ref(), &mut second_signature);

        assert!(first_signature == second_signature);
    }

    #[test]
    fn built_tree_answers_queries() {
        let tree = HierarchyBuilder::new().build(sphere_grid(6, 6, 4)).unwrap();

        // Straight down the first column of spheres
        let mut ray = Ray::new(
            WorldPoint::new(0.0, 0.0, -5.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let hit = tree.closest_intersection(&mut ray).unwrap();
        assert!((hit.distance_to_hit - 4.0).abs() < 1e-9);

        // The same query through the bundle interface
        let bundle = RayBundle::new(vec![
            Ray::new(WorldPoint::new(0.0, 0.0, -5.0), WorldVector::new(0.0, 0.0, 1.0)),
            Ray::new(WorldPoint::new(3.0, 0.0, -5.0), WorldVector::new(0.0, 0.0, 1.0)),
        ]);
        let mut results = vec![None; bundle.len()];
        tree.closest_intersections(&bundle, 0, &mut results);
        for slot in &results {
            let_assert!(Some(info) = slot);
            assert!((info.distance_to_hit - 4.0).abs() < 1e-9);
        }
    }
}
