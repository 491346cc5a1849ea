pub mod geometry;
pub mod scene;

pub use crate::geometry::{Aabb, FloatType, Ray, RayBundle};
pub use crate::scene::bvh::{BvhNode, HierarchyBuilder, UnboundCollection};
pub use crate::scene::{HitKind, IntersectInfo, Material, StructuralNodeError, Traceable};
