use std::ops::{Add, AddAssign};

use assert2::debug_assert;

use super::{FloatType, WorldPoint, WorldVector};

#[derive(Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Aabb {
    /// Cost of one ray/box slab test, in roughly the same units as
    /// `Traceable::intersect_cost` (average CPU cycles).
    pub const INTERSECT_COST: FloatType = 132.0;

    pub fn new(min: WorldPoint, max: WorldPoint) -> Aabb {
        debug_assert!((0..3).all(|k| min[k] <= max[k]));
        Aabb { min, max }
    }

    /// Smallest box covering all points of the iterator, None if it is empty.
    pub fn from_points<I: IntoIterator<Item = WorldPoint>>(points: I) -> Option<Aabb> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Aabb {
            min: first,
            max: first,
        };
        for p in points {
            bounds.min = bounds.min.coords.inf(&p.coords).into();
            bounds.max = bounds.max.coords.sup(&p.coords).into();
        }
        Some(bounds)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.coords.inf(&other.min.coords).into(),
            max: self.max.coords.sup(&other.max.coords).into(),
        }
    }

    /// True if `other` lies completely inside this box (faces touching counts).
    pub fn contains(&self, other: &Aabb) -> bool {
        (0..3).all(|k| self.min[k] <= other.min[k] && other.max[k] <= self.max[k])
    }

    pub fn size(&self) -> WorldVector {
        self.max - self.min
    }

    pub fn surface_area(&self) -> FloatType {
        let size = self.size();
        2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
    }

    pub fn center(&self) -> WorldPoint {
        ((self.min.coords + self.max.coords) / 2.0).into()
    }
}

impl Add for Aabb {
    type Output = Aabb;

    fn add(self, rhs: Aabb) -> Aabb {
        self.union(&rhs)
    }
}

impl AddAssign for Aabb {
    fn add_assign(&mut self, rhs: Aabb) {
        *self = self.union(&rhs);
    }
}
