//! Bounding volumes and rays.
//!
//! Provides the spatial primitives used by the bounds engine and the ray
//! intersection adapter:
//!
//! - [`Aabb`] - axis-aligned bounding box with an explicit empty sentinel
//! - [`BoundingSphere`] - sphere derived from a box
//! - [`Ray`] - origin + direction with slab and triangle tests

pub use glam::{Mat4, Quat, Vec3};

/// Axis-Aligned Bounding Box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Vec3,
    /// Maximum corner of the bounding box.
    pub max: Vec3,
}

impl Aabb {
    /// The empty box: `min` at `+MAX`, `max` at `-MAX`, so that any union
    /// with a real box yields that box.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    /// Creates a new AABB from min and max corners.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Builds the tightest box around a set of points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |aabb, p| aabb.with_point(p))
    }

    /// Returns true for the empty sentinel (or any inverted box).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Returns the center point of the AABB.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size (full extents) of the AABB.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Checks if a point is inside the AABB.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Returns the union of this AABB with another.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns this box grown to include `point`.
    #[inline]
    #[must_use]
    pub fn with_point(self, point: Vec3) -> Aabb {
        Aabb {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Transform this box by a 4x4 matrix, returning the box around the
    /// eight transformed corners. The empty box stays empty.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let (min, max) = (self.min, self.max);
        let corners = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        Self::from_points(corners.iter().map(|c| matrix.transform_point3(*c)))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Zero-radius sphere at the origin.
    pub const ZERO: Self = Self {
        center: Vec3::ZERO,
        radius: 0.0,
    };

    /// Sphere centered on the box, reaching its corners.
    pub fn from_aabb(aabb: &Aabb) -> Self {
        if aabb.is_empty() {
            return Self::ZERO;
        }
        let center = aabb.center();
        Self {
            center,
            radius: center.distance(aabb.max),
        }
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A ray with an origin and a (not necessarily normalized) direction.
///
/// Hit distances are expressed in units of `direction`, so sorting hits by
/// distance orders them along the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test. Returns the entry distance (0 when the origin is inside).
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Möller–Trumbore ray/triangle test, double sided.
    ///
    /// Returns `(t, u, v)` with barycentric `u`, `v` for hits in front of the
    /// origin.
    pub fn intersect_triangle(&self, a: Vec3, b: Vec3, c: Vec3) -> Option<(f32, f32, f32)> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < 1e-8 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some((t, u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_basics() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::splat(0.5));
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
        assert!(!aabb.is_empty());
    }

    #[test]
    fn empty_is_identity_for_union() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(2.0));
        assert_eq!(Aabb::EMPTY.union(&aabb), aabb);
        assert!(Aabb::EMPTY.is_empty());
        assert_eq!(BoundingSphere::from_aabb(&Aabb::EMPTY), BoundingSphere::ZERO);
    }

    #[test]
    fn sphere_reaches_corners() {
        let sphere = BoundingSphere::from_aabb(&Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
        assert_eq!(sphere.center, Vec3::ZERO);
        assert!((sphere.radius - 3.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn transformed_box() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let moved = aabb.transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn ray_box() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let hit = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z).intersect_aabb(&aabb);
        assert_eq!(hit, Some(4.0));
        let miss = Ray::new(Vec3::new(5.0, 0.0, -5.0), Vec3::Z).intersect_aabb(&aabb);
        assert_eq!(miss, None);
        let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).intersect_aabb(&aabb);
        assert_eq!(behind, None);
    }

    #[test]
    fn ray_triangle() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::Z);
        let (t, _, _) = ray
            .intersect_triangle(Vec3::ZERO, Vec3::X, Vec3::Y)
            .expect("ray should hit the triangle");
        assert!((t - 1.0).abs() < 1e-6);
        assert!(ray
            .intersect_triangle(Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0))
            .is_none());
    }
}
