use std::fmt;

use super::vector2::{Vector2, EPSILON};

/// Axis-aligned box on the ground plane, stored as center + half extents.
///
/// Every query uses closed intervals: boxes that merely touch intersect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub center: Vector2,
    pub half_extents: Vector2,
}

impl Aabb {
    pub fn new(center: Vector2, half_extents: Vector2) -> Self {
        Self { center, half_extents }
    }

    pub fn from_center_size(center: Vector2, size: Vector2) -> Self {
        Self::new(center, size.scale(0.5))
    }

    pub fn from_center_radius(center: Vector2, radius: f64) -> Self {
        Self::new(center, Vector2::splat(radius))
    }

    pub fn from_min_max(min: Vector2, max: Vector2) -> Self {
        Self::new((min + max).scale(0.5), (max - min).scale(0.5))
    }

    /// Tightest box around the points; empty box at the origin for no points
    pub fn from_points(points: &[Vector2]) -> Self {
        let Some((first, rest)) = points.split_first() else {
            return Self::empty();
        };
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Self::from_min_max(min, max)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn infinite() -> Self {
        Self::new(Vector2::ZERO, Vector2::splat(f64::INFINITY))
    }

    pub fn min(&self) -> Vector2 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vector2 {
        self.center + self.half_extents
    }

    pub fn size(&self) -> Vector2 {
        self.half_extents.scale(2.0)
    }

    pub fn area(&self) -> f64 {
        self.half_extents.x * self.half_extents.y * 4.0
    }

    pub fn perimeter(&self) -> f64 {
        (self.half_extents.x + self.half_extents.y) * 4.0
    }

    pub fn is_valid(&self) -> bool {
        self.half_extents.x >= 0.0 && self.half_extents.y >= 0.0
    }

    pub fn is_empty(&self) -> bool {
        self.area() < EPSILON
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        let d = (other.center - self.center).abs();
        d.x + other.half_extents.x <= self.half_extents.x
            && d.y + other.half_extents.y <= self.half_extents.y
    }

    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        let d = (other.center - self.center).abs();
        d.x <= self.half_extents.x + other.half_extents.x
            && d.y <= self.half_extents.y + other.half_extents.y
    }

    pub fn intersects_circle(&self, center: Vector2, radius: f64) -> bool {
        Vector2::distance_squared(self.closest_point(center), center) <= radius * radius
    }

    /// Overlapping region, or None when the boxes are apart
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        if !self.intersects_aabb(other) {
            return None;
        }
        let min = self.min().max(other.min());
        let max = self.max().min(other.max());
        Some(Aabb::from_min_max(min, max))
    }

    /// Smallest translation that would separate `other` from `self`.
    ///
    /// The vector lies on the axis of least overlap and points from `self`
    /// toward `other`; its length is that overlap. None when not intersecting.
    pub fn penetration_vector(&self, other: &Aabb) -> Option<Vector2> {
        if !self.intersects_aabb(other) {
            return None;
        }
        let delta = other.center - self.center;
        let overlap_x = self.half_extents.x + other.half_extents.x - delta.x.abs();
        let overlap_y = self.half_extents.y + other.half_extents.y - delta.y.abs();

        if overlap_y < overlap_x {
            Some(Vector2::new(0.0, sign(delta.y) * overlap_y))
        } else {
            Some(Vector2::new(sign(delta.x) * overlap_x, 0.0))
        }
    }

    pub fn closest_point(&self, point: Vector2) -> Vector2 {
        let d = point - self.center;
        Vector2::new(
            self.center.x + d.x.clamp(-self.half_extents.x, self.half_extents.x),
            self.center.y + d.y.clamp(-self.half_extents.y, self.half_extents.y),
        )
    }

    /// Zero for points inside the box
    pub fn distance_to_point(&self, point: Vector2) -> f64 {
        let d = (point - self.center).abs() - self.half_extents;
        d.max(Vector2::ZERO).magnitude()
    }

    pub fn distance_to_aabb(&self, other: &Aabb) -> f64 {
        let d = (other.center - self.center).abs() - self.half_extents - other.half_extents;
        d.max(Vector2::ZERO).magnitude()
    }

    pub fn union(a: &Aabb, b: &Aabb) -> Aabb {
        Aabb::from_min_max(a.min().min(b.min()), a.max().max(b.max()))
    }

    // In-place growth, chainable

    pub fn set(&mut self, center: Vector2, half_extents: Vector2) -> &mut Self {
        self.center = center;
        self.half_extents = half_extents;
        self
    }

    /// Grow just enough to include `point`
    pub fn expand(&mut self, point: Vector2) -> &mut Self {
        let min = self.min().min(point);
        let max = self.max().max(point);
        *self = Aabb::from_min_max(min, max);
        self
    }

    pub fn expand_aabb(&mut self, other: &Aabb) -> &mut Self {
        *self = Aabb::union(self, other);
        self
    }

    pub fn translate(&mut self, offset: Vector2) -> &mut Self {
        self.center.add_mut(offset);
        self
    }

    /// Scale the extents per axis around the center
    pub fn scale(&mut self, factor: Vector2) -> &mut Self {
        self.half_extents.x *= factor.x;
        self.half_extents.y *= factor.y;
        self
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb(center: {}, half_extents: {})", self.center, self.half_extents)
    }
}
