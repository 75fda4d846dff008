use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use glam::Vec3;

use super::Vector2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const ONE: Vector3 = Vector3::new(1.0, 1.0, 1.0);
    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const DOWN: Vector3 = Vector3::new(0.0, -1.0, 0.0);
    pub const LEFT: Vector3 = Vector3::new(-1.0, 0.0, 0.0);
    pub const RIGHT: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const FORWARD: Vector3 = Vector3::new(0.0, 0.0, 1.0);
    pub const BACK: Vector3 = Vector3::new(0.0, 0.0, -1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn scale(&self, s: f64) -> Vector3 {
        Vector3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn divide(&self, s: f64) -> Vector3 {
        Vector3::new(self.x / s, self.y / s, self.z / s)
    }

    pub fn dot(&self, v: Vector3) -> f64 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    pub fn cross(&self, v: Vector3) -> Vector3 {
        Vector3::new(
            self.y * v.z - self.z * v.y,
            self.z * v.x - self.x * v.z,
            self.x * v.y - self.y * v.x,
        )
    }

    pub fn magnitude(&self) -> f64 {
        self.dot(*self).sqrt()
    }

    /// Unit vector in the same direction; the zero vector normalizes to itself
    pub fn normalize(&self) -> Vector3 {
        let mag = self.magnitude();
        if mag == 0.0 {
            return Vector3::ZERO;
        }
        self.divide(mag)
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Projection onto the ground plane as (x, z)
    pub fn ground(&self) -> Vector2 {
        Vector2::new(self.x, self.z)
    }

    pub fn add_mut(&mut self, v: Vector3) -> &mut Self {
        self.x += v.x;
        self.y += v.y;
        self.z += v.z;
        self
    }

    pub fn sub_mut(&mut self, v: Vector3) -> &mut Self {
        self.x -= v.x;
        self.y -= v.y;
        self.z -= v.z;
        self
    }

    pub fn scale_mut(&mut self, s: f64) -> &mut Self {
        self.x *= s;
        self.y *= s;
        self.z *= s;
        self
    }

    pub fn divide_mut(&mut self, s: f64) -> &mut Self {
        self.x /= s;
        self.y /= s;
        self.z /= s;
        self
    }

    pub fn normalize_mut(&mut self) -> &mut Self {
        *self = self.normalize();
        self
    }

    pub fn set(&mut self, x: f64, y: f64, z: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    pub fn zero(&mut self) -> &mut Self {
        self.set(0.0, 0.0, 0.0)
    }

    pub fn distance(a: Vector3, b: Vector3) -> f64 {
        (a - b).magnitude()
    }

    pub fn lerp(a: Vector3, b: Vector3, t: f64) -> Vector3 {
        a + (b - a) * t
    }

    pub fn approx_eq(&self, other: Vector3, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Vector3) {
        self.add_mut(rhs);
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: f64) -> Vector3 {
        self.scale(rhs)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;
    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl From<Vector3> for Vec3 {
    fn from(v: Vector3) -> Vec3 {
        Vec3::new(v.x as f32, v.y as f32, v.z as f32)
    }
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Vector3 {
        Vector3::new(v.x as f64, v.y as f64, v.z as f64)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vector3::ZERO.normalize(), Vector3::ZERO);
        let mut v = Vector3::ZERO;
        v.normalize_mut();
        assert_eq!(v, Vector3::ZERO);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vector3::RIGHT.cross(Vector3::UP), Vector3::FORWARD);
        assert_eq!(Vector3::UP.cross(Vector3::RIGHT), Vector3::BACK);
    }

    #[test]
    fn lerp_and_distance() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(2.0, 4.0, 4.0);
        assert_eq!(Vector3::lerp(a, b, 0.5), Vector3::new(1.0, 2.0, 2.0));
        assert_eq!(Vector3::distance(a, b), 6.0);
    }

    #[test]
    fn glam_conversion_keeps_components() {
        let v = Vector3::new(1.5, -2.0, 3.25);
        let g: Vec3 = v.into();
        assert_eq!(Vector3::from(g), v);
    }
}
