use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Magnitudes below this are treated as zero by `normalize`
pub const EPSILON: f64 = 1e-5;

/// 2D vector on the ground plane (x, z of the world map to x, y here)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };
    pub const ONE: Vector2 = Vector2 { x: 1.0, y: 1.0 };
    pub const UP: Vector2 = Vector2 { x: 0.0, y: 1.0 };
    pub const DOWN: Vector2 = Vector2 { x: 0.0, y: -1.0 };
    pub const LEFT: Vector2 = Vector2 { x: -1.0, y: 0.0 };
    pub const RIGHT: Vector2 = Vector2 { x: 1.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn splat(v: f64) -> Self {
        Self::new(v, v)
    }

    pub fn scale(&self, s: f64) -> Vector2 {
        Vector2::new(self.x * s, self.y * s)
    }

    pub fn divide(&self, s: f64) -> Vector2 {
        Vector2::new(self.x / s, self.y / s)
    }

    pub fn dot(&self, v: Vector2) -> f64 {
        self.x * v.x + self.y * v.y
    }

    /// z component of the 3D cross product
    pub fn cross(&self, v: Vector2) -> f64 {
        self.x * v.y - self.y * v.x
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Unit vector in the same direction, or zero for near-zero input
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag < EPSILON {
            return Vector2::ZERO;
        }
        self.divide(mag)
    }

    pub fn abs(&self) -> Vector2 {
        Vector2::new(self.x.abs(), self.y.abs())
    }

    pub fn min(&self, v: Vector2) -> Vector2 {
        Vector2::new(self.x.min(v.x), self.y.min(v.y))
    }

    pub fn max(&self, v: Vector2) -> Vector2 {
        Vector2::new(self.x.max(v.x), self.y.max(v.y))
    }

    // In-place variants, chainable

    pub fn add_mut(&mut self, v: Vector2) -> &mut Self {
        self.x += v.x;
        self.y += v.y;
        self
    }

    pub fn sub_mut(&mut self, v: Vector2) -> &mut Self {
        self.x -= v.x;
        self.y -= v.y;
        self
    }

    pub fn scale_mut(&mut self, s: f64) -> &mut Self {
        self.x *= s;
        self.y *= s;
        self
    }

    pub fn divide_mut(&mut self, s: f64) -> &mut Self {
        self.x /= s;
        self.y /= s;
        self
    }

    pub fn normalize_mut(&mut self) -> &mut Self {
        *self = self.normalize();
        self
    }

    pub fn set(&mut self, x: f64, y: f64) -> &mut Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn zero(&mut self) -> &mut Self {
        self.set(0.0, 0.0)
    }

    pub fn distance(a: Vector2, b: Vector2) -> f64 {
        (a - b).magnitude()
    }

    pub fn distance_squared(a: Vector2, b: Vector2) -> f64 {
        (a - b).magnitude_squared()
    }

    pub fn lerp(a: Vector2, b: Vector2, t: f64) -> Vector2 {
        a + (b - a) * t
    }

    /// Unsigned angle between two vectors in radians
    pub fn angle_between(a: Vector2, b: Vector2) -> f64 {
        a.normalize().dot(b.normalize()).clamp(-1.0, 1.0).acos()
    }

    pub fn from_angle(angle: f64) -> Vector2 {
        Vector2::new(angle.cos(), angle.sin())
    }

    pub fn to_angle(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        self.scale(rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector2({}, {})", self.x, self.y)
    }
}
