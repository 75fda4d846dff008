use std::f64::consts::PI;
use std::fmt;
use std::ops::Mul;

use super::Vector3;

const SINGULAR_EPSILON: f64 = 1e-10;

/// Row-major 3x3 matrix. Only used for rotations here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub elements: [f64; 9],
}

impl Default for Matrix3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix3 {
    pub const IDENTITY: Matrix3 = Matrix3 {
        elements: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };
    pub const ZERO: Matrix3 = Matrix3 { elements: [0.0; 9] };

    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        m00: f64, m01: f64, m02: f64,
        m10: f64, m11: f64, m12: f64,
        m20: f64, m21: f64, m22: f64,
    ) -> Self {
        Self { elements: [m00, m01, m02, m10, m11, m12, m20, m21, m22] }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.elements[row * 3 + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.elements[row * 3 + col] = value;
    }

    pub fn multiply(&self, other: &Matrix3) -> Matrix3 {
        let mut result = Matrix3::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                let sum = (0..3).map(|k| self.get(i, k) * other.get(k, j)).sum();
                result.set(i, j, sum);
            }
        }
        result
    }

    pub fn multiply_vector(&self, v: Vector3) -> Vector3 {
        Vector3::new(
            self.get(0, 0) * v.x + self.get(0, 1) * v.y + self.get(0, 2) * v.z,
            self.get(1, 0) * v.x + self.get(1, 1) * v.y + self.get(1, 2) * v.z,
            self.get(2, 0) * v.x + self.get(2, 1) * v.y + self.get(2, 2) * v.z,
        )
    }

    pub fn transpose(&self) -> Matrix3 {
        let mut result = Matrix3::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                result.set(i, j, self.get(j, i));
            }
        }
        result
    }

    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, e, f, g, h, i] = self.elements;
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// None when the matrix is singular
    pub fn inverse(&self) -> Option<Matrix3> {
        let det = self.determinant();
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let [a, b, c, d, e, f, g, h, i] = self.elements;
        let inv = 1.0 / det;
        Some(Matrix3::new(
            (e * i - f * h) * inv,
            (c * h - b * i) * inv,
            (b * f - c * e) * inv,
            (f * g - d * i) * inv,
            (a * i - c * g) * inv,
            (c * d - a * f) * inv,
            (d * h - e * g) * inv,
            (b * g - a * h) * inv,
            (a * e - b * d) * inv,
        ))
    }

    /// Rotation matrix for Euler angles applied as Z * Y * X (x first)
    pub fn from_euler_angles(x: f64, y: f64, z: f64) -> Matrix3 {
        let (sx, cx) = x.sin_cos();
        let (sy, cy) = y.sin_cos();
        let (sz, cz) = z.sin_cos();

        Matrix3::new(
            cy * cz,
            sx * sy * cz - cx * sz,
            cx * sy * cz + sx * sz,
            cy * sz,
            sx * sy * sz + cx * cz,
            cx * sy * sz - sx * cz,
            -sy,
            sx * cy,
            cx * cy,
        )
    }

    /// Inverse of `from_euler_angles` (away from gimbal lock)
    pub fn to_euler_angles(&self) -> Vector3 {
        Vector3::new(
            self.get(2, 1).atan2(self.get(2, 2)),
            (-self.get(2, 0)).atan2(self.get(2, 1).hypot(self.get(2, 2))),
            self.get(1, 0).atan2(self.get(0, 0)),
        )
    }

    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Matrix3 {
        let n = axis.normalize();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (n.x, n.y, n.z);

        Matrix3::new(
            c + x * x * t,
            x * y * t - z * s,
            x * z * t + y * s,
            y * x * t + z * s,
            c + y * y * t,
            y * z * t - x * s,
            z * x * t - y * s,
            z * y * t + x * s,
            c + z * z * t,
        )
    }

    /// Axis and angle of this rotation. Near 0 and near PI the axis cannot be
    /// recovered from the skew part, so `Vector3::UP` is returned instead.
    pub fn to_axis_angle(&self) -> (Vector3, f64) {
        let trace = self.get(0, 0) + self.get(1, 1) + self.get(2, 2);
        let angle = ((trace - 1.0) / 2.0).clamp(-1.0, 1.0).acos();

        if angle.abs() < SINGULAR_EPSILON || (angle - PI).abs() < SINGULAR_EPSILON {
            return (Vector3::UP, angle);
        }

        let axis = Vector3::new(
            self.get(2, 1) - self.get(1, 2),
            self.get(0, 2) - self.get(2, 0),
            self.get(1, 0) - self.get(0, 1),
        );
        (axis.normalize(), angle)
    }

    pub fn from_quaternion(qx: f64, qy: f64, qz: f64, qw: f64) -> Matrix3 {
        let (xx, yy, zz) = (qx * qx, qy * qy, qz * qz);
        let (xy, xz, yz) = (qx * qy, qx * qz, qy * qz);
        let (wx, wy, wz) = (qw * qx, qw * qy, qw * qz);

        Matrix3::new(
            1.0 - 2.0 * (yy + zz),
            2.0 * (xy - wz),
            2.0 * (xz + wy),
            2.0 * (xy + wz),
            1.0 - 2.0 * (xx + zz),
            2.0 * (yz - wx),
            2.0 * (xz - wy),
            2.0 * (yz + wx),
            1.0 - 2.0 * (xx + yy),
        )
    }

    pub fn rotation_x(angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        Matrix3::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c)
    }

    pub fn rotation_y(angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        Matrix3::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c)
    }

    pub fn rotation_z(angle: f64) -> Matrix3 {
        let (s, c) = angle.sin_cos();
        Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
    }

    pub fn approx_eq(&self, other: &Matrix3) -> bool {
        self.elements
            .iter()
            .zip(other.elements.iter())
            .all(|(a, b)| (a - b).abs() <= SINGULAR_EPSILON)
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;
    fn mul(self, rhs: Matrix3) -> Matrix3 {
        self.multiply(&rhs)
    }
}

impl Mul<Vector3> for Matrix3 {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.multiply_vector(rhs)
    }
}

impl fmt::Display for Matrix3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            writeln!(
                f,
                "[{:.3}, {:.3}, {:.3}]",
                self.get(row, 0),
                self.get(row, 1),
                self.get(row, 2)
            )?;
        }
        Ok(())
    }
}
