// Linear algebra for the scene: ground-plane vectors and boxes, 3D vectors and rotations
pub mod vector2;
pub mod vector3;
pub mod matrix3;
pub mod aabb;

pub use vector2::Vector2;
pub use vector3::Vector3;
pub use matrix3::Matrix3;
pub use aabb::Aabb;
