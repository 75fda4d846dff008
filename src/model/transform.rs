use crate::model::math::Vector3;

/// Position, Euler rotation (radians), scale and anchor of a scene object.
///
/// Getters hand out copies. The `_mut` accessors hand out the live value and
/// know nothing about dirty tracking: owners that track changes (actors,
/// the camera) expect callers of those accessors to call `mark_dirty()`
/// themselves afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vector3,
    rotation: Vector3,
    scale: Vector3,
    anchor: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
            anchor: Vector3::ZERO,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn position_mut(&mut self) -> &mut Vector3 {
        &mut self.position
    }

    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    pub fn rotation(&self) -> Vector3 {
        self.rotation
    }

    pub fn rotation_mut(&mut self) -> &mut Vector3 {
        &mut self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vector3) {
        self.rotation = rotation;
    }

    pub fn scale(&self) -> Vector3 {
        self.scale
    }

    pub fn scale_mut(&mut self) -> &mut Vector3 {
        &mut self.scale
    }

    pub fn set_scale(&mut self, scale: Vector3) {
        self.scale = scale;
    }

    pub fn anchor(&self) -> Vector3 {
        self.anchor
    }

    pub fn anchor_mut(&mut self) -> &mut Vector3 {
        &mut self.anchor
    }

    pub fn set_anchor(&mut self, anchor: Vector3) {
        self.anchor = anchor;
    }
}
