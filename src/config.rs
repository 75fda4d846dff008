use std::f64::consts::{FRAC_PI_4, PI};

use crate::model::math::Vector3;

/// Player locomotion and waddle tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// Ground speed in em per second
    pub move_speed: f64,
    /// Resting yaw; the scene is viewed rotated 45 degrees
    pub base_yaw: f64,
    /// Peak lean in radians
    pub waddle_amplitude: f64,
    /// One full left-right-left lean cycle
    pub waddle_period_ms: f64,
    /// Time for the lean to settle after stopping
    pub ending_duration_ms: f64,
    /// Horizontal distance from the origin to the foot the lean pivots on
    pub foot_offset: f64,
    pub foot_height: f64,
    /// Half extents of the ground collision box
    pub collision_half_extent: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 8.0,
            base_yaw: FRAC_PI_4,
            waddle_amplitude: 0.12,
            waddle_period_ms: 450.0,
            ending_duration_ms: 200.0,
            foot_offset: 0.6,
            foot_height: 0.0,
            collision_half_extent: 1.0,
        }
    }
}

/// Fixed pose of the follow camera relative to the player
#[derive(Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub rotation: Vector3,
    pub distance: f64,
    pub height: f64,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            rotation: Vector3::new(FRAC_PI_4, FRAC_PI_4, 0.0),
            distance: 20.0,
            height: 20.0,
        }
    }
}

impl CameraRig {
    /// Camera position relative to the tracked object
    pub fn position_offset(&self) -> Vector3 {
        let yaw = self.rotation.y;
        Vector3::new(yaw.cos(), 0.0, yaw.sin()) * -self.distance + Vector3::new(0.0, self.height, 0.0)
    }
}

/// Free-fly debug camera steps, applied once per key press
#[derive(Debug, Clone, PartialEq)]
pub struct DebugFlyConfig {
    pub move_step: f64,
    pub rotation_step: f64,
}

impl Default for DebugFlyConfig {
    fn default() -> Self {
        Self {
            move_step: 5.0,
            rotation_step: PI / 24.0,
        }
    }
}

/// Invisible wall on the ground plane, centered at (x, y) on the floor
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierConfig {
    pub x: f64,
    pub y: f64,
    pub half_x: f64,
    pub half_y: f64,
}

impl BarrierConfig {
    pub fn new(x: f64, y: f64, half_x: f64, half_y: f64) -> Self {
        Self { x, y, half_x, half_y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Free-fly camera instead of following the player
    pub debug_camera: bool,
    /// Bind render targets to the barriers so their areas are visible
    pub show_barriers: bool,
    pub player: PlayerConfig,
    pub rig: CameraRig,
    pub debug_fly: DebugFlyConfig,
    pub barriers: Vec<BarrierConfig>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            debug_camera: false,
            show_barriers: false,
            player: PlayerConfig::default(),
            rig: CameraRig::default(),
            debug_fly: DebugFlyConfig::default(),
            // ice floor edges
            barriers: vec![
                BarrierConfig::new(0.0, -20.0, 20.0, 1.0),
                BarrierConfig::new(0.0, 20.0, 20.0, 1.0),
                BarrierConfig::new(-20.0, 0.0, 1.0, 20.0),
                BarrierConfig::new(20.0, 0.0, 1.0, 20.0),
            ],
        }
    }
}

impl SceneConfig {
    /// Defaults adjusted by URL query flags: `debug`, `showAll`
    pub fn from_query(query: &str) -> Self {
        let mut config = Self::default();
        let flags = query
            .trim_start_matches('?')
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| p.split_once('=').map_or(p, |(k, _)| k));
        for flag in flags {
            match flag {
                "debug" => config.debug_camera = true,
                "showAll" => config.show_barriers = true,
                other => tracing::debug!("ignoring query flag {other}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_flags() {
        let config = SceneConfig::from_query("?showAll&debug=1&utm=x");
        assert!(config.debug_camera);
        assert!(config.show_barriers);
        assert_eq!(SceneConfig::from_query(""), SceneConfig::default());
    }

    #[test]
    fn rig_offset_sits_behind_and_above() {
        let offset = CameraRig::default().position_offset();
        let back = -20.0 * FRAC_PI_4.cos();
        assert!(offset.approx_eq(Vector3::new(back, 20.0, back), 1e-9));
    }
}
