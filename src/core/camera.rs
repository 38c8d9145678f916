//! Camera for CPU rendering

use crate::core::types::{DMat3, DQuat, DVec3};

/// Camera with position and an orthonormal world-to-camera orientation.
///
/// Camera space is x right, y up, z forward (the view direction). The
/// orientation is orthonormal, so its inverse is its transpose. The vertical
/// field of view is fixed by the renderers at one focal length per screen
/// height (`fov = 1 / screen_height`, focal plane at z = 1).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    /// World position in voxel units
    pub position: DVec3,
    /// World-to-camera rotation (rows are the camera axes)
    pub orientation: DMat3,
}

impl Camera {
    /// Create a camera from an explicit pose
    pub fn new(position: DVec3, orientation: DMat3) -> Self {
        Self { position, orientation }
    }

    /// Create a camera at `position` looking along `forward`
    pub fn looking(position: DVec3, forward: DVec3, up: DVec3) -> Self {
        let fwd = forward.normalize();
        let right = up.cross(fwd).normalize();
        let up = fwd.cross(right);
        Self {
            position,
            orientation: DMat3::from_cols(right, up, fwd).transpose(),
        }
    }

    /// Create a camera from yaw (around +Y) and pitch (around +X) in radians.
    /// Zero yaw and pitch looks along +Z.
    pub fn from_yaw_pitch(position: DVec3, yaw: f64, pitch: f64) -> Self {
        let rotation = DQuat::from_euler(glam::EulerRot::YXZ, yaw, pitch, 0.0);
        Self {
            position,
            orientation: DMat3::from_quat(rotation).transpose(),
        }
    }

    /// World-to-camera rotation
    pub fn world_to_camera(&self) -> DMat3 {
        self.orientation
    }

    /// Camera-to-world rotation (transpose of the orientation)
    pub fn camera_to_world(&self) -> DMat3 {
        self.orientation.transpose()
    }

    /// View direction in world space
    pub fn forward(&self) -> DVec3 {
        self.camera_to_world().z_axis
    }

    /// Screen-right direction in world space
    pub fn right(&self) -> DVec3 {
        self.camera_to_world().x_axis
    }

    /// Screen-up direction in world space
    pub fn up(&self) -> DVec3 {
        self.camera_to_world().y_axis
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DVec3::ZERO, DMat3::IDENTITY)
    }
}
