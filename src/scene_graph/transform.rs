use glam::{Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

/// Object transform: location, XYZ Euler rotation (radians) and per-axis scale.
#[derive(Debug, Clone)]
pub struct Transform {
    location: Vec3,
    rotation_euler: Vec3,
    scale: Vec3,

    local_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_location(location: Vec3) -> Self {
        Self {
            location,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
        }
    }

    pub fn get_local_matrix(&self) -> Ref<Mat4> {
        if self.local_dirty.get() {
            let matrix =
                Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.location);

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
        }

        self.local_matrix.borrow()
    }

    fn invalidate_local(&self) {
        self.local_dirty.set(true);
    }

    /// X is applied first, then Y, then Z.
    pub fn rotation(&self) -> Quat {
        euler_xyz_to_quat(self.rotation_euler)
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn rotation_euler(&self) -> Vec3 {
        self.rotation_euler
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
        self.invalidate_local();
    }

    pub fn set_rotation_euler(&mut self, rotation: Vec3) {
        self.rotation_euler = rotation;
        self.invalidate_local();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate_local();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_location(Vec3::ZERO)
    }
}

pub fn euler_xyz_to_quat(rotation: Vec3) -> Quat {
    Quat::from_rotation_z(rotation.z)
        * Quat::from_rotation_y(rotation.y)
        * Quat::from_rotation_x(rotation.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn local_matrix_tracks_changes() {
        let mut transform = Transform::from_location(Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(
            transform.get_local_matrix().transform_point3(Vec3::ZERO),
            Vec3::new(0.0, 3.0, 0.0)
        );

        transform.set_scale(Vec3::splat(0.5));
        transform.set_rotation_euler(Vec3::new(0.0, 0.0, FRAC_PI_2));

        let point = transform.get_local_matrix().transform_point3(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(0.0, 3.5, 0.0), 1e-5));
    }

    #[test]
    fn euler_order_is_x_then_z() {
        let rotation = euler_xyz_to_quat(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));

        // X turns +Y into +Z, Z leaves +Z alone.
        assert!((rotation * Vec3::Y).abs_diff_eq(Vec3::Z, 1e-5));
        // X leaves +X alone, Z turns it into +Y.
        assert!((rotation * Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
    }
}
