//! Conversion from the authoring space (+Z up, -Y forward) to glTF's +Y up.
//!
//! The change of basis is a -90 degree rotation about X: `(x, y, z) -> (x, z, -y)`.
//! Points and directions are rotated; transforms are conjugated by the basis.

use glam::{Mat3, Mat4, Vec3};

pub fn convert_vector(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Exact basis matrix, so axis-aligned offsets convert without rounding noise.
fn basis() -> Mat4 {
    Mat4::from_mat3(Mat3::from_cols(Vec3::X, Vec3::NEG_Z, Vec3::Y))
}

pub fn convert_matrix(matrix: Mat4) -> Mat4 {
    basis() * matrix * basis().transpose()
}
