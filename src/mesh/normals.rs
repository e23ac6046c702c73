use glam::Vec3;

use crate::mesh::{Mesh, Polygon};

/// Newell's method. The unnormalized result has length twice the polygon area.
fn newell(mesh: &Mesh, polygon: &Polygon) -> Vec3 {
    polygon
        .edges()
        .map(|(a, b)| {
            let current = mesh.positions[a as usize];
            let next = mesh.positions[b as usize];
            Vec3::new(
                (current.y - next.y) * (current.z + next.z),
                (current.z - next.z) * (current.x + next.x),
                (current.x - next.x) * (current.y + next.y),
            )
        })
        .sum()
}

pub fn face_normal(mesh: &Mesh, polygon: &Polygon) -> Vec3 {
    newell(mesh, polygon).normalize_or(Vec3::Z)
}

/// Area-weighted vertex normals over all polygons.
pub fn vertex_normals(mesh: &Mesh) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; mesh.positions.len()];

    for polygon in &mesh.polygons {
        let weighted = newell(mesh, polygon);

        for &vertex in &polygon.vertices {
            normals[vertex as usize] += weighted;
        }
    }

    normals
        .into_iter()
        .map(|normal| normal.normalize_or(Vec3::Z))
        .collect()
}
