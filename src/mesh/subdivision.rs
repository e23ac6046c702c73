//! Catmull-Clark subdivision, as evaluated by the Subsurf modifier.
//!
//! UVs are interpolated linearly inside each polygon; only positions are smoothed.

use glam::{Vec2, Vec3};

use crate::mesh::{Mesh, Polygon};

pub fn catmull_clark(mesh: &Mesh, levels: u32) -> Mesh {
    let mut result = mesh.clone();

    for _ in 0..levels {
        result = subdivide_once(&result);
    }

    result
}

fn subdivide_once(mesh: &Mesh) -> Mesh {
    let edges = mesh.edges();
    let vertex_count = mesh.positions.len();
    let edge_offset = vertex_count;
    let face_offset = vertex_count + edges.len();

    let face_points: Vec<Vec3> = mesh
        .polygons
        .iter()
        .map(|polygon| {
            polygon
                .vertices
                .iter()
                .map(|&v| mesh.positions[v as usize])
                .sum::<Vec3>()
                / polygon.corner_count() as f32
        })
        .collect();

    let edge_midpoints: Vec<Vec3> = edges
        .vertices
        .iter()
        .map(|[a, b]| (mesh.positions[*a as usize] + mesh.positions[*b as usize]) * 0.5)
        .collect();

    let edge_points: Vec<Vec3> = (0..edges.len())
        .map(|edge| match edges.faces[edge].as_slice() {
            [f0, f1] => {
                (edge_midpoints[edge] * 2.0 + face_points[*f0] + face_points[*f1]) * 0.25
            }
            _ => edge_midpoints[edge],
        })
        .collect();

    let mut vertex_faces = vec![Vec::new(); vertex_count];
    for (face_index, polygon) in mesh.polygons.iter().enumerate() {
        for &vertex in &polygon.vertices {
            vertex_faces[vertex as usize].push(face_index);
        }
    }

    let mut vertex_edges = vec![Vec::new(); vertex_count];
    for (edge_index, [a, b]) in edges.vertices.iter().enumerate() {
        vertex_edges[*a as usize].push(edge_index);
        vertex_edges[*b as usize].push(edge_index);
    }

    let vertex_points = (0..vertex_count).map(|vertex| {
        let position = mesh.positions[vertex];
        let incident = &vertex_edges[vertex];

        let boundary: Vec<usize> = incident
            .iter()
            .copied()
            .filter(|&edge| edges.is_boundary(edge))
            .collect();

        if !boundary.is_empty() {
            return match boundary.as_slice() {
                [e0, e1] => position * 0.75 + (edge_midpoints[*e0] + edge_midpoints[*e1]) * 0.125,
                _ => position,
            };
        }

        let valence = incident.len();
        if valence < 3 {
            return position;
        }

        let n = valence as f32;
        let faces = &vertex_faces[vertex];
        let f = faces.iter().map(|&face| face_points[face]).sum::<Vec3>() / faces.len() as f32;
        let r = incident.iter().map(|&edge| edge_midpoints[edge]).sum::<Vec3>() / n;

        (f + r * 2.0 + position * (n - 3.0)) / n
    });

    let mut positions: Vec<Vec3> = vertex_points.collect();
    positions.extend(edge_points);
    positions.extend(face_points);

    let mut polygons = Vec::with_capacity(mesh.polygons.len() * 4);

    for (face_index, polygon) in mesh.polygons.iter().enumerate() {
        let n = polygon.corner_count();
        let center = (face_offset + face_index) as u32;
        let center_uv = polygon.uvs.iter().copied().sum::<Vec2>() / n as f32;

        let corner_edges = &edges.polygon_edges[face_index];
        let edge_point = |i: usize| (edge_offset + corner_edges[i % n]) as u32;
        let edge_uv = |i: usize| (polygon.uvs[i % n] + polygon.uvs[(i + 1) % n]) * 0.5;

        for i in 0..n {
            let previous = i + n - 1;

            polygons.push(Polygon {
                vertices: vec![polygon.vertices[i], edge_point(i), center, edge_point(previous)],
                uvs: vec![polygon.uvs[i], edge_uv(i), center_uv, edge_uv(previous)],
                material_index: polygon.material_index,
                use_smooth: polygon.use_smooth,
            });
        }
    }

    Mesh {
        name: mesh.name.clone(),
        positions,
        polygons,
        materials: mesh.materials.clone(),
    }
}
