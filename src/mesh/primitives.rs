//! Mesh primitives, laid out the way the authoring tool builds them:
//! +Z is up, poles of the UV sphere sit on the Z axis.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::mesh::Mesh;

pub const DEFAULT_SPHERE_SEGMENTS: u32 = 32;
pub const DEFAULT_SPHERE_RINGS: u32 = 16;

/// Creates a UV sphere centered at the origin.
///
/// The poles are single vertices closed with triangle fans; every other band
/// is made of quads.
///
/// # Arguments
/// * `segments` - Number of divisions around the Z axis. Minimum 3.
/// * `rings` - Number of divisions from pole to pole. Minimum 3.
pub fn uv_sphere(name: impl Into<String>, segments: u32, rings: u32, radius: f32) -> Mesh {
    let segments = segments.max(3);
    let rings = rings.max(3);

    let mut mesh = Mesh::new(name);

    let top = mesh.add_vertex(Vec3::Z * radius);

    for ring in 1..rings {
        let phi = PI * ring as f32 / rings as f32;

        for segment in 0..segments {
            let theta = TAU * segment as f32 / segments as f32;
            let direction = Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            mesh.add_vertex(direction * radius);
        }
    }

    let bottom = mesh.add_vertex(Vec3::NEG_Z * radius);

    let ring_vertex = |ring: u32, segment: u32| 1 + (ring - 1) * segments + segment % segments;
    let uv = |ring: u32, segment: f32| {
        Vec2::new(segment / segments as f32, 1.0 - ring as f32 / rings as f32)
    };

    for segment in 0..segments {
        let s = segment as f32;

        mesh.add_polygon(
            vec![top, ring_vertex(1, segment), ring_vertex(1, segment + 1)],
            vec![uv(0, s + 0.5), uv(1, s), uv(1, s + 1.0)],
        );
    }

    for ring in 1..rings - 1 {
        for segment in 0..segments {
            let s = segment as f32;

            mesh.add_polygon(
                vec![
                    ring_vertex(ring + 1, segment),
                    ring_vertex(ring + 1, segment + 1),
                    ring_vertex(ring, segment + 1),
                    ring_vertex(ring, segment),
                ],
                vec![
                    uv(ring + 1, s),
                    uv(ring + 1, s + 1.0),
                    uv(ring, s + 1.0),
                    uv(ring, s),
                ],
            );
        }
    }

    let last = rings - 1;
    for segment in 0..segments {
        let s = segment as f32;

        mesh.add_polygon(
            vec![bottom, ring_vertex(last, segment + 1), ring_vertex(last, segment)],
            vec![uv(rings, s + 0.5), uv(last, s + 1.0), uv(last, s)],
        );
    }

    mesh
}

/// Axis-aligned cube centered at the origin with the given edge length.
pub fn cube(name: impl Into<String>, size: f32) -> Mesh {
    let mut mesh = Mesh::new(name);
    let h = size * 0.5;

    for z in [-h, h] {
        for y in [-h, h] {
            for x in [-h, h] {
                mesh.add_vertex(Vec3::new(x, y, z));
            }
        }
    }

    // Index bits: x = 1, y = 2, z = 4. Each face winds counter-clockwise seen from outside.
    let faces: [[u32; 4]; 6] = [
        [0, 2, 3, 1], // -Z
        [4, 5, 7, 6], // +Z
        [0, 1, 5, 4], // -Y
        [2, 6, 7, 3], // +Y
        [0, 4, 6, 2], // -X
        [1, 3, 7, 5], // +X
    ];
    let uvs = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];

    for face in faces {
        mesh.add_polygon(face.to_vec(), uvs.clone());
    }

    mesh
}
