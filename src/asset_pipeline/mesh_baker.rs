//! Triangulates polygon meshes into indexed vertex buffers, one primitive per
//! material slot.

use std::collections::{BTreeMap, HashMap};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::math::axis;
use crate::math::bounds::AABB;
use crate::mesh::normals::{face_normal, vertex_normals};
use crate::mesh::Mesh;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

pub struct BakedPrimitive {
    pub material_index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub tangents: Option<Vec<Vec4>>,
}

impl BakedPrimitive {
    pub fn bounding_box(&self) -> Option<AABB> {
        AABB::from_points(self.vertices.iter().map(|vertex| vertex.position))
    }
}

pub struct BakedMesh {
    pub name: String,
    pub primitives: Vec<BakedPrimitive>,
}

type VertexKey = (u32, [u32; 3], [u32; 2]);

#[derive(Default)]
struct PrimitiveBuilder {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    lookup: HashMap<VertexKey, u32>,
}

impl PrimitiveBuilder {
    fn push(&mut self, position_index: u32, vertex: Vertex) {
        let key = (
            position_index,
            vertex.normal.to_array().map(f32::to_bits),
            vertex.tex_coords.to_array().map(f32::to_bits),
        );

        let index = *self.lookup.entry(key).or_insert_with(|| {
            self.vertices.push(vertex);
            (self.vertices.len() - 1) as u32
        });

        self.indices.push(index);
    }
}

/// Smooth polygons take vertex normals, flat ones their face normal.
/// Positions and normals are converted to +Y up when `y_up` is set; V is flipped.
pub fn bake_mesh(mesh: &Mesh, y_up: bool) -> BakedMesh {
    let smooth_normals = vertex_normals(mesh);
    let convert = |v: Vec3| if y_up { axis::convert_vector(v) } else { v };

    let mut builders: BTreeMap<usize, PrimitiveBuilder> = BTreeMap::new();

    for polygon in &mesh.polygons {
        let flat_normal = face_normal(mesh, polygon);
        let builder = builders.entry(polygon.material_index).or_default();

        for triangle in polygon.fan_triangles() {
            for corner in triangle {
                let position_index = polygon.vertices[corner];
                let normal = if polygon.use_smooth {
                    smooth_normals[position_index as usize]
                } else {
                    flat_normal
                };
                let uv = polygon.uvs[corner];

                builder.push(
                    position_index,
                    Vertex {
                        position: convert(mesh.positions[position_index as usize]),
                        normal: convert(normal),
                        tex_coords: Vec2::new(uv.x, 1.0 - uv.y),
                    },
                );
            }
        }
    }

    let primitives = builders
        .into_iter()
        .map(|(material_index, builder)| BakedPrimitive {
            material_index,
            vertices: builder.vertices,
            indices: builder.indices,
            tangents: None,
        })
        .collect();

    BakedMesh {
        name: mesh.name.clone(),
        primitives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::{cube, uv_sphere};

    #[test]
    fn flat_cube_splits_corners_per_face() {
        let baked = bake_mesh(&cube("Cube", 2.0), false);
        let primitive = &baked.primitives[0];

        assert_eq!(baked.primitives.len(), 1);
        assert_eq!(primitive.vertices.len(), 24);
        assert_eq!(primitive.indices.len(), 36);
    }

    #[test]
    fn smooth_sphere_shares_vertices_inside_uv_islands() {
        let mut mesh = uv_sphere("Sphere", 8, 4, 1.0);
        let flat = bake_mesh(&mesh, false);
        mesh.set_smooth(true);
        let smooth = bake_mesh(&mesh, false);

        assert_eq!(smooth.primitives[0].indices.len(), flat.primitives[0].indices.len());
        assert!(smooth.primitives[0].vertices.len() < flat.primitives[0].vertices.len());

        for vertex in &smooth.primitives[0].vertices {
            // Area weighting on a coarse sphere tilts normals slightly off radial.
            assert!(vertex.normal.dot(vertex.position) > 0.98);
        }
    }

    #[test]
    fn y_up_conversion_moves_poles() {
        let baked = bake_mesh(&uv_sphere("Sphere", 8, 4, 1.0), true);
        let aabb = baked.primitives[0].bounding_box().unwrap();

        assert!((aabb.max.y - 1.0).abs() < 1e-5);
        assert!((aabb.min.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn primitives_follow_material_slots() {
        let mut mesh = cube("Cube", 2.0);
        mesh.polygons[0].material_index = 1;
        mesh.polygons[1].material_index = 1;

        let baked = bake_mesh(&mesh, false);

        assert_eq!(baked.primitives.len(), 2);
        assert_eq!(baked.primitives[0].material_index, 0);
        assert_eq!(baked.primitives[1].indices.len(), 12);
    }
}
