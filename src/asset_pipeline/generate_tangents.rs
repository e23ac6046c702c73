// Tangents are only written when the export asks for them.

use anyhow::bail;
use bevy_mikktspace::{generate_tangents, Geometry};
use glam::Vec4;

use crate::asset_pipeline::mesh_baker::{BakedPrimitive, Vertex};

impl BakedPrimitive {
    fn vertex_by_triangle_index(&self, face: usize, vert: usize) -> &Vertex {
        &self.vertices[self.indices[face * 3 + vert] as usize]
    }

    /// Generate tangents for this primitive using mikktspace algorithm
    pub fn generate_tangents(&mut self) -> anyhow::Result<()> {
        self.tangents = Some(vec![Vec4::ZERO; self.vertices.len()]);

        let success = generate_tangents(self);

        if !success {
            self.tangents = None;
            bail!("Failed to generate tangents")
        }

        Ok(())
    }
}

impl Geometry for BakedPrimitive {
    fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).position.to_array()
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).normal.to_array()
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.vertex_by_triangle_index(face, vert).tex_coords.to_array()
    }

    fn set_tangent(
        &mut self,
        tangent: [f32; 3],
        _bi_tangent: [f32; 3],
        _f_mag_s: f32,
        _f_mag_t: f32,
        bi_tangent_preserves_orientation: bool,
        face: usize,
        vert: usize,
    ) {
        let index = self.indices[face * 3 + vert] as usize;
        let sign = if bi_tangent_preserves_orientation {
            1.0
        } else {
            -1.0
        };

        if let Some(tangents) = self.tangents.as_mut() {
            tangents[index] = glam::Vec3::from_array(tangent).extend(sign);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::asset_pipeline::mesh_baker::bake_mesh;
    use crate::mesh::primitives::uv_sphere;

    #[test]
    fn sphere_tangents_are_unit_and_orthogonal() {
        let mut mesh = uv_sphere("Sphere", 16, 8, 1.0);
        mesh.set_smooth(true);
        let mut baked = bake_mesh(&mesh, true);
        let primitive = &mut baked.primitives[0];

        primitive.generate_tangents().unwrap();

        let tangents = primitive.tangents.as_ref().unwrap();
        assert_eq!(tangents.len(), primitive.vertices.len());

        for (tangent, vertex) in tangents.iter().zip(&primitive.vertices) {
            assert!((tangent.truncate().length() - 1.0).abs() < 1e-2);
            assert!(tangent.truncate().dot(vertex.normal).abs() < 1e-2);
            assert!(tangent.w == 1.0 || tangent.w == -1.0);
        }
    }
}
