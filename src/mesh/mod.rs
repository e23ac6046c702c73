//! Polygon mesh data blocks.
//!
//! Positions are shared between polygons; UVs are stored per polygon corner
//! so seams never split the position topology.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use id_arena::Id;

use crate::material::MaterialId;

pub mod normals;
pub mod primitives;
pub mod subdivision;

pub type MeshId = Id<Mesh>;

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub material_index: usize,
    pub use_smooth: bool,
}

impl Polygon {
    pub fn new(vertices: Vec<u32>, uvs: Vec<Vec2>) -> Self {
        debug_assert_eq!(vertices.len(), uvs.len());

        Self {
            vertices,
            uvs,
            material_index: 0,
            use_smooth: false,
        }
    }

    pub fn corner_count(&self) -> usize {
        self.vertices.len()
    }

    /// Corner index pairs of a triangle fan covering this polygon.
    pub fn fan_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (1..self.vertices.len().saturating_sub(1)).map(|i| [0, i, i + 1])
    }

    /// Consecutive corner pairs, wrapping around.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
    pub materials: Vec<MaterialId>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
            polygons: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn add_vertex(&mut self, position: Vec3) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    pub fn add_polygon(&mut self, vertices: Vec<u32>, uvs: Vec<Vec2>) -> usize {
        self.polygons.push(Polygon::new(vertices, uvs));
        self.polygons.len() - 1
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|polygon| polygon.corner_count().saturating_sub(2))
            .sum()
    }

    pub fn set_smooth(&mut self, smooth: bool) {
        for polygon in &mut self.polygons {
            polygon.use_smooth = smooth;
        }
    }

    pub fn edges(&self) -> Edges {
        Edges::build(self)
    }

    /// True when every edge borders exactly two polygons.
    pub fn is_closed(&self) -> bool {
        self.edges().faces.iter().all(|faces| faces.len() == 2)
    }
}

/// Undirected edge table with the polygons bordering each edge.
pub struct Edges {
    pub vertices: Vec<[u32; 2]>,
    pub faces: Vec<Vec<usize>>,
    /// Edge index of each polygon corner's outgoing edge, per polygon.
    pub polygon_edges: Vec<Vec<usize>>,
}

impl Edges {
    fn build(mesh: &Mesh) -> Self {
        let mut edges = Edges {
            vertices: Vec::new(),
            faces: Vec::new(),
            polygon_edges: Vec::with_capacity(mesh.polygons.len()),
        };
        let mut lookup: HashMap<[u32; 2], usize> = HashMap::new();

        for (face_index, polygon) in mesh.polygons.iter().enumerate() {
            let mut corner_edges = Vec::with_capacity(polygon.corner_count());

            for (a, b) in polygon.edges() {
                let key = [a.min(b), a.max(b)];
                let edge_index = match lookup.get(&key) {
                    Some(&index) => index,
                    None => {
                        edges.vertices.push(key);
                        edges.faces.push(Vec::new());
                        lookup.insert(key, edges.vertices.len() - 1);
                        edges.vertices.len() - 1
                    }
                };
                edges.faces[edge_index].push(face_index);
                corner_edges.push(edge_index);
            }

            edges.polygon_edges.push(corner_edges);
        }

        edges
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn is_boundary(&self, edge: usize) -> bool {
        self.faces[edge].len() < 2
    }
}
