pub mod generate_tangents;
pub mod gltf_export;
pub mod materials;
pub mod mesh_baker;

pub use gltf_export::{build_glb, export_glb, ExportOptions};
