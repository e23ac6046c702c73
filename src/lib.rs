pub mod animation;
pub mod asset_pipeline;
pub mod config;
pub mod gravity_law;
pub mod material;
pub mod material_manager;
pub mod math;
pub mod mesh;
pub mod modifiers;
pub mod naming;
pub mod scene_graph;
