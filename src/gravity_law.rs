//! The orbit scene: three spheres, the two smaller ones circling the largest.
//!
//! Runs as one straight sequence against a [`Scene`]: clear, add spheres, rig
//! pivots, key looping rotations, export. Any failing step aborts the run and
//! leaves the scene as it was at that point.

use std::f32::consts::TAU;

use anyhow::Context;
use glam::{Vec3, Vec4};

use crate::animation::FModifier;
use crate::asset_pipeline::export_glb;
use crate::config::{GravityLawConfig, SphereConfig};
use crate::material::{Material, MaterialId, PRINCIPLED_BSDF};
use crate::mesh::primitives::{uv_sphere, DEFAULT_SPHERE_RINGS, DEFAULT_SPHERE_SEGMENTS};
use crate::modifiers::Modifier;
use crate::scene_graph::{EmptyDisplay, ObjectId, ParentMode, Scene};

pub const START_FRAME: i32 = 1;

/// Objects created by [`build_scene`], in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitRig {
    pub spheres: Vec<ObjectId>,
    pub pivots: Vec<ObjectId>,
}

/// Node-based material whose `Principled BSDF` base color is `color`.
/// Channels are not range-checked.
pub fn create_material(scene: &mut Scene, name: &str, color: Vec4) -> anyhow::Result<MaterialId> {
    let mut material = Material::new(name);
    material.set_use_nodes(true);
    material
        .node_tree_mut()?
        .node_mut(PRINCIPLED_BSDF)?
        .input_mut("Base Color")?
        .set_default_value(color)?;

    Ok(scene.materials.add_material(material))
}

/// Adds a subdivision surface modifier and marks every polygon smooth.
/// Each call adds another modifier.
pub fn subsurf_smoothing(scene: &mut Scene, object: ObjectId, level: u32) -> anyhow::Result<()> {
    scene.add_modifier(object, Modifier::subsurf("Subsurf", level))?;
    scene.object_mesh_mut(object)?.set_smooth(true);

    Ok(())
}

/// Adds a UV sphere at the origin, then names, scales, moves, paints and smooths it.
pub fn create_uv_sphere(
    scene: &mut Scene,
    name: &str,
    size: f32,
    position: Vec3,
    color: Vec4,
    subsurf_level: u32,
) -> anyhow::Result<ObjectId> {
    let mesh = uv_sphere("Sphere", DEFAULT_SPHERE_SEGMENTS, DEFAULT_SPHERE_RINGS, 1.0);
    let mesh_id = scene.add_mesh(mesh);
    scene.add_mesh_object("Sphere", mesh_id);

    let sphere = scene
        .active_object()
        .context("Adding a sphere left no active object")?;
    scene.rename_object(sphere, name)?;

    let object = scene
        .get_object_mut(sphere)
        .context("Sphere vanished after creation")?;
    object.transform.set_scale(Vec3::splat(size));
    object.transform.set_location(position);

    let material = create_material(scene, name, color)?;
    scene.object_mesh_mut(sphere)?.materials.push(material);

    subsurf_smoothing(scene, sphere, subsurf_level)?;

    log::info!("Created sphere {:?} (size {}, at {})", name, size, position);

    Ok(sphere)
}

/// Parents `object` to a new empty at the origin without compensating the
/// child's transform, so the child's location becomes its orbit offset.
pub fn set_sphere_pivot(
    scene: &mut Scene,
    object: ObjectId,
    name: &str,
    display: EmptyDisplay,
) -> anyhow::Result<ObjectId> {
    let pivot = scene.add_empty("Empty", display);
    scene.rename_object(pivot, name)?;
    scene.set_object_parent(object, Some(pivot), ParentMode::Raw)?;

    Ok(pivot)
}

/// Keys the pivot from no rotation at frame 1 to `speed` full turns about Z at
/// `end_frame`, and loops the Z curve forever.
pub fn animate_orbit(
    scene: &mut Scene,
    pivot: ObjectId,
    speed: f32,
    end_frame: i32,
) -> anyhow::Result<()> {
    scene.frame_set(START_FRAME);
    set_rotation(scene, pivot, Vec3::ZERO)?;
    scene.keyframe_insert(pivot, "rotation_euler", Some(START_FRAME))?;

    scene.frame_set(end_frame);
    set_rotation(scene, pivot, Vec3::new(0.0, 0.0, speed * TAU))?;
    scene.keyframe_insert(pivot, "rotation_euler", Some(end_frame))?;

    scene
        .fcurve_mut(pivot, "rotation_euler", 2)?
        .add_modifier(FModifier::cycles());

    Ok(())
}

fn set_rotation(scene: &mut Scene, object: ObjectId, rotation: Vec3) -> anyhow::Result<()> {
    scene
        .get_object_mut(object)
        .context("Pivot is not in the scene")?
        .transform
        .set_rotation_euler(rotation);
    Ok(())
}

fn create_configured_sphere(
    scene: &mut Scene,
    sphere: &SphereConfig,
    subsurf_level: u32,
) -> anyhow::Result<ObjectId> {
    create_uv_sphere(
        scene,
        &sphere.name,
        sphere.size,
        Vec3::from_array(sphere.position),
        Vec4::from_array(sphere.color),
        subsurf_level,
    )
}

/// Clears `scene` and builds the configured orbit scene in it.
pub fn build_scene(scene: &mut Scene, config: &GravityLawConfig) -> anyhow::Result<OrbitRig> {
    config.validate()?;

    scene.clear();
    scene.fps = config.fps;

    let spheres = config
        .spheres
        .iter()
        .map(|sphere| create_configured_sphere(scene, sphere, config.subsurf_level))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut pivots = Vec::with_capacity(config.orbits.len());
    for orbit in &config.orbits {
        let index = config
            .spheres
            .iter()
            .position(|sphere| sphere.name == orbit.sphere)
            .with_context(|| format!("Unknown sphere '{}'", orbit.sphere))?;

        pivots.push(set_sphere_pivot(
            scene,
            spheres[index],
            &orbit.pivot,
            EmptyDisplay::PlainAxes,
        )?);
    }

    for (&pivot, orbit) in pivots.iter().zip(&config.orbits) {
        animate_orbit(scene, pivot, orbit.speed, config.end_frame)?;
    }

    scene.frame_start = START_FRAME;
    scene.frame_end = config.end_frame;

    Ok(OrbitRig { spheres, pivots })
}

/// Builds the scene on top of a fresh session and writes the configured GLB.
pub fn run(config: &GravityLawConfig) -> anyhow::Result<()> {
    let mut scene = Scene::startup();
    let rig = build_scene(&mut scene, config)?;

    log::info!(
        "Built {} spheres and {} pivots, frames {}..={}",
        rig.spheres.len(),
        rig.pivots.len(),
        scene.frame_start,
        scene.frame_end
    );

    export_glb(&scene, &config.output, &config.export)
}
