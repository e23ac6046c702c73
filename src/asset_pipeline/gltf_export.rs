//! Binary glTF (GLB) export of a whole scene.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::mem::{offset_of, size_of};
use std::path::Path;

use anyhow::Context;
use glam::{Mat4, Quat, Vec3, Vec4};
use gltf::json;
use itertools::Itertools;
use json::validation::Checked::Valid;
use json::validation::USize64;
use serde::{Deserialize, Serialize};

use crate::animation::{apply_action, Action, AnimatedProperty};
use crate::asset_pipeline::materials::to_gltf_material;
use crate::asset_pipeline::mesh_baker::{bake_mesh, BakedMesh, Vertex};
use crate::material::MaterialId;
use crate::math::axis;
use crate::math::bounds::AABB;
use crate::mesh::{Mesh, MeshId};
use crate::modifiers::{evaluate_mesh, EvaluationMode};
use crate::scene_graph::{Object3D, ObjectId, Scene};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Convert from +Z up to glTF's +Y up.
    pub y_up: bool,
    /// Evaluate modifier stacks (viewport levels) before export.
    pub apply_modifiers: bool,
    pub export_tangents: bool,
    /// Frames between animation samples.
    pub frame_step: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            y_up: true,
            apply_modifiers: false,
            export_tangents: false,
            frame_step: 1,
        }
    }
}

/// Writes the whole scene to `path` as a GLB, creating parent directories.
/// Selection state is ignored.
pub fn export_glb(scene: &Scene, path: &Path, options: &ExportOptions) -> anyhow::Result<()> {
    let bytes = build_glb(scene, options)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Exported {} ({} bytes)", path.display(), bytes.len());

    Ok(())
}

pub fn build_glb(scene: &Scene, options: &ExportOptions) -> anyhow::Result<Vec<u8>> {
    let (root, bin) = GltfBuilder::new(options).build(scene)?;

    let json_string = json::serialize::to_string(&root).context("Failed to serialize glTF JSON")?;
    let json_bytes = pad_to_four(json_string.into_bytes(), b' ');
    let bin = (!bin.is_empty()).then(|| pad_to_four(bin, 0));

    let length = 12 + 8 + json_bytes.len() + bin.as_ref().map_or(0, |bin| 8 + bin.len());

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: u32::try_from(length).context("GLB exceeds 4 GiB")?,
        },
        json: Cow::Owned(json_bytes),
        bin: bin.map(Cow::Owned),
    };

    glb.to_vec().context("Failed to encode GLB container")
}

fn pad_to_four(mut bytes: Vec<u8>, fill: u8) -> Vec<u8> {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
    bytes
}

/// Node transform split into glTF's TRS channels.
struct NodeTransform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

struct GltfBuilder<'a> {
    options: &'a ExportOptions,
    root: json::Root,
    bin: Vec<u8>,
    buffer: json::Index<json::Buffer>,
    materials: HashMap<MaterialId, json::Index<json::Material>>,
    meshes: HashMap<MeshId, json::Index<json::Mesh>>,
}

impl<'a> GltfBuilder<'a> {
    fn new(options: &'a ExportOptions) -> Self {
        let mut root = json::Root::default();
        root.asset.generator = Some(format!("gravity-law {}", env!("CARGO_PKG_VERSION")));

        Self {
            options,
            root,
            bin: Vec::new(),
            // The single buffer is pushed last, once its length is known.
            buffer: json::Index::new(0),
            materials: HashMap::new(),
            meshes: HashMap::new(),
        }
    }

    fn build(mut self, scene: &Scene) -> anyhow::Result<(json::Root, Vec<u8>)> {
        let order: Vec<ObjectId> = scene.objects().map(|(id, _)| id).collect();
        let node_indices: HashMap<ObjectId, json::Index<json::Node>> = order
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, json::Index::new(i as u32)))
            .collect();

        for (_, object) in scene.objects() {
            let mesh = match object.mesh_id() {
                Some(mesh_id) => Some(self.export_mesh(scene, object, mesh_id)?),
                None => None,
            };

            let children = object
                .child_ids
                .iter()
                .filter_map(|child| node_indices.get(child).copied())
                .collect_vec();

            let transform = self.node_transform(object.parent_space_matrix());

            self.root.push(json::Node {
                camera: None,
                children: (!children.is_empty()).then_some(children),
                extensions: Default::default(),
                extras: Default::default(),
                matrix: None,
                mesh,
                name: Some(object.name.clone()),
                rotation: (!transform.rotation.abs_diff_eq(Quat::IDENTITY, 1e-6))
                    .then(|| json::scene::UnitQuaternion(transform.rotation.to_array())),
                scale: (!transform.scale.abs_diff_eq(Vec3::ONE, 1e-6))
                    .then(|| transform.scale.to_array()),
                skin: None,
                translation: (!transform.translation.abs_diff_eq(Vec3::ZERO, 1e-6))
                    .then(|| transform.translation.to_array()),
                weights: None,
            });
        }

        for (id, object) in scene.objects() {
            let Some(action) = scene.object_action(id) else {
                continue;
            };
            self.export_animation(scene, object, action, node_indices[&id]);
        }

        let roots = scene
            .objects()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| node_indices[&id])
            .collect_vec();

        // A scene without nodes would serialize without its required `nodes` field.
        if !roots.is_empty() {
            let gltf_scene = self.root.push(json::Scene {
                extensions: Default::default(),
                extras: Default::default(),
                name: Some("Scene".to_string()),
                nodes: roots,
            });
            self.root.scene = Some(gltf_scene);
        }

        if !self.bin.is_empty() {
            let buffer = self.root.push(json::Buffer {
                byte_length: USize64::from(self.bin.len()),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: None,
            });
            debug_assert_eq!(buffer, self.buffer);
        }

        log::debug!(
            "Built glTF with {} nodes, {} meshes, {} materials, {} animations",
            self.root.nodes.len(),
            self.root.meshes.len(),
            self.root.materials.len(),
            self.root.animations.len()
        );

        Ok((self.root, self.bin))
    }

    fn node_transform(&self, local: Mat4) -> NodeTransform {
        let local = if self.options.y_up {
            axis::convert_matrix(local)
        } else {
            local
        };
        let (scale, rotation, translation) = local.to_scale_rotation_translation();

        NodeTransform {
            translation,
            rotation,
            scale,
        }
    }

    fn export_mesh(
        &mut self,
        scene: &Scene,
        object: &Object3D,
        mesh_id: MeshId,
    ) -> anyhow::Result<json::Index<json::Mesh>> {
        let evaluate = self.options.apply_modifiers && !object.modifiers.is_empty();

        if !evaluate {
            if let Some(&index) = self.meshes.get(&mesh_id) {
                return Ok(index);
            }
        }

        let mesh = scene
            .mesh(mesh_id)
            .with_context(|| format!("Mesh data of '{}' is missing", object.name))?;

        let index = if evaluate {
            let evaluated = evaluate_mesh(mesh, &object.modifiers, EvaluationMode::Viewport);
            self.push_mesh(scene, &evaluated)?
        } else {
            let index = self.push_mesh(scene, mesh)?;
            self.meshes.insert(mesh_id, index);
            index
        };

        Ok(index)
    }

    fn push_mesh(&mut self, scene: &Scene, mesh: &Mesh) -> anyhow::Result<json::Index<json::Mesh>> {
        let mut baked: BakedMesh = bake_mesh(mesh, self.options.y_up);
        let mut primitives = Vec::with_capacity(baked.primitives.len());

        for primitive in &mut baked.primitives {
            if self.options.export_tangents {
                primitive
                    .generate_tangents()
                    .with_context(|| format!("Mesh '{}'", mesh.name))?;
            }

            let bounds = primitive
                .bounding_box()
                .unwrap_or(AABB::new(Vec3::ZERO, Vec3::ZERO));

            let vertex_view = self.push_view(
                bytemuck::cast_slice(&primitive.vertices),
                Some(size_of::<Vertex>()),
                Some(json::buffer::Target::ArrayBuffer),
            );
            let count = primitive.vertices.len();

            let positions = self.push_accessor(
                vertex_view,
                offset_of!(Vertex, position),
                count,
                json::accessor::ComponentType::F32,
                json::accessor::Type::Vec3,
                Some((bounds.min.to_array().to_vec(), bounds.max.to_array().to_vec())),
            );
            let normals = self.push_accessor(
                vertex_view,
                offset_of!(Vertex, normal),
                count,
                json::accessor::ComponentType::F32,
                json::accessor::Type::Vec3,
                None,
            );
            let tex_coords = self.push_accessor(
                vertex_view,
                offset_of!(Vertex, tex_coords),
                count,
                json::accessor::ComponentType::F32,
                json::accessor::Type::Vec2,
                None,
            );

            let mut attributes = BTreeMap::new();
            attributes.insert(Valid(json::mesh::Semantic::Positions), positions);
            attributes.insert(Valid(json::mesh::Semantic::Normals), normals);
            attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), tex_coords);

            if let Some(tangents) = &primitive.tangents {
                let view = self.push_view(
                    bytemuck::cast_slice::<Vec4, u8>(tangents),
                    None,
                    Some(json::buffer::Target::ArrayBuffer),
                );
                let accessor = self.push_accessor(
                    view,
                    0,
                    tangents.len(),
                    json::accessor::ComponentType::F32,
                    json::accessor::Type::Vec4,
                    None,
                );
                attributes.insert(Valid(json::mesh::Semantic::Tangents), accessor);
            }

            let index_view = self.push_view(
                bytemuck::cast_slice(&primitive.indices),
                None,
                Some(json::buffer::Target::ElementArrayBuffer),
            );
            let indices = self.push_accessor(
                index_view,
                0,
                primitive.indices.len(),
                json::accessor::ComponentType::U32,
                json::accessor::Type::Scalar,
                None,
            );

            let material = mesh
                .materials
                .get(primitive.material_index)
                .map(|&material_id| self.material(scene, material_id))
                .transpose()?;

            primitives.push(json::mesh::Primitive {
                attributes,
                extensions: Default::default(),
                extras: Default::default(),
                indices: Some(indices),
                material,
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
            });
        }

        Ok(self.root.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(mesh.name.clone()),
            primitives,
            weights: None,
        }))
    }

    fn material(
        &mut self,
        scene: &Scene,
        material_id: MaterialId,
    ) -> anyhow::Result<json::Index<json::Material>> {
        if let Some(&index) = self.materials.get(&material_id) {
            return Ok(index);
        }

        let material = scene
            .materials
            .get(material_id)
            .context("Mesh references a missing material")?;
        let index = self.root.push(to_gltf_material(material));
        self.materials.insert(material_id, index);

        Ok(index)
    }

    /// Samples the action over the scene frame range, one channel per keyed property.
    fn export_animation(
        &mut self,
        scene: &Scene,
        object: &Object3D,
        action: &Action,
        node: json::Index<json::Node>,
    ) {
        let step = self.options.frame_step.max(1) as usize;
        let mut frames = (scene.frame_start..=scene.frame_end).step_by(step).collect_vec();
        if frames.last() != Some(&scene.frame_end) && scene.frame_end >= scene.frame_start {
            frames.push(scene.frame_end);
        }
        if frames.is_empty() {
            return;
        }

        let mut transform = object.transform.clone();
        let mut samples = Vec::with_capacity(frames.len());
        for &frame in &frames {
            apply_action(action, &mut transform, frame as f32);
            samples.push(self.node_transform(object.parent_inverse * *transform.get_local_matrix()));
        }

        // Keep consecutive quaternions in the same hemisphere so interpolation takes the short way.
        for i in 1..samples.len() {
            if samples[i].rotation.dot(samples[i - 1].rotation) < 0.0 {
                samples[i].rotation = -samples[i].rotation;
            }
        }

        let fps = scene.fps.max(1) as f32;
        let times = frames
            .iter()
            .map(|&frame| (frame - scene.frame_start) as f32 / fps)
            .collect_vec();
        let input_view = self.push_view(bytemuck::cast_slice(&times), None, None);
        let input = self.push_accessor(
            input_view,
            0,
            times.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Scalar,
            Some((vec![times[0]], vec![times[times.len() - 1]])),
        );

        let mut samplers = Vec::new();
        let mut channels = Vec::new();

        for property in AnimatedProperty::ALL {
            if !action
                .fcurves
                .iter()
                .any(|curve| curve.data_path == property.data_path())
            {
                continue;
            }

            let (path, values, type_): (_, Vec<f32>, _) = match property {
                AnimatedProperty::Location => (
                    json::animation::Property::Translation,
                    samples.iter().flat_map(|s| s.translation.to_array()).collect(),
                    json::accessor::Type::Vec3,
                ),
                AnimatedProperty::RotationEuler => (
                    json::animation::Property::Rotation,
                    samples.iter().flat_map(|s| s.rotation.to_array()).collect(),
                    json::accessor::Type::Vec4,
                ),
                AnimatedProperty::Scale => (
                    json::animation::Property::Scale,
                    samples.iter().flat_map(|s| s.scale.to_array()).collect(),
                    json::accessor::Type::Vec3,
                ),
            };

            let output_view = self.push_view(bytemuck::cast_slice(&values), None, None);
            let output = self.push_accessor(
                output_view,
                0,
                samples.len(),
                json::accessor::ComponentType::F32,
                type_,
                None,
            );

            samplers.push(json::animation::Sampler {
                extensions: Default::default(),
                extras: Default::default(),
                input,
                interpolation: Valid(json::animation::Interpolation::Linear),
                output,
            });
            channels.push(json::animation::Channel {
                sampler: json::Index::new((samplers.len() - 1) as u32),
                target: json::animation::Target {
                    extensions: Default::default(),
                    extras: Default::default(),
                    node,
                    path: Valid(path),
                },
                extensions: Default::default(),
                extras: Default::default(),
            });
        }

        if channels.is_empty() {
            return;
        }

        self.root.push(json::Animation {
            extensions: Default::default(),
            extras: Default::default(),
            channels,
            name: Some(action.name.clone()),
            samplers,
        });
    }

    fn push_view(
        &mut self,
        bytes: &[u8],
        stride: Option<usize>,
        target: Option<json::buffer::Target>,
    ) -> json::Index<json::buffer::View> {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);

        self.root.push(json::buffer::View {
            buffer: self.buffer,
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(offset)),
            byte_stride: stride.map(json::buffer::Stride),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        })
    }

    fn push_accessor(
        &mut self,
        view: json::Index<json::buffer::View>,
        byte_offset: usize,
        count: usize,
        component_type: json::accessor::ComponentType,
        type_: json::accessor::Type,
        bounds: Option<(Vec<f32>, Vec<f32>)>,
    ) -> json::Index<json::Accessor> {
        let (min, max) = match bounds {
            Some((min, max)) => (Some(json::Value::from(min)), Some(json::Value::from(max))),
            None => (None, None),
        };

        self.root.push(json::Accessor {
            buffer_view: Some(view),
            byte_offset: Some(USize64::from(byte_offset)),
            count: USize64::from(count),
            component_type: Valid(json::accessor::GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        })
    }
}
