use anyhow::{anyhow, bail, Context};
use glam::{Mat3, Mat4, Vec3};
use id_arena::Arena;

use crate::animation::{apply_action, Action, ActionId, AnimatedProperty, AnimationData, FCurve};
use crate::material::Material;
use crate::material_manager::MaterialManager;
use crate::mesh::primitives::cube;
use crate::mesh::{Mesh, MeshId};
use crate::modifiers::Modifier;
use crate::naming::unique_name;
use crate::scene_graph::object3d::{EmptyDisplay, Object3D, ObjectData, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAction {
    Select,
    Deselect,
    Toggle,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentMode {
    /// Parent inverse is reset to identity: the child's local transform is
    /// reinterpreted in the parent's space.
    #[default]
    Raw,
    /// Parent inverse compensates so the child keeps its world transform.
    KeepWorldTransform,
}

/// The live scene plus every data block of the session.
///
/// Data blocks live in append-only arenas. Deleting an object only unlinks it
/// from the scene; its mesh, materials and action stay behind as orphans.
pub struct Scene {
    objects: Arena<Object3D>,
    meshes: Arena<Mesh>,
    pub materials: MaterialManager,
    actions: Arena<Action>,
    linked: Vec<ObjectId>,
    active_object: Option<ObjectId>,
    frame_current: i32,
    pub frame_start: i32,
    pub frame_end: i32,
    pub fps: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            meshes: Arena::new(),
            materials: MaterialManager::new(),
            actions: Arena::new(),
            linked: Vec::new(),
            active_object: None,
            frame_current: 1,
            frame_start: 1,
            frame_end: 250,
            fps: 24,
        }
    }

    /// Scene as a fresh session starts: a 2x2x2 cube named `Cube`, selected and active.
    pub fn startup() -> Self {
        let mut scene = Self::new();

        let mut material = Material::new("Material");
        material.set_use_nodes(true);
        let material_id = scene.materials.add_material(material);

        let mut mesh = cube("Cube", 2.0);
        mesh.materials.push(material_id);
        let mesh_id = scene.add_mesh(mesh);
        scene.add_mesh_object("Cube", mesh_id);

        scene
    }

    /// Links `object` into the scene, renaming it if another linked object has its name.
    pub fn add_object(&mut self, mut object: Object3D) -> ObjectId {
        object.name = unique_name(&object.name, |name| self.get_object_by_name(name).is_some());

        let id = self.objects.alloc(object);
        self.linked.push(id);
        id
    }

    /// Adds an object at the origin the way an add-primitive operator does:
    /// everything else is deselected and the new object becomes active.
    fn add_active_object(&mut self, mut object: Object3D) -> ObjectId {
        self.select_all(SelectAction::Deselect);
        object.selected = true;

        let id = self.add_object(object);
        self.active_object = Some(id);

        log::debug!("Added object {:?}", self.objects[id].name);

        id
    }

    pub fn add_mesh_object(&mut self, name: &str, mesh_id: MeshId) -> ObjectId {
        self.add_active_object(Object3D::new(name, ObjectData::Mesh(mesh_id)))
    }

    pub fn add_empty(&mut self, name: &str, display: EmptyDisplay) -> ObjectId {
        self.add_active_object(Object3D::empty(name, display))
    }

    /// `None` once the object has been deleted.
    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.is_linked(id).then(|| &self.objects[id])
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        if self.is_linked(id) {
            self.objects.get_mut(id)
        } else {
            None
        }
    }

    fn object(&self, id: ObjectId) -> anyhow::Result<&Object3D> {
        self.get_object(id)
            .ok_or_else(|| anyhow!("Object {} is not in the scene", id.index()))
    }

    fn object_mut(&mut self, id: ObjectId) -> anyhow::Result<&mut Object3D> {
        self.get_object_mut(id)
            .ok_or_else(|| anyhow!("Object {} is not in the scene", id.index()))
    }

    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects().find(|(_, object)| object.name == name).map(|(id, _)| id)
    }

    fn is_linked(&self, id: ObjectId) -> bool {
        self.linked.contains(&id)
    }

    /// Linked objects in creation order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object3D)> + '_ {
        self.linked.iter().map(|&id| (id, &self.objects[id]))
    }

    pub fn object_count(&self) -> usize {
        self.linked.len()
    }

    /// Renames an object and returns the name it actually got.
    pub fn rename_object(&mut self, id: ObjectId, name: &str) -> anyhow::Result<String> {
        let current = self.object(id)?.name.clone();
        if current == name {
            return Ok(current);
        }

        let name = unique_name(name, |candidate| {
            self.objects()
                .any(|(other, object)| other != id && object.name == candidate)
        });
        self.object_mut(id)?.name = name.clone();

        Ok(name)
    }

    pub fn active_object(&self) -> Option<ObjectId> {
        self.active_object
    }

    pub fn add_mesh(&mut self, mut mesh: Mesh) -> MeshId {
        mesh.name = unique_name(&mesh.name, |name| {
            self.meshes.iter().any(|(_, mesh)| mesh.name == name)
        });

        self.meshes.alloc(mesh)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    /// Mesh data of a mesh object.
    pub fn object_mesh_mut(&mut self, id: ObjectId) -> anyhow::Result<&mut Mesh> {
        let object = self.object(id)?;
        let mesh_id = object
            .mesh_id()
            .with_context(|| format!("Object '{}' is not a mesh", object.name))?;

        self.meshes
            .get_mut(mesh_id)
            .ok_or_else(|| anyhow!("Mesh data of object {} is missing", id.index()))
    }

    pub fn add_modifier(&mut self, id: ObjectId, modifier: Modifier) -> anyhow::Result<()> {
        let object = self.object_mut(id)?;

        if object.mesh_id().is_none() {
            bail!(
                "Modifier '{}' cannot be added to non-mesh object '{}'",
                modifier.name,
                object.name
            );
        }

        object.modifiers.push(modifier);
        Ok(())
    }

    pub fn select_all(&mut self, action: SelectAction) {
        let any_selected = self.objects().any(|(_, object)| object.selected);

        for &id in &self.linked {
            let object = &mut self.objects[id];
            object.selected = match action {
                SelectAction::Select => true,
                SelectAction::Deselect => false,
                SelectAction::Toggle => !any_selected,
                SelectAction::Invert => !object.selected,
            };
        }
    }

    pub fn selected_objects(&self) -> Vec<ObjectId> {
        self.objects()
            .filter(|(_, object)| object.selected)
            .map(|(id, _)| id)
            .collect()
    }

    /// Unlinks every selected object. Surviving children of deleted objects
    /// are unparented and keep their world transform.
    pub fn delete_selected(&mut self) -> usize {
        let doomed = self.selected_objects();

        for &id in &doomed {
            let orphans: Vec<ObjectId> = self.objects[id]
                .child_ids
                .iter()
                .copied()
                .filter(|child| !doomed.contains(child))
                .collect();

            for child in orphans {
                let world = self.world_matrix(child);
                let object = &mut self.objects[child];
                object.parent_id = None;
                object.parent_inverse = Mat4::IDENTITY;
                set_transform_from_matrix(object, world);
            }
        }

        for &id in &doomed {
            if let Some(parent) = self.objects[id].parent_id {
                self.objects[parent].child_ids.retain(|&child| child != id);
            }
            let object = &mut self.objects[id];
            object.parent_id = None;
            object.child_ids.clear();
            object.selected = false;
        }

        self.linked.retain(|id| !doomed.contains(id));
        if self.active_object.is_some_and(|id| doomed.contains(&id)) {
            self.active_object = None;
        }

        log::info!("Deleted {} objects", doomed.len());

        doomed.len()
    }

    /// Selects and deletes every object in the scene.
    pub fn clear(&mut self) -> usize {
        self.select_all(SelectAction::Select);
        self.delete_selected()
    }

    pub fn set_object_parent(
        &mut self,
        child_id: ObjectId,
        new_parent_id: Option<ObjectId>,
        mode: ParentMode,
    ) -> anyhow::Result<()> {
        self.object(child_id)?;

        if let Some(parent_id) = new_parent_id {
            self.object(parent_id)?;

            let mut ancestor = Some(parent_id);
            while let Some(id) = ancestor {
                if id == child_id {
                    bail!(
                        "Cannot parent '{}' to its own descendant '{}'",
                        self.objects[child_id].name,
                        self.objects[parent_id].name
                    );
                }
                ancestor = self.objects[id].parent_id;
            }
        }

        let child_world = self.world_matrix(child_id);

        // Remove from old parent's children list
        if let Some(old_parent_id) = self.objects[child_id].parent_id {
            self.objects[old_parent_id]
                .child_ids
                .retain(|&id| id != child_id);
        }

        let parent_world = new_parent_id.map(|id| self.world_matrix(id));

        let child = &mut self.objects[child_id];
        child.parent_id = new_parent_id;

        match (mode, parent_world) {
            (ParentMode::Raw, _) => child.parent_inverse = Mat4::IDENTITY,
            (ParentMode::KeepWorldTransform, Some(parent_world)) => {
                let local = *child.transform.get_local_matrix();
                child.parent_inverse = parent_world.inverse() * child_world * local.inverse();
            }
            (ParentMode::KeepWorldTransform, None) => {
                child.parent_inverse = Mat4::IDENTITY;
                set_transform_from_matrix(child, child_world);
            }
        }

        if let Some(parent_id) = new_parent_id {
            self.objects[parent_id].child_ids.push(child_id);
        }

        Ok(())
    }

    pub fn world_matrix(&self, id: ObjectId) -> Mat4 {
        let object = &self.objects[id];
        let parent_world = object
            .parent_id
            .map(|parent| self.world_matrix(parent))
            .unwrap_or(Mat4::IDENTITY);

        parent_world * object.parent_space_matrix()
    }

    /// Moves the playhead and evaluates every animated object at the new frame.
    pub fn frame_set(&mut self, frame: i32) {
        self.frame_current = frame;

        for &id in &self.linked {
            let object = &mut self.objects[id];
            if let Some(animation) = object.animation_data {
                apply_action(&self.actions[animation.action], &mut object.transform, frame as f32);
            }
        }
    }

    pub fn add_action(&mut self, mut action: Action) -> ActionId {
        action.name = unique_name(&action.name, |name| {
            self.actions.iter().any(|(_, action)| action.name == name)
        });

        self.actions.alloc(action)
    }

    pub fn object_action(&self, id: ObjectId) -> Option<&Action> {
        let animation = self.get_object(id)?.animation_data?;
        self.actions.get(animation.action)
    }

    /// Keys every channel of `data_path` at `frame` (the current frame if `None`)
    /// with the object's current value. The object gets an action on first use.
    pub fn keyframe_insert(
        &mut self,
        id: ObjectId,
        data_path: &str,
        frame: Option<i32>,
    ) -> anyhow::Result<()> {
        let property = AnimatedProperty::from_data_path(data_path)?;
        let frame = frame.unwrap_or(self.frame_current);

        let object = self.object(id)?;
        let value = property.get(&object.transform);
        let existing = object.animation_data;
        let action_name = format!("{}Action", object.name);

        let action_id = match existing {
            Some(animation) => animation.action,
            None => {
                let action_id = self.add_action(Action::new(action_name));
                self.objects[id].animation_data = Some(AnimationData { action: action_id });
                action_id
            }
        };

        let action = &mut self.actions[action_id];
        for index in 0..3 {
            action
                .ensure_fcurve(property.data_path(), index)
                .insert_keyframe(frame as f32, value[index]);
        }

        log::debug!(
            "Keyed {} of {:?} at frame {} to {:?}",
            data_path,
            self.objects[id].name,
            frame,
            value
        );

        Ok(())
    }

    pub fn fcurve_mut(
        &mut self,
        id: ObjectId,
        data_path: &str,
        array_index: usize,
    ) -> anyhow::Result<&mut FCurve> {
        let object = self.object(id)?;
        let animation = object
            .animation_data
            .with_context(|| format!("Object '{}' has no animation data", object.name))?;

        self.actions[animation.action]
            .find_mut(data_path, array_index)
            .with_context(|| format!("No F-curve for {}[{}]", data_path, array_index))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn set_transform_from_matrix(object: &mut Object3D, matrix: Mat4) {
    let (scale, rotation, translation) = matrix.to_scale_rotation_translation();

    object.transform.set_location(translation);
    object.transform.set_scale(scale);
    object
        .transform
        .set_rotation_euler(matrix_to_euler_xyz(&Mat3::from_quat(rotation)));
}

/// Inverse of `Rz * Ry * Rx`.
fn matrix_to_euler_xyz(m: &Mat3) -> Vec3 {
    let sin_y = (-m.x_axis.z).clamp(-1.0, 1.0);
    let y = sin_y.asin();

    if sin_y.abs() < 0.99999 {
        let x = m.y_axis.z.atan2(m.z_axis.z);
        let z = m.x_axis.y.atan2(m.x_axis.x);
        Vec3::new(x, y, z)
    } else {
        let x = (-m.z_axis.y).atan2(m.y_axis.y);
        Vec3::new(x, y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::uv_sphere;
    use crate::scene_graph::transform::euler_xyz_to_quat;
    use std::f32::consts::FRAC_PI_2;

    fn sphere_object(scene: &mut Scene, name: &str, location: Vec3) -> ObjectId {
        let mesh_id = scene.add_mesh(uv_sphere("Sphere", 8, 4, 1.0));
        let id = scene.add_mesh_object(name, mesh_id);
        scene
            .get_object_mut(id)
            .unwrap()
            .transform
            .set_location(location);
        id
    }

    #[test]
    fn startup_scene_has_selected_cube() {
        let scene = Scene::startup();
        let cube = scene.get_object_by_name("Cube").unwrap();

        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.active_object(), Some(cube));
        assert!(scene.get_object(cube).unwrap().selected);
    }

    #[test]
    fn clear_removes_everything() {
        let mut scene = Scene::startup();
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);
        let moon = sphere_object(&mut scene, "Moon", Vec3::Y);
        scene.set_object_parent(moon, Some(pivot), ParentMode::Raw).unwrap();

        assert_eq!(scene.clear(), 3);
        assert_eq!(scene.object_count(), 0);
        assert!(scene.get_object(moon).is_none());
        assert!(scene.active_object().is_none());
        // Orphaned data keeps its name.
        assert!(scene.materials.get_by_name("Material").is_some());
    }

    #[test]
    fn new_objects_are_the_only_selection() {
        let mut scene = Scene::startup();
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);

        assert_eq!(scene.selected_objects(), vec![pivot]);
        assert_eq!(scene.active_object(), Some(pivot));

        scene.select_all(SelectAction::Invert);
        assert_eq!(scene.selected_objects().len(), 1);
        assert_ne!(scene.selected_objects()[0], pivot);

        scene.select_all(SelectAction::Toggle);
        assert!(scene.selected_objects().is_empty());
    }

    #[test]
    fn object_names_are_unique_while_linked() {
        let mut scene = Scene::new();
        let first = scene.add_empty("Empty", EmptyDisplay::PlainAxes);
        let second = scene.add_empty("Empty", EmptyDisplay::Arrows);

        assert_eq!(scene.get_object(second).unwrap().name, "Empty.001");
        assert_eq!(scene.rename_object(second, "Empty").unwrap(), "Empty.001");
        assert_eq!(scene.rename_object(first, "Pivot").unwrap(), "Pivot");

        scene.clear();
        let third = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);
        assert_eq!(scene.get_object(third).unwrap().name, "Pivot");
    }

    #[test]
    fn raw_parenting_turns_offset_into_orbit() {
        let mut scene = Scene::new();
        let moon = sphere_object(&mut scene, "Moon", Vec3::new(0.0, 3.0, 0.0));
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);
        scene.set_object_parent(moon, Some(pivot), ParentMode::Raw).unwrap();

        scene
            .get_object_mut(pivot)
            .unwrap()
            .transform
            .set_rotation_euler(Vec3::new(0.0, 0.0, FRAC_PI_2));

        let position = scene.world_matrix(moon).transform_point3(Vec3::ZERO);
        assert!(position.abs_diff_eq(Vec3::new(-3.0, 0.0, 0.0), 1e-5));
        assert_eq!(scene.get_object(pivot).unwrap().child_ids, vec![moon]);
        assert_eq!(scene.get_object(moon).unwrap().parent(&scene).unwrap().name, "Pivot");
        let pivot_object = scene.get_object(pivot).unwrap();
        let children: Vec<&str> = pivot_object.children(&scene).map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["Moon"]);
    }

    #[test]
    fn keep_world_transform_compensates_parent() {
        let mut scene = Scene::new();
        let moon = sphere_object(&mut scene, "Moon", Vec3::new(0.0, 3.0, 0.0));
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);
        scene
            .get_object_mut(pivot)
            .unwrap()
            .transform
            .set_location(Vec3::new(5.0, 0.0, 0.0));

        scene
            .set_object_parent(moon, Some(pivot), ParentMode::KeepWorldTransform)
            .unwrap();
        let kept = scene.world_matrix(moon).transform_point3(Vec3::ZERO);
        assert!(kept.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));

        scene.set_object_parent(moon, Some(pivot), ParentMode::Raw).unwrap();
        let raw = scene.world_matrix(moon).transform_point3(Vec3::ZERO);
        assert!(raw.abs_diff_eq(Vec3::new(5.0, 3.0, 0.0), 1e-5));
        assert_eq!(scene.get_object(pivot).unwrap().child_ids.len(), 1);
    }

    #[test]
    fn parenting_cycles_are_rejected() {
        let mut scene = Scene::new();
        let a = scene.add_empty("A", EmptyDisplay::PlainAxes);
        let b = scene.add_empty("B", EmptyDisplay::PlainAxes);
        scene.set_object_parent(b, Some(a), ParentMode::Raw).unwrap();

        assert!(scene.set_object_parent(a, Some(b), ParentMode::Raw).is_err());
        assert!(scene.set_object_parent(a, Some(a), ParentMode::Raw).is_err());
    }

    #[test]
    fn deleting_parent_keeps_child_in_place() {
        let mut scene = Scene::new();
        let moon = sphere_object(&mut scene, "Moon", Vec3::new(0.0, 3.0, 0.0));
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);
        scene.set_object_parent(moon, Some(pivot), ParentMode::Raw).unwrap();
        scene
            .get_object_mut(pivot)
            .unwrap()
            .transform
            .set_rotation_euler(Vec3::new(0.0, 0.0, FRAC_PI_2));
        let before = scene.world_matrix(moon);

        // Only the pivot is selected after add_empty.
        assert_eq!(scene.delete_selected(), 1);

        let moon_object = scene.get_object(moon).unwrap();
        assert!(moon_object.parent_id.is_none());
        assert!(scene.world_matrix(moon).abs_diff_eq(before, 1e-5));
    }

    #[test]
    fn keyframes_and_frame_set() {
        let mut scene = Scene::new();
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);

        scene.frame_set(1);
        scene.keyframe_insert(pivot, "rotation_euler", Some(1)).unwrap();
        scene
            .get_object_mut(pivot)
            .unwrap()
            .transform
            .set_rotation_euler(Vec3::new(0.0, 0.0, 2.0));
        scene.keyframe_insert(pivot, "rotation_euler", Some(11)).unwrap();

        let action = scene.object_action(pivot).unwrap();
        assert_eq!(action.name, "PivotAction");
        assert_eq!(action.fcurves.len(), 3);

        scene.frame_set(6);
        let rotation = scene.get_object(pivot).unwrap().transform.rotation_euler();
        assert!((rotation.z - 1.0).abs() < 1e-5);

        assert!(scene.fcurve_mut(pivot, "rotation_euler", 2).is_ok());
        assert!(scene.fcurve_mut(pivot, "location", 2).is_err());
        assert!(scene.keyframe_insert(pivot, "color", None).is_err());

        // Without an explicit frame the key lands on the current one.
        scene.keyframe_insert(pivot, "location", None).unwrap();
        let location = scene.object_action(pivot).unwrap().find("location", 0).unwrap();
        assert_eq!(location.keyframes()[0].frame, 6.0);
    }

    #[test]
    fn modifiers_need_mesh_objects() {
        let mut scene = Scene::new();
        let pivot = scene.add_empty("Pivot", EmptyDisplay::PlainAxes);

        assert!(scene.add_modifier(pivot, Modifier::subsurf("Subsurf", 2)).is_err());
        assert!(scene.object_mesh_mut(pivot).is_err());
    }

    #[test]
    fn euler_extraction_inverts_composition() {
        let angles = Vec3::new(0.3, -0.7, 1.2);
        let matrix = Mat3::from_quat(euler_xyz_to_quat(angles));

        assert!(matrix_to_euler_xyz(&matrix).abs_diff_eq(angles, 1e-5));
    }
}
