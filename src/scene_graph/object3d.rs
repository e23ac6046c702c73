use glam::{Mat4, Vec3};
use id_arena::Id;

use crate::animation::AnimationData;
use crate::mesh::MeshId;
use crate::modifiers::Modifier;
use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

/// How an empty is drawn in the viewport. Has no effect on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyDisplay {
    #[default]
    PlainAxes,
    Arrows,
    SingleArrow,
    Circle,
    Cube,
    Sphere,
    Cone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectData {
    Mesh(MeshId),
    Empty { display: EmptyDisplay, size: f32 },
}

#[derive(Debug, Clone)]
pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    /// Applied between the parent's world matrix and this object's local matrix.
    pub parent_inverse: Mat4,
    pub data: ObjectData,
    pub modifiers: Vec<Modifier>,
    pub parent_id: Option<ObjectId>,
    pub child_ids: Vec<ObjectId>,
    pub animation_data: Option<AnimationData>,
    pub selected: bool,
}

impl Object3D {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            transform: Transform::from_location(Vec3::ZERO),
            parent_inverse: Mat4::IDENTITY,
            data,
            modifiers: Vec::new(),
            parent_id: None,
            child_ids: Vec::new(),
            animation_data: None,
            selected: false,
        }
    }

    pub fn empty(name: impl Into<String>, display: EmptyDisplay) -> Self {
        Self::new(name, ObjectData::Empty { display, size: 1.0 })
    }

    pub fn mesh_id(&self) -> Option<MeshId> {
        match self.data {
            ObjectData::Mesh(mesh_id) => Some(mesh_id),
            ObjectData::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, ObjectData::Empty { .. })
    }

    /// Local matrix as seen from the parent's space, parent inverse included.
    pub fn parent_space_matrix(&self) -> Mat4 {
        self.parent_inverse * *self.transform.get_local_matrix()
    }

    pub fn parent<'a>(&self, scene: &'a Scene) -> Option<&'a Object3D> {
        self.parent_id.and_then(|id| scene.get_object(id))
    }

    pub fn children<'a, 'b>(&'a self, scene: &'b Scene) -> impl Iterator<Item = &'b Object3D> + 'b
    where
        'a: 'b,
    {
        self.child_ids
            .iter()
            .filter_map(move |id| scene.get_object(*id))
    }
}
