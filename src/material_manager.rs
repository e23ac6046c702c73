use std::collections::HashMap;

use id_arena::Arena;

use crate::material::{Material, MaterialId};
use crate::naming::unique_name;

/// Owns every material data block of a session. Names are unique; materials
/// are never freed, so a name stays taken after the last user goes away.
pub struct MaterialManager {
    materials: Arena<Material>,
    materials_by_name: HashMap<String, MaterialId>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
            materials_by_name: HashMap::new(),
        }
    }

    /// Stores the material, renaming it if its name is already taken.
    pub fn add_material(&mut self, mut material: Material) -> MaterialId {
        material.name = unique_name(&material.name, |name| {
            self.materials_by_name.contains_key(name)
        });

        let name = material.name.clone();
        let id = self.materials.alloc(material);
        self.materials_by_name.insert(name, id);

        log::debug!("Added material {:?}", self.materials[id].name);

        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<MaterialId> {
        self.materials_by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.len() == 0
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}
