use id_arena::Id;

use crate::animation::fcurve::FCurve;

pub type ActionId = Id<Action>;

/// A named set of F-curves that can be assigned to an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub fcurves: Vec<FCurve>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fcurves: Vec::new(),
        }
    }

    pub fn find(&self, data_path: &str, array_index: usize) -> Option<&FCurve> {
        self.fcurves
            .iter()
            .find(|curve| curve.data_path == data_path && curve.array_index == array_index)
    }

    pub fn find_mut(&mut self, data_path: &str, array_index: usize) -> Option<&mut FCurve> {
        self.fcurves
            .iter_mut()
            .find(|curve| curve.data_path == data_path && curve.array_index == array_index)
    }

    pub fn ensure_fcurve(&mut self, data_path: &str, array_index: usize) -> &mut FCurve {
        let index = match self
            .fcurves
            .iter()
            .position(|curve| curve.data_path == data_path && curve.array_index == array_index)
        {
            Some(index) => index,
            None => {
                self.fcurves.push(FCurve::new(data_path, array_index));
                self.fcurves.len() - 1
            }
        };

        &mut self.fcurves[index]
    }
}
