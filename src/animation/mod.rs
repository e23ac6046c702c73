pub mod action;
pub mod fcurve;

use anyhow::bail;
use glam::Vec3;

use crate::scene_graph::transform::Transform;

pub use action::{Action, ActionId};
pub use fcurve::{CycleMode, FCurve, FModifier, Interpolation, Keyframe};

/// Animation state attached to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationData {
    pub action: ActionId,
}

/// Transform properties that can be keyed, addressed by their data path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatedProperty {
    Location,
    RotationEuler,
    Scale,
}

impl AnimatedProperty {
    pub const ALL: [AnimatedProperty; 3] = [
        AnimatedProperty::Location,
        AnimatedProperty::RotationEuler,
        AnimatedProperty::Scale,
    ];

    pub fn from_data_path(data_path: &str) -> anyhow::Result<Self> {
        match data_path {
            "location" => Ok(AnimatedProperty::Location),
            "rotation_euler" => Ok(AnimatedProperty::RotationEuler),
            "scale" => Ok(AnimatedProperty::Scale),
            other => bail!("Property '{}' cannot be animated", other),
        }
    }

    pub fn data_path(&self) -> &'static str {
        match self {
            AnimatedProperty::Location => "location",
            AnimatedProperty::RotationEuler => "rotation_euler",
            AnimatedProperty::Scale => "scale",
        }
    }

    pub fn get(&self, transform: &Transform) -> Vec3 {
        match self {
            AnimatedProperty::Location => transform.location(),
            AnimatedProperty::RotationEuler => transform.rotation_euler(),
            AnimatedProperty::Scale => transform.scale(),
        }
    }

    pub fn set(&self, transform: &mut Transform, value: Vec3) {
        match self {
            AnimatedProperty::Location => transform.set_location(value),
            AnimatedProperty::RotationEuler => transform.set_rotation_euler(value),
            AnimatedProperty::Scale => transform.set_scale(value),
        }
    }
}

/// Writes every curve of `action` that targets a transform property at `frame`.
/// Curves on other data paths are skipped.
pub fn apply_action(action: &Action, transform: &mut Transform, frame: f32) {
    for property in AnimatedProperty::ALL {
        let mut value = property.get(transform);
        let mut touched = false;

        for curve in action
            .fcurves
            .iter()
            .filter(|curve| curve.data_path == property.data_path() && curve.array_index < 3)
        {
            value[curve.array_index] = curve.evaluate(frame);
            touched = true;
        }

        if touched {
            property.set(transform, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_paths_round_trip() {
        for property in AnimatedProperty::ALL {
            assert_eq!(
                AnimatedProperty::from_data_path(property.data_path()).unwrap(),
                property
            );
        }
        assert!(AnimatedProperty::from_data_path("rotation_quaternion").is_err());
    }

    #[test]
    fn apply_action_touches_only_keyed_channels() {
        let mut transform = Transform::from_location(Vec3::new(0.0, 3.0, 0.0));
        let mut action = Action::new("Action");
        action.ensure_fcurve("rotation_euler", 2).insert_keyframe(1.0, 1.5);

        apply_action(&action, &mut transform, 1.0);

        assert_eq!(transform.rotation_euler(), Vec3::new(0.0, 0.0, 1.5));
        assert_eq!(transform.location(), Vec3::new(0.0, 3.0, 0.0));
    }
}
