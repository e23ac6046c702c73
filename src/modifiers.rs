//! Object modifier stack. Modifiers never touch the mesh data block; they are
//! evaluated on a copy when the object is exported.

use crate::mesh::subdivision::catmull_clark;
use crate::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    Subsurf { levels: u32, render_levels: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
    pub show_viewport: bool,
    pub show_render: bool,
}

impl Modifier {
    pub fn new(name: impl Into<String>, kind: ModifierKind) -> Self {
        Self {
            name: name.into(),
            kind,
            show_viewport: true,
            show_render: true,
        }
    }

    pub fn subsurf(name: impl Into<String>, level: u32) -> Self {
        Self::new(
            name,
            ModifierKind::Subsurf {
                levels: level,
                render_levels: level,
            },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    Viewport,
    Render,
}

/// Runs the enabled modifiers of the stack over a copy of `mesh`, in order.
pub fn evaluate_mesh(mesh: &Mesh, modifiers: &[Modifier], mode: EvaluationMode) -> Mesh {
    let enabled = modifiers.iter().filter(|modifier| match mode {
        EvaluationMode::Viewport => modifier.show_viewport,
        EvaluationMode::Render => modifier.show_render,
    });

    enabled.fold(mesh.clone(), |mesh, modifier| match modifier.kind {
        ModifierKind::Subsurf {
            levels,
            render_levels,
        } => {
            let level = match mode {
                EvaluationMode::Viewport => levels,
                EvaluationMode::Render => render_levels,
            };
            catmull_clark(&mesh, level)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives::cube;

    #[test]
    fn subsurf_uses_level_for_mode() {
        let mesh = cube("Cube", 2.0);
        let stack = [Modifier::new(
            "Subsurf",
            ModifierKind::Subsurf {
                levels: 1,
                render_levels: 2,
            },
        )];

        assert_eq!(evaluate_mesh(&mesh, &stack, EvaluationMode::Viewport).polygon_count(), 24);
        assert_eq!(evaluate_mesh(&mesh, &stack, EvaluationMode::Render).polygon_count(), 96);
    }

    #[test]
    fn hidden_modifiers_are_skipped() {
        let mesh = cube("Cube", 2.0);
        let mut modifier = Modifier::subsurf("Subsurf", 2);
        modifier.show_viewport = false;

        let evaluated = evaluate_mesh(&mesh, &[modifier], EvaluationMode::Viewport);
        assert_eq!(evaluated.polygon_count(), 6);
    }

    #[test]
    fn stacked_modifiers_compose() {
        let mesh = cube("Cube", 2.0);
        let stack = [Modifier::subsurf("Subsurf", 1), Modifier::subsurf("Subsurf.001", 1)];

        let evaluated = evaluate_mesh(&mesh, &stack, EvaluationMode::Viewport);
        assert_eq!(evaluated.polygon_count(), 96);
    }
}
