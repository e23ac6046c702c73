//! Materials with an optional shader node tree.
//!
//! Enabling nodes on a material creates the default surface setup: a
//! `Principled BSDF` node feeding the `Surface` input of `Material Output`.

use anyhow::{anyhow, bail};
use glam::{Vec3, Vec4};
use id_arena::Id;

pub type MaterialId = Id<Material>;

pub const PRINCIPLED_BSDF: &str = "Principled BSDF";
pub const MATERIAL_OUTPUT: &str = "Material Output";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SocketValue {
    Float(f32),
    Color(Vec4),
    Vector(Vec3),
    Shader,
}

impl SocketValue {
    fn kind(&self) -> &'static str {
        match self {
            SocketValue::Float(_) => "float",
            SocketValue::Color(_) => "color",
            SocketValue::Vector(_) => "vector",
            SocketValue::Shader => "shader",
        }
    }
}

impl From<f32> for SocketValue {
    fn from(value: f32) -> Self {
        SocketValue::Float(value)
    }
}

impl From<Vec4> for SocketValue {
    fn from(value: Vec4) -> Self {
        SocketValue::Color(value)
    }
}

impl From<[f32; 4]> for SocketValue {
    fn from(value: [f32; 4]) -> Self {
        SocketValue::Color(Vec4::from_array(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSocket {
    pub name: String,
    default_value: SocketValue,
}

impl NodeSocket {
    fn new(name: &str, default_value: SocketValue) -> Self {
        Self {
            name: name.to_string(),
            default_value,
        }
    }

    pub fn default_value(&self) -> SocketValue {
        self.default_value
    }

    /// Replaces the unlinked value of the socket. The value must be of the socket's type.
    pub fn set_default_value(&mut self, value: impl Into<SocketValue>) -> anyhow::Result<()> {
        let value = value.into();

        if std::mem::discriminant(&value) != std::mem::discriminant(&self.default_value) {
            bail!(
                "Socket '{}' expects a {} value, got a {} value",
                self.name,
                self.default_value.kind(),
                value.kind()
            );
        }

        self.default_value = value;
        Ok(())
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.default_value {
            SocketValue::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Vec4> {
        match self.default_value {
            SocketValue::Color(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    PrincipledBsdf,
    MaterialOutput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub name: String,
    pub kind: NodeKind,
    pub inputs: Vec<NodeSocket>,
}

impl ShaderNode {
    pub fn principled_bsdf() -> Self {
        Self {
            name: PRINCIPLED_BSDF.to_string(),
            kind: NodeKind::PrincipledBsdf,
            inputs: vec![
                NodeSocket::new("Base Color", SocketValue::Color(Vec4::new(0.8, 0.8, 0.8, 1.0))),
                NodeSocket::new("Metallic", SocketValue::Float(0.0)),
                NodeSocket::new("Roughness", SocketValue::Float(0.5)),
                NodeSocket::new("IOR", SocketValue::Float(1.45)),
                NodeSocket::new("Alpha", SocketValue::Float(1.0)),
                NodeSocket::new("Normal", SocketValue::Vector(Vec3::ZERO)),
            ],
        }
    }

    pub fn material_output() -> Self {
        Self {
            name: MATERIAL_OUTPUT.to_string(),
            kind: NodeKind::MaterialOutput,
            inputs: vec![
                NodeSocket::new("Surface", SocketValue::Shader),
                NodeSocket::new("Volume", SocketValue::Shader),
                NodeSocket::new("Displacement", SocketValue::Vector(Vec3::ZERO)),
            ],
        }
    }

    pub fn input(&self, name: &str) -> anyhow::Result<&NodeSocket> {
        self.inputs
            .iter()
            .find(|socket| socket.name == name)
            .ok_or_else(|| anyhow!("Node '{}' has no input '{}'", self.name, name))
    }

    pub fn input_mut(&mut self, name: &str) -> anyhow::Result<&mut NodeSocket> {
        let node_name = &self.name;
        self.inputs
            .iter_mut()
            .find(|socket| socket.name == name)
            .ok_or_else(|| anyhow!("Node '{}' has no input '{}'", node_name, name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLink {
    pub from_node: String,
    pub to_node: String,
    pub to_socket: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    pub nodes: Vec<ShaderNode>,
    pub links: Vec<NodeLink>,
}

impl NodeTree {
    pub fn default_surface() -> Self {
        Self {
            nodes: vec![ShaderNode::principled_bsdf(), ShaderNode::material_output()],
            links: vec![NodeLink {
                from_node: PRINCIPLED_BSDF.to_string(),
                to_node: MATERIAL_OUTPUT.to_string(),
                to_socket: "Surface".to_string(),
            }],
        }
    }

    pub fn node(&self, name: &str) -> anyhow::Result<&ShaderNode> {
        self.nodes
            .iter()
            .find(|node| node.name == name)
            .ok_or_else(|| anyhow!("Node tree has no node named '{}'", name))
    }

    pub fn node_mut(&mut self, name: &str) -> anyhow::Result<&mut ShaderNode> {
        self.nodes
            .iter_mut()
            .find(|node| node.name == name)
            .ok_or_else(|| anyhow!("Node tree has no node named '{}'", name))
    }

    /// The node linked into the output's `Surface` socket, if any.
    pub fn surface_shader(&self) -> Option<&ShaderNode> {
        let output = self
            .nodes
            .iter()
            .find(|node| node.kind == NodeKind::MaterialOutput)?;

        let link = self
            .links
            .iter()
            .find(|link| link.to_node == output.name && link.to_socket == "Surface")?;

        self.node(&link.from_node).ok()
    }
}

/// Surface parameters resolved from whichever representation is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParameters {
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    use_nodes: bool,
    node_tree: Option<NodeTree>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            metallic: 0.0,
            roughness: 0.4,
            use_nodes: false,
            node_tree: None,
        }
    }

    pub fn use_nodes(&self) -> bool {
        self.use_nodes
    }

    /// The node tree is created on first enable and kept when nodes are switched off.
    pub fn set_use_nodes(&mut self, enabled: bool) {
        self.use_nodes = enabled;

        if enabled && self.node_tree.is_none() {
            self.node_tree = Some(NodeTree::default_surface());
        }
    }

    pub fn node_tree(&self) -> anyhow::Result<&NodeTree> {
        self.node_tree
            .as_ref()
            .ok_or_else(|| anyhow!("Material '{}' has no node tree", self.name))
    }

    pub fn node_tree_mut(&mut self) -> anyhow::Result<&mut NodeTree> {
        let name = &self.name;
        self.node_tree
            .as_mut()
            .ok_or_else(|| anyhow!("Material '{}' has no node tree", name))
    }

    pub fn surface(&self) -> SurfaceParameters {
        let principled = self
            .node_tree
            .as_ref()
            .filter(|_| self.use_nodes)
            .and_then(NodeTree::surface_shader)
            .filter(|node| node.kind == NodeKind::PrincipledBsdf);

        let Some(node) = principled else {
            return SurfaceParameters {
                base_color: self.diffuse_color,
                metallic: self.metallic,
                roughness: self.roughness,
            };
        };

        let float = |name: &str, fallback: f32| {
            node.input(name)
                .ok()
                .and_then(NodeSocket::as_float)
                .unwrap_or(fallback)
        };

        let mut base_color = node
            .input("Base Color")
            .ok()
            .and_then(NodeSocket::as_color)
            .unwrap_or(self.diffuse_color);
        base_color.w *= float("Alpha", 1.0);

        SurfaceParameters {
            base_color,
            metallic: float("Metallic", 0.0),
            roughness: float("Roughness", 0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabling_nodes_creates_principled_surface() {
        let mut material = Material::new("Planet");
        assert!(material.node_tree().is_err());

        material.set_use_nodes(true);
        let tree = material.node_tree().unwrap();
        let surface = tree.surface_shader().unwrap();

        assert_eq!(surface.name, PRINCIPLED_BSDF);
        assert_eq!(surface.kind, NodeKind::PrincipledBsdf);
    }

    #[test]
    fn base_color_flows_into_surface() {
        let mut material = Material::new("Planet");
        material.set_use_nodes(true);

        let color = [0.604, 0.835, 0.965, 1.0];
        material
            .node_tree_mut()
            .unwrap()
            .node_mut(PRINCIPLED_BSDF)
            .unwrap()
            .input_mut("Base Color")
            .unwrap()
            .set_default_value(color)
            .unwrap();

        let surface = material.surface();
        assert_eq!(surface.base_color, Vec4::from_array(color));
        assert_eq!(surface.roughness, 0.5);
    }

    #[test]
    fn out_of_range_channels_pass_through() {
        let mut node = ShaderNode::principled_bsdf();
        let input = node.input_mut("Base Color").unwrap();
        input.set_default_value([2.0, -1.0, 0.5, 1.0]).unwrap();

        assert_eq!(input.as_color(), Some(Vec4::new(2.0, -1.0, 0.5, 1.0)));
    }

    #[test]
    fn missing_names_are_errors() {
        let mut material = Material::new("Planet");
        material.set_use_nodes(true);
        let tree = material.node_tree_mut().unwrap();

        assert!(tree.node("Emission").is_err());
        let error = tree
            .node_mut(PRINCIPLED_BSDF)
            .unwrap()
            .input_mut("Base Colour")
            .unwrap_err();
        assert!(error.to_string().contains("Base Colour"));
    }

    #[test]
    fn socket_type_is_enforced() {
        let mut node = ShaderNode::principled_bsdf();
        let result = node.input_mut("Metallic").unwrap().set_default_value([1.0; 4]);

        assert!(result.is_err());
    }

    #[test]
    fn diffuse_color_used_without_nodes() {
        let mut material = Material::new("Flat");
        material.diffuse_color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        material.set_use_nodes(true);
        material.set_use_nodes(false);

        assert_eq!(material.surface().base_color, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(material.surface().roughness, 0.4);
    }

    #[test]
    fn alpha_socket_scales_base_alpha() {
        let mut material = Material::new("Glass");
        material.set_use_nodes(true);
        material
            .node_tree_mut()
            .unwrap()
            .node_mut(PRINCIPLED_BSDF)
            .unwrap()
            .input_mut("Alpha")
            .unwrap()
            .set_default_value(0.5)
            .unwrap();

        assert_eq!(material.surface().base_color.w, 0.5);
    }
}
