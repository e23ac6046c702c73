use gltf::json;
use json::validation::Checked::Valid;

use crate::material::Material;

/// Metallic-roughness material from the material's resolved surface parameters.
/// Translucent base colors switch the alpha mode to blending.
pub fn to_gltf_material(material: &Material) -> json::Material {
    let surface = material.surface();

    let alpha_mode = if surface.base_color.w < 1.0 {
        json::material::AlphaMode::Blend
    } else {
        json::material::AlphaMode::Opaque
    };

    json::Material {
        name: Some(material.name.clone()),
        alpha_mode: Valid(alpha_mode),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor(surface.base_color.to_array()),
            metallic_factor: json::material::StrengthFactor(surface.metallic),
            roughness_factor: json::material::StrengthFactor(surface.roughness),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::PRINCIPLED_BSDF;

    #[test]
    fn principled_inputs_become_pbr_factors() {
        let mut material = Material::new("Moon");
        material.set_use_nodes(true);
        let node = material
            .node_tree_mut()
            .unwrap()
            .node_mut(PRINCIPLED_BSDF)
            .unwrap();
        node.input_mut("Base Color")
            .unwrap()
            .set_default_value([0.215, 0.437, 0.6, 1.0])
            .unwrap();
        node.input_mut("Metallic").unwrap().set_default_value(0.25).unwrap();

        let gltf_material = to_gltf_material(&material);
        let pbr = &gltf_material.pbr_metallic_roughness;

        assert_eq!(gltf_material.name.as_deref(), Some("Moon"));
        assert_eq!(pbr.base_color_factor.0, [0.215, 0.437, 0.6, 1.0]);
        assert_eq!(pbr.metallic_factor.0, 0.25);
        assert_eq!(pbr.roughness_factor.0, 0.5);
        assert_eq!(gltf_material.alpha_mode, Valid(json::material::AlphaMode::Opaque));
    }

    #[test]
    fn translucent_color_blends() {
        let mut material = Material::new("Haze");
        material.diffuse_color.w = 0.3;

        let gltf_material = to_gltf_material(&material);
        assert_eq!(gltf_material.alpha_mode, Valid(json::material::AlphaMode::Blend));
    }
}
