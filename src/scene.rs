//! Assembles a `loader::SceneDocument` into the triangle/material/texture
//! triple the render core consumes, resolving materials and flagging the
//! light-emitting triangles. No BVH here — building the acceleration
//! structure is `api::build_bvh`'s job (§4.12), kept separate so a host
//! can load a previously-serialized BVH instead (`api::load_bvh`).

use super::*;

pub struct Scene {
    pub triangles: Vec<Triangle>,
    pub materials: Vec<Material>,
    pub textures: HashMap<String, Texture>,
}

impl Scene {
    /// Parses OBJ/MTL buffers, merges in JSON material overrides,
    /// decodes textures, and binds each face to its material (§3/§4.10).
    pub fn build(doc: &loader::SceneDocument) -> Result<Self> {
        let mtl_materials = loader::parse_mtl(&doc.scene.mtl_buffer)?;
        let materials = loader::merge_materials(mtl_materials, &doc.scene.materials);
        let raw_triangles = loader::parse_obj(&doc.scene.obj_buffer, &materials)?;
        let textures = loader::decode_textures(&doc.scene.raw_textures)?;

        let triangles = Self::bind_materials(raw_triangles, &materials);

        debug!(
            "scene built: {} triangles, {} materials, {} textures",
            triangles.len(),
            materials.len(),
            textures.len()
        );

        Ok(Self {
            triangles,
            materials,
            textures,
        })
    }

    /// Turns raw parsed triangles into core `Triangle` values, assigning
    /// each a stable build-order index and an `is_light` flag from its
    /// material's name (§7: unresolved material indices never error,
    /// they fall back to `Material::debug_magenta()`).
    fn bind_materials(raw: Vec<loader::RawTriangle>, materials: &[Material]) -> Vec<Triangle> {
        raw.into_iter()
            .enumerate()
            .map(|(index, r)| {
                let is_light = materials
                    .get(r.material as usize)
                    .map(Material::is_light)
                    .unwrap_or(false);
                Triangle::new(r.positions, r.tex_coords, r.material, index as u32, is_light)
            })
            .collect()
    }

    /// Material lookup used by the integrator and pass driver; falls
    /// back to a visible placeholder rather than panicking or erroring
    /// on an out-of-range index (§7).
    pub fn material(&self, index: u32) -> Material {
        self.materials
            .get(index as usize)
            .cloned()
            .unwrap_or_else(Material::debug_magenta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_doc() -> loader::SceneDocument {
        loader::SceneDocument {
            debug: false,
            scene: loader::SceneSection {
                materials: vec![],
                spheres: vec![],
                obj_buffer: "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl White\nf 1 2 3\n".to_owned(),
                mtl_buffer: "newmtl White\nKd 0.5 0.5 0.5\n".to_owned(),
                raw_textures: vec![],
                use_bvh: true,
                bvh_max_leaf_size: 4,
                bvh_max_depth: 32,
            },
        }
    }

    #[test]
    fn test_build_scene_binds_material() {
        let scene = Scene::build(&minimal_doc()).unwrap();
        assert_eq!(scene.triangles.len(), 1);
        assert_eq!(scene.material(0).name, "White");
        assert!(!scene.material(0).is_light());
    }

    #[test]
    fn test_material_out_of_range_falls_back() {
        let scene = Scene::build(&minimal_doc()).unwrap();
        let fallback = scene.material(99);
        assert_eq!(fallback.name, Material::debug_magenta().name);
    }

    #[test]
    fn test_light_material_flags_triangle() {
        let mut doc = minimal_doc();
        doc.scene.obj_buffer = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl Light\nf 1 2 3\n".to_owned();
        doc.scene.mtl_buffer = format!("newmtl {}\nKd 1 1 1\n", Material::LIGHT_NAME);
        let scene = Scene::build(&doc).unwrap();
        assert!(scene.triangles[0].is_light);
    }
}
