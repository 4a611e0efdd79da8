use super::*;

/// A material is shared by many triangles; triangles hold an index into
/// the scene's material table rather than owning a copy, so rebinding a
/// material editor-side never touches geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub diffuse: ColorRgb,
    pub ambient: ColorRgb,
    pub specular: ColorRgb,
    pub diffuse_map: Option<String>,
    pub ambient_map: Option<String>,
    pub specular_map: Option<String>,
}

impl Material {
    /// The literal name the loader keys area-light detection on (§4.10,
    /// §9's recommendation to tag `is_light` at build time instead of
    /// string-comparing during traversal applies downstream, in `scene`).
    pub const LIGHT_NAME: &'static str = "Light";

    /// Missing-material fallback (§7): rendering never aborts for a
    /// dangling `usemtl` reference.
    pub fn debug_magenta() -> Self {
        Self {
            name: "__debug_magenta__".to_owned(),
            diffuse: ColorRgb::new(1.0, 0.0, 1.0),
            ambient: ColorRgb::BLACK,
            specular: ColorRgb::BLACK,
            diffuse_map: None,
            ambient_map: None,
            specular_map: None,
        }
    }

    pub fn is_light(&self) -> bool {
        self.name == Self::LIGHT_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_magenta_is_not_light() {
        let material = Material::debug_magenta();
        assert!(!material.is_light());
        assert_eq!(material.diffuse, ColorRgb::new(1.0, 0.0, 1.0));
    }
}
