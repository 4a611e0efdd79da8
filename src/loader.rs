//! Host-facing ingestion: the Wavefront OBJ/MTL text buffers and raw
//! texture bytes a scene JSON document carries in (§4.10/§4.11), turned
//! into the plain `Vec<Triangle>`/`Vec<Material>`/texture bytes the
//! `scene` builder assembles into a `Scene`. Nothing in here is aware of
//! the BVH or the integrator — that split mirrors how the teacher keeps
//! `cpupt` free of asset-format concerns.

use super::*;

/// Mirrors the scene JSON schema's top-level fields verbatim (§3/§6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub debug: bool,
    pub scene: SceneSection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneSection {
    #[serde(default)]
    pub materials: Vec<MaterialDocument>,
    /// Parsed and discarded: spheres aren't part of the triangle core.
    #[serde(default)]
    pub spheres: Vec<serde_json::Value>,
    #[serde(rename = "objBuffer")]
    pub obj_buffer: String,
    #[serde(rename = "mtlBuffer", default)]
    pub mtl_buffer: String,
    #[serde(rename = "rawTextures", default)]
    pub raw_textures: Vec<RawTexture>,
    #[serde(rename = "useBVH", default = "default_true")]
    pub use_bvh: bool,
    #[serde(rename = "bvhMaxLeafSize", default = "default_max_leaf_size")]
    pub bvh_max_leaf_size: usize,
    #[serde(rename = "bvhMaxDepth", default = "default_max_depth")]
    pub bvh_max_depth: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_leaf_size() -> usize {
    4
}

fn default_max_depth() -> usize {
    32
}

/// A material override/addition carried in the scene JSON, keyed by
/// name; merged over whatever the MTL buffer parsed, JSON taking
/// precedence since it's the more specific, host-supplied source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDocument {
    pub name: String,
    #[serde(default)]
    pub diffuse: Option<[f32; 3]>,
    #[serde(default)]
    pub ambient: Option<[f32; 3]>,
    #[serde(default)]
    pub specular: Option<[f32; 3]>,
    #[serde(rename = "diffuseMap", default)]
    pub diffuse_map: Option<String>,
}

/// A raw texture byte buffer keyed by the name materials reference it
/// by in `diffuse_map`/`ambient_map`/`specular_map` (§4.11).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawTexture {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// A triangle as read off the page, before the BVH assigns it a stable
/// build-order index.
pub struct RawTriangle {
    pub positions: [Point3; 3],
    pub tex_coords: [Point2; 3],
    pub material: u32,
}

/// Parses a minimal Wavefront OBJ buffer (§4.10): `v`, `vt`, `f` lines;
/// `vn` accepted but unused (the triangle normal is always the
/// geometric cross product, computed by `Triangle::new`); `usemtl`
/// switches the active material; `o`, `g`, `#` ignored. Faces with more
/// than 3 vertices are fan-triangulated around vertex 0.
pub fn parse_obj(obj: &str, materials: &[Material]) -> Result<Vec<RawTriangle>> {
    let mut positions: Vec<Point3> = vec![];
    let mut tex_coords: Vec<Point2> = vec![];
    let mut triangles = vec![];
    let mut active_material: u32 = 0;

    for (line_no, raw_line) in obj.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(tag) = tokens.next() else { continue };
        match tag {
            "v" => {
                let v = parse_floats::<3>(tokens, line_no)?;
                positions.push(Point3::new(v[0], v[1], v[2]));
            }
            "vt" => {
                let v = parse_floats::<2>(tokens, line_no)?;
                tex_coords.push(Point2::new(v[0], v[1]));
            }
            "vn" | "o" | "g" => {}
            "usemtl" => {
                let name = tokens.next().ok_or_else(|| {
                    Error::BadInput(format!("line {}: usemtl missing a name", line_no + 1))
                })?;
                // An unresolvable name is deliberately left pointing past the
                // end of the material table: §7's missing-material policy is
                // "fall back to the debug material, never abort", and
                // `RenderContext::material`/`Scene::material` already treat
                // any out-of-range index that way.
                active_material = material_index(materials, name).map_or(materials.len() as u32, |i| i as u32);
            }
            "f" => {
                let refs: Vec<&str> = tokens.collect();
                if refs.len() < 3 {
                    return Err(Error::BadInput(format!(
                        "line {}: face needs at least 3 vertices",
                        line_no + 1
                    )));
                }
                let mut verts = Vec::with_capacity(refs.len());
                for r in &refs {
                    verts.push(parse_face_vertex(r, positions.len(), tex_coords.len(), line_no)?);
                }
                for i in 1..verts.len() - 1 {
                    let idx = [verts[0], verts[i], verts[i + 1]];
                    let mut p = [Point3::origin(); 3];
                    let mut t = [Point2::origin(); 3];
                    for (k, (pi, ti)) in idx.into_iter().enumerate() {
                        p[k] = *positions.get(pi).ok_or_else(|| {
                            Error::BadInput(format!("line {}: position index out of range", line_no + 1))
                        })?;
                        t[k] = ti
                            .and_then(|ti| tex_coords.get(ti).copied())
                            .unwrap_or(Point2::origin());
                    }
                    triangles.push(RawTriangle {
                        positions: p,
                        tex_coords: t,
                        material: active_material,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(triangles)
}

fn parse_floats<const N: usize>(
    tokens: std::str::SplitWhitespace<'_>,
    line_no: usize,
) -> Result<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut count = 0;
    for (i, t) in tokens.enumerate() {
        if i >= N {
            break;
        }
        out[i] = t
            .parse()
            .map_err(|_| Error::BadInput(format!("line {}: expected a number, got '{}'", line_no + 1, t)))?;
        count += 1;
    }
    if count < N {
        return Err(Error::BadInput(format!(
            "line {}: expected {} numbers, got {}",
            line_no + 1,
            N,
            count
        )));
    }
    Ok(out)
}

/// Parses a single `f` line vertex reference (`v`, `v/vt`, `v/vt/vn`,
/// `v//vn`), resolving negative (relative) indices against the current
/// counts, and returns 0-based `(position_index, Option<tex_coord_index>)`.
fn parse_face_vertex(
    reference: &str,
    position_count: usize,
    tex_coord_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>)> {
    let mut parts = reference.split('/');
    let v = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::BadInput(format!("line {}: empty face vertex", line_no + 1)))?;
    let v_index = resolve_index(v, position_count, line_no)?;

    let vt = match parts.next() {
        Some(s) if !s.is_empty() => Some(resolve_index(s, tex_coord_count, line_no)?),
        _ => None,
    };

    Ok((v_index, vt))
}

fn resolve_index(token: &str, count: usize, line_no: usize) -> Result<usize> {
    let n: i64 = token
        .parse()
        .map_err(|_| Error::BadInput(format!("line {}: bad index '{}'", line_no + 1, token)))?;
    if n > 0 {
        Ok(n as usize - 1)
    } else if n < 0 {
        let idx = count as i64 + n;
        if idx < 0 {
            return Err(Error::BadInput(format!(
                "line {}: relative index '{}' out of range",
                line_no + 1,
                token
            )));
        }
        Ok(idx as usize)
    } else {
        Err(Error::BadInput(format!("line {}: index cannot be 0", line_no + 1)))
    }
}

/// Parses a minimal Wavefront MTL buffer (§4.10): `newmtl`, `Kd`, `Ka`,
/// `Ks`, `map_Kd`.
pub fn parse_mtl(mtl: &str) -> Result<Vec<Material>> {
    let mut materials = vec![];
    let mut current: Option<Material> = None;

    for (line_no, raw_line) in mtl.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let Some(tag) = tokens.next() else { continue };
        match tag {
            "newmtl" => {
                if let Some(m) = current.take() {
                    materials.push(m);
                }
                let name = tokens
                    .next()
                    .ok_or_else(|| Error::BadInput(format!("line {}: newmtl missing a name", line_no + 1)))?
                    .to_owned();
                current = Some(Material {
                    name,
                    diffuse: ColorRgb::WHITE,
                    ambient: ColorRgb::BLACK,
                    specular: ColorRgb::BLACK,
                    diffuse_map: None,
                    ambient_map: None,
                    specular_map: None,
                });
            }
            "Kd" | "Ka" | "Ks" => {
                let material = current
                    .as_mut()
                    .ok_or_else(|| Error::BadInput(format!("line {}: color before newmtl", line_no + 1)))?;
                let v = parse_floats::<3>(tokens, line_no)?;
                let color = ColorRgb::new(v[0], v[1], v[2]);
                match tag {
                    "Kd" => material.diffuse = color,
                    "Ka" => material.ambient = color,
                    "Ks" => material.specular = color,
                    _ => unreachable!(),
                }
            }
            "map_Kd" => {
                let material = current
                    .as_mut()
                    .ok_or_else(|| Error::BadInput(format!("line {}: map before newmtl", line_no + 1)))?;
                material.diffuse_map = tokens.next().map(str::to_owned);
            }
            _ => {}
        }
    }
    if let Some(m) = current.take() {
        materials.push(m);
    }
    Ok(materials)
}

fn material_index(materials: &[Material], name: &str) -> Option<usize> {
    materials.iter().position(|m| m.name == name)
}

/// Decodes every raw texture buffer in the document, failing with
/// `BadTexture` (never panicking) on the first undecodable entry
/// (§4.11).
pub fn decode_textures(raw: &[RawTexture]) -> Result<HashMap<String, Texture>> {
    let mut textures = HashMap::with_capacity(raw.len());
    for t in raw {
        textures.insert(t.name.clone(), Texture::decode(&t.bytes)?);
    }
    Ok(textures)
}

/// Merges MTL-parsed materials with the JSON document's overrides
/// (§3), JSON taking precedence by name; materials only present in the
/// JSON document are appended.
pub fn merge_materials(mut parsed: Vec<Material>, overrides: &[MaterialDocument]) -> Vec<Material> {
    for doc in overrides {
        if let Some(existing) = parsed.iter_mut().find(|m| m.name == doc.name) {
            apply_override(existing, doc);
        } else {
            let mut material = Material {
                name: doc.name.clone(),
                diffuse: ColorRgb::WHITE,
                ambient: ColorRgb::BLACK,
                specular: ColorRgb::BLACK,
                diffuse_map: None,
                ambient_map: None,
                specular_map: None,
            };
            apply_override(&mut material, doc);
            parsed.push(material);
        }
    }
    parsed
}

fn apply_override(material: &mut Material, doc: &MaterialDocument) {
    if let Some([r, g, b]) = doc.diffuse {
        material.diffuse = ColorRgb::new(r, g, b);
    }
    if let Some([r, g, b]) = doc.ambient {
        material.ambient = ColorRgb::new(r, g, b);
    }
    if let Some([r, g, b]) = doc.specular {
        material.specular = ColorRgb::new(r, g, b);
    }
    if doc.diffuse_map.is_some() {
        material.diffuse_map = doc.diffuse_map.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_obj_triangle() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let triangles = parse_obj(obj, &[]).unwrap();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].positions[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_obj_fan_triangulates_quad() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let triangles = parse_obj(obj, &[]).unwrap();
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_parse_obj_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let triangles = parse_obj(obj, &[]).unwrap();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].positions[0], Point3::origin());
    }

    #[test]
    fn test_parse_obj_usemtl_switches_material() {
        let materials = vec![
            Material {
                name: "A".to_owned(),
                diffuse: ColorRgb::WHITE,
                ambient: ColorRgb::BLACK,
                specular: ColorRgb::BLACK,
                diffuse_map: None,
                ambient_map: None,
                specular_map: None,
            },
            Material {
                name: "B".to_owned(),
                diffuse: ColorRgb::WHITE,
                ambient: ColorRgb::BLACK,
                specular: ColorRgb::BLACK,
                diffuse_map: None,
                ambient_map: None,
                specular_map: None,
            },
        ];
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl B\nf 1 2 3\n";
        let triangles = parse_obj(obj, &materials).unwrap();
        assert_eq!(triangles[0].material, 1);
    }

    #[test]
    fn test_parse_mtl() {
        let mtl = "newmtl White\nKd 0.8 0.8 0.8\nKa 0 0 0\n";
        let materials = parse_mtl(mtl).unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].name, "White");
        assert_ulps_eq(materials[0].diffuse.red(), 0.8);
    }

    fn assert_ulps_eq(a: f32, b: f32) {
        approx::assert_ulps_eq!(a, b, max_ulps = 4);
    }

    #[test]
    fn test_merge_materials_overrides_by_name() {
        let parsed = parse_mtl("newmtl White\nKd 0.1 0.1 0.1\n").unwrap();
        let overrides = vec![MaterialDocument {
            name: "White".to_owned(),
            diffuse: Some([0.9, 0.9, 0.9]),
            ambient: None,
            specular: None,
            diffuse_map: None,
        }];
        let merged = merge_materials(parsed, &overrides);
        assert_ulps_eq(merged[0].diffuse.red(), 0.9);
    }
}
