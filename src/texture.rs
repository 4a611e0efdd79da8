use super::*;

/// A decoded RGBA8 bitmap. UV lookup is nearest-neighbor: UV in `[0,1]^2`
/// maps to pixel coordinates by componentwise multiplication with
/// `(width, height)`, per §3.
#[derive(Clone, Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Texture {
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Self {
        assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decode PNG/JPEG bytes into a tightly packed RGBA8 buffer. Decode
    /// failure is `BadTexture`, never a panic (§7).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|err| Error::BadTexture(format!("failed to decode texture: {err}")))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let pixels = image
            .pixels()
            .map(|p| [p.0[0], p.0[1], p.0[2], p.0[3]])
            .collect();
        Ok(Self::new(width, height, pixels))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at UV `(u, v) in [0,1]^2`, returning an RGB color in
    /// `[0,1]^3`.
    pub fn sample(&self, uv: Point2) -> ColorRgb {
        let x = ((uv.x.clamp(0.0, 1.0)) * self.width as f32) as u32;
        let y = ((uv.y.clamp(0.0, 1.0)) * self.height as f32) as u32;
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        let p = self.pixels[(y * self.width + x) as usize];
        ColorRgb::new(
            f32::from(p[0]) / 255.0,
            f32::from(p[1]) / 255.0,
            f32::from(p[2]) / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_sample_corners() {
        let tex = Texture::new(
            2,
            2,
            vec![
                [255, 0, 0, 255],
                [0, 255, 0, 255],
                [0, 0, 255, 255],
                [255, 255, 255, 255],
            ],
        );
        let c = tex.sample(Point2::new(0.0, 0.0));
        assert_ulps_eq!(c.red(), 1.0, max_ulps = 1);
        let c = tex.sample(Point2::new(0.99, 0.99));
        assert_ulps_eq!(c.blue(), 1.0, max_ulps = 4);
    }
}
