use std::path::Path;

use crate::{
    asset::GradientAsset,
    foundation::{
        core::{Resolution, Rgb8},
        error::{ReelError, ReelResult},
    },
    state::Palette,
};

const FNV_OFFSET: u64 = 0xcbf29ce484222325;

/// Terminal link of the resolution chain. Total: any palette and index yields a gradient.
#[derive(Clone, Copy, Debug)]
pub struct GradientGenerator {
    pub resolution: Resolution,
}

impl GradientGenerator {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    /// Same palette and scene index always give the same gradient.
    pub fn generate(&self, palette: &Palette, scene_index: usize) -> GradientAsset {
        let seed = gradient_seed(&palette.name, scene_index);
        // Low bits pick brightness jitter in 0.85..=1.15, the next byte picks one of eight angles.
        let jitter = 0.85 + ((seed & 0xff) as f64 / 255.0) * 0.30;
        let angle_deg = (((seed >> 8) & 0x7) * 45) as u32;
        let [a, b] = palette.stops;
        let (from, to) = if scene_index.is_multiple_of(2) { (a, b) } else { (b, a) };
        GradientAsset {
            from: from.scale(jitter),
            to: to.scale(jitter),
            angle_deg,
            seed,
            resolution: self.resolution,
        }
    }
}

pub fn gradient_seed(palette_name: &str, scene_index: usize) -> u64 {
    let mut h = Fnv1a64::new(FNV_OFFSET);
    h.write_u64(palette_name.len() as u64);
    h.write_bytes(palette_name.as_bytes());
    h.write_u64(scene_index as u64);
    h.finish()
}

/// Colour at pixel `(x, y)` of `g`.
pub fn sample(g: &GradientAsset, x: u32, y: u32) -> Rgb8 {
    let w = f64::from(g.resolution.width.max(1));
    let h = f64::from(g.resolution.height.max(1));
    let (sin, cos) = f64::from(g.angle_deg).to_radians().sin_cos();
    // Project the pixel centre on the gradient axis and normalise over the frame's extent.
    let px = (f64::from(x) + 0.5) / w - 0.5;
    let py = (f64::from(y) + 0.5) / h - 0.5;
    let extent = 0.5 * (sin.abs() + cos.abs());
    let t = if extent > 0.0 {
        ((px * sin + py * cos) / extent + 1.0) * 0.5
    } else {
        0.0
    };
    g.from.lerp(g.to, t)
}

pub fn rasterize(g: &GradientAsset) -> image::RgbImage {
    image::RgbImage::from_fn(g.resolution.width, g.resolution.height, |x, y| {
        let c = sample(g, x, y);
        image::Rgb([c.r, c.g, c.b])
    })
}

/// Rasterise `g` into a PNG at `path` for the encoder to loop as a still.
pub fn write_png(g: &GradientAsset, path: &Path) -> ReelResult<()> {
    if g.resolution.width == 0 || g.resolution.height == 0 {
        return Err(ReelError::validation("gradient resolution must be non-zero"));
    }
    rasterize(g)
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| {
            ReelError::encoding(format!("write gradient '{}': {e}", path.display()))
        })
}

#[derive(Clone, Copy)]
struct Fnv1a64(u64);

impl Fnv1a64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        self.0 = h;
    }

    fn finish(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
#[path = "../tests/unit/gradient.rs"]
mod tests;
