use crate::{foundation::core::Rgb8, state::Palette};

/// Palette-derived grade applied uniformly to a segment.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorGrade {
    pub temperature_k: u32,
    pub saturation: f64,
    pub contrast: f64,
    /// Black overlay opacity in 0..1.
    pub dim: f64,
}

impl ColorGrade {
    pub const NEUTRAL_K: u32 = 6500;

    pub fn from_palette(p: &Palette) -> Self {
        Self {
            temperature_k: p.temperature_k,
            saturation: p.saturation,
            contrast: p.contrast,
            dim: p.overlay.clamp(0.0, 1.0),
        }
    }

    /// Approximate result of the grade on one colour, used for readability decisions.
    pub fn apply(&self, c: Rgb8) -> Rgb8 {
        let luma = 0.299 * f64::from(c.r) + 0.587 * f64::from(c.g) + 0.114 * f64::from(c.b);
        // Warm grades lift red and cut blue; cool grades the reverse.
        let warmth = (f64::from(Self::NEUTRAL_K) - f64::from(self.temperature_k)) / 10_000.0;
        let ch = |v: u8, shift: f64| -> u8 {
            let v = f64::from(v);
            let v = luma + (v - luma) * self.saturation;
            let v = 128.0 + (v - 128.0) * self.contrast;
            let v = v * (1.0 + shift) * (1.0 - self.dim);
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb8::new(ch(c.r, warmth), ch(c.g, 0.0), ch(c.b, -warmth))
    }

    /// ffmpeg filters realising the grade, in application order.
    pub fn ffmpeg_filters(&self) -> Vec<String> {
        let mut out = vec![format!(
            "eq=contrast={:.3}:saturation={:.3}",
            self.contrast, self.saturation
        )];
        if self.temperature_k != Self::NEUTRAL_K {
            out.push(format!(
                "colortemperature=temperature={}",
                self.temperature_k.clamp(1000, 40000)
            ));
        }
        if self.dim > 0.0 {
            out.push(format!("drawbox=x=0:y=0:w=iw:h=ih:color=black@{:.3}:t=fill", self.dim));
        }
        out
    }
}
