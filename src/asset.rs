use std::path::{Path, PathBuf};

use crate::foundation::core::{Resolution, Rgb8};

/// Which link of the resolution chain supplied an asset.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetTier {
    Primary,
    Secondary,
    Image,
    Gradient,
}

impl AssetTier {
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Image => "image",
            Self::Gradient => "gradient",
        }
    }

    /// Video tiers bias their queries with the state's movement words.
    pub fn is_video(self) -> bool {
        matches!(self, Self::Primary | Self::Secondary)
    }
}

impl std::fmt::Display for AssetTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a downloaded asset came from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
    pub provider: String,
    pub source_url: String,
    pub query: String,
}

/// Local copy of a stock video clip.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClipAsset {
    pub path: PathBuf,
    pub available_s: f64,
    pub resolution: Resolution,
    pub tags: Vec<String>,
    pub provenance: Provenance,
}

/// Local copy of a stock photo, held for as long as a segment needs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub resolution: Resolution,
    pub tags: Vec<String>,
    pub provenance: Provenance,
}

/// Procedural two-stop linear gradient. Pure description; rasterised at encode time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientAsset {
    pub from: Rgb8,
    pub to: Rgb8,
    /// Gradient direction in degrees, 0 = top to bottom.
    pub angle_deg: u32,
    pub seed: u64,
    pub resolution: Resolution,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Asset {
    VideoClip(ClipAsset),
    StaticImage(ImageAsset),
    ProceduralGradient(GradientAsset),
}

impl Asset {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VideoClip(_) => "video_clip",
            Self::StaticImage(_) => "static_image",
            Self::ProceduralGradient(_) => "procedural_gradient",
        }
    }

    /// Seconds of footage available before looping. Stills and gradients never run out.
    pub fn available_s(&self) -> f64 {
        match self {
            Self::VideoClip(c) => c.available_s,
            Self::StaticImage(_) | Self::ProceduralGradient(_) => f64::INFINITY,
        }
    }

    pub fn resolution(&self) -> Resolution {
        match self {
            Self::VideoClip(c) => c.resolution,
            Self::StaticImage(i) => i.resolution,
            Self::ProceduralGradient(g) => g.resolution,
        }
    }

    /// Downloaded media file, if any.
    pub fn media_path(&self) -> Option<&Path> {
        match self {
            Self::VideoClip(c) => Some(&c.path),
            Self::StaticImage(i) => Some(&i.path),
            Self::ProceduralGradient(_) => None,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            Self::VideoClip(c) => &c.tags,
            Self::StaticImage(i) => &i.tags,
            Self::ProceduralGradient(_) => &[],
        }
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            Self::VideoClip(c) => Some(&c.provenance),
            Self::StaticImage(i) => Some(&i.provenance),
            Self::ProceduralGradient(_) => None,
        }
    }
}
