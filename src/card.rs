use std::path::Path;

use crate::{
    foundation::{
        core::{Resolution, Rgb8},
        error::{ReelError, ReelResult},
    },
    script::Script,
    state::StateProfile,
};

/// Seconds a card asks for before the state bounds are applied.
pub const CARD_SECS: f64 = 3.0;

const DETAIL_MAX_CHARS: usize = 80;
const BASE_HEIGHT: f64 = 720.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Intro,
    Outro,
}

impl CardKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Outro => "outro",
        }
    }
}

/// A full-frame still with three centred lines between two accent rules.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Card {
    pub kind: CardKind,
    pub heading: String,
    pub mode: String,
    pub detail: String,
    pub background: Rgb8,
    pub accent: Rgb8,
    pub detail_color: Rgb8,
}

/// The opening and closing cards of one video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TitleCards {
    pub intro: Card,
    pub outro: Card,
}

impl TitleCards {
    pub fn for_script(script: &Script, profile: &StateProfile) -> Self {
        let state = profile.state.title();
        let accent = profile.palette.accent;
        let detail_color = Rgb8::new(160, 160, 180);
        Self {
            intro: Card {
                kind: CardKind::Intro,
                heading: script.title.to_uppercase(),
                mode: format!("{state} Mode"),
                detail: script.description.chars().take(DETAIL_MAX_CHARS).collect(),
                background: Rgb8::new(15, 15, 30),
                accent,
                detail_color,
            },
            outro: Card {
                kind: CardKind::Outro,
                heading: "Thanks for watching".to_string(),
                mode: script.title.to_uppercase(),
                detail: format!("State: {state}"),
                background: Rgb8::new(10, 10, 20),
                accent,
                detail_color,
            },
        }
    }
}

/// Vertical offsets from the frame centre, at 720p, of the rules and the three text lines.
pub const RULE_OFFSETS: [i64; 2] = [-70, 80];
pub const LINE_OFFSETS: [i64; 3] = [-38, 4, 56];
const RULE_HALF_WIDTH: f64 = 260.0;

/// `offset` scaled from 720p to `height`, measured from the frame centre.
pub fn scaled_offset(height: u32, offset: i64) -> i64 {
    let scale = f64::from(height) / BASE_HEIGHT;
    i64::from(height / 2) + (offset as f64 * scale).round() as i64
}

/// Background and accent rules. Text is drawn over this by the encoder.
pub fn rasterize(card: &Card, res: Resolution) -> image::RgbImage {
    let scale = f64::from(res.height) / BASE_HEIGHT;
    let bg = image::Rgb([card.background.r, card.background.g, card.background.b]);
    let accent = image::Rgb([card.accent.r, card.accent.g, card.accent.b]);
    let mut img = image::RgbImage::from_pixel(res.width, res.height, bg);

    let cx = f64::from(res.width) / 2.0;
    let half = RULE_HALF_WIDTH * scale;
    let x0 = (cx - half).max(0.0).round() as u32;
    let x1 = ((cx + half).round() as u32).min(res.width);
    let thickness = ((2.0 * scale).round() as u32).max(1);
    for offset in RULE_OFFSETS {
        let top = scaled_offset(res.height, offset).max(0) as u32;
        for y in top..(top + thickness).min(res.height) {
            for x in x0..x1 {
                img.put_pixel(x, y, accent);
            }
        }
    }
    img
}

pub fn write_png(card: &Card, res: Resolution, path: &Path) -> ReelResult<()> {
    if res.width == 0 || res.height == 0 {
        return Err(ReelError::validation("card resolution must be non-zero"));
    }
    rasterize(card, res)
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| ReelError::encoding(format!("write card '{}': {e}", path.display())))
}
