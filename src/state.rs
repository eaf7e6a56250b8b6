use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{
    foundation::core::Rgb8,
    foundation::error::{ReelError, ReelResult},
    motion::MotionPattern,
};

/// Declared physiological state driving every content decision of a run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PhysioState {
    Calm,
    Focus,
    Energized,
    PreSleep,
    Stressed,
    Neutral,
}

impl PhysioState {
    pub const ALL: [PhysioState; 6] = [
        PhysioState::Calm,
        PhysioState::Focus,
        PhysioState::Energized,
        PhysioState::PreSleep,
        PhysioState::Stressed,
        PhysioState::Neutral,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Focus => "focus",
            Self::Energized => "energized",
            Self::PreSleep => "pre_sleep",
            Self::Stressed => "stressed",
            Self::Neutral => "neutral",
        }
    }

    /// Human form of the label ("Pre Sleep").
    pub fn title(self) -> String {
        self.label()
            .split('_')
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + c.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for PhysioState {
    type Err = ReelError;

    fn from_str(s: &str) -> ReelResult<Self> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        PhysioState::ALL
            .into_iter()
            .find(|st| st.label() == norm)
            .ok_or_else(|| ReelError::unknown_state(s.trim()))
    }
}

impl std::fmt::Display for PhysioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordinal arousal level, very-low..high.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Arousal {
    VeryLow,
    Low,
    LowMedium,
    Medium,
    High,
}

impl Arousal {
    pub const MAX_LEVEL: u8 = 4;

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::VeryLow),
            1 => Some(Self::Low),
            2 => Some(Self::LowMedium),
            3 => Some(Self::Medium),
            4 => Some(Self::High),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    /// Base transition length: long and gentle when calm, short and abrupt when aroused.
    pub fn transition_secs(self) -> f64 {
        match self {
            Self::VeryLow => 1.2,
            Self::Low => 1.0,
            Self::LowMedium => 0.8,
            Self::Medium => 0.6,
            Self::High => 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DurationBounds {
    pub min_s: f64,
    pub max_s: f64,
}

impl DurationBounds {
    pub fn contains(self, secs: f64) -> bool {
        secs >= self.min_s && secs <= self.max_s
    }

    pub fn clamp(self, secs: f64) -> f64 {
        secs.clamp(self.min_s, self.max_s)
    }

    pub fn midpoint(self) -> f64 {
        (self.min_s + self.max_s) / 2.0
    }
}

/// Colour palette and grade parameters for one state.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    /// Free-form descriptor, also used to seed procedural gradients.
    pub name: String,
    pub stops: [Rgb8; 2],
    pub accent: Rgb8,
    pub font: Rgb8,
    pub subtitle_bg: Rgb8,
    pub subtitle_bg_alpha: u8,
    /// Colour temperature in kelvin (6500 = neutral).
    pub temperature_k: u32,
    pub saturation: f64,
    pub contrast: f64,
    /// Black overlay opacity in 0..1 dimming the footage under subtitles.
    pub overlay: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VoiceParams {
    /// Accent selector handed to the TTS engine (gTTS top-level domain).
    pub accent: String,
    /// Speaking speed multiplier, 1.0 = normal.
    pub speed: f64,
    /// Pitch shift in semitones.
    pub pitch: f64,
}

impl VoiceParams {
    pub fn is_slow(&self) -> bool {
        self.speed < 1.0
    }
}

/// Validated parameter bundle for one [`PhysioState`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateProfile {
    pub state: PhysioState,
    pub arousal: Arousal,
    pub bounds: DurationBounds,
    pub palette: Palette,
    pub motion: Vec<MotionPattern>,
    pub zoom_intensity: f64,
    /// Playback speed multiplier applied to video clips.
    pub speed: f64,
    pub voice: VoiceParams,
    pub content_tags: Vec<String>,
    /// Extra words biasing video searches towards the state's motion feel.
    pub movement_words: String,
    pub target: String,
    pub tone: String,
    pub pace: String,
    pub narration_style: String,
}

impl StateProfile {
    pub fn motion_for(&self, scene_index: usize) -> MotionPattern {
        self.motion[scene_index % self.motion.len()]
    }

    pub fn primary_category(&self) -> &str {
        &self.content_tags[0]
    }
}

/// One unvalidated row of the built-in profile table.
#[derive(Clone, Debug)]
pub struct ProfileRow {
    pub state: PhysioState,
    pub arousal_level: u8,
    pub duration_s: (f64, f64),
    pub palette: Palette,
    pub motion: Vec<&'static str>,
    pub zoom_intensity: f64,
    pub speed: f64,
    pub voice: VoiceParams,
    pub content_tags: Vec<&'static str>,
    pub movement_words: &'static str,
    pub target: &'static str,
    pub tone: &'static str,
    pub pace: &'static str,
    pub narration_style: &'static str,
}

impl ProfileRow {
    fn validate(self) -> ReelResult<StateProfile> {
        let st = self.state;
        let arousal = Arousal::from_level(self.arousal_level).ok_or_else(|| {
            ReelError::invalid_profile(format!(
                "{st}: arousal level {} outside 0..={}",
                self.arousal_level,
                Arousal::MAX_LEVEL
            ))
        })?;

        let (min_s, max_s) = self.duration_s;
        if !(min_s.is_finite() && max_s.is_finite()) || min_s <= 0.0 || min_s > max_s {
            return Err(ReelError::invalid_profile(format!(
                "{st}: duration bounds ({min_s}, {max_s}) must satisfy 0 < min <= max"
            )));
        }
        if self.palette.name.trim().is_empty() {
            return Err(ReelError::invalid_profile(format!(
                "{st}: palette descriptor is empty"
            )));
        }
        if !(0.0..=1.0).contains(&self.palette.overlay) {
            return Err(ReelError::invalid_profile(format!(
                "{st}: overlay opacity must be within 0..1"
            )));
        }
        if self.motion.is_empty() {
            return Err(ReelError::invalid_profile(format!(
                "{st}: motion-pattern set is empty"
            )));
        }
        let mut motion = Vec::with_capacity(self.motion.len());
        for id in &self.motion {
            let id = id.trim();
            if id.is_empty() {
                return Err(ReelError::invalid_profile(format!(
                    "{st}: motion-pattern identifier is empty"
                )));
            }
            let pattern = MotionPattern::ALL
                .into_iter()
                .find(|p| p.id() == id)
                .ok_or_else(|| {
                    ReelError::invalid_profile(format!("{st}: unknown motion pattern '{id}'"))
                })?;
            motion.push(pattern);
        }
        if self.content_tags.is_empty() || self.content_tags.iter().any(|t| t.trim().is_empty()) {
            return Err(ReelError::invalid_profile(format!(
                "{st}: content tags must be non-empty"
            )));
        }
        if self.speed <= 0.0 || self.voice.speed <= 0.0 {
            return Err(ReelError::invalid_profile(format!(
                "{st}: speed multipliers must be > 0"
            )));
        }

        Ok(StateProfile {
            state: st,
            arousal,
            bounds: DurationBounds { min_s, max_s },
            palette: self.palette,
            motion,
            zoom_intensity: self.zoom_intensity,
            speed: self.speed,
            voice: self.voice,
            content_tags: self.content_tags.into_iter().map(str::to_string).collect(),
            movement_words: self.movement_words.to_string(),
            target: self.target.to_string(),
            tone: self.tone.to_string(),
            pace: self.pace.to_string(),
            narration_style: self.narration_style.to_string(),
        })
    }
}

/// Immutable state → profile lookup, built once at startup and shared by reference.
#[derive(Clone, Debug)]
pub struct ProfileRegistry {
    profiles: BTreeMap<PhysioState, StateProfile>,
}

impl ProfileRegistry {
    /// Validate the built-in table.
    pub fn builtin() -> ReelResult<Self> {
        Self::from_rows(builtin_rows())
    }

    pub fn from_rows(rows: Vec<ProfileRow>) -> ReelResult<Self> {
        let mut profiles = BTreeMap::new();
        for row in rows {
            let profile = row.validate()?;
            if profiles.insert(profile.state, profile).is_some() {
                return Err(ReelError::invalid_profile("duplicate state row in profile table"));
            }
        }
        for st in PhysioState::ALL {
            if !profiles.contains_key(&st) {
                return Err(ReelError::invalid_profile(format!(
                    "profile table has no row for '{st}'"
                )));
            }
        }
        Ok(Self { profiles })
    }

    /// Profile for a state; total because construction checked every state has a row.
    pub fn profile(&self, state: PhysioState) -> &StateProfile {
        &self.profiles[&state]
    }

    /// Profile for a raw label; labels outside the closed set are `UnknownState`.
    pub fn profile_for(&self, label: &str) -> ReelResult<&StateProfile> {
        let state: PhysioState = label.parse()?;
        Ok(self.profile(state))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateProfile> {
        self.profiles.values()
    }
}

fn voice(accent: &str, speed: f64, pitch: f64) -> VoiceParams {
    VoiceParams {
        accent: accent.to_string(),
        speed,
        pitch,
    }
}

#[allow(clippy::too_many_arguments)]
fn palette(
    name: &str,
    stops: [Rgb8; 2],
    accent: Rgb8,
    font: Rgb8,
    subtitle_bg: (Rgb8, u8),
    temperature_k: u32,
    saturation: f64,
    contrast: f64,
    overlay: f64,
) -> Palette {
    Palette {
        name: name.to_string(),
        stops,
        accent,
        font,
        subtitle_bg: subtitle_bg.0,
        subtitle_bg_alpha: subtitle_bg.1,
        temperature_k,
        saturation,
        contrast,
        overlay,
    }
}

pub fn builtin_rows() -> Vec<ProfileRow> {
    vec![
        ProfileRow {
            state: PhysioState::Calm,
            arousal_level: 0,
            duration_s: (30.0, 60.0),
            palette: palette(
                "cool, desaturated, soft",
                [Rgb8::new(135, 195, 215), Rgb8::new(60, 110, 160)],
                Rgb8::new(100, 200, 230),
                Rgb8::new(0xe8, 0xf4, 0xf8),
                (Rgb8::new(20, 40, 60), 150),
                7500,
                0.85,
                0.95,
                0.30,
            ),
            motion: vec!["gentle_drift", "slow_fade", "classic_ken_burns"],
            zoom_intensity: 0.018,
            speed: 0.8,
            voice: voice("co.uk", 0.85, -1.0),
            content_tags: vec!["nature", "asmr", "mindfulness", "ambient_music"],
            movement_words: "slow motion gentle peaceful",
            target: "maintain calm, deepen relaxation",
            tone: "slow, soothing, meditative",
            pace: "slow cuts, lingering shots",
            narration_style: "gentle, unhurried, soft voice",
        },
        ProfileRow {
            state: PhysioState::Focus,
            arousal_level: 2,
            duration_s: (30.0, 55.0),
            palette: palette(
                "neutral, high contrast text, clean",
                [Rgb8::new(220, 220, 220), Rgb8::new(80, 80, 100)],
                Rgb8::new(180, 180, 220),
                Rgb8::new(0xf0, 0xf0, 0xf0),
                (Rgb8::new(30, 30, 30), 160),
                6500,
                1.0,
                1.1,
                0.20,
            ),
            motion: vec!["steady_zoom", "classic_ken_burns"],
            zoom_intensity: 0.010,
            speed: 1.0,
            voice: voice("com", 1.0, 0.0),
            content_tags: vec!["lofi_study", "productivity", "minimalist", "explainer"],
            movement_words: "steady minimal clean",
            target: "maintain focus, reduce distractions",
            tone: "clean, clear, purposeful",
            pace: "steady rhythm, minimal motion",
            narration_style: "clear, measured, informative",
        },
        ProfileRow {
            state: PhysioState::Energized,
            arousal_level: 4,
            duration_s: (15.0, 45.0),
            palette: palette(
                "warm, saturated, vibrant",
                [Rgb8::new(255, 160, 50), Rgb8::new(200, 50, 30)],
                Rgb8::new(255, 140, 40),
                Rgb8::WHITE,
                (Rgb8::new(180, 60, 20), 170),
                5200,
                1.3,
                1.1,
                0.18,
            ),
            motion: vec!["dynamic_movement", "classic_ken_burns", "steady_zoom"],
            zoom_intensity: 0.055,
            speed: 1.2,
            voice: voice("com.au", 1.1, 0.0),
            content_tags: vec!["motivational", "fitness", "upbeat_music", "highlights"],
            movement_words: "dynamic motion active",
            target: "sustain energy, boost motivation",
            tone: "dynamic, punchy, inspiring",
            pace: "fast cuts, high motion",
            narration_style: "upbeat, confident, energetic",
        },
        ProfileRow {
            state: PhysioState::PreSleep,
            arousal_level: 0,
            duration_s: (45.0, 60.0),
            palette: palette(
                "very dark, warm amber, deep blue",
                [Rgb8::new(150, 100, 45), Rgb8::new(15, 25, 60)],
                Rgb8::new(180, 140, 80),
                Rgb8::new(0xc8, 0xb8, 0xa2),
                (Rgb8::new(10, 10, 25), 180),
                4500,
                0.8,
                0.9,
                0.50,
            ),
            motion: vec!["slow_fade"],
            zoom_intensity: 0.008,
            speed: 0.6,
            voice: voice("co.uk", 0.8, -2.0),
            content_tags: vec!["sleep_story", "breathing_guide", "gentle_nature", "white_noise"],
            movement_words: "very slow dreamy soft",
            target: "reduce arousal, prepare for sleep",
            tone: "whispered, dreamy, ultra-slow",
            pace: "very slow dissolves, static shots",
            narration_style: "whispered, minimal, sleep-cue language",
        },
        ProfileRow {
            state: PhysioState::Stressed,
            arousal_level: 1,
            duration_s: (30.0, 60.0),
            palette: palette(
                "warm greens and blues, soft",
                [Rgb8::new(120, 170, 90), Rgb8::new(60, 110, 160)],
                Rgb8::new(100, 200, 120),
                Rgb8::new(0xd8, 0xee, 0xd8),
                (Rgb8::new(20, 50, 20), 150),
                6000,
                0.95,
                0.95,
                0.28,
            ),
            motion: vec!["calming_sway", "gentle_drift"],
            zoom_intensity: 0.015,
            speed: 0.9,
            voice: voice("co.uk", 0.9, -0.5),
            content_tags: vec!["nature", "humor_light", "breathing_guide", "calming_music"],
            movement_words: "calming soothing",
            target: "reduce stress, lower arousal",
            tone: "warm, reassuring, grounding",
            pace: "gentle, unhurried",
            narration_style: "empathetic, grounding, calm",
        },
        ProfileRow {
            state: PhysioState::Neutral,
            arousal_level: 3,
            duration_s: (20.0, 50.0),
            palette: palette(
                "balanced",
                [Rgb8::new(160, 160, 160), Rgb8::new(80, 80, 80)],
                Rgb8::new(180, 180, 180),
                Rgb8::new(0xf5, 0xf5, 0xf5),
                (Rgb8::new(40, 40, 40), 150),
                6500,
                1.0,
                1.0,
                0.22,
            ),
            motion: vec!["classic_ken_burns", "steady_zoom"],
            zoom_intensity: 0.020,
            speed: 1.0,
            voice: voice("com", 1.0, 0.0),
            content_tags: vec!["news_explainer", "trivia", "lofi_study", "ambient_music"],
            movement_words: "natural",
            target: "engage lightly without arousal shift",
            tone: "neutral, informative",
            pace: "moderate",
            narration_style: "clear, neutral",
        },
    ]
}

#[cfg(test)]
#[path = "../tests/unit/state.rs"]
mod tests;
