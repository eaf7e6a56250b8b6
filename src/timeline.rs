use std::path::PathBuf;

use crate::{
    asset::{Asset, AssetTier},
    card::{CARD_SECS, Card, TitleCards},
    foundation::{
        core::{FrameIndex, FrameRange, Fps, Resolution},
        error::{ReelError, ReelResult},
    },
    grade::ColorGrade,
    motion::MotionTransform,
    narration::Narration,
    planner::rescale_to_bounds,
    resolve::ResolvedScene,
    state::{DurationBounds, PhysioState, StateProfile},
    subtitles::SubtitleStyle,
    transitions::{self, Transition},
};

/// How a segment's source covers the segment's duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Clip is long enough; play from the start and stop at the segment end.
    Trim,
    /// Clip is too short at the applied speed; loop it.
    Loop,
    /// Still image held for the whole segment.
    Hold,
    /// Procedural gradient rendered at the needed length.
    Render,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NarrationCue {
    pub path: Option<PathBuf>,
    pub duration_s: f64,
    pub pitch_semitones: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleCue {
    pub lines: Vec<String>,
    pub title: String,
    /// Seconds the scene title stays up from the segment start.
    pub title_s: f64,
}

/// One finalized scene segment on the output timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub index: usize,
    pub range: FrameRange,
    pub start_s: f64,
    pub duration_s: f64,
    pub asset: Asset,
    pub tier: AssetTier,
    pub fill: FillMode,
    /// Playback speed applied to the source; 1.0 for stills and gradients.
    pub speed: f64,
    pub motion: MotionTransform,
    pub grade: ColorGrade,
    pub fade_in_frames: u64,
    pub fade_out_frames: u64,
    pub subtitle: SubtitleCue,
    pub narration: NarrationCue,
}

/// A title or outro card placed on the output timeline. Always silent.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CardSegment {
    pub card: Card,
    pub range: FrameRange,
    pub start_s: f64,
    pub duration_s: f64,
    pub fade_in_frames: u64,
    pub fade_out_frames: u64,
}

/// The complete, ordered description handed to the encoder.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderPlan {
    pub state: PhysioState,
    pub fps: Fps,
    pub resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<CardSegment>,
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<CardSegment>,
    pub transitions: Vec<Transition>,
    pub subtitle_style: SubtitleStyle,
    pub total_frames: u64,
}

impl RenderPlan {
    pub fn total_s(&self) -> f64 {
        self.fps.frames_to_secs(self.total_frames)
    }

    /// Ranges in playback order: intro card, scenes, outro card.
    pub fn ranges(&self) -> impl Iterator<Item = FrameRange> + '_ {
        self.intro
            .iter()
            .map(|c| c.range)
            .chain(self.segments.iter().map(|s| s.range))
            .chain(self.outro.iter().map(|c| c.range))
    }

    /// Every range starts where the previous one ended, and the last ends at the total.
    pub fn is_contiguous(&self) -> bool {
        let mut cursor = 0u64;
        for range in self.ranges() {
            if range.start.0 != cursor {
                return false;
            }
            cursor = range.end.0;
        }
        cursor == self.total_frames
    }
}

/// Frame-exact total window for `profile` at `fps`.
pub fn bound_frames(profile: &StateProfile, fps: Fps) -> (u64, u64) {
    let lo = fps.secs_to_frames_ceil(profile.bounds.min_s);
    let hi = fps.secs_to_frames_floor(profile.bounds.max_s).max(lo);
    (lo, hi)
}

/// Frames each card takes at `fps`: its nominal length, shrunk so the pair never takes more
/// than a fifth of the upper bound.
pub fn card_frames(profile: &StateProfile, fps: Fps) -> u64 {
    let (_, hi) = bound_frames(profile, fps);
    fps.secs_to_frames_round(CARD_SECS).min(hi / 10)
}

/// Frame window left for scenes once the cards, if any, are placed.
pub fn scene_window(profile: &StateProfile, fps: Fps, with_cards: bool) -> (u64, u64) {
    let (lo, hi) = bound_frames(profile, fps);
    let reserved = if with_cards { 2 * card_frames(profile, fps) } else { 0 };
    (lo.saturating_sub(reserved), hi - reserved)
}

/// Reject plans with more scenes than the window has frames, since every scene keeps at least
/// one frame and the total could not be held under the upper bound.
pub fn check_capacity(
    scenes: usize,
    profile: &StateProfile,
    fps: Fps,
    with_cards: bool,
) -> ReelResult<()> {
    let (_, hi) = scene_window(profile, fps, with_cards);
    if scenes as u64 > hi {
        return Err(ReelError::validation(format!(
            "{scenes} scenes do not fit in {hi} frames for state {}",
            profile.state
        )));
    }
    Ok(())
}

/// Quantize scene targets to frames and pin the total inside the bound window by adjusting
/// the tail. Every segment keeps at least one frame.
pub fn fit_frames(targets_s: &[f64], fps: Fps, (lo, hi): (u64, u64)) -> Vec<u64> {
    let mut frames: Vec<u64> = targets_s
        .iter()
        .map(|&s| fps.secs_to_frames_round(s).max(1))
        .collect();
    let sum: u64 = frames.iter().sum();
    if sum < lo {
        if let Some(last) = frames.last_mut() {
            *last += lo - sum;
        }
    } else if sum > hi {
        let mut excess = sum - hi;
        for f in frames.iter_mut().rev() {
            let take = excess.min(f.saturating_sub(1));
            *f -= take;
            excess -= take;
            if excess == 0 {
                break;
            }
        }
    }
    frames
}

/// Reconcile resolved scenes and narration into one contiguous render plan. Cards, when given,
/// open and close the video and count towards the state bounds.
#[tracing::instrument(skip_all, fields(state = %profile.state, scenes = resolved.len()))]
pub fn assemble(
    resolved: &[ResolvedScene],
    narration: &[Narration],
    profile: &StateProfile,
    fps: Fps,
    resolution: Resolution,
    cards: Option<&TitleCards>,
) -> ReelResult<RenderPlan> {
    if resolved.is_empty() {
        return Err(ReelError::EmptyScript);
    }
    if narration.len() != resolved.len() {
        return Err(ReelError::validation(format!(
            "narration count {} does not match scene count {}",
            narration.len(),
            resolved.len()
        )));
    }

    check_capacity(resolved.len(), profile, fps, cards.is_some())?;

    let window = scene_window(profile, fps, cards.is_some());
    let scene_bounds = DurationBounds {
        min_s: fps.frames_to_secs(window.0),
        max_s: fps.frames_to_secs(window.1),
    };
    let planned: Vec<f64> = resolved.iter().map(|r| r.scene.target_s).collect();
    let targets = rescale_to_bounds(&planned, scene_bounds);
    let lengths = fit_frames(&targets, fps, window);
    let raw: u64 = targets.iter().map(|&s| fps.secs_to_frames_round(s).max(1)).sum();
    let scene_frames: u64 = lengths.iter().sum();
    if raw != scene_frames {
        tracing::debug!(raw, scene_frames, "tail segment adjusted to restore bounds");
    }

    let wanted = transitions::pacing_frames(profile.arousal, fps);
    let trans: Vec<Transition> = lengths
        .windows(2)
        .enumerate()
        .map(|(i, w)| transitions::between(i, wanted, w[0], w[1]))
        .collect();

    let grade = ColorGrade::from_palette(&profile.palette);
    let style = SubtitleStyle::for_profile(profile, &grade, resolution);
    let n = resolved.len();
    let card_len = card_frames(profile, fps);
    let place_card = |card: &Card, start: u64| {
        let range = FrameRange::with_len(FrameIndex(start), card_len);
        CardSegment {
            card: card.clone(),
            range,
            start_s: fps.frames_to_secs(start),
            duration_s: fps.frames_to_secs(card_len),
            fade_in_frames: (wanted - wanted / 2).min(card_len - card_len / 2),
            fade_out_frames: (wanted / 2).min(card_len / 2),
        }
    };

    let intro = cards.map(|c| place_card(&c.intro, 0));
    let mut cursor = intro.as_ref().map_or(0, |c| c.range.end.0);
    let mut segments = Vec::with_capacity(n);
    for (i, (r, (&len, voice))) in resolved.iter().zip(lengths.iter().zip(narration)).enumerate() {
        let range = FrameRange::with_len(FrameIndex(cursor), len);
        cursor = range.end.0;
        let duration_s = fps.frames_to_secs(len);

        let fade_in_frames = match i {
            0 => (wanted - wanted / 2).min(len - len / 2),
            _ => trans[i - 1].in_frames(),
        };
        let fade_out_frames = if i + 1 == n {
            (wanted / 2).min(len / 2)
        } else {
            trans[i].out_frames()
        };

        let (fill, speed) = match &r.asset {
            Asset::VideoClip(c) => {
                let speed = profile.speed;
                let fill = if c.available_s < duration_s * speed {
                    FillMode::Loop
                } else {
                    FillMode::Trim
                };
                (fill, speed)
            }
            Asset::StaticImage(_) => (FillMode::Hold, 1.0),
            Asset::ProceduralGradient(_) => (FillMode::Render, 1.0),
        };

        segments.push(Segment {
            index: r.scene.index,
            range,
            start_s: fps.frames_to_secs(range.start.0),
            duration_s,
            asset: r.asset.clone(),
            tier: r.tier,
            fill,
            speed,
            motion: r.scene.motion.parameterize(profile.zoom_intensity, r.scene.index),
            grade,
            fade_in_frames,
            fade_out_frames,
            subtitle: SubtitleCue {
                lines: style.layout(&r.scene.narration),
                title: r.scene.title.clone(),
                title_s: (duration_s * 0.4).min(2.5),
            },
            narration: NarrationCue {
                path: voice.path.clone(),
                duration_s: voice.duration_s,
                pitch_semitones: profile.voice.pitch,
            },
        });
    }

    let outro = cards.map(|c| place_card(&c.outro, cursor));
    let total_frames = outro.as_ref().map_or(cursor, |c| c.range.end.0);

    let plan = RenderPlan {
        state: profile.state,
        fps,
        resolution,
        intro,
        segments,
        outro,
        transitions: trans,
        subtitle_style: style,
        total_frames,
    };
    tracing::info!(
        total_s = plan.total_s(),
        segments = n,
        cards = cards.is_some(),
        "timeline assembled"
    );
    Ok(plan)
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
