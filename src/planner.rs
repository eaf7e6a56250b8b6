use crate::{
    foundation::error::{ReelError, ReelResult},
    motion::MotionPattern,
    script::ScriptEntry,
    state::{DurationBounds, StateProfile},
};

/// Fixed narration speaking rate used for estimates (150 words per minute).
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Floor for a single scene's estimate so wordless entries still get screen time.
pub const MIN_SCENE_SECS: f64 = 1.0;

/// One planned scene. Timing fields are final once produced; later stages derive new values
/// instead of editing these.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub index: usize,
    pub title: String,
    pub narration: String,
    pub visual_prompt: String,
    pub mood: String,
    pub target_s: f64,
    pub motion: MotionPattern,
}

pub fn estimate_secs(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    (words / WORDS_PER_SECOND).max(MIN_SCENE_SECS)
}

/// Proportionally rescale `durations` so their sum lands exactly on the nearest bound when it
/// falls outside `bounds`. Sums already inside are returned unchanged.
pub fn rescale_to_bounds(durations: &[f64], bounds: DurationBounds) -> Vec<f64> {
    let sum: f64 = durations.iter().sum();
    if durations.is_empty() || bounds.contains(sum) {
        return durations.to_vec();
    }
    let target = bounds.clamp(sum);
    let k = target / sum;
    let mut out: Vec<f64> = durations.iter().map(|d| d * k).collect();
    // Absorb float drift in the last entry so the sum is the bound itself.
    let head: f64 = out[..out.len() - 1].iter().sum();
    if let Some(last) = out.last_mut() {
        *last = target - head;
    }
    out
}

/// Turn script entries into an ordered scene list for `profile`.
#[tracing::instrument(skip(entries, profile), fields(state = %profile.state, entries = entries.len()))]
pub fn plan_scenes(entries: &[ScriptEntry], profile: &StateProfile) -> ReelResult<Vec<Scene>> {
    if entries.is_empty() {
        return Err(ReelError::EmptyScript);
    }

    let estimates: Vec<f64> = entries.iter().map(|e| estimate_secs(&e.narration)).collect();
    let raw_sum: f64 = estimates.iter().sum();
    let durations = rescale_to_bounds(&estimates, profile.bounds);
    if !profile.bounds.contains(raw_sum) {
        tracing::info!(
            raw_sum,
            min_s = profile.bounds.min_s,
            max_s = profile.bounds.max_s,
            "rescaled scene estimates into state bounds"
        );
    }

    Ok(entries
        .iter()
        .zip(durations)
        .enumerate()
        .map(|(index, (entry, target_s))| Scene {
            index,
            title: entry.title.clone(),
            narration: entry.narration.clone(),
            visual_prompt: entry.visual_prompt.clone(),
            mood: entry.mood.clone(),
            target_s,
            motion: profile.motion_for(index),
        })
        .collect())
}

/// Fold synthesized narration lengths back into the plan.
///
/// Each scene becomes at least as long as its narration, then the whole plan is re-clamped to
/// the profile bounds with the same proportional rule as [`plan_scenes`].
pub fn reconcile_narration(
    scenes: &[Scene],
    narration_s: &[f64],
    profile: &StateProfile,
) -> ReelResult<Vec<Scene>> {
    if scenes.len() != narration_s.len() {
        return Err(ReelError::validation(format!(
            "narration count {} does not match scene count {}",
            narration_s.len(),
            scenes.len()
        )));
    }
    let wanted: Vec<f64> = scenes
        .iter()
        .zip(narration_s)
        .map(|(s, &n)| if n.is_finite() { s.target_s.max(n) } else { s.target_s })
        .collect();
    let durations = rescale_to_bounds(&wanted, profile.bounds);
    Ok(scenes
        .iter()
        .zip(durations)
        .map(|(s, target_s)| Scene {
            target_s,
            ..s.clone()
        })
        .collect())
}

#[cfg(test)]
#[path = "../tests/unit/planner.rs"]
mod tests;
