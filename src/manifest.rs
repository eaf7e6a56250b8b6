use std::path::{Path, PathBuf};

use crate::{
    asset::AssetTier,
    foundation::{
        core::{Fps, Resolution},
        error::ReelResult,
    },
    motion::MotionPattern,
    resolve::{ResolvedScene, TierAttempt},
    script::Script,
    state::{DurationBounds, PhysioState},
    timeline::{FillMode, RenderPlan},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Failed,
}

/// Per-scene record: final timing and where the visual came from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneRecord {
    pub index: usize,
    pub title: String,
    pub narration: String,
    pub visual_prompt: String,
    pub motion: MotionPattern,
    pub start_s: f64,
    pub duration_s: f64,
    pub tier: AssetTier,
    pub asset_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_seed: Option<u64>,
    pub fill: FillMode,
    pub speed: f64,
    pub narration_s: f64,
    pub narration_audio: bool,
    pub attempts: Vec<TierAttempt>,
}

/// Write-once sidecar describing one run. Never read back by the pipeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub topic: String,
    pub state: PhysioState,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub resolution: Resolution,
    pub fps: Fps,
    pub bounds: DurationBounds,
    pub total_duration_s: f64,
    /// Seconds of the opening title card, when the run has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_s: Option<f64>,
    pub scenes: Vec<SceneRecord>,
    pub generator: String,
}

impl Manifest {
    pub fn from_plan(
        run_id: &str,
        script: &Script,
        bounds: DurationBounds,
        plan: &RenderPlan,
        resolved: &[ResolvedScene],
    ) -> Self {
        let scenes = plan
            .segments
            .iter()
            .zip(resolved)
            .map(|(seg, r)| {
                let prov = seg.asset.provenance();
                SceneRecord {
                    index: seg.index,
                    title: r.scene.title.clone(),
                    narration: r.scene.narration.clone(),
                    visual_prompt: r.scene.visual_prompt.clone(),
                    motion: r.scene.motion,
                    start_s: seg.start_s,
                    duration_s: seg.duration_s,
                    tier: seg.tier,
                    asset_kind: seg.asset.kind().to_string(),
                    provider: prov.map(|p| p.provider.clone()),
                    source_url: prov.map(|p| p.source_url.clone()),
                    gradient_seed: match &seg.asset {
                        crate::asset::Asset::ProceduralGradient(g) => Some(g.seed),
                        _ => None,
                    },
                    fill: seg.fill,
                    speed: seg.speed,
                    narration_s: seg.narration.duration_s,
                    narration_audio: seg.narration.path.is_some(),
                    attempts: r.attempts.clone(),
                }
            })
            .collect();
        Self {
            run_id: run_id.to_string(),
            status: RunStatus::Ok,
            error: None,
            topic: script.topic.clone(),
            state: plan.state,
            title: script.title.clone(),
            description: script.description.clone(),
            output: None,
            resolution: plan.resolution,
            fps: plan.fps,
            bounds,
            total_duration_s: plan.total_s(),
            intro_s: plan.intro.as_ref().map(|c| c.duration_s),
            outro_s: plan.outro.as_ref().map(|c| c.duration_s),
            scenes,
            generator: concat!("statereel ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    pub fn succeeded(mut self, output: &Path) -> Self {
        self.status = RunStatus::Ok;
        self.error = None;
        self.output = Some(output.to_path_buf());
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.output = None;
        self
    }

    pub fn tier_counts(&self) -> std::collections::BTreeMap<AssetTier, usize> {
        let mut out = std::collections::BTreeMap::new();
        for s in &self.scenes {
            *out.entry(s.tier).or_insert(0) += 1;
        }
        out
    }

    pub fn write(&self, path: &Path) -> ReelResult<()> {
        use anyhow::Context as _;
        use std::io::Write as _;
        crate::encode_ffmpeg::ensure_parent_dir(path)?;
        let f = std::fs::File::create(path)
            .with_context(|| format!("create manifest '{}'", path.display()))?;
        let mut w = std::io::BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()
            .with_context(|| format!("flush manifest '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/manifest.rs"]
mod tests;
