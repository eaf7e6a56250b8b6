use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{
    asset::AssetTier,
    cancel::CancelToken,
    card::TitleCards,
    config::PipelineConfig,
    encode_ffmpeg::{Encoder, FfmpegEncoder},
    finalize::{OutputNames, finalize, new_run_id},
    foundation::error::{ReelError, ReelResult},
    gradient::GradientGenerator,
    manifest::Manifest,
    narration::{CommandTts, NarrationEngine, SilentNarration, narrate_scenes},
    planner::{Scene, plan_scenes, reconcile_narration},
    providers::{pexels::PexelsVideos, pixabay::PixabayVideos, unsplash::UnsplashImages},
    resolve::{ChainPolicy, RateBudget, ResolutionChain, run_temp_dir},
    script::{
        CommandScriptSource, FallbackScript, FileScriptSource, Script, ScriptBrief, ScriptSource,
        write_script_json,
    },
    state::{PhysioState, ProfileRegistry},
    timeline::{assemble, check_capacity},
};

/// What a successful run leaves behind.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub elapsed: Duration,
}

/// Script plus scene plan, without narration, assets or encoding.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PlannedRun {
    pub script: Script,
    pub scenes: Vec<Scene>,
    pub total_s: f64,
}

/// Orchestrates one topic/state pair end to end.
pub struct Pipeline {
    config: PipelineConfig,
    registry: ProfileRegistry,
    script_source: Arc<dyn ScriptSource>,
    script_fallback: bool,
    narrator: Arc<dyn NarrationEngine>,
    encoder: Arc<dyn Encoder>,
    chain: ResolutionChain,
}

impl Pipeline {
    /// Offline defaults: fallback script, silent narration, ffmpeg encoder.
    pub fn new(config: PipelineConfig, registry: ProfileRegistry, chain: ResolutionChain) -> Self {
        Self {
            config,
            registry,
            script_source: Arc::new(FallbackScript),
            script_fallback: true,
            narrator: Arc::new(SilentNarration),
            encoder: Arc::new(FfmpegEncoder::default()),
            chain,
        }
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(config: PipelineConfig) -> ReelResult<Self> {
        config.validate()?;
        let registry = ProfileRegistry::builtin()?;
        let chain = build_chain(&config)?;

        let mut pipeline = Self::new(config, registry, chain);
        if let Some([program, args @ ..]) = pipeline.config.script_command.as_deref() {
            pipeline.script_source = Arc::new(CommandScriptSource {
                program: program.clone(),
                args: args.to_vec(),
            });
        }
        let n = &pipeline.config.narration;
        if n.enabled {
            pipeline.narrator = Arc::new(CommandTts::new(n.tts_command.clone(), n.lang.clone()));
        }
        Ok(pipeline)
    }

    /// Use `source` for scripts; a failing source falls back to the offline script.
    pub fn with_script_source(mut self, source: Arc<dyn ScriptSource>) -> Self {
        self.script_source = source;
        self.script_fallback = true;
        self
    }

    /// Use a script file as-is. Its failures are fatal instead of falling back.
    pub fn with_script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_source = Arc::new(FileScriptSource { path: path.into() });
        self.script_fallback = false;
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrationEngine>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn chain(&self) -> &ResolutionChain {
        &self.chain
    }

    /// Script and timed scene plan only. No narration, network or encoding.
    pub fn plan(&self, topic: &str, state: PhysioState) -> ReelResult<PlannedRun> {
        let profile = self.registry.profile(state);
        let brief = ScriptBrief::new(topic, profile);
        let script = choose_script(self.script_source.as_ref(), self.script_fallback, &brief)?;
        let scenes = plan_scenes(&script.entries, profile)?;
        check_capacity(
            scenes.len(),
            profile,
            self.config.frame_rate()?,
            self.config.title_cards,
        )?;
        let total_s = scenes.iter().map(|s| s.target_s).sum();
        Ok(PlannedRun {
            script,
            scenes,
            total_s,
        })
    }

    /// Produce one video and its manifest.
    ///
    /// Asset resolution is total, so the fatal outcomes are an empty script, a cancelled run and
    /// an encoder failure. The per-run temp directory is removed on every path.
    #[tracing::instrument(skip(self, cancel), fields(run_id = tracing::field::Empty))]
    pub async fn run(
        &self,
        topic: &str,
        state: PhysioState,
        cancel: &CancelToken,
    ) -> ReelResult<RunReport> {
        let started = Instant::now();
        let run_id = new_run_id();
        tracing::Span::current().record("run_id", run_id.as_str());
        let profile = self.registry.profile(state);
        let fps = self.config.frame_rate()?;
        let resolution = self.config.resolution();
        resolution.validate_even()?;

        let brief = ScriptBrief::new(topic, profile);
        let source = Arc::clone(&self.script_source);
        let fallback = self.script_fallback;
        let script = blocking("script", move || {
            choose_script(source.as_ref(), fallback, &brief)
        })
        .await?;

        let scenes = plan_scenes(&script.entries, profile)?;
        let cards = self
            .config
            .title_cards
            .then(|| TitleCards::for_script(&script, profile));
        check_capacity(scenes.len(), profile, fps, cards.is_some())?;
        ensure_live(cancel)?;

        let temp = run_temp_dir(self.config.temp_parent.as_deref())?;
        let narration = {
            let engine = Arc::clone(&self.narrator);
            let scenes = scenes.clone();
            let voice = profile.voice.clone();
            let dir = temp.path().to_path_buf();
            blocking("narration", move || {
                Ok(narrate_scenes(engine.as_ref(), &scenes, &voice, &dir))
            })
            .await?
        };
        let spoken: Vec<f64> = narration.iter().map(|n| n.duration_s).collect();
        let scenes = reconcile_narration(&scenes, &spoken, profile)?;
        ensure_live(cancel)?;

        let resolved = self
            .chain
            .resolve_all(&scenes, profile, temp.path(), self.config.workers, cancel)
            .await;
        ensure_live(cancel)?;

        let plan = assemble(&resolved, &narration, profile, fps, resolution, cards.as_ref())?;
        let manifest = Manifest::from_plan(&run_id, &script, profile.bounds, &plan, &resolved);
        log_tiers(&manifest);

        let names = OutputNames::new(
            &self.config.output_dir,
            &run_id,
            topic,
            self.config.enhanced,
            &self.config.container_ext,
        );
        let script_path = names.script.clone();
        let encoder = Arc::clone(&self.encoder);
        let work_dir = temp.path().to_path_buf();
        let done = blocking("encode", move || {
            finalize(encoder.as_ref(), &plan, manifest, &work_dir, &names)
        })
        .await?;
        drop(temp);

        if self.config.keep_script_json
            && let Err(e) = write_script_json(&script, &script_path)
        {
            tracing::warn!(path = %script_path.display(), error = %e, "could not keep script JSON");
        }

        let elapsed = started.elapsed();
        tracing::info!(
            output = %done.output_path.display(),
            total_s = done.manifest.total_duration_s,
            elapsed_ms = elapsed.as_millis() as u64,
            "run complete"
        );
        Ok(RunReport {
            output_path: done.output_path,
            manifest_path: done.manifest_path,
            manifest: done.manifest,
            elapsed,
        })
    }

    /// Run jobs in order. A failed entry is reported and the batch moves on; cancellation stops
    /// the batch after the entry in flight.
    pub async fn run_batch(&self, jobs: &[BatchJob], cancel: &CancelToken) -> Vec<BatchOutcome> {
        let mut out = Vec::with_capacity(jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(remaining = jobs.len() - i, "batch cancelled");
                break;
            }
            tracing::info!(entry = i + 1, of = jobs.len(), topic = %job.topic, state = %job.state, "batch entry");
            let result = match self.registry.profile_for(&job.state) {
                Ok(profile) => self.run(&job.topic, profile.state, cancel).await,
                Err(e) => Err(e),
            };
            out.push(match result {
                Ok(report) => BatchOutcome::Ok(report),
                Err(e) => {
                    tracing::error!(topic = %job.topic, stage = e.stage(), error = %e, "batch entry failed");
                    BatchOutcome::Failed {
                        topic: job.topic.clone(),
                        state: job.state.clone(),
                        stage: e.stage(),
                        error: e.to_string(),
                    }
                }
            });
        }
        out
    }
}

/// Provider tiers in chain order, each with its own request budget.
pub fn build_chain(config: &PipelineConfig) -> ReelResult<ResolutionChain> {
    let p = &config.providers;
    Ok(ResolutionChain::new(
        GradientGenerator::new(config.resolution()),
        ChainPolicy::from_settings(p),
    )
    .with_tier(
        AssetTier::Primary,
        Box::new(PexelsVideos::new(p)?),
        RateBudget::from_settings(p),
    )
    .with_tier(
        AssetTier::Secondary,
        Box::new(PixabayVideos::new(p)?),
        RateBudget::from_settings(p),
    )
    .with_tier(
        AssetTier::Image,
        Box::new(UnsplashImages::new(p)?),
        RateBudget::from_settings(p),
    ))
}

/// Ask `source` for a script. With `fallback`, a failing or empty result is replaced by the
/// offline script; without it, the source's answer stands.
pub fn choose_script(
    source: &dyn ScriptSource,
    fallback: bool,
    brief: &ScriptBrief,
) -> ReelResult<Script> {
    match source.generate(brief) {
        Ok(script) if !script.entries.is_empty() || !fallback => Ok(script),
        Ok(_) => {
            tracing::warn!(topic = %brief.topic, "script source returned no scenes; using fallback script");
            Ok(FallbackScript.script(brief))
        }
        Err(e @ ReelError::Script(_)) if fallback => {
            tracing::warn!(topic = %brief.topic, error = %e, "script generation failed; using fallback script");
            Ok(FallbackScript.script(brief))
        }
        Err(e) => Err(e),
    }
}

fn ensure_live(cancel: &CancelToken) -> ReelResult<()> {
    if cancel.is_cancelled() {
        return Err(ReelError::Cancelled);
    }
    Ok(())
}

async fn blocking<T, F>(stage: &'static str, f: F) -> ReelResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ReelResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ReelError::Other(anyhow::anyhow!("{stage} task failed: {e}")))?
}

fn log_tiers(manifest: &Manifest) {
    let counts = manifest.tier_counts();
    let get = |t: AssetTier| counts.get(&t).copied().unwrap_or(0);
    tracing::info!(
        primary = get(AssetTier::Primary),
        secondary = get(AssetTier::Secondary),
        image = get(AssetTier::Image),
        gradient = get(AssetTier::Gradient),
        "assets resolved"
    );
}

/// One `{topic, state}` batch entry. The state stays a raw label so a bad one fails only its
/// own entry.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchJob {
    pub topic: String,
    pub state: String,
}

#[derive(Clone, Debug)]
pub enum BatchOutcome {
    Ok(RunReport),
    Failed {
        topic: String,
        state: String,
        stage: &'static str,
        error: String,
    },
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Parse a JSON array of `{"topic": .., "state": ..}` objects.
pub fn load_batch_file(path: &Path) -> ReelResult<Vec<BatchJob>> {
    use anyhow::Context as _;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read batch file '{}'", path.display()))?;
    let jobs: Vec<BatchJob> = serde_json::from_str(&raw)
        .map_err(|e| ReelError::validation(format!("batch file '{}': {e}", path.display())))?;
    Ok(jobs)
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
