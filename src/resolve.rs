use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use crate::{
    asset::{Asset, AssetTier},
    cancel::CancelToken,
    config::ProviderSettings,
    gradient::GradientGenerator,
    planner::Scene,
    providers::{AssetProvider, ProviderError, SearchRequest, tags_match},
    state::StateProfile,
};

/// Request budget shared by every scene resolving against one provider.
#[derive(Clone, Debug)]
pub struct RateBudget {
    permits: Arc<Semaphore>,
    min_interval: Duration,
    last_start: Arc<Mutex<Option<Instant>>>,
}

impl RateBudget {
    pub fn new(permits: usize, min_interval: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(permits.max(1))),
            min_interval,
            last_start: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(
            settings.permits_per_provider,
            Duration::from_millis(settings.min_interval_ms),
        )
    }

    /// Run `fut` holding one permit, starting no sooner than `min_interval` after the
    /// previous call through this budget.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ProviderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderError::Network("request budget closed".to_string()))?;
        {
            let mut last = self.last_start.lock().await;
            if let Some(prev) = *last {
                tokio::time::sleep_until(prev + self.min_interval).await;
            }
            *last = Some(Instant::now());
        }
        Ok(fut.await)
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Retry and timeout policy applied to every networked tier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainPolicy {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl ChainPolicy {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            attempt_timeout: settings.attempt_timeout(),
            max_attempts: settings.max_attempts.max(1),
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

/// Outcome of one tier for one scene, as recorded in the manifest.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TierAttempt {
    pub tier: AssetTier,
    pub provider: String,
    pub tries: u32,
    /// `"ok"` or a [`ProviderError::kind`].
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A planned scene with its asset attached. Produced once per scene by the chain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedScene {
    pub scene: Scene,
    pub asset: Asset,
    pub tier: AssetTier,
    pub attempts: Vec<TierAttempt>,
}

struct ProviderSlot {
    tier: AssetTier,
    provider: Box<dyn AssetProvider>,
    budget: RateBudget,
}

/// Ordered provider chain ending in the gradient generator, which cannot fail.
pub struct ResolutionChain {
    slots: Vec<ProviderSlot>,
    terminal: GradientGenerator,
    policy: ChainPolicy,
}

impl ResolutionChain {
    pub fn new(terminal: GradientGenerator, policy: ChainPolicy) -> Self {
        Self {
            slots: Vec::new(),
            terminal,
            policy,
        }
    }

    /// Append a fallible tier. Tiers are tried in the order they are added.
    pub fn with_tier(
        mut self,
        tier: AssetTier,
        provider: Box<dyn AssetProvider>,
        budget: RateBudget,
    ) -> Self {
        self.slots.push(ProviderSlot {
            tier,
            provider,
            budget,
        });
        self
    }

    pub fn tiers(&self) -> Vec<(AssetTier, &str)> {
        self.slots
            .iter()
            .map(|s| (s.tier, s.provider.name()))
            .chain(std::iter::once((AssetTier::Gradient, "gradient")))
            .collect()
    }

    /// Resolve one scene. Total: falls back to a gradient whatever the providers do.
    #[tracing::instrument(skip_all, fields(scene = scene.index))]
    pub async fn resolve(
        &self,
        scene: &Scene,
        profile: &StateProfile,
        download_dir: &Path,
        cancel: &CancelToken,
    ) -> ResolvedScene {
        let mut attempts = Vec::with_capacity(self.slots.len() + 1);
        for slot in &self.slots {
            let req = SearchRequest::new(scene, profile, slot.tier, download_dir.to_path_buf());
            let (result, tries) = self.try_slot(slot, &req, cancel).await;
            match result {
                Ok(asset) => {
                    attempts.push(TierAttempt {
                        tier: slot.tier,
                        provider: slot.provider.name().to_string(),
                        tries,
                        outcome: "ok".to_string(),
                        detail: None,
                    });
                    tracing::info!(tier = %slot.tier, provider = slot.provider.name(), "asset resolved");
                    return ResolvedScene {
                        scene: scene.clone(),
                        asset,
                        tier: slot.tier,
                        attempts,
                    };
                }
                Err(e) => {
                    tracing::debug!(tier = %slot.tier, provider = slot.provider.name(), error = %e, "tier exhausted");
                    attempts.push(TierAttempt {
                        tier: slot.tier,
                        provider: slot.provider.name().to_string(),
                        tries,
                        outcome: e.kind().to_string(),
                        detail: Some(e.to_string()),
                    });
                }
            }
        }

        let gradient = self.terminal.generate(&profile.palette, scene.index);
        attempts.push(TierAttempt {
            tier: AssetTier::Gradient,
            provider: "gradient".to_string(),
            tries: 1,
            outcome: "ok".to_string(),
            detail: None,
        });
        tracing::info!(tier = %AssetTier::Gradient, seed = gradient.seed, "asset resolved");
        ResolvedScene {
            scene: scene.clone(),
            asset: Asset::ProceduralGradient(gradient),
            tier: AssetTier::Gradient,
            attempts,
        }
    }

    async fn try_slot(
        &self,
        slot: &ProviderSlot,
        req: &SearchRequest,
        cancel: &CancelToken,
    ) -> (Result<Asset, ProviderError>, u32) {
        if !slot.provider.is_configured() {
            return (
                Err(ProviderError::NotConfigured(slot.provider.name().to_string())),
                0,
            );
        }
        let mut tries = 0;
        loop {
            if cancel.is_cancelled() {
                return (Err(ProviderError::Cancelled), tries);
            }
            tries += 1;
            let call = slot
                .budget
                .run(tokio::time::timeout(self.policy.attempt_timeout, slot.provider.search(req)));
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                r = call => match r {
                    Ok(Ok(inner)) => inner,
                    Ok(Err(_elapsed)) => Err(ProviderError::Timeout),
                    Err(e) => Err(e),
                },
            };
            match outcome {
                Ok(asset) => return (accept(asset, req).await, tries),
                Err(e) if e.is_transient() && tries < self.policy.max_attempts => {
                    tracing::debug!(provider = slot.provider.name(), tries, error = %e, "retrying");
                    let backoff = self.policy.retry_backoff * tries;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return (Err(ProviderError::Cancelled), tries),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => return (Err(e), tries),
            }
        }
    }

    /// Resolve every scene on at most `workers` concurrent chains. Output keeps scene order
    /// and is only returned once every scene has an asset.
    pub async fn resolve_all(
        &self,
        scenes: &[Scene],
        profile: &StateProfile,
        download_dir: &Path,
        workers: usize,
        cancel: &CancelToken,
    ) -> Vec<ResolvedScene> {
        futures::stream::iter(scenes)
            .map(|scene| self.resolve(scene, profile, download_dir, cancel))
            .buffered(workers.max(1))
            .collect()
            .await
    }
}

/// Duration and content checks shared by every networked tier. A rejected download is removed.
async fn accept(asset: Asset, req: &SearchRequest) -> Result<Asset, ProviderError> {
    let verdict = if asset.available_s() < req.min_duration_s {
        Err(ProviderError::AssetDurationInsufficient {
            available_s: asset.available_s(),
            required_s: req.min_duration_s,
        })
    } else if !tags_match(asset.tags(), req) {
        Err(ProviderError::ContentMismatch(format!(
            "tags {:?} share nothing with '{}'",
            asset.tags(),
            req.query
        )))
    } else {
        Ok(())
    };
    if verdict.is_err()
        && let Some(path) = asset.media_path()
    {
        let _ = tokio::fs::remove_file(path).await;
    }
    verdict.map(|()| asset)
}

/// Per-run download directory, removed when dropped on every exit path.
pub fn run_temp_dir(parent: Option<&Path>) -> crate::ReelResult<tempfile::TempDir> {
    use anyhow::Context as _;
    let mut builder = tempfile::Builder::new();
    builder.prefix("statereel-");
    let dir = match parent {
        Some(p) => {
            std::fs::create_dir_all(p)
                .with_context(|| format!("create temp parent '{}'", p.display()))?;
            builder.tempdir_in(p)
        }
        None => builder.tempdir(),
    }
    .context("create run temp directory")?;
    Ok(dir)
}

#[cfg(test)]
#[path = "../tests/unit/resolve.rs"]
mod tests;
