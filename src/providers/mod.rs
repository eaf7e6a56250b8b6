//! Stock-media providers: the fallible, networked links of the resolution chain.

use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::{asset::Asset, asset::AssetTier, planner::Scene, state::StateProfile};

mod http;
pub mod pexels;
pub mod pixabay;
pub mod unsplash;

pub use pexels::PexelsVideos;
pub use pixabay::PixabayVideos;
pub use unsplash::UnsplashImages;

/// Why a provider produced no usable asset. Contained by the resolution chain; a tier that
/// reports any of these is exhausted for the scene and the chain moves on.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum ProviderError {
    #[error("provider call timed out")]
    Timeout,

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("rate limited")]
    RateLimited,

    #[error("no match for '{0}'")]
    NoMatch(String),

    #[error("asset too short: {available_s:.1}s available, {required_s:.1}s required")]
    AssetDurationInsufficient { available_s: f64, required_s: f64 },

    #[error("content mismatch: {0}")]
    ContentMismatch(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("cancelled")]
    Cancelled,
}

impl ProviderError {
    /// Worth another attempt against the same provider.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::RateLimited => "rate_limited",
            Self::NoMatch(_) => "no_match",
            Self::AssetDurationInsufficient { .. } => "duration_insufficient",
            Self::ContentMismatch(_) => "content_mismatch",
            Self::Malformed(_) => "malformed",
            Self::Network(_) => "network",
            Self::NotConfigured(_) => "not_configured",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One search against one provider for one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub min_duration_s: f64,
    pub content_tags: Vec<String>,
    pub scene_index: usize,
    /// Run-scoped temp directory downloads land in.
    pub download_dir: PathBuf,
}

impl SearchRequest {
    pub fn new(scene: &Scene, profile: &StateProfile, tier: AssetTier, download_dir: PathBuf) -> Self {
        Self {
            query: build_query(scene, profile, tier),
            min_duration_s: scene.target_s,
            content_tags: profile.content_tags.clone(),
            scene_index: scene.index,
            download_dir,
        }
    }

    /// Destination for a download from `provider`, unique per scene and provider.
    pub fn download_path(&self, provider: &str, ext: &str) -> PathBuf {
        self.download_dir
            .join(format!("scene{:03}_{provider}.{ext}", self.scene_index))
    }
}

/// A source of stock media.
///
/// Implementations do the search and the download; duration and content checks are applied by
/// the chain so every provider is held to the same rules.
pub trait AssetProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Unconfigured providers are skipped without spending budget.
    fn is_configured(&self) -> bool {
        true
    }

    fn search<'a>(&'a self, req: &'a SearchRequest) -> BoxFuture<'a, Result<Asset, ProviderError>>;
}

/// Query text: the visual prompt's leading clause, movement words for video tiers, then the
/// state's lead content category.
pub fn build_query(scene: &Scene, profile: &StateProfile, tier: AssetTier) -> String {
    let subject = scene
        .visual_prompt
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(scene.title.as_str());
    let category = profile.primary_category().replace('_', " ");
    let mut parts = vec![subject.to_string()];
    if tier.is_video() && !profile.movement_words.trim().is_empty() {
        parts.push(profile.movement_words.trim().to_string());
    }
    parts.push(category);
    parts.join(" ")
}

const STOPWORDS: &[&str] = &["the", "and", "with", "for", "from", "into", "over"];

/// Lowercase word tokens of at least three letters, minus filler words.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

/// Basic category check: some asset tag shares a word with the query or the state's tags.
pub fn tags_match(asset_tags: &[String], req: &SearchRequest) -> bool {
    let wanted: std::collections::BTreeSet<String> = tokens(&req.query)
        .chain(req.content_tags.iter().flat_map(|t| tokens(t)))
        .collect();
    asset_tags
        .iter()
        .flat_map(|t| tokens(t))
        .any(|t| wanted.contains(&t))
}

#[cfg(test)]
#[path = "../../tests/unit/providers/mod.rs"]
mod tests;
