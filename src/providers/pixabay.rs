use std::time::Duration;

use futures::future::{BoxFuture, FutureExt as _};

use super::{AssetProvider, ProviderError, SearchRequest, http};
use crate::{
    ReelResult,
    asset::{Asset, ClipAsset, Provenance},
    config::ProviderSettings,
    foundation::core::Resolution,
};

const SEARCH_URL: &str = "https://pixabay.com/api/videos/";
/// Pixabay rejects longer `q` values.
const MAX_QUERY_CHARS: usize = 100;

/// Secondary tier: Pixabay video search.
pub struct PixabayVideos {
    client: reqwest::Client,
    api_key: Option<String>,
    download_timeout: Duration,
}

impl PixabayVideos {
    pub fn new(settings: &ProviderSettings) -> ReelResult<Self> {
        Ok(Self {
            client: http::client(settings.request_timeout())?,
            api_key: settings.pixabay_api_key.clone(),
            download_timeout: settings.download_timeout(),
        })
    }

    async fn fetch(&self, req: &SearchRequest) -> Result<Asset, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("pixabay".to_string()))?;
        let q: String = req.query.chars().take(MAX_QUERY_CHARS).collect();
        let min_duration = (req.min_duration_s.ceil().max(0.0) as u64).to_string();
        let resp: SearchResponse = http::get_json(self.client.get(SEARCH_URL).query(&[
            ("key", key),
            ("q", q.as_str()),
            ("video_type", "film"),
            ("per_page", "5"),
            ("min_duration", min_duration.as_str()),
        ]))
        .await?;

        let pick = pick(&resp, req.min_duration_s, &req.query)?;
        let dest = req.download_path("pixabay", "mp4");
        http::download(&self.client, &pick.url, self.download_timeout, &dest).await?;
        tracing::debug!(scene = req.scene_index, url = %pick.page_url, "pixabay clip downloaded");

        Ok(Asset::VideoClip(ClipAsset {
            path: dest,
            available_s: pick.duration_s,
            resolution: pick.resolution,
            tags: pick.tags,
            provenance: Provenance {
                provider: "pixabay".to_string(),
                source_url: pick.page_url,
                query: req.query.clone(),
            },
        }))
    }
}

impl AssetProvider for PixabayVideos {
    fn name(&self) -> &str {
        "pixabay"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn search<'a>(&'a self, req: &'a SearchRequest) -> BoxFuture<'a, Result<Asset, ProviderError>> {
        self.fetch(req).boxed()
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Hit {
    #[serde(default, rename = "pageURL")]
    pub page_url: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub videos: Renditions,
}

#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct Renditions {
    pub medium: Option<Rendition>,
    pub small: Option<Rendition>,
    pub tiny: Option<Rendition>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Rendition {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, PartialEq)]
pub(crate) struct Pick {
    pub url: String,
    pub page_url: String,
    pub duration_s: f64,
    pub resolution: Resolution,
    pub tags: Vec<String>,
}

/// First long-enough hit, preferring medium, then small, then tiny renditions.
pub(crate) fn pick(
    resp: &SearchResponse,
    min_duration_s: f64,
    query: &str,
) -> Result<Pick, ProviderError> {
    let mut longest_usable: Option<f64> = None;
    for hit in &resp.hits {
        let Some(r) = [&hit.videos.medium, &hit.videos.small, &hit.videos.tiny]
            .into_iter()
            .flatten()
            .find(|r| !r.url.is_empty())
        else {
            continue;
        };
        if hit.duration < min_duration_s {
            longest_usable = Some(longest_usable.unwrap_or(0.0).max(hit.duration));
            continue;
        }
        return Ok(Pick {
            url: r.url.clone(),
            page_url: hit.page_url.clone(),
            duration_s: hit.duration,
            resolution: Resolution {
                width: r.width,
                height: r.height,
            },
            tags: hit
                .tags
                .split(',')
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        });
    }
    match longest_usable {
        Some(available_s) => Err(ProviderError::AssetDurationInsufficient {
            available_s,
            required_s: min_duration_s,
        }),
        None => Err(ProviderError::NoMatch(query.to_string())),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/providers/pixabay.rs"]
mod tests;
