use std::time::Duration;

use futures::future::{BoxFuture, FutureExt as _};

use super::{AssetProvider, ProviderError, SearchRequest, http};
use crate::{
    ReelResult,
    asset::{Asset, ClipAsset, Provenance},
    config::ProviderSettings,
    foundation::core::Resolution,
};

const SEARCH_URL: &str = "https://api.pexels.com/videos/search";
const PER_PAGE: &str = "5";

/// Primary tier: Pexels video search.
pub struct PexelsVideos {
    client: reqwest::Client,
    api_key: Option<String>,
    download_timeout: Duration,
}

impl PexelsVideos {
    pub fn new(settings: &ProviderSettings) -> ReelResult<Self> {
        Ok(Self {
            client: http::client(settings.request_timeout())?,
            api_key: settings.pexels_api_key.clone(),
            download_timeout: settings.download_timeout(),
        })
    }

    async fn fetch(&self, req: &SearchRequest) -> Result<Asset, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("pexels".to_string()))?;
        let resp: SearchResponse = http::get_json(
            self.client
                .get(SEARCH_URL)
                .header(reqwest::header::AUTHORIZATION, key)
                .query(&[
                    ("query", req.query.as_str()),
                    ("per_page", PER_PAGE),
                    ("orientation", "landscape"),
                    ("size", "medium"),
                ]),
        )
        .await?;

        let pick = pick(&resp, req.min_duration_s, &req.query)?;
        let dest = req.download_path("pexels", "mp4");
        http::download(&self.client, &pick.link, self.download_timeout, &dest).await?;
        tracing::debug!(scene = req.scene_index, url = %pick.page_url, "pexels clip downloaded");

        Ok(Asset::VideoClip(ClipAsset {
            path: dest,
            available_s: pick.duration_s,
            resolution: pick.resolution,
            tags: pick.tags,
            provenance: Provenance {
                provider: "pexels".to_string(),
                source_url: pick.page_url,
                query: req.query.clone(),
            },
        }))
    }
}

impl AssetProvider for PexelsVideos {
    fn name(&self) -> &str {
        "pexels"
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
    pub videos: Vec<Video>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Video {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct VideoFile {
    pub quality: Option<String>,
    pub file_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub link: String,
}

#[derive(Debug, PartialEq)]
pub(crate) struct Pick {
    pub link: String,
    pub page_url: String,
    pub duration_s: f64,
    pub resolution: Resolution,
    pub tags: Vec<String>,
}

/// First hit long enough for the scene that offers an hd/sd MP4 rendition.
pub(crate) fn pick(
    resp: &SearchResponse,
    min_duration_s: f64,
    query: &str,
) -> Result<Pick, ProviderError> {
    let mut longest_usable: Option<f64> = None;
    for video in &resp.videos {
        let Some(file) = video.video_files.iter().find(|f| {
            f.file_type.as_deref() == Some("video/mp4")
                && matches!(f.quality.as_deref(), Some("hd" | "sd"))
        }) else {
            continue;
        };
        if video.duration < min_duration_s {
            longest_usable = Some(longest_usable.unwrap_or(0.0).max(video.duration));
            continue;
        }
        return Ok(Pick {
            link: file.link.clone(),
            page_url: video.url.clone(),
            duration_s: video.duration,
            resolution: Resolution {
                width: file.width.unwrap_or(video.width),
                height: file.height.unwrap_or(video.height),
            },
            tags: slug_tags(&video.url),
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

/// Pexels has no tag field; the page slug (`/video/waves-on-a-beach-123/`) describes the clip.
pub(crate) fn slug_tags(page_url: &str) -> Vec<String> {
    let slug = page_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    slug.split('-')
        .filter(|w| !w.is_empty() && !w.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/providers/pexels.rs"]
mod tests;
