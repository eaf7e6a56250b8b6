use std::time::Duration;

use futures::future::{BoxFuture, FutureExt as _};

use super::{AssetProvider, ProviderError, SearchRequest, http};
use crate::{
    ReelResult,
    asset::{Asset, ImageAsset, Provenance},
    config::ProviderSettings,
    foundation::core::Resolution,
};

const SEARCH_URL: &str = "https://api.unsplash.com/search/photos";

/// Static-image tier: Unsplash photo search. Stills are held, so duration never disqualifies.
pub struct UnsplashImages {
    client: reqwest::Client,
    access_key: Option<String>,
    download_timeout: Duration,
}

impl UnsplashImages {
    pub fn new(settings: &ProviderSettings) -> ReelResult<Self> {
        Ok(Self {
            client: http::client(settings.request_timeout())?,
            access_key: settings.unsplash_access_key.clone(),
            download_timeout: settings.download_timeout(),
        })
    }

    async fn fetch(&self, req: &SearchRequest) -> Result<Asset, ProviderError> {
        let key = self
            .access_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("unsplash".to_string()))?;
        let resp: SearchResponse = http::get_json(self.client.get(SEARCH_URL).query(&[
            ("query", req.query.as_str()),
            ("per_page", "5"),
            ("orientation", "landscape"),
            ("client_id", key),
        ]))
        .await?;

        let pick = pick(&resp, &req.query)?;
        let dest = req.download_path("unsplash", "jpg");
        http::download(&self.client, &pick.url, self.download_timeout, &dest).await?;
        tracing::debug!(scene = req.scene_index, url = %pick.page_url, "unsplash image downloaded");

        Ok(Asset::StaticImage(ImageAsset {
            path: dest,
            resolution: pick.resolution,
            tags: pick.tags,
            provenance: Provenance {
                provider: "unsplash".to_string(),
                source_url: pick.page_url,
                query: req.query.clone(),
            },
        }))
    }
}

impl AssetProvider for UnsplashImages {
    fn name(&self) -> &str {
        "unsplash"
    }

    fn is_configured(&self) -> bool {
        self.access_key.is_some()
    }

    fn search<'a>(&'a self, req: &'a SearchRequest) -> BoxFuture<'a, Result<Asset, ProviderError>> {
        self.fetch(req).boxed()
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Photo>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Photo {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub description: Option<String>,
    pub alt_description: Option<String>,
    #[serde(default)]
    pub tags: Vec<PhotoTag>,
    pub urls: PhotoUrls,
    pub links: Option<PhotoLinks>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PhotoTag {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PhotoUrls {
    pub regular: Option<String>,
    pub full: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PhotoLinks {
    pub html: Option<String>,
}

#[derive(Debug, PartialEq)]
pub(crate) struct Pick {
    pub url: String,
    pub page_url: String,
    pub resolution: Resolution,
    pub tags: Vec<String>,
}

/// First landscape photo with a downloadable rendition.
pub(crate) fn pick(resp: &SearchResponse, query: &str) -> Result<Pick, ProviderError> {
    resp.results
        .iter()
        .filter(|p| p.width >= p.height)
        .find_map(|p| {
            let url = p.urls.regular.clone().or_else(|| p.urls.full.clone())?;
            let mut tags: Vec<String> = p.tags.iter().map(|t| t.title.to_lowercase()).collect();
            tags.extend(
                [&p.description, &p.alt_description]
                    .into_iter()
                    .flatten()
                    .map(|d| d.to_lowercase()),
            );
            Some(Pick {
                page_url: p
                    .links
                    .as_ref()
                    .and_then(|l| l.html.clone())
                    .unwrap_or_else(|| url.clone()),
                url,
                resolution: Resolution {
                    width: p.width,
                    height: p.height,
                },
                tags,
            })
        })
        .ok_or_else(|| ProviderError::NoMatch(query.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/providers/unsplash.rs"]
mod tests;
