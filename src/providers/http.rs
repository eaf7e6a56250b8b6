use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncWriteExt as _;

use super::ProviderError;

/// Bodies smaller than this are error pages or truncated transfers, not media.
pub(crate) const MIN_MEDIA_BYTES: u64 = 8000;

pub(crate) const USER_AGENT: &str = concat!("statereel/", env!("CARGO_PKG_VERSION"));

pub(crate) fn client(request_timeout: Duration) -> crate::ReelResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| crate::ReelError::Other(anyhow::Error::new(e).context("build HTTP client")))
}

pub(crate) fn status_error(status: reqwest::StatusCode) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimited,
        401 | 403 => ProviderError::QuotaExceeded(format!("HTTP {status}")),
        _ => ProviderError::Network(format!("HTTP {status}")),
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else if e.is_decode() {
        ProviderError::Malformed(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    req: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let resp = req.send().await.map_err(transport_error)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    let body = resp.bytes().await.map_err(transport_error)?;
    serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Stream `url` into `dest`. A short body is removed and reported as malformed.
pub(crate) async fn download(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    dest: &Path,
) -> Result<u64, ProviderError> {
    let mut resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(transport_error)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(status_error(status));
    }

    let io_err = |e: std::io::Error| ProviderError::Network(format!("write '{}': {e}", dest.display()));
    let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
    let mut written = 0u64;
    let streamed = async {
        while let Some(chunk) = resp.chunk().await.map_err(transport_error)? {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        Ok::<(), ProviderError>(())
    }
    .await;

    let result = match streamed {
        Ok(()) if written < MIN_MEDIA_BYTES => Err(ProviderError::Malformed(format!(
            "download of {written} bytes is too small to be media"
        ))),
        other => other.map(|()| written),
    };
    if result.is_err() {
        drop(file);
        let _ = tokio::fs::remove_file(dest).await;
    }
    result
}
