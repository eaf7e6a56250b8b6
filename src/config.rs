use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::foundation::{
    core::{Fps, Resolution},
    error::{ReelError, ReelResult},
};

pub const ENV_PEXELS_KEY: &str = "PEXELS_API_KEY";
pub const ENV_PIXABAY_KEY: &str = "PIXABAY_API_KEY";
pub const ENV_UNSPLASH_KEY: &str = "UNSPLASH_ACCESS_KEY";

/// Runtime knobs for one pipeline instance.
///
/// Loaded from an optional JSON file, then overlaid with environment variables, then with CLI
/// flags by the binary. Every field has a default so an empty `{}` is a valid config.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub output_dir: PathBuf,
    /// Parent for the per-run temporary directory; system temp dir when unset.
    pub temp_parent: Option<PathBuf>,
    pub container_ext: String,
    pub enhanced: bool,
    pub workers: usize,
    pub keep_script_json: bool,
    /// Open with a title card and close with an outro card.
    pub title_cards: bool,
    pub providers: ProviderSettings,
    pub narration: NarrationSettings,
    /// External script generator: program followed by its arguments.
    pub script_command: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: Resolution::HD.width,
            height: Resolution::HD.height,
            fps: 24,
            output_dir: PathBuf::from("./output_ppv"),
            temp_parent: None,
            container_ext: "mp4".to_string(),
            enhanced: false,
            workers: 4,
            keep_script_json: true,
            title_cards: true,
            providers: ProviderSettings::default(),
            narration: NarrationSettings::default(),
            script_command: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub request_timeout_ms: u64,
    pub download_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub permits_per_provider: usize,
    pub min_interval_ms: u64,
    pub pexels_api_key: Option<String>,
    pub pixabay_api_key: Option<String>,
    pub unsplash_access_key: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 15_000,
            download_timeout_ms: 30_000,
            max_attempts: 2,
            retry_backoff_ms: 250,
            permits_per_provider: 2,
            min_interval_ms: 250,
            pexels_api_key: None,
            pixabay_api_key: None,
            unsplash_access_key: None,
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    /// Upper bound for one provider attempt: search plus download.
    pub fn attempt_timeout(&self) -> Duration {
        self.request_timeout() + self.download_timeout()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    pub enabled: bool,
    pub tts_command: String,
    pub lang: String,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tts_command: "gtts-cli".to_string(),
            lang: "en".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(raw: &str) -> ReelResult<Self> {
        serde_json::from_str(raw).map_err(|e| ReelError::validation(format!("config JSON: {e}")))
    }

    pub fn from_file(path: &Path) -> ReelResult<Self> {
        use anyhow::Context as _;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// File (if given) then environment.
    pub fn load(path: Option<&Path>) -> ReelResult<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Overlay API keys from an environment lookup. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_PEXELS_KEY) {
            self.providers.pexels_api_key = Some(v);
        }
        if let Some(v) = get(ENV_PIXABAY_KEY) {
            self.providers.pixabay_api_key = Some(v);
        }
        if let Some(v) = get(ENV_UNSPLASH_KEY) {
            self.providers.unsplash_access_key = Some(v);
        }
    }

    pub fn validate(&self) -> ReelResult<()> {
        self.resolution().validate_even()?;
        if self.fps == 0 {
            return Err(ReelError::validation("fps must be non-zero"));
        }
        if self.workers == 0 {
            return Err(ReelError::validation("workers must be non-zero"));
        }
        if self.providers.max_attempts == 0 {
            return Err(ReelError::validation("providers.max_attempts must be non-zero"));
        }
        if self.providers.permits_per_provider == 0 {
            return Err(ReelError::validation(
                "providers.permits_per_provider must be non-zero",
            ));
        }
        let ext = self.container_ext.trim();
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ReelError::validation(format!(
                "container_ext '{}' must be non-empty ascii alphanumerics",
                self.container_ext
            )));
        }
        if let Some(cmd) = &self.script_command
            && cmd.first().is_none_or(|p| p.trim().is_empty())
        {
            return Err(ReelError::validation("script_command needs a program"));
        }
        Ok(())
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    pub fn frame_rate(&self) -> ReelResult<Fps> {
        Fps::new(self.fps, 1)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
