use std::path::{Path, PathBuf};
use std::process::Command;

use crate::{
    foundation::error::{ReelError, ReelResult},
    planner::{Scene, estimate_secs},
    state::VoiceParams,
};

/// Synthesized narration for one scene. `path` is `None` for silent narration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Narration {
    pub path: Option<PathBuf>,
    pub duration_s: f64,
}

impl Narration {
    pub fn silent(text: &str, voice: &VoiceParams) -> Self {
        Self {
            path: None,
            duration_s: estimate_secs(text) / voice.speed.max(0.1),
        }
    }
}

/// Text-to-speech collaborator. Blocking; the pipeline calls it from a blocking task.
pub trait NarrationEngine: Send + Sync {
    fn name(&self) -> &str;

    fn synthesize(&self, text: &str, voice: &VoiceParams, out_path: &Path) -> ReelResult<Narration>;
}

/// `gtts-cli`-compatible command: accent maps to `--tld`, slow voices add `--slow`.
#[derive(Clone, Debug)]
pub struct CommandTts {
    pub program: String,
    pub lang: String,
}

impl CommandTts {
    pub fn new(program: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            lang: lang.into(),
        }
    }

    pub fn build_args(&self, text: &str, voice: &VoiceParams, out_path: &Path) -> Vec<String> {
        let mut args = vec![
            "--lang".to_string(),
            self.lang.clone(),
            "--tld".to_string(),
            voice.accent.clone(),
        ];
        if voice.is_slow() {
            args.push("--slow".to_string());
        }
        args.push("--output".to_string());
        args.push(out_path.display().to_string());
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

impl NarrationEngine for CommandTts {
    fn name(&self) -> &str {
        &self.program
    }

    fn synthesize(&self, text: &str, voice: &VoiceParams, out_path: &Path) -> ReelResult<Narration> {
        let out = Command::new(&self.program)
            .args(self.build_args(text, voice, out_path))
            .output()
            .map_err(|e| ReelError::narration(format!("spawn '{}': {e}", self.program)))?;
        if !out.status.success() {
            return Err(ReelError::narration(format!(
                "'{}' exited with status {}: {}",
                self.program,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        let duration_s = probe_duration(out_path)?;
        if duration_s <= 0.0 {
            return Err(ReelError::narration(format!(
                "'{}' produced empty audio",
                out_path.display()
            )));
        }
        Ok(Narration {
            path: Some(out_path.to_path_buf()),
            duration_s,
        })
    }
}

/// No audio; timing comes from the word-rate estimate at the voice's speed.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentNarration;

impl NarrationEngine for SilentNarration {
    fn name(&self) -> &str {
        "silent"
    }

    fn synthesize(&self, text: &str, voice: &VoiceParams, _out_path: &Path) -> ReelResult<Narration> {
        Ok(Narration::silent(text, voice))
    }
}

/// Container duration in seconds, via `ffprobe`.
pub fn probe_duration(path: &Path) -> ReelResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| ReelError::narration(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ReelError::narration(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ReelError::narration(format!("ffprobe json parse failed: {e}")))?;
    parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| ReelError::narration(format!("no duration for '{}'", path.display())))
}

/// Narrate every scene in order. A failing scene degrades to silence instead of failing the run.
pub fn narrate_scenes(
    engine: &dyn NarrationEngine,
    scenes: &[Scene],
    voice: &VoiceParams,
    dir: &Path,
) -> Vec<Narration> {
    scenes
        .iter()
        .map(|scene| {
            if scene.narration.trim().is_empty() {
                return Narration::silent("", voice);
            }
            let out_path = dir.join(format!("narration_{:03}.mp3", scene.index));
            match engine.synthesize(&scene.narration, voice, &out_path) {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(
                        scene = scene.index,
                        engine = engine.name(),
                        error = %e,
                        "narration failed; continuing silent"
                    );
                    Narration::silent(&scene.narration, voice)
                }
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../tests/unit/narration.rs"]
mod tests;
