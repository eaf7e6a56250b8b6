use std::path::{Path, PathBuf};

use crate::{
    encode_ffmpeg::Encoder,
    foundation::error::{ReelError, ReelResult},
    manifest::Manifest,
    timeline::RenderPlan,
};

const MAX_SLUG_CHARS: usize = 40;

/// Short random run identifier.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Lowercase alphanumeric words joined by `_`, capped at 40 characters.
pub fn topic_slug(topic: &str) -> String {
    let mut slug = topic
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    slug.truncate(MAX_SLUG_CHARS);
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputNames {
    pub base: String,
    pub video: PathBuf,
    pub manifest: PathBuf,
    /// Copy of the script, kept only next to a finished video.
    pub script: PathBuf,
}

impl OutputNames {
    /// `{run_id}_{topic_slug}[_enhanced].{ext}` plus a `.json` manifest and a `_script.json`
    /// of the same base.
    pub fn new(dir: &Path, run_id: &str, topic: &str, enhanced: bool, ext: &str) -> Self {
        let mut base = format!("{run_id}_{}", topic_slug(topic));
        if enhanced {
            base.push_str("_enhanced");
        }
        Self {
            video: dir.join(format!("{base}.{ext}")),
            manifest: dir.join(format!("{base}.json")),
            script: dir.join(format!("{base}_script.json")),
            base,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Finalized {
    pub output_path: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

/// Encode the plan, verify the output, and write the manifest beside it.
///
/// An encoder failure or an empty output removes whatever was written, records the failure in
/// the manifest, and is returned as [`ReelError::Encoding`] carrying the manifest path.
#[tracing::instrument(skip_all, fields(out = %names.video.display()))]
pub fn finalize(
    encoder: &dyn Encoder,
    plan: &RenderPlan,
    manifest: Manifest,
    work_dir: &Path,
    names: &OutputNames,
) -> ReelResult<Finalized> {
    let verdict = encoder
        .encode(plan, work_dir, &names.video)
        .and_then(|()| verify_output(&names.video));

    match verdict {
        Ok(bytes) => {
            let manifest = manifest.succeeded(&names.video);
            manifest.write(&names.manifest)?;
            tracing::info!(bytes, encoder = encoder.name(), "output written");
            Ok(Finalized {
                output_path: names.video.clone(),
                manifest_path: names.manifest.clone(),
                manifest,
            })
        }
        Err(e) => {
            if names.video.exists() {
                let _ = std::fs::remove_file(&names.video);
            }
            let reason = match &e {
                ReelError::Encoding { reason, .. } => reason.clone(),
                other => other.to_string(),
            };
            let written = manifest.failed(reason.clone()).write(&names.manifest);
            if let Err(w) = &written {
                tracing::warn!(error = %w, "could not write failure manifest");
            }
            tracing::error!(encoder = encoder.name(), %reason, "encoding failed");
            Err(ReelError::Encoding {
                reason,
                manifest_path: written.ok().map(|()| names.manifest.clone()),
            })
        }
    }
}

fn verify_output(path: &Path) -> ReelResult<u64> {
    let len = std::fs::metadata(path)
        .map_err(|e| ReelError::encoding(format!("no output at '{}': {e}", path.display())))?
        .len();
    if len == 0 {
        return Err(ReelError::encoding(format!(
            "encoder produced an empty file at '{}'",
            path.display()
        )));
    }
    Ok(len)
}

#[cfg(test)]
#[path = "../tests/unit/finalize.rs"]
mod tests;
