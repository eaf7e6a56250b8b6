use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{
    foundation::error::{ReelError, ReelResult},
    state::{PhysioState, StateProfile},
};

/// One narration + visual-prompt pair as produced by the script generator.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScriptEntry {
    #[serde(default)]
    pub title: String,
    pub narration: String,
    pub visual_prompt: String,
    #[serde(default = "default_mood")]
    pub mood: String,
}

fn default_mood() -> String {
    "neutral".to_string()
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Script {
    pub title: String,
    pub description: String,
    pub topic: String,
    pub state: PhysioState,
    pub category: String,
    pub entries: Vec<ScriptEntry>,
}

/// Request handed to a language model for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptBrief {
    pub topic: String,
    pub state: PhysioState,
    pub category: String,
    pub total_s: u32,
    pub scene_count: u32,
    pub scene_s: u32,
    target: String,
    tone: String,
    pace: String,
    narration_style: String,
    color_grade: String,
}

impl ScriptBrief {
    pub fn new(topic: &str, profile: &StateProfile) -> Self {
        let total_s = profile.bounds.midpoint().round() as u32;
        let scene_count = (total_s / 15).max(2);
        Self {
            topic: topic.to_string(),
            state: profile.state,
            category: profile.primary_category().to_string(),
            total_s,
            scene_count,
            scene_s: total_s / scene_count,
            target: profile.target.clone(),
            tone: profile.tone.clone(),
            pace: profile.pace.clone(),
            narration_style: profile.narration_style.clone(),
            color_grade: profile.palette.name.clone(),
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "Write a short-form video script for the following brief:\n\n\
             TOPIC: {topic}\n\
             PHYSIOLOGICAL STATE: {state}\n\
             CONTENT CATEGORY: {category}\n\
             TARGET: {target}\n\
             TONE: {tone}\n\
             PACING: {pace}\n\
             NARRATION STYLE: {narration}\n\
             COLOR / VISUAL GRADE: {grade}\n\
             NUMBER OF SCENES: {n}\n\
             SCENE DURATION: ~{scene_s} seconds each\n\n\
             Return ONLY JSON (no markdown fences) of the form:\n\
             {{\"title\": \"...\", \"description\": \"...\", \"scenes\": [{{\"title\": \"...\", \
             \"narration\": \"1-3 sentences\", \"visual_prompt\": \"subject, lighting, mood\", \
             \"mood\": \"serene\"}}]}}\n",
            topic = self.topic,
            state = self.state,
            category = self.category,
            target = self.target,
            tone = self.tone,
            pace = self.pace,
            narration = self.narration_style,
            grade = self.color_grade,
            n = self.scene_count,
            scene_s = self.scene_s,
        )
    }
}

#[derive(serde::Deserialize)]
struct RawScript {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    scenes: Vec<ScriptEntry>,
}

/// Parse a model response, tolerating a surrounding Markdown code fence.
pub fn parse_script_json(raw: &str, brief: &ScriptBrief) -> ReelResult<Script> {
    let text = strip_code_fence(raw);
    let parsed: RawScript = serde_json::from_str(text)
        .map_err(|e| ReelError::script(format!("parse script JSON: {e}")))?;
    let entries = parsed
        .scenes
        .into_iter()
        .enumerate()
        .map(|(i, mut e)| {
            if e.title.trim().is_empty() {
                e.title = format!("Scene {}", i + 1);
            }
            e
        })
        .collect();
    Ok(Script {
        title: parsed
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| brief.topic.clone()),
        description: parsed.description,
        topic: brief.topic.clone(),
        state: brief.state,
        category: brief.category.clone(),
        entries,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// External script generator.
pub trait ScriptSource: Send + Sync {
    fn generate(&self, brief: &ScriptBrief) -> ReelResult<Script>;
}

/// Reads a previously generated script JSON file.
#[derive(Clone, Debug)]
pub struct FileScriptSource {
    pub path: PathBuf,
}

impl ScriptSource for FileScriptSource {
    fn generate(&self, brief: &ScriptBrief) -> ReelResult<Script> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            ReelError::script(format!("read script '{}': {e}", self.path.display()))
        })?;
        parse_script_json(&raw, brief)
    }
}

/// Pipes the brief's prompt to an external command and parses its stdout.
#[derive(Clone, Debug)]
pub struct CommandScriptSource {
    pub program: String,
    pub args: Vec<String>,
}

impl ScriptSource for CommandScriptSource {
    fn generate(&self, brief: &ScriptBrief) -> ReelResult<Script> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ReelError::script(format!("spawn '{}': {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::script("failed to open script command stdin"))?;
        stdin
            .write_all(brief.prompt().as_bytes())
            .map_err(|e| ReelError::script(format!("write prompt: {e}")))?;
        drop(stdin);

        let out = child
            .wait_with_output()
            .map_err(|e| ReelError::script(format!("wait for '{}': {e}", self.program)))?;
        if !out.status.success() {
            return Err(ReelError::script(format!(
                "'{}' exited with status {}: {}",
                self.program,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        parse_script_json(&String::from_utf8_lossy(&out.stdout), brief)
    }
}

/// Deterministic offline script, always three scenes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackScript;

impl FallbackScript {
    pub fn script(&self, brief: &ScriptBrief) -> Script {
        let topic = brief.topic.as_str();
        let state = brief.state;
        let grade = brief.color_grade.as_str();
        let closing = match state {
            PhysioState::Calm | PhysioState::Stressed => {
                "Breathe slowly and carry this feeling with you as you return to your day."
            }
            PhysioState::PreSleep => "Let your eyes grow heavy and drift gently towards sleep.",
            PhysioState::Energized => "Take this energy with you and make the next hour count.",
            PhysioState::Focus => "Hold this clarity as you return to the work in front of you.",
            PhysioState::Neutral => "Carry this moment with you as you return to your day.",
        };
        let entries = vec![
            ScriptEntry {
                title: "Opening".to_string(),
                narration: format!(
                    "Welcome to this {} experience about {topic}.",
                    state.title().to_lowercase()
                ),
                visual_prompt: format!("{topic} wide shot, soft lighting, {grade}"),
                mood: "neutral".to_string(),
            },
            ScriptEntry {
                title: "Journey".to_string(),
                narration: format!(
                    "Let yourself settle into the moment as we explore {topic} together."
                ),
                visual_prompt: format!("{topic} close detail, ambient mood, {grade}"),
                mood: "serene".to_string(),
            },
            ScriptEntry {
                title: "Closing".to_string(),
                narration: closing.to_string(),
                visual_prompt: format!("{topic} gentle fade, peaceful, {grade}"),
                mood: "serene".to_string(),
            },
        ];
        Script {
            title: format!("{topic} - {} Experience", state.title()),
            description: format!("A {} short-form video about {topic}.", state.label()),
            topic: topic.to_string(),
            state,
            category: brief.category.clone(),
            entries,
        }
    }
}

impl ScriptSource for FallbackScript {
    fn generate(&self, brief: &ScriptBrief) -> ReelResult<Script> {
        Ok(self.script(brief))
    }
}

/// Persist the script that was actually used, for inspection.
pub fn write_script_json(script: &Script, path: &Path) -> ReelResult<()> {
    use anyhow::Context as _;
    let f = std::fs::File::create(path)
        .with_context(|| format!("create script JSON '{}'", path.display()))?;
    serde_json::to_writer_pretty(f, script)?;
    Ok(())
}

#[cfg(test)]
#[path = "../tests/unit/script.rs"]
mod tests;
