use std::path::PathBuf;

pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("unknown state: '{0}'")]
    UnknownState(String),

    #[error("invalid state profile: {0}")]
    InvalidProfile(String),

    #[error("empty script: no scenes to render")]
    EmptyScript,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("narration error: {0}")]
    Narration(String),

    #[error("encoding failure: {reason}")]
    Encoding {
        reason: String,
        manifest_path: Option<PathBuf>,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn unknown_state(label: impl Into<String>) -> Self {
        Self::UnknownState(label.into())
    }

    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self::InvalidProfile(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    pub fn narration(msg: impl Into<String>) -> Self {
        Self::Narration(msg.into())
    }

    pub fn encoding(reason: impl Into<String>) -> Self {
        Self::Encoding {
            reason: reason.into(),
            manifest_path: None,
        }
    }

    /// Pipeline stage that produced this error, for batch reports and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnknownState(_) | Self::InvalidProfile(_) => "profile",
            Self::EmptyScript | Self::Script(_) => "script",
            Self::Narration(_) => "narration",
            Self::Encoding { .. } => "encode",
            Self::Cancelled => "cancelled",
            Self::Validation(_) | Self::Serde(_) | Self::Io(_) | Self::Other(_) => "pipeline",
        }
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
