#![forbid(unsafe_code)]

pub mod foundation {
    pub mod core;
    pub mod error;
}

pub mod asset;
pub mod cancel;
pub mod card;
pub mod config;
pub mod ease;
pub mod encode_ffmpeg;
pub mod finalize;
pub mod grade;
pub mod gradient;
pub mod manifest;
pub mod motion;
pub mod narration;
pub mod pipeline;
pub mod planner;
pub mod providers;
pub mod resolve;
pub mod script;
pub mod state;
pub mod subtitles;
pub mod timeline;
pub mod transitions;

pub use asset::{Asset, AssetTier};
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use encode_ffmpeg::{Encoder, FfmpegEncoder};
pub use foundation::core::{Fps, FrameIndex, FrameRange, Resolution, Rgb8};
pub use foundation::error::{ReelError, ReelResult};
pub use manifest::{Manifest, RunStatus};
pub use narration::{Narration, NarrationEngine};
pub use pipeline::{BatchJob, BatchOutcome, Pipeline, RunReport};
pub use planner::Scene;
pub use providers::{AssetProvider, ProviderError};
pub use resolve::{ResolutionChain, ResolvedScene};
pub use script::{Script, ScriptSource};
pub use state::{PhysioState, ProfileRegistry, StateProfile};
pub use timeline::RenderPlan;
