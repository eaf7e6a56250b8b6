use crate::{foundation::core::Fps, state::Arousal};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Cut,
    /// Outgoing segment fades to black, incoming fades up from black. Segments never overlap.
    Fade,
}

/// Boundary between segment `after` and `after + 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transition {
    pub after: usize,
    pub kind: TransitionKind,
    pub frames: u64,
}

impl Transition {
    /// Frames taken from the end of the outgoing segment.
    pub fn out_frames(&self) -> u64 {
        self.frames / 2
    }

    /// Frames taken from the start of the incoming segment.
    pub fn in_frames(&self) -> u64 {
        self.frames - self.frames / 2
    }
}

/// Transition length the state's pacing asks for.
pub fn pacing_frames(arousal: Arousal, fps: Fps) -> u64 {
    fps.secs_to_frames_round(arousal.transition_secs())
}

/// Transition between two segments, capped to the shorter of the two.
pub fn between(after: usize, wanted: u64, prev_len: u64, next_len: u64) -> Transition {
    let frames = wanted.min(prev_len).min(next_len);
    Transition {
        after,
        kind: if frames == 0 {
            TransitionKind::Cut
        } else {
            TransitionKind::Fade
        },
        frames,
    }
}
