use crate::ease::Ease;

/// Named pan/zoom/drift transform applied over a scene's duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPattern {
    GentleDrift,
    SteadyZoom,
    DynamicMovement,
    SlowFade,
    CalmingSway,
    ClassicKenBurns,
}

impl MotionPattern {
    pub const ALL: [MotionPattern; 6] = [
        MotionPattern::GentleDrift,
        MotionPattern::SteadyZoom,
        MotionPattern::DynamicMovement,
        MotionPattern::SlowFade,
        MotionPattern::CalmingSway,
        MotionPattern::ClassicKenBurns,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::GentleDrift => "gentle_drift",
            Self::SteadyZoom => "steady_zoom",
            Self::DynamicMovement => "dynamic_movement",
            Self::SlowFade => "slow_fade",
            Self::CalmingSway => "calming_sway",
            Self::ClassicKenBurns => "classic_ken_burns",
        }
    }

    /// Concrete transform for one scene.
    ///
    /// Direction choices derive from `scene_index` so identical input always yields identical
    /// motion.
    pub fn parameterize(self, zoom_intensity: f64, scene_index: usize) -> MotionTransform {
        let z = zoom_intensity.max(0.0);
        let zoom_in = scene_index.is_multiple_of(2);
        match self {
            Self::GentleDrift => MotionTransform {
                pattern: self,
                zoom_from: 1.0 + z * 0.5,
                zoom_to: 1.0 + z * 1.5,
                pan_from: (-0.4, 0.0),
                pan_to: (0.4, 0.0),
                ease: Ease::InOutQuad,
            },
            Self::SteadyZoom => MotionTransform {
                pattern: self,
                zoom_from: 1.0,
                zoom_to: 1.0 + z,
                pan_from: (0.0, 0.0),
                pan_to: (0.0, 0.0),
                ease: Ease::Linear,
            },
            Self::DynamicMovement => {
                const DIRS: [(f64, f64); 4] = [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)];
                let (dx, dy) = DIRS[scene_index % DIRS.len()];
                let (zoom_from, zoom_to) = zoom_pair(zoom_in, 1.0, 1.0 + z * 2.0);
                MotionTransform {
                    pattern: self,
                    zoom_from,
                    zoom_to,
                    pan_from: (0.0, 0.0),
                    pan_to: (dx * 0.8, dy * 0.8),
                    ease: Ease::OutQuad,
                }
            }
            Self::SlowFade => MotionTransform {
                pattern: self,
                zoom_from: 1.0,
                zoom_to: 1.0 + z * 0.5,
                pan_from: (0.0, 0.0),
                pan_to: (0.0, 0.0),
                ease: Ease::InOutQuad,
            },
            Self::CalmingSway => {
                let side = if zoom_in { 1.0 } else { -1.0 };
                MotionTransform {
                    pattern: self,
                    zoom_from: 1.0 + z,
                    zoom_to: 1.0 + z,
                    pan_from: (-0.5 * side, 0.0),
                    pan_to: (0.5 * side, 0.0),
                    ease: Ease::InOutQuad,
                }
            }
            Self::ClassicKenBurns => {
                let (zoom_from, zoom_to) = zoom_pair(zoom_in, 1.0, 1.0 + z);
                MotionTransform {
                    pattern: self,
                    zoom_from,
                    zoom_to,
                    pan_from: (0.0, 0.0),
                    pan_to: (0.0, 0.0),
                    ease: Ease::Linear,
                }
            }
        }
    }
}

fn zoom_pair(zoom_in: bool, a: f64, b: f64) -> (f64, f64) {
    if zoom_in { (a, b) } else { (b, a) }
}

impl std::fmt::Display for MotionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Parameterized motion over one segment.
///
/// Zoom is a scale factor (>= 1 keeps the frame covered). Pan components are in -1..1 of the
/// margin the zoom leaves free, so any pan stays inside the source frame.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MotionTransform {
    pub pattern: MotionPattern,
    pub zoom_from: f64,
    pub zoom_to: f64,
    pub pan_from: (f64, f64),
    pub pan_to: (f64, f64),
    pub ease: Ease,
}

impl MotionTransform {
    /// `(zoom, pan_x, pan_y)` at segment progress `t` in 0..1.
    pub fn sample(&self, t: f64) -> (f64, f64, f64) {
        let p = self.ease.apply(t);
        let lerp = |a: f64, b: f64| a + (b - a) * p;
        (
            lerp(self.zoom_from, self.zoom_to),
            lerp(self.pan_from.0, self.pan_to.0),
            lerp(self.pan_from.1, self.pan_to.1),
        )
    }

    pub fn max_zoom(&self) -> f64 {
        self.zoom_from.max(self.zoom_to).max(1.0)
    }
}

#[cfg(test)]
#[path = "../tests/unit/motion.rs"]
mod tests;
