/// Easing curve applied to motion progress over a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    OutQuad,
    InOutQuad,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
        }
    }

    /// The same curve as an ffmpeg expression over the progress expression `p` (0..1).
    pub fn ffmpeg_expr(self, p: &str) -> String {
        match self {
            Self::Linear => format!("({p})"),
            Self::OutQuad => format!("(1-(1-({p}))*(1-({p})))"),
            Self::InOutQuad => {
                format!("if(lt({p},0.5),2*({p})*({p}),1-pow(-2*({p})+2,2)/2)")
            }
        }
    }
}
