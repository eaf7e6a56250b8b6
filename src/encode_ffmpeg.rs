use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::{
    asset::Asset,
    card::{self, LINE_OFFSETS},
    foundation::{
        core::Rgb8,
        error::{ReelError, ReelResult},
    },
    gradient,
    timeline::{CardSegment, FillMode, RenderPlan, Segment},
};

const AUDIO_RATE: u32 = 44_100;
const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Turns a finished render plan into one container file.
pub trait Encoder: Send + Sync {
    fn name(&self) -> &str;

    /// Encode `plan` into `out_path`. `work_dir` holds intermediate files and is cleaned by the
    /// caller.
    fn encode(&self, plan: &RenderPlan, work_dir: &Path, out_path: &Path) -> ReelResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Files a segment's filters read, materialised in the work directory.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentFiles {
    pub media: PathBuf,
    pub subtitle: Option<PathBuf>,
    pub title: Option<PathBuf>,
}

/// Card still plus one text file per non-empty line (heading, mode, detail).
#[derive(Clone, Debug, PartialEq)]
pub struct CardFiles {
    pub image: PathBuf,
    pub lines: [Option<PathBuf>; 3],
}

/// Everything [`FfmpegEncoder::build_args`] reads, in plan order.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedInputs {
    pub intro: Option<CardFiles>,
    pub segments: Vec<SegmentFiles>,
    pub outro: Option<CardFiles>,
}

fn write_overlay(work_dir: &Path, name: String, text: String) -> ReelResult<Option<PathBuf>> {
    use anyhow::Context as _;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let p = work_dir.join(name);
    std::fs::write(&p, text).with_context(|| format!("write overlay text '{}'", p.display()))?;
    Ok(Some(p))
}

/// System `ffmpeg` binary driven with a single filter graph.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    pub program: String,
    pub preset: String,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub font_file: Option<PathBuf>,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        let font = PathBuf::from(DEFAULT_FONT);
        Self {
            program: "ffmpeg".to_string(),
            preset: "medium".to_string(),
            video_bitrate: "2500k".to_string(),
            audio_bitrate: "128k".to_string(),
            font_file: font.exists().then_some(font),
        }
    }
}

impl FfmpegEncoder {
    /// Rasterise gradients and cards, and write overlay text files.
    pub fn prepare(&self, plan: &RenderPlan, work_dir: &Path) -> ReelResult<PreparedInputs> {
        let mut out = Vec::with_capacity(plan.segments.len());
        for seg in &plan.segments {
            let media = match &seg.asset {
                Asset::VideoClip(c) => c.path.clone(),
                Asset::StaticImage(i) => i.path.clone(),
                Asset::ProceduralGradient(g) => {
                    let p = work_dir.join(format!("gradient_{:03}.png", seg.index));
                    gradient::write_png(g, &p)?;
                    p
                }
            };
            out.push(SegmentFiles {
                media,
                subtitle: write_overlay(
                    work_dir,
                    format!("subtitle_{:03}.txt", seg.index),
                    seg.subtitle.lines.join("\n"),
                )?,
                title: write_overlay(
                    work_dir,
                    format!("title_{:03}.txt", seg.index),
                    seg.subtitle.title.to_uppercase(),
                )?,
            });
        }
        let card_files = |c: &CardSegment| -> ReelResult<CardFiles> {
            let label = c.card.kind.label();
            let image = work_dir.join(format!("card_{label}.png"));
            card::write_png(&c.card, plan.resolution, &image)?;
            let text = |i: usize, t: &str| {
                write_overlay(work_dir, format!("card_{label}_{i}.txt"), t.to_string())
            };
            Ok(CardFiles {
                image,
                lines: [
                    text(0, &c.card.heading)?,
                    text(1, &c.card.mode)?,
                    text(2, &c.card.detail)?,
                ],
            })
        };
        Ok(PreparedInputs {
            intro: plan.intro.as_ref().map(&card_files).transpose()?,
            segments: out,
            outro: plan.outro.as_ref().map(&card_files).transpose()?,
        })
    }

    /// Full ffmpeg argument list for `plan`. Pure; touches no files.
    pub fn build_args(
        &self,
        plan: &RenderPlan,
        inputs: &PreparedInputs,
        out_path: &Path,
    ) -> ReelResult<Vec<String>> {
        let files = &inputs.segments;
        if files.len() != plan.segments.len() {
            return Err(ReelError::validation(format!(
                "{} segment file sets for {} segments",
                files.len(),
                plan.segments.len()
            )));
        }
        let mut cards: Vec<(&CardSegment, &CardFiles, &str)> = Vec::with_capacity(2);
        for (seg, f, tag) in [
            (&plan.intro, &inputs.intro, "intro"),
            (&plan.outro, &inputs.outro, "outro"),
        ] {
            match (seg, f) {
                (Some(seg), Some(f)) => cards.push((seg, f, tag)),
                (None, None) => {}
                _ => {
                    return Err(ReelError::validation(format!(
                        "card files do not match the plan's {tag} card"
                    )));
                }
            }
        }
        let framerate = format!("{}/{}", plan.fps.num, plan.fps.den);

        let mut args: Vec<String> = ["-y", "-loglevel", "error"].map(String::from).to_vec();

        for (seg, f) in plan.segments.iter().zip(files) {
            match seg.fill {
                FillMode::Loop => args.extend(["-stream_loop", "-1"].map(String::from)),
                FillMode::Hold | FillMode::Render => {
                    args.extend(["-loop".into(), "1".into(), "-framerate".into(), framerate.clone()])
                }
                FillMode::Trim => {}
            }
            args.push("-i".into());
            args.push(f.media.display().to_string());
        }

        let mut audio_inputs = Vec::with_capacity(plan.segments.len());
        let mut next_input = plan.segments.len();
        for seg in &plan.segments {
            match &seg.narration.path {
                Some(p) => {
                    args.push("-i".into());
                    args.push(p.display().to_string());
                    audio_inputs.push(Some(next_input));
                    next_input += 1;
                }
                None => audio_inputs.push(None),
            }
        }

        let mut card_inputs = Vec::with_capacity(cards.len());
        for (_, f, _) in &cards {
            args.extend(["-loop".into(), "1".into(), "-framerate".into(), framerate.clone()]);
            args.push("-i".into());
            args.push(f.image.display().to_string());
            card_inputs.push(next_input);
            next_input += 1;
        }

        let mut graph = Vec::with_capacity((plan.segments.len() + cards.len()) * 2 + 1);
        for (i, (seg, f)) in plan.segments.iter().zip(files).enumerate() {
            graph.push(format!(
                "[{i}:v]{}[v{i}]",
                self.video_chain(plan, seg, f, &framerate).join(",")
            ));
            graph.push(format!("{}[a{i}]", audio_chain(seg, audio_inputs[i])));
        }
        for ((seg, f, tag), idx) in cards.iter().zip(&card_inputs) {
            graph.push(format!(
                "[{idx}:v]{}[c{tag}]",
                self.card_chain(plan, seg, f, &framerate).join(",")
            ));
            graph.push(format!("{}[ca{tag}]", silence(seg.duration_s)));
        }
        let pad = |tag: &str| {
            cards
                .iter()
                .find(|(_, _, t)| *t == tag)
                .map(|_| format!("[c{tag}][ca{tag}]"))
                .unwrap_or_default()
        };
        let pads: String = (0..plan.segments.len())
            .map(|i| format!("[v{i}][a{i}]"))
            .collect();
        graph.push(format!(
            "{}{pads}{}concat=n={}:v=1:a=1[vout][aout]",
            pad("intro"),
            pad("outro"),
            plan.segments.len() + cards.len()
        ));

        args.push("-filter_complex".into());
        args.push(graph.join(";"));
        args.extend(
            [
                "-map", "[vout]", "-map", "[aout]", "-c:v", "libx264", "-preset",
            ]
            .map(String::from),
        );
        args.push(self.preset.clone());
        args.extend(["-b:v".into(), self.video_bitrate.clone()]);
        args.extend(["-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a"].map(String::from));
        args.push(self.audio_bitrate.clone());
        args.extend(["-r".into(), framerate]);
        args.extend(["-t".into(), secs(plan.total_s())]);
        args.extend(["-movflags", "+faststart"].map(String::from));
        args.push(out_path.display().to_string());
        Ok(args)
    }

    fn video_chain(
        &self,
        plan: &RenderPlan,
        seg: &Segment,
        f: &SegmentFiles,
        framerate: &str,
    ) -> Vec<String> {
        let (w, h) = (plan.resolution.width, plan.resolution.height);
        let d = seg.duration_s;
        let mut c = Vec::new();
        if seg.speed != 1.0 {
            c.push(format!("setpts=(PTS-STARTPTS)/{}", num(seg.speed)));
        } else {
            c.push("setpts=PTS-STARTPTS".to_string());
        }
        c.push(format!("fps={framerate}"));
        c.push(format!(
            "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1"
        ));
        c.push(format!("trim=duration={}", secs(d)));
        c.push("setpts=PTS-STARTPTS".to_string());

        // Motion: per-frame upscale by the eased zoom, then crop back at the eased pan offset.
        // Expressions are single-quoted so their commas survive graph parsing.
        let m = &seg.motion;
        let p = m.ease.ffmpeg_expr(&format!("min(t/{},1)", secs(d)));
        let lerp = |a: f64, b: f64| format!("({}+({})*{p})", num(a), num(b - a));
        let zoom = format!("max(1,{})", lerp(m.zoom_from, m.zoom_to));
        c.push(format!(
            "scale=w='trunc({w}*{zoom}/2)*2':h='trunc({h}*{zoom}/2)*2':eval=frame"
        ));
        c.push(format!(
            "crop={w}:{h}:x='(iw-{w})/2*(1+{})':y='(ih-{h})/2*(1+{})'",
            lerp(m.pan_from.0, m.pan_to.0),
            lerp(m.pan_from.1, m.pan_to.1)
        ));

        c.extend(seg.grade.ffmpeg_filters());

        let style = &plan.subtitle_style;
        let font = self.font_option();
        if let Some(sub) = &f.subtitle {
            c.push(format!(
                "drawtext=textfile={}{font}:fontcolor=0x{}:fontsize={}:line_spacing={}:box=1:\
                 boxcolor=0x{}@{:.3}:boxborderw=12:x=(w-text_w)/2:y={}",
                filter_escape(&sub.display().to_string()),
                style.font_color.to_hex(),
                style.font_size,
                style.line_spacing,
                style.box_color.to_hex(),
                f64::from(style.box_alpha) / 255.0,
                style.block_top(h, seg.subtitle.lines.len()),
            ));
        }
        if let Some(title) = &f.title {
            c.push(format!(
                "drawtext=textfile={}{font}:fontcolor=0x{}:fontsize={}:x=60:y=50:\
                 enable='lt(t,{})'",
                filter_escape(&title.display().to_string()),
                style.font_color.to_hex(),
                style.title_size,
                secs(seg.subtitle.title_s),
            ));
        }

        c.extend(fades(plan, d, seg.fade_in_frames, seg.fade_out_frames));
        c.push("format=yuv420p".to_string());
        c
    }

    /// Still card scaled to the frame with its three lines centred on the card's guides.
    fn card_chain(
        &self,
        plan: &RenderPlan,
        seg: &CardSegment,
        f: &CardFiles,
        framerate: &str,
    ) -> Vec<String> {
        let (w, h) = (plan.resolution.width, plan.resolution.height);
        let d = seg.duration_s;
        let mut c = vec![
            "setpts=PTS-STARTPTS".to_string(),
            format!("fps={framerate}"),
            format!("scale={w}:{h},setsar=1"),
            format!("trim=duration={}", secs(d)),
            "setpts=PTS-STARTPTS".to_string(),
        ];
        let style = &plan.subtitle_style;
        let font = self.font_option();
        let card = &seg.card;
        let looks: [(Rgb8, u32); 3] = [
            (Rgb8::WHITE, style.title_size),
            (card.accent, style.font_size),
            (card.detail_color, style.font_size),
        ];
        for ((file, (color, size)), offset) in f.lines.iter().zip(looks).zip(LINE_OFFSETS) {
            if let Some(file) = file {
                c.push(format!(
                    "drawtext=textfile={}{font}:fontcolor=0x{}:fontsize={size}:\
                     x=(w-text_w)/2:y={}-text_h/2",
                    filter_escape(&file.display().to_string()),
                    color.to_hex(),
                    card::scaled_offset(h, offset),
                ));
            }
        }
        c.extend(fades(plan, d, seg.fade_in_frames, seg.fade_out_frames));
        c.push("format=yuv420p".to_string());
        c
    }

    fn font_option(&self) -> String {
        self.font_file
            .as_ref()
            .map(|p| format!(":fontfile={}", filter_escape(&p.display().to_string())))
            .unwrap_or_default()
    }
}

fn fades(plan: &RenderPlan, d: f64, in_frames: u64, out_frames: u64) -> Vec<String> {
    let fr = plan.fps;
    let mut c = Vec::with_capacity(2);
    if in_frames > 0 {
        c.push(format!("fade=t=in:st=0:d={}", secs(fr.frames_to_secs(in_frames))));
    }
    if out_frames > 0 {
        let out_s = fr.frames_to_secs(out_frames);
        c.push(format!(
            "fade=t=out:st={}:d={}",
            secs((d - out_s).max(0.0)),
            secs(out_s)
        ));
    }
    c
}

fn silence(duration_s: f64) -> String {
    format!(
        "anullsrc=r={AUDIO_RATE}:cl=stereo,atrim=duration={},\
         aformat=sample_rates={AUDIO_RATE}:channel_layouts=stereo",
        secs(duration_s)
    )
}

fn audio_chain(seg: &Segment, input: Option<usize>) -> String {
    let d = secs(seg.duration_s);
    let fmt = format!("aformat=sample_rates={AUDIO_RATE}:channel_layouts=stereo");
    match input {
        None => silence(seg.duration_s),
        Some(idx) => {
            let mut c = vec![format!("[{idx}:a]asetpts=PTS-STARTPTS")];
            let pitch = seg.narration.pitch_semitones;
            if pitch != 0.0 {
                // Resample to shift pitch, then re-time so duration is unchanged.
                let k = 2f64.powf(pitch / 12.0);
                c.push(format!("asetrate={}", (f64::from(AUDIO_RATE) * k).round()));
                c.push(format!("aresample={AUDIO_RATE}"));
                c.push(format!("atempo={}", num(1.0 / k)));
            }
            c.push(fmt);
            c.push("apad".to_string());
            c.push(format!("atrim=duration={d}"));
            c.join(",")
        }
    }
}

/// Escape a literal for an unquoted filter option value: once for the option parser, then
/// again for the graph parser.
pub fn filter_escape(s: &str) -> String {
    escape_chars(&escape_chars(s, &['\\', ':', '\'']), &['\\', '\'', '[', ']', ',', ';'])
}

fn escape_chars(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if special.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn secs(v: f64) -> String {
    format!("{v:.4}")
}

fn num(v: f64) -> String {
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" { "0".to_string() } else { s.to_string() }
}

impl Encoder for FfmpegEncoder {
    fn name(&self) -> &str {
        &self.program
    }

    #[tracing::instrument(skip_all, fields(out = %out_path.display(), segments = plan.segments.len()))]
    fn encode(&self, plan: &RenderPlan, work_dir: &Path, out_path: &Path) -> ReelResult<()> {
        plan.resolution.validate_even()?;
        ensure_parent_dir(out_path)?;
        if self.program == "ffmpeg" && !is_ffmpeg_on_path() {
            return Err(ReelError::encoding(
                "ffmpeg is required for encoding, but was not found on PATH",
            ));
        }

        let inputs = self.prepare(plan, work_dir)?;
        let args = self.build_args(plan, &inputs, out_path)?;
        tracing::debug!(argc = args.len(), "running ffmpeg");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                ReelError::encoding(format!(
                    "failed to spawn {} (is it installed and on PATH?): {e}",
                    self.program
                ))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::encoding(format!(
                "{} exited with status {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/encode_ffmpeg.rs"]
mod tests;
