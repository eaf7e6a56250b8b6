use crate::{
    foundation::core::{Resolution, Rgb8},
    grade::ColorGrade,
    state::{PhysioState, StateProfile},
};

/// WCAG AA threshold for body text.
pub const MIN_CONTRAST: f64 = 4.5;

const BASE_HEIGHT: f64 = 720.0;

/// Share of the frame height, from the bottom, a subtitle block may cover.
const SAFE_AREA_SHARE: f64 = 0.4;

/// Typography for one run's subtitle and title overlays.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleStyle {
    pub font_color: Rgb8,
    pub box_color: Rgb8,
    pub box_alpha: u8,
    pub font_size: u32,
    pub title_size: u32,
    /// Distance of the subtitle block's top from the bottom edge for short blocks.
    pub bottom_offset: u32,
    /// Minimum gap between the block's last line and the bottom edge.
    pub bottom_margin: u32,
    pub line_spacing: u32,
    pub max_chars: usize,
    pub max_lines: usize,
}

impl SubtitleStyle {
    pub fn for_profile(profile: &StateProfile, grade: &ColorGrade, res: Resolution) -> Self {
        let scale = f64::from(res.height) / BASE_HEIGHT;
        let base = if profile.state == PhysioState::PreSleep { 26.0 } else { 28.0 };
        let font_size = ((base * scale).round() as u32).max(8);
        let palette = &profile.palette;
        let bg = backdrop(palette.stops, grade, palette.subtitle_bg, palette.subtitle_bg_alpha);
        let line_spacing = 6;
        let bottom_margin = (24.0 * scale).round() as u32;
        let safe = f64::from(res.height) * SAFE_AREA_SHARE - f64::from(bottom_margin);
        let max_lines = ((safe / f64::from(font_size + line_spacing)).floor() as usize).max(1);
        Self {
            font_color: readable_on(palette.font, bg),
            box_color: palette.subtitle_bg,
            box_alpha: palette.subtitle_bg_alpha,
            font_size,
            title_size: ((32.0 * scale).round() as u32).max(8),
            bottom_offset: (140.0 * scale).round() as u32,
            bottom_margin,
            line_spacing,
            max_chars: wrap_width(res.width, font_size),
            max_lines,
        }
    }

    pub fn line_height(&self) -> u32 {
        self.font_size + self.line_spacing
    }

    /// Top edge of a block of `lines` lines: at the usual offset, raised when the block would
    /// otherwise cross the bottom margin.
    pub fn block_top(&self, frame_height: u32, lines: usize) -> u32 {
        let needed = self.bottom_margin + lines as u32 * self.line_height();
        frame_height.saturating_sub(self.bottom_offset.max(needed))
    }

    /// Wrap `text` for this style, keeping at most `max_lines` lines. A cut block ends in an
    /// ellipsis.
    pub fn layout(&self, text: &str) -> Vec<String> {
        let mut lines = wrap(text, self.max_chars);
        if lines.len() <= self.max_lines {
            return lines;
        }
        lines.truncate(self.max_lines);
        if let Some(last) = lines.last_mut() {
            let keep = self.max_chars.saturating_sub(3);
            if last.chars().count() > keep {
                *last = last.chars().take(keep).collect();
            }
            last.push_str("...");
        }
        lines
    }
}

/// Characters per line for a safe area 100px narrower than the frame.
pub fn wrap_width(frame_width: u32, font_size: u32) -> usize {
    let safe = frame_width.saturating_sub(100) as usize;
    let glyph = (font_size / 2).max(1) as usize;
    (safe / glyph).max(10)
}

/// Colour behind subtitle text: the graded footage tone under the translucent box.
fn backdrop(stops: [Rgb8; 2], grade: &ColorGrade, box_color: Rgb8, box_alpha: u8) -> Rgb8 {
    let footage = grade.apply(stops[0].lerp(stops[1], 0.5));
    footage.lerp(box_color, f64::from(box_alpha) / 255.0)
}

/// `preferred` when it reads on `bg`, else the better of black and white.
pub fn readable_on(preferred: Rgb8, bg: Rgb8) -> Rgb8 {
    if preferred.contrast_ratio(bg) >= MIN_CONTRAST {
        return preferred;
    }
    if Rgb8::WHITE.contrast_ratio(bg) >= Rgb8::BLACK.contrast_ratio(bg) {
        Rgb8::WHITE
    } else {
        Rgb8::BLACK
    }
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if line.is_empty() { 0 } else { line.chars().count() + 1 };
        if !line.is_empty() && needed + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
#[path = "../tests/unit/subtitles.rs"]
mod tests;
