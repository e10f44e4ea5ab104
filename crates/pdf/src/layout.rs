//! Page-layout math shared by the drawing engine.
//!
//! External TTF fonts carry no metrics at this layer, so line breaking
//! and centering work from an average glyph width. Good enough for
//! storybook text blocks; exact typesetting belongs to the HTML engine.

/// Cubic-Bezier arc constant for approximating a quarter circle.
pub const BEZIER_ARC_K: f64 = 0.552284749831;

/// Millimeters per PostScript point.
pub const PT_TO_MM: f64 = 25.4 / 72.0;

/// Average glyph advance as a fraction of the font size.
const AVG_GLYPH_EM: f64 = 0.5;

/// Estimated width of one character in millimeters.
pub fn char_width_mm(font_size_pt: f64) -> f64 {
    font_size_pt * PT_TO_MM * AVG_GLYPH_EM
}

/// How many characters fit on one line of `width_mm`.
pub fn max_chars_per_line(width_mm: f64, font_size_pt: f64) -> usize {
    let chars = (width_mm / char_width_mm(font_size_pt)).floor() as usize;
    chars.max(1)
}

/// Word-wrap `text` to `max_chars` columns, preserving explicit
/// newlines. Words longer than a line are hard-split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word;
            // Hard-split words that cannot fit any line.
            while word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split_at = word
                    .char_indices()
                    .nth(max_chars)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                lines.push(word[..split_at].to_string());
                word = &word[split_at..];
            }

            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// Distance from the top of a text area to the first line of a
/// vertically centered block. Never negative — overflowing blocks
/// start at the top.
pub fn centered_block_top(area_height_mm: f64, line_count: usize, line_height_mm: f64) -> f64 {
    let block = line_count as f64 * line_height_mm;
    ((area_height_mm - block) / 2.0).max(0.0)
}

/// Parse a `#RRGGBB` color into 0..=1 component floats.
pub fn parse_hex_color(s: &str) -> Option<(f64, f64, f64)> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0))
}

/// Convert a pixel count at `dpi` into millimeters.
pub fn mm_from_px(px: u32, dpi: u32) -> f64 {
    px as f64 * 25.4 / dpi.max(1) as f64
}

/// Evaluate a cubic Bezier at `t`.
fn cubic(p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64), t: f64) -> (f64, f64) {
    let u = 1.0 - t;
    let x = u * u * u * p0.0 + 3.0 * u * u * t * p1.0 + 3.0 * u * t * t * p2.0 + t * t * t * p3.0;
    let y = u * u * u * p0.1 + 3.0 * u * u * t * p1.1 + 3.0 * u * t * t * p2.1 + t * t * t * p3.1;
    (x, y)
}

/// Closed outline of a rounded rectangle with lower-left corner
/// `(x, y)`, as a polyline. Corner arcs are quarter-circle cubics
/// (via [`BEZIER_ARC_K`]) sampled at `segments` points each.
pub fn rounded_rect_path(
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    r: f64,
    segments: usize,
) -> Vec<(f64, f64)> {
    let r = r.min(w / 2.0).min(h / 2.0);
    let k = BEZIER_ARC_K * r;
    let segments = segments.max(1);

    let mut points: Vec<(f64, f64)> = Vec::new();

    let mut arc = |p0: (f64, f64), p1: (f64, f64), p2: (f64, f64), p3: (f64, f64),
                   points: &mut Vec<(f64, f64)>| {
        for i in 1..=segments {
            let t = i as f64 / segments as f64;
            points.push(cubic(p0, p1, p2, p3, t));
        }
    };

    // Bottom edge, then corners counter-clockwise from bottom-left.
    points.push((x + r, y));
    points.push((x + w - r, y));
    arc(
        (x + w - r, y),
        (x + w - r + k, y),
        (x + w, y + r - k),
        (x + w, y + r),
        &mut points,
    );
    points.push((x + w, y + h - r));
    arc(
        (x + w, y + h - r),
        (x + w, y + h - r + k),
        (x + w - r + k, y + h),
        (x + w - r, y + h),
        &mut points,
    );
    points.push((x + r, y + h));
    arc(
        (x + r, y + h),
        (x + r - k, y + h),
        (x, y + h - r + k),
        (x, y + h - r),
        &mut points,
    );
    points.push((x, y + r));
    arc(
        (x, y + r),
        (x, y + r - k),
        (x + r - k, y),
        (x + r, y),
        &mut points,
    );

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- wrapping --

    #[test]
    fn wrap_short_text_single_line() {
        assert_eq!(wrap_text("hello world", 40), vec!["hello world"]);
    }

    #[test]
    fn wrap_breaks_at_word_boundary() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn wrap_preserves_explicit_newlines() {
        let lines = wrap_text("first\n\nsecond", 40);
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_never_exceeds_width() {
        for line in wrap_text("some reasonably long storybook paragraph here", 12) {
            assert!(line.chars().count() <= 12, "line too long: {line:?}");
        }
    }

    // -- centering --

    #[test]
    fn centered_block_splits_slack() {
        // 10 lines of 8mm in a 160mm area leaves 40mm above.
        assert!((centered_block_top(160.0, 10, 8.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn centered_block_clamps_overflow() {
        assert_eq!(centered_block_top(50.0, 20, 8.0), 0.0);
    }

    // -- colors --

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#000000"), Some((0.0, 0.0, 0.0)));
        assert_eq!(parse_hex_color("#FFFFFF"), Some((1.0, 1.0, 1.0)));
        let (r, g, b) = parse_hex_color("#1E1E64").unwrap();
        assert!((r - 30.0 / 255.0).abs() < 1e-9);
        assert!((g - 30.0 / 255.0).abs() < 1e-9);
        assert!((b - 100.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn bad_hex_rejected() {
        assert_eq!(parse_hex_color("1E1E64"), None);
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#GGGGGG"), None);
    }

    // -- units --

    #[test]
    fn px_to_mm() {
        assert!((mm_from_px(300, 300) - 25.4).abs() < 1e-9);
        assert!((mm_from_px(150, 300) - 12.7).abs() < 1e-9);
    }

    #[test]
    fn chars_per_line_scales_with_width() {
        let narrow = max_chars_per_line(50.0, 14.0);
        let wide = max_chars_per_line(150.0, 14.0);
        assert!(wide > narrow * 2);
        assert!(max_chars_per_line(1.0, 48.0) >= 1);
    }

    // -- rounded rect --

    #[test]
    fn rounded_rect_stays_in_bounds() {
        let path = rounded_rect_path(10.0, 10.0, 100.0, 60.0, 10.0, 8);
        for (px, py) in &path {
            assert!(*px >= 10.0 - 1e-9 && *px <= 110.0 + 1e-9);
            assert!(*py >= 10.0 - 1e-9 && *py <= 70.0 + 1e-9);
        }
    }

    #[test]
    fn rounded_rect_closes() {
        let path = rounded_rect_path(0.0, 0.0, 40.0, 40.0, 5.0, 8);
        let first = path.first().unwrap();
        let last = path.last().unwrap();
        assert!((first.0 - last.0).abs() < 1e-6);
        assert!((first.1 - last.1).abs() < 1e-6);
    }

    #[test]
    fn rounded_rect_corner_cut() {
        // The raw corner point must not be on the path.
        let path = rounded_rect_path(0.0, 0.0, 40.0, 40.0, 5.0, 16);
        for (px, py) in &path {
            let corner_dist = ((px - 40.0).powi(2) + (py - 40.0).powi(2)).sqrt();
            assert!(corner_dist > 1.0, "path touches square corner");
        }
    }

    #[test]
    fn radius_clamped_to_half_extent() {
        // Radius larger than the rect still produces a valid path.
        let path = rounded_rect_path(0.0, 0.0, 10.0, 10.0, 50.0, 4);
        for (px, py) in &path {
            assert!(*px >= -1e-9 && *px <= 10.0 + 1e-9);
            assert!(*py >= -1e-9 && *py <= 10.0 + 1e-9);
        }
    }
}
