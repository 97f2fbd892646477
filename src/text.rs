//! Text annotations — click an anchor, type, and the text is rasterized into
//! the canvas when committed.
//!
//! Glyphs come from a system sans-serif font located through `font-kit` and
//! rasterized with `ab_glyph` at a pixel height equal to the brush size.
//! Coverage is thresholded rather than blended: annotations are stamped
//! opaque like every other brush mark.

use ab_glyph::{point, Font, FontArc, ScaleFont};

use crate::canvas::Canvas;

/// Upper bound on annotation lines, matching the original editor.
pub const MAX_LINES: usize = 20;
/// Upper bound on the raw buffer length in bytes.
pub const MAX_TEXT_LEN: usize = 1000;

/// An in-progress text annotation: an anchor point plus the edit buffer.
pub struct TextAnnotation {
    pub anchor: (i32, i32),
    buffer: String,
    lines: usize,
}

impl TextAnnotation {
    pub fn new(anchor: (i32, i32)) -> Self {
        Self {
            anchor,
            buffer: String::new(),
            lines: 1,
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append a printable character. Control characters and anything past
    /// the buffer cap are ignored.
    pub fn push_char(&mut self, c: char) {
        if c.is_control() {
            return;
        }
        if self.buffer.len() + c.len_utf8() > MAX_TEXT_LEN {
            return;
        }
        self.buffer.push(c);
    }

    /// Start a new line, up to [`MAX_LINES`].
    pub fn newline(&mut self) {
        if self.lines < MAX_LINES && self.buffer.len() < MAX_TEXT_LEN {
            self.buffer.push('\n');
            self.lines += 1;
        }
    }

    /// Remove the last character (line breaks count as characters).
    pub fn backspace(&mut self) {
        if let Some(c) = self.buffer.pop() {
            if c == '\n' {
                self.lines -= 1;
            }
        }
    }
}

/// Locate a default sans-serif system font for annotations. `None` when the
/// platform has no usable font — the caller logs and skips the commit.
pub fn annotation_font() -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let handle = SystemSource::new()
        .select_best_match(&[FamilyName::SansSerif], &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    let bytes: Vec<u8> = (*data).clone();
    FontArc::try_from_vec(bytes).ok()
}

/// Rasterize `text` into the canvas at `anchor` with the given pixel height
/// and color. Multiline text stacks by the font's line height; layout uses
/// per-glyph advances and kerning. Pixels with less than half coverage are
/// dropped (no anti-aliasing).
pub fn rasterize_into(
    canvas: &mut Canvas,
    font: &FontArc,
    text: &str,
    anchor: (i32, i32),
    px_height: f32,
    color: [u8; 3],
) {
    let px_height = px_height.max(1.0);
    let scaled = font.as_scaled(px_height);
    let ascent = scaled.ascent();
    let line_height = scaled.height();

    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline_y = anchor.1 as f32 + ascent + line_idx as f32 * line_height;
        let mut cursor_x = anchor.0 as f32;
        let mut prev = None;

        for ch in line.chars() {
            let glyph_id = font.glyph_id(ch);
            if let Some(p) = prev {
                cursor_x += scaled.kern(p, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(px_height, point(cursor_x, baseline_y));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let origin_x = bounds.min.x as i32;
                let origin_y = bounds.min.y as i32;
                outlined.draw(|gx, gy, coverage| {
                    if coverage > 0.5 {
                        canvas.put_pixel(origin_x + gx as i32, origin_y + gy as i32, color);
                    }
                });
            }
            cursor_x += scaled.h_advance(glyph_id);
            prev = Some(glyph_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::BACKGROUND;

    #[test]
    fn characters_accumulate_and_backspace_removes() {
        let mut ann = TextAnnotation::new((10, 10));
        ann.push_char('h');
        ann.push_char('i');
        assert_eq!(ann.text(), "hi");
        ann.backspace();
        assert_eq!(ann.text(), "h");
        ann.backspace();
        ann.backspace(); // empty: no-op
        assert!(ann.is_empty());
    }

    #[test]
    fn control_characters_are_ignored() {
        let mut ann = TextAnnotation::new((0, 0));
        ann.push_char('\u{8}');
        ann.push_char('\t');
        ann.push_char('a');
        assert_eq!(ann.text(), "a");
    }

    #[test]
    fn line_count_is_capped() {
        let mut ann = TextAnnotation::new((0, 0));
        for _ in 0..(MAX_LINES + 5) {
            ann.push_char('x');
            ann.newline();
        }
        assert_eq!(ann.text().matches('\n').count(), MAX_LINES - 1);
    }

    #[test]
    fn backspacing_a_newline_frees_a_line() {
        let mut ann = TextAnnotation::new((0, 0));
        for _ in 0..MAX_LINES {
            ann.newline();
        }
        assert_eq!(ann.text().matches('\n').count(), MAX_LINES - 1);
        ann.backspace();
        ann.newline();
        assert_eq!(ann.text().matches('\n').count(), MAX_LINES - 1);
    }

    #[test]
    fn buffer_length_is_capped() {
        let mut ann = TextAnnotation::new((0, 0));
        for _ in 0..(MAX_TEXT_LEN + 10) {
            ann.push_char('y');
        }
        assert_eq!(ann.text().len(), MAX_TEXT_LEN);
    }

    #[test]
    fn rasterized_text_marks_the_canvas() {
        // Skips quietly on platforms with no system font (headless CI).
        let Some(font) = annotation_font() else {
            return;
        };
        let mut canvas = Canvas::new(200, 100, 0);
        rasterize_into(&mut canvas, &font, "Hi", (20, 20), 32.0, [200, 0, 0]);

        let mut marked = 0;
        for y in 0..100 {
            for x in 0..200 {
                if canvas.get_pixel(x, y) != Some(BACKGROUND) {
                    assert_eq!(canvas.get_pixel(x, y), Some([200, 0, 0]));
                    marked += 1;
                }
            }
        }
        assert!(marked > 0);
    }
}
