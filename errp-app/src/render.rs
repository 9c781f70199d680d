use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};
use tracing::warn;

use errp_core::SceneElement;
use errp_experiment::Config;

const INSTRUCTION_TEXT_PX: f32 = 32.0;
const BANNER_TEXT_PX: f32 = 40.0;
/// Logical y offset of the banner above the movement axis.
const BANNER_OFFSET_PX: f32 = 100.0;

/// Common system font locations; the first readable one wins.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Rasterizes abstract scene elements into the pixel frame. Owns the palette
/// and stimulus sizes; the experiment core never sees a color.
pub struct Renderer {
    width: u32,
    height: u32,
    pixmap: Pixmap,
    font: Option<FontVec>,
    logical_width: f32,
    background: Color,
    cursor_color: [u8; 4],
    target_color: [u8; 4],
    reached_color: [u8; 4],
    fixation_color: [u8; 4],
    text_color: [u8; 4],
    cursor_radius: f32,
    target_radius: f32,
    fixation_size: f32,
}

impl Renderer {
    pub fn new(config: &Config) -> Self {
        let (width, height) = config.window_size;
        let [br, bg, bb, ba] = config.background_color;
        Self {
            width,
            height,
            pixmap: Pixmap::new(width, height).expect("non-zero window size"),
            font: load_font(),
            logical_width: config.window_size.0 as f32,
            background: Color::from_rgba8(br, bg, bb, ba),
            cursor_color: config.cursor_color,
            target_color: config.target_color,
            reached_color: config.target_reached_color,
            fixation_color: config.fixation_color,
            text_color: config.text_color,
            cursor_radius: config.cursor_radius,
            target_radius: config.target_radius,
            fixation_size: config.fixation_size,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixmap = Pixmap::new(width, height).expect("non-zero window size");
    }

    /// Draws `scene` and copies the result into `frame` (RGBA, same size).
    pub fn render(&mut self, scene: &[SceneElement], frame: &mut [u8]) {
        self.pixmap.fill(self.background);

        // Logical coordinates are centered; scale to the physical buffer.
        let scale = self.width as f32 / self.logical_width;
        let cx = self.width as f32 / 2.0;
        let cy = self.height as f32 / 2.0;

        for element in scene {
            match element {
                SceneElement::Fixation => self.draw_fixation(cx, cy, scale),
                SceneElement::Cursor { x } => {
                    let color = self.cursor_color;
                    self.fill_circle(cx + x * scale, cy, self.cursor_radius * scale, color);
                }
                SceneElement::Target { x, reached } => {
                    let color = if *reached {
                        self.reached_color
                    } else {
                        self.target_color
                    };
                    self.fill_circle(cx + x * scale, cy, self.target_radius * scale, color);
                }
                SceneElement::Text { content } => {
                    self.draw_text_block(content, cx, cy, INSTRUCTION_TEXT_PX * scale);
                }
                SceneElement::Banner { content } => {
                    self.draw_text_block(
                        content,
                        cx,
                        cy - BANNER_OFFSET_PX * scale,
                        BANNER_TEXT_PX * scale,
                    );
                }
            }
        }

        let data = self.pixmap.data();
        if frame.len() == data.len() {
            frame.copy_from_slice(data);
        }
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: [u8; 4]) {
        let mut pb = PathBuilder::new();
        pb.push_circle(x, y, radius);
        let Some(path) = pb.finish() else { return };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn draw_fixation(&mut self, cx: f32, cy: f32, scale: f32) {
        let size = self.fixation_size * scale;
        let thickness = (size / 6.0).max(2.0);
        let color = self.fixation_color;

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;

        let bars = [
            Rect::from_xywh(cx - size / 2.0, cy - thickness / 2.0, size, thickness),
            Rect::from_xywh(cx - thickness / 2.0, cy - size / 2.0, thickness, size),
        ];
        for bar in bars.into_iter().flatten() {
            self.pixmap
                .fill_rect(bar, &paint, Transform::identity(), None);
        }
    }

    /// Centered multi-line text. Skipped (with a startup warning already
    /// logged) when no system font was found.
    fn draw_text_block(&mut self, text: &str, cx: f32, cy: f32, size_px: f32) {
        let Some(font) = self.font.take() else {
            return;
        };

        let scale = PxScale::from(size_px);
        let sf = font.as_scaled(scale);
        let line_advance = sf.height() * 1.25;
        let lines: Vec<&str> = text.lines().collect();
        let block_height = line_advance * lines.len() as f32;
        let mut baseline = cy - block_height / 2.0 + sf.ascent();

        for line in &lines {
            let width = line_width(&sf, line);
            self.draw_line(&font, scale, line, cx - width / 2.0, baseline);
            baseline += line_advance;
        }

        self.font = Some(font);
    }

    fn draw_line(&mut self, font: &FontVec, scale: PxScale, line: &str, x: f32, baseline: f32) {
        let sf = font.as_scaled(scale);
        let mut pen_x = x;
        let mut prev: Option<ab_glyph::GlyphId> = None;

        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = prev {
                pen_x += sf.kern(prev, id);
            }
            let glyph = Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            };
            pen_x += sf.h_advance(id);
            prev = Some(id);

            if let Some(outline) = font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                let color = self.text_color;
                let width = self.width as i32;
                let height = self.height as i32;
                let pixels = self.pixmap.pixels_mut();
                outline.draw(|gx, gy, coverage| {
                    let px = bounds.min.x as i32 + gx as i32;
                    let py = bounds.min.y as i32 + gy as i32;
                    if px < 0 || py < 0 || px >= width || py >= height || coverage <= 0.0 {
                        return;
                    }
                    let c = coverage.min(1.0);
                    let premul = tiny_skia::PremultipliedColorU8::from_rgba(
                        (color[0] as f32 * c) as u8,
                        (color[1] as f32 * c) as u8,
                        (color[2] as f32 * c) as u8,
                        255,
                    );
                    if let Some(premul) = premul {
                        pixels[(py * width + px) as usize] = premul;
                    }
                });
            }
        }
    }
}

fn line_width<SF: ScaleFont<F>, F: Font>(sf: &SF, line: &str) -> f32 {
    let mut width = 0.0;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for ch in line.chars() {
        let id = sf.font().glyph_id(ch);
        if let Some(prev) = prev {
            width += sf.kern(prev, id);
        }
        width += sf.h_advance(id);
        prev = Some(id);
    }
    width
}

fn load_font() -> Option<FontVec> {
    for path in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }
    warn!("no system font found; on-screen text will be skipped");
    None
}
