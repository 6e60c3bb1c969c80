//! Raster backend: executes a recorded [`Document`] into a
//! `tiny_skia::Pixmap`. Text goes through `fontdb` for discovery and
//! `ttf-parser` for outlines, with a simple unshaped advance layout.

use tiny_skia::{
    FillRule, GradientStop, LinearGradient, Mask, Paint, Path, PathBuilder, Pixmap, Point,
    RadialGradient, Shader, SpreadMode, Stroke, Transform,
};
use tracing::debug;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::canvas::{Command, Document};
use crate::render::FontCatalog;
use crate::types::{Color, Shading, ShadingStop, Spread, TextAnchor};

#[derive(Clone)]
struct RasterState {
    transform: Transform,
    fill_color: Color,
    stroke_color: Color,
    line_width: f32,
    line_cap: u8,
    line_join: u8,
    fill_opacity: f32,
    stroke_opacity: f32,
    font_name: String,
    font_size: f32,
    clip_mask: Option<Mask>,
}

impl Default for RasterState {
    fn default() -> Self {
        RasterState {
            transform: Transform::identity(),
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            fill_opacity: 1.0,
            stroke_opacity: 1.0,
            font_name: String::new(),
            font_size: 16.0,
            clip_mask: None,
        }
    }
}

/// Font lookup over the system database. Build once and reuse; loading the
/// system font list is the expensive part.
pub struct SystemFontCatalog {
    db: fontdb::Database,
}

impl SystemFontCatalog {
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        SystemFontCatalog { db }
    }

    /// Catalog over explicit font files, for hermetic rendering.
    pub fn from_fonts_dir(dir: &std::path::Path) -> Self {
        let mut db = fontdb::Database::new();
        db.load_fonts_dir(dir);
        SystemFontCatalog { db }
    }

    fn query(&self, family: fontdb::Family) -> Option<fontdb::ID> {
        self.db.query(&fontdb::Query { families: &[family], ..Default::default() })
    }

    fn family_name(&self, id: fontdb::ID) -> Option<String> {
        self.db
            .face(id)
            .and_then(|info| info.families.first().map(|(name, _)| name.clone()))
    }
}

impl Default for SystemFontCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FontCatalog for SystemFontCatalog {
    fn has_family(&self, family: &str) -> bool {
        self.query(fontdb::Family::Name(family)).is_some()
    }

    fn generic_family(&self, generic: &str) -> Option<String> {
        let family = match generic {
            "sans-serif" => fontdb::Family::SansSerif,
            "serif" => fontdb::Family::Serif,
            "monospace" => fontdb::Family::Monospace,
            _ => return None,
        };
        self.query(family).and_then(|id| self.family_name(id))
    }

    fn fallback_family(&self) -> String {
        self.query(fontdb::Family::SansSerif)
            .or_else(|| self.db.faces().next().map(|info| info.id))
            .and_then(|id| self.family_name(id))
            .unwrap_or_else(|| "sans-serif".to_string())
    }
}

/// Renders the command list at `scale` device pixels per user unit.
/// `None` when the document size is unknown or the pixmap cannot be
/// allocated.
pub fn rasterize(doc: &Document, scale: f32, fonts: &SystemFontCatalog) -> Option<Pixmap> {
    let width = (doc.size.width * scale).ceil() as u32;
    let height = (doc.size.height * scale).ceil() as u32;
    if width == 0 || height == 0 {
        debug!(size = ?doc.size, "document has no rasterizable size");
        return None;
    }
    let mut pixmap = Pixmap::new(width, height)?;
    let base = Transform::from_scale(scale, scale);

    let mut state = RasterState::default();
    let mut stack: Vec<RasterState> = Vec::new();
    let mut pb = PathBuilder::new();
    let mut has_path = false;

    for cmd in &doc.commands {
        match cmd {
            Command::SaveState => stack.push(state.clone()),
            Command::RestoreState => {
                if let Some(restored) = stack.pop() {
                    state = restored;
                }
            }
            Command::ConcatMatrix { a, b, c, d, e, f } => {
                state.transform = state.transform.post_concat(Transform::from_row(
                    *a,
                    *b,
                    *c,
                    *d,
                    e.to_f32(),
                    f.to_f32(),
                ));
            }
            Command::SetFillColor(color) => state.fill_color = *color,
            Command::SetStrokeColor(color) => state.stroke_color = *color,
            Command::SetLineWidth(width) => state.line_width = width.to_f32().max(0.0),
            Command::SetLineCap(cap) => state.line_cap = *cap,
            Command::SetLineJoin(join) => state.line_join = *join,
            Command::SetOpacity { fill, stroke } => {
                state.fill_opacity = fill.clamp(0.0, 1.0);
                state.stroke_opacity = stroke.clamp(0.0, 1.0);
            }
            Command::SetFontName(name) => state.font_name = name.clone(),
            Command::SetFontSize(size) => state.font_size = size.to_f32(),
            Command::ClipPath { evenodd } => {
                if let Some(path) = take_path(&mut pb, &mut has_path) {
                    let rule = if *evenodd { FillRule::EvenOdd } else { FillRule::Winding };
                    apply_clip_path(
                        &mut state,
                        &path,
                        rule,
                        base,
                        pixmap.width(),
                        pixmap.height(),
                    );
                }
            }
            Command::ShadingFill(shading) => {
                draw_shading_fill(&mut pixmap, shading, &state, base);
            }
            Command::MoveTo { x, y } => {
                pb.move_to(x.to_f32(), y.to_f32());
                has_path = true;
            }
            Command::LineTo { x, y } => {
                pb.line_to(x.to_f32(), y.to_f32());
                has_path = true;
            }
            Command::CurveTo { x1, y1, x2, y2, x, y } => {
                pb.cubic_to(
                    x1.to_f32(),
                    y1.to_f32(),
                    x2.to_f32(),
                    y2.to_f32(),
                    x.to_f32(),
                    y.to_f32(),
                );
                has_path = true;
            }
            Command::ClosePath => {
                if has_path {
                    pb.close();
                }
            }
            Command::Fill => {
                fill_current_path(&mut pixmap, &state, &mut pb, &mut has_path, FillRule::Winding, base);
            }
            Command::FillEvenOdd => {
                fill_current_path(&mut pixmap, &state, &mut pb, &mut has_path, FillRule::EvenOdd, base);
            }
            Command::Stroke => {
                stroke_current_path(&mut pixmap, &state, &mut pb, &mut has_path, base);
            }
            Command::FillStroke => {
                fill_stroke_current_path(&mut pixmap, &state, &mut pb, &mut has_path, FillRule::Winding, base);
            }
            Command::FillStrokeEvenOdd => {
                fill_stroke_current_path(&mut pixmap, &state, &mut pb, &mut has_path, FillRule::EvenOdd, base);
            }
            Command::DrawString { x, y, text, anchor } => {
                draw_string(
                    &mut pixmap,
                    &state,
                    fonts,
                    x.to_f32(),
                    y.to_f32(),
                    text,
                    *anchor,
                    base,
                );
            }
        }
    }

    Some(pixmap)
}

/// Convenience wrapper: rasterize and PNG-encode in one step.
pub fn to_png(doc: &Document, scale: f32, fonts: &SystemFontCatalog) -> Option<Vec<u8>> {
    let pixmap = rasterize(doc, scale, fonts)?;
    match pixmap.encode_png() {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            debug!(%err, "png encoding failed");
            None
        }
    }
}

fn take_path(pb: &mut PathBuilder, has_path: &mut bool) -> Option<Path> {
    if !*has_path {
        return None;
    }
    *has_path = false;
    std::mem::take(pb).finish()
}

fn fill_current_path(
    pixmap: &mut Pixmap,
    state: &RasterState,
    pb: &mut PathBuilder,
    has_path: &mut bool,
    rule: FillRule,
    base: Transform,
) {
    let Some(path) = take_path(pb, has_path) else {
        return;
    };
    let paint = solid_paint(state.fill_color, state.fill_opacity);
    pixmap.fill_path(
        &path,
        &paint,
        rule,
        base.pre_concat(state.transform),
        state.clip_mask.as_ref(),
    );
}

fn stroke_current_path(
    pixmap: &mut Pixmap,
    state: &RasterState,
    pb: &mut PathBuilder,
    has_path: &mut bool,
    base: Transform,
) {
    let Some(path) = take_path(pb, has_path) else {
        return;
    };
    let paint = solid_paint(state.stroke_color, state.stroke_opacity);
    let stroke = build_stroke(state);
    pixmap.stroke_path(
        &path,
        &paint,
        &stroke,
        base.pre_concat(state.transform),
        state.clip_mask.as_ref(),
    );
}

fn fill_stroke_current_path(
    pixmap: &mut Pixmap,
    state: &RasterState,
    pb: &mut PathBuilder,
    has_path: &mut bool,
    rule: FillRule,
    base: Transform,
) {
    let Some(path) = take_path(pb, has_path) else {
        return;
    };
    let ts = base.pre_concat(state.transform);
    let fill = solid_paint(state.fill_color, state.fill_opacity);
    pixmap.fill_path(&path, &fill, rule, ts, state.clip_mask.as_ref());
    let stroke_paint = solid_paint(state.stroke_color, state.stroke_opacity);
    let stroke = build_stroke(state);
    pixmap.stroke_path(&path, &stroke_paint, &stroke, ts, state.clip_mask.as_ref());
}

fn apply_clip_path(
    state: &mut RasterState,
    path: &Path,
    rule: FillRule,
    base: Transform,
    width: u32,
    height: u32,
) {
    let ts = base.pre_concat(state.transform);
    if let Some(mask) = state.clip_mask.as_mut() {
        mask.intersect_path(path, rule, true, ts);
        return;
    }
    let Some(mut mask) = Mask::new(width, height) else {
        return;
    };
    mask.fill_path(path, rule, true, ts);
    state.clip_mask = Some(mask);
}

fn draw_shading_fill(pixmap: &mut Pixmap, shading: &Shading, state: &RasterState, base: Transform) {
    // The shading is clipped to the shape by the preceding ClipPath, so
    // painting a surface-sized rect is enough.
    let w = pixmap.width() as f32;
    let h = pixmap.height() as f32;
    let Some(rect) = tiny_skia::Rect::from_xywh(0.0, 0.0, w, h) else {
        return;
    };
    // Shading geometry was recorded in the shape's local space; the current
    // transform carries it into device pixels through the shader transform,
    // while the covering rect itself stays in device space.
    let ts = base.pre_concat(state.transform);
    let Some(shader) = build_shading_shader(shading, ts) else {
        return;
    };
    let mut paint = Paint::default();
    paint.shader = shader;
    paint.anti_alias = true;
    let path = PathBuilder::from_rect(rect);
    pixmap.fill_path(
        &path,
        &paint,
        FillRule::Winding,
        Transform::identity(),
        state.clip_mask.as_ref(),
    );
}

fn build_shading_shader(shading: &Shading, ts: Transform) -> Option<Shader<'static>> {
    match shading {
        Shading::Axial { x0, y0, x1, y1, spread, stops } => LinearGradient::new(
            Point::from_xy(*x0, *y0),
            Point::from_xy(*x1, *y1),
            shading_stops(stops),
            spread_mode(*spread),
            ts,
        ),
        Shading::Radial { x0, y0, r0, x1, y1, r1, spread, stops } => RadialGradient::new(
            Point::from_xy(*x0, *y0),
            Point::from_xy(*x1, *y1),
            (*r1 - *r0).abs().max(0.0001),
            shading_stops(stops),
            spread_mode(*spread),
            ts,
        ),
    }
}

fn spread_mode(spread: Spread) -> SpreadMode {
    match spread {
        Spread::Pad => SpreadMode::Pad,
        Spread::Reflect => SpreadMode::Reflect,
        Spread::Repeat => SpreadMode::Repeat,
    }
}

fn shading_stops(stops: &[ShadingStop]) -> Vec<GradientStop> {
    stops
        .iter()
        .map(|stop| GradientStop::new(stop.offset.clamp(0.0, 1.0), to_sk_color(stop.color, stop.alpha)))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn draw_string(
    pixmap: &mut Pixmap,
    state: &RasterState,
    fonts: &SystemFontCatalog,
    x: f32,
    y: f32,
    text: &str,
    anchor: TextAnchor,
    base: Transform,
) {
    let Some(id) = fonts
        .query(fontdb::Family::Name(&state.font_name))
        .or_else(|| fonts.query(fontdb::Family::SansSerif))
    else {
        debug!(family = %state.font_name, "no usable font face for text run");
        return;
    };

    let ts = base.pre_concat(state.transform);
    let paint = solid_paint(state.fill_color, state.fill_opacity);
    let clip = state.clip_mask.as_ref();
    let font_size = state.font_size;

    fonts.db.with_face_data(id, |data, index| {
        let Ok(face) = Face::parse(data, index) else {
            debug!("font face failed to parse");
            return;
        };
        let upem = face.units_per_em() as f32;
        if upem <= 0.0 || font_size <= 0.0 {
            return;
        }
        let scale = font_size / upem;

        // Unshaped layout: one glyph per char, advance by the font metric.
        let mut run = Vec::with_capacity(text.chars().count());
        let mut width = 0.0f32;
        for ch in text.chars() {
            let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
            run.push((gid, width));
            width += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
        }
        // The recorded origin is the baseline start; the anchor shifts it.
        let origin_x = match anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - width / 2.0,
            TextAnchor::End => x - width,
        };

        for (gid, dx) in run {
            let mut builder = GlyphPathBuilder::new(origin_x + dx, y, scale);
            if face.outline_glyph(gid, &mut builder).is_some() {
                if let Some(path) = builder.finish() {
                    pixmap.fill_path(&path, &paint, FillRule::Winding, ts, clip);
                }
            }
        }
    });
}

/// Builds a glyph outline in surface coordinates. Font units are y-up;
/// the surface is y-down from the baseline origin.
struct GlyphPathBuilder {
    pb: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        GlyphPathBuilder { pb: PathBuilder::new(), origin_x, origin_y, scale }
    }

    fn px(&self, x: f32) -> f32 {
        self.origin_x + x * self.scale
    }

    fn py(&self, y: f32) -> f32 {
        self.origin_y - y * self.scale
    }

    fn finish(self) -> Option<Path> {
        self.pb.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.pb.move_to(self.px(x), self.py(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.pb.line_to(self.px(x), self.py(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.pb.quad_to(self.px(x1), self.py(y1), self.px(x), self.py(y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.pb.cubic_to(
            self.px(x1),
            self.py(y1),
            self.px(x2),
            self.py(y2),
            self.px(x),
            self.py(y),
        );
    }

    fn close(&mut self) {
        self.pb.close();
    }
}

fn build_stroke(state: &RasterState) -> Stroke {
    let mut stroke = Stroke {
        width: state.line_width.max(0.01),
        ..Stroke::default()
    };
    stroke.line_cap = match state.line_cap {
        1 => tiny_skia::LineCap::Round,
        2 => tiny_skia::LineCap::Square,
        _ => tiny_skia::LineCap::Butt,
    };
    stroke.line_join = match state.line_join {
        1 => tiny_skia::LineJoin::Round,
        2 => tiny_skia::LineJoin::Bevel,
        _ => tiny_skia::LineJoin::Miter,
    };
    stroke
}

fn solid_paint(color: Color, opacity: f32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color, opacity));
    paint.anti_alias = true;
    paint
}

fn to_sk_color(color: Color, opacity: f32) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(
        color.r.clamp(0.0, 1.0),
        color.g.clamp(0.0, 1.0),
        color.b.clamp(0.0, 1.0),
        opacity.clamp(0.0, 1.0),
    )
    .unwrap_or(tiny_skia::Color::BLACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::types::{Pt, Size};

    fn empty_fonts() -> SystemFontCatalog {
        SystemFontCatalog { db: fontdb::Database::new() }
    }

    fn rect_path(canvas: &mut Canvas, x: f32, y: f32, w: f32, h: f32) {
        let q = Pt::from_f32;
        canvas.move_to(q(x), q(y));
        canvas.line_to(q(x + w), q(y));
        canvas.line_to(q(x + w), q(y + h));
        canvas.line_to(q(x), q(y + h));
        canvas.close_path();
    }

    #[test]
    fn filled_rect_touches_expected_pixels() {
        let mut canvas = Canvas::new(Size { width: 10.0, height: 10.0 });
        canvas.set_fill_color(Color::rgb(1.0, 0.0, 0.0));
        rect_path(&mut canvas, 2.0, 2.0, 4.0, 4.0);
        canvas.fill();
        let pixmap = rasterize(&canvas.finish(), 1.0, &empty_fonts()).unwrap();

        let inside = pixmap.pixel(4, 4).unwrap();
        assert!(inside.red() > 200 && inside.green() < 30);
        let outside = pixmap.pixel(9, 9).unwrap();
        assert_eq!(outside.alpha(), 0);
    }

    #[test]
    fn concat_matrix_offsets_geometry() {
        let mut canvas = Canvas::new(Size { width: 10.0, height: 10.0 });
        canvas.set_fill_color(Color::BLACK);
        canvas.save_state();
        canvas.concat_matrix(1.0, 0.0, 0.0, 1.0, Pt::from_f32(5.0), Pt::from_f32(0.0));
        rect_path(&mut canvas, 0.0, 0.0, 3.0, 3.0);
        canvas.fill();
        canvas.restore_state();
        let pixmap = rasterize(&canvas.finish(), 1.0, &empty_fonts()).unwrap();

        assert!(pixmap.pixel(6, 1).unwrap().alpha() > 0);
        assert_eq!(pixmap.pixel(1, 1).unwrap().alpha(), 0);
    }

    #[test]
    fn shading_fill_respects_clip() {
        let mut canvas = Canvas::new(Size { width: 10.0, height: 10.0 });
        canvas.save_state();
        rect_path(&mut canvas, 0.0, 0.0, 5.0, 10.0);
        canvas.clip_path(false);
        canvas.shading_fill(Shading::Axial {
            x0: 0.0,
            y0: 0.0,
            x1: 10.0,
            y1: 0.0,
            spread: Spread::Pad,
            stops: vec![
                ShadingStop { offset: 0.0, color: Color::rgb(1.0, 0.0, 0.0), alpha: 1.0 },
                ShadingStop { offset: 1.0, color: Color::rgb(0.0, 0.0, 1.0), alpha: 1.0 },
            ],
        });
        canvas.restore_state();
        let pixmap = rasterize(&canvas.finish(), 1.0, &empty_fonts()).unwrap();

        assert!(pixmap.pixel(2, 5).unwrap().red() > 100, "inside the clip");
        assert_eq!(pixmap.pixel(8, 5).unwrap().alpha(), 0, "outside the clip");
    }

    #[test]
    fn unknown_size_does_not_rasterize() {
        let canvas = Canvas::new(Size { width: 0.0, height: 0.0 });
        assert!(rasterize(&canvas.finish(), 1.0, &empty_fonts()).is_none());
    }

    #[test]
    fn missing_font_skips_text_quietly() {
        let mut canvas = Canvas::new(Size { width: 10.0, height: 10.0 });
        canvas.set_font_name("Nonexistent");
        canvas.set_font_size(Pt::from_f32(8.0));
        canvas.draw_string(Pt::from_f32(1.0), Pt::from_f32(8.0), "hi", TextAnchor::Start);
        assert!(rasterize(&canvas.finish(), 1.0, &empty_fonts()).is_some());
    }
}
