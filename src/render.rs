//! Style cascade and render traversal. Walks the scene depth-first without
//! mutating it and records draw commands on a [`Canvas`]; rendering the same
//! scene twice produces identical command streams.

use tracing::debug;

use crate::canvas::{Canvas, Document};
use crate::color::Paint;
use crate::matrix::Matrix;
use crate::paint::Brush;
use crate::path_data::{bounds, Segment};
use crate::scene::{Element, LineCap, LineJoin, RawStyle, Scene, Shape};
use crate::types::{Color, Pt, Shading, TextAnchor};

/// Font availability oracle. Rendering never fails on a missing font; the
/// catalog guarantees a final fallback.
pub trait FontCatalog {
    fn has_family(&self, family: &str) -> bool;
    /// Concrete family for `sans-serif`, `serif` or `monospace`, when one is
    /// installed.
    fn generic_family(&self, generic: &str) -> Option<String>;
    fn fallback_family(&self) -> String;
}

/// Walks a comma-separated family list: quotes stripped, generic keywords
/// mapped through the catalog, first installed family wins.
pub fn resolve_font_family(list: &str, fonts: &dyn FontCatalog) -> String {
    for raw in list.split(',') {
        let name = raw.trim().trim_matches('"').trim_matches('\'').trim();
        if name.is_empty() {
            continue;
        }
        let lower = name.to_ascii_lowercase();
        if matches!(lower.as_str(), "sans-serif" | "serif" | "monospace") {
            if let Some(family) = fonts.generic_family(&lower) {
                return family;
            }
            continue;
        }
        if fonts.has_family(name) {
            return name.to_string();
        }
    }
    debug!(list, "no requested font family installed, using fallback");
    fonts.fallback_family()
}

/// Effective style at one point of the walk. Paint and metric fields carry
/// override semantics; the alpha fields are running products, since opacity
/// composes multiplicatively down the tree instead of overriding.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleContext {
    pub fill: Paint,
    pub stroke: Paint,
    pub stroke_width: f32,
    pub fill_alpha: f32,
    pub stroke_alpha: f32,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub font_family: String,
    pub font_size: f32,
    pub text_anchor: TextAnchor,
}

impl Default for StyleContext {
    fn default() -> Self {
        StyleContext {
            fill: Paint::Solid(Color::BLACK),
            stroke: Paint::None,
            stroke_width: 1.0,
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            font_family: "sans-serif".to_string(),
            font_size: 16.0,
            text_anchor: TextAnchor::Start,
        }
    }
}

impl StyleContext {
    /// Composites one element's declared style over this context. Used for
    /// groups and leaves alike: a set field wins outright, an unset field
    /// inherits, and the opacities multiply in regardless.
    pub fn cascade(&self, style: &RawStyle) -> StyleContext {
        let opacity = style.opacity.unwrap_or(1.0);
        StyleContext {
            fill: style.fill.clone().unwrap_or_else(|| self.fill.clone()),
            stroke: style.stroke.clone().unwrap_or_else(|| self.stroke.clone()),
            stroke_width: style.stroke_width.unwrap_or(self.stroke_width),
            fill_alpha: self.fill_alpha * style.fill_opacity.unwrap_or(1.0) * opacity,
            stroke_alpha: self.stroke_alpha * style.stroke_opacity.unwrap_or(1.0) * opacity,
            line_cap: style.line_cap.unwrap_or(self.line_cap),
            line_join: style.line_join.unwrap_or(self.line_join),
            font_family: style
                .font_family
                .clone()
                .unwrap_or_else(|| self.font_family.clone()),
            font_size: style.font_size.unwrap_or(self.font_size),
            text_anchor: style.text_anchor.unwrap_or(self.text_anchor),
        }
    }
}

/// Records the whole scene into a command list. The scene is borrowed
/// immutably, so repeated renders are both safe and bit-identical.
pub fn render(scene: &Scene, fonts: &dyn FontCatalog) -> Document {
    let mut canvas = Canvas::new(scene.size);
    let ctx = StyleContext::default();
    for element in &scene.elements {
        // Scope each top-level subtree.
        canvas.save_state();
        draw_element(&mut canvas, scene, fonts, element, &ctx, &scene.view_matrix);
        canvas.restore_state();
    }
    canvas.finish()
}

fn draw_element(
    canvas: &mut Canvas,
    scene: &Scene,
    fonts: &dyn FontCatalog,
    element: &Element,
    ctx: &StyleContext,
    ctm: &Matrix,
) {
    let ctm = match &element.style.transform {
        Some(t) => ctm.mul(t),
        None => *ctm,
    };

    if let Shape::Group { children } = &element.shape {
        let child_ctx = ctx.cascade(&element.style);
        for child in children {
            draw_element(canvas, scene, fonts, child, &child_ctx, &ctm);
        }
        return;
    }

    let style = ctx.cascade(&element.style);
    match &element.shape {
        Shape::Text { x, y, text } => draw_text(canvas, fonts, &style, &ctm, *x, *y, text),
        shape => {
            let Some(segs) = shape.outline() else { return };
            if segs.is_empty() {
                return;
            }
            let evenodd = matches!(shape, Shape::Path { evenodd: true, .. });
            draw_shape(canvas, scene, &style, &ctm, &segs, evenodd);
        }
    }
}

enum FillPlan {
    Nothing,
    Solid(Color, f32),
    Shading(Shading),
}

/// Resolves the effective fill for a shape, going through the paint server
/// for gradient references. The bounding box is the shape's own, in local
/// coordinates, so the brush lands in the same space as the geometry.
fn resolve_fill(scene: &Scene, style: &StyleContext, segs: &[Segment]) -> FillPlan {
    let fallback = |color: Option<Color>| match color {
        Some(c) if style.fill_alpha > 0.0 => FillPlan::Solid(c, style.fill_alpha),
        _ => FillPlan::Nothing,
    };
    match &style.fill {
        Paint::None => FillPlan::Nothing,
        Paint::Solid(c) if style.fill_alpha > 0.0 => FillPlan::Solid(*c, style.fill_alpha),
        Paint::Solid(_) => FillPlan::Nothing,
        Paint::Gradient(id, fb) => {
            let Some(bbox) = bounds(segs) else {
                return fallback(*fb);
            };
            match scene.paints.brush(id, bbox, style.fill_alpha) {
                Some(Brush::Shading(shading)) => FillPlan::Shading(shading),
                Some(Brush::Solid { color, alpha }) if alpha > 0.0 => {
                    FillPlan::Solid(color, alpha)
                }
                Some(Brush::Solid { .. }) => FillPlan::Nothing,
                None => fallback(*fb),
            }
        }
    }
}

fn resolve_stroke(style: &StyleContext) -> Option<(Color, f32)> {
    if style.stroke_alpha <= 0.0 || style.stroke_width <= 0.0 {
        return None;
    }
    match &style.stroke {
        Paint::Solid(c) => Some((*c, style.stroke_alpha)),
        // Gradient strokes fall back to the declared fallback color.
        Paint::Gradient(_, Some(c)) => Some((*c, style.stroke_alpha)),
        Paint::Gradient(_, None) | Paint::None => None,
    }
}

fn draw_shape(
    canvas: &mut Canvas,
    scene: &Scene,
    style: &StyleContext,
    ctm: &Matrix,
    segs: &[Segment],
    evenodd: bool,
) {
    let fill = resolve_fill(scene, style, segs);
    let stroke = resolve_stroke(style);
    if matches!(fill, FillPlan::Nothing) && stroke.is_none() {
        // Invisible shapes issue no draw requests at all.
        return;
    }

    canvas.save_state();
    concat(canvas, ctm);
    if let Some((color, _)) = stroke {
        canvas.set_stroke_color(color);
        canvas.set_line_width(Pt::from_f32(style.stroke_width));
        canvas.set_line_cap(cap_code(style.line_cap));
        canvas.set_line_join(join_code(style.line_join));
    }
    let stroke_alpha = stroke.map_or(1.0, |(_, a)| a);

    match fill {
        FillPlan::Solid(color, alpha) => {
            canvas.set_fill_color(color);
            canvas.set_opacity(alpha, stroke_alpha);
            emit_path(canvas, segs);
            match (stroke.is_some(), evenodd) {
                (true, false) => canvas.fill_stroke(),
                (true, true) => canvas.fill_stroke_evenodd(),
                (false, false) => canvas.fill(),
                (false, true) => canvas.fill_evenodd(),
            }
        }
        FillPlan::Shading(shading) => {
            // Stop alphas already carry the fill opacity.
            canvas.set_opacity(1.0, stroke_alpha);
            canvas.save_state();
            emit_path(canvas, segs);
            canvas.clip_path(evenodd);
            canvas.shading_fill(shading);
            canvas.restore_state();
            if stroke.is_some() {
                emit_path(canvas, segs);
                canvas.stroke();
            }
        }
        FillPlan::Nothing => {
            canvas.set_opacity(1.0, stroke_alpha);
            emit_path(canvas, segs);
            canvas.stroke();
        }
    }
    canvas.restore_state();
}

fn draw_text(
    canvas: &mut Canvas,
    fonts: &dyn FontCatalog,
    style: &StyleContext,
    ctm: &Matrix,
    x: f32,
    y: f32,
    text: &str,
) {
    if text.is_empty() {
        return;
    }
    // Text carries solid fill only; gradient text falls back like strokes do.
    let color = match &style.fill {
        Paint::Solid(c) => *c,
        Paint::Gradient(_, Some(c)) => *c,
        Paint::Gradient(_, None) | Paint::None => return,
    };
    if style.fill_alpha <= 0.0 || style.font_size <= 0.0 {
        return;
    }

    canvas.save_state();
    concat(canvas, ctm);
    canvas.set_fill_color(color);
    canvas.set_opacity(style.fill_alpha, 1.0);
    canvas.set_font_name(&resolve_font_family(&style.font_family, fonts));
    canvas.set_font_size(Pt::from_f32(style.font_size));
    canvas.draw_string(Pt::from_f32(x), Pt::from_f32(y), text, style.text_anchor);
    canvas.restore_state();
}

fn concat(canvas: &mut Canvas, m: &Matrix) {
    canvas.concat_matrix(m.a, m.b, m.c, m.d, Pt::from_f32(m.e), Pt::from_f32(m.f));
}

fn cap_code(cap: LineCap) -> u8 {
    match cap {
        LineCap::Butt => 0,
        LineCap::Round => 1,
        LineCap::Square => 2,
    }
}

fn join_code(join: LineJoin) -> u8 {
    match join {
        LineJoin::Miter => 0,
        LineJoin::Round => 1,
        LineJoin::Bevel => 2,
    }
}

fn emit_path(canvas: &mut Canvas, segs: &[Segment]) {
    let q = Pt::from_f32;
    for seg in segs {
        match *seg {
            Segment::MoveTo { x, y } => canvas.move_to(q(x), q(y)),
            Segment::LineTo { x, y } => canvas.line_to(q(x), q(y)),
            Segment::CurveTo { x1, y1, x2, y2, x, y } => {
                canvas.curve_to(q(x1), q(y1), q(x2), q(y2), q(x), q(y))
            }
            Segment::Close => canvas.close_path(),
        }
    }
}
