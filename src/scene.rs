//! Typed scene model. The builder lowers markup into this tree; rendering
//! walks it without mutating it, so a scene can be drawn any number of times.

use crate::color::Paint;
use crate::matrix::Matrix;
use crate::path_data::Segment;
use crate::paint::PaintCatalog;
use crate::types::{Size, TextAnchor};

// Circular-arc cubic control distance for a quarter turn.
const KAPPA: f32 = 0.552_284_75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

/// Styling as written on one element. Every field is optional: `None` means
/// the attribute was absent and the inherited value applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStyle {
    pub fill: Option<Paint>,
    pub stroke: Option<Paint>,
    pub stroke_width: Option<f32>,
    pub fill_opacity: Option<f32>,
    pub stroke_opacity: Option<f32>,
    /// The `opacity` shorthand, folded into both paint opacities at cascade
    /// time.
    pub opacity: Option<f32>,
    pub line_cap: Option<LineCap>,
    pub line_join: Option<LineJoin>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub text_anchor: Option<TextAnchor>,
    pub transform: Option<Matrix>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line { x1: f32, y1: f32, x2: f32, y2: f32 },
    Rect { x: f32, y: f32, w: f32, h: f32, rx: f32, ry: f32 },
    Circle { cx: f32, cy: f32, r: f32 },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
    Polyline { points: Vec<(f32, f32)> },
    Polygon { points: Vec<(f32, f32)> },
    Path { segs: Vec<Segment>, evenodd: bool },
    Text { x: f32, y: f32, text: String },
    Group { children: Vec<Element> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub shape: Shape,
    pub style: RawStyle,
}

/// A parsed document: intrinsic size, the root element list, and the
/// gradient definitions referenced by `url(#id)` paints.
#[derive(Debug, Clone)]
pub struct Scene {
    pub size: Size,
    /// Maps viewBox space onto the viewport. Identity when no viewBox is
    /// given.
    pub view_matrix: Matrix,
    pub elements: Vec<Element>,
    pub paints: PaintCatalog,
}

impl Shape {
    /// Outline geometry in local coordinates. Text and groups have none;
    /// they are handled by their own draw paths.
    pub fn outline(&self) -> Option<Vec<Segment>> {
        match self {
            Shape::Line { x1, y1, x2, y2 } => Some(vec![
                Segment::MoveTo { x: *x1, y: *y1 },
                Segment::LineTo { x: *x2, y: *y2 },
            ]),
            Shape::Rect { x, y, w, h, rx, ry } => Some(rect_outline(*x, *y, *w, *h, *rx, *ry)),
            Shape::Circle { cx, cy, r } => Some(ellipse_outline(*cx, *cy, *r, *r)),
            Shape::Ellipse { cx, cy, rx, ry } => Some(ellipse_outline(*cx, *cy, *rx, *ry)),
            Shape::Polyline { points } => poly_outline(points, false),
            Shape::Polygon { points } => poly_outline(points, true),
            Shape::Path { segs, .. } => Some(segs.clone()),
            Shape::Text { .. } | Shape::Group { .. } => None,
        }
    }
}

fn rect_outline(x: f32, y: f32, w: f32, h: f32, rx: f32, ry: f32) -> Vec<Segment> {
    // Corner radii clamp to half the extent; zero radii give a plain rect.
    let rx = rx.max(0.0).min(w / 2.0);
    let ry = ry.max(0.0).min(h / 2.0);
    if rx == 0.0 || ry == 0.0 {
        return vec![
            Segment::MoveTo { x, y },
            Segment::LineTo { x: x + w, y },
            Segment::LineTo { x: x + w, y: y + h },
            Segment::LineTo { x, y: y + h },
            Segment::Close,
        ];
    }
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    vec![
        Segment::MoveTo { x: x + rx, y },
        Segment::LineTo { x: x + w - rx, y },
        Segment::CurveTo {
            x1: x + w - rx + kx,
            y1: y,
            x2: x + w,
            y2: y + ry - ky,
            x: x + w,
            y: y + ry,
        },
        Segment::LineTo { x: x + w, y: y + h - ry },
        Segment::CurveTo {
            x1: x + w,
            y1: y + h - ry + ky,
            x2: x + w - rx + kx,
            y2: y + h,
            x: x + w - rx,
            y: y + h,
        },
        Segment::LineTo { x: x + rx, y: y + h },
        Segment::CurveTo {
            x1: x + rx - kx,
            y1: y + h,
            x2: x,
            y2: y + h - ry + ky,
            x,
            y: y + h - ry,
        },
        Segment::LineTo { x, y: y + ry },
        Segment::CurveTo {
            x1: x,
            y1: y + ry - ky,
            x2: x + rx - kx,
            y2: y,
            x: x + rx,
            y,
        },
        Segment::Close,
    ]
}

fn ellipse_outline(cx: f32, cy: f32, rx: f32, ry: f32) -> Vec<Segment> {
    let kx = rx * KAPPA;
    let ky = ry * KAPPA;
    vec![
        Segment::MoveTo { x: cx + rx, y: cy },
        Segment::CurveTo {
            x1: cx + rx,
            y1: cy + ky,
            x2: cx + kx,
            y2: cy + ry,
            x: cx,
            y: cy + ry,
        },
        Segment::CurveTo {
            x1: cx - kx,
            y1: cy + ry,
            x2: cx - rx,
            y2: cy + ky,
            x: cx - rx,
            y: cy,
        },
        Segment::CurveTo {
            x1: cx - rx,
            y1: cy - ky,
            x2: cx - kx,
            y2: cy - ry,
            x: cx,
            y: cy - ry,
        },
        Segment::CurveTo {
            x1: cx + kx,
            y1: cy - ry,
            x2: cx + rx,
            y2: cy - ky,
            x: cx + rx,
            y: cy,
        },
        Segment::Close,
    ]
}

fn poly_outline(points: &[(f32, f32)], close: bool) -> Option<Vec<Segment>> {
    let (&(x0, y0), rest) = points.split_first()?;
    let mut segs = Vec::with_capacity(points.len() + 1);
    segs.push(Segment::MoveTo { x: x0, y: y0 });
    for &(x, y) in rest {
        segs.push(Segment::LineTo { x, y });
    }
    if close {
        segs.push(Segment::Close);
    }
    Some(segs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_without_radii_is_four_corners() {
        let segs = rect_outline(1.0, 2.0, 10.0, 5.0, 0.0, 0.0);
        assert_eq!(segs.len(), 5);
        assert_eq!(segs[0], Segment::MoveTo { x: 1.0, y: 2.0 });
        assert_eq!(segs[2], Segment::LineTo { x: 11.0, y: 7.0 });
        assert_eq!(segs[4], Segment::Close);
    }

    #[test]
    fn rect_radii_clamp_to_half_extent() {
        let segs = rect_outline(0.0, 0.0, 10.0, 10.0, 100.0, 100.0);
        // Clamped to 5: the first point sits at the top edge midpoint.
        assert_eq!(segs[0], Segment::MoveTo { x: 5.0, y: 0.0 });
    }

    #[test]
    fn circle_outline_is_four_cubics() {
        let segs = ellipse_outline(0.0, 0.0, 10.0, 10.0);
        let curves = segs
            .iter()
            .filter(|s| matches!(s, Segment::CurveTo { .. }))
            .count();
        assert_eq!(curves, 4);
        assert_eq!(segs[0], Segment::MoveTo { x: 10.0, y: 0.0 });
    }

    #[test]
    fn polygon_closes_polyline_does_not() {
        let pts = vec![(0.0, 0.0), (10.0, 0.0), (5.0, 8.0)];
        let open = Shape::Polyline { points: pts.clone() }.outline().unwrap();
        let closed = Shape::Polygon { points: pts }.outline().unwrap();
        assert!(!open.contains(&Segment::Close));
        assert_eq!(*closed.last().unwrap(), Segment::Close);
    }

    #[test]
    fn empty_points_yield_no_outline() {
        assert_eq!(Shape::Polyline { points: vec![] }.outline(), None);
    }
}
