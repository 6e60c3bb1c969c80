//! Gradient paint server. Holds the gradient definitions collected at build
//! time, resolves `href` inheritance once, and synthesizes concrete brushes
//! for draw requests on demand.

use std::collections::HashMap;

use tracing::debug;

use crate::matrix::Matrix;
use crate::types::{Color, Shading, ShadingStop, Spread};

/// A gradient coordinate as written: percentages stay marked, because a
/// percentage means "fraction of the bounding box" even in user-space units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub v: f32,
    pub percent: bool,
}

impl Coord {
    pub fn number(v: f32) -> Self {
        Coord { v, percent: false }
    }

    pub fn fraction(v: f32) -> Self {
        Coord { v, percent: true }
    }

    pub fn parse(input: &str) -> Option<Coord> {
        let s = input.trim();
        if let Some(p) = s.strip_suffix('%') {
            let v = p.trim().parse::<f32>().ok()?;
            return v.is_finite().then(|| Coord::fraction(v / 100.0));
        }
        crate::color::parse_number(s).map(Coord::number)
    }

    /// User-space value: percentages resolve against the bounding box even
    /// here, plain numbers are taken as written.
    fn to_user(self, origin: f32, len: f32) -> f32 {
        if self.percent {
            origin + self.v * len
        } else {
            self.v
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientUnits {
    UserSpaceOnUse,
    #[default]
    ObjectBoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Already clamped to 0..=1 at parse time.
    pub offset: f32,
    pub color: Color,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

/// One gradient definition. Geometry and attributes are `Option` so that
/// `href` inheritance can tell "absent" from "explicitly the default".
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub x1: Option<Coord>,
    pub y1: Option<Coord>,
    pub x2: Option<Coord>,
    pub y2: Option<Coord>,
    pub cx: Option<Coord>,
    pub cy: Option<Coord>,
    pub r: Option<Coord>,
    pub fx: Option<Coord>,
    pub fy: Option<Coord>,
    pub units: Option<GradientUnits>,
    pub spread: Option<Spread>,
    pub transform: Option<Matrix>,
    pub href: Option<String>,
    pub stops: Vec<GradientStop>,
}

impl Gradient {
    pub fn new(kind: GradientKind) -> Self {
        Gradient {
            kind,
            x1: None,
            y1: None,
            x2: None,
            y2: None,
            cx: None,
            cy: None,
            r: None,
            fx: None,
            fy: None,
            units: None,
            spread: None,
            transform: None,
            href: None,
            stops: Vec::new(),
        }
    }

    /// Fills every field this gradient left unset from `parent`. Stops are
    /// inherited wholesale, and only when this gradient declares none.
    fn inherit_from(&mut self, parent: &Gradient) {
        fn fill<T: Clone>(slot: &mut Option<T>, v: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(v);
            }
        }
        fill(&mut self.x1, &parent.x1);
        fill(&mut self.y1, &parent.y1);
        fill(&mut self.x2, &parent.x2);
        fill(&mut self.y2, &parent.y2);
        fill(&mut self.cx, &parent.cx);
        fill(&mut self.cy, &parent.cy);
        fill(&mut self.r, &parent.r);
        fill(&mut self.fx, &parent.fx);
        fill(&mut self.fy, &parent.fy);
        fill(&mut self.units, &parent.units);
        fill(&mut self.spread, &parent.spread);
        fill(&mut self.transform, &parent.transform);
        if self.stops.is_empty() {
            self.stops = parent.stops.clone();
        }
    }
}

/// Bound on `href` chain walking; cycles and absurd chains both stop here.
const MAX_HREF_DEPTH: usize = 10;

/// Extended pad domain never grows past this many axis lengths either side.
const MAX_PAD_EXTENT: f32 = 50.0;

#[derive(Debug, Clone, Default)]
pub struct PaintCatalog {
    gradients: HashMap<String, Gradient>,
}

/// What a gradient reference resolves to for one draw request.
#[derive(Debug, Clone, PartialEq)]
pub enum Brush {
    /// The gradient degenerated to a single color (zero-length axis).
    Solid { color: Color, alpha: f32 },
    Shading(Shading),
}

impl PaintCatalog {
    pub fn insert(&mut self, id: String, gradient: Gradient) {
        self.gradients.insert(id, gradient);
    }

    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Gradient> {
        self.gradients.get(id)
    }

    /// Applies `href` inheritance to every gradient. Run once after build;
    /// `brush` assumes chains are already flattened.
    pub fn resolve(&mut self) {
        let snapshot = self.gradients.clone();
        for gradient in self.gradients.values_mut() {
            let mut next = gradient.href.clone();
            for _ in 0..MAX_HREF_DEPTH {
                let Some(id) = next else { break };
                let Some(parent) = snapshot.get(&id) else {
                    debug!(href = %id, "gradient href target missing");
                    break;
                };
                gradient.inherit_from(parent);
                next = parent.href.clone();
            }
        }
    }

    /// Materializes the gradient `id` for a shape with the given local-space
    /// bounding box. `opacity` is the cascaded paint opacity, folded into
    /// every stop. `None` means the reference cannot produce a brush and the
    /// caller should fall back.
    pub fn brush(&self, id: &str, bbox: (f32, f32, f32, f32), opacity: f32) -> Option<Brush> {
        let (bx, by, bw, bh) = bbox;
        if !(bx.is_finite() && by.is_finite() && bw.is_finite() && bh.is_finite()) {
            return None;
        }
        let gradient = self.gradients.get(id).or_else(|| {
            debug!(id, "gradient reference unresolved");
            None
        })?;
        let stops = normalize_stops(&gradient.stops, opacity)?;
        let units = gradient.units.unwrap_or_default();
        let spread = gradient.spread.unwrap_or(Spread::Pad);
        let transform = gradient.transform.unwrap_or_else(Matrix::identity);

        match gradient.kind {
            GradientKind::Linear => {
                linear_brush(gradient, &transform, units, spread, stops, bbox)
            }
            GradientKind::Radial => {
                radial_brush(gradient, &transform, units, spread, stops, bbox)
            }
        }
    }
}

/// Clamps, sorts, and closes the stop list so it spans exactly 0..=1.
/// Boundary stops are synthesized by duplicating the nearest declared color.
fn normalize_stops(stops: &[GradientStop], opacity: f32) -> Option<Vec<ShadingStop>> {
    if stops.is_empty() {
        return None;
    }
    let mut out: Vec<ShadingStop> = stops
        .iter()
        .map(|s| ShadingStop {
            offset: s.offset.clamp(0.0, 1.0),
            color: s.color,
            alpha: (s.opacity * opacity).clamp(0.0, 1.0),
        })
        .collect();
    out.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    if out[0].offset > 0.0 {
        let first = out[0];
        out.insert(0, ShadingStop { offset: 0.0, ..first });
    }
    if out[out.len() - 1].offset < 1.0 {
        let last = out[out.len() - 1];
        out.push(ShadingStop { offset: 1.0, ..last });
    }
    Some(out)
}

/// Unit square onto the shape's bounding box.
fn bbox_matrix(bx: f32, by: f32, bw: f32, bh: f32) -> Matrix {
    Matrix { a: bw, b: 0.0, c: 0.0, d: bh, e: bx, f: by }
}

fn linear_brush(
    g: &Gradient,
    transform: &Matrix,
    units: GradientUnits,
    spread: Spread,
    mut stops: Vec<ShadingStop>,
    (bx, by, bw, bh): (f32, f32, f32, f32),
) -> Option<Brush> {
    let ux1 = g.x1.unwrap_or(Coord::fraction(0.0));
    let uy1 = g.y1.unwrap_or(Coord::fraction(0.0));
    let ux2 = g.x2.unwrap_or(Coord::fraction(1.0));
    let uy2 = g.y2.unwrap_or(Coord::fraction(0.0));
    // gradientTransform acts in gradient space, before the bounding-box
    // mapping.
    let ((x1, y1), (x2, y2)) = match units {
        GradientUnits::ObjectBoundingBox => {
            let m = bbox_matrix(bx, by, bw, bh).mul(transform);
            (m.apply(ux1.v, uy1.v), m.apply(ux2.v, uy2.v))
        }
        GradientUnits::UserSpaceOnUse => (
            transform.apply(ux1.to_user(bx, bw), uy1.to_user(by, bh)),
            transform.apply(ux2.to_user(bx, bw), uy2.to_user(by, bh)),
        ),
    };

    let dx = x2 - x1;
    let dy = y2 - y1;
    let len2 = dx * dx + dy * dy;
    if !len2.is_finite() {
        return None;
    }
    if len2 <= f32::EPSILON {
        // Zero-length axis paints the last stop everywhere.
        let last = stops[stops.len() - 1];
        return Some(Brush::Solid { color: last.color, alpha: last.alpha });
    }

    if spread == Spread::Pad {
        // Extend the domain so the brush covers the whole shape: project the
        // bbox corners onto the axis and pad the stop list with solid ends.
        let mut lo = 0.0f32;
        let mut hi = 1.0f32;
        for (cx, cy) in [
            (bx, by),
            (bx + bw, by),
            (bx, by + bh),
            (bx + bw, by + bh),
        ] {
            let t = ((cx - x1) * dx + (cy - y1) * dy) / len2;
            if t.is_finite() {
                lo = lo.min(t);
                hi = hi.max(t);
            }
        }
        let margin = (hi - lo) * 0.05;
        lo = (lo - margin).max(-MAX_PAD_EXTENT);
        hi = (hi + margin).min(MAX_PAD_EXTENT);
        if hi - lo > 1.0 + f32::EPSILON {
            let span = hi - lo;
            for stop in &mut stops {
                stop.offset = (stop.offset - lo) / span;
            }
            let first = stops[0];
            let last = stops[stops.len() - 1];
            stops.insert(0, ShadingStop { offset: 0.0, ..first });
            stops.push(ShadingStop { offset: 1.0, ..last });
            return Some(Brush::Shading(Shading::Axial {
                x0: x1 + lo * dx,
                y0: y1 + lo * dy,
                x1: x1 + hi * dx,
                y1: y1 + hi * dy,
                spread,
                stops,
            }));
        }
    }

    Some(Brush::Shading(Shading::Axial { x0: x1, y0: y1, x1: x2, y1: y2, spread, stops }))
}

fn radial_brush(
    g: &Gradient,
    transform: &Matrix,
    units: GradientUnits,
    spread: Spread,
    stops: Vec<ShadingStop>,
    (bx, by, bw, bh): (f32, f32, f32, f32),
) -> Option<Brush> {
    // Radius fractions scale with the smaller bbox extent.
    let min_extent = bw.abs().min(bh.abs());
    let rc = g.r.unwrap_or(Coord::fraction(0.5));
    let ((cx, cy), (fx, fy), r) = match units {
        GradientUnits::ObjectBoundingBox => {
            // gradientTransform acts in gradient space, before the
            // bounding-box mapping.
            let m = bbox_matrix(bx, by, bw, bh).mul(transform);
            let ucx = g.cx.unwrap_or(Coord::fraction(0.5)).v;
            let ucy = g.cy.unwrap_or(Coord::fraction(0.5)).v;
            // Focal point defaults to the center.
            let ufx = g.fx.map_or(ucx, |c| c.v);
            let ufy = g.fy.map_or(ucy, |c| c.v);
            let r = rc.v * min_extent * transform.scale_factor();
            (m.apply(ucx, ucy), m.apply(ufx, ufy), r)
        }
        GradientUnits::UserSpaceOnUse => {
            let cx = g.cx.unwrap_or(Coord::fraction(0.5)).to_user(bx, bw);
            let cy = g.cy.unwrap_or(Coord::fraction(0.5)).to_user(by, bh);
            let fx = g.fx.map_or(cx, |c| c.to_user(bx, bw));
            let fy = g.fy.map_or(cy, |c| c.to_user(by, bh));
            let r = if rc.percent { rc.v * min_extent } else { rc.v };
            let r = r * transform.scale_factor();
            (transform.apply(cx, cy), transform.apply(fx, fy), r)
        }
    };
    if !(r.is_finite() && cx.is_finite() && cy.is_finite()) || r <= f32::EPSILON {
        return None;
    }

    // The focal point must sit strictly inside the end circle.
    let (fx, fy) = clamp_focal(fx, fy, cx, cy, r);

    Some(Brush::Shading(Shading::Radial {
        x0: fx,
        y0: fy,
        r0: 0.0,
        x1: cx,
        y1: cy,
        r1: r,
        spread,
        stops,
    }))
}

fn clamp_focal(fx: f32, fy: f32, cx: f32, cy: f32, r: f32) -> (f32, f32) {
    let dx = fx - cx;
    let dy = fy - cy;
    let dist = libm::sqrtf(dx * dx + dy * dy);
    let limit = r * 0.99;
    if dist <= limit || dist == 0.0 {
        return (fx, fy);
    }
    let k = limit / dist;
    (cx + dx * k, cy + dy * k)
}
