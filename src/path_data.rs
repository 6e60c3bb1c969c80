//! Path outline geometry. All sources (the `d` attribute and the basic
//! shapes) normalize into a flat segment list with cubics as the only curve
//! form; quadratics and elliptical arcs are converted on the way in.

/// One path verb in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo { x: f32, y: f32 },
    LineTo { x: f32, y: f32 },
    CurveTo { x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32 },
    Close,
}

/// Axis-aligned bounds of a segment list over its anchor and control points.
/// Control points can overshoot the true outline; gradient mapping accepts
/// that, matching how the geometry is boxed elsewhere.
pub fn bounds(segs: &[Segment]) -> Option<(f32, f32, f32, f32)> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    let mut any = false;
    let mut grow = |x: f32, y: f32| {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    };
    for seg in segs {
        match *seg {
            Segment::MoveTo { x, y } | Segment::LineTo { x, y } => {
                grow(x, y);
                any = true;
            }
            Segment::CurveTo { x1, y1, x2, y2, x, y } => {
                grow(x1, y1);
                grow(x2, y2);
                grow(x, y);
                any = true;
            }
            Segment::Close => {}
        }
    }
    if any {
        Some((min_x, min_y, max_x - min_x, max_y - min_y))
    } else {
        None
    }
}

/// Parses a `d` attribute. Covers the full SVG 1.1 command set, including
/// implicit command repetition and smooth (S/T) reflection. A malformed tail
/// truncates the result; everything parsed up to that point is kept.
pub fn parse_path_data(d: &str) -> Vec<Segment> {
    let mut segs = Vec::new();
    let mut cur = Cursor::new(d);
    let mut cmd = ' ';
    let mut x = 0.0f32;
    let mut y = 0.0f32;
    let mut sub_x = 0.0f32;
    let mut sub_y = 0.0f32;
    // Reflection state for S and T. Only valid right after a command of the
    // same curve family; any other command clears it.
    let mut cubic_ctrl: Option<(f32, f32)> = None;
    let mut quad_ctrl: Option<(f32, f32)> = None;

    while let Some(c) = cur.command_or_repeat(&mut cmd) {
        // Parsing stops at the first incomplete argument group; Z is the
        // only verb that legitimately consumes nothing.
        let before = cur.i;
        let rel = c.is_ascii_lowercase();
        let verb = c.to_ascii_uppercase();
        match verb {
            'M' => {
                let Some((mut mx, mut my)) = cur.pair() else { break };
                if rel {
                    mx += x;
                    my += y;
                }
                segs.push(Segment::MoveTo { x: mx, y: my });
                x = mx;
                y = my;
                sub_x = mx;
                sub_y = my;
                cubic_ctrl = None;
                quad_ctrl = None;
                // Additional pairs after a moveto are implicit linetos.
                while let Some((mut lx, mut ly)) = cur.pair() {
                    if rel {
                        lx += x;
                        ly += y;
                    }
                    segs.push(Segment::LineTo { x: lx, y: ly });
                    x = lx;
                    y = ly;
                }
            }
            'L' => {
                while let Some((mut lx, mut ly)) = cur.pair() {
                    if rel {
                        lx += x;
                        ly += y;
                    }
                    segs.push(Segment::LineTo { x: lx, y: ly });
                    x = lx;
                    y = ly;
                }
                cubic_ctrl = None;
                quad_ctrl = None;
            }
            'H' => {
                while let Some(mut hx) = cur.number() {
                    if rel {
                        hx += x;
                    }
                    segs.push(Segment::LineTo { x: hx, y });
                    x = hx;
                }
                cubic_ctrl = None;
                quad_ctrl = None;
            }
            'V' => {
                while let Some(mut vy) = cur.number() {
                    if rel {
                        vy += y;
                    }
                    segs.push(Segment::LineTo { x, y: vy });
                    y = vy;
                }
                cubic_ctrl = None;
                quad_ctrl = None;
            }
            'C' => {
                while let Some([mut x1, mut y1, mut x2, mut y2, mut ex, mut ey]) = cur.numbers()
                {
                    if rel {
                        x1 += x;
                        y1 += y;
                        x2 += x;
                        y2 += y;
                        ex += x;
                        ey += y;
                    }
                    segs.push(Segment::CurveTo { x1, y1, x2, y2, x: ex, y: ey });
                    x = ex;
                    y = ey;
                    cubic_ctrl = Some((x2, y2));
                    quad_ctrl = None;
                }
            }
            'S' => {
                while let Some([mut x2, mut y2, mut ex, mut ey]) = cur.numbers() {
                    if rel {
                        x2 += x;
                        y2 += y;
                        ex += x;
                        ey += y;
                    }
                    let (x1, y1) = reflect(cubic_ctrl, x, y);
                    segs.push(Segment::CurveTo { x1, y1, x2, y2, x: ex, y: ey });
                    x = ex;
                    y = ey;
                    cubic_ctrl = Some((x2, y2));
                    quad_ctrl = None;
                }
            }
            'Q' => {
                while let Some([mut qx, mut qy, mut ex, mut ey]) = cur.numbers() {
                    if rel {
                        qx += x;
                        qy += y;
                        ex += x;
                        ey += y;
                    }
                    let seg = quad_to_cubic(x, y, qx, qy, ex, ey);
                    quad_ctrl = Some((qx, qy));
                    cubic_ctrl = None;
                    segs.push(seg);
                    x = ex;
                    y = ey;
                }
            }
            'T' => {
                while let Some((mut ex, mut ey)) = cur.pair() {
                    if rel {
                        ex += x;
                        ey += y;
                    }
                    let (qx, qy) = reflect(quad_ctrl, x, y);
                    let seg = quad_to_cubic(x, y, qx, qy, ex, ey);
                    quad_ctrl = Some((qx, qy));
                    cubic_ctrl = None;
                    segs.push(seg);
                    x = ex;
                    y = ey;
                }
            }
            'A' => {
                loop {
                    let Some(rx) = cur.number() else { break };
                    let Some(ry) = cur.number() else { break };
                    let Some(rot) = cur.number() else { break };
                    let Some(large) = cur.flag() else { break };
                    let Some(sweep) = cur.flag() else { break };
                    let Some((mut ex, mut ey)) = cur.pair() else { break };
                    if rel {
                        ex += x;
                        ey += y;
                    }
                    arc_to_cubics(&mut segs, x, y, rx, ry, rot, large, sweep, ex, ey);
                    x = ex;
                    y = ey;
                }
                cubic_ctrl = None;
                quad_ctrl = None;
            }
            'Z' => {
                segs.push(Segment::Close);
                x = sub_x;
                y = sub_y;
                cubic_ctrl = None;
                quad_ctrl = None;
            }
            _ => {}
        }
        if cur.i == before && verb != 'Z' {
            break;
        }
    }

    segs
}

fn reflect(prev: Option<(f32, f32)>, x: f32, y: f32) -> (f32, f32) {
    match prev {
        Some((px, py)) => (2.0 * x - px, 2.0 * y - py),
        None => (x, y),
    }
}

/// Exact quadratic-to-cubic elevation: the cubic controls sit 2/3 of the way
/// from each endpoint to the quadratic control.
fn quad_to_cubic(x0: f32, y0: f32, qx: f32, qy: f32, x: f32, y: f32) -> Segment {
    Segment::CurveTo {
        x1: x0 + (2.0 / 3.0) * (qx - x0),
        y1: y0 + (2.0 / 3.0) * (qy - y0),
        x2: x + (2.0 / 3.0) * (qx - x),
        y2: y + (2.0 / 3.0) * (qy - y),
        x,
        y,
    }
}

/// Converts one elliptical arc into cubics, per the SVG 1.1 implementation
/// notes. Arcs wider than 90 degrees are split so each cubic spans at most a
/// quarter turn. Zero radii degrade to a straight line; coincident endpoints
/// produce nothing.
#[allow(clippy::too_many_arguments)]
fn arc_to_cubics(
    out: &mut Vec<Segment>,
    x0: f32,
    y0: f32,
    rx: f32,
    ry: f32,
    rotation_deg: f32,
    large_arc: bool,
    sweep: bool,
    x1: f32,
    y1: f32,
) {
    use core::f32::consts::PI;

    if x0 == x1 && y0 == y1 {
        return;
    }
    let mut rx = rx.abs();
    let mut ry = ry.abs();
    if rx == 0.0 || ry == 0.0 {
        out.push(Segment::LineTo { x: x1, y: y1 });
        return;
    }

    let phi = rotation_deg * PI / 180.0;
    let sin_phi = libm::sinf(phi);
    let cos_phi = libm::cosf(phi);

    // Endpoint to center parameterization. Midpoint of the chord, rotated
    // into the ellipse frame.
    let dx = (x0 - x1) / 2.0;
    let dy = (y0 - y1) / 2.0;
    let x1p = cos_phi * dx + sin_phi * dy;
    let y1p = -sin_phi * dx + cos_phi * dy;

    // Radii too small to span the chord get scaled up uniformly.
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = libm::sqrtf(lambda);
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let x1p2 = x1p * x1p;
    let y1p2 = y1p * y1p;
    let den = rx2 * y1p2 + ry2 * x1p2;
    let mut coef = 0.0;
    if den != 0.0 {
        let num = rx2 * ry2 - rx2 * y1p2 - ry2 * x1p2;
        let sign = if large_arc == sweep { -1.0 } else { 1.0 };
        coef = sign * libm::sqrtf((num / den).max(0.0));
    }
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);

    let cx = cos_phi * cxp - sin_phi * cyp + (x0 + x1) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (y0 + y1) / 2.0;

    fn angle(ux: f32, uy: f32, vx: f32, vy: f32) -> f32 {
        libm::atan2f(ux * vy - uy * vx, ux * vx + uy * vy)
    }

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let mut theta = angle(1.0, 0.0, ux, uy);
    let mut sweep_angle = angle(ux, uy, vx, vy);
    if !sweep && sweep_angle > 0.0 {
        sweep_angle -= 2.0 * PI;
    } else if sweep && sweep_angle < 0.0 {
        sweep_angle += 2.0 * PI;
    }

    let pieces = libm::ceilf(sweep_angle.abs() / (PI / 2.0)).max(1.0) as i32;
    let delta = sweep_angle / pieces as f32;
    // Control distance for a circular arc of angle `delta`.
    let half = delta / 2.0;
    let t = libm::tanf(half);
    let alpha = libm::sinf(delta) * (libm::sqrtf(4.0 + 3.0 * t * t) - 1.0) / 3.0;

    for _ in 0..pieces {
        let t1 = theta;
        let t2 = theta + delta;
        let (s1, c1) = (libm::sinf(t1), libm::cosf(t1));
        let (s2, c2) = (libm::sinf(t2), libm::cosf(t2));

        // Points and tangents on the unit circle, then stretched to the
        // ellipse and rotated into place.
        let place = |ux: f32, uy: f32| -> (f32, f32) {
            let ex = rx * ux;
            let ey = ry * uy;
            (
                cx + cos_phi * ex - sin_phi * ey,
                cy + sin_phi * ex + cos_phi * ey,
            )
        };
        let (p1x, p1y) = place(c1 - alpha * s1, s1 + alpha * c1);
        let (p2x, p2y) = place(c2 + alpha * s2, s2 - alpha * c2);
        let (ex, ey) = place(c2, s2);
        out.push(Segment::CurveTo { x1: p1x, y1: p1y, x2: p2x, y2: p2y, x: ex, y: ey });
        theta = t2;
    }
}

/// Byte cursor over path data. Numbers follow the SVG grammar (sign,
/// fraction, exponent); flags may be packed without separators ("...1 1,0").
struct Cursor<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { bytes: input.as_bytes(), i: 0 }
    }

    fn skip_separators(&mut self) {
        while let Some(&b) = self.bytes.get(self.i) {
            if b.is_ascii_whitespace() || b == b',' {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    /// Next command letter, or the previous command when the input continues
    /// straight into more numbers (implicit repetition).
    fn command_or_repeat(&mut self, current: &mut char) -> Option<char> {
        self.skip_separators();
        let b = *self.bytes.get(self.i)?;
        if b.is_ascii_alphabetic() {
            *current = b as char;
            self.i += 1;
            return Some(b as char);
        }
        // Only argument-taking commands repeat implicitly; numbers after a
        // close, or before any command at all, end the stream.
        if matches!(*current, 'Z' | 'z' | ' ') {
            return None;
        }
        Some(*current)
    }

    fn number(&mut self) -> Option<f32> {
        self.skip_separators();
        let start = self.i;
        let mut digits = false;

        if matches!(self.bytes.get(self.i), Some(b'+' | b'-')) {
            self.i += 1;
        }
        while self.bytes.get(self.i).is_some_and(u8::is_ascii_digit) {
            self.i += 1;
            digits = true;
        }
        if self.bytes.get(self.i) == Some(&b'.') {
            self.i += 1;
            while self.bytes.get(self.i).is_some_and(u8::is_ascii_digit) {
                self.i += 1;
                digits = true;
            }
        }
        if digits && matches!(self.bytes.get(self.i), Some(b'e' | b'E')) {
            let mark = self.i;
            self.i += 1;
            if matches!(self.bytes.get(self.i), Some(b'+' | b'-')) {
                self.i += 1;
            }
            let mut exp_digits = false;
            while self.bytes.get(self.i).is_some_and(u8::is_ascii_digit) {
                self.i += 1;
                exp_digits = true;
            }
            if !exp_digits {
                self.i = mark;
            }
        }

        if !digits {
            self.i = start;
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.i])
            .ok()?
            .parse::<f32>()
            .ok()
    }

    /// Arc flags are single characters and need no separator from the next
    /// token, so "1 1,0 10,10" and "1110,10" both read correctly.
    fn flag(&mut self) -> Option<bool> {
        self.skip_separators();
        match *self.bytes.get(self.i)? {
            b'0' => {
                self.i += 1;
                Some(false)
            }
            b'1' => {
                self.i += 1;
                Some(true)
            }
            _ => None,
        }
    }

    fn pair(&mut self) -> Option<(f32, f32)> {
        let save = self.i;
        let x = self.number()?;
        let Some(y) = self.number() else {
            self.i = save;
            return None;
        };
        Some((x, y))
    }

    fn numbers<const N: usize>(&mut self) -> Option<[f32; N]> {
        let save = self.i;
        let mut out = [0.0f32; N];
        for slot in &mut out {
            let Some(v) = self.number() else {
                self.i = save;
                return None;
            };
            *slot = v;
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn move_and_lines_are_exact() {
        let segs = parse_path_data("M 0 0 L 10 0 10 10 Z");
        assert_eq!(
            segs,
            vec![
                Segment::MoveTo { x: 0.0, y: 0.0 },
                Segment::LineTo { x: 10.0, y: 0.0 },
                Segment::LineTo { x: 10.0, y: 10.0 },
                Segment::Close,
            ]
        );
    }

    #[test]
    fn relative_commands_accumulate() {
        let segs = parse_path_data("m 5 5 l 10 0 v 10 h -10 z");
        assert_eq!(segs[1], Segment::LineTo { x: 15.0, y: 5.0 });
        assert_eq!(segs[2], Segment::LineTo { x: 15.0, y: 15.0 });
        assert_eq!(segs[3], Segment::LineTo { x: 5.0, y: 15.0 });
    }

    #[test]
    fn implicit_moveto_pairs_become_lines() {
        let segs = parse_path_data("M 0 0 10 0 20 0");
        assert_eq!(segs.len(), 3);
        assert!(matches!(segs[1], Segment::LineTo { .. }));
        assert!(matches!(segs[2], Segment::LineTo { x, .. } if x == 20.0));
    }

    #[test]
    fn smooth_cubic_reflects_previous_control() {
        let segs = parse_path_data("M 0 0 C 0 10 10 10 10 0 S 20 -10 20 0");
        let Segment::CurveTo { x1, y1, .. } = segs[2] else {
            panic!("expected curve");
        };
        // Reflection of (10,10) about (10,0).
        assert!(close(x1, 10.0) && close(y1, -10.0));
    }

    #[test]
    fn smooth_after_non_curve_uses_current_point() {
        let segs = parse_path_data("M 0 0 L 10 0 S 20 10 20 0");
        let Segment::CurveTo { x1, y1, .. } = segs[2] else {
            panic!("expected curve");
        };
        assert!(close(x1, 10.0) && close(y1, 0.0));
    }

    #[test]
    fn quadratic_elevation_is_exact() {
        let segs = parse_path_data("M 0 0 Q 15 30 30 0");
        let Segment::CurveTo { x1, y1, x2, y2, x, y } = segs[1] else {
            panic!("expected curve");
        };
        assert!(close(x1, 10.0) && close(y1, 20.0));
        assert!(close(x2, 20.0) && close(y2, 20.0));
        assert!(close(x, 30.0) && close(y, 0.0));
    }

    #[test]
    fn quarter_circle_arc_is_one_cubic() {
        // Unit quarter circle from (1,0) to (0,1), center at origin.
        let segs = parse_path_data("M 1 0 A 1 1 0 0 1 0 1");
        assert_eq!(segs.len(), 2, "no splitting at exactly 90 degrees");
        let Segment::CurveTo { x1, y1, x2, y2, x, y } = segs[1] else {
            panic!("expected curve");
        };
        assert!(close(x, 0.0) && close(y, 1.0), "endpoint on the arc");
        // Controls lie on the endpoint tangents, symmetrically.
        assert!(close(x1, 1.0) && close(y2, 1.0));
        assert!(close(y1, x2));
        assert!(y1 > 0.5 && y1 < 0.6, "control distance {}", y1);
    }

    #[test]
    fn large_arc_splits_into_quarter_turns() {
        // Large-arc flag picks the 270-degree arc: three cubics.
        let segs = parse_path_data("M 0 0 A 5 5 0 1 1 5 5");
        let curves = segs
            .iter()
            .filter(|s| matches!(s, Segment::CurveTo { .. }))
            .count();
        assert_eq!(curves, 3);
        // Without it, the 90-degree complement needs only one.
        let small = parse_path_data("M 0 0 A 5 5 0 0 1 5 5");
        assert_eq!(small.len(), 2);
    }

    #[test]
    fn compact_arc_flags_parse() {
        let a = parse_path_data("M 0 0 A 5 5 0 1 1 10 0");
        let b = parse_path_data("M 0 0 A 5 5 0 1110 0");
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_arcs() {
        // Zero radius falls back to a line.
        let segs = parse_path_data("M 0 0 A 0 5 0 0 1 10 0");
        assert_eq!(segs[1], Segment::LineTo { x: 10.0, y: 0.0 });
        // Coincident endpoints draw nothing.
        let segs = parse_path_data("M 3 4 A 5 5 0 0 1 3 4");
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn malformed_tail_truncates() {
        let segs = parse_path_data("M 0 0 L 10 10 L banana");
        assert_eq!(segs.len(), 2);
        assert_eq!(parse_path_data(""), vec![]);
    }

    #[test]
    fn parsing_stops_at_the_first_incomplete_group() {
        // Numbers after a close are not a new argument group.
        let segs = parse_path_data("M 0 0 L 5 0 Z 5 5 L 9 9");
        assert_eq!(
            segs,
            vec![
                Segment::MoveTo { x: 0.0, y: 0.0 },
                Segment::LineTo { x: 5.0, y: 0.0 },
                Segment::Close,
            ]
        );
        // An unknown command letter ends the stream instead of being skipped.
        let segs = parse_path_data("M 0 0 L 1 1 U 2 2 L 3 3");
        assert_eq!(segs.len(), 2);
        // Leading numbers never start a path.
        assert_eq!(parse_path_data("10 10 L 5 5"), vec![]);
    }

    #[test]
    fn exponent_and_packed_numbers() {
        let segs = parse_path_data("M1e1 2e0L-5.5-2.5");
        assert_eq!(segs[0], Segment::MoveTo { x: 10.0, y: 2.0 });
        assert_eq!(segs[1], Segment::LineTo { x: -5.5, y: -2.5 });
    }

    #[test]
    fn bounds_cover_anchors_and_controls() {
        let segs = parse_path_data("M 0 0 C 0 20 10 20 10 0");
        let (x, y, w, h) = bounds(&segs).unwrap();
        assert_eq!((x, y), (0.0, 0.0));
        assert_eq!((w, h), (10.0, 20.0));
    }
}
