use crate::color::parse_number_list;

/// 2D affine transform: maps (x, y) to (a*x + c*y + e, b*x + d*y + f).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub fn identity() -> Self {
        Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: tx, f: ty }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Matrix { a: sx, b: 0.0, c: 0.0, d: sy, e: 0.0, f: 0.0 }
    }

    pub fn rotate(deg: f32) -> Self {
        let rad = deg * core::f32::consts::PI / 180.0;
        let (s, c) = (libm::sinf(rad), libm::cosf(rad));
        Matrix { a: c, b: s, c: -s, d: c, e: 0.0, f: 0.0 }
    }

    pub fn skew_x(deg: f32) -> Self {
        let rad = deg * core::f32::consts::PI / 180.0;
        Matrix { a: 1.0, b: 0.0, c: libm::tanf(rad), d: 1.0, e: 0.0, f: 0.0 }
    }

    pub fn skew_y(deg: f32) -> Self {
        let rad = deg * core::f32::consts::PI / 180.0;
        Matrix { a: 1.0, b: libm::tanf(rad), c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    /// Appends `m` in the local frame: the result applies `m` first, then
    /// `self`. List items and child transforms compose through this.
    pub fn mul(&self, m: &Matrix) -> Matrix {
        Matrix {
            a: self.a * m.a + self.c * m.b,
            b: self.b * m.a + self.d * m.b,
            c: self.a * m.c + self.c * m.d,
            d: self.b * m.c + self.d * m.d,
            e: self.a * m.e + self.c * m.f + self.e,
            f: self.b * m.e + self.d * m.f + self.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Average absolute scale, used to scale stroke widths drawn in device
    /// space.
    pub fn scale_factor(&self) -> f32 {
        let sx = libm::sqrtf(self.a * self.a + self.b * self.b);
        let sy = libm::sqrtf(self.c * self.c + self.d * self.d);
        (sx + sy) * 0.5
    }

    pub fn is_identity(&self) -> bool {
        *self == Matrix::identity()
    }
}

/// Parses a `transform` attribute: whitespace/comma separated function list,
/// composed left to right. Malformed items are skipped; a recognized function
/// with the wrong argument count is ignored rather than guessed at.
pub fn parse_transform(input: &str) -> Matrix {
    let mut out = Matrix::identity();
    let mut rest = input.trim();
    while let Some(open) = rest.find('(') {
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let Some(close) = rest[open..].find(')') else { break };
        let args = parse_number_list(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];

        let m = match (name, args.len()) {
            ("matrix", 6) => Some(Matrix {
                a: args[0],
                b: args[1],
                c: args[2],
                d: args[3],
                e: args[4],
                f: args[5],
            }),
            ("translate", 1) => Some(Matrix::translate(args[0], 0.0)),
            ("translate", 2) => Some(Matrix::translate(args[0], args[1])),
            ("scale", 1) => Some(Matrix::scale(args[0], args[0])),
            ("scale", 2) => Some(Matrix::scale(args[0], args[1])),
            ("rotate", 1) => Some(Matrix::rotate(args[0])),
            ("rotate", 3) => {
                // rotate(a cx cy) = translate(cx cy) rotate(a) translate(-cx -cy)
                let m = Matrix::translate(args[1], args[2])
                    .mul(&Matrix::rotate(args[0]))
                    .mul(&Matrix::translate(-args[1], -args[2]));
                Some(m)
            }
            ("skewX", 1) => Some(Matrix::skew_x(args[0])),
            ("skewY", 1) => Some(Matrix::skew_y(args[0])),
            _ => None,
        };
        if let Some(m) = m {
            out = out.mul(&m);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn list_composes_left_to_right() {
        // translate(10,0) scale(2): origin maps to (10,0), (1,0) to (12,0).
        let m = parse_transform("translate(10,0) scale(2)");
        assert_eq!(m.apply(0.0, 0.0), (10.0, 0.0));
        assert_eq!(m.apply(1.0, 0.0), (12.0, 0.0));
    }

    #[test]
    fn rotate_about_point() {
        let m = parse_transform("rotate(90 5 5)");
        let (x, y) = m.apply(5.0, 0.0);
        assert!(close(x, 10.0), "x = {}", x);
        assert!(close(y, 5.0), "y = {}", y);
    }

    #[test]
    fn matrix_and_skew() {
        let m = parse_transform("matrix(1 0 0 1 3 4)");
        assert_eq!(m.apply(0.0, 0.0), (3.0, 4.0));
        let s = parse_transform("skewX(45)");
        assert!(close(s.c, 1.0));
    }

    #[test]
    fn malformed_items_are_skipped() {
        let m = parse_transform("translate(banana) scale(2)");
        assert_eq!(m, Matrix::scale(2.0, 2.0));
        assert_eq!(parse_transform("garbage"), Matrix::identity());
    }

    #[test]
    fn scale_factor_averages_axes() {
        assert!(close(Matrix::scale(2.0, 4.0).scale_factor(), 3.0));
        assert!(close(Matrix::rotate(30.0).scale_factor(), 1.0));
    }
}
