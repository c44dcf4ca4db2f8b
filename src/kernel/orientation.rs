// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use rug::Rational;

use crate::geometry::vector_2::Vec2;

/// Forward error bound for the 2x2 orientation determinant (Shewchuk).
const CCW_ERR_BOUND: f64 = 3.330_669_073_875_472e-16;
/// Forward error bound for the 3x3 incircle determinant (Shewchuk).
const ICC_ERR_BOUND: f64 = 1.110_223_024_625_157_3e-15;

/// Returns:
/// - >0 if counter-clockwise
/// - <0 if clockwise
/// - =0 if collinear
///
/// The f64 value is returned when its sign is certain, otherwise the sign
/// is recomputed with exact rationals.
pub fn orient2d(a: &Vec2, b: &Vec2, c: &Vec2) -> f64 {
    let detleft = (b.x - a.x) * (c.y - a.y);
    let detright = (b.y - a.y) * (c.x - a.x);
    let det = detleft - detright;

    let detsum = detleft.abs() + detright.abs();
    if det.abs() > CCW_ERR_BOUND * detsum {
        return det;
    }
    exact_sign(orient2d_exact(a, b, c))
}

/// Positive when `d` is strictly inside the circumcircle of the CCW
/// triangle `(a, b, c)`, negative outside, zero on it.
pub fn incircle(a: &Vec2, b: &Vec2, c: &Vec2, d: &Vec2) -> f64 {
    let adx = a.x - d.x;
    let ady = a.y - d.y;
    let bdx = b.x - d.x;
    let bdy = b.y - d.y;
    let cdx = c.x - d.x;
    let cdy = c.y - d.y;

    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdx * cdy - cdx * bdy) + blift * (cdx * ady - adx * cdy)
        + clift * (adx * bdy - bdx * ady);

    let permanent = alift * ((bdx * cdy).abs() + (cdx * bdy).abs())
        + blift * ((cdx * ady).abs() + (adx * cdy).abs())
        + clift * ((adx * bdy).abs() + (bdx * ady).abs());
    if det.abs() > ICC_ERR_BOUND * permanent {
        return det;
    }
    exact_sign(incircle_exact(a, b, c, d))
}

fn exact_sign(r: Option<Rational>) -> f64 {
    match r {
        Some(v) => match v.cmp0() {
            std::cmp::Ordering::Greater => 1.0,
            std::cmp::Ordering::Less => -1.0,
            std::cmp::Ordering::Equal => 0.0,
        },
        // non-finite input: nothing sensible to decide
        None => 0.0,
    }
}

fn rat(v: f64) -> Option<Rational> {
    Rational::from_f64(v)
}

fn orient2d_exact(a: &Vec2, b: &Vec2, c: &Vec2) -> Option<Rational> {
    let (ax, ay) = (rat(a.x)?, rat(a.y)?);
    let (bx, by) = (rat(b.x)?, rat(b.y)?);
    let (cx, cy) = (rat(c.x)?, rat(c.y)?);
    let dx1 = Rational::from(&bx - &ax);
    let dy1 = Rational::from(&by - &ay);
    let dx2 = Rational::from(&cx - &ax);
    let dy2 = Rational::from(&cy - &ay);
    let l = Rational::from(&dx1 * &dy2);
    let r = Rational::from(&dy1 * &dx2);
    Some(l - r)
}

fn incircle_exact(a: &Vec2, b: &Vec2, c: &Vec2, d: &Vec2) -> Option<Rational> {
    let (dx, dy) = (rat(d.x)?, rat(d.y)?);
    let rel = |p: &Vec2| -> Option<(Rational, Rational)> {
        Some((Rational::from(&rat(p.x)? - &dx), Rational::from(&rat(p.y)? - &dy)))
    };
    let (adx, ady) = rel(a)?;
    let (bdx, bdy) = rel(b)?;
    let (cdx, cdy) = rel(c)?;

    let lift = |x: &Rational, y: &Rational| Rational::from(x * x) + Rational::from(y * y);
    let cross = |x1: &Rational, y1: &Rational, x2: &Rational, y2: &Rational| {
        Rational::from(x1 * y2) - Rational::from(x2 * y1)
    };

    let alift = lift(&adx, &ady);
    let blift = lift(&bdx, &bdy);
    let clift = lift(&cdx, &cdy);

    let t0 = alift * cross(&bdx, &bdy, &cdx, &cdy);
    let t1 = blift * cross(&cdx, &cdy, &adx, &ady);
    let t2 = clift * cross(&adx, &ady, &bdx, &bdy);
    Some(t0 + t1 + t2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccw_test() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        let c = Vec2::new(0.0, 1.0);

        assert!(orient2d(&a, &b, &c) > 0.0);
        assert!(orient2d(&a, &c, &b) < 0.0);
    }

    #[test]
    fn nearly_collinear_points_use_exact_sign() {
        let a = Vec2::new(0.5, 0.5);
        let b = Vec2::new(12.0, 12.0);
        let c = Vec2::new(24.0, 24.0);
        assert_eq!(orient2d(&a, &b, &c), 0.0);

        let c2 = Vec2::new(24.0, 24.0 + f64::EPSILON * 16.0);
        assert!(orient2d(&a, &b, &c2) > 0.0);
    }

    #[test]
    fn incircle_inside_and_outside() {
        let a = Vec2::new(0.0, 0.0);
        let b = Vec2::new(1.0, 0.0);
        let c = Vec2::new(0.0, 1.0);
        assert!(incircle(&a, &b, &c, &Vec2::new(0.4, 0.4)) > 0.0);
        assert!(incircle(&a, &b, &c, &Vec2::new(2.0, 2.0)) < 0.0);
        assert_eq!(incircle(&a, &b, &c, &Vec2::new(1.0, 1.0)), 0.0);
    }
}
