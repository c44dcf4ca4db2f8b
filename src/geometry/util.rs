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

use crate::geometry::{vector_2::Vec2, vector_3::Vec3};

pub const EPS: f64 = 1e-10;

/// Signed distance from `p` to the plane through `org` with unit normal `n`.
#[inline(always)]
pub fn signed_dist_pnt_2_plane(org: &Vec3, n: &Vec3, p: &Vec3) -> f64 {
    n.dot(&(*p - *org))
}

pub fn dist_pnt_2_plane(org: &Vec3, n: &Vec3, p: &Vec3) -> f64 {
    signed_dist_pnt_2_plane(org, n, p).abs()
}

/// Distance from `p` to the infinite line through `a` and `b`.
pub fn dist_pnt_2_line(a: &Vec3, b: &Vec3, p: &Vec3) -> f64 {
    let ab = *b - *a;
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return p.dist(a);
    }
    ab.cross(&(*p - *a)).norm() / len2.sqrt()
}

/// Parameter of the projection of `p` onto the line `a + t (b - a)`.
pub fn proj_pnt_on_line_u(a: &Vec3, b: &Vec3, p: &Vec3) -> f64 {
    let ab = *b - *a;
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return 0.0;
    }
    ab.dot(&(*p - *a)) / len2
}

/// Closest point of segment `[a, b]` to `p`, with the clamped parameter.
pub fn closest_pnt_on_seg(a: &Vec3, b: &Vec3, p: &Vec3) -> (Vec3, f64) {
    let t = proj_pnt_on_line_u(a, b, p).clamp(0.0, 1.0);
    (*a + (*b - *a) * t, t)
}

/// Proper crossing of two 2D segments. Returns the parameters `(s, t)` on
/// `[a0, a1]` and `[b0, b1]`. Parallel or collinear segments give `None`.
pub fn seg_seg_intersect_2d(a0: &Vec2, a1: &Vec2, b0: &Vec2, b1: &Vec2) -> Option<(f64, f64)> {
    let da = *a1 - *a0;
    let db = *b1 - *b0;
    let denom = da.x * db.y - da.y * db.x;
    if denom.abs() <= f64::EPSILON * (da.dot(&da) + db.dot(&db)) {
        return None;
    }
    let diff = *b0 - *a0;
    let s = (diff.x * db.y - diff.y * db.x) / denom;
    let t = (diff.x * da.y - diff.y * da.x) / denom;
    if (-EPS..=1.0 + EPS).contains(&s) && (-EPS..=1.0 + EPS).contains(&t) {
        Some((s.clamp(0.0, 1.0), t.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Möller–Trumbore test of segment `orig + t * dir`, `t` in [0, 1], against
/// triangle `(v0, v1, v2)`. Returns the hit parameter `t`.
pub fn tri_seg_intersect(v0: &Vec3, v1: &Vec3, v2: &Vec3, orig: &Vec3, dir: &Vec3) -> Option<f64> {
    let e1 = *v1 - *v0;
    let e2 = *v2 - *v0;
    let pvec = dir.cross(&e2);
    let det = e1.dot(&pvec);
    if det.abs() < 1e-300 {
        return None;
    }
    let inv = 1.0 / det;
    let tvec = *orig - *v0;
    let u = tvec.dot(&pvec) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(&e1);
    let v = dir.dot(&qvec) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&qvec) * inv;
    if (0.0..=1.0).contains(&t) { Some(t) } else { None }
}

/// Barycentric coordinates of `p` with respect to triangle `(a, b, c)`.
pub fn barycentric_coords(p: &Vec3, a: &Vec3, b: &Vec3, c: &Vec3) -> Option<(f64, f64, f64)> {
    let v0 = *b - *a;
    let v1 = *c - *a;
    let v2 = *p - *a;

    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::MIN_POSITIVE {
        return None;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some((1.0 - v - w, v, w))
}

pub fn tri_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    (*b - *a).cross(&(*c - *a)).normalized()
}

pub fn tri_area(a: &Vec3, b: &Vec3, c: &Vec3) -> f64 {
    0.5 * (*b - *a).cross(&(*c - *a)).norm()
}

/// Largest interior-angle cosine of a triangle. The smallest angle is its
/// `acos`. Degenerate triangles report 1.
pub fn tri_max_angle_cos(a: &Vec3, b: &Vec3, c: &Vec3) -> f64 {
    let ab = *b - *a;
    let bc = *c - *b;
    let ca = *a - *c;
    let (lab, lbc, lca) = (ab.norm(), bc.norm(), ca.norm());
    if lab <= 0.0 || lbc <= 0.0 || lca <= 0.0 {
        return 1.0;
    }
    let ca_ = -(ab.dot(&ca)) / (lab * lca);
    let cb = -(ab.dot(&bc)) / (lab * lbc);
    let cc = -(bc.dot(&ca)) / (lbc * lca);
    ca_.max(cb).max(cc).clamp(-1.0, 1.0)
}

/// Minimum interior angle in radians.
pub fn tri_min_angle(a: &Vec3, b: &Vec3, c: &Vec3) -> f64 {
    tri_max_angle_cos(a, b, c).acos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn crossing_segments_report_parameters() {
        let hit = seg_seg_intersect_2d(
            &Vec2::new(0.0, 0.0),
            &Vec2::new(2.0, 0.0),
            &Vec2::new(0.5, -1.0),
            &Vec2::new(0.5, 1.0),
        );
        let (s, t) = hit.unwrap();
        assert_relative_eq!(s, 0.25);
        assert_relative_eq!(t, 0.5);
    }

    #[test]
    fn parallel_segments_do_not_cross() {
        assert!(
            seg_seg_intersect_2d(
                &Vec2::new(0.0, 0.0),
                &Vec2::new(1.0, 0.0),
                &Vec2::new(0.0, 1.0),
                &Vec2::new(1.0, 1.0),
            )
            .is_none()
        );
    }

    #[test]
    fn ray_hits_triangle_interior() {
        let t = tri_seg_intersect(
            &Vec3::new(0.0, 0.0, 0.0),
            &Vec3::new(1.0, 0.0, 0.0),
            &Vec3::new(0.0, 1.0, 0.0),
            &Vec3::new(0.25, 0.25, -1.0),
            &Vec3::new(0.0, 0.0, 2.0),
        );
        assert_relative_eq!(t.unwrap(), 0.5);
    }

    #[test]
    fn equilateral_min_angle_is_sixty_degrees() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);
        let c = Vec3::new(0.5, 3.0_f64.sqrt() / 2.0, 0.0);
        assert_relative_eq!(tri_min_angle(&a, &b, &c), std::f64::consts::FRAC_PI_3, epsilon = 1e-12);
    }
}
