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

use crate::geometry::{util::barycentric_coords, vector_3::Vec3};

#[derive(Clone, Debug, PartialEq)]
pub enum TriTriIntersectionResult {
    /// The triangles cross along a segment (possibly a single point).
    Proper(Vec3, Vec3),
    /// The triangles lie in one plane. No segment is reported for them.
    Coplanar,
    None,
}

const PLANE_EPS: f64 = 1e-14;

/// Computes the segment where triangles P=(p0,p1,p2) and Q=(q0,q1,q2) cross.
///
/// Coplanar pairs are reported as `Coplanar` without a segment. Touching
/// contacts yield a degenerate segment with equal endpoints.
pub fn tri_tri_intersection(p: &[Vec3; 3], q: &[Vec3; 3]) -> TriTriIntersectionResult {
    // 1) plane of Q: n2·x + d2 = 0
    let n2 = (q[0] - q[2]).cross(&(q[1] - q[2]));
    let d2 = -n2.dot(&q[2]);
    let scale2 = n2.norm() * max_extent(p, q);
    let dp = [
        snap(n2.dot(&p[0]) + d2, scale2),
        snap(n2.dot(&p[1]) + d2, scale2),
        snap(n2.dot(&p[2]) + d2, scale2),
    ];

    if dp.iter().all(|d| *d == 0.0) {
        return TriTriIntersectionResult::Coplanar;
    }
    if same_side(&dp) {
        return TriTriIntersectionResult::None;
    }

    // 2) plane of P
    let n1 = (p[0] - p[2]).cross(&(p[1] - p[2]));
    let d1 = -n1.dot(&p[2]);
    let scale1 = n1.norm() * max_extent(p, q);
    let dq = [
        snap(n1.dot(&q[0]) + d1, scale1),
        snap(n1.dot(&q[1]) + d1, scale1),
        snap(n1.dot(&q[2]) + d1, scale1),
    ];
    if same_side(&dq) {
        return TriTriIntersectionResult::None;
    }

    // 3) clip edges of each triangle against the other's plane
    let mut pts: Vec<Vec3> = Vec::with_capacity(6);
    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        if let Some(ip) = intersect_edge_plane(&p[i], &p[j], dp[i], dp[j]) {
            if point_in_tri(&ip, q) {
                pts.push(ip);
            }
        }
        if let Some(ip) = intersect_edge_plane(&q[i], &q[j], dq[i], dq[j]) {
            if point_in_tri(&ip, p) {
                pts.push(ip);
            }
        }
    }

    // 4) dedupe
    let tol2 = (max_extent(p, q) * 1e-12).powi(2);
    let mut uniq: Vec<Vec3> = Vec::with_capacity(pts.len());
    for ip in pts {
        if !uniq.iter().any(|u| u.dist_squared(&ip) <= tol2) {
            uniq.push(ip);
        }
    }

    match uniq.len() {
        0 => TriTriIntersectionResult::None,
        1 => TriTriIntersectionResult::Proper(uniq[0], uniq[0]),
        _ => {
            // more than two points: keep the farthest pair
            let mut best = (0, 1);
            let mut best_d = -1.0;
            for i in 0..uniq.len() {
                for j in (i + 1)..uniq.len() {
                    let d = uniq[i].dist_squared(&uniq[j]);
                    if d > best_d {
                        best_d = d;
                        best = (i, j);
                    }
                }
            }
            TriTriIntersectionResult::Proper(uniq[best.0], uniq[best.1])
        }
    }
}

fn max_extent(p: &[Vec3; 3], q: &[Vec3; 3]) -> f64 {
    let mut m: f64 = 0.0;
    for a in p.iter().chain(q.iter()) {
        m = m.max(a.x.abs()).max(a.y.abs()).max(a.z.abs());
    }
    m.max(1.0)
}

#[inline(always)]
fn snap(d: f64, scale: f64) -> f64 {
    if d.abs() <= PLANE_EPS * scale { 0.0 } else { d }
}

fn same_side(d: &[f64; 3]) -> bool {
    (d[0] > 0.0 && d[1] > 0.0 && d[2] > 0.0) || (d[0] < 0.0 && d[1] < 0.0 && d[2] < 0.0)
}

/// Intersect the segment [a,b] with signed plane distances `da`, `db`.
fn intersect_edge_plane(a: &Vec3, b: &Vec3, da: f64, db: f64) -> Option<Vec3> {
    if da * db > 0.0 {
        return None;
    }
    let denom = da - db;
    if denom == 0.0 {
        // edge lies in the plane; the other triangle's edges provide the points
        return None;
    }
    let t = da / denom;
    Some(*a + (*b - *a) * t)
}

fn point_in_tri(p: &Vec3, t: &[Vec3; 3]) -> bool {
    const TOL: f64 = 1e-12;
    match barycentric_coords(p, &t[0], &t[1], &t[2]) {
        Some((u, v, w)) => u >= -TOL && v >= -TOL && w >= -TOL,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perpendicular_triangles_cross_in_a_segment() {
        let p = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let q = [
            Vec3::new(0.0, -2.0, -1.0),
            Vec3::new(0.0, 2.0, -1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        match tri_tri_intersection(&p, &q) {
            TriTriIntersectionResult::Proper(a, b) => {
                assert_relative_eq!(a.x, 0.0, epsilon = 1e-12);
                assert_relative_eq!(b.x, 0.0, epsilon = 1e-12);
                assert_relative_eq!(a.z, 0.0, epsilon = 1e-12);
                assert!(a.dist(&b) > 0.5);
            }
            other => panic!("expected a segment, got {other:?}"),
        }
    }

    #[test]
    fn coplanar_triangles_are_flagged() {
        let p = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let q = [
            Vec3::new(0.2, 0.2, 0.0),
            Vec3::new(1.2, 0.2, 0.0),
            Vec3::new(0.2, 1.2, 0.0),
        ];
        assert_eq!(tri_tri_intersection(&p, &q), TriTriIntersectionResult::Coplanar);
    }

    #[test]
    fn separated_triangles_do_not_intersect() {
        let p = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let q = [
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 3.0),
        ];
        assert_eq!(tri_tri_intersection(&p, &q), TriTriIntersectionResult::None);
    }
}
