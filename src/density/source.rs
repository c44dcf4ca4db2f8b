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

use crate::geometry::{Aabb, Vec3};

/// Growth ratio used when checking a source radius against `base_len`.
const RAD_CHECK_GROWTH: f64 = 1.2;

/// Geometric primitive of a refinement source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceShape {
    Point {
        loc: Vec3,
    },
    /// A segment with length and radius given at each end and
    /// interpolated in between.
    Line {
        pnt1: Vec3,
        pnt2: Vec3,
        len2: f64,
        rad2: f64,
    },
    Box {
        min: Vec3,
        max: Vec3,
    },
}

/// A local refinement: edge length `len` at the primitive, blending to
/// the background length at distance `rad`.
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    pub len: f64,
    pub rad: f64,
    pub shape: SourceShape,
    /// Reflected copy of `shape`, kept in sync by `update_mirror`.
    pub mirror: Option<SourceShape>,
}

/// Blend from `len` at `d2 = 0` to `base` at `d2 = r2`.
#[inline]
fn blend(base: f64, len: f64, d2: f64, r2: f64) -> f64 {
    if d2 > r2 {
        return base;
    }
    if r2 <= 0.0 {
        return len;
    }
    let fract = d2 / r2;
    len + fract * (base - len)
}

impl Source {
    pub fn point(name: impl Into<String>, loc: Vec3, len: f64, rad: f64) -> Self {
        Self {
            name: name.into(),
            len,
            rad,
            shape: SourceShape::Point { loc },
            mirror: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn line(
        name: impl Into<String>,
        pnt1: Vec3,
        len1: f64,
        rad1: f64,
        pnt2: Vec3,
        len2: f64,
        rad2: f64,
    ) -> Self {
        Self {
            name: name.into(),
            len: len1,
            rad: rad1,
            shape: SourceShape::Line {
                pnt1,
                pnt2,
                len2,
                rad2,
            },
            mirror: None,
        }
    }

    pub fn boxed(name: impl Into<String>, a: Vec3, b: Vec3, len: f64, rad: f64) -> Self {
        Self {
            name: name.into(),
            len,
            rad,
            shape: SourceShape::Box {
                min: a.component_min(&b),
                max: a.component_max(&b),
            },
            mirror: None,
        }
    }

    /// Target length at `pos`, never above `base_len`.
    pub fn target_len(&self, base_len: f64, pos: &Vec3) -> f64 {
        let own = self.shape_target_len(&self.shape, base_len, pos);
        let len = match &self.mirror {
            Some(m) => own.min(self.shape_target_len(m, base_len, pos)),
            None => own,
        };
        len.min(base_len)
    }

    fn shape_target_len(&self, shape: &SourceShape, base: f64, pos: &Vec3) -> f64 {
        match shape {
            SourceShape::Point { loc } => blend(base, self.len, loc.dist_squared(pos), self.rad * self.rad),
            SourceShape::Line {
                pnt1,
                pnt2,
                len2,
                rad2,
            } => self.line_target_len(base, pos, pnt1, pnt2, *len2, *rad2),
            SourceShape::Box { min, max } => self.box_target_len(base, pos, min, max),
        }
    }

    fn line_target_len(&self, base: f64, pos: &Vec3, p1: &Vec3, p2: &Vec3, len2: f64, rad2: f64) -> f64 {
        let max_rad = self.rad.max(rad2);
        let mut cull = Aabb::from_points(p1, p2);
        cull.expand(max_rad);
        if !cull.contains_point(pos) {
            return base;
        }

        let seg = *p2 - *p1;
        let seg_len2 = seg.norm_squared();
        let t = if seg_len2 > 0.0 {
            seg.dot(&(*pos - *p1)) / seg_len2
        } else {
            0.0
        };

        if t <= 0.0 {
            blend(base, self.len, pos.dist_squared(p1), self.rad * self.rad)
        } else if t >= 1.0 {
            blend(base, len2, pos.dist_squared(p2), rad2 * rad2)
        } else {
            let rad = self.rad + t * (rad2 - self.rad);
            let len = self.len + t * (len2 - self.len);
            let on_line = *p1 + seg * t;
            blend(base, len, pos.dist_squared(&on_line), rad * rad)
        }
    }

    fn box_target_len(&self, base: f64, pos: &Vec3, min: &Vec3, max: &Vec3) -> f64 {
        let inside = (0..3).all(|i| pos[i] >= min[i] && pos[i] <= max[i]);
        if inside {
            return self.len;
        }
        if self.rad <= 0.0 {
            return base;
        }
        let mut cull = Aabb::new(*min, *max);
        cull.expand(self.rad);
        if !cull.contains_point(pos) {
            return base;
        }
        let mut fract: f64 = 0.0;
        for i in 0..3 {
            let d = if pos[i] < min[i] {
                min[i] - pos[i]
            } else if pos[i] > max[i] {
                pos[i] - max[i]
            } else {
                0.0
            };
            fract = fract.max(d / self.rad);
        }
        self.len + fract.min(1.0) * (base - self.len)
    }

    /// Grows `rad` until the length can reach `base_len` at a 20% growth
    /// per edge.
    pub fn check_correct_rad(&mut self, base_len: f64) {
        let fix = |len: f64, rad: &mut f64| {
            if len <= 0.0 {
                return;
            }
            let mut l = len;
            let mut sum = 0.0;
            while l < base_len {
                sum += l;
                l *= RAD_CHECK_GROWTH;
            }
            if *rad < sum {
                *rad = sum;
            }
        };
        fix(self.len, &mut self.rad);
        if let SourceShape::Line { len2, rad2, .. } = &mut self.shape {
            fix(*len2, rad2);
        }
    }

    pub fn scale(&mut self, factor: f64) {
        self.len *= factor;
        self.rad *= factor;
        if let SourceShape::Line { len2, rad2, .. } = &mut self.shape {
            *len2 *= factor;
            *rad2 *= factor;
        }
    }

    /// Re-syncs the mirror as the reflection through `sym`, a per-axis
    /// sign vector such as (1, -1, 1). `None` removes it.
    pub fn update_mirror(&mut self, sym: Option<Vec3>) {
        self.mirror = sym.map(|s| match &self.shape {
            SourceShape::Point { loc } => SourceShape::Point { loc: loc.scale_by(&s) },
            SourceShape::Line {
                pnt1,
                pnt2,
                len2,
                rad2,
            } => SourceShape::Line {
                pnt1: pnt1.scale_by(&s),
                pnt2: pnt2.scale_by(&s),
                len2: *len2,
                rad2: *rad2,
            },
            SourceShape::Box { min, max } => {
                let a = min.scale_by(&s);
                let b = max.scale_by(&s);
                SourceShape::Box {
                    min: a.component_min(&b),
                    max: a.component_max(&b),
                }
            }
        });
    }

    /// Representative points and lengths for the density index.
    pub fn anchors(&self) -> Vec<(Vec3, f64)> {
        let mut out = Vec::new();
        for shape in std::iter::once(&self.shape).chain(self.mirror.iter()) {
            match shape {
                SourceShape::Point { loc } => out.push((*loc, self.len)),
                SourceShape::Line { pnt1, pnt2, len2, .. } => {
                    out.push((*pnt1, self.len));
                    out.push((*pnt2, *len2));
                }
                SourceShape::Box { min, max } => out.push(((*min + *max) * 0.5, self.len)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_source_blends_by_squared_distance() {
        let s = Source::point("p", Vec3::zero(), 0.1, 2.0);
        assert_relative_eq!(s.target_len(1.0, &Vec3::zero()), 0.1);
        // d²/r² = 1/4
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(1.0, 0.0, 0.0)), 0.1 + 0.25 * 0.9);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(3.0, 0.0, 0.0)), 1.0);
    }

    #[test]
    fn zero_radius_point_source_only_hits_its_location() {
        let s = Source::point("p", Vec3::new(1.0, 2.0, 3.0), 0.1, 0.0);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(1.0, 2.0, 3.0)), 0.1);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(1.0, 2.0, 3.0 + 1e-9)), 1.0);
    }

    #[test]
    fn line_source_interpolates_along_segment() {
        let s = Source::line("l", Vec3::zero(), 0.1, 1.0, Vec3::new(2.0, 0.0, 0.0), 0.3, 1.0);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(1.0, 0.0, 0.0)), 0.2, epsilon = 1e-12);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(-0.5, 0.0, 0.0)), 0.1 + 0.25 * 0.9);
    }

    #[test]
    fn box_source_uses_largest_axis_fraction() {
        let s = Source::boxed("b", Vec3::zero(), Vec3::new(1.0, 1.0, 1.0), 0.2, 1.0);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(0.5, 0.5, 0.5)), 0.2);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(1.5, 1.25, 0.5)), 0.2 + 0.5 * 0.8);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(3.0, 0.5, 0.5)), 1.0);
    }

    #[test]
    fn mirror_reflects_through_y() {
        let mut s = Source::point("p", Vec3::new(0.0, 1.0, 0.0), 0.1, 0.5);
        s.update_mirror(Some(Vec3::new(1.0, -1.0, 1.0)));
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(0.0, -1.0, 0.0)), 0.1);
        s.update_mirror(None);
        assert_relative_eq!(s.target_len(1.0, &Vec3::new(0.0, -1.0, 0.0)), 1.0);
    }

    #[test]
    fn check_correct_rad_grows_small_radius() {
        let mut s = Source::point("p", Vec3::zero(), 0.5, 0.1);
        s.check_correct_rad(1.0);
        // 0.5 + 0.6 + 0.72 + 0.864
        assert_relative_eq!(s.rad, 2.684, epsilon = 1e-12);
    }
}
