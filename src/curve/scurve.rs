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

use crate::{
    density::grid::GridDensity,
    geometry::{Vec2, Vec3},
    surface::bezier::ParametricSurface,
};

/// Table samples per unit of parametric travel along the curve.
const SAMPLES_PER_SECTION: usize = 10;
/// The last sample snaps to the end when the remainder is below this
/// fraction of the local target length.
const END_SNAP_FRACT: f64 = 0.75;

/// A curve in the (u, w) space of one surface, stored as a polyline.
///
/// The parameter `t ∈ [0, 1]` is spread evenly over the polyline segments.
#[derive(Debug, Clone)]
pub struct SCurve {
    pub surf: usize,
    pub uw: Vec<Vec2>,
    /// Which side of the parent surface this border curve follows.
    pub border_side: Option<usize>,
    /// (t, cumulative 3D length) samples.
    dist_table: Vec<(f64, f64)>,
    tess: Vec<f64>,
}

impl SCurve {
    pub fn new(surf: usize, uw: Vec<Vec2>) -> Self {
        Self {
            surf,
            uw,
            border_side: None,
            dist_table: Vec::new(),
            tess: Vec::new(),
        }
    }

    pub fn num_sections(&self) -> usize {
        self.uw.len().saturating_sub(1)
    }

    pub fn reversed(&self) -> SCurve {
        let mut c = self.clone();
        c.uw.reverse();
        c.dist_table.clear();
        c.tess.clear();
        c
    }

    pub fn comp_uw(&self, t: f64) -> Vec2 {
        let n = self.num_sections();
        if n == 0 {
            return self.uw.first().copied().unwrap_or_default();
        }
        let x = t.clamp(0.0, 1.0) * n as f64;
        let i = (x.floor() as usize).min(n - 1);
        self.uw[i].lerp(&self.uw[i + 1], x - i as f64)
    }

    pub fn comp_pnt(&self, surf: &ParametricSurface, t: f64) -> Vec3 {
        surf.comp_pnt_uw(&self.comp_uw(t))
    }

    fn samples_for(&self, i: usize) -> usize {
        let d = self.uw[i + 1] - self.uw[i];
        let span = (d.x.abs() + d.y.abs()).ceil().max(1.0) as usize;
        span * SAMPLES_PER_SECTION
    }

    /// 3D length using `n` samples per polyline section.
    pub fn length(&self, surf: &ParametricSurface, n: usize) -> f64 {
        let sections = self.num_sections();
        if sections == 0 {
            return 0.0;
        }
        let total = sections * n.max(1);
        let mut len = 0.0;
        let mut prev = self.comp_pnt(surf, 0.0);
        for k in 1..=total {
            let p = self.comp_pnt(surf, k as f64 / total as f64);
            len += prev.dist(&p);
            prev = p;
        }
        len
    }

    pub fn build_dist_table(&mut self, surf: &ParametricSurface) {
        self.dist_table.clear();
        let n = self.num_sections();
        if n == 0 {
            return;
        }
        let mut prev = self.comp_pnt(surf, 0.0);
        let mut s = 0.0;
        self.dist_table.push((0.0, 0.0));
        for i in 0..n {
            let m = self.samples_for(i);
            for k in 1..=m {
                let t = (i as f64 + k as f64 / m as f64) / n as f64;
                let p = self.comp_pnt(surf, t);
                s += prev.dist(&p);
                prev = p;
                self.dist_table.push((t, s));
            }
        }
    }

    pub fn total_dist(&self) -> f64 {
        self.dist_table.last().map_or(0.0, |(_, s)| *s)
    }

    /// Parameter at arc length `s`, searching forward from `*hint`.
    fn invert(&self, s: f64, hint: &mut usize) -> f64 {
        let tab = &self.dist_table;
        while *hint + 1 < tab.len() && tab[*hint + 1].1 < s {
            *hint += 1;
        }
        if *hint + 1 >= tab.len() {
            return 1.0;
        }
        let (t0, s0) = tab[*hint];
        let (t1, s1) = tab[*hint + 1];
        if s1 - s0 <= 0.0 {
            return t1;
        }
        t0 + (t1 - t0) * (s - s0) / (s1 - s0)
    }

    /// Places samples along the curve so that consecutive 3D distances
    /// follow the density field. With `paired`, the target is also limited
    /// by the matching curve on the other surface.
    pub fn tessellate(
        &mut self,
        surf: &ParametricSurface,
        density: &GridDensity,
        paired: Option<(&ParametricSurface, &SCurve)>,
    ) {
        self.build_dist_table(surf);
        let total = self.total_dist();
        if total <= 0.0 {
            self.tess = vec![0.0, 1.0];
            return;
        }

        let target_at = |t: f64| -> f64 {
            let uw = self.comp_uw(t);
            let p = surf.comp_pnt_uw(&uw);
            let mut len = density
                .target_len(&p)
                .min(surf.interp_target_map(uw.x, uw.y, density.base_len()));
            if let Some((bs, bc)) = paired {
                let buw = bc.comp_uw(t);
                len = len.min(bs.interp_target_map(buw.x, buw.y, density.base_len()));
            }
            len.max(total * 1e-6)
        };

        let mut out = vec![0.0];
        let mut hint = 0usize;
        let mut s = 0.0;
        let mut t = 0.0;
        loop {
            let len = target_at(t);
            if s + len >= total {
                let remainder = total - s;
                if remainder < END_SNAP_FRACT * len && out.len() > 1 {
                    if let Some(last) = out.last_mut() {
                        *last = 1.0;
                    }
                } else {
                    out.push(1.0);
                }
                break;
            }
            s += len;
            t = self.invert(s, &mut hint);
            out.push(t);
        }
        self.tess = out;
    }

    /// Re-uses another curve's parameters.
    pub fn tessellate_with(&mut self, ts: &[f64]) {
        self.tess = ts.to_vec();
    }

    pub fn tess(&self) -> &[f64] {
        &self.tess
    }

    pub fn tess_uw(&self) -> Vec<Vec2> {
        self.tess.iter().map(|t| self.comp_uw(*t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::bezier::planar_grid;
    use approx::assert_relative_eq;

    fn square(size: f64) -> ParametricSurface {
        let g = planar_grid([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(size, 0.0, 0.0),
            Vec3::new(size, size, 0.0),
            Vec3::new(0.0, size, 0.0),
        ]);
        ParametricSurface::new(0, 0, g).unwrap()
    }

    #[test]
    fn tessellation_spans_zero_to_one() {
        let s = square(2.0);
        let density = GridDensity::default();
        let mut c = SCurve::new(0, vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        c.tessellate(&s, &density, None);
        let ts = c.tess();
        assert_eq!(ts[0], 0.0);
        assert_eq!(*ts.last().unwrap(), 1.0);
        // 2.0 long at base 0.5 gives four segments
        assert_eq!(ts.len(), 5);
        for w in ts.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn short_remainder_snaps_to_end() {
        // 1.1 long at base 0.5: the last 0.1 is merged into the previous step
        let s = square(1.1);
        let density = GridDensity::default();
        let mut c = SCurve::new(0, vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        c.tessellate(&s, &density, None);
        assert_eq!(c.tess().len(), 3);
        assert_relative_eq!(c.tess()[1], 0.5 / 1.1, epsilon = 1e-9);
    }

    #[test]
    fn long_remainder_adds_short_segment() {
        let s = square(1.4);
        let density = GridDensity::default();
        let mut c = SCurve::new(0, vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        c.tessellate(&s, &density, None);
        assert_eq!(c.tess().len(), 4);
    }

    #[test]
    fn length_of_border_matches_edge() {
        let s = square(3.0);
        assert_relative_eq!(s.border_curves[0].length(&s, 10), 3.0, epsilon = 1e-12);
    }
}
