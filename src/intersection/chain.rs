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

use std::collections::VecDeque;

use crate::{
    curve::scurve::SCurve,
    geometry::{Vec2, Vec3, util::seg_seg_intersect_2d},
    intersection::{
        ipnt::{IPnt, IPntId, Puw},
        iseg::{ISeg, ISegId},
    },
    surface::bezier::ParametricSurface,
};

/// Segments per leaf of the parametric segment tree.
const SEG_BOX_LEAF: usize = 8;
/// Minimum length for an intersection chain to be kept.
pub const MIN_CHAIN_LEN: f64 = 1e-4;

/// A pending cut at parameter `fract` of the chain's `index`-th segment.
#[derive(Debug, Clone)]
pub struct ISegSplit {
    pub index: usize,
    pub fract: f64,
    pub pnt: Vec3,
    pub uw_a: Vec2,
    pub uw_b: Vec2,
}

/// An ordered run of ISegs between two fixed surfaces.
///
/// A border chain follows the border of `surf_a` (and of `surf_b` when a
/// neighbouring surface shares that border). After tessellation `tess`
/// holds the output points with their parametric images on both sides.
#[derive(Debug, Clone)]
pub struct ISegChain {
    pub surf_a: usize,
    pub surf_b: usize,
    pub border: bool,
    pub segs: VecDeque<ISegId>,
    pub splits: Vec<ISegSplit>,
    pub acurve: SCurve,
    pub bcurve: SCurve,
    pub tess: Vec<IPntId>,
    pub tess_uw_a: Vec<Vec2>,
    pub tess_uw_b: Vec<Vec2>,
}

impl ISegChain {
    pub fn new(surf_a: usize, surf_b: usize, border: bool) -> Self {
        Self {
            surf_a,
            surf_b,
            border,
            segs: VecDeque::new(),
            splits: Vec::new(),
            acurve: SCurve::new(surf_a, Vec::new()),
            bcurve: SCurve::new(surf_b, Vec::new()),
            tess: Vec::new(),
            tess_uw_a: Vec::new(),
            tess_uw_b: Vec::new(),
        }
    }

    /// Same surfaces and kind, no segments.
    pub fn empty_like(&self) -> Self {
        Self::new(self.surf_a, self.surf_b, self.border)
    }

    pub fn touches(&self, surf: usize) -> bool {
        self.surf_a == surf || self.surf_b == surf
    }

    pub fn first_ipnt(&self, segs: &[ISeg]) -> Option<IPntId> {
        self.segs.front().map(|&s| segs[s].ip[0])
    }

    pub fn last_ipnt(&self, segs: &[ISeg]) -> Option<IPntId> {
        self.segs.back().map(|&s| segs[s].ip[1])
    }

    pub fn length(&self, ipnts: &[IPnt], segs: &[ISeg]) -> f64 {
        self.segs
            .iter()
            .map(|&s| ipnts[segs[s].ip[0]].pnt.dist(&ipnts[segs[s].ip[1]].pnt))
            .sum()
    }

    pub fn valid(&self, ipnts: &[IPnt], segs: &[ISeg]) -> bool {
        !self.segs.is_empty() && self.length(ipnts, segs) >= MIN_CHAIN_LEN
    }

    /// Parametric polyline through the segment ends on side A or B.
    pub fn uw_polyline(&self, segs: &[ISeg], side_a: bool) -> Vec<Vec2> {
        let mut out = Vec::with_capacity(self.segs.len() + 1);
        for (k, &sid) in self.segs.iter().enumerate() {
            let uw = if side_a { &segs[sid].uw_a } else { &segs[sid].uw_b };
            if k == 0 {
                out.push(uw[0]);
            }
            out.push(uw[1]);
        }
        out
    }

    /// Rebuilds the A and B curves from the current segments.
    pub fn build_curves(&mut self, segs: &[ISeg]) {
        self.acurve = SCurve::new(self.surf_a, self.uw_polyline(segs, true));
        self.bcurve = SCurve::new(self.surf_b, self.uw_polyline(segs, false));
    }

    /// Drops splits within `tol` (3D) of an earlier one.
    pub fn merge_splits(&mut self, tol: f64) {
        let tol2 = tol * tol;
        let mut kept: Vec<ISegSplit> = Vec::with_capacity(self.splits.len());
        for s in self.splits.drain(..) {
            if !kept.iter().any(|k| k.pnt.dist_squared(&s.pnt) < tol2) {
                kept.push(s);
            }
        }
        self.splits = kept;
    }

    /// Drops splits within `tol` (parametric, side A) of either chain end.
    pub fn remove_chain_end_splits(&mut self, segs: &[ISeg], tol: f64) {
        let (Some(&first), Some(&last)) = (self.segs.front(), self.segs.back()) else {
            self.splits.clear();
            return;
        };
        let start = segs[first].uw_a[0];
        let end = segs[last].uw_a[1];
        let tol2 = tol * tol;
        self.splits
            .retain(|s| s.uw_a.dist_squared(&start) > tol2 && s.uw_a.dist_squared(&end) > tol2);
    }

    /// Box tree over this chain's segments in the parametric space of
    /// `surf`. Returns `None` if the chain does not touch `surf`.
    pub fn seg_box_tree(&self, segs: &[ISeg], surf: usize) -> Option<ISegBox> {
        if !self.touches(surf) || self.segs.is_empty() {
            return None;
        }
        let items: Vec<(usize, Vec2, Vec2)> = self
            .segs
            .iter()
            .enumerate()
            .filter_map(|(i, &sid)| {
                let s = &segs[sid];
                Some((i, s.uw_on(surf, 0.0)?, s.uw_on(surf, 1.0)?))
            })
            .collect();
        if items.is_empty() {
            return None;
        }
        Some(ISegBox::build(items))
    }

    /// Writes the tessellated points: one IPnt per sample of the A curve,
    /// placed at the average of both surface evaluations.
    pub fn apply_tess(&mut self, ipnts: &mut Vec<IPnt>, surfs: &[ParametricSurface]) {
        self.tess.clear();
        self.tess_uw_a.clear();
        self.tess_uw_b.clear();
        let sa = &surfs[self.surf_a];
        let sb = &surfs[self.surf_b];
        for &t in self.acurve.tess() {
            let uwa = self.acurve.comp_uw(t);
            let uwb = self.bcurve.comp_uw(t);
            let pnt = (sa.comp_pnt_uw(&uwa) + sb.comp_pnt_uw(&uwb)) * 0.5;
            let mut ip = IPnt::new(pnt, &[Puw { surf: self.surf_a, uw: uwa }]);
            ip.add_puws(&[Puw { surf: self.surf_b, uw: uwb }]);
            ip.used = true;
            self.tess.push(ipnts.len());
            ipnts.push(ip);
            self.tess_uw_a.push(uwa);
            self.tess_uw_b.push(uwb);
        }
    }

    /// Parametric polyline of the tessellation on `surf`, one per side the
    /// chain has there (two for the seam of a closed surface).
    pub fn tess_polylines(&self, surf: usize) -> Vec<&[Vec2]> {
        let mut out: Vec<&[Vec2]> = Vec::with_capacity(2);
        if self.surf_a == surf {
            out.push(&self.tess_uw_a);
        }
        if self.surf_b == surf && (self.surf_a != surf || self.tess_uw_a != self.tess_uw_b) {
            out.push(&self.tess_uw_b);
        }
        out
    }
}

/// Median split box hierarchy over parametric segments.
///
/// Items are `(position in chain, start uw, end uw)`. Consecutive chain
/// segments are spatially coherent, so splitting by index is enough.
#[derive(Debug, Clone)]
pub enum ISegBox {
    Leaf {
        min: Vec2,
        max: Vec2,
        items: Vec<(usize, Vec2, Vec2)>,
    },
    Node {
        min: Vec2,
        max: Vec2,
        left: Box<ISegBox>,
        right: Box<ISegBox>,
    },
}

impl ISegBox {
    pub fn build(mut items: Vec<(usize, Vec2, Vec2)>) -> Self {
        if items.len() <= SEG_BOX_LEAF {
            let (min, max) = Self::bounds(&items);
            return ISegBox::Leaf { min, max, items };
        }
        let mid = items.len() / 2;
        let right_items = items.split_off(mid);
        let left = Box::new(Self::build(items));
        let right = Box::new(Self::build(right_items));
        let (lmin, lmax) = left.bbox();
        let (rmin, rmax) = right.bbox();
        ISegBox::Node {
            min: Vec2::new(lmin.x.min(rmin.x), lmin.y.min(rmin.y)),
            max: Vec2::new(lmax.x.max(rmax.x), lmax.y.max(rmax.y)),
            left,
            right,
        }
    }

    fn bounds(items: &[(usize, Vec2, Vec2)]) -> (Vec2, Vec2) {
        let mut min = Vec2::new(f64::MAX, f64::MAX);
        let mut max = Vec2::new(f64::MIN, f64::MIN);
        for (_, a, b) in items {
            for p in [a, b] {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
            }
        }
        (min, max)
    }

    fn bbox(&self) -> (Vec2, Vec2) {
        match self {
            ISegBox::Leaf { min, max, .. } | ISegBox::Node { min, max, .. } => (*min, *max),
        }
    }

    fn overlaps(&self, other: &ISegBox) -> bool {
        const SLOP: f64 = 1e-12;
        let (amin, amax) = self.bbox();
        let (bmin, bmax) = other.bbox();
        amin.x <= bmax.x + SLOP && bmin.x <= amax.x + SLOP && amin.y <= bmax.y + SLOP && bmin.y <= amax.y + SLOP
    }

    /// Crossings between two trees as `(index in self, index in other,
    /// fract on self, fract on other)`.
    pub fn intersect(&self, other: &ISegBox, out: &mut Vec<(usize, usize, f64, f64)>) {
        if !self.overlaps(other) {
            return;
        }
        match (self, other) {
            (ISegBox::Leaf { items: ia, .. }, ISegBox::Leaf { items: ib, .. }) => {
                for (i, a0, a1) in ia {
                    for (j, b0, b1) in ib {
                        if let Some((s, t)) = seg_seg_intersect_2d(a0, a1, b0, b1) {
                            out.push((*i, *j, s, t));
                        }
                    }
                }
            }
            (ISegBox::Node { left, right, .. }, ISegBox::Leaf { .. }) => {
                left.intersect(other, out);
                right.intersect(other, out);
            }
            (_, ISegBox::Node { left, right, .. }) => {
                self.intersect(left, out);
                self.intersect(right, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_items(n: usize, from: Vec2, to: Vec2) -> Vec<(usize, Vec2, Vec2)> {
        (0..n)
            .map(|i| {
                let a = from.lerp(&to, i as f64 / n as f64);
                let b = from.lerp(&to, (i + 1) as f64 / n as f64);
                (i, a, b)
            })
            .collect()
    }

    #[test]
    fn trees_find_single_crossing() {
        let a = ISegBox::build(line_items(20, Vec2::new(0.0, 0.5), Vec2::new(1.0, 0.5)));
        let b = ISegBox::build(line_items(13, Vec2::new(0.37, 0.0), Vec2::new(0.37, 1.0)));
        let mut hits = Vec::new();
        a.intersect(&b, &mut hits);
        assert_eq!(hits.len(), 1);
        let (i, j, s, t) = hits[0];
        assert_eq!(i, 7);
        assert_eq!(j, 6);
        assert!((0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t));
    }

    #[test]
    fn disjoint_trees_find_nothing() {
        let a = ISegBox::build(line_items(20, Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)));
        let b = ISegBox::build(line_items(20, Vec2::new(0.0, 0.5), Vec2::new(1.0, 0.5)));
        let mut hits = Vec::new();
        a.intersect(&b, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn merge_splits_drops_near_duplicates() {
        let mut c = ISegChain::new(0, 1, false);
        for x in [0.5, 0.5 + 1e-8, 0.7] {
            c.splits.push(ISegSplit {
                index: 0,
                fract: x,
                pnt: Vec3::new(x, 0.0, 0.0),
                uw_a: Vec2::new(x, 0.0),
                uw_b: Vec2::new(x, 0.0),
            });
        }
        c.merge_splits(1e-6);
        assert_eq!(c.splits.len(), 2);
    }
}
