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

use ahash::AHashMap;
use log::{debug, info};

use crate::{
    curve::icurve::ICurve,
    density::grid::GridDensity,
    geometry::{Vec2, Vec3, util::closest_pnt_on_seg},
    intersection::{
        bin::BinMap,
        chain::{ISegChain, ISegSplit},
        ipnt::{IPnt, IPntId, Puw},
        iseg::{ISeg, ISegId},
    },
    surface::{bezier::ParametricSurface, patch::PatchSegment},
};

/// Samples per unit of parametric length when a border curve is turned
/// into a chain.
const BORDER_SAMPLES_PER_UNIT: usize = 32;
/// An intersection end this close to a border chain splits it.
const BORDER_SPLIT_TOL: f64 = 1e-3;
/// Border splits this close to a border chain end are ignored.
const BORDER_END_TOL: f64 = 1e-5;
/// Splits closer than this in 3D are merged.
const SPLIT_MERGE_TOL: f64 = 1e-6;
/// Splits this close to a chain end (parametric) are dropped.
const CHAIN_END_SPLIT_TOL: f64 = 1e-7;
/// A split this close to either end of a segment cuts at the segment end.
const SPLIT_FRACT_TOL: f64 = 1e-6;
/// Chain ends closer than this fraction of the minimum edge length are
/// merged into one point.
pub const END_MERGE_FRACTION: f64 = 0.01;

/// Arena of intersection points, segments and the chains built from them.
#[derive(Debug, Clone)]
pub struct IntersectionSet {
    pub ipnts: Vec<IPnt>,
    pub segs: Vec<ISeg>,
    pub chains: Vec<ISegChain>,
    bins: BinMap,
    match_tol: f64,
}

impl IntersectionSet {
    /// `model_diag` sets the tolerance used to link segment ends.
    pub fn new(model_diag: f64) -> Self {
        let match_tol = (1e-3 * model_diag).max(1e-9);
        Self {
            ipnts: Vec::new(),
            segs: Vec::new(),
            chains: Vec::new(),
            bins: BinMap::new(match_tol),
            match_tol,
        }
    }

    pub fn match_tol(&self) -> f64 {
        self.match_tol
    }

    pub fn num_border_chains(&self) -> usize {
        self.chains.iter().filter(|c| c.border).count()
    }

    pub fn num_intersect_chains(&self) -> usize {
        self.chains.iter().filter(|c| !c.border).count()
    }

    fn push_ipnt(&mut self, ip: IPnt) -> IPntId {
        self.ipnts.push(ip);
        self.ipnts.len() - 1
    }

    fn push_seg(&mut self, seg: ISeg) -> ISegId {
        let id = self.segs.len();
        for ip in seg.ip {
            self.ipnts[ip].segs.push(id);
        }
        self.segs.push(seg);
        id
    }

    /// Adds one raw patch intersection. Returns `false` when the segment
    /// was degenerate or already present.
    pub fn add_intersection_seg(&mut self, surfs: &[ParametricSurface], ps: &PatchSegment) -> bool {
        let [p0, p1] = ps.pnts;
        if p0.dist_squared(&p1) < f64::EPSILON {
            return false;
        }
        if self.is_duplicate_seg(ps.surf_a, ps.surf_b, &p0, &p1) {
            return false;
        }
        let sa = &surfs[ps.surf_a];
        let sb = &surfs[ps.surf_b];
        let uw_a = [sa.closest_uw(&p0, &ps.uw_a[0]), sa.closest_uw(&p1, &ps.uw_a[1])];
        let uw_b = [sb.closest_uw(&p0, &ps.uw_b[0]), sb.closest_uw(&p1, &ps.uw_b[1])];

        let mut ids = [0; 2];
        for k in 0..2 {
            let ip = IPnt::new(
                ps.pnts[k],
                &[
                    Puw {
                        surf: ps.surf_a,
                        uw: uw_a[k],
                    },
                    Puw {
                        surf: ps.surf_b,
                        uw: uw_b[k],
                    },
                ],
            );
            ids[k] = self.push_ipnt(ip);
            self.bins.insert(ids[k], &ps.pnts[k]);
        }
        self.push_seg(ISeg {
            surf_a: ps.surf_a,
            surf_b: ps.surf_b,
            ip: ids,
            uw_a,
            uw_b,
        });
        true
    }

    /// Same surfaces and both ends within a small fraction of the match
    /// tolerance of an existing segment, in either orientation.
    fn is_duplicate_seg(&self, surf_a: usize, surf_b: usize, p0: &Vec3, p1: &Vec3) -> bool {
        let tol2 = (1e-2 * self.match_tol).powi(2);
        self.bins.candidates(p0).any(|id| {
            let ip = &self.ipnts[id];
            if ip.pnt.dist_squared(p0) > tol2 {
                return false;
            }
            ip.segs.iter().any(|&sid| {
                let s = &self.segs[sid];
                s.same_surfs(surf_a, surf_b)
                    && s.other_end(id)
                        .is_some_and(|o| self.ipnts[o].pnt.dist_squared(p1) <= tol2)
            })
        })
    }

    /// Unused IPnt nearest `end` on the same surface pair.
    fn find_link(&self, end: IPntId, surf_a: usize, surf_b: usize) -> Option<IPntId> {
        let p = self.ipnts[end].pnt;
        self.bins.find_closest(&self.ipnts, &p, self.match_tol, |id, ip| {
            id != end
                && !ip.used
                && ip
                    .segs
                    .first()
                    .is_some_and(|&s| self.segs[s].same_surfs(surf_a, surf_b))
        })
    }

    /// Orients `sid` so side A is on `surf_a` and `link` is its start (or
    /// its end when `link_is_start` is false).
    fn orient_seg(&mut self, sid: ISegId, surf_a: usize, link: IPntId, link_is_start: bool) {
        let seg = &mut self.segs[sid];
        if seg.surf_a != surf_a {
            std::mem::swap(&mut seg.surf_a, &mut seg.surf_b);
            std::mem::swap(&mut seg.uw_a, &mut seg.uw_b);
        }
        let at = if link_is_start { 0 } else { 1 };
        if seg.ip[at] != link {
            seg.flip();
        }
    }

    /// Links raw segments end to end into chains.
    pub fn build_chains(&mut self) {
        let mut dropped = 0usize;
        for seed in 0..self.segs.len() {
            let [i0, i1] = self.segs[seed].ip;
            if self.ipnts[i0].used || self.ipnts[i1].used {
                continue;
            }
            self.ipnts[i0].used = true;
            self.ipnts[i1].used = true;
            let (surf_a, surf_b) = (self.segs[seed].surf_a, self.segs[seed].surf_b);
            let mut chain = ISegChain::new(surf_a, surf_b, false);
            chain.segs.push_back(seed);

            // extend back
            while let Some(end) = chain.last_ipnt(&self.segs) {
                let Some(q) = self.find_link(end, surf_a, surf_b) else { break };
                let sid = self.ipnts[q].segs[0];
                self.orient_seg(sid, surf_a, q, true);
                let far = self.segs[sid].ip[1];
                self.ipnts[q].used = true;
                self.ipnts[far].used = true;
                chain.segs.push_back(sid);
            }
            // extend front
            while let Some(start) = chain.first_ipnt(&self.segs) {
                let Some(q) = self.find_link(start, surf_a, surf_b) else { break };
                let sid = self.ipnts[q].segs[0];
                self.orient_seg(sid, surf_a, q, false);
                let far = self.segs[sid].ip[0];
                self.ipnts[q].used = true;
                self.ipnts[far].used = true;
                chain.segs.push_front(sid);
            }

            if chain.valid(&self.ipnts, &self.segs) {
                debug!(
                    "chain {} between surfs {} and {}: {} segs",
                    self.chains.len(),
                    surf_a,
                    surf_b,
                    chain.segs.len()
                );
                self.chains.push(chain);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("dropped {dropped} degenerate chains");
        }
    }

    /// Turns every border curve pair into a densely sampled border chain.
    pub fn load_border_curves(&mut self, surfs: &[ParametricSurface], icurves: &[ICurve]) {
        for ic in icurves {
            let (a, b) = (&ic.a, &ic.b);
            let (sa, sb) = (&surfs[a.surf], &surfs[b.surf]);
            let span: f64 = a.uw.windows(2).map(|w| w[0].dist(&w[1])).sum();
            let n = ((span.ceil() as usize) * BORDER_SAMPLES_PER_UNIT).max(8);

            let mut chain = ISegChain::new(a.surf, b.surf, true);
            let mut prev: Option<(IPntId, Vec2, Vec2)> = None;
            for k in 0..=n {
                let t = k as f64 / n as f64;
                let uwa = a.comp_uw(t);
                let uwb = b.comp_uw(t);
                let pnt = (sa.comp_pnt_uw(&uwa) + sb.comp_pnt_uw(&uwb)) * 0.5;
                let mut ip = IPnt::new(pnt, &[Puw { surf: a.surf, uw: uwa }]);
                ip.add_puws(&[Puw { surf: b.surf, uw: uwb }]);
                ip.used = true;
                let id = self.push_ipnt(ip);
                if let Some((pid, puwa, puwb)) = prev {
                    let sid = self.push_seg(ISeg {
                        surf_a: a.surf,
                        surf_b: b.surf,
                        ip: [pid, id],
                        uw_a: [puwa, uwa],
                        uw_b: [puwb, uwb],
                    });
                    chain.segs.push_back(sid);
                }
                prev = Some((id, uwa, uwb));
            }
            self.chains.push(chain);
        }
    }

    /// Makes consecutive segments of each chain share one IPnt.
    pub fn merge_interior_chain_ipnts(&mut self) {
        for ci in 0..self.chains.len() {
            for k in 1..self.chains[ci].segs.len() {
                let prev_sid = self.chains[ci].segs[k - 1];
                let sid = self.chains[ci].segs[k];
                let keep = self.segs[prev_sid].ip[1];
                let donor = self.segs[sid].ip[0];
                if keep == donor {
                    continue;
                }
                let puws = self.ipnts[donor].puws.clone();
                self.ipnts[keep].add_puws(&puws);
                self.ipnts[keep].segs.push(sid);
                self.segs[sid].ip[0] = keep;
            }
        }
    }

    /// Splits border chains where intersection chains end on them.
    pub fn split_border_curves(&mut self) {
        let mut ends: Vec<(Vec3, usize, usize)> = Vec::new();
        for c in self.chains.iter().filter(|c| !c.border) {
            for ip in [c.first_ipnt(&self.segs), c.last_ipnt(&self.segs)].into_iter().flatten() {
                ends.push((self.ipnts[ip].pnt, c.surf_a, c.surf_b));
            }
        }

        for ci in 0..self.chains.len() {
            if !self.chains[ci].border {
                continue;
            }
            let chain = &self.chains[ci];
            let (Some(first), Some(last)) = (chain.first_ipnt(&self.segs), chain.last_ipnt(&self.segs)) else {
                continue;
            };
            let first_p = self.ipnts[first].pnt;
            let last_p = self.ipnts[last].pnt;

            let mut new_splits = Vec::new();
            for (p, sa, sb) in &ends {
                if !chain.touches(*sa) && !chain.touches(*sb) {
                    continue;
                }
                let mut best: Option<(f64, usize, f64, Vec3)> = None;
                for (idx, &sid) in chain.segs.iter().enumerate() {
                    let s = &self.segs[sid];
                    let (q, t) = closest_pnt_on_seg(&self.ipnts[s.ip[0]].pnt, &self.ipnts[s.ip[1]].pnt, p);
                    let d = q.dist(p);
                    if best.is_none_or(|(bd, ..)| d < bd) {
                        best = Some((d, idx, t, q));
                    }
                }
                let Some((d, idx, t, q)) = best else { continue };
                if d >= BORDER_SPLIT_TOL || q.dist(&first_p) < BORDER_END_TOL || q.dist(&last_p) < BORDER_END_TOL {
                    continue;
                }
                let s = &self.segs[chain.segs[idx]];
                new_splits.push(ISegSplit {
                    index: idx,
                    fract: t,
                    pnt: q,
                    uw_a: s.uw_a[0].lerp(&s.uw_a[1], t),
                    uw_b: s.uw_b[0].lerp(&s.uw_b[1], t),
                });
            }
            let chain = &mut self.chains[ci];
            chain.splits.extend(new_splits);
            chain.merge_splits(SPLIT_MERGE_TOL);
        }
        self.apply_splits();
    }

    /// Splits intersection chains where they cross each other in the
    /// parametric space of a shared surface.
    pub fn intersect_split_chains(&mut self) {
        let inter: Vec<usize> = (0..self.chains.len()).filter(|&i| !self.chains[i].border).collect();
        let mut trees = AHashMap::new();
        let mut found = 0usize;

        for (n, &i) in inter.iter().enumerate() {
            for &j in &inter[n + 1..] {
                let shared: Vec<usize> = [self.chains[i].surf_a, self.chains[i].surf_b]
                    .into_iter()
                    .filter(|s| self.chains[j].touches(*s))
                    .collect();
                for surf in shared {
                    for c in [i, j] {
                        if let std::collections::hash_map::Entry::Vacant(e) = trees.entry((c, surf)) {
                            e.insert(self.chains[c].seg_box_tree(&self.segs, surf));
                        }
                    }
                    let (Some(Some(ti)), Some(Some(tj))) = (trees.get(&(i, surf)), trees.get(&(j, surf))) else {
                        continue;
                    };
                    let mut hits = Vec::new();
                    ti.intersect(tj, &mut hits);
                    for (pi, pj, s, t) in hits {
                        let spi = self.split_at(i, pi, s);
                        let spj = self.split_at(j, pj, t);
                        let pnt = (spi.pnt + spj.pnt) * 0.5;
                        self.chains[i].splits.push(ISegSplit { pnt, ..spi });
                        self.chains[j].splits.push(ISegSplit { pnt, ..spj });
                        found += 1;
                    }
                }
            }
        }
        debug!("{found} chain crossings");

        for &i in &inter {
            let segs = &self.segs;
            let chain = &mut self.chains[i];
            chain.merge_splits(SPLIT_MERGE_TOL);
            chain.remove_chain_end_splits(segs, CHAIN_END_SPLIT_TOL);
        }
        self.apply_splits();
    }

    /// Split marker at `fract` along the `index`-th segment of chain `ci`.
    fn split_at(&self, ci: usize, index: usize, fract: f64) -> ISegSplit {
        let s = &self.segs[self.chains[ci].segs[index]];
        let p0 = self.ipnts[s.ip[0]].pnt;
        let p1 = self.ipnts[s.ip[1]].pnt;
        ISegSplit {
            index,
            fract,
            pnt: p0 + (p1 - p0) * fract,
            uw_a: s.uw_a[0].lerp(&s.uw_a[1], fract),
            uw_b: s.uw_b[0].lerp(&s.uw_b[1], fract),
        }
    }

    /// Replaces every chain that has pending splits by its pieces.
    fn apply_splits(&mut self) {
        let old = std::mem::take(&mut self.chains);
        for chain in old {
            let pieces = self.sort_and_split(chain);
            self.chains.extend(pieces);
        }
    }

    /// Cuts `chain` at its splits. Intersection pieces that are too short
    /// are dropped.
    fn sort_and_split(&mut self, mut chain: ISegChain) -> Vec<ISegChain> {
        if chain.splits.is_empty() {
            return vec![chain];
        }
        let mut splits = std::mem::take(&mut chain.splits);
        splits.sort_by(|a, b| a.index.cmp(&b.index).then(a.fract.total_cmp(&b.fract)));

        let mut out = Vec::new();
        let mut cur = chain.empty_like();
        let mut next = 0usize;
        for (pos, &sid) in chain.segs.iter().enumerate() {
            let seg = self.segs[sid].clone();
            let mut start = (seg.ip[0], seg.uw_a[0], seg.uw_b[0]);
            let mut cut_inside = false;
            let mut cut_after = false;

            while next < splits.len() && splits[next].index == pos {
                let sp = &splits[next];
                next += 1;
                if sp.fract <= SPLIT_FRACT_TOL {
                    if !cut_inside && !cur.segs.is_empty() {
                        out.push(std::mem::replace(&mut cur, chain.empty_like()));
                    }
                    continue;
                }
                if sp.fract >= 1.0 - SPLIT_FRACT_TOL {
                    cut_after = true;
                    continue;
                }
                let mut ip = IPnt::new(
                    sp.pnt,
                    &[Puw {
                        surf: chain.surf_a,
                        uw: sp.uw_a,
                    }],
                );
                ip.add_puws(&[Puw {
                    surf: chain.surf_b,
                    uw: sp.uw_b,
                }]);
                ip.used = true;
                let nid = self.push_ipnt(ip);
                let piece = self.push_seg(ISeg {
                    surf_a: chain.surf_a,
                    surf_b: chain.surf_b,
                    ip: [start.0, nid],
                    uw_a: [start.1, sp.uw_a],
                    uw_b: [start.2, sp.uw_b],
                });
                cur.segs.push_back(piece);
                out.push(std::mem::replace(&mut cur, chain.empty_like()));
                start = (nid, sp.uw_a, sp.uw_b);
                cut_inside = true;
            }

            if cut_inside {
                let piece = self.push_seg(ISeg {
                    surf_a: chain.surf_a,
                    surf_b: chain.surf_b,
                    ip: [start.0, seg.ip[1]],
                    uw_a: [start.1, seg.uw_a[1]],
                    uw_b: [start.2, seg.uw_b[1]],
                });
                cur.segs.push_back(piece);
            } else {
                cur.segs.push_back(sid);
            }
            if cut_after {
                out.push(std::mem::replace(&mut cur, chain.empty_like()));
            }
        }
        if !cur.segs.is_empty() {
            out.push(cur);
        }

        out.retain(|c| !c.segs.is_empty() && (c.border || c.valid(&self.ipnts, &self.segs)));
        out
    }

    /// Tessellates every chain by the density field: A is sampled, and B
    /// re-uses the same parameters.
    pub fn tessellate_chains(&mut self, surfs: &[ParametricSurface], density: &GridDensity) {
        let segs = &self.segs;
        let ipnts = &mut self.ipnts;
        for chain in &mut self.chains {
            chain.build_curves(segs);
            let sa = &surfs[chain.surf_a];
            let sb = &surfs[chain.surf_b];
            let two_sided = chain.surf_a != chain.surf_b;
            let (acurve, bcurve) = (&mut chain.acurve, &mut chain.bcurve);
            let paired = two_sided.then_some((sb, &*bcurve));
            acurve.tessellate(sa, density, paired);
            bcurve.tessellate_with(acurve.tess());
            chain.apply_tess(ipnts, surfs);
        }
        let total: usize = self.chains.iter().map(|c| c.tess.len()).sum();
        info!("tessellated {} chains into {} points", self.chains.len(), total);
    }

    /// Merges the tessellation end points of chains that meet.
    ///
    /// Each chain end starts as its own group, border chains first. The
    /// closest pair of groups (by the distance of their first points) is
    /// merged while that distance is below `tol`. Every group
    /// then becomes one IPnt holding all member projections, and the chain
    /// ends are re-pointed at it. Groups that already share one IPnt are
    /// left untouched, so a second run changes nothing.
    pub fn merge_border_end_points(&mut self, surfs: &[ParametricSurface], tol: f64) {
        let mut order: Vec<usize> = (0..self.chains.len()).filter(|&c| !self.chains[c].tess.is_empty()).collect();
        order.sort_by_key(|&c| !self.chains[c].border);

        // (chain, tess index)
        let mut members: Vec<Vec<(usize, usize)>> = Vec::new();
        for &c in &order {
            let n = self.chains[c].tess.len();
            members.push(vec![(c, 0)]);
            members.push(vec![(c, n - 1)]);
        }
        let first_pnt = |m: &[(usize, usize)], chains: &[ISegChain], ipnts: &[IPnt]| -> Vec3 {
            let (c, k) = m[0];
            ipnts[chains[c].tess[k]].pnt
        };

        let pts: Vec<Vec3> = members
            .iter()
            .map(|m| first_pnt(m, &self.chains, &self.ipnts))
            .collect();
        let mut by_x: Vec<usize> = (0..pts.len()).collect();
        by_x.sort_by(|&a, &b| pts[a].x.total_cmp(&pts[b].x));
        let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
        for (n, &a) in by_x.iter().enumerate() {
            for &b in &by_x[n + 1..] {
                if pts[b].x - pts[a].x >= tol {
                    break;
                }
                let d = pts[a].dist(&pts[b]);
                if d < tol {
                    pairs.push((d, a.min(b), a.max(b)));
                }
            }
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut root: Vec<usize> = (0..members.len()).collect();
        fn find(root: &mut [usize], mut i: usize) -> usize {
            while root[i] != i {
                root[i] = root[root[i]];
                i = root[i];
            }
            i
        }
        for (_, a, b) in pairs {
            let ra = find(&mut root, a);
            let rb = find(&mut root, b);
            if ra == rb {
                continue;
            }
            let (keep, gone) = (ra.min(rb), ra.max(rb));
            let d = first_pnt(&members[keep], &self.chains, &self.ipnts)
                .dist(&first_pnt(&members[gone], &self.chains, &self.ipnts));
            if d >= tol {
                continue;
            }
            let moved = std::mem::take(&mut members[gone]);
            members[keep].extend(moved);
            root[gone] = keep;
        }

        let mut merged = 0usize;
        for group in members.iter().filter(|m| !m.is_empty()) {
            let mut ids: Vec<IPntId> = group.iter().map(|&(c, k)| self.chains[c].tess[k]).collect();
            ids.sort_unstable();
            ids.dedup();
            if ids.len() < 2 {
                continue;
            }
            let mut ip = IPnt {
                used: true,
                ..Default::default()
            };
            for id in &ids {
                let puws = self.ipnts[*id].puws.clone();
                ip.add_puws(&puws);
            }
            ip.comp_pnt(surfs);
            let nid = self.push_ipnt(ip);
            for &(c, k) in group {
                let chain = &mut self.chains[c];
                chain.tess[k] = nid;
                let m = &self.ipnts[nid];
                if let Some(p) = m.closest_puw(chain.surf_a, &chain.tess_uw_a[k]) {
                    chain.tess_uw_a[k] = p.uw;
                }
                if let Some(p) = m.closest_puw(chain.surf_b, &chain.tess_uw_b[k]) {
                    chain.tess_uw_b[k] = p.uw;
                }
            }
            merged += 1;
        }
        debug!("merged {merged} chain end groups");
    }
}
