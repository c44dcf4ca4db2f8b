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

use crate::{
    geometry::Vec3,
    intersection::ipnt::{IPnt, IPntId},
};

/// Number of neighbouring cell ids probed on each side of a lookup.
pub const BIN_PROBE: i64 = 3;

/// IPnts whose position hashes to one cell.
#[derive(Debug, Clone, Default)]
pub struct IPntBin {
    pub id: i64,
    pub ipnts: Vec<IPntId>,
    /// Ids of the cells on either side.
    pub adj: [i64; 2],
}

/// One-dimensional bins over `x + y + z`.
///
/// Two points within `tol` of each other differ by at most `√3·tol` in
/// the key coordinate, so with a cell width of `4·tol` they always fall in
/// the same or adjacent cells.
#[derive(Debug, Clone)]
pub struct BinMap {
    cell: f64,
    hash_inv: f64,
    bins: AHashMap<i64, IPntBin>,
}

impl BinMap {
    pub fn new(tol: f64) -> Self {
        let mut cell = (4.0 * tol).max(1e-12);
        if !cell.is_finite() {
            cell = 1e-5;
        }
        Self {
            cell,
            hash_inv: 1.0 / cell,
            bins: AHashMap::default(),
        }
    }

    pub fn cell(&self) -> f64 {
        self.cell
    }

    #[inline(always)]
    fn floor_sat_i64(x: f64) -> i64 {
        if !x.is_finite() {
            return if x.is_sign_positive() { i64::MAX } else { i64::MIN };
        }
        let i = x as i64;
        i - ((i as f64 > x) as i64)
    }

    #[inline(always)]
    pub fn key(&self, p: &Vec3) -> i64 {
        Self::floor_sat_i64((p.x + p.y + p.z) * self.hash_inv)
    }

    pub fn insert(&mut self, id: IPntId, p: &Vec3) {
        let key = self.key(p);
        let bin = self.bins.entry(key).or_insert_with(|| IPntBin {
            id: key,
            ipnts: Vec::new(),
            adj: [key.saturating_sub(1), key.saturating_add(1)],
        });
        bin.ipnts.push(id);
    }

    pub fn clear(&mut self) {
        self.bins.clear();
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Every IPnt id stored in the cell of `p` or within `BIN_PROBE` cells of it.
    pub fn candidates(&self, p: &Vec3) -> impl Iterator<Item = IPntId> + '_ {
        let key = self.key(p);
        (-BIN_PROBE..=BIN_PROBE)
            .filter_map(move |d| self.bins.get(&key.saturating_add(d)))
            .flat_map(|b| b.ipnts.iter().copied())
    }

    /// Nearest stored IPnt within `tol` of `p` that passes `accept`.
    pub fn find_closest(
        &self,
        ipnts: &[IPnt],
        p: &Vec3,
        tol: f64,
        mut accept: impl FnMut(IPntId, &IPnt) -> bool,
    ) -> Option<IPntId> {
        let tol2 = tol * tol;
        let mut best: Option<(IPntId, f64)> = None;
        for id in self.candidates(p) {
            let ip = &ipnts[id];
            let d2 = ip.pnt.dist_squared(p);
            if d2 > tol2 || !accept(id, ip) {
                continue;
            }
            if best.is_none_or(|(_, bd)| d2 < bd) {
                best = Some((id, d2));
            }
        }
        best.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersection::ipnt::Puw;

    #[test]
    fn close_points_land_in_reach() {
        let tol = 1e-3;
        let mut bins = BinMap::new(tol);
        let a = Vec3::new(0.1, 0.2, 0.3);
        let b = Vec3::new(0.1 + 0.9e-3, 0.2, 0.3);
        bins.insert(0, &a);
        assert!((bins.key(&a) - bins.key(&b)).abs() <= 1);
        assert!(bins.candidates(&b).any(|id| id == 0));
    }

    #[test]
    fn find_closest_prefers_nearest_accepted() {
        let pts = vec![
            IPnt::new(Vec3::new(0.0, 0.0, 0.0), &[Puw { surf: 0, uw: Default::default() }]),
            IPnt::new(Vec3::new(1e-4, 0.0, 0.0), &[Puw { surf: 0, uw: Default::default() }]),
            IPnt::new(Vec3::new(5e-4, 0.0, 0.0), &[Puw { surf: 0, uw: Default::default() }]),
        ];
        let mut bins = BinMap::new(1e-3);
        for (i, p) in pts.iter().enumerate() {
            bins.insert(i, &p.pnt);
        }
        let q = Vec3::new(1.1e-4, 0.0, 0.0);
        assert_eq!(bins.find_closest(&pts, &q, 1e-3, |_, _| true), Some(1));
        assert_eq!(bins.find_closest(&pts, &q, 1e-3, |id, _| id != 1), Some(0));
        assert_eq!(bins.find_closest(&pts, &Vec3::new(1.0, 0.0, 0.0), 1e-3, |_, _| true), None);
    }
}
