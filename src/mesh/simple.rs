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

use crate::geometry::{Vec2, Vec3};

const CONDENSE_HASH: f64 = 1.0e4;
const CONDENSE_TOL: f64 = 1.0e-8;

/// Flat triangle soup of one surface, ready for export.
#[derive(Debug, Clone, Default)]
pub struct SimpleMesh {
    pub pnts: Vec<Vec3>,
    pub uws: Vec<Vec2>,
    pub tris: Vec<[usize; 3]>,
    pub surf_id: usize,
    pub comp_id: i32,
}

impl SimpleMesh {
    pub fn is_empty(&self) -> bool {
        self.tris.is_empty()
    }

    /// Welds points closer than `1e-8` and drops triangles that collapse
    /// as a result.
    pub fn condense(&mut self) {
        let mut buckets: AHashMap<i64, Vec<usize>> = AHashMap::new();
        let mut remap = Vec::with_capacity(self.pnts.len());
        let mut pnts = Vec::with_capacity(self.pnts.len());
        let mut uws = Vec::with_capacity(self.uws.len());
        let tol2 = CONDENSE_TOL * CONDENSE_TOL;

        for (i, p) in self.pnts.iter().enumerate() {
            let key = ((p.x + p.y + p.z) * CONDENSE_HASH).floor() as i64;
            let mut found = None;
            'cells: for k in key - 1..=key + 1 {
                if let Some(ids) = buckets.get(&k) {
                    for &j in ids {
                        let q: &Vec3 = &pnts[j];
                        if q.dist_squared(p) < tol2 {
                            found = Some(j);
                            break 'cells;
                        }
                    }
                }
            }
            let id = match found {
                Some(j) => j,
                None => {
                    let j = pnts.len();
                    pnts.push(*p);
                    if let Some(uw) = self.uws.get(i) {
                        uws.push(*uw);
                    }
                    buckets.entry(key).or_default().push(j);
                    j
                }
            };
            remap.push(id);
        }

        self.tris = self
            .tris
            .iter()
            .map(|t| [remap[t[0]], remap[t[1]], remap[t[2]]])
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
            .collect();
        self.pnts = pnts;
        self.uws = uws;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condense_merges_coincident_points() {
        let mut m = SimpleMesh {
            pnts: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 0.0, 1e-10),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 1e-12),
            ],
            tris: vec![[0, 1, 2], [3, 4, 2], [4, 5, 2]],
            ..Default::default()
        };
        m.condense();
        assert_eq!(m.pnts.len(), 4);
        assert_eq!(m.tris, vec![[0, 1, 2], [1, 3, 2]]);
    }
}
