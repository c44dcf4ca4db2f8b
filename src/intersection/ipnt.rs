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

use smallvec::SmallVec;

use crate::{
    geometry::{Vec2, Vec3},
    intersection::iseg::ISegId,
    surface::bezier::ParametricSurface,
};

pub type IPntId = usize;

/// Projections closer than this on one surface are folded into one.
const PUW_FOLD_TOL2: f64 = 1e-4;

/// A parametric location on one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Puw {
    pub surf: usize,
    pub uw: Vec2,
}

/// A 3D point that lies on two or more surfaces.
#[derive(Debug, Clone, Default)]
pub struct IPnt {
    pub pnt: Vec3,
    pub puws: SmallVec<[Puw; 2]>,
    pub segs: SmallVec<[ISegId; 2]>,
    pub used: bool,
}

impl IPnt {
    pub fn new(pnt: Vec3, puws: &[Puw]) -> Self {
        Self {
            pnt,
            puws: puws.iter().copied().collect(),
            segs: SmallVec::new(),
            used: false,
        }
    }

    /// Projection on `surf` nearest `hint`.
    pub fn closest_puw(&self, surf: usize, hint: &Vec2) -> Option<&Puw> {
        self.puws
            .iter()
            .filter(|p| p.surf == surf)
            .min_by(|a, b| a.uw.dist_squared(hint).total_cmp(&b.uw.dist_squared(hint)))
    }

    pub fn has_surf(&self, surf: usize) -> bool {
        self.puws.iter().any(|p| p.surf == surf)
    }

    /// Absorbs projections from a donor. A projection close to one already
    /// held on the same surface is averaged into it.
    pub fn add_puws(&mut self, donor: &[Puw]) {
        for p in donor {
            let near = self
                .puws
                .iter_mut()
                .find(|q| q.surf == p.surf && q.uw.dist_squared(&p.uw) < PUW_FOLD_TOL2);
            match near {
                Some(q) => q.uw = q.uw.lerp(&p.uw, 0.5),
                None => self.puws.push(*p),
            }
        }
    }

    /// Recomputes `pnt` as the average of the surface evaluations.
    pub fn comp_pnt(&mut self, surfs: &[ParametricSurface]) {
        if self.puws.is_empty() {
            return;
        }
        let mut sum = Vec3::zero();
        for p in &self.puws {
            sum += surfs[p.surf].comp_pnt_uw(&p.uw);
        }
        self.pnt = sum / self.puws.len() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nearby_projections_fold_together() {
        let mut a = IPnt::new(Vec3::zero(), &[Puw { surf: 0, uw: Vec2::new(0.0, 0.0) }]);
        a.add_puws(&[
            Puw { surf: 0, uw: Vec2::new(0.002, 0.0) },
            Puw { surf: 1, uw: Vec2::new(0.5, 0.5) },
        ]);
        assert_eq!(a.puws.len(), 2);
        assert_relative_eq!(a.puws[0].uw.x, 0.001);
    }

    #[test]
    fn seam_projections_stay_apart() {
        let mut a = IPnt::new(Vec3::zero(), &[Puw { surf: 0, uw: Vec2::new(0.0, 0.3) }]);
        a.add_puws(&[Puw { surf: 0, uw: Vec2::new(1.0, 0.3) }]);
        assert_eq!(a.puws.len(), 2);
        let near_end = a.closest_puw(0, &Vec2::new(0.9, 0.3)).unwrap();
        assert_relative_eq!(near_end.uw.x, 1.0);
    }
}
