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

use ahash::AHashSet;
use log::debug;

use crate::{
    curve::scurve::SCurve,
    surface::bezier::{ParametricSurface, row_match_dir},
};

/// A border curve paired with the coincident border of a neighbouring
/// surface. Unmatched borders pair with themselves.
#[derive(Debug, Clone)]
pub struct ICurve {
    pub a: SCurve,
    pub b: SCurve,
    pub matched: bool,
}

impl ICurve {
    pub fn surf_a(&self) -> usize {
        self.a.surf
    }

    pub fn surf_b(&self) -> usize {
        self.b.surf
    }
}

/// Pairs up border curves whose control rows coincide. `surfs[i]` must
/// have surface id `i`.
pub fn build_border_icurves(surfs: &[ParametricSurface]) -> Vec<ICurve> {
    let mut used: AHashSet<(usize, usize)> = AHashSet::new();
    let mut out = Vec::new();

    for (si, surf) in surfs.iter().enumerate() {
        for curve in &surf.border_curves {
            let Some(side) = curve.border_side else { continue };
            if used.contains(&(si, side)) {
                continue;
            }
            used.insert((si, side));
            let row = surf.border_control_points(side);

            let mut pair: Option<SCurve> = None;
            'search: for (sj, other) in surfs.iter().enumerate().skip(si) {
                if !surf.bbox().intersects(other.bbox()) {
                    continue;
                }
                for oc in &other.border_curves {
                    let Some(oside) = oc.border_side else { continue };
                    if used.contains(&(sj, oside)) {
                        continue;
                    }
                    if let Some(reversed) = row_match_dir(&row, &other.border_control_points(oside)) {
                        used.insert((sj, oside));
                        pair = Some(if reversed { oc.reversed() } else { oc.clone() });
                        break 'search;
                    }
                }
            }

            match pair {
                Some(b) => out.push(ICurve {
                    a: curve.clone(),
                    b,
                    matched: true,
                }),
                None => {
                    debug!("surface {si} border {side} has no partner");
                    out.push(ICurve {
                        a: curve.clone(),
                        b: curve.clone(),
                        matched: false,
                    });
                }
            }
        }
    }
    out
}
