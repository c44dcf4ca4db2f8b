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

use log::debug;

use crate::{
    config::{MeshConfig, rad_frac},
    density::{kd_tree::KdTree, source::Source},
    geometry::Vec3,
};

/// Target edge-length field: a background length refined by sources and
/// surface curvature, with neighbouring lengths limited by a growth ratio.
#[derive(Debug, Clone)]
pub struct GridDensity {
    base_len: f64,
    min_len: f64,
    max_gap: f64,
    num_circle_segments: f64,
    grow_ratio: f64,
    rad_frac: f64,
    sources: Vec<Source>,
}

impl Default for GridDensity {
    fn default() -> Self {
        Self::from_config(&MeshConfig::default())
    }
}

impl GridDensity {
    pub fn from_config(cfg: &MeshConfig) -> Self {
        Self {
            base_len: cfg.base_len,
            min_len: cfg.min_len,
            max_gap: cfg.max_gap,
            num_circle_segments: cfg.num_circle_segments,
            grow_ratio: cfg.grow_ratio,
            rad_frac: cfg.rad_frac(),
            sources: Vec::new(),
        }
    }

    /// Re-reads the scalar controls, keeping the sources.
    pub fn apply_config(&mut self, cfg: &MeshConfig) {
        self.base_len = cfg.base_len;
        self.min_len = cfg.min_len;
        self.max_gap = cfg.max_gap;
        self.num_circle_segments = cfg.num_circle_segments;
        self.grow_ratio = cfg.grow_ratio;
        self.rad_frac = rad_frac(cfg.num_circle_segments);
    }

    pub fn base_len(&self) -> f64 {
        self.base_len
    }

    pub fn min_len(&self) -> f64 {
        self.min_len
    }

    pub fn max_gap(&self) -> f64 {
        self.max_gap
    }

    pub fn num_circle_segments(&self) -> f64 {
        self.num_circle_segments
    }

    pub fn grow_ratio(&self) -> f64 {
        self.grow_ratio
    }

    pub fn rad_frac(&self) -> f64 {
        self.rad_frac
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn add_source(&mut self, src: Source) {
        self.sources.push(src);
    }

    pub fn clear_sources(&mut self) {
        self.sources.clear();
    }

    /// Re-syncs every source mirror. `sym` is the symmetry sign vector of
    /// the owning geometry, or `None` for asymmetric models.
    pub fn update_mirrors(&mut self, sym: Option<Vec3>) {
        for s in &mut self.sources {
            s.update_mirror(sym);
        }
    }

    pub fn scale_all_sources(&mut self, factor: f64) {
        for s in &mut self.sources {
            s.scale(factor);
        }
    }

    pub fn check_correct_rads(&mut self) {
        let base = self.base_len;
        for s in &mut self.sources {
            s.check_correct_rad(base);
        }
    }

    /// `min(base_len, min over sources)` at `pos`.
    pub fn target_len(&self, pos: &Vec3) -> f64 {
        self.sources
            .iter()
            .map(|s| s.target_len(self.base_len, pos))
            .fold(self.base_len, f64::min)
    }

    /// Edge length that keeps the chordal gap under `max_gap` and spends
    /// `num_circle_segments` edges on a circle of radius `radius`.
    pub fn curvature_target_len(&self, radius: f64) -> f64 {
        if !radius.is_finite() || radius >= f64::MAX {
            return self.base_len;
        }
        let gap = self.max_gap;
        let gap_len = if radius > gap {
            2.0 * (2.0 * radius * gap - gap * gap).sqrt()
        } else {
            2.0 * gap
        };
        let circ_len = radius * self.rad_frac;
        gap_len.min(circ_len)
    }

    /// Limits `samples` so that no length exceeds a neighbour's length
    /// grown at `grow_ratio` over their distance. Returns the limited
    /// lengths in input order.
    pub fn limit_by_growth(&self, samples: &[(Vec3, f64)]) -> Vec<f64> {
        let mut lens: Vec<f64> = samples.iter().map(|(_, l)| *l).collect();
        if samples.len() < 2 {
            return lens;
        }
        let slope = self.grow_ratio - 1.0;
        let tree = KdTree::build(samples.iter().map(|(p, _)| *p).collect());

        let mut order: Vec<usize> = (0..samples.len()).collect();
        order.sort_by(|&a, &b| lens[a].total_cmp(&lens[b]));

        let mut limited = 0usize;
        for &q in &order {
            let q_len = lens[q];
            // only samples longer than q can be pulled down by it
            let reach = (self.base_len - q_len).max(0.0) / slope;
            if reach <= 0.0 {
                continue;
            }
            for (s, d2) in tree.radius_search(&samples[q].0, reach) {
                let bound = q_len + slope * d2.sqrt();
                if bound < lens[s] {
                    lens[s] = bound;
                    limited += 1;
                }
            }
        }
        debug!("growth limit touched {limited} of {} samples", samples.len());
        lens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn target_len_never_exceeds_base() {
        let mut g = GridDensity::default();
        g.add_source(Source::point("p", Vec3::zero(), 0.1, 1.0));
        for i in 0..50 {
            let p = Vec3::new(i as f64 * 0.05, 0.0, 0.0);
            assert!(g.target_len(&p) <= g.base_len());
        }
        assert_relative_eq!(g.target_len(&Vec3::zero()), 0.1);
    }

    #[test]
    fn flat_surface_uses_base_length() {
        let g = GridDensity::default();
        assert_relative_eq!(g.curvature_target_len(f64::MAX), g.base_len());
    }

    #[test]
    fn small_radius_gives_short_edges() {
        let g = GridDensity::default();
        let l = g.curvature_target_len(0.1);
        // 16 segments on a circle of radius 0.1
        assert!(l <= 0.1 * 2.0 * (std::f64::consts::PI / 16.0).sin() + 1e-12);
    }

    #[test]
    fn growth_limit_caps_jumps() {
        let g = GridDensity::default();
        let samples = vec![
            (Vec3::zero(), 0.1),
            (Vec3::new(0.1, 0.0, 0.0), 0.5),
            (Vec3::new(2.0, 0.0, 0.0), 0.5),
        ];
        let lens = g.limit_by_growth(&samples);
        assert_relative_eq!(lens[0], 0.1);
        assert_relative_eq!(lens[1], 0.1 + 0.3 * 0.1, epsilon = 1e-12);
        assert_relative_eq!(lens[2], 0.5);
    }
}
