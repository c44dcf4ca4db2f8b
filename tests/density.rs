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

use approx::assert_relative_eq;
use cfdmesh::{
    MeshConfig,
    density::{GridDensity, Source},
    geometry::Vec3,
};

fn density() -> GridDensity {
    GridDensity::from_config(&MeshConfig::new(1.0))
}

#[test]
fn target_len_grows_away_from_every_source() {
    let sources = [
        (Source::point("nose", Vec3::zero(), 0.05, 2.0), Vec3::zero()),
        (
            Source::line("edge", Vec3::zero(), 0.1, 1.0, Vec3::new(0.0, 2.0, 0.0), 0.2, 1.5),
            Vec3::new(0.0, 1.0, 0.0),
        ),
        (
            Source::boxed("wake", Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5), 0.3, 1.0),
            Vec3::zero(),
        ),
    ];
    let dirs = [
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(-0.6, 0.0, 0.8),
        Vec3::new(0.0, 0.6, -0.8),
    ];
    for (src, origin) in sources {
        let mut g = density();
        g.add_source(src);
        for d in dirs {
            let mut prev = g.target_len(&origin);
            for k in 1..=40 {
                let l = g.target_len(&(origin + d * (k as f64 * 0.1)));
                assert!(l <= g.base_len() + 1e-12);
                assert!(l + 1e-12 >= prev, "length shrank at step {k}: {prev} -> {l}");
                prev = l;
            }
            assert_relative_eq!(prev, g.base_len());
        }
    }
}

#[test]
fn point_source_is_monotone_along_rays() {
    let mut g = density();
    g.add_source(Source::point("p", Vec3::new(1.0, 2.0, 3.0), 0.1, 1.5));
    for d in [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.6, 0.8)] {
        let mut prev = 0.0;
        for k in 0..40 {
            let l = g.target_len(&(Vec3::new(1.0, 2.0, 3.0) + d * (k as f64 * 0.05)));
            assert!(l >= prev);
            assert!(l <= 1.0);
            prev = l;
        }
        assert_relative_eq!(prev, 1.0);
    }
}

#[test]
fn zero_radius_source_only_touches_its_point() {
    let mut g = density();
    let at = Vec3::new(0.5, 0.5, 0.5);
    g.add_source(Source::point("pin", at, 0.01, 0.0));
    assert_relative_eq!(g.target_len(&at), 0.01);
    assert_relative_eq!(g.target_len(&(at + Vec3::new(1e-9, 0.0, 0.0))), 1.0);
    assert_relative_eq!(g.target_len(&Vec3::zero()), 1.0);
}

#[test]
fn scaling_sources_scales_lengths() {
    let mut g = density();
    g.add_source(Source::point("p", Vec3::zero(), 0.2, 1.0));
    let at = Vec3::new(0.5, 0.0, 0.0);
    let before = g.target_len(&at);
    let mut cfg = MeshConfig::new(1.0);
    cfg.scale_tri_size(2.0);
    g.apply_config(&cfg);
    g.scale_all_sources(2.0);
    assert_relative_eq!(g.target_len(&(at * 2.0)), before * 2.0, epsilon = 1e-12);
}
