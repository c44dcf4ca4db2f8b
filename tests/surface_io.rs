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

use cfdmesh::{
    MeshError,
    geometry::Vec3,
    io::{load_surfaces, read_surfaces, save_surfaces, write_surfaces},
    surface::ParametricSurface,
};

/// A 7×4 curved grid whose coordinates have no short decimal form.
fn wavy(comp: i32, id: usize, shift: f64) -> ParametricSurface {
    let pnts = (0..7)
        .map(|i| {
            (0..4)
                .map(|j| {
                    let (u, w) = (i as f64 / 6.0, j as f64 / 3.0);
                    Vec3::new(u + shift, w * std::f64::consts::PI, (u * 7.3).sin() * (w + 0.1).sqrt() / 3.0)
                })
                .collect()
        })
        .collect();
    ParametricSurface::new(comp, id, pnts).unwrap()
}

#[test]
fn text_round_trip_is_bit_exact() {
    let surfs = vec![wavy(4, 0, 0.0), wavy(-2, 1, 1.0 / 3.0), wavy(4, 2, 2.0e-7)];
    let mut buf = Vec::new();
    write_surfaces(&mut buf, &surfs).unwrap();
    let back = read_surfaces(buf.as_slice()).unwrap();

    assert_eq!(back.len(), surfs.len());
    // grouped by component, so the order is 4, 4, -2
    let expected = [&surfs[0], &surfs[2], &surfs[1]];
    for (k, (got, want)) in back.iter().zip(expected).enumerate() {
        assert_eq!(got.surf_id(), k);
        assert_eq!(got.comp_id(), want.comp_id());
        assert_eq!((got.num_u(), got.num_w()), (want.num_u(), want.num_w()));
        for (ra, rb) in got.control_points().iter().zip(want.control_points()) {
            for (a, b) in ra.iter().zip(rb) {
                assert_eq!(a.x.to_bits(), b.x.to_bits());
                assert_eq!(a.y.to_bits(), b.y.to_bits());
                assert_eq!(a.z.to_bits(), b.z.to_bits());
            }
        }
    }
}

#[test]
fn file_round_trip() {
    let path = std::env::temp_dir().join(format!("cfdmesh_surf_{}.txt", std::process::id()));
    let surfs = vec![wavy(0, 0, 0.0)];
    save_surfaces(&path, &surfs).unwrap();
    let back = load_surfaces(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].control_points(), surfs[0].control_points());
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("cfdmesh_no_such_dir").join("none.txt");
    assert!(matches!(load_surfaces(path), Err(MeshError::Io(_))));
}
