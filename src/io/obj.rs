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

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::mesh::FinalMesh;

/// Wavefront OBJ in the solver frame: y up, so each point is written as
/// `x z -y`. Faces are 1-based.
pub fn write_obj<W: Write>(out: &mut W, mesh: &FinalMesh) -> io::Result<()> {
    for p in &mesh.pnts {
        writeln!(out, "v {:16.10} {:16.10} {:16.10}", p.x, p.z, -p.y)?;
    }
    writeln!(out)?;
    for t in &mesh.tris {
        writeln!(out, "f {} {} {}", t[0] + 1, t[1] + 1, t[2] + 1)?;
    }
    Ok(())
}

pub fn save_obj<P: AsRef<Path>>(path: P, mesh: &FinalMesh) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_obj(&mut out, mesh)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;

    #[test]
    fn obj_swaps_axes_and_uses_one_based_faces() {
        let mesh = FinalMesh {
            pnts: vec![
                Vec3::new(1.0, 2.0, 3.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
            tris: vec![[0, 1, 2]],
            tri_comp: vec![0],
            tri_surf: vec![0],
        };
        let mut buf = Vec::new();
        write_obj(&mut buf, &mesh).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first: Vec<f64> = text
            .lines()
            .next()
            .unwrap()
            .split_whitespace()
            .skip(1)
            .map(|s| s.parse().unwrap())
            .collect();
        assert_eq!(first, vec![1.0, 3.0, -2.0]);
        assert!(text.contains("\n\nf 1 2 3\n"));
    }
}
