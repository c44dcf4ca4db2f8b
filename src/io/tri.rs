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

/// Cart3D surface triangulation: counts, points, 1-based triangles, then
/// one component tag per triangle.
pub fn write_tri<W: Write>(out: &mut W, mesh: &FinalMesh) -> io::Result<()> {
    writeln!(out, "{}, {}", mesh.num_pnts(), mesh.num_tris())?;
    for p in &mesh.pnts {
        writeln!(out, "{}, {}, {}", p.x, p.y, p.z)?;
    }
    for t in &mesh.tris {
        writeln!(out, "{}, {}, {}", t[0] + 1, t[1] + 1, t[2] + 1)?;
    }
    for comp in &mesh.tri_comp {
        writeln!(out, "{}", comp + 1)?;
    }
    Ok(())
}

pub fn save_tri<P: AsRef<Path>>(path: P, mesh: &FinalMesh) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_tri(&mut out, mesh)?;
    out.flush()
}
