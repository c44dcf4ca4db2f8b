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

/// Gmsh 2.2 ASCII: nodes and 3-node triangle elements (type 2, no tags).
pub fn write_gmsh<W: Write>(out: &mut W, mesh: &FinalMesh) -> io::Result<()> {
    writeln!(out, "$MeshFormat")?;
    writeln!(out, "2.2 0 {}", std::mem::size_of::<f64>())?;
    writeln!(out, "$EndMeshFormat")?;

    writeln!(out, "$Nodes")?;
    writeln!(out, "{}", mesh.num_pnts())?;
    for (i, p) in mesh.pnts.iter().enumerate() {
        writeln!(out, "{} {} {} {}", i + 1, p.x, p.y, p.z)?;
    }
    writeln!(out, "$EndNodes")?;

    writeln!(out, "$Elements")?;
    writeln!(out, "{}", mesh.num_tris())?;
    for (e, t) in mesh.tris.iter().enumerate() {
        writeln!(out, "{} 2 0 {} {} {}", e + 1, t[0] + 1, t[1] + 1, t[2] + 1)?;
    }
    writeln!(out, "$EndElements")?;
    Ok(())
}

pub fn save_gmsh<P: AsRef<Path>>(path: P, mesh: &FinalMesh) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_gmsh(&mut out, mesh)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;

    #[test]
    fn gmsh_sections_in_order() {
        let mesh = FinalMesh {
            pnts: vec![Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            tris: vec![[0, 1, 2]],
            tri_comp: vec![0],
            tri_surf: vec![0],
        };
        let mut buf = Vec::new();
        write_gmsh(&mut buf, &mesh).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(&lines[..3], &["$MeshFormat", "2.2 0 8", "$EndMeshFormat"]);
        assert_eq!(lines[4], "3");
        assert!(lines.contains(&"1 2 0 1 2 3"));
        assert_eq!(*lines.last().unwrap(), "$EndElements");
    }
}
