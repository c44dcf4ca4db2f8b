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

/// NASCART `.dat`: counts, points as `x z -y`, and 1-based triangles
/// tagged with their component colour.
pub fn write_dat<W: Write>(out: &mut W, mesh: &FinalMesh) -> io::Result<()> {
    writeln!(out, "{} {}", mesh.num_pnts(), mesh.num_tris())?;
    for p in &mesh.pnts {
        writeln!(out, "{} {} {}", p.x, p.z, -p.y)?;
    }
    for (t, comp) in mesh.tris.iter().zip(&mesh.tri_comp) {
        writeln!(out, "{} {} {} {}.0", t[0] + 1, t[1] + 1, t[2] + 1, comp + 1)?;
    }
    Ok(())
}

/// NASCART `.key`: one colour line per surface.
pub fn write_key<W: Write>(out: &mut W, surf_comps: &[i32]) -> io::Result<()> {
    writeln!(out, "Color\tName\t\t\tBCType")?;
    for (i, comp) in surf_comps.iter().enumerate() {
        writeln!(out, "{}.0  Section_{}  0", comp + 1, i)?;
    }
    Ok(())
}

pub fn save_nascart<P: AsRef<Path>>(dat: P, key: P, mesh: &FinalMesh, surf_comps: &[i32]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(dat)?);
    write_dat(&mut out, mesh)?;
    out.flush()?;
    let mut out = BufWriter::new(File::create(key)?);
    write_key(&mut out, surf_comps)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_lists_sections() {
        let mut buf = Vec::new();
        write_key(&mut buf, &[0, 0, 2]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "Color\tName\t\t\tBCType\n1.0  Section_0  0\n1.0  Section_1  0\n3.0  Section_2  0\n"
        );
    }
}
