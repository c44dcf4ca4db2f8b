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
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{
    geometry::{Vec3, util::tri_normal},
    mesh::FinalMesh,
};

/// Writes one ASCII STL solid.
/// Format:
///   solid <name>
///   facet normal nx ny nz
///     outer loop
///       vertex x1 y1 z1
///       vertex x2 y2 z2
///       vertex x3 y3 z3
///     endloop
///   endfacet
///   endsolid <name>
pub fn write_facets<W: Write>(out: &mut W, name: &str, tris: &[[Vec3; 3]]) -> io::Result<()> {
    writeln!(out, "solid {name}")?;
    for [a, b, c] in tris {
        let n = tri_normal(a, b, c);
        let n = if n.is_finite() { n } else { Vec3::zero() };
        writeln!(out, "  facet normal {} {} {}", n.x, n.y, n.z)?;
        writeln!(out, "    outer loop")?;
        for v in [a, b, c] {
            writeln!(out, "      vertex {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(out, "    endloop")?;
        writeln!(out, "  endfacet")?;
    }
    writeln!(out, "endsolid {name}")?;
    Ok(())
}

pub fn write_stl<W: Write>(out: &mut W, mesh: &FinalMesh) -> io::Result<()> {
    let tris: Vec<[Vec3; 3]> = (0..mesh.num_tris()).map(|t| mesh.tri_pnts(t)).collect();
    write_facets(out, "cfdmesh", &tris)
}

pub fn save_stl<P: AsRef<Path>>(path: P, mesh: &FinalMesh) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_stl(&mut out, mesh)?;
    out.flush()
}

fn parse_coord<'a>(parts: &mut impl Iterator<Item = &'a str>, what: &str) -> io::Result<f64> {
    parts
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("STL: missing {what}")))?
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("STL: bad {what}")))
}

/// Reads the facets of an ASCII STL file. Normals are ignored.
pub fn read_stl<R: BufRead>(reader: R) -> io::Result<Vec<[Vec3; 3]>> {
    let mut tris = Vec::new();
    let mut verts: Vec<Vec3> = Vec::with_capacity(3);
    for line in reader.lines() {
        let l = line?;
        let mut parts = l.split_whitespace();
        match parts.next() {
            Some("facet") => verts.clear(),
            Some("vertex") => {
                let x = parse_coord(&mut parts, "vertex x")?;
                let y = parse_coord(&mut parts, "vertex y")?;
                let z = parse_coord(&mut parts, "vertex z")?;
                verts.push(Vec3::new(x, y, z));
            }
            Some("endfacet") => {
                if verts.len() == 3 {
                    tris.push([verts[0], verts[1], verts[2]]);
                }
                verts.clear();
            }
            _ => {}
        }
    }
    Ok(tris)
}

pub fn load_stl<P: AsRef<Path>>(path: P) -> io::Result<Vec<[Vec3; 3]>> {
    read_stl(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facets_read_back() {
        let tris = vec![[
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.25),
        ]];
        let mut buf = Vec::new();
        write_facets(&mut buf, "t", &tris).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("solid t\n"));
        assert!(text.trim_end().ends_with("endsolid t"));
        let back = read_stl(buf.as_slice()).unwrap();
        assert_eq!(back, tris);
    }

    #[test]
    fn bad_vertex_is_invalid_data() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 zero 0\n";
        let err = read_stl(text.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
