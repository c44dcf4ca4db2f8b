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

use crate::{
    geometry::{Aabb, Vec3},
    mesh::FinalMesh,
};

/// Points this close to y = 0 are snapped onto the symmetry plane.
const SYM_SNAP: f64 = 1e-4;
const SYM_PLANE_TOL: f64 = 1e-6;

/// Far-field box and body data for a TetGen piecewise linear complex.
#[derive(Debug, Clone)]
pub struct PolyDomain {
    pub far_min: Vec3,
    pub far_max: Vec3,
    pub half_mesh: bool,
    /// One point inside each closed body.
    pub holes: Vec<Vec3>,
}

impl PolyDomain {
    /// Box around `model` scaled per axis by `far_scale`, cut at y = 0 for
    /// half meshes.
    pub fn around(model: &Aabb, far_scale: [f64; 3], half_mesh: bool, holes: Vec<Vec3>) -> Self {
        let cent = model.center_point();
        let max_d = 0.5 * model.largest_dim();
        let off = Vec3::new(max_d * far_scale[0], max_d * far_scale[1], max_d * far_scale[2]);
        let mut far_min = cent - off;
        let far_max = cent + off;
        if half_mesh {
            far_min.y = 0.0;
        }
        Self { far_min, far_max, half_mesh, holes }
    }

    fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.far_min, self.far_max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }
}

/// TetGen `.poly`: node list (8 far-field corners first), facet list (6
/// box faces, then the model triangles), hole list and an empty region
/// list. Indices are 1-based.
pub fn write_poly<W: Write>(out: &mut W, mesh: &FinalMesh, domain: &PolyDomain) -> io::Result<()> {
    let mut pnts = mesh.pnts.clone();
    if domain.half_mesh {
        for p in pnts.iter_mut().filter(|p| p.y.abs() < SYM_SNAP) {
            p.y = 0.0;
        }
    }

    writeln!(out, "# Part 1 - node list")?;
    writeln!(out, "{} 3 0 0", pnts.len() + 8)?;
    for (i, c) in domain.corners().iter().enumerate() {
        writeln!(out, "{} {} {} {}", i + 1, c.x, c.y, c.z)?;
    }
    for (i, p) in pnts.iter().enumerate() {
        writeln!(out, "{} {} {} {}", i + 9, p.x, p.y, p.z)?;
    }

    writeln!(out, "# Part 2 - facet list")?;
    writeln!(out, "{} 0", mesh.num_tris() + 6)?;
    if domain.half_mesh {
        // the symmetry face carries the model points lying on it
        let on_plane: Vec<usize> = (0..pnts.len()).filter(|&i| pnts[i].y.abs() < SYM_PLANE_TOL).collect();
        writeln!(out, "{}", on_plane.len() + 1)?;
        writeln!(out, "4  1 2 6 5")?;
        for i in on_plane {
            writeln!(out, "1  {}", i + 9)?;
        }
    } else {
        writeln!(out, "1")?;
        writeln!(out, "4  1 2 6 5")?;
    }
    for face in ["5 6 7 8", "1 2 3 4", "2 3 7 6", "3 4 8 7", "4 1 5 8"] {
        writeln!(out, "1")?;
        writeln!(out, "4  {face}")?;
    }
    for t in &mesh.tris {
        writeln!(out, "1")?;
        writeln!(out, "3 {} {} {}", t[0] + 9, t[1] + 9, t[2] + 9)?;
    }

    writeln!(out, "# Part 3 - Hole List")?;
    let holes: Vec<Vec3> = if domain.half_mesh {
        domain
            .holes
            .iter()
            .map(|h| if h.y.abs() < SYM_SNAP { Vec3::new(h.x, 1e-5, h.z) } else { *h })
            .filter(|h| h.y > 0.0)
            .collect()
    } else {
        domain.holes.clone()
    };
    writeln!(out, "{}", holes.len())?;
    for (i, h) in holes.iter().enumerate() {
        writeln!(out, "{}  {} {} {}", i + 1, h.x, h.y, h.z)?;
    }

    writeln!(out, "# Part 4 - region list")?;
    writeln!(out, "0")?;
    Ok(())
}

pub fn save_poly<P: AsRef<Path>>(path: P, mesh: &FinalMesh, domain: &PolyDomain) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_poly(&mut out, mesh, domain)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_tri() -> FinalMesh {
        FinalMesh {
            pnts: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.5, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            tris: vec![[0, 1, 2]],
            tri_comp: vec![0],
            tri_surf: vec![0],
        }
    }

    #[test]
    fn poly_counts_include_far_field_box() {
        let mesh = one_tri();
        let dom = PolyDomain::around(&mesh.bbox(), [2.0, 2.0, 2.0], false, vec![Vec3::new(0.2, 0.2, 0.0)]);
        let mut buf = Vec::new();
        write_poly(&mut buf, &mesh, &dom).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "11 3 0 0");
        assert!(lines.contains(&"9 0 0 0"));
        assert!(lines.contains(&"3 9 10 11"));
        let hole = lines.iter().position(|l| *l == "# Part 3 - Hole List").unwrap();
        assert_eq!(lines[hole + 1], "1");
        assert_eq!(lines.last(), Some(&"0"));
    }

    #[test]
    fn half_mesh_lists_symmetry_points() {
        let mesh = one_tri();
        let dom = PolyDomain::around(&mesh.bbox(), [2.0, 2.0, 2.0], true, vec![Vec3::new(0.2, -0.5, 0.0)]);
        assert_eq!(dom.far_min.y, 0.0);
        let mut buf = Vec::new();
        write_poly(&mut buf, &mesh, &dom).unwrap();
        let text = String::from_utf8(buf).unwrap();
        // the face line count covers the box face plus one on-plane point
        assert!(text.contains("2\n4  1 2 6 5\n1  9\n"));
        let lines: Vec<&str> = text.lines().collect();
        let hole = lines.iter().position(|l| *l == "# Part 3 - Hole List").unwrap();
        assert_eq!(lines[hole + 1], "0");
    }
}
