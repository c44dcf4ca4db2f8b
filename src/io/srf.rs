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
    collections::BTreeMap,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::{intersection::IntersectionSet, surface::ParametricSurface};

/// Debug dump of the model: component list, raw control grids and the
/// parametric polylines of every border and intersection chain.
pub fn write_srf<W: Write>(out: &mut W, surfs: &[ParametricSurface], isect: &IntersectionSet) -> io::Result<()> {
    let mut comps: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for s in surfs {
        comps.entry(s.comp_id()).or_default().push(s.surf_id());
    }

    writeln!(out, "BEGIN Component_List")?;
    writeln!(out, "{}\t\t// Number of Components", comps.len())?;
    for (comp, ids) in &comps {
        writeln!(out, "BEGIN Component")?;
        writeln!(out, "{comp}\t\t// Comp ID")?;
        writeln!(out, "{}\t\t// Num Surfs", ids.len())?;
        for id in ids {
            writeln!(out, "{id}\t\t// Surf ID")?;
        }
        writeln!(out, "END Component")?;
    }
    writeln!(out, "END Component_List")?;

    writeln!(out, "BEGIN Surface_List")?;
    writeln!(out, "{}\t\t// Number of Cubic Bezier Surfaces", surfs.len())?;
    for s in surfs {
        writeln!(out, "BEGIN Surface")?;
        writeln!(out, "{}\t\t// Surface ID", s.surf_id())?;
        writeln!(out, "{}\t\t// Comp ID", s.comp_id())?;
        writeln!(out, "{}\t\t// Num Pnts U", s.num_u())?;
        writeln!(out, "{}\t\t// Num Pnts W", s.num_w())?;
        writeln!(out, "{}\t\t// Total Pnts", s.num_u() * s.num_w())?;
        for row in s.control_points() {
            for p in row {
                writeln!(out, "{:.20}, {:.20}, {:.20}", p.x, p.y, p.z)?;
            }
        }
        writeln!(out, "END Surface")?;
    }
    writeln!(out, "END Surface_List")?;

    for (border, list, item, label) in [
        (true, "Border_Curve_List", "Border_Curve", "Border"),
        (false, "IntersectCurve_List", "Intersect_Curve", "Intersect"),
    ] {
        let chains: Vec<_> = isect.chains.iter().filter(|c| c.border == border).collect();
        writeln!(out, "BEGIN {list}")?;
        writeln!(out, "{}\t\t// Number of {item}s", chains.len())?;
        for c in chains {
            writeln!(out, "BEGIN {item}")?;
            writeln!(out, "{}\t\t// Surface A ID", c.surf_a)?;
            writeln!(out, "{}\t\t// Surface B ID", c.surf_b)?;
            let a = c.uw_polyline(&isect.segs, true);
            let b = c.uw_polyline(&isect.segs, false);
            writeln!(out, "{}\t\t// Number of {label} Points (Au, Aw, Bu, Bw)", a.len())?;
            for (j, (pa, pb)) in a.iter().zip(&b).enumerate() {
                writeln!(out, "{j}\t{:.16}, {:.16}, {:.16}, {:.16}", pa.x, pa.y, pb.x, pb.y)?;
            }
            writeln!(out, "END {item}")?;
        }
        writeln!(out, "END {list}")?;
    }
    Ok(())
}

pub fn save_srf<P: AsRef<Path>>(path: P, surfs: &[ParametricSurface], isect: &IntersectionSet) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_srf(&mut out, surfs, isect)?;
    out.flush()
}
