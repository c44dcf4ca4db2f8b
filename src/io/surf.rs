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
    collections::VecDeque,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Lines, Write},
    path::Path,
    str::FromStr,
};

use crate::{
    error::{MeshError, MeshResult},
    geometry::Vec3,
    surface::ParametricSurface,
};

/// Whitespace tokens of a text stream, tagged with their line number.
struct Tokens<R: BufRead> {
    lines: Lines<R>,
    line: usize,
    pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            pending: VecDeque::new(),
        }
    }

    fn next_token(&mut self, what: &str) -> MeshResult<String> {
        loop {
            if let Some(t) = self.pending.pop_front() {
                return Ok(t);
            }
            match self.lines.next() {
                Some(l) => {
                    let l = l?;
                    self.line += 1;
                    self.pending.extend(l.split_whitespace().map(str::to_string));
                }
                None => return Err(MeshError::parse(self.line + 1, format!("unexpected end of file, expected {what}"))),
            }
        }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> MeshResult<T> {
        let tok = self.next_token(what)?;
        tok.parse()
            .map_err(|_| MeshError::parse(self.line, format!("expected {what}, found `{tok}`")))
    }
}

/// Reads the component-tagged surface text format:
///
/// ```text
/// <numComps>
/// <compId> <numSurfs>        (per component)
/// <Nu> <Nw>                  (per surface)
/// x y z                      (Nu × Nw lines, w fastest)
/// ```
///
/// Surface ids are assigned in file order.
pub fn read_surfaces<R: BufRead>(reader: R) -> MeshResult<Vec<ParametricSurface>> {
    let mut toks = Tokens::new(reader);
    let num_comps: usize = toks.next("component count")?;
    let mut surfs = Vec::new();
    for _ in 0..num_comps {
        let comp_id: i32 = toks.next("component id")?;
        let num_surfs: usize = toks.next("surface count")?;
        for _ in 0..num_surfs {
            let nu: usize = toks.next("Nu")?;
            let nw: usize = toks.next("Nw")?;
            if nu < 4 || nw < 4 || nu % 3 != 1 || nw % 3 != 1 {
                return Err(MeshError::InvalidControlGrid { nu, nw });
            }
            let mut pnts = vec![vec![Vec3::zero(); nw]; nu];
            for row in pnts.iter_mut() {
                for p in row.iter_mut() {
                    let x = toks.next("x")?;
                    let y = toks.next("y")?;
                    let z = toks.next("z")?;
                    *p = Vec3::new(x, y, z);
                }
            }
            let id = surfs.len();
            surfs.push(ParametricSurface::new(comp_id, id, pnts)?);
        }
    }
    Ok(surfs)
}

pub fn load_surfaces<P: AsRef<Path>>(path: P) -> MeshResult<Vec<ParametricSurface>> {
    read_surfaces(BufReader::new(File::open(path)?))
}

/// Writes `surfs` in the format read by `read_surfaces`, grouped by
/// component in order of first appearance. Coordinates use the shortest
/// representation that parses back to the same `f64`.
pub fn write_surfaces<W: Write>(out: &mut W, surfs: &[ParametricSurface]) -> MeshResult<()> {
    let mut comps: Vec<(i32, Vec<&ParametricSurface>)> = Vec::new();
    for s in surfs {
        match comps.iter_mut().find(|(c, _)| *c == s.comp_id()) {
            Some((_, v)) => v.push(s),
            None => comps.push((s.comp_id(), vec![s])),
        }
    }
    writeln!(out, "{}", comps.len())?;
    for (comp, members) in &comps {
        writeln!(out, "{comp}")?;
        writeln!(out, "{}", members.len())?;
        for s in members {
            writeln!(out, "{} {}", s.num_u(), s.num_w())?;
            for row in s.control_points() {
                for p in row {
                    writeln!(out, "{:?} {:?} {:?}", p.x, p.y, p.z)?;
                }
            }
        }
    }
    Ok(())
}

pub fn save_surfaces<P: AsRef<Path>>(path: P, surfs: &[ParametricSurface]) -> MeshResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_surfaces(&mut out, surfs)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_line_of_bad_number() {
        let text = "1\n0\n1\n4 4\n0 0 0\n0 zero 0\n";
        match read_surfaces(text.as_bytes()) {
            Err(MeshError::Parse { line, .. }) => assert_eq!(line, 6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_grid_not_three_k_plus_one() {
        let text = "1\n0 1\n5 4\n";
        assert!(matches!(
            read_surfaces(text.as_bytes()),
            Err(MeshError::InvalidControlGrid { nu: 5, nw: 4 })
        ));
    }

    #[test]
    fn truncated_file_is_parse_error() {
        let text = "2\n0 1\n4 4\n";
        assert!(matches!(read_surfaces(text.as_bytes()), Err(MeshError::Parse { .. })));
    }
}
