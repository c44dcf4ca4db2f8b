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

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::{
    geometry::{Vec2, Vec3},
    mesh::simple::SimpleMesh,
};

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub pnt: Vec3,
    pub uw: Vec2,
    /// Border and chain nodes never move.
    pub fixed: bool,
    pub edges: SmallVec<[usize; 8]>,
    pub target_len: f64,
    pub removed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Edge {
    pub n: [usize; 2],
    /// Adjoining triangles. An edge never has more than two.
    pub t: [Option<usize>; 2],
    /// Constraint edges (surface borders and intersection curves).
    pub border: bool,
    pub removed: bool,
}

impl Edge {
    pub fn num_tris(&self) -> usize {
        self.t.iter().filter(|t| t.is_some()).count()
    }

    pub fn other_node(&self, n: usize) -> usize {
        if self.n[0] == n { self.n[1] } else { self.n[0] }
    }

    pub fn other_tri(&self, t: usize) -> Option<usize> {
        match self.t {
            [Some(a), b] if a == t => b,
            [a, Some(b)] if b == t => a,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tri {
    /// Counter-clockwise in the surface's parametric space.
    pub n: [usize; 3],
    /// `e[i]` joins `n[i]` and `n[(i + 1) % 3]`.
    pub e: [usize; 3],
    pub interior: bool,
    pub removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshState {
    Empty,
    Triangulated,
    IterativelyRemeshed,
    Simplified,
    InteriorTrisRemoved,
}

/// Triangle mesh of one surface: index arenas of nodes, edges and
/// triangles. Removals are flagged and purged by `dump_garbage`.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub surf_id: usize,
    pub comp_id: i32,
    pub state: MeshState,

    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub tris: Vec<Tri>,
    pub edge_map: AHashMap<(usize, usize), usize>,

    pub simp: SimpleMesh,
}
