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

use crate::{geometry::Vec2, intersection::ipnt::IPntId};

pub type ISegId = usize;

/// A straight piece of intersection (or border) curve between two surfaces.
///
/// The parametric coordinates of both ends are stored per side, so a
/// segment along the seam of a closed surface keeps both of its images.
#[derive(Debug, Clone)]
pub struct ISeg {
    pub surf_a: usize,
    pub surf_b: usize,
    pub ip: [IPntId; 2],
    pub uw_a: [Vec2; 2],
    pub uw_b: [Vec2; 2],
}

impl ISeg {
    pub fn flip(&mut self) {
        self.ip.swap(0, 1);
        self.uw_a.swap(0, 1);
        self.uw_b.swap(0, 1);
    }

    /// Index (0 or 1) of `ip` in this segment.
    pub fn end_of(&self, ip: IPntId) -> Option<usize> {
        self.ip.iter().position(|&p| p == ip)
    }

    pub fn other_end(&self, ip: IPntId) -> Option<IPntId> {
        self.end_of(ip).map(|k| self.ip[1 - k])
    }

    pub fn same_surfs(&self, surf_a: usize, surf_b: usize) -> bool {
        (self.surf_a == surf_a && self.surf_b == surf_b) || (self.surf_a == surf_b && self.surf_b == surf_a)
    }

    /// Parametric coordinates on `surf` at parameter `t` along the segment,
    /// or `None` when the segment does not touch `surf`.
    pub fn uw_on(&self, surf: usize, t: f64) -> Option<Vec2> {
        if self.surf_a == surf {
            Some(self.uw_a[0].lerp(&self.uw_a[1], t))
        } else if self.surf_b == surf {
            Some(self.uw_b[0].lerp(&self.uw_b[1], t))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_swaps_both_sides() {
        let mut s = ISeg {
            surf_a: 0,
            surf_b: 1,
            ip: [3, 7],
            uw_a: [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)],
            uw_b: [Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.0)],
        };
        s.flip();
        assert_eq!(s.ip, [7, 3]);
        assert_eq!(s.uw_a[0], Vec2::new(1.0, 0.0));
        assert_eq!(s.uw_b[1], Vec2::new(0.0, 1.0));
        assert_eq!(s.other_end(7), Some(3));
        assert!(s.same_surfs(1, 0));
    }
}
