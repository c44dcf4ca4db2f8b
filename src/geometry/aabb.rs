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

use crate::geometry::vector_3::Vec3;

/// An axis-aligned bounding box in model space.
///
/// An empty box has `min > max` on every axis, so the first `update`
/// collapses it onto the inserted point.
#[derive(Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    pub fn empty() -> Self {
        Aabb {
            min: Vec3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Vec3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Build the smallest AABB containing two points.
    pub fn from_points(a: &Vec3, b: &Vec3) -> Self {
        Aabb::new(a.component_min(b), a.component_max(b))
    }

    pub fn from_iter<'a, I: IntoIterator<Item = &'a Vec3>>(pts: I) -> Self {
        let mut bb = Aabb::empty();
        for p in pts {
            bb.update(p);
        }
        bb
    }

    pub fn update(&mut self, p: &Vec3) {
        self.min = self.min.component_min(p);
        self.max = self.max.component_max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(
            self.min.component_min(&other.min),
            self.max.component_max(&other.max),
        )
    }

    /// Grow every side by `d`.
    pub fn expand(&mut self, d: f64) {
        self.min -= Vec3::new(d, d, d);
        self.max += Vec3::new(d, d, d);
    }

    /// Does this AABB intersect `other`? Touching boxes count.
    pub fn intersects(&self, other: &Aabb) -> bool {
        for i in 0..3 {
            if self.max[i] < other.min[i] || other.max[i] < self.min[i] {
                return false;
            }
        }
        true
    }

    pub fn contains_point(&self, p: &Vec3) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Center coordinate along axis `i`.
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.min[i] + self.max[i])
    }

    pub fn center_point(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Length along axis `i`.
    pub fn extent(&self, i: usize) -> f64 {
        (self.max[i] - self.min[i]).abs()
    }

    pub fn largest_dim(&self) -> f64 {
        self.extent(0).max(self.extent(1)).max(self.extent(2))
    }

    pub fn diag_dist(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.min.dist(&self.max)
    }

    /// Return the axis index with largest extent.
    pub fn longest_axis(&self) -> usize {
        let mut best_i = 0usize;
        let mut best = self.extent(0);
        for i in 1..3 {
            let e = self.extent(i);
            if e > best {
                best_i = i;
                best = e;
            }
        }
        best_i
    }
}
