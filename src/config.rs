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

use crate::error::{MeshError, MeshResult};

/// Which output formats `CfdMeshOrchestrator::export_files` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFlags {
    pub stl: bool,
    pub poly: bool,
    pub tri: bool,
    pub obj: bool,
    pub nascart: bool,
    pub gmsh: bool,
    pub srf: bool,
}

impl Default for ExportFlags {
    fn default() -> Self {
        Self {
            stl: true,
            poly: false,
            tri: false,
            obj: false,
            nascart: false,
            gmsh: false,
            srf: false,
        }
    }
}

impl ExportFlags {
    pub fn all() -> Self {
        Self {
            stl: true,
            poly: true,
            tri: true,
            obj: true,
            nascart: true,
            gmsh: true,
            srf: true,
        }
    }

    pub fn none() -> Self {
        Self {
            stl: false,
            poly: false,
            tri: false,
            obj: false,
            nascart: false,
            gmsh: false,
            srf: false,
        }
    }
}

/// Meshing controls. Lengths are in model units.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    pub base_len: f64,
    pub min_len: f64,
    /// Largest allowed chordal deviation from the curved surface.
    pub max_gap: f64,
    pub num_circle_segments: f64,
    pub grow_ratio: f64,
    pub half_mesh: bool,
    pub far_field_scale: [f64; 3],
    pub intersect_sym_plane: bool,
    pub remesh_iterations: usize,
    pub export: ExportFlags,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            base_len: 0.5,
            min_len: 0.1,
            max_gap: 0.005,
            num_circle_segments: 16.0,
            grow_ratio: 1.3,
            half_mesh: false,
            far_field_scale: [4.0, 4.0, 4.0],
            intersect_sym_plane: false,
            remesh_iterations: 10,
            export: ExportFlags::default(),
        }
    }
}

impl MeshConfig {
    pub fn new(base_len: f64) -> Self {
        Self {
            base_len,
            min_len: base_len * 0.2,
            ..Self::default()
        }
    }

    pub fn with_min_len(mut self, v: f64) -> Self {
        self.min_len = v;
        self
    }

    pub fn with_max_gap(mut self, v: f64) -> Self {
        self.max_gap = v;
        self
    }

    pub fn with_num_circle_segments(mut self, v: f64) -> Self {
        self.num_circle_segments = v;
        self
    }

    pub fn with_grow_ratio(mut self, v: f64) -> Self {
        self.grow_ratio = v;
        self
    }

    pub fn with_half_mesh(mut self, v: bool) -> Self {
        self.half_mesh = v;
        self
    }

    pub fn with_far_field_scale(mut self, v: [f64; 3]) -> Self {
        self.far_field_scale = v;
        self
    }

    pub fn with_intersect_sym_plane(mut self, v: bool) -> Self {
        self.intersect_sym_plane = v;
        self
    }

    pub fn with_remesh_iterations(mut self, n: usize) -> Self {
        self.remesh_iterations = n;
        self
    }

    pub fn with_export(mut self, flags: ExportFlags) -> Self {
        self.export = flags;
        self
    }

    pub fn validate(&self) -> MeshResult<()> {
        let bad = |msg: String| Err(MeshError::InvalidConfig(msg));
        if !(self.base_len > 0.0) || !self.base_len.is_finite() {
            return bad(format!("base_len must be positive, got {}", self.base_len));
        }
        if !(self.min_len > 0.0) || self.min_len > self.base_len {
            return bad(format!(
                "min_len must be in (0, base_len], got {} (base_len {})",
                self.min_len, self.base_len
            ));
        }
        if !(self.max_gap > 0.0) {
            return bad(format!("max_gap must be positive, got {}", self.max_gap));
        }
        if !(self.num_circle_segments > 0.0) {
            return bad(format!(
                "num_circle_segments must be positive, got {}",
                self.num_circle_segments
            ));
        }
        if !(self.grow_ratio > 1.0) {
            return bad(format!("grow_ratio must exceed 1, got {}", self.grow_ratio));
        }
        if self.far_field_scale.iter().any(|s| !(*s >= 1.0)) {
            return bad(format!(
                "far_field_scale components must be >= 1, got {:?}",
                self.far_field_scale
            ));
        }
        Ok(())
    }

    /// Scales every length control by `factor` and the circle resolution
    /// by its inverse, so the overall triangle size follows `factor`.
    pub fn scale_tri_size(&mut self, factor: f64) {
        self.base_len *= factor;
        self.min_len *= factor;
        self.max_gap *= factor;
        self.num_circle_segments /= factor;
    }

    /// Length ratio subtended by one circle segment: `2 sin(π/n)` for n > 2.
    pub fn rad_frac(&self) -> f64 {
        rad_frac(self.num_circle_segments)
    }
}

pub fn rad_frac(num_circle_segments: f64) -> f64 {
    if num_circle_segments > 2.0 {
        2.0 * (std::f64::consts::PI / num_circle_segments).sin()
    } else {
        4.0 / num_circle_segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_config_is_valid() {
        assert!(MeshConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_min_len_above_base() {
        let cfg = MeshConfig::new(1.0).with_min_len(2.0);
        assert!(matches!(cfg.validate(), Err(MeshError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_growth_ratio_at_one() {
        let cfg = MeshConfig::default().with_grow_ratio(1.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn scale_tri_size_scales_lengths() {
        let mut cfg = MeshConfig::default();
        cfg.scale_tri_size(2.0);
        assert_relative_eq!(cfg.base_len, 1.0);
        assert_relative_eq!(cfg.min_len, 0.2);
        assert_relative_eq!(cfg.num_circle_segments, 8.0);
    }

    #[test]
    fn rad_frac_matches_chord_of_circle() {
        assert_relative_eq!(rad_frac(6.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(rad_frac(2.0), 2.0);
    }
}
