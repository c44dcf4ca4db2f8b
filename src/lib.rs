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

//! Watertight surface meshing of multi-component models built from
//! bicubic Bezier surfaces.
//!
//! Surfaces are intersected with each other, the intersection and border
//! curves are tessellated under a sizing field, and each surface is
//! triangulated, remeshed and trimmed to the outer skin of the model.
//! [`cfd::CfdMeshOrchestrator`] runs the whole pipeline.

pub mod cfd;
pub mod config;
pub mod curve;
pub mod density;
pub mod error;
pub mod geometry;
pub mod intersection;
pub mod io;
pub mod kernel;
pub mod mesh;
pub mod mesh_processing;
pub mod operations;
pub mod surface;

pub use cfd::{CfdMeshOrchestrator, PipelineStage};
pub use config::{ExportFlags, MeshConfig};
pub use error::{MeshError, MeshResult};
