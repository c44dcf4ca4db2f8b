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

//! Error types for loading surfaces and driving the meshing pipeline.
//!
//! Only structural problems are fatal: malformed input, invalid control
//! grids, bad configuration and out-of-order pipeline calls. Degenerate
//! geometry found while meshing is skipped locally and logged instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed surface or configuration text.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Control grid dimensions must be ≡ 1 (mod 3) and at least 4.
    #[error("Invalid control grid {nu}x{nw}: dimensions must be 3k+1 and at least 4")]
    InvalidControlGrid { nu: usize, nw: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline stage was called before its prerequisites ran.
    #[error("Invalid pipeline state: expected {expected}, found {found}")]
    InvalidState { expected: String, found: String },

    #[error("No surfaces loaded")]
    EmptyModel,
}

impl MeshError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type MeshResult<T> = Result<T, MeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = MeshError::parse(12, "expected 3 coordinates");
        assert!(e.to_string().contains("line 12"));

        let e = MeshError::InvalidControlGrid { nu: 5, nw: 4 };
        assert!(e.to_string().contains("5x4"));
    }

    #[test]
    fn test_io_error_converts() {
        fn read() -> MeshResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?
        }
        assert!(matches!(read(), Err(MeshError::Io(_))));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MeshError>();
    }
}
