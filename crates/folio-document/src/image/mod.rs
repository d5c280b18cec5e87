// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — line cropping and binarization for recognizer input.

pub mod line_images;

pub use line_images::{LineImageExtractor, LineSample};
