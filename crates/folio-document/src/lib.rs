// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — FineReader page descriptions on disk.
//
// Pairs page images with their XML descriptors, reads them into a `Book`,
// crops line images for an external recognizer, and writes the (possibly
// re-transcribed) book back as descriptor files next to copies of the images.

pub mod descriptor;
pub mod image;
pub mod pairing;
pub mod recognize;

// Re-export the primary structs so callers can use `folio_document::XmlReader` etc.
pub use descriptor::reader::XmlReader;
pub use descriptor::writer::{WriteReport, XmlWriter};
pub use image::line_images::{LineImageExtractor, LineSample};
pub use pairing::FilePair;
pub use recognize::{Hypothesis, Predictor, transcribe};
