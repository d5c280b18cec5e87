// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Descriptor module — reading and writing FineReader page-description XML.

pub mod reader;
pub mod writer;
pub mod xml;

pub use reader::XmlReader;
pub use writer::{WriteReport, XmlWriter};
