// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folio — Document model, error definitions, and settings shared across crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{FolioConfig, LineImageConfig, ReaderConfig, WriterConfig};
pub use error::{ErrorKind, FolioError, Location};
pub use types::*;
