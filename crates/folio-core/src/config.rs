// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reader, writer, and line-image settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How the reader treats images that have no paired descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Drop images without a descriptor instead of failing (image-list mode only).
    pub skip_invalid: bool,
    /// Also delete the files of a dropped pair from disk. Requires `skip_invalid`.
    pub remove_invalid: bool,
    /// Log progress every this many pairs (0 disables the log line).
    pub progress_interval: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            skip_invalid: false,
            remove_invalid: false,
            progress_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Emit the page `resolution` value as `originalCoords`, matching files
    /// produced by the legacy pipeline.
    pub legacy_original_coords: bool,
    /// Copy each written page's image next to its descriptor.
    pub copy_images: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            legacy_original_coords: false,
            copy_images: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineImageConfig {
    /// Binarize line crops with Otsu's threshold.
    pub binary: bool,
    /// Extra pixels added around each line rectangle before cropping.
    pub padding: u32,
}

/// All Folio settings, loadable from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    pub line_images: LineImageConfig,
}

impl FolioConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}
