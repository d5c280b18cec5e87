// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use std::fmt;

use thiserror::Error;

/// Position of a block or line inside the descriptor file being parsed.
///
/// Ordinals are 1-based. The page ordinal restarts with every descriptor
/// file, the block ordinal with every page, and the line ordinal with every
/// paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub page: usize,
    pub block: usize,
    pub line: Option<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}, block {}", self.page, self.block)?;
        if let Some(line) = self.line {
            write!(f, ", line {}", line)?;
        }
        Ok(())
    }
}

/// Coarse classification of a [`FolioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Image/descriptor files do not follow the paired-file convention.
    Structural,
    /// Descriptor content is malformed or incomplete.
    Parse,
    Image,
    Prediction,
    Config,
    Io,
}

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Structural errors --
    #[error("wrong file structure: {0}")]
    WrongFileStructure(String),

    // -- Parse errors --
    #[error("the xml file '{file}' couldn't be read because of a syntax error: {message}")]
    XmlSyntax { file: String, message: String },

    #[error("the xml file '{file}' is empty")]
    EmptyDocument { file: String },

    #[error("on page {page} in the document '{file}' the '{attribute}' attribute is missing in the page tag")]
    MissingPageAttribute {
        file: String,
        page: usize,
        attribute: &'static str,
    },

    #[error("on {location} in the document '{file}' the rectangle attribute '{attribute}' is missing")]
    MissingRectAttribute {
        file: String,
        location: Location,
        attribute: &'static str,
    },

    #[error("on {location} in the document '{file}' the rectangle attribute '{attribute}' is not a number: {value:?}")]
    InvalidRectAttribute {
        file: String,
        location: Location,
        attribute: &'static str,
        value: String,
    },

    #[error("no suitable data in source {source_dir}")]
    NoSuitableData { source_dir: String },

    // -- Images and prediction --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("prediction failed: {0}")]
    PredictionError(String),

    #[error("invalid configuration: {0}")]
    ConfigError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FolioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WrongFileStructure(_) => ErrorKind::Structural,
            Self::XmlSyntax { .. }
            | Self::EmptyDocument { .. }
            | Self::MissingPageAttribute { .. }
            | Self::MissingRectAttribute { .. }
            | Self::InvalidRectAttribute { .. }
            | Self::NoSuitableData { .. } => ErrorKind::Parse,
            Self::ImageError(_) => ErrorKind::Image,
            Self::PredictionError(_) => ErrorKind::Prediction,
            Self::ConfigError(_) | Self::Serialization(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;
