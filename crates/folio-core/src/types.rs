// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document model for one logical book of FineReader page descriptions.
//
// Numeric-looking page attributes are kept as the raw strings found in the
// descriptor so they are written back exactly as read.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Namespace of FineReader 10 page-description elements.
pub const FINEREADER_NS: &str = "http://www.abbyy.com/FineReader_xml/FineReader10-schema-v1.xml";

/// Namespace of the `xsi:schemaLocation` attribute.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Fixed `xsi:schemaLocation` value written on every output root element.
pub const FINEREADER_SCHEMA_LOCATION: &str = "http://www.abbyy.com/FineReader_xml/FineReader10-schema-v1.xml http://www.abbyy.com/FineReader_xml/FineReader10-schema-v1.xml";

/// The only block type that is materialized into the model.
pub const TEXT_BLOCK_TYPE: &str = "Text";

/// Root of the model: every page read from one source, in sorted file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Directory the pairs were read from.
    pub source_directory: PathBuf,
    pub schema_location: Option<String>,
    pub version: Option<String>,
    pub producer: Option<String>,
    pub languages: Option<String>,
    pub pages: Vec<Page>,
}

impl Book {
    pub fn new(
        source_directory: impl Into<PathBuf>,
        schema_location: Option<String>,
        version: Option<String>,
        producer: Option<String>,
        languages: Option<String>,
    ) -> Self {
        Self {
            source_directory: source_directory.into(),
            schema_location,
            version,
            producer,
            languages,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Distinct descriptor file names in the order they are first referenced.
    pub fn descriptor_files(&self) -> Vec<&Path> {
        let mut seen: Vec<&Path> = Vec::new();
        for page in &self.pages {
            let path = page.descriptor_file.as_path();
            if !seen.contains(&path) {
                seen.push(path);
            }
        }
        seen
    }

    /// Every line in document order together with its address.
    pub fn lines(&self) -> impl Iterator<Item = (LineRef, &Line)> + '_ {
        self.pages.iter().enumerate().flat_map(|(p, page)| {
            page.blocks.iter().enumerate().flat_map(move |(b, block)| {
                block.pars.iter().enumerate().flat_map(move |(r, par)| {
                    par.lines.iter().enumerate().map(move |(l, line)| {
                        (
                            LineRef {
                                page: p,
                                block: b,
                                par: r,
                                line: l,
                            },
                            line,
                        )
                    })
                })
            })
        })
    }

    pub fn line_refs(&self) -> Vec<LineRef> {
        self.lines().map(|(line_ref, _)| line_ref).collect()
    }

    pub fn line(&self, at: LineRef) -> Option<&Line> {
        self.pages
            .get(at.page)?
            .blocks
            .get(at.block)?
            .pars
            .get(at.par)?
            .lines
            .get(at.line)
    }

    /// The first format of the addressed line, which receives recognized text.
    pub fn format_mut(&mut self, at: LineRef) -> Option<&mut Format> {
        self.pages
            .get_mut(at.page)?
            .blocks
            .get_mut(at.block)?
            .pars
            .get_mut(at.par)?
            .lines
            .get_mut(at.line)?
            .formats
            .first_mut()
    }
}

/// One page element of a descriptor file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub width: String,
    pub height: String,
    pub resolution: String,
    pub original_coords: String,
    /// Image paired with the descriptor this page came from.
    pub image_file: PathBuf,
    /// Descriptor the page was read from; the writer groups pages by its file name.
    pub descriptor_file: PathBuf,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(
        width: impl Into<String>,
        height: impl Into<String>,
        resolution: impl Into<String>,
        original_coords: impl Into<String>,
        image_file: impl Into<PathBuf>,
        descriptor_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
            resolution: resolution.into(),
            original_coords: original_coords.into(),
            image_file: image_file.into(),
            descriptor_file: descriptor_file.into(),
            blocks: Vec::new(),
        }
    }

    /// All formats on the page in document order.
    pub fn formats(&self) -> impl Iterator<Item = &Format> + '_ {
        self.blocks
            .iter()
            .flat_map(|block| block.pars.iter())
            .flat_map(|par| par.lines.iter())
            .flat_map(|line| line.formats.iter())
    }
}

/// A text block. Blocks of any other type are never materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_type: String,
    pub block_name: Option<String>,
    pub rect: Rect,
    pub pars: Vec<Par>,
}

impl Block {
    pub fn new(block_type: impl Into<String>, block_name: Option<String>, rect: Rect) -> Self {
        Self {
            block_type: block_type.into(),
            block_name,
            rect,
            pars: Vec::new(),
        }
    }
}

/// A paragraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Par {
    pub align: Option<String>,
    pub start_indent: Option<String>,
    pub line_spacing: Option<String>,
    pub lines: Vec<Line>,
}

impl Par {
    pub fn new(
        align: Option<String>,
        start_indent: Option<String>,
        line_spacing: Option<String>,
    ) -> Self {
        Self {
            align,
            start_indent,
            line_spacing,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub baseline: Option<String>,
    pub rect: Rect,
    pub formats: Vec<Format>,
}

impl Line {
    pub fn new(baseline: Option<String>, rect: Rect) -> Self {
        Self {
            baseline,
            rect,
            formats: Vec::new(),
        }
    }

    /// Text of all formats joined in order.
    pub fn text(&self) -> String {
        self.formats.iter().map(|f| f.text.as_str()).collect()
    }
}

/// A formatting run. `text` is what a recognizer overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    pub lang: Option<String>,
    pub text: String,
}

impl Format {
    pub fn new(lang: Option<String>, text: impl Into<String>) -> Self {
        Self {
            lang,
            text: text.into(),
        }
    }
}

/// Pixel rectangle from the `l`, `t`, `r`, `b` attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in pixels, 0 for an inverted rectangle.
    pub fn width(&self) -> u32 {
        span(self.left, self.right)
    }

    /// Height in pixels, 0 for an inverted rectangle.
    pub fn height(&self) -> u32 {
        span(self.top, self.bottom)
    }
}

fn span(start: i32, end: i32) -> u32 {
    (i64::from(end) - i64::from(start)).clamp(0, i64::from(u32::MAX)) as u32
}

/// Address of a line inside a [`Book`] (0-based indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRef {
    pub page: usize,
    pub block: usize,
    pub par: usize,
    pub line: usize,
}

impl LineRef {
    /// Stable sample identifier such as `0001_0_2_0_5`.
    pub fn sample_id(&self, stem: &str) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            stem, self.page, self.block, self.par, self.line
        )
    }
}
