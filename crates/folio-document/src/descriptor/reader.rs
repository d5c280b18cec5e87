// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Descriptor reader — builds a `Book` from paired page images and FineReader
// XML descriptors using `roxmltree`.

use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Location, Result};
use folio_core::{
    Block, Book, FINEREADER_NS, Format, Line, Page, Par, ReaderConfig, Rect, TEXT_BLOCK_TYPE,
    XSI_NS,
};
use roxmltree::{Document, Node, ParsingOptions};
use tracing::{debug, info, instrument};

use crate::pairing::{self, FilePair};

/// Where the reader finds its image/descriptor pairs.
#[derive(Debug, Clone)]
enum Source {
    /// Every `.jpg`/`.xml` pair in one directory.
    Directory(PathBuf),
    /// Explicit images; descriptors are derived by extension swap.
    Images(Vec<PathBuf>),
}

/// Reads a whole book of page descriptors in one forward pass.
///
/// Any structural or parse problem aborts the read; there is no partial
/// result.
///
/// ```no_run
/// use folio_document::XmlReader;
///
/// let book = XmlReader::from_directory("scans/volume-1").read()?;
/// println!("{} pages", book.page_count());
/// # Ok::<(), folio_core::FolioError>(())
/// ```
pub struct XmlReader {
    source: Source,
    config: ReaderConfig,
}

impl XmlReader {
    // -- Construction ---------------------------------------------------------

    /// Read every paired file in `dir`.
    pub fn from_directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Directory(dir.into()),
            config: ReaderConfig::default(),
        }
    }

    /// Read the descriptors that belong to the given images.
    pub fn from_images<I, P>(images: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            source: Source::Images(images.into_iter().map(Into::into).collect()),
            config: ReaderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    // -- Reading --------------------------------------------------------------

    pub fn read(&self) -> Result<Book> {
        self.read_with_progress(|_, _| {})
    }

    /// Read the book, calling `on_pair(processed, total)` after every pair.
    #[instrument(skip_all, fields(source = %self.describe_source()))]
    pub fn read_with_progress(&self, mut on_pair: impl FnMut(usize, usize)) -> Result<Book> {
        let pairs = match &self.source {
            Source::Directory(dir) => pairing::pair_directory(dir)?,
            Source::Images(images) => pairing::pair_images(images, &self.config)?,
        };
        let Some(first) = pairs.first() else {
            return Err(self.no_suitable_data());
        };
        let source_dir = match &self.source {
            Source::Directory(dir) => dir.clone(),
            Source::Images(_) => first
                .image
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        let total = pairs.len();
        let mut book: Option<Book> = None;

        for (index, pair) in pairs.iter().enumerate() {
            read_pair(pair, &source_dir, &mut book)?;

            let processed = index + 1;
            on_pair(processed, total);
            if self.config.progress_interval > 0 && processed % self.config.progress_interval == 0
            {
                info!(processed, total, "Documents read");
            }
        }

        match book {
            Some(book) if !book.pages.is_empty() => {
                info!(pages = book.page_count(), "Book was read");
                Ok(book)
            }
            _ => Err(self.no_suitable_data()),
        }
    }

    fn no_suitable_data(&self) -> FolioError {
        FolioError::NoSuitableData {
            source_dir: self.describe_source(),
        }
    }

    fn describe_source(&self) -> String {
        match &self.source {
            Source::Directory(dir) => dir.display().to_string(),
            Source::Images(images) => format!("{} image files", images.len()),
        }
    }
}

/// Parse one descriptor and append its pages to `book`, creating the book
/// from the first descriptor's root attributes.
fn read_pair(pair: &FilePair, source_dir: &Path, book: &mut Option<Book>) -> Result<()> {
    let file = file_name(&pair.descriptor);
    let bytes = std::fs::read(&pair.descriptor)?;
    let text = String::from_utf8(bytes).map_err(|err| FolioError::XmlSyntax {
        file: file.clone(),
        message: format!("invalid UTF-8: {}", err),
    })?;

    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let document = Document::parse_with_options(&text, options).map_err(|err| match err {
        roxmltree::Error::NoRootNode => FolioError::EmptyDocument { file: file.clone() },
        other => FolioError::XmlSyntax {
            file: file.clone(),
            message: other.to_string(),
        },
    })?;
    let root = document.root_element();

    let book = book.get_or_insert_with(|| {
        Book::new(
            source_dir,
            owned(root.attribute((XSI_NS, "schemaLocation"))),
            owned(root.attribute("version")),
            owned(root.attribute("producer")),
            owned(root.attribute("languages")),
        )
    });

    for (index, page_node) in elements(root).enumerate() {
        let page = read_page(page_node, pair, &file, index + 1)?;
        debug!(file = %file, page = index + 1, blocks = page.blocks.len(), "Page read");
        book.pages.push(page);
    }
    Ok(())
}

fn read_page(node: Node<'_, '_>, pair: &FilePair, file: &str, page_no: usize) -> Result<Page> {
    let required = |attribute: &'static str| {
        node.attribute(attribute)
            .ok_or_else(|| FolioError::MissingPageAttribute {
                file: file.to_string(),
                page: page_no,
                attribute,
            })
    };
    let width = required("width")?;
    let height = required("height")?;
    let resolution = required("resolution")?;
    let original_coords = required("originalCoords")?;

    let mut page = Page::new(
        width,
        height,
        resolution,
        original_coords,
        &pair.image,
        &pair.descriptor,
    );

    for (index, block_node) in elements(node).enumerate() {
        if block_node.attribute("blockType") != Some(TEXT_BLOCK_TYPE) {
            continue;
        }
        let at = Location {
            page: page_no,
            block: index + 1,
            line: None,
        };
        page.blocks.push(read_block(block_node, file, at)?);
    }
    Ok(page)
}

fn read_block(node: Node<'_, '_>, file: &str, at: Location) -> Result<Block> {
    let rect = read_rect(node, file, at)?;
    let mut block = Block::new(TEXT_BLOCK_TYPE, owned(node.attribute("blockName")), rect);

    for text_node in elements(node).filter(|n| is_fine_reader(n, "text")) {
        for par_node in elements(text_node) {
            block.pars.push(read_par(par_node, file, at)?);
        }
    }
    Ok(block)
}

fn read_par(node: Node<'_, '_>, file: &str, at: Location) -> Result<Par> {
    let mut par = Par::new(
        owned(node.attribute("align")),
        owned(node.attribute("startIndent")),
        owned(node.attribute("lineSpacing")),
    );

    for (index, line_node) in elements(node).enumerate() {
        let at = Location {
            line: Some(index + 1),
            ..at
        };
        let rect = read_rect(line_node, file, at)?;
        let mut line = Line::new(owned(line_node.attribute("baseline")), rect);
        line.formats.push(read_format(line_node));
        par.lines.push(line);
    }
    Ok(par)
}

fn read_rect(node: Node<'_, '_>, file: &str, at: Location) -> Result<Rect> {
    let coordinate = |attribute: &'static str| -> Result<i32> {
        let value = node
            .attribute(attribute)
            .ok_or_else(|| FolioError::MissingRectAttribute {
                file: file.to_string(),
                location: at,
                attribute,
            })?;
        value
            .trim()
            .parse::<i32>()
            .map_err(|_| FolioError::InvalidRectAttribute {
                file: file.to_string(),
                location: at,
                attribute,
                value: value.to_string(),
            })
    };
    Ok(Rect::new(
        coordinate("l")?,
        coordinate("t")?,
        coordinate("r")?,
        coordinate("b")?,
    ))
}

/// Collapse a line's formatting children into one representative format.
///
/// Direct text wins (the last formatting child carrying it). Otherwise each
/// child's character elements are concatenated and the longest run is kept,
/// ties going to the first one seen.
fn read_format(line: Node<'_, '_>) -> Format {
    let mut verbatim: Option<Format> = None;
    let mut longest: Option<(usize, Format)> = None;

    for formatting in elements(line) {
        let lang = owned(formatting.attribute("lang"));
        if let Some(text) = direct_text(formatting) {
            verbatim = Some(Format::new(lang, text));
            continue;
        }

        let mut count = 0;
        let mut run = String::new();
        for char_node in elements(formatting) {
            run.push_str(char_node.text().unwrap_or(""));
            count += 1;
        }
        if longest.as_ref().is_none_or(|(best, _)| count > *best) {
            longest = Some((count, Format::new(lang, run)));
        }
    }

    verbatim
        .or_else(|| longest.map(|(_, format)| format))
        .unwrap_or_default()
}

/// Text before the first child element, ignoring pretty-printing whitespace.
fn direct_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    let text = node.first_child().filter(Node::is_text)?.text()?;
    let layout_only = text.trim().is_empty() && text.contains('\n');
    (!text.is_empty() && !layout_only).then_some(text)
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn is_fine_reader(node: &Node<'_, '_>, name: &str) -> bool {
    let tag = node.tag_name();
    tag.namespace() == Some(FINEREADER_NS) && tag.name() == name
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
