// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Descriptor writer — regenerates FineReader XML from a `Book`, one file per
// originating descriptor, and copies the page images next to them.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use folio_core::error::Result;
use folio_core::{
    Block, Book, FINEREADER_NS, FINEREADER_SCHEMA_LOCATION, Line, Page, Par, Rect, WriterConfig,
    XSI_NS,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::xml::Element;

/// Files produced by [`XmlWriter::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    /// Descriptor files written, in flush order.
    pub descriptors: Vec<PathBuf>,
    /// Images copied into the output directory.
    pub images: Vec<PathBuf>,
}

/// Pages that share one descriptor file name, rendered into one document.
struct Group<'b> {
    descriptor_name: OsString,
    root: Element,
    images: Vec<&'b Path>,
}

/// Serializes a [`Book`] back into descriptor files.
///
/// Pages are walked in book order. Whenever the descriptor file name changes
/// the document built so far is flushed to the previous name inside the
/// output directory, so a book read from many pairs is written back as the
/// same set of files.
pub struct XmlWriter<'b> {
    output_dir: PathBuf,
    image_dir: PathBuf,
    book: &'b Book,
    config: WriterConfig,
}

impl<'b> XmlWriter<'b> {
    /// Write into `output_dir`, copying page images found in `image_dir`.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        book: &'b Book,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            image_dir: image_dir.into(),
            book,
            config: WriterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    // -- Output ---------------------------------------------------------------

    /// Write every descriptor group and copy its images.
    #[instrument(skip_all, fields(output = %self.output_dir.display(), pages = self.book.page_count()))]
    pub fn write(&self) -> Result<WriteReport> {
        let mut report = WriteReport::default();
        let mut flushed: HashSet<OsString> = HashSet::new();

        for group in self.groups() {
            self.flush(group, &mut flushed, &mut report)?;
        }

        info!(
            descriptors = report.descriptors.len(),
            images = report.images.len(),
            "All files written"
        );
        Ok(report)
    }

    /// Render every descriptor group in memory as `(file name, xml)` without
    /// touching disk.
    pub fn to_xml_strings(&self) -> Vec<(PathBuf, String)> {
        self.groups().into_iter().map(render).collect()
    }

    // -- Document construction ------------------------------------------------

    /// Split the book into runs of consecutive pages sharing a descriptor
    /// name, each rendered into its own document.
    fn groups(&self) -> Vec<Group<'b>> {
        let mut groups: Vec<Group<'b>> = Vec::new();
        let book = self.book;

        for page in &book.pages {
            let name = descriptor_name(page);
            if groups.last().is_none_or(|group| group.descriptor_name != name) {
                groups.push(self.start_group(name));
            }
            if let Some(group) = groups.last_mut() {
                self.append_page(group, page);
            }
        }
        groups
    }

    fn start_group(&self, descriptor_name: OsString) -> Group<'b> {
        Group {
            descriptor_name,
            root: self.root_element(),
            images: Vec::new(),
        }
    }

    fn append_page(&self, group: &mut Group<'b>, page: &'b Page) {
        group.root.push_child(self.page_element(page));
        let image = page.image_file.as_path();
        if !group.images.contains(&image) {
            group.images.push(image);
        }
    }

    fn root_element(&self) -> Element {
        let namespace = self
            .book
            .schema_location
            .as_deref()
            .and_then(|location| location.split(' ').next())
            .filter(|ns| !ns.is_empty())
            .unwrap_or(FINEREADER_NS);

        let mut root = Element::new("document");
        root.set_attr("xmlns", namespace);
        root.set_opt_attr("version", self.book.version.as_deref());
        root.set_opt_attr("producer", self.book.producer.as_deref());
        root.set_opt_attr("languages", self.book.languages.as_deref());
        root.set_attr("xmlns:xsi", XSI_NS);
        root.set_attr("xsi:schemaLocation", FINEREADER_SCHEMA_LOCATION);
        root
    }

    fn page_element(&self, page: &Page) -> Element {
        let original_coords = if self.config.legacy_original_coords {
            &page.resolution
        } else {
            &page.original_coords
        };

        let mut element = Element::new("page");
        element.set_attr("width", page.width.as_str());
        element.set_attr("height", page.height.as_str());
        element.set_attr("resolution", page.resolution.as_str());
        element.set_attr("originalCoords", original_coords.as_str());
        for block in &page.blocks {
            element.push_child(block_element(block));
        }
        element
    }

    // -- Flushing -------------------------------------------------------------

    fn flush(
        &self,
        group: Group<'b>,
        flushed: &mut HashSet<OsString>,
        report: &mut WriteReport,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        if !flushed.insert(group.descriptor_name.clone()) {
            warn!(
                descriptor = ?group.descriptor_name,
                "Descriptor name appears again after another file; overwriting"
            );
        }

        let target = self.output_dir.join(&group.descriptor_name);
        std::fs::write(&target, group.root.to_document_string())?;
        debug!(path = %target.display(), "Descriptor written");
        report.descriptors.push(target);

        if self.config.copy_images {
            for image in group.images {
                if let Some(copied) = self.copy_image(image)? {
                    report.images.push(copied);
                }
            }
        }
        Ok(())
    }

    /// Copy one page image into the output directory.
    fn copy_image(&self, image: &Path) -> Result<Option<PathBuf>> {
        let Some(file_name) = image.file_name() else {
            warn!(image = %image.display(), "Page image has no file name; not copied");
            return Ok(None);
        };
        let source = self.image_dir.join(file_name);
        let target = self.output_dir.join(file_name);

        if is_same_file(&source, &target) {
            debug!(path = %target.display(), "Image already in output directory");
            return Ok(None);
        }

        copy_outcome(std::fs::copy(&source, &target), &source, target)
    }
}

/// Classify the result of copying `source` to `target`.
///
/// A permission failure is logged and yields `Ok(None)`; any other I/O
/// failure is returned.
fn copy_outcome(
    copied: std::io::Result<u64>,
    source: &Path,
    target: PathBuf,
) -> Result<Option<PathBuf>> {
    match copied {
        Ok(_) => {
            debug!(from = %source.display(), to = %target.display(), "Image copied");
            Ok(Some(target))
        }
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!(from = %source.display(), %err, "Image copy denied; continuing");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn render(group: Group<'_>) -> (PathBuf, String) {
    let xml = group.root.to_document_string();
    (PathBuf::from(group.descriptor_name), xml)
}

fn descriptor_name(page: &Page) -> OsString {
    page.descriptor_file
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| page.descriptor_file.as_os_str().to_os_string())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn block_element(block: &Block) -> Element {
    let mut element = Element::new("block");
    element.set_attr("blockType", block.block_type.as_str());
    element.set_opt_attr("blockName", block.block_name.as_deref());
    set_rect(&mut element, &block.rect);

    let text = element.push_child(Element::new("text"));
    for par in &block.pars {
        text.push_child(par_element(par));
    }
    element
}

fn par_element(par: &Par) -> Element {
    let mut element = Element::new("par");
    element.set_opt_attr("align", par.align.as_deref());
    element.set_opt_attr("startIndent", par.start_indent.as_deref());
    element.set_opt_attr("lineSpacing", par.line_spacing.as_deref());
    for line in &par.lines {
        element.push_child(line_element(line));
    }
    element
}

fn line_element(line: &Line) -> Element {
    let mut element = Element::new("line");
    element.set_opt_attr("baseline", line.baseline.as_deref());
    set_rect(&mut element, &line.rect);
    for format in &line.formats {
        let formatting = element.push_child(Element::new("formatting"));
        formatting.set_opt_attr("lang", format.lang.as_deref());
        formatting.set_text(format.text.as_str());
    }
    element
}

fn set_rect(element: &mut Element, rect: &Rect) {
    element.set_attr("l", rect.left.to_string());
    element.set_attr("t", rect.top.to_string());
    element.set_attr("r", rect.right.to_string());
    element.set_attr("b", rect.bottom.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::reader::XmlReader;
    use folio_core::{Format, TEXT_BLOCK_TYPE};
    use tempfile::TempDir;

    fn sample_page(image: &str, descriptor: &str, text: &str) -> Page {
        let mut page = Page::new("2000", "3000", "300", "1", image, descriptor);
        let mut block = Block::new(TEXT_BLOCK_TYPE, Some("b1".into()), Rect::new(1, 2, 3, 4));
        let mut par = Par::new(Some("Left".into()), None, None);
        let mut line = Line::new(Some("40".into()), Rect::new(5, 6, 7, 8));
        line.formats.push(Format::new(Some("German".into()), text));
        par.lines.push(line);
        block.pars.push(par);
        page.blocks.push(block);
        page
    }

    fn sample_book(dir: &Path) -> Book {
        let mut book = Book::new(
            dir,
            Some(format!("{FINEREADER_NS} {FINEREADER_NS}")),
            Some("1.0".into()),
            Some("FineReader 10".into()),
            None,
        );
        book.pages.push(sample_page("doc1a.jpg", "doc1.xml", "eins"));
        book.pages.push(sample_page("doc1b.jpg", "doc1.xml", "zwei"));
        book.pages.push(sample_page("doc2.jpg", "doc2.xml", "drei"));
        book
    }

    fn write_images(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), name.as_bytes()).unwrap();
        }
    }

    #[test]
    fn groups_pages_by_descriptor() {
        let images = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(images.path(), &["doc1a.jpg", "doc1b.jpg", "doc2.jpg"]);
        let book = sample_book(images.path());

        let report = XmlWriter::new(output.path(), images.path(), &book).write().unwrap();

        assert_eq!(
            report.descriptors,
            vec![output.path().join("doc1.xml"), output.path().join("doc2.xml")]
        );
        assert_eq!(report.images.len(), 3);
        for name in ["doc1a.jpg", "doc1b.jpg", "doc2.jpg"] {
            assert_eq!(std::fs::read(output.path().join(name)).unwrap(), name.as_bytes());
        }

        let doc1 = std::fs::read_to_string(output.path().join("doc1.xml")).unwrap();
        assert_eq!(doc1.matches("<page ").count(), 2);
        assert!(doc1.contains("eins") && doc1.contains("zwei") && !doc1.contains("drei"));
        let doc2 = std::fs::read_to_string(output.path().join("doc2.xml")).unwrap();
        assert_eq!(doc2.matches("<page ").count(), 1);
    }

    #[test]
    fn single_descriptor_is_flushed_at_end() {
        let images = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(images.path(), &["doc2.jpg"]);
        let mut book = sample_book(images.path());
        book.pages = book.pages.split_off(2);

        let report = XmlWriter::new(output.path().join("nested"), images.path(), &book)
            .write()
            .unwrap();
        assert_eq!(report.descriptors, vec![output.path().join("nested/doc2.xml")]);
        assert!(output.path().join("nested/doc2.jpg").exists());
    }

    #[test]
    fn optional_attributes_are_omitted_and_root_is_fixed() {
        let book = sample_book(Path::new("/scans"));
        let rendered = XmlWriter::new("/out", "/scans", &book).to_xml_strings();
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].0, PathBuf::from("doc1.xml"));

        let xml = &rendered[1].1;
        assert!(xml.starts_with("<?xml version='1.0' encoding='utf-8'?>\n<document "));
        assert!(xml.contains(&format!("xmlns=\"{FINEREADER_NS}\"")));
        assert!(xml.contains(&format!("xsi:schemaLocation=\"{FINEREADER_SCHEMA_LOCATION}\"")));
        assert!(!xml.contains("languages="));
        assert!(!xml.contains("startIndent="));
        assert!(xml.contains("<par align=\"Left\">"));
        assert!(xml.contains("<line baseline=\"40\" l=\"5\" t=\"6\" r=\"7\" b=\"8\">"));
        assert!(xml.contains("<formatting lang=\"German\">drei</formatting>"));
    }

    #[test]
    fn original_coords_follow_config() {
        let book = sample_book(Path::new("/scans"));
        let modern = XmlWriter::new("/out", "/scans", &book).to_xml_strings();
        assert!(modern[0].1.contains("originalCoords=\"1\""));

        let legacy = XmlWriter::new("/out", "/scans", &book)
            .with_config(WriterConfig {
                legacy_original_coords: true,
                ..WriterConfig::default()
            })
            .to_xml_strings();
        assert!(legacy[0].1.contains("originalCoords=\"300\""));
    }

    #[test]
    fn missing_image_is_fatal_unless_copy_disabled() {
        let images = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let book = sample_book(images.path());

        let err = XmlWriter::new(output.path(), images.path(), &book).write().unwrap_err();
        assert_eq!(err.kind(), folio_core::ErrorKind::Io);

        let report = XmlWriter::new(output.path(), images.path(), &book)
            .with_config(WriterConfig {
                copy_images: false,
                ..WriterConfig::default()
            })
            .write()
            .unwrap();
        assert_eq!(report.descriptors.len(), 2);
        assert!(report.images.is_empty());
    }

    #[test]
    fn denied_copy_is_skipped_other_failures_are_fatal() {
        let source = Path::new("/scans/doc1.jpg");
        let target = PathBuf::from("/out/doc1.jpg");

        let copied = copy_outcome(Ok(12), source, target.clone()).unwrap();
        assert_eq!(copied, Some(target.clone()));

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(copy_outcome(Err(denied), source, target.clone()).unwrap(), None);

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err = copy_outcome(Err(missing), source, target).unwrap_err();
        assert_eq!(err.kind(), folio_core::ErrorKind::Io);
    }

    #[test]
    fn recurring_descriptor_name_starts_a_new_group() {
        let mut book = sample_book(Path::new("/scans"));
        book.pages.push(sample_page("doc1c.jpg", "doc1.xml", "vier"));

        let rendered = XmlWriter::new("/out", "/scans", &book).to_xml_strings();
        let names: Vec<_> = rendered.iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("doc1.xml"),
                PathBuf::from("doc2.xml"),
                PathBuf::from("doc1.xml")
            ]
        );
        assert!(rendered[2].1.contains("vier") && !rendered[2].1.contains("eins"));
    }

    #[test]
    fn writing_into_the_image_directory_does_not_clobber_images() {
        let dir = TempDir::new().unwrap();
        write_images(dir.path(), &["doc1a.jpg", "doc1b.jpg", "doc2.jpg"]);
        let book = sample_book(dir.path());

        let report = XmlWriter::new(dir.path(), dir.path(), &book).write().unwrap();
        assert!(report.images.is_empty());
        assert_eq!(std::fs::read(dir.path().join("doc2.jpg")).unwrap(), b"doc2.jpg");
    }

    #[test]
    fn read_write_read_round_trip() {
        let source = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_images(source.path(), &["doc1a.jpg", "doc1b.jpg", "doc2.jpg"]);
        let book = sample_book(source.path());

        // Seed the source directory with one pair per descriptor.
        let seeded = XmlWriter::new(source.path(), source.path(), &book).write().unwrap();
        assert_eq!(seeded.descriptors.len(), 2);
        std::fs::rename(source.path().join("doc1a.jpg"), source.path().join("doc1.jpg")).unwrap();
        std::fs::remove_file(source.path().join("doc1b.jpg")).unwrap();

        let mut first = XmlReader::from_directory(source.path()).read().unwrap();
        assert_eq!(first.page_count(), 3);
        let at = first.line_refs()[2];
        first.format_mut(at).unwrap().text = "recognized".into();

        XmlWriter::new(output.path(), source.path(), &first).write().unwrap();
        let second = XmlReader::from_directory(output.path()).read().unwrap();

        assert_eq!(second.page_count(), first.page_count());
        assert_eq!(second.schema_location, first.schema_location);
        assert_eq!(second.version, first.version);
        assert_eq!(second.producer, first.producer);
        assert_eq!(second.languages, first.languages);
        for (a, b) in first.pages.iter().zip(&second.pages) {
            assert_eq!(a.width, b.width);
            assert_eq!(a.original_coords, b.original_coords);
            assert_eq!(a.blocks, b.blocks);
        }
        assert_eq!(second.line(at).unwrap().text(), "recognized");
    }
}
