// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line image extraction — cut each text line out of its page image so it can
// be handed to a recognizer. Uses the `image` and `imageproc` crates.

use std::path::{Path, PathBuf};

use folio_core::error::{FolioError, Result};
use folio_core::{Book, LineImageConfig, LineRef, Rect};
use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, info, instrument};

/// A cropped line image with its address in the book.
#[derive(Debug, Clone)]
pub struct LineSample {
    /// Identifier of the form `<image stem>_<page>_<block>_<par>_<line>`.
    pub id: String,
    pub at: LineRef,
    pub image: DynamicImage,
}

/// Crops line rectangles out of page images.
///
/// The most recently decoded page image is kept, so walking the lines of a
/// book in order decodes every page image once.
pub struct LineImageExtractor {
    config: LineImageConfig,
    cached: Option<(PathBuf, DynamicImage)>,
}

impl LineImageExtractor {
    pub fn new(config: LineImageConfig) -> Self {
        Self {
            config,
            cached: None,
        }
    }

    pub fn config(&self) -> &LineImageConfig {
        &self.config
    }

    /// Crop the addressed line from its page image.
    pub fn extract(&mut self, book: &Book, at: LineRef) -> Result<DynamicImage> {
        let page = book.pages.get(at.page).ok_or_else(|| {
            FolioError::ImageError(format!("page {} not found in book", at.page))
        })?;
        let line = book.line(at).ok_or_else(|| {
            FolioError::ImageError(format!("line {:?} not found in book", at))
        })?;
        let rect = line.rect;
        let page_image = cached_image(&mut self.cached, &page.image_file)?;
        crop_line(page_image, rect, &self.config)
    }

    /// Crop every line of the book in document order.
    #[instrument(skip_all, fields(pages = book.page_count()))]
    pub fn samples(&mut self, book: &Book) -> Result<Vec<LineSample>> {
        let mut samples = Vec::new();
        for at in book.line_refs() {
            let stem = book.pages[at.page]
                .image_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            let image = self.extract(book, at)?;
            samples.push(LineSample {
                id: at.sample_id(&stem),
                at,
                image,
            });
        }
        info!(samples = samples.len(), "Line images extracted");
        Ok(samples)
    }
}

/// Return the decoded image at `path`, reusing the cached one when it matches.
fn cached_image<'c>(
    cache: &'c mut Option<(PathBuf, DynamicImage)>,
    path: &Path,
) -> Result<&'c DynamicImage> {
    let entry = match cache.take() {
        Some(entry) if entry.0 == path => entry,
        _ => {
            let image = image::open(path).map_err(|err| {
                FolioError::ImageError(format!("failed to open {}: {}", path.display(), err))
            })?;
            debug!(
                path = %path.display(),
                width = image.width(),
                height = image.height(),
                "Page image loaded"
            );
            (path.to_path_buf(), image)
        }
    };
    Ok(&cache.insert(entry).1)
}

/// Crop `rect` (grown by the configured padding and clamped to the image)
/// and optionally binarize it.
pub fn crop_line(
    page_image: &DynamicImage,
    rect: Rect,
    config: &LineImageConfig,
) -> Result<DynamicImage> {
    let (img_w, img_h) = (page_image.width() as i64, page_image.height() as i64);
    let pad = config.padding as i64;

    let left = (rect.left as i64 - pad).clamp(0, img_w);
    let top = (rect.top as i64 - pad).clamp(0, img_h);
    let right = (rect.right as i64 + pad).clamp(0, img_w);
    let bottom = (rect.bottom as i64 + pad).clamp(0, img_h);

    if right <= left || bottom <= top {
        return Err(FolioError::ImageError(format!(
            "line rectangle l={} t={} r={} b={} lies outside the {}x{} page image",
            rect.left, rect.top, rect.right, rect.bottom, img_w, img_h
        )));
    }

    let cropped = page_image.crop_imm(
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    );
    Ok(if config.binary {
        binarize(&cropped)
    } else {
        cropped
    })
}

/// Global Otsu binarization to a black-and-white luma image.
pub fn binarize(image: &DynamicImage) -> DynamicImage {
    let gray = image.to_luma8();
    let threshold = imageproc::contrast::otsu_level(&gray);
    debug!(threshold, "Otsu threshold computed");

    let (width, height) = gray.dimensions();
    let output = GrayImage::from_fn(width, height, |x, y| {
        let val = gray.get_pixel(x, y).0[0];
        Luma([if val > threshold { 255u8 } else { 0u8 }])
    });
    DynamicImage::ImageLuma8(output)
}
