// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognizer seam — hand line images to an external text recognizer and store
// its best hypothesis in each line's format.

use folio_core::Book;
use folio_core::error::{FolioError, Result};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::image::LineImageExtractor;

/// One candidate transcription of a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub text: String,
    pub confidence: f32,
}

impl Hypothesis {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A line recognizer, typically a model ensemble with voting.
pub trait Predictor {
    /// Recognize a batch of line images.
    ///
    /// Must return one hypothesis list per input image, best first.
    fn predict_batch(&mut self, lines: &[DynamicImage]) -> Result<Vec<Vec<Hypothesis>>>;
}

impl<F> Predictor for F
where
    F: FnMut(&[DynamicImage]) -> Result<Vec<Vec<Hypothesis>>>,
{
    fn predict_batch(&mut self, lines: &[DynamicImage]) -> Result<Vec<Vec<Hypothesis>>> {
        self(lines)
    }
}

/// Recognize every line of `book` and overwrite its first format's text.
///
/// Lines are processed in document order, `batch_size` at a time. A line for
/// which the predictor returns no hypothesis keeps its previous text.
/// Returns the number of lines updated.
#[instrument(skip_all, fields(pages = book.page_count(), batch_size = batch_size))]
pub fn transcribe(
    book: &mut Book,
    predictor: &mut dyn Predictor,
    extractor: &mut LineImageExtractor,
    batch_size: usize,
) -> Result<usize> {
    if batch_size == 0 {
        return Err(FolioError::ConfigError(
            "batch size must be at least 1".to_string(),
        ));
    }

    let refs = book.line_refs();
    let mut updated = 0;

    for batch in refs.chunks(batch_size) {
        let images = batch
            .iter()
            .map(|at| extractor.extract(book, *at))
            .collect::<Result<Vec<_>>>()?;

        let results = predictor.predict_batch(&images)?;
        if results.len() != batch.len() {
            return Err(FolioError::PredictionError(format!(
                "predictor returned {} results for {} lines",
                results.len(),
                batch.len()
            )));
        }

        for (at, hypotheses) in batch.iter().zip(results) {
            let Some(best) = hypotheses.into_iter().next() else {
                warn!(?at, "No hypothesis for line; keeping previous text");
                continue;
            };
            match book.format_mut(*at) {
                Some(format) => {
                    format.text = best.text;
                    updated += 1;
                }
                None => warn!(?at, "Line has no format to receive text"),
            }
        }
        debug!(lines = batch.len(), "Batch recognized");
    }

    info!(updated, total = refs.len(), "Book transcribed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Block, Format, Line, LineImageConfig, Page, Par, Rect, TEXT_BLOCK_TYPE};
    use image::{GrayImage, Luma};
    use tempfile::TempDir;

    /// A book with `widths.len()` lines whose rect widths differ, so the fake
    /// predictor can tell them apart.
    fn book(dir: &TempDir, widths: &[i32]) -> Book {
        let path = dir.path().join("0001.png");
        GrayImage::from_pixel(200, 40, Luma([255u8])).save(&path).unwrap();

        let mut page = Page::new("200", "40", "300", "1", &path, "0001.xml");
        let mut block = Block::new(TEXT_BLOCK_TYPE, None, Rect::new(0, 0, 200, 40));
        let mut par = Par::default();
        for width in widths {
            let mut line = Line::new(None, Rect::new(0, 0, *width, 10));
            line.formats.push(Format::new(Some("German".into()), "old"));
            par.lines.push(line);
        }
        block.pars.push(par);
        page.blocks.push(block);

        let mut book = Book::new(dir.path(), None, None, None, None);
        book.pages.push(page);
        book
    }

    fn by_width(lines: &[DynamicImage]) -> Result<Vec<Vec<Hypothesis>>> {
        Ok(lines
            .iter()
            .map(|img| {
                vec![
                    Hypothesis::new(format!("w{}", img.width()), 0.9),
                    Hypothesis::new("runner-up", 0.1),
                ]
            })
            .collect())
    }

    #[test]
    fn best_hypothesis_overwrites_text() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&dir, &[10, 20, 30]);
        let mut extractor = LineImageExtractor::new(LineImageConfig::default());
        let mut calls = 0;
        let mut predictor = |lines: &[DynamicImage]| -> Result<Vec<Vec<Hypothesis>>> {
            calls += 1;
            by_width(lines)
        };

        let updated = transcribe(&mut book, &mut predictor, &mut extractor, 2).unwrap();
        assert_eq!(updated, 3);
        assert_eq!(calls, 2);

        let texts: Vec<String> = book.lines().map(|(_, line)| line.text()).collect();
        assert_eq!(texts, vec!["w10", "w20", "w30"]);
        let first = &book.pages[0].blocks[0].pars[0].lines[0].formats[0];
        assert_eq!(first.lang.as_deref(), Some("German"));
    }

    #[test]
    fn empty_hypotheses_keep_text() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&dir, &[10]);
        let mut extractor = LineImageExtractor::new(LineImageConfig::default());
        let mut predictor = |lines: &[DynamicImage]| -> Result<Vec<Vec<Hypothesis>>> {
            Ok(lines.iter().map(|_| Vec::new()).collect())
        };

        let updated = transcribe(&mut book, &mut predictor, &mut extractor, 4).unwrap();
        assert_eq!(updated, 0);
        assert_eq!(book.lines().next().unwrap().1.text(), "old");
    }

    #[test]
    fn wrong_result_count_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&dir, &[10, 20]);
        let mut extractor = LineImageExtractor::new(LineImageConfig::default());
        let mut predictor = |_: &[DynamicImage]| -> Result<Vec<Vec<Hypothesis>>> {
            Ok(vec![vec![Hypothesis::new("x", 1.0)]])
        };

        let err = transcribe(&mut book, &mut predictor, &mut extractor, 2).unwrap_err();
        assert_eq!(err.kind(), folio_core::ErrorKind::Prediction);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut book = book(&dir, &[10]);
        let mut extractor = LineImageExtractor::new(LineImageConfig::default());

        let err = transcribe(&mut book, &mut by_width, &mut extractor, 0).unwrap_err();
        assert_eq!(err.kind(), folio_core::ErrorKind::Config);
    }
}
