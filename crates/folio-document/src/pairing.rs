// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pairing of page images with their descriptor files.
//
// Two layouts are supported: a directory in which every `.jpg` sits next to a
// `.xml` with the same stem, and an explicit list of images whose descriptors
// are found by swapping the extension.

use std::path::{Path, PathBuf};

use folio_core::ReaderConfig;
use folio_core::error::{FolioError, Result};
use tracing::{debug, info, instrument, warn};

const IMAGE_SUFFIX: &str = ".jpg";
const DESCRIPTOR_SUFFIX: &str = ".xml";

/// A page image and the descriptor that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    pub image: PathBuf,
    pub descriptor: PathBuf,
}

/// Pair every `.jpg`/`.xml` file in `dir`.
///
/// Relevant files are sorted by name and consumed two at a time; each pair
/// must hold one image and one descriptor with equal stems (text before the
/// first `.`). Any other layout is a [`FolioError::WrongFileStructure`].
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn pair_directory(dir: &Path) -> Result<Vec<FilePair>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        // Follows symlinks; dangling links and directories are ignored.
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(file = ?entry.file_name(), "Skipping file with non UTF-8 name");
            continue;
        };
        if name.ends_with(IMAGE_SUFFIX) || name.ends_with(DESCRIPTOR_SUFFIX) {
            names.push(name);
        }
    }
    names.sort();

    let mut pairs = Vec::with_capacity(names.len() / 2);
    let mut remaining = names.iter();
    while let Some(first) = remaining.next() {
        let Some(second) = remaining.next() else {
            return Err(FolioError::WrongFileStructure(format!(
                "the file '{}' has no suitable image or xml file",
                first
            )));
        };
        let (image, descriptor) = match_pair(first, second)?;
        pairs.push(FilePair {
            image: dir.join(image),
            descriptor: dir.join(descriptor),
        });
    }

    info!(pairs = pairs.len(), "Directory paired");
    Ok(pairs)
}

/// Order two sorted names into `(image, descriptor)` and check their stems.
fn match_pair<'a>(first: &'a str, second: &'a str) -> Result<(&'a str, &'a str)> {
    let (image, descriptor) = if first.ends_with(DESCRIPTOR_SUFFIX) {
        if !second.ends_with(IMAGE_SUFFIX) {
            return Err(FolioError::WrongFileStructure(format!(
                "the xml file '{}' has no suitable image file",
                first
            )));
        }
        (second, first)
    } else if second.ends_with(DESCRIPTOR_SUFFIX) {
        (first, second)
    } else {
        return Err(FolioError::WrongFileStructure(format!(
            "the image file '{}' has no suitable xml file",
            first
        )));
    };

    if stem(image) != stem(descriptor) {
        return Err(FolioError::WrongFileStructure(format!(
            "the image file '{}' and xml file '{}' have no equal name",
            image, descriptor
        )));
    }
    Ok((image, descriptor))
}

fn stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Pair an explicit set of images with `<image without extension>.xml`.
///
/// Images are sorted and de-duplicated first. An image without a descriptor
/// fails the whole call unless `config.skip_invalid` is set, in which case it
/// is dropped (and deleted from disk together with any descriptor when
/// `config.remove_invalid` is also set).
#[instrument(skip_all, fields(images = images.len()))]
pub fn pair_images(images: &[PathBuf], config: &ReaderConfig) -> Result<Vec<FilePair>> {
    let mut images = images.to_vec();
    images.sort();
    images.dedup();

    let mut pairs = Vec::with_capacity(images.len());
    for image in images {
        let descriptor = image.with_extension("xml");
        if descriptor.is_file() {
            pairs.push(FilePair { image, descriptor });
            continue;
        }

        if !config.skip_invalid {
            return Err(FolioError::WrongFileStructure(format!(
                "the image file '{}' has no suitable xml file '{}'",
                image.display(),
                descriptor.display()
            )));
        }

        warn!(image = %image.display(), "Skipping image without descriptor");
        if config.remove_invalid {
            remove_if_present(&image)?;
            remove_if_present(&descriptor)?;
        }
    }

    info!(pairs = pairs.len(), "Image list paired");
    Ok(pairs)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed invalid file");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
