// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Iterative image downscaling. Step N scales the original by
//! 1/(N+1) in each dimension; the first step additionally honors the
//! per-SIM pixel budget. Resized copies live in a `resize/`
//! subdirectory next to the original.

use std::path::{Path, PathBuf};

use image::{ImageFormat, imageops::FilterType};
use tracing::debug;

use crate::error::{MmsError, Result};

pub const RESIZE_DIR: &str = "resize";

/// Smallest divisor whose result fits the pixel budget, starting from
/// the next step.
fn next_resize_step(step: u32, width: u32, height: u32, max_pixels: u64) -> u32 {
    let mut next = step + 1;
    if max_pixels > 0 {
        let mut size = u64::from(width / (next + 1)) * u64::from(height / (next + 1));
        while size > 0 && size > max_pixels {
            next += 1;
            size = u64::from(width / (next + 1)) * u64::from(height / (next + 1));
        }
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFlavor {
    Jpeg,
    Generic,
}

/// Resize state of one image attachment.
#[derive(Debug, Clone)]
pub struct ImageResizeState {
    flavor: ImageFlavor,
    step: u32,
    resized: Option<PathBuf>,
}

impl ImageResizeState {
    pub fn new(flavor: ImageFlavor) -> Self {
        Self { flavor, step: 0, resized: None }
    }

    /// Drops the resized copy and starts over from the original.
    pub fn reset(&mut self) {
        if let Some(resized) = self.resized.take() {
            let _ = std::fs::remove_file(resized);
        }
        self.step = 0;
    }

    fn output_path(&self, original: &Path) -> Result<PathBuf> {
        let dir = original
            .parent()
            .ok_or_else(|| MmsError::args("attachment path has no parent"))?
            .join(RESIZE_DIR);
        std::fs::create_dir_all(&dir)?;
        let name = original
            .file_name()
            .ok_or_else(|| MmsError::args("attachment path has no file name"))?;
        Ok(dir.join(name))
    }

    /// Performs one more downscale step against the original file.
    /// Returns the path of the updated working copy, or `None` when the
    /// image cannot shrink any further.
    pub fn resize(
        &mut self,
        original: &Path,
        max_pixels: u64,
    ) -> Result<Option<PathBuf>> {
        let src = image::open(original)
            .map_err(|e| MmsError::encode(format!("cannot read image: {e}")))?;
        let (w, h) = (src.width(), src.height());
        if w <= 1 || h <= 1 {
            return Ok(None);
        }

        let next = next_resize_step(self.step, w, h, max_pixels);
        let (cols, rows) = (w / (next + 1), h / (next + 1));
        if cols == 0 || rows == 0 {
            return Ok(None);
        }
        debug!("resizing ({w}x{h} -> {cols}x{rows})");

        let out = self.output_path(original)?;
        let scaled = src.resize_exact(cols, rows, FilterType::Triangle);
        match self.flavor {
            ImageFlavor::Jpeg => {
                let file = std::fs::File::create(&out)?;
                let mut writer = std::io::BufWriter::new(file);
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut writer,
                    80,
                );
                scaled
                    .to_rgb8()
                    .write_with_encoder(encoder)
                    .map_err(|e| MmsError::encode(format!("jpeg encode: {e}")))?;
            },
            ImageFlavor::Generic => {
                let format = ImageFormat::from_path(original)
                    .unwrap_or(ImageFormat::Png);
                scaled
                    .save_with_format(&out, format)
                    .map_err(|e| MmsError::encode(format!("image encode: {e}")))?;
            },
        }

        self.step = next;
        self.resized = Some(out.clone());
        Ok(Some(out))
    }
}
