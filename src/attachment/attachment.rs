// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Outbound attachment objects: content-type classification, resize
//! bookkeeping, and read-only maps of the staged files.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use memmap2::Mmap;
use tracing::{debug, warn};

use crate::{
    attachment::{
        image::{ImageFlavor, ImageResizeState},
        smil,
    },
    cfg::config::Config,
    codec::{media_type::MediaType, tables},
    error::{MmsError, Result},
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Attachment description as submitted through the RPC surface.
#[derive(Debug, Clone)]
pub struct AttachmentInfo {
    pub file: PathBuf,
    /// Declared media type; empty means "sniff it".
    pub content_type: String,
    /// Desired content id; empty means "use the file name".
    pub content_id: String,
}

/// Kind-specific behavior: only images participate in the resize loop.
#[derive(Debug)]
enum AttachmentKind {
    Generic,
    Image(ImageResizeState),
}

/// One staged outbound attachment. `file_name` tracks the current
/// working copy, which diverges from `original_file` once the resize
/// loop has stepped the image down. Owns its staged files: dropping the
/// attachment removes them unless temp files are kept.
#[derive(Debug)]
pub struct Attachment {
    pub original_file: PathBuf,
    pub file_name: PathBuf,
    /// Canonical media type, parameters included.
    pub content_type: String,
    pub content_id: String,
    pub content_location: String,
    pub is_smil: bool,
    keep_files: bool,
    kind: AttachmentKind,
}

/// Magic-based media type guess; SMIL is detected by an XML sniff since
/// magic reports it as plain text.
pub fn guess_content_type(path: &Path) -> String {
    let detected = infer::get_from_path(path)
        .ok()
        .flatten()
        .map(|t| t.mime_type().to_string());

    match detected {
        Some(mime) if !mime.starts_with("text/") => mime,
        _ if smil::file_is_smil(path) => tables::CONTENT_TYPE_SMIL.to_string(),
        Some(mime) => mime,
        // Text files have no magic; assume UTF-8 text.
        None if file_is_mostly_text(path) => "text/plain".to_string(),
        None => {
            warn!("no mime type for {}", path.display());
            DEFAULT_CONTENT_TYPE.to_string()
        },
    }
}

fn file_is_mostly_text(path: &Path) -> bool {
    let Ok(data) = std::fs::read(path) else {
        return false;
    };
    let sample = &data[..data.len().min(1024)];
    std::str::from_utf8(sample).is_ok() && !sample.contains(&0)
}

impl Attachment {
    /// Builds an attachment from a staged file, classifying its content
    /// type and picking the resize strategy.
    pub fn new(config: &Config, info: &AttachmentInfo) -> Result<Self> {
        let path = std::fs::canonicalize(&info.file)?;
        if !path.is_file() {
            return Err(MmsError::args(format!("{} not found", path.display())));
        }

        let (content_type, is_smil) = if !info.content_type.is_empty() {
            let parsed = MediaType::parse(&info.content_type).ok_or_else(|| {
                MmsError::args(format!("bad content type: {}", info.content_type))
            })?;
            let is_smil = parsed.mime == tables::CONTENT_TYPE_SMIL;
            (parsed.to_string(), is_smil)
        } else {
            let detected = guess_content_type(&path);
            let is_smil = detected == tables::CONTENT_TYPE_SMIL;
            let mut mt = MediaType { mime: detected, params: Vec::new() };
            if is_smil || mt.mime.starts_with("text/") {
                mt = mt.with_param("charset", "utf-8");
            }
            (mt.to_string(), is_smil)
        };

        debug!("{}: {content_type}", path.display());

        let mime = content_type.split(';').next().unwrap_or_default().trim();
        let kind = if mime == "image/jpeg" {
            AttachmentKind::Image(ImageResizeState::new(ImageFlavor::Jpeg))
        } else if mime.starts_with("image/") {
            AttachmentKind::Image(ImageResizeState::new(ImageFlavor::Generic))
        } else {
            AttachmentKind::Generic
        };

        let content_location = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| MmsError::args("attachment has no file name"))?;
        let content_id = if info.content_id.is_empty() {
            content_location.clone()
        } else {
            info.content_id.clone()
        };

        Ok(Self {
            original_file: path.clone(),
            file_name: path,
            content_type,
            content_id,
            content_location,
            is_smil,
            keep_files: config.keep_temp_files,
            kind,
        })
    }

    /// Writes the auto-generated SMIL wrapper for `attachments` to
    /// `path` and wraps it as the presentation part.
    pub fn new_smil(
        config: &Config,
        path: &Path,
        attachments: &[Attachment],
    ) -> Result<Self> {
        std::fs::write(path, smil::generate_smil(attachments))?;
        let info = AttachmentInfo {
            file: path.to_path_buf(),
            content_type: format!("{}; charset=utf-8", tables::CONTENT_TYPE_SMIL),
            content_id: String::new(),
        };
        let smil = Self::new(config, &info)?;
        debug_assert!(smil.is_smil);
        Ok(smil)
    }

    /// Media type without parameters.
    pub fn mime(&self) -> &str {
        self.content_type.split(';').next().unwrap_or_default().trim()
    }

    pub fn is_resizable(&self) -> bool {
        matches!(self.kind, AttachmentKind::Image(_))
    }

    /// Undoes any resize steps taken by a previous encoding attempt.
    pub fn reset(&mut self) {
        if let AttachmentKind::Image(state) = &mut self.kind {
            state.reset();
        }
        self.file_name = self.original_file.clone();
    }

    /// Advances the downscale loop by one step. Returns `false` when the
    /// attachment cannot be shrunk any further.
    pub fn resize(&mut self, max_pixels: u64) -> Result<bool> {
        let AttachmentKind::Image(state) = &mut self.kind else {
            return Ok(false);
        };
        match state.resize(&self.original_file, max_pixels)? {
            Some(path) => {
                self.file_name = path;
                Ok(true)
            },
            None => Ok(false),
        }
    }

    /// Size of the current working copy.
    pub fn file_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.file_name)?.len())
    }

    /// Read-only map of the current working copy, shared as `Bytes`.
    pub fn map_contents(&self) -> Result<Bytes> {
        let file = std::fs::File::open(&self.file_name)?;
        // Safety contract of memmap: the staged copy is owned by this
        // task and not modified while mapped.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Bytes::from_owner(map))
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if !self.keep_files {
            crate::file_util::remove_file_and_dir(&self.original_file);
            if let AttachmentKind::Image(state) = &mut self.kind {
                state.reset();
            }
        }
    }
}
