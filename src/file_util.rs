// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Message working-directory layout and temporary-file lifecycle.
//!
//! Every task owns `<root>/msg/<id>/`; extracted parts go to a `parts/`
//! subdirectory, outbound attachments are staged under `encode/`, and
//! unrecognized push PDUs can be archived in `<root>/attic/NNN/`.

use std::path::{Path, PathBuf};

use crate::{
    cfg::config::Config,
    error::{MmsError, Result},
};

pub const MESSAGE_DIR: &str = "msg";
pub const ATTIC_DIR: &str = "attic";
pub const PARTS_DIR: &str = "parts";
pub const ENCODE_DIR: &str = "encode";

pub const NOTIFICATION_IND_FILE: &str = "m-notification.ind";
pub const NOTIFYRESP_IND_FILE: &str = "m-notifyresp.ind";
pub const RETRIEVE_CONF_FILE: &str = "m-retrieve.conf";
pub const ACKNOWLEDGE_IND_FILE: &str = "m-acknowledge.ind";
pub const DELIVERY_IND_FILE: &str = "m-delivery.ind";
pub const READ_REC_IND_FILE: &str = "m-read-rec.ind";
pub const READ_ORIG_IND_FILE: &str = "m-read-orig.ind";
pub const SEND_REQ_FILE: &str = "m-send.req";
pub const SEND_CONF_FILE: &str = "m-send.conf";
pub const UNRECOGNIZED_PUSH_FILE: &str = "push.pdu";

/// Working directory of the message with the given database id.
pub fn message_dir(config: &Config, id: &str) -> PathBuf {
    config.root_dir.join(MESSAGE_DIR).join(id)
}

/// Creates `dir` and writes `file` into it.
pub fn write_file(dir: &Path, file: &str, data: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file);
    std::fs::write(&path, data)?;
    Ok(path)
}

/// Removes a file and its parent directory if that leaves it empty.
pub fn remove_file_and_dir(path: &Path) {
    let _ = std::fs::remove_file(path);
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir(dir);
    }
}

/// Removes the whole message directory unless temp files are kept.
pub fn cleanup_msg_dir(config: &Config, id: &str) {
    if !config.keep_temp_files {
        let _ = std::fs::remove_dir_all(message_dir(config, id));
    }
}

/// First free attic slot `<root>/attic/NNN` (000..099).
pub fn next_attic_dir(config: &Config) -> PathBuf {
    let attic = config.root_dir.join(ATTIC_DIR);
    for i in 0..100 {
        let dir = attic.join(format!("{i:03}"));
        if !dir.is_dir() {
            return dir;
        }
    }
    attic.join("099")
}

/// Proposed part file name, sanitized: `<>[]` dropped, path separators
/// replaced, then `_`-prefixed until unique among `taken`.
pub fn unique_part_name(taken: &mut Vec<String>, proposed: &str) -> String {
    let mut name: String = proposed
        .chars()
        .filter_map(|c| match c {
            '<' | '>' | '[' | ']' => None,
            '/' | '\\' => Some('_'),
            c => Some(c),
        })
        .collect();
    while taken.iter().any(|t| *t == name) {
        name.insert(0, '_');
    }
    taken.push(name.clone());
    name
}

/// Unique basename for a staged attachment copy: prefixes `_` until the
/// path is free.
pub fn unique_file_path(dir: &Path, file: &str) -> PathBuf {
    let mut path = dir.join(file);
    let mut name = file.to_string();
    for _ in 0..100 {
        if !path.is_file() {
            break;
        }
        name.insert(0, '_');
        path = dir.join(&name);
    }
    path
}

/// Creates the engine root directory; failure is a fatal start error.
pub fn create_root_dir(config: &Config) -> Result<()> {
    std::fs::create_dir_all(config.root_dir.join(MESSAGE_DIR))
        .map_err(MmsError::Io)
}
