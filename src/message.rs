// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Decoded message record delivered to the message-store handler.

use std::path::PathBuf;

use crate::codec::pdu::Priority;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    pub content_type: String,
    pub content_id: Option<String>,
    /// Extracted part file under `<msg_dir>/parts/`.
    pub file: PathBuf,
}

/// One received message, ready for the handler. The part files must not
/// be deleted until `message_received` completes.
#[derive(Debug, Clone, PartialEq)]
pub struct MmsMessage {
    /// Database record id assigned by the handler.
    pub id: String,
    /// MMSC-assigned message id, when present.
    pub message_id: Option<String>,
    pub msg_dir: PathBuf,
    pub parts_dir: PathBuf,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: Option<String>,
    pub class: String,
    pub priority: Priority,
    /// Seconds since the epoch.
    pub date: u64,
    /// Leave the extracted files on disk when the record is dropped.
    pub keep_files: bool,
    pub parts: Vec<MessagePart>,
}
