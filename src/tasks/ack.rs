// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Acknowledge task: encodes M-Acknowledge.ind with the notification's
//! transaction id and posts it to the MMSC.

use std::sync::Arc;

use crate::{
    cfg::config::{Config, SettingsProvider},
    codec::{
        encode::encode_message,
        pdu::{AcknowledgeInd, MmsPdu, PduBody, MMS_VERSION},
    },
    error::Result,
    file_util,
    tasks::{
        http::{HttpKind, HttpTask},
        task::{Task, TaskBody},
    },
};

fn encode_ack_file(
    config: &Config,
    allow_dr: bool,
    id: &str,
    transaction_id: &str,
) -> Result<std::path::PathBuf> {
    let dir = file_util::message_dir(config, id);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(file_util::ACKNOWLEDGE_IND_FILE);
    let file = std::fs::File::create(&path)?;
    let pdu = MmsPdu {
        transaction_id: Some(transaction_id.to_string()),
        version: MMS_VERSION,
        body: PduBody::AcknowledgeInd(AcknowledgeInd { report: allow_dr }),
    };
    encode_message(&pdu, file)?;
    Ok(path)
}

/// Encodes the acknowledgement and wraps it into an HTTP POST task.
pub fn new_task<S: SettingsProvider>(
    config: &Config,
    settings: &Arc<S>,
    id: &str,
    imsi: Option<&str>,
    transaction_id: &str,
) -> Result<Task> {
    let sim = settings.sim_settings(imsi.unwrap_or_default());
    let path = encode_ack_file(config, sim.allow_dr, id, transaction_id)?;
    Ok(Task::new(
        "Ack",
        Some(id.to_string()),
        imsi.map(str::to_string),
        TaskBody::Http(HttpTask::new(HttpKind::Ack, None, None, Some(path))),
    ))
}
