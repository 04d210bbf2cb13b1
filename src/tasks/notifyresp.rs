// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! NotifyResp task: encodes M-Notifyresp.ind with the given status
//! (Retrieved, Rejected, Deferred or Unrecognised) and posts it.

use tracing::debug;

use crate::{
    cfg::config::Config,
    codec::{
        encode::encode_message,
        pdu::{MmsPdu, NotifyRespInd, NotifyStatus, PduBody, MMS_VERSION},
    },
    error::Result,
    file_util,
    tasks::{
        http::{HttpKind, HttpTask},
        task::{Task, TaskBody, TaskHeader},
    },
};

fn encode_notifyresp_file(
    config: &Config,
    id: &str,
    transaction_id: &str,
    status: NotifyStatus,
) -> Result<std::path::PathBuf> {
    let dir = file_util::message_dir(config, id);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(file_util::NOTIFYRESP_IND_FILE);
    let file = std::fs::File::create(&path)?;
    let pdu = MmsPdu {
        transaction_id: Some(transaction_id.to_string()),
        version: MMS_VERSION,
        body: PduBody::NotifyRespInd(NotifyRespInd { notify_status: status }),
    };
    encode_message(&pdu, file)?;
    Ok(path)
}

/// Encodes the response and wraps it into an HTTP POST task.
pub fn new_task(
    config: &Config,
    id: &str,
    imsi: Option<&str>,
    transaction_id: &str,
    status: NotifyStatus,
) -> Result<Task> {
    let path = encode_notifyresp_file(config, id, transaction_id, status)?;
    Ok(Task::new(
        "NotifyResp",
        Some(id.to_string()),
        imsi.map(str::to_string),
        TaskBody::Http(HttpTask::new(HttpKind::NotifyResp, None, None, Some(path))),
    ))
}

/// Terminal handler for Ack and NotifyResp posts; the MMSC got its
/// answer or it did not, nothing else depends on it.
pub fn done(header: &TaskHeader, success: bool) {
    debug!(
        "{} {}",
        header.name,
        if success { "delivered" } else { "not delivered" }
    );
}
