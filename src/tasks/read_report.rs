// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Read report task: encodes M-Read-Rec.ind and posts it to the MMSC,
//! then tells the handler how the posting went.

use crate::{
    cfg::config::{Config, SettingsProvider},
    codec::{
        encode::encode_message,
        pdu::{MmsPdu, PduBody, ReadInd, ReadStatus as WireReadStatus, MMS_VERSION},
    },
    error::{MmsError, Result},
    file_util,
    handler::{MmsHandler, ReadReportStatus, ReadStatus},
    tasks::{
        http::{HttpDone, HttpKind, HttpTask},
        task::{Task, TaskBody, TaskContext, TaskHeader},
    },
    utils::normalize_address,
};

fn encode_read_rec_file(
    config: &Config,
    id: &str,
    message_id: &str,
    to: &str,
    status: ReadStatus,
) -> Result<std::path::PathBuf> {
    let dir = file_util::message_dir(config, id);
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(file_util::READ_REC_IND_FILE);
    let file = std::fs::File::create(&path)?;
    let pdu = MmsPdu {
        transaction_id: None,
        version: MMS_VERSION,
        body: PduBody::ReadRecInd(ReadInd {
            rr_status: match status {
                ReadStatus::Deleted => WireReadStatus::Deleted,
                ReadStatus::Read => WireReadStatus::Read,
            },
            msgid: Some(message_id.to_string()),
            to: Some(
                normalize_address(to)
                    .ok_or_else(|| MmsError::args("missing recipient"))?,
            ),
            from: None,
            date: crate::tasks::decode::now_secs(),
        }),
    };
    encode_message(&pdu, file)?;
    Ok(path)
}

/// Encodes the report and wraps it into an HTTP POST task.
pub fn new_task(
    config: &Config,
    id: &str,
    imsi: Option<&str>,
    message_id: &str,
    to: &str,
    status: ReadStatus,
) -> Result<Task> {
    let path = encode_read_rec_file(config, id, message_id, to, status)?;
    Ok(Task::new(
        "Read",
        Some(id.to_string()),
        imsi.map(str::to_string),
        TaskBody::Http(HttpTask::new(HttpKind::ReadReport, None, None, Some(path))),
    ))
}

/// Maps the HTTP outcome onto the read-report status stream.
pub fn done<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    status: HttpDone,
    ctx: &mut TaskContext<'_, H, S>,
) {
    let Some(id) = &header.id else {
        return;
    };
    let status = match status {
        HttpDone::Success => ReadReportStatus::Ok,
        HttpDone::TransportError => ReadReportStatus::IoError,
        HttpDone::HttpError => ReadReportStatus::PermanentError,
    };
    ctx.handler.read_report_send_status(id, status);
}
