// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Decode task: parses a retrieved M-Retrieve.conf, extracts the parts
//! into `<msg_dir>/parts/`, and hands the assembled message record to a
//! publish task. Receipt is confirmed to the MMSC through a parallel
//! acknowledge task; a parse failure answers with
//! M-Notifyresp.ind(Unrecognised) instead.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use memmap2::Mmap;
use tracing::{debug, info, warn};

use crate::{
    cfg::config::SettingsProvider,
    codec::{
        decode::decode_message,
        pdu::{NotifyStatus, PduBody, MESSAGE_CLASS_PERSONAL},
    },
    error::{MmsError, Result},
    file_util,
    handler::{MmsHandler, ReceiveState},
    message::{MessagePart, MmsMessage},
    tasks::{
        ack, notifyresp, publish,
        task::{Task, TaskBody, TaskContext, TaskHeader, TaskState},
    },
    utils::{split_address_list, strip_address_type},
};

#[derive(Debug)]
pub struct DecodeTask {
    pub transaction_id: String,
    pub file: PathBuf,
    data: Bytes,
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Maps the retrieved file; failure to map means no task.
pub fn new_task(
    id: &str,
    imsi: Option<&str>,
    transaction_id: &str,
    file: &Path,
) -> Result<Task> {
    let f = std::fs::File::open(file)?;
    // The retrieve task has finished writing; the map stays read-only.
    let map = unsafe { Mmap::map(&f)? };
    Ok(Task::new(
        "Decode",
        Some(id.to_string()),
        imsi.map(str::to_string),
        TaskBody::Decode(DecodeTask {
            transaction_id: transaction_id.to_string(),
            file: file.to_path_buf(),
            data: Bytes::from_owner(map),
        }),
    ))
}

impl DecodeTask {
    fn me(body: &mut TaskBody) -> &mut DecodeTask {
        match body {
            TaskBody::Decode(d) => d,
            _ => unreachable!("decode hook on a wrong task"),
        }
    }

    pub async fn run<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        let this = Self::me(body);
        let id = header.id.clone().unwrap_or_default();

        match this.process(header, ctx) {
            Ok(msg) => {
                match ack::new_task(
                    &ctx.config,
                    &ctx.settings,
                    &id,
                    header.imsi.as_deref(),
                    &this.transaction_id,
                ) {
                    Ok(task) => ctx.queue_task(task),
                    Err(e) => warn!("cannot acknowledge receipt: {e}"),
                }
                ctx.queue_task(publish::new_task(msg));
            },
            Err(e) => {
                warn!("failed to decode MMS PDU: {e}");
                ctx.handler
                    .message_receive_state_changed(&id, ReceiveState::DecodingError);
                match notifyresp::new_task(
                    &ctx.config,
                    &id,
                    header.imsi.as_deref(),
                    &this.transaction_id,
                    NotifyStatus::Unrecognised,
                ) {
                    Ok(task) => ctx.queue_task(task),
                    Err(e) => warn!("cannot send notify response: {e}"),
                }
            },
        }
        header.set_state(TaskState::Done);
    }

    fn process<H: MmsHandler, S: SettingsProvider>(
        &self,
        header: &TaskHeader,
        ctx: &mut TaskContext<'_, H, S>,
    ) -> Result<MmsMessage> {
        let pdu = decode_message(&self.data)?;
        let PduBody::RetrieveConf(rc) = &pdu.body else {
            return Err(MmsError::decode(format!(
                "unexpected MMS PDU type {:?}",
                pdu.message_type()
            )));
        };

        info!("processing M-Retrieve.conf from {:?}", rc.from);
        let id = header
            .id
            .clone()
            .ok_or_else(|| MmsError::args("decode task has no message id"))?;
        let msg_dir = header
            .msg_dir(&ctx.config)
            .ok_or_else(|| MmsError::args("decode task has no message dir"))?;
        let parts_dir = msg_dir.join(file_util::PARTS_DIR);

        let mut taken = Vec::new();
        let mut parts = Vec::new();
        for (i, part) in rc.parts.iter().enumerate() {
            let proposed = match part.content_id.as_deref() {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => format!("part_{i}"),
            };
            let file = file_util::unique_part_name(&mut taken, &proposed);
            debug!("part {:?} {}", part.content_id, part.content_type);
            let path = file_util::write_file(&parts_dir, &file, &part.data)?;
            parts.push(MessagePart {
                content_type: part.content_type.clone(),
                content_id: part.content_id.clone(),
                file: path,
            });
        }

        Ok(MmsMessage {
            id,
            message_id: rc.msgid.clone(),
            msg_dir,
            parts_dir,
            from: rc
                .from
                .as_deref()
                .map(|f| strip_address_type(f).to_string()),
            to: split_address_list(rc.to.as_deref()),
            cc: split_address_list(rc.cc.as_deref()),
            subject: rc.subject.clone(),
            class: rc
                .class
                .clone()
                .unwrap_or_else(|| MESSAGE_CLASS_PERSONAL.to_string()),
            priority: rc.priority.unwrap_or_default(),
            date: if rc.date != 0 { rc.date } else { now_secs() },
            keep_files: ctx.config.keep_temp_files,
            parts,
        })
    }

    /// Removes the retrieved PDU file once the task is finished.
    pub fn cleanup(&self, keep_temp_files: bool) {
        if !keep_temp_files {
            file_util::remove_file_and_dir(&self.file);
        }
    }
}
