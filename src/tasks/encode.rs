// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Encode task: assembles m-send.req on a dedicated worker thread.
//! Attachments are staged under `<msg_dir>/encode/`, wrapped with an
//! auto-generated SMIL presentation when none was supplied, and the
//! resulting PDU is re-encoded with progressively smaller images until
//! it fits the per-SIM size limit.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    attachment::{Attachment, AttachmentInfo},
    cfg::config::{Config, SettingsProvider, SimSettings},
    codec::{
        encode::encode_message,
        pdu::{MmsPdu, Part, PduBody, SendReq, MMS_VERSION},
        tables,
    },
    error::{MmsError, Result},
    file_util,
    handler::{MmsHandler, SendState},
    tasks::{
        send,
        task::{Event, Task, TaskBody, TaskContext, TaskHeader, TaskState},
    },
    utils::normalize_address_list,
};

/// Request a delivery report for the message.
pub const SEND_FLAG_REQUEST_DELIVERY_REPORT: u32 = 0x01;
/// Request a read report for the message.
pub const SEND_FLAG_REQUEST_READ_REPORT: u32 = 0x02;

#[derive(Debug)]
pub struct EncodeTask {
    to: String,
    cc: Option<String>,
    bcc: Option<String>,
    subject: Option<String>,
    flags: u32,
    /// Taken by the worker thread for the duration of the job.
    attachments: Option<Vec<Attachment>>,
}

/// Worker thread verdict.
#[derive(Debug)]
pub enum EncodeOutcome {
    /// Encoded within budget; the file is ready to send.
    Done(PathBuf),
    /// Resizing could not squeeze the message under the size limit.
    TooBig,
    Error(String),
}

/// Stages the attachments and builds the encode task. Address lists are
/// normalized up front; a missing recipient is a caller error.
#[allow(clippy::too_many_arguments)]
pub fn new_task(
    config: &Config,
    id: &str,
    imsi: &str,
    to: &str,
    cc: &str,
    bcc: &str,
    subject: &str,
    flags: u32,
    parts: &[AttachmentInfo],
) -> Result<Task> {
    let to = normalize_address_list(to)
        .ok_or_else(|| MmsError::args("missing To: address"))?;

    let encode_dir = file_util::message_dir(config, id).join(file_util::ENCODE_DIR);
    std::fs::create_dir_all(&encode_dir)?;

    let attachments = prepare_attachments(config, &encode_dir, parts)?;

    Ok(Task::new(
        "Encode",
        Some(id.to_string()),
        Some(imsi.to_string()),
        TaskBody::Encode(EncodeTask {
            to,
            cc: normalize_address_list(cc),
            bcc: normalize_address_list(bcc),
            subject: (!subject.is_empty()).then(|| subject.to_string()),
            flags,
            attachments: Some(attachments),
        }),
    ))
}

/// Copies the submitted files into the staging directory, classifies
/// them, and makes sure a SMIL part exists and comes first.
fn prepare_attachments(
    config: &Config,
    encode_dir: &std::path::Path,
    parts: &[AttachmentInfo],
) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(parts.len() + 1);
    let mut smil_index = None;

    for info in parts {
        let basename = info
            .file
            .file_name()
            .ok_or_else(|| MmsError::args("attachment has no file name"))?;
        let staged = file_util::unique_file_path(
            encode_dir,
            &basename.to_string_lossy(),
        );
        std::fs::copy(&info.file, &staged)?;

        let staged_info = AttachmentInfo {
            file: staged,
            content_type: info.content_type.clone(),
            content_id: info.content_id.clone(),
        };
        let attachment = Attachment::new(config, &staged_info)?;
        if smil_index.is_none() && attachment.is_smil {
            smil_index = Some(attachments.len());
        }
        attachments.push(attachment);
    }

    match smil_index {
        None => {
            let path = file_util::unique_file_path(encode_dir, "smil");
            let smil = Attachment::new_smil(config, &path, &attachments)?;
            attachments.insert(0, smil);
        },
        Some(i) if i > 0 => {
            let smil = attachments.remove(i);
            attachments.insert(0, smil);
        },
        Some(_) => {},
    }

    Ok(attachments)
}

impl EncodeTask {
    fn me(body: &mut TaskBody) -> &mut EncodeTask {
        match body {
            TaskBody::Encode(e) => e,
            _ => unreachable!("encode hook on a wrong task"),
        }
    }

    pub fn run<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        let this = Self::me(body);
        let Some(attachments) = this.attachments.take() else {
            warn!("{} has no attachments left", header.name);
            header.set_state(TaskState::Done);
            return;
        };
        let Some(id) = header.id.clone() else {
            header.set_state(TaskState::Done);
            return;
        };

        let job = EncodeJob {
            msg_dir: header
                .msg_dir(&ctx.config)
                .unwrap_or_else(|| ctx.config.root_dir.clone()),
            transaction_id: id.clone(),
            to: this.to.clone(),
            cc: this.cc.clone(),
            bcc: this.bcc.clone(),
            subject: this.subject.clone(),
            flags: this.flags,
            settings: ctx
                .settings
                .sim_settings(header.imsi.as_deref().unwrap_or_default()),
            cancel: header.abort.clone(),
        };
        let seq = header.seq;
        let events = ctx.events.clone();

        let spawned = std::thread::Builder::new()
            .name(header.name.clone())
            .spawn(move || {
                let mut attachments = attachments;
                let outcome = job.run(&mut attachments);
                let _ = events.send(Event::EncodeDone { seq, outcome, attachments });
            });

        match spawned {
            Ok(_) => {
                ctx.handler
                    .message_send_state_changed(&id, SendState::Encoding, None);
                header.set_state(TaskState::Working);
            },
            Err(e) => {
                warn!("cannot start encoding thread: {e}");
                let state = if header.sleep(&ctx.events, ctx.config.retry_secs, 0) {
                    SendState::Deferred
                } else {
                    SendState::SendError
                };
                ctx.handler.message_send_state_changed(&id, state, None);
            },
        }
    }

    pub fn encode_done<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        outcome: EncodeOutcome,
        attachments: Vec<Attachment>,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if header.state != TaskState::Working {
            debug!("{} ignoring stale job completion", header.name);
            return;
        }
        let this = Self::me(body);
        this.attachments = Some(attachments);
        let Some(id) = header.id.clone() else {
            header.set_state(TaskState::Done);
            return;
        };

        match outcome {
            EncodeOutcome::Done(path) => {
                debug!("encoded {}", path.display());
                ctx.queue_task(send::new_task(&ctx.config, &id, header.imsi.as_deref()));
            },
            EncodeOutcome::TooBig => {
                ctx.handler
                    .message_send_state_changed(&id, SendState::TooBig, None);
            },
            EncodeOutcome::Error(e) => {
                warn!("encoding failed: {e}");
                ctx.handler.message_send_state_changed(
                    &id,
                    SendState::SendError,
                    Some(e.as_str()),
                );
            },
        }
        header.set_state(TaskState::Done);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker-thread job

struct EncodeJob {
    msg_dir: PathBuf,
    transaction_id: String,
    to: String,
    cc: Option<String>,
    bcc: Option<String>,
    subject: Option<String>,
    flags: u32,
    settings: SimSettings,
    cancel: CancellationToken,
}

impl EncodeJob {
    fn run(&self, attachments: &mut [Attachment]) -> EncodeOutcome {
        for attachment in attachments.iter_mut() {
            attachment.reset();
        }

        let limit = self.settings.size_limit;
        let mut size = match self.encode_once(attachments) {
            Ok(size) => size,
            Err(e) => return EncodeOutcome::Error(e.to_string()),
        };

        // Keep resizing attachments until the message fits the limit.
        while limit > 0
            && size > limit
            && !self.cancel.is_cancelled()
            && self.resize_largest(attachments)
        {
            let last_size = size;
            size = match self.encode_once(attachments) {
                Ok(size) => size,
                Err(e) => return EncodeOutcome::Error(e.to_string()),
            };
            if size == 0 || size >= last_size {
                break;
            }
        }

        if size > 0 && (limit == 0 || size <= limit) {
            EncodeOutcome::Done(self.msg_dir.join(file_util::SEND_REQ_FILE))
        } else if size > 0 {
            let _ = std::fs::remove_file(self.msg_dir.join(file_util::SEND_REQ_FILE));
            EncodeOutcome::TooBig
        } else {
            EncodeOutcome::Error("empty PDU".to_string())
        }
    }

    /// One full PDU assembly pass; returns the encoded size.
    fn encode_once(&self, attachments: &[Attachment]) -> Result<u64> {
        let smil = attachments
            .first()
            .filter(|a| a.is_smil)
            .ok_or_else(|| MmsError::encode("no SMIL presentation part"))?;

        let content_type = format!(
            "{}; start=\"<{}>\"; type=\"{}\"",
            tables::CONTENT_TYPE_MULTIPART_RELATED,
            smil.content_id,
            tables::CONTENT_TYPE_SMIL,
        );

        let mut parts = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            parts.push(Part {
                content_type: attachment.content_type.clone(),
                content_id: Some(attachment.content_id.clone()),
                content_location: Some(attachment.content_location.clone()),
                data: attachment.map_contents()?,
                offset: 0,
            });
        }

        let pdu = MmsPdu {
            transaction_id: Some(self.transaction_id.clone()),
            version: MMS_VERSION,
            body: PduBody::SendReq(SendReq {
                to: Some(self.to.clone()),
                cc: self.cc.clone(),
                bcc: self.bcc.clone(),
                subject: self.subject.clone(),
                date: 0,
                dr: self.flags & SEND_FLAG_REQUEST_DELIVERY_REPORT != 0,
                rr: self.flags & SEND_FLAG_REQUEST_READ_REPORT != 0,
                content_type: Some(content_type),
                parts,
            }),
        };

        std::fs::create_dir_all(&self.msg_dir)?;
        let path = self.msg_dir.join(file_util::SEND_REQ_FILE);
        let file = std::fs::File::create(&path)?;
        let size = encode_message(&pdu, file)?;
        debug!("created {} ({size} bytes)", path.display());
        Ok(size)
    }

    /// Steps the largest resizable attachment down one notch.
    fn resize_largest(&self, attachments: &mut [Attachment]) -> bool {
        debug!("message is too big, need to resize");
        let mut largest: Option<(usize, u64)> = None;
        for (i, attachment) in attachments.iter().enumerate() {
            if !attachment.is_resizable() {
                continue;
            }
            match attachment.file_size() {
                Ok(size) if largest.is_none_or(|(_, max)| size > max) => {
                    largest = Some((i, size));
                },
                Ok(_) => {},
                Err(e) => warn!("cannot stat attachment: {e}"),
            }
        }
        match largest {
            Some((i, _)) => {
                debug!("resizing {}", attachments[i].original_file.display());
                attachments[i].resize(self.settings.max_pixels).unwrap_or(false)
            },
            None => {
                debug!("there is nothing to resize");
                false
            },
        }
    }
}
