// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Notification task: dispatches a decoded WAP push PDU. An
//! M-Notification.ind is offered to the handler, which assigns a
//! database id (starting the download), defers it, or rejects it;
//! delivery and read-origin indications are translated and forwarded.
//! Unknown push types optionally go to the attic.

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{
    cfg::config::{Config, SettingsProvider},
    codec::pdu::{DeliveryStatus as WireDeliveryStatus, MmsPdu, PduBody},
    error::Result,
    file_util,
    handler::{DeliveryStatus, MmsHandler, ReadStatus, ReceiveState},
    tasks::{
        notifyresp, retrieve,
        task::{Event, Task, TaskBody, TaskContext, TaskHeader, TaskState},
    },
    utils::strip_address_type,
};

#[derive(Debug)]
pub struct NotificationTask {
    pub pdu: MmsPdu,
    pub push: Bytes,
}

/// Archives an unrecognized push PDU under `<root>/attic/NNN/`.
pub fn archive_unrecognized(config: &Config, push: &Bytes) {
    if config.attic_enabled {
        let dir = file_util::next_attic_dir(config);
        if let Err(e) =
            file_util::write_file(&dir, file_util::UNRECOGNIZED_PUSH_FILE, push)
        {
            warn!("failed to archive push: {e}");
        }
    }
}

/// Decodes a pushed PDU into a notification task. Undecodable pushes go
/// to the attic and fail with a Decode error.
pub fn new_task(config: &Config, imsi: &str, push: Bytes) -> Result<Task> {
    match crate::codec::decode::decode_message(&push) {
        Ok(pdu) => {
            debug!(
                "MMS version {}.{}",
                (pdu.version & 0x70) >> 4,
                pdu.version & 0x0f
            );
            if let Some(tx_id) = &pdu.transaction_id {
                debug!("MMS transaction id {tx_id}");
            }
            Ok(Task::new(
                "Notification",
                None,
                Some(imsi.to_string()),
                TaskBody::Notification(NotificationTask { pdu, push }),
            ))
        },
        Err(e) => {
            archive_unrecognized(config, &push);
            Err(e)
        },
    }
}

impl NotificationTask {
    fn me(body: &mut TaskBody) -> &mut NotificationTask {
        match body {
            TaskBody::Notification(n) => n,
            _ => unreachable!("notification hook on a wrong task"),
        }
    }

    pub async fn run<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        let this = Self::me(body);
        match &this.pdu.body {
            PduBody::NotificationInd(ni) => {
                debug!("processing M-Notification.ind from {:?}", ni.from);
                let imsi = header.imsi.clone().unwrap_or_default();
                let from =
                    strip_address_type(ni.from.as_deref().unwrap_or_default())
                        .to_string();
                let subject = ni.subject.clone().unwrap_or_default();
                let expiry = ni.expiry;
                let push = this.push.clone();
                let handler = ctx.handler.clone();
                let events = ctx.events.clone();
                let seq = header.seq;
                let abort = header.abort.clone();

                header.set_state(TaskState::Working);
                tokio::spawn(async move {
                    let id = tokio::select! {
                        _ = abort.cancelled() => return,
                        id = handler.message_notify(
                            &imsi, &from, &subject, expiry, push) => id,
                    };
                    let _ = events.send(Event::NotifyDecision { seq, id });
                });
            },
            PduBody::DeliveryInd(di) => {
                let to = strip_address_type(di.to.as_deref().unwrap_or_default());
                let msgid = di.msgid.as_deref().unwrap_or_default();
                debug!("processing M-Delivery.ind for {msgid} -> {to}");
                let status = match di.dr_status {
                    WireDeliveryStatus::Expired => DeliveryStatus::Expired,
                    WireDeliveryStatus::Retrieved => DeliveryStatus::Retrieved,
                    WireDeliveryStatus::Rejected => DeliveryStatus::Rejected,
                    WireDeliveryStatus::Deferred => DeliveryStatus::Deferred,
                    WireDeliveryStatus::Unrecognised => DeliveryStatus::Unrecognised,
                    WireDeliveryStatus::Forwarded => DeliveryStatus::Forwarded,
                    WireDeliveryStatus::Unreachable => DeliveryStatus::Unreachable,
                    WireDeliveryStatus::Indeterminate => DeliveryStatus::Unknown,
                };
                ctx.handler.delivery_report(
                    header.imsi.as_deref().unwrap_or_default(),
                    msgid,
                    to,
                    status,
                );
                this.write_push_file(header, &ctx.config, file_util::DELIVERY_IND_FILE);
                header.set_state(TaskState::Done);
            },
            PduBody::ReadOrigInd(ri) => {
                let to = strip_address_type(ri.to.as_deref().unwrap_or_default());
                let msgid = ri.msgid.as_deref().unwrap_or_default();
                debug!("processing M-Read-Orig.ind for {msgid} -> {to}");
                let status = match ri.rr_status {
                    crate::codec::pdu::ReadStatus::Read => ReadStatus::Read,
                    crate::codec::pdu::ReadStatus::Deleted => ReadStatus::Deleted,
                };
                ctx.handler.read_report(
                    header.imsi.as_deref().unwrap_or_default(),
                    msgid,
                    to,
                    status,
                );
                this.write_push_file(header, &ctx.config, file_util::READ_ORIG_IND_FILE);
                header.set_state(TaskState::Done);
            },
            other => {
                info!(
                    "ignoring MMS push PDU of type {:?}",
                    other.message_type()
                );
                archive_unrecognized(&ctx.config, &this.push);
                header.set_state(TaskState::Done);
            },
        }
    }

    /// Handler verdict arrived for an M-Notification.ind.
    pub fn notify_decision<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        id: Option<String>,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if header.state != TaskState::Working {
            debug!("{} ignoring stale notify decision", header.name);
            return;
        }
        let this = Self::me(body);
        match id {
            Some(id) if !id.is_empty() => {
                debug!("database id {id}");
                header.id = Some(id.clone());
                match retrieve::new_task(&id, header.imsi.as_deref(), &this.pdu) {
                    Ok(task) => ctx.queue_task(task),
                    Err(e) => {
                        warn!("cannot schedule download: {e}");
                        ctx.handler.message_receive_state_changed(
                            &id,
                            ReceiveState::DownloadError,
                        );
                    },
                }
                this.write_push_file(
                    header,
                    &ctx.config,
                    file_util::NOTIFICATION_IND_FILE,
                );
                header.set_state(TaskState::Done);
            },
            Some(_) => {
                // Empty id: the user postponed the download.
                debug!("{} download deferred", header.name);
                header.set_state(TaskState::Done);
            },
            None => {
                if !header.sleep(&ctx.events, ctx.config.retry_secs, 0) {
                    // Out of time; let the MMSC know we are not taking it.
                    if let Some(tx_id) = this.pdu.transaction_id.clone() {
                        let id = header.id.clone().unwrap_or_else(generate_reject_id);
                        match notifyresp::new_task(
                            &ctx.config,
                            &id,
                            header.imsi.as_deref(),
                            &tx_id,
                            crate::codec::pdu::NotifyStatus::Rejected,
                        ) {
                            Ok(task) => ctx.queue_task(task),
                            Err(e) => warn!("cannot send reject response: {e}"),
                        }
                    }
                }
            },
        }
    }

    fn write_push_file(&self, header: &TaskHeader, config: &Config, file: &str) {
        if config.keep_temp_files {
            if let Some(dir) = header.msg_dir(config) {
                if let Err(e) = file_util::write_file(&dir, file, &self.push) {
                    warn!("failed to keep {file}: {e}");
                }
            }
        }
    }
}

/// Working id for a reject response when the handler never assigned one.
fn generate_reject_id() -> String {
    use rand::RngExt;
    let n: u32 = rand::rng().random();
    format!("reject-{n:08x}")
}
