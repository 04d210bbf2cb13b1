// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Retrieve task: HTTP GET of the message content from the location
//! named in the notification. Progress is mirrored into the handler's
//! receive-state stream; a successful download hands off to a decode
//! task.

use tokio::time::Instant;
use tracing::warn;

use crate::{
    cfg::config::SettingsProvider,
    codec::pdu::{MmsPdu, PduBody},
    error::{MmsError, Result},
    file_util,
    handler::{MmsHandler, ReceiveState},
    tasks::{
        decode,
        http::{HttpKind, HttpTask},
        task::{Task, TaskBody, TaskContext, TaskHeader},
    },
};

/// Builds the download task from a decoded M-Notification.ind. Fails
/// with `Expired` when the notification is already past its expiry.
pub fn new_task(id: &str, imsi: Option<&str>, pdu: &MmsPdu) -> Result<Task> {
    let PduBody::NotificationInd(ni) = &pdu.body else {
        return Err(MmsError::args("not an M-Notification.ind"));
    };
    let transaction_id = pdu
        .transaction_id
        .clone()
        .ok_or_else(|| MmsError::args("notification has no transaction id"))?;
    let location = ni
        .location
        .clone()
        .ok_or_else(|| MmsError::args("notification has no content location"))?;

    let now = crate::tasks::decode::now_secs();
    if ni.expiry <= now {
        return Err(MmsError::Expired);
    }

    let mut task = Task::new(
        "Retrieve",
        Some(id.to_string()),
        imsi.map(str::to_string),
        TaskBody::Http(HttpTask::new(
            HttpKind::Retrieve { transaction_id },
            Some(location),
            Some(file_util::RETRIEVE_CONF_FILE),
            None,
        )),
    );

    // Never keep trying past the notification expiry.
    let expiry_deadline =
        Instant::now() + std::time::Duration::from_secs(ni.expiry - now);
    if task.header.deadline > expiry_deadline {
        task.header.deadline = expiry_deadline;
    }
    Ok(task)
}

/// Flags a download as user-requested, which only affects connection
/// policy.
pub fn mark_user_initiated(mut task: Task, user: bool) -> Task {
    if let TaskBody::Http(http) = &mut task.body {
        http.user_initiated = user;
    }
    task
}

pub fn started<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    ctx: &mut TaskContext<'_, H, S>,
) {
    if let Some(id) = &header.id {
        ctx.handler
            .message_receive_state_changed(id, ReceiveState::Receiving);
    }
}

pub fn paused<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    ctx: &mut TaskContext<'_, H, S>,
) {
    if let Some(id) = &header.id {
        ctx.handler
            .message_receive_state_changed(id, ReceiveState::Deferred);
    }
}

pub fn done<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    transaction_id: &str,
    receive_path: Option<std::path::PathBuf>,
    success: bool,
    ctx: &mut TaskContext<'_, H, S>,
) {
    let Some(id) = header.id.clone() else {
        return;
    };
    let mut state = ReceiveState::DownloadError;

    if success {
        if let Some(path) = receive_path {
            match decode::new_task(&id, header.imsi.as_deref(), transaction_id, &path)
            {
                Ok(task) => {
                    ctx.queue_task(task);
                    state = ReceiveState::Decoding;
                },
                Err(e) => warn!("cannot decode {}: {e}", path.display()),
            }
        }
    }

    ctx.handler.message_receive_state_changed(&id, state);
}
