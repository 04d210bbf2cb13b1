// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Send task: HTTP POST of the encoded m-send.req, then parses the
//! M-Send.conf answer and reports the MMSC-assigned message id.

use std::path::PathBuf;

use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    cfg::config::{Config, SettingsProvider},
    codec::{
        decode::decode_message,
        pdu::{PduBody, ResponseStatus},
    },
    file_util,
    handler::{MmsHandler, SendState},
    tasks::{
        http::{HttpKind, HttpTask},
        task::{Task, TaskBody, TaskContext, TaskHeader},
    },
};

pub fn new_task(config: &Config, id: &str, imsi: Option<&str>) -> Task {
    let send_path =
        file_util::message_dir(config, id).join(file_util::SEND_REQ_FILE);
    Task::new(
        "Send",
        Some(id.to_string()),
        imsi.map(str::to_string),
        TaskBody::Http(HttpTask::new(
            HttpKind::Send,
            None,
            Some(file_util::SEND_CONF_FILE),
            Some(send_path),
        )),
    )
}

pub fn started<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    ctx: &mut TaskContext<'_, H, S>,
) {
    if let Some(id) = &header.id {
        ctx.handler
            .message_send_state_changed(id, SendState::Sending, None);
    }
}

pub fn paused<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    ctx: &mut TaskContext<'_, H, S>,
) {
    if let Some(id) = &header.id {
        ctx.handler
            .message_send_state_changed(id, SendState::Deferred, None);
    }
}

/// Extracts the Message-Id from a successful M-Send.conf.
fn parse_send_conf(path: &PathBuf) -> Option<String> {
    let data = match std::fs::read(path) {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            return None;
        },
    };
    match decode_message(&data) {
        Ok(pdu) => match &pdu.body {
            PduBody::SendConf(sc) => {
                if sc.rsp_status == ResponseStatus::Ok {
                    match sc.msgid.as_deref() {
                        Some(msgid) if !msgid.is_empty() => {
                            return Some(msgid.to_string());
                        },
                        _ => warn!("missing Message-ID"),
                    }
                } else {
                    warn!("MMSC responded with {:?}", sc.rsp_status);
                }
                None
            },
            _ => {
                warn!("unexpected response from MMSC");
                None
            },
        },
        Err(e) => {
            warn!("cannot parse M-Send.conf: {e}");
            None
        },
    }
}

pub fn done<H: MmsHandler, S: SettingsProvider>(
    header: &TaskHeader,
    receive_path: Option<PathBuf>,
    success: bool,
    ctx: &mut TaskContext<'_, H, S>,
) {
    let Some(id) = &header.id else {
        return;
    };
    let msgid = if success {
        receive_path.as_ref().and_then(parse_send_conf)
    } else {
        None
    };
    match msgid {
        Some(msgid) => {
            info!("message ID {msgid}");
            ctx.handler.message_sent(id, &msgid);
        },
        None => {
            ctx.handler
                .message_send_state_changed(id, SendState::SendError, None);
        },
    }
}
