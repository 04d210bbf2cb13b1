// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Publish task: delivers the decoded message record to the handler,
//! retrying within the deadline when the store is not ready for it.

use tracing::debug;

use crate::{
    cfg::config::SettingsProvider,
    handler::MmsHandler,
    message::MmsMessage,
    tasks::task::{Event, Task, TaskBody, TaskContext, TaskHeader, TaskState},
};

#[derive(Debug)]
pub struct PublishTask {
    pub msg: MmsMessage,
}

pub fn new_task(msg: MmsMessage) -> Task {
    let id = msg.id.clone();
    Task::new(
        "Publish",
        Some(id),
        None,
        TaskBody::Publish(PublishTask { msg }),
    )
}

impl PublishTask {
    fn me(body: &mut TaskBody) -> &mut PublishTask {
        match body {
            TaskBody::Publish(p) => p,
            _ => unreachable!("publish hook on a wrong task"),
        }
    }

    pub fn run<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        let this = Self::me(body);
        let msg = this.msg.clone();
        let handler = ctx.handler.clone();
        let events = ctx.events.clone();
        let seq = header.seq;
        let abort = header.abort.clone();

        header.set_state(TaskState::Working);
        tokio::spawn(async move {
            let ok = tokio::select! {
                _ = abort.cancelled() => return,
                ok = handler.message_received(&msg) => ok,
            };
            let _ = events.send(Event::PublishDone { seq, ok });
        });
    }

    pub fn publish_done<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        ok: bool,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if header.state != TaskState::Working {
            debug!("{} ignoring stale publish completion", header.name);
            return;
        }
        if ok {
            header.set_state(TaskState::Done);
        } else {
            // The handler was not ready; try again later.
            header.sleep(&ctx.events, ctx.config.retry_secs, 0);
        }
    }

    /// Cleans up the extracted part files once the record is published
    /// (or abandoned).
    pub fn cleanup(&self) {
        if !self.msg.keep_files {
            let _ = std::fs::remove_dir_all(&self.msg.parts_dir);
            let _ = std::fs::remove_dir(&self.msg.msg_dir);
        }
    }
}
