// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Task base: lifetime, state transitions, deadline/retry timers.
//!
//! A task suspends only by returning from one of its operations in a
//! non-Ready state; anything blocking goes through a spawned activity
//! that posts an [`Event`] back into the dispatcher loop.

use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    attachment::Attachment,
    cfg::config::{Config, SettingsProvider},
    connection::Connection,
    handler::MmsHandler,
    tasks::{
        decode::DecodeTask,
        encode::{EncodeOutcome, EncodeTask},
        http::{HttpTask, TransferOutcome},
        notification::NotificationTask,
        publish::PublishTask,
    },
};

/// Default task lifetime, seconds from creation to abandonment.
pub const TASK_DEFAULT_LIFETIME_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Ready to run.
    Ready,
    /// Any bearer for this IMSI will do.
    NeedConnection,
    /// Connection explicitly requested by the user.
    NeedUserConnection,
    /// Sending or receiving data over the bearer.
    Transmitting,
    /// Active off the loop, no network involved.
    Working,
    /// Waiting for a wake-up timer.
    Sleep,
    /// Nothing left to do.
    Done,
}

impl TaskState {
    pub fn name(self) -> &'static str {
        match self {
            TaskState::Ready => "READY",
            TaskState::NeedConnection => "NEED_CONNECTION",
            TaskState::NeedUserConnection => "NEED_USER_CONNECTION",
            TaskState::Transmitting => "TRANSMITTING",
            TaskState::Working => "WORKING",
            TaskState::Sleep => "SLEEP",
            TaskState::Done => "DONE",
        }
    }

    pub fn needs_connection(self) -> bool {
        matches!(self, TaskState::NeedConnection | TaskState::NeedUserConnection)
    }
}

/// Loop events posted by spawned activities (timers, HTTP transfers,
/// worker threads, handler round trips).
#[derive(Debug)]
pub enum Event {
    Wakeup { seq: u64, generation: u64 },
    TransferDone { seq: u64, outcome: TransferOutcome },
    /// Handler's verdict on a new notification: db id, empty string to
    /// defer, `None` to reject.
    NotifyDecision { seq: u64, id: Option<String> },
    PublishDone { seq: u64, ok: bool },
    EncodeDone { seq: u64, outcome: EncodeOutcome, attachments: Vec<Attachment> },
    ConnectionChanged,
    IdleTimeout { generation: u64 },
}

/// Shared task header.
#[derive(Debug)]
pub struct TaskHeader {
    /// Queue sequence number, assigned by the dispatcher; stable for
    /// event routing.
    pub seq: u64,
    /// Task name for logs, e.g. `Retrieve[0000001c]`.
    pub name: String,
    /// Database record id.
    pub id: Option<String>,
    /// Associated subscriber identity.
    pub imsi: Option<String>,
    pub state: TaskState,
    pub deadline: Instant,
    pub last_run_time: Option<Instant>,
    /// Only meaningful in Sleep.
    pub wakeup_time: Option<Instant>,
    pub cancelled: bool,
    /// Bumped on every timer arm/cancel so stale wakeups are dropped.
    pub generation: u64,
    /// Aborts any spawned activity of this task.
    pub abort: CancellationToken,
}

impl TaskHeader {
    pub fn new(
        kind: &str,
        id: Option<String>,
        imsi: Option<String>,
        lifetime: Duration,
    ) -> Self {
        let name = match &id {
            Some(id) => {
                let short: String = id.chars().take(8).collect();
                format!("{kind}[{short}]")
            },
            None => kind.to_string(),
        };
        Self {
            seq: 0,
            name,
            id,
            imsi,
            state: TaskState::Ready,
            deadline: Instant::now() + lifetime,
            last_run_time: None,
            wakeup_time: None,
            cancelled: false,
            generation: 0,
            abort: CancellationToken::new(),
        }
    }

    pub fn set_state(&mut self, state: TaskState) {
        if self.state != state {
            debug!("{} {} -> {}", self.name, self.state.name(), state.name());
            self.state = state;
        }
    }

    /// Arms a retry timer; `secs == 0` means the configured retry
    /// interval. The wake-up is clamped to the deadline: when no time is
    /// left the task goes straight to Done and `false` is returned.
    pub fn sleep(
        &mut self,
        events: &mpsc::UnboundedSender<Event>,
        retry_secs: u64,
        secs: u64,
    ) -> bool {
        let secs = if secs == 0 { retry_secs } else { secs };
        let now = Instant::now();
        if now >= self.deadline {
            debug!("{} SLEEP -> DONE (no time left)", self.name);
            self.set_state(TaskState::Done);
            return false;
        }
        let wake = (now + Duration::from_secs(secs)).min(self.deadline);
        self.generation += 1;
        self.wakeup_time = Some(wake);

        let seq = self.seq;
        let generation = self.generation;
        let events = events.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(wake).await;
            let _ = events.send(Event::Wakeup { seq, generation });
        });

        debug!("{} sleeping for {} sec", self.name, secs);
        self.set_state(TaskState::Sleep);
        true
    }

    pub fn msg_dir(&self, config: &Config) -> Option<PathBuf> {
        self.id
            .as_ref()
            .map(|id| crate::file_util::message_dir(config, id))
    }
}

/// Kind-specific task payload; behavior varies through `match`, the
/// header stays shared.
#[derive(Debug)]
pub enum TaskBody {
    Notification(NotificationTask),
    Decode(DecodeTask),
    Encode(EncodeTask),
    Publish(PublishTask),
    Http(HttpTask),
}

/// Everything a task operation may touch besides its own fields. New
/// tasks spawned by the running task are collected in `new_tasks` and
/// queued by the dispatcher afterwards.
pub struct TaskContext<'a, H: MmsHandler, S: SettingsProvider> {
    pub config: Arc<Config>,
    pub handler: Arc<H>,
    pub settings: Arc<S>,
    pub events: mpsc::UnboundedSender<Event>,
    pub new_tasks: &'a mut Vec<Task>,
}

impl<H: MmsHandler, S: SettingsProvider> TaskContext<'_, H, S> {
    pub fn queue_task(&mut self, task: Task) {
        self.new_tasks.push(task);
    }
}

#[derive(Debug)]
pub struct Task {
    pub header: TaskHeader,
    pub body: TaskBody,
}

impl Task {
    pub fn new(
        kind: &str,
        id: Option<String>,
        imsi: Option<String>,
        body: TaskBody,
    ) -> Self {
        Self {
            header: TaskHeader::new(
                kind,
                id,
                imsi,
                Duration::from_secs(TASK_DEFAULT_LIFETIME_SECS),
            ),
            body,
        }
    }

    /// Invoked in Ready; must leave the task in another state.
    pub async fn run<H: MmsHandler, S: SettingsProvider>(
        &mut self,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        debug_assert_eq!(self.header.state, TaskState::Ready);
        match &mut self.body {
            TaskBody::Notification(_) => {
                NotificationTask::run(&mut self.header, &mut self.body, ctx).await
            },
            TaskBody::Decode(_) => {
                DecodeTask::run(&mut self.header, &mut self.body, ctx).await
            },
            TaskBody::Encode(_) => {
                EncodeTask::run(&mut self.header, &mut self.body, ctx)
            },
            TaskBody::Publish(_) => {
                PublishTask::run(&mut self.header, &mut self.body, ctx)
            },
            TaskBody::Http(_) => HttpTask::run(&mut self.header, &mut self.body),
        }
        self.header.last_run_time = Some(Instant::now());
        debug_assert_ne!(self.header.state, TaskState::Ready);
    }

    /// Invoked in NeedConnection/NeedUserConnection once the bearer is
    /// open; launches the transfer and moves to Transmitting.
    pub async fn transmit<H: MmsHandler, S: SettingsProvider>(
        &mut self,
        connection: &Connection,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        debug_assert!(self.header.state.needs_connection());
        if let TaskBody::Http(_) = &self.body {
            HttpTask::transmit(&mut self.header, &mut self.body, connection, ctx)
                .await;
        }
        self.header.last_run_time = Some(Instant::now());
        debug_assert!(!self.header.state.needs_connection());
    }

    /// The bearer went away (or never came up) while the task still
    /// needed it.
    pub fn network_unavailable<H: MmsHandler, S: SettingsProvider>(
        &mut self,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if self.header.state == TaskState::Done {
            return;
        }
        debug_assert!(
            self.header.state.needs_connection()
                || self.header.state == TaskState::Transmitting
        );
        if let TaskBody::Http(_) = &self.body {
            HttpTask::network_unavailable(&mut self.header, &mut self.body, ctx);
        }
        self.header.last_run_time = Some(Instant::now());
    }

    /// Safe in any state; idempotent. Releases pending timers and
    /// activities, then terminates the task.
    pub fn cancel<H: MmsHandler, S: SettingsProvider>(
        &mut self,
        _ctx: &mut TaskContext<'_, H, S>,
    ) {
        debug!("{} cancelled", self.header.name);
        self.header.cancelled = true;
        self.header.generation += 1;
        self.header.wakeup_time = None;
        self.header.abort.cancel();
        self.header.set_state(TaskState::Done);
    }

    /// Routes a completion event posted by one of this task's spawned
    /// activities.
    pub async fn handle_event<H: MmsHandler, S: SettingsProvider>(
        &mut self,
        event: Event,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if self.header.state == TaskState::Done {
            return;
        }
        match event {
            Event::Wakeup { generation, .. } => {
                if self.header.state == TaskState::Sleep
                    && generation == self.header.generation
                {
                    self.header.wakeup_time = None;
                    self.header.set_state(TaskState::Ready);
                }
            },
            Event::TransferDone { outcome, .. } => {
                if let TaskBody::Http(_) = &self.body {
                    HttpTask::transfer_done(
                        &mut self.header,
                        &mut self.body,
                        outcome,
                        ctx,
                    )
                    .await;
                }
            },
            Event::NotifyDecision { id, .. } => {
                if let TaskBody::Notification(_) = &self.body {
                    NotificationTask::notify_decision(
                        &mut self.header,
                        &mut self.body,
                        id,
                        ctx,
                    );
                }
            },
            Event::PublishDone { ok, .. } => {
                if let TaskBody::Publish(_) = &self.body {
                    PublishTask::publish_done(&mut self.header, ok, ctx);
                }
            },
            Event::EncodeDone { outcome, attachments, .. } => {
                if let TaskBody::Encode(_) = &self.body {
                    EncodeTask::encode_done(
                        &mut self.header,
                        &mut self.body,
                        outcome,
                        attachments,
                        ctx,
                    );
                }
            },
            Event::ConnectionChanged | Event::IdleTimeout { .. } => {},
        }
    }
}
