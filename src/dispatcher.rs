// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Task dispatcher: owns the task queue and at most one bearer
//! connection, runs the cooperative scheduling loop, and exposes the
//! engine's RPC surface.
//!
//! The loop is an actor: external calls and spawned-activity
//! completions arrive over channels and are processed one at a time, so
//! every task transition happens on the loop. After each message the
//! queue is run to fixpoint: at most one task transmits at any instant,
//! tasks waiting for the bearer are served FIFO per IMSI, and the
//! connection is torn down after `idle_secs` of inactivity.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    attachment::AttachmentInfo,
    cfg::config::{Config, SettingsProvider},
    codec::{media_type::MediaType, tables},
    connection::{ConnMan, Connection},
    error::{MmsError, Result},
    handler::{MmsHandler, ReadStatus},
    tasks::{
        encode, notification, read_report, retrieve,
        task::{Event, Task, TaskBody, TaskContext, TaskState},
    },
};

enum Command {
    HandlePush {
        imsi: String,
        content_type: Option<String>,
        data: Bytes,
        reply: oneshot::Sender<Result<()>>,
    },
    ReceiveMessage {
        id: String,
        imsi: String,
        automatic: bool,
        data: Bytes,
        reply: oneshot::Sender<Result<()>>,
    },
    SendMessage {
        id: String,
        imsi: String,
        to: String,
        cc: String,
        bcc: String,
        subject: String,
        flags: u32,
        parts: Vec<AttachmentInfo>,
        reply: oneshot::Sender<Result<String>>,
    },
    SendReadReport {
        id: String,
        imsi: String,
        message_id: String,
        to: String,
        status: ReadStatus,
        reply: oneshot::Sender<Result<()>>,
    },
    Cancel {
        id: Option<String>,
    },
}

/// Handle to a running dispatcher. Cloneable; dropping the last handle
/// shuts the engine down.
#[derive(Clone)]
pub struct Dispatcher {
    commands: mpsc::UnboundedSender<Command>,
    idle: watch::Receiver<bool>,
}

impl Dispatcher {
    /// Creates the engine and starts its loop. The root directory is
    /// created up front; failure to do so is a fatal start error.
    pub fn start<C, H, S>(
        config: Config,
        connman: C,
        handler: H,
        settings: S,
    ) -> Result<Self>
    where
        C: ConnMan,
        H: MmsHandler,
        S: SettingsProvider + Send + Sync + 'static,
    {
        crate::file_util::create_root_dir(&config)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (idle_tx, idle_rx) = watch::channel(true);

        let engine = Engine {
            config: Arc::new(config),
            connman: Arc::new(connman),
            handler: Arc::new(handler),
            settings: Arc::new(settings),
            tasks: Vec::new(),
            next_seq: 1,
            connection: None,
            conn_watch_abort: None,
            idle_generation: 0,
            idle_armed: false,
            events: event_tx,
            idle_signal: idle_tx,
        };
        tokio::spawn(engine.run(cmd_rx, event_rx));

        Ok(Self { commands: cmd_tx, idle: idle_rx })
    }

    /// Generic WAP push ingress; the content type must be the MMS
    /// message type.
    pub async fn handle_push(
        &self,
        imsi: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<()> {
        self.call(|reply| Command::HandlePush {
            imsi: imsi.to_string(),
            content_type: Some(content_type.to_string()),
            data,
            reply,
        })
        .await
    }

    /// Simplified push ingress.
    pub async fn push_notify(&self, imsi: &str, data: Bytes) -> Result<()> {
        self.call(|reply| Command::HandlePush {
            imsi: imsi.to_string(),
            content_type: None,
            data,
            reply,
        })
        .await
    }

    /// Starts a deferred fetch from a stored push PDU.
    pub async fn receive_message(
        &self,
        id: &str,
        imsi: &str,
        automatic: bool,
        data: Bytes,
    ) -> Result<()> {
        self.call(|reply| Command::ReceiveMessage {
            id: id.to_string(),
            imsi: imsi.to_string(),
            automatic,
            data,
            reply,
        })
        .await
    }

    /// Submits an outbound message; returns the IMSI it was assigned to.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_message(
        &self,
        id: &str,
        imsi: &str,
        to: &str,
        cc: &str,
        bcc: &str,
        subject: &str,
        flags: u32,
        parts: Vec<AttachmentInfo>,
    ) -> Result<String> {
        self.call(|reply| Command::SendMessage {
            id: id.to_string(),
            imsi: imsi.to_string(),
            to: to.to_string(),
            cc: cc.to_string(),
            bcc: bcc.to_string(),
            subject: subject.to_string(),
            flags,
            parts,
            reply,
        })
        .await
    }

    pub async fn send_read_report(
        &self,
        id: &str,
        imsi: &str,
        message_id: &str,
        to: &str,
        status: ReadStatus,
    ) -> Result<()> {
        self.call(|reply| Command::SendReadReport {
            id: id.to_string(),
            imsi: imsi.to_string(),
            message_id: message_id.to_string(),
            to: to.to_string(),
            status,
            reply,
        })
        .await
    }

    /// Cancels all activity for the given message id (or everything).
    pub fn cancel(&self, id: Option<&str>) {
        let _ = self
            .commands
            .send(Command::Cancel { id: id.map(str::to_string) });
    }

    /// Resolves once the queue is empty and no connection is open.
    pub async fn wait_done(&self) {
        let mut idle = self.idle.clone();
        loop {
            if *idle.borrow_and_update() {
                return;
            }
            if idle.changed().await.is_err() {
                return;
            }
        }
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .map_err(|_| MmsError::args("dispatcher is gone"))?;
        reply_rx
            .await
            .map_err(|_| MmsError::args("dispatcher dropped the request"))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine loop

struct Engine<C, H, S> {
    config: Arc<Config>,
    connman: Arc<C>,
    handler: Arc<H>,
    settings: Arc<S>,
    tasks: Vec<Task>,
    next_seq: u64,
    connection: Option<Connection>,
    conn_watch_abort: Option<CancellationToken>,
    idle_generation: u64,
    idle_armed: bool,
    events: mpsc::UnboundedSender<Event>,
    idle_signal: watch::Sender<bool>,
}

impl<C, H, S> Engine<C, H, S>
where
    C: ConnMan,
    H: MmsHandler,
    S: SettingsProvider + Send + Sync + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(event) = events.recv() => self.handle_event(event).await,
            }
            self.run_queue().await;
            self.check_network_idle();
            self.update_idle_signal();
        }
        self.shutdown();
    }

    fn shutdown(&mut self) {
        debug!("dispatcher shutting down");
        let mut new_tasks = Vec::new();
        let mut tasks = std::mem::take(&mut self.tasks);
        for task in &mut tasks {
            let mut ctx = Self::context(
                &self.config,
                &self.handler,
                &self.settings,
                &self.events,
                &mut new_tasks,
            );
            task.cancel(&mut ctx);
        }
        for task in tasks {
            self.finalize_task(task);
        }
        self.close_connection();
        let _ = std::fs::remove_dir(
            self.config.root_dir.join(crate::file_util::MESSAGE_DIR),
        );
    }

    fn context<'a>(
        config: &Arc<Config>,
        handler: &Arc<H>,
        settings: &Arc<S>,
        events: &mpsc::UnboundedSender<Event>,
        new_tasks: &'a mut Vec<Task>,
    ) -> TaskContext<'a, H, S> {
        TaskContext {
            config: config.clone(),
            handler: handler.clone(),
            settings: settings.clone(),
            events: events.clone(),
            new_tasks,
        }
    }

    fn queue_task(&mut self, mut task: Task) {
        task.header.seq = self.next_seq;
        self.next_seq += 1;
        debug!("queued {}", task.header.name);
        self.tasks.push(task);
        let _ = self.idle_signal.send_replace(false);
    }

    // ── Commands ──────────────────────────────────────────────────────

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::HandlePush { imsi, content_type, data, reply } => {
                let _ = reply.send(self.handle_push(&imsi, content_type, data));
            },
            Command::ReceiveMessage { id, imsi, automatic, data, reply } => {
                let _ =
                    reply.send(self.receive_message(&id, &imsi, automatic, data));
            },
            Command::SendMessage {
                id,
                imsi,
                to,
                cc,
                bcc,
                subject,
                flags,
                parts,
                reply,
            } => {
                let _ = reply.send(self.send_message(
                    &id, &imsi, &to, &cc, &bcc, &subject, flags, &parts,
                ));
            },
            Command::SendReadReport { id, imsi, message_id, to, status, reply } => {
                let _ = reply.send(
                    read_report::new_task(
                        &self.config,
                        &id,
                        Some(imsi.as_str()),
                        &message_id,
                        &to,
                        status,
                    )
                    .map(|task| self.queue_task(task)),
                );
            },
            Command::Cancel { id } => self.cancel(id.as_deref()),
        }
    }

    fn handle_push(
        &mut self,
        imsi: &str,
        content_type: Option<String>,
        data: Bytes,
    ) -> Result<()> {
        if let Some(ct) = content_type {
            let mime = MediaType::parse(&ct)
                .map(|mt| mt.mime)
                .ok_or_else(|| MmsError::args(format!("bad content type {ct}")))?;
            if mime != tables::CONTENT_TYPE_MMS_MESSAGE {
                return Err(MmsError::args(format!(
                    "unsupported push content type {mime}"
                )));
            }
        }
        let task = notification::new_task(&self.config, imsi, data)?;
        self.queue_task(task);
        Ok(())
    }

    fn receive_message(
        &mut self,
        id: &str,
        imsi: &str,
        automatic: bool,
        data: Bytes,
    ) -> Result<()> {
        let pdu = crate::codec::decode::decode_message(&data)?;
        let task = retrieve::new_task(id, Some(imsi), &pdu)?;
        let task = retrieve::mark_user_initiated(task, !automatic);
        self.queue_task(task);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn send_message(
        &mut self,
        id: &str,
        imsi: &str,
        to: &str,
        cc: &str,
        bcc: &str,
        subject: &str,
        flags: u32,
        parts: &[AttachmentInfo],
    ) -> Result<String> {
        let imsi = if imsi.is_empty() {
            self.connman
                .default_imsi()
                .ok_or_else(|| MmsError::args("no SIM card available"))?
        } else {
            imsi.to_string()
        };
        let task = encode::new_task(
            &self.config,
            id,
            &imsi,
            to,
            cc,
            bcc,
            subject,
            flags,
            parts,
        )?;
        self.queue_task(task);
        Ok(imsi)
    }

    fn cancel(&mut self, id: Option<&str>) {
        let mut new_tasks = Vec::new();
        for task in &mut self.tasks {
            if id.is_none() || task.header.id.as_deref() == id {
                let mut ctx = Self::context(
                    &self.config,
                    &self.handler,
                    &self.settings,
                    &self.events,
                    &mut new_tasks,
                );
                task.cancel(&mut ctx);
            }
        }
        for task in new_tasks {
            self.queue_task(task);
        }
    }

    // ── Events ────────────────────────────────────────────────────────

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::ConnectionChanged => self.connection_state_changed(),
            Event::IdleTimeout { generation } => {
                if self.idle_armed && generation == self.idle_generation {
                    debug!("closing idle connection");
                    self.idle_armed = false;
                    self.close_connection();
                }
            },
            other => {
                let seq = match &other {
                    Event::Wakeup { seq, .. }
                    | Event::TransferDone { seq, .. }
                    | Event::NotifyDecision { seq, .. }
                    | Event::PublishDone { seq, .. }
                    | Event::EncodeDone { seq, .. } => *seq,
                    _ => return,
                };
                let Some(idx) =
                    self.tasks.iter().position(|t| t.header.seq == seq)
                else {
                    return;
                };
                let mut task = self.tasks.remove(idx);
                let mut new_tasks = Vec::new();
                {
                    let mut ctx = Self::context(
                        &self.config,
                        &self.handler,
                        &self.settings,
                        &self.events,
                        &mut new_tasks,
                    );
                    task.handle_event(other, &mut ctx).await;
                }
                for t in new_tasks {
                    self.queue_task(t);
                }
                if task.header.state == TaskState::Done {
                    self.finalize_task(task);
                } else {
                    self.tasks.insert(idx.min(self.tasks.len()), task);
                }
            },
        }
    }

    fn connection_state_changed(&mut self) {
        let Some(conn) = &self.connection else {
            return;
        };
        let state = conn.state();
        debug!("{} {}", conn.imsi, state.name());
        if state.is_terminal() {
            let imsi = conn.imsi.clone();
            self.close_connection();
            let mut new_tasks = Vec::new();
            for task in &mut self.tasks {
                let affected = (task.header.state.needs_connection()
                    || task.header.state == TaskState::Transmitting)
                    && task.header.imsi.as_deref() == Some(imsi.as_str());
                if affected {
                    let mut ctx = Self::context(
                        &self.config,
                        &self.handler,
                        &self.settings,
                        &self.events,
                        &mut new_tasks,
                    );
                    task.network_unavailable(&mut ctx);
                }
            }
            for task in new_tasks {
                self.queue_task(task);
            }
        }
    }

    // ── Scheduling ────────────────────────────────────────────────────

    async fn run_queue(&mut self) {
        loop {
            let Some(idx) = self.pick_next() else {
                break;
            };
            let mut task = self.tasks.remove(idx);
            debug!("{} {}", task.header.name, task.header.state.name());

            let mut new_tasks = Vec::new();
            {
                let mut ctx = Self::context(
                    &self.config,
                    &self.handler,
                    &self.settings,
                    &self.events,
                    &mut new_tasks,
                );
                match task.header.state {
                    TaskState::Ready => task.run(&mut ctx).await,
                    state if state.needs_connection() => {
                        let open_conn = self
                            .connection
                            .as_ref()
                            .filter(|c| c.is_open())
                            .cloned();
                        if let Some(conn) = open_conn {
                            task.transmit(&conn, &mut ctx).await;
                        }
                    },
                    _ => {},
                }
            }
            for t in new_tasks {
                self.queue_task(t);
            }

            if task.header.state == TaskState::Done {
                self.finalize_task(task);
            } else {
                self.tasks.push(task);
            }
        }
    }

    /// Picks the next task to process, mirroring the one-bearer policy:
    /// never interfere with a transmitting task, prefer tasks that can
    /// use the existing connection, open a bearer for the first task
    /// that needs one, then fall back to runnable tasks.
    fn pick_next(&mut self) -> Option<usize> {
        let mut connection_in_use = false;

        let current = self
            .connection
            .as_ref()
            .map(|c| (c.imsi.clone(), c.is_open()));
        if let Some((imsi, open)) = current {
            if self
                .tasks
                .iter()
                .any(|t| t.header.state == TaskState::Transmitting)
            {
                return None;
            }
            if let Some(i) = self.tasks.iter().position(|t| {
                t.header.state.needs_connection()
                    && t.header.imsi.as_deref() == Some(imsi.as_str())
            }) {
                if open {
                    self.network_idle_cancel();
                    return Some(i);
                }
                connection_in_use = true;
            }
        }

        if connection_in_use {
            // Connection is needed but not open yet; keep the idle
            // timer off while it establishes.
            self.network_idle_cancel();
        } else if let Some(i) = self.open_connection_for_first_waiter() {
            return Some(i);
        }

        self.tasks.iter().position(|t| {
            matches!(t.header.state, TaskState::Ready | TaskState::Done)
        })
    }

    fn open_connection_for_first_waiter(&mut self) -> Option<usize> {
        let mut i = 0;
        while i < self.tasks.len() {
            if !self.tasks[i].header.state.needs_connection() {
                i += 1;
                continue;
            }
            self.close_connection();
            let imsi = self.tasks[i]
                .header
                .imsi
                .clone()
                .unwrap_or_default();
            let user =
                self.tasks[i].header.state == TaskState::NeedUserConnection;
            match self.connman.open_connection(&imsi, user) {
                Some(conn) => {
                    self.set_connection(conn);
                    return Some(i);
                },
                None => {
                    let mut new_tasks = Vec::new();
                    {
                        let mut ctx = Self::context(
                            &self.config,
                            &self.handler,
                            &self.settings,
                            &self.events,
                            &mut new_tasks,
                        );
                        self.tasks[i].network_unavailable(&mut ctx);
                    }
                    for task in new_tasks {
                        self.queue_task(task);
                    }
                    i += 1;
                },
            }
        }
        None
    }

    fn finalize_task(&mut self, mut task: Task) {
        debug!("{} finished", task.header.name);
        match &mut task.body {
            TaskBody::Http(http) => http.cleanup(self.config.keep_temp_files),
            TaskBody::Decode(decode) => {
                decode.cleanup(self.config.keep_temp_files)
            },
            TaskBody::Publish(publish) => publish.cleanup(),
            TaskBody::Notification(_) | TaskBody::Encode(_) => {},
        }
        // Prune the working directory when nothing is left in it.
        if !self.config.keep_temp_files {
            if let Some(dir) = task.header.msg_dir(&self.config) {
                let _ = std::fs::remove_dir(dir.join(crate::file_util::ENCODE_DIR));
                let _ = std::fs::remove_dir(dir);
            }
        }
    }

    // ── Connection lifecycle ──────────────────────────────────────────

    fn set_connection(&mut self, conn: Connection) {
        debug!("opening connection for {}", conn.imsi);
        let abort = CancellationToken::new();
        let mut watched = conn.clone();
        let events = self.events.clone();
        let watcher_abort = abort.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = watcher_abort.cancelled() => break,
                    state = watched.changed() => {
                        let _ = events.send(Event::ConnectionChanged);
                        if state.is_terminal() {
                            break;
                        }
                    },
                }
            }
        });
        self.connection = Some(conn);
        self.conn_watch_abort = Some(abort);
    }

    fn close_connection(&mut self) {
        if let Some(conn) = self.connection.take() {
            debug!("closing connection for {}", conn.imsi);
            conn.close();
        }
        if let Some(abort) = self.conn_watch_abort.take() {
            abort.cancel();
        }
        self.network_idle_cancel();
    }

    fn network_idle_cancel(&mut self) {
        if self.idle_armed {
            debug!("cancel network inactivity timeout");
            self.idle_armed = false;
            self.idle_generation += 1;
        }
    }

    /// Arms the inactivity countdown when the connection exists but no
    /// task is using it.
    fn check_network_idle(&mut self) {
        if self.connection.is_none() {
            return;
        }
        let in_use = self.tasks.iter().any(|t| {
            t.header.state.needs_connection()
                || t.header.state == TaskState::Transmitting
        });
        if in_use {
            self.network_idle_cancel();
        } else if !self.idle_armed {
            debug!("network connection is inactive");
            self.idle_armed = true;
            self.idle_generation += 1;
            let generation = self.idle_generation;
            let secs = self.config.idle_secs;
            let events = self.events.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                let _ = events.send(Event::IdleTimeout { generation });
            });
        }
    }

    fn update_idle_signal(&mut self) {
        let idle = self.tasks.is_empty() && self.connection.is_none();
        let _ = self.idle_signal.send_replace(idle);
    }
}
