// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared HTTP task base for Retrieve, Send, Ack, NotifyResp and
//! ReadReport. Holds an optional upload source and download destination;
//! `transmit` spins up a one-shot client bound to the bearer interface,
//! POSTs when there is something to upload and GETs otherwise, streaming
//! both directions in small chunks. 2xx finishes the task, transport
//! errors retry within the deadline, other statuses are terminal.

use std::{net::IpAddr, path::PathBuf};

use tokio::{io::AsyncWriteExt, sync::mpsc};
use tokio_util::{io::ReaderStream, sync::CancellationToken};
use tracing::{debug, warn};

use crate::{
    cfg::config::{SettingsProvider, SimSettings},
    codec::tables,
    connection::Connection,
    handler::MmsHandler,
    tasks::{
        notifyresp, read_report, retrieve, send,
        task::{Event, TaskBody, TaskContext, TaskHeader, TaskState},
    },
};

/// Upload chunk size.
const HTTP_MAX_CHUNK: usize = 4046;

/// Per-kind hook data selected by the task kind.
#[derive(Debug)]
pub enum HttpKind {
    Retrieve { transaction_id: String },
    Send,
    Ack,
    NotifyResp,
    ReadReport,
}

#[derive(Debug)]
pub struct HttpTask {
    pub kind: HttpKind,
    /// Request URI; `None` uses the bearer's MMSC URL.
    pub uri: Option<String>,
    /// File whose contents are POSTed, when present.
    pub send_path: Option<PathBuf>,
    /// Name of the file the response body is written to.
    pub receive_file: Option<&'static str>,
    /// Full path of the receive file, once created.
    pub receive_path: Option<PathBuf>,
    /// Distinguishes user-requested downloads for connection policy.
    pub user_initiated: bool,
    /// Replaced on every transmit so stale completions are dropped.
    transfer_abort: Option<CancellationToken>,
}

/// Result of one HTTP transfer attempt.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Response received; 2xx is success, the rest is a permanent
    /// semantic failure.
    Status(u16),
    /// Network-level failure, worth retrying before the deadline.
    TransportError(String),
}

/// How the HTTP transaction ended, as seen by the terminal hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpDone {
    Success,
    /// The server answered with a non-2xx status.
    HttpError,
    /// The transport kept failing until the deadline.
    TransportError,
}

impl HttpTask {
    pub fn new(
        kind: HttpKind,
        uri: Option<String>,
        receive_file: Option<&'static str>,
        send_path: Option<PathBuf>,
    ) -> Self {
        Self {
            kind,
            uri,
            send_path,
            receive_file,
            receive_path: None,
            user_initiated: false,
            transfer_abort: None,
        }
    }

    fn me(body: &mut TaskBody) -> &mut HttpTask {
        match body {
            TaskBody::Http(http) => http,
            _ => unreachable!("http hook on a non-http task"),
        }
    }

    pub fn run(header: &mut TaskHeader, body: &mut TaskBody) {
        let state = if Self::me(body).user_initiated {
            TaskState::NeedUserConnection
        } else {
            TaskState::NeedConnection
        };
        header.set_state(state);
    }

    pub async fn transmit<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        connection: &Connection,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if header.state == TaskState::Transmitting {
            return;
        }
        let (receive_file, old_receive, send_missing) = {
            let http = Self::me(body);
            http.finish_transfer();
            (
                http.receive_file,
                http.receive_path.take(),
                http.send_path.as_ref().is_some_and(|p| !p.is_file()),
            )
        };

        let sim: SimSettings = ctx
            .settings
            .sim_settings(header.imsi.as_deref().unwrap_or_default());

        // Re-create the receive file on every attempt.
        if let Some(old) = old_receive {
            let _ = std::fs::remove_file(old);
        }
        let mut receive_path = None;
        if let Some(receive_file) = receive_file {
            let Some(dir) = header.msg_dir(&ctx.config) else {
                warn!("{} has no message directory", header.name);
                Self::finish_failed(header, body, ctx);
                return;
            };
            if let Err(e) = std::fs::create_dir_all(&dir) {
                warn!("failed to create {}: {e}", dir.display());
                Self::finish_failed(header, body, ctx);
                return;
            }
            receive_path = Some(dir.join(receive_file));
        }

        if send_missing {
            warn!("{} upload file is missing", header.name);
            Self::finish_failed(header, body, ctx);
            return;
        }

        let abort = CancellationToken::new();
        let params = {
            let http = Self::me(body);
            http.receive_path = receive_path;
            http.transfer_abort = Some(abort.clone());
            TransferParams {
                uri: http
                    .uri
                    .clone()
                    .unwrap_or_else(|| connection.mmsc.clone()),
                send_path: http.send_path.clone(),
                receive_path: http.receive_path.clone(),
                proxy: connection.proxy.clone(),
                netif: connection.netif.clone(),
                user_agent: sim.user_agent.clone(),
                uaprof: (!sim.uaprof.is_empty()).then(|| sim.uaprof.clone()),
            }
        };

        debug!(
            "{} {} -> {}",
            header.name,
            params
                .send_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "GET".to_string()),
            params.uri
        );

        spawn_transfer(header.seq, params, abort, header.abort.clone(), &ctx.events);
        Self::hook_started(header, body, ctx);
        header.set_state(TaskState::Transmitting);
    }

    pub fn network_unavailable<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        Self::me(body).finish_transfer();
        if header.sleep(&ctx.events, ctx.config.retry_secs, 0) {
            Self::hook_paused(header, body, ctx);
        } else {
            Self::hook_done(header, body, HttpDone::TransportError, ctx);
        }
    }

    pub async fn transfer_done<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        outcome: TransferOutcome,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        if header.state != TaskState::Transmitting {
            debug!("{} ignoring stale completion", header.name);
            return;
        }
        Self::me(body).finish_transfer();
        match outcome {
            TransferOutcome::Status(code) if (200..300).contains(&code) => {
                debug!("{} HTTP status {code}", header.name);
                header.set_state(TaskState::Done);
                Self::hook_done(header, body, HttpDone::Success, ctx);
            },
            TransferOutcome::Status(code) => {
                warn!("{} HTTP error {code}", header.name);
                header.set_state(TaskState::Done);
                Self::hook_done(header, body, HttpDone::HttpError, ctx);
            },
            TransferOutcome::TransportError(e) => {
                debug!("{} transport error: {e}", header.name);
                if header.sleep(&ctx.events, ctx.config.retry_secs, 0) {
                    Self::hook_paused(header, body, ctx);
                } else {
                    Self::hook_done(header, body, HttpDone::TransportError, ctx);
                }
            },
        }
    }

    fn finish_failed<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        header.set_state(TaskState::Done);
        Self::hook_done(header, body, HttpDone::TransportError, ctx);
    }

    fn finish_transfer(&mut self) {
        if let Some(abort) = self.transfer_abort.take() {
            abort.cancel();
        }
    }

    // Subclass callbacks, selected by kind.

    fn hook_started<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        match &Self::me(body).kind {
            HttpKind::Retrieve { .. } => retrieve::started(header, ctx),
            HttpKind::Send => send::started(header, ctx),
            _ => {},
        }
    }

    fn hook_paused<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        match &Self::me(body).kind {
            HttpKind::Retrieve { .. } => retrieve::paused(header, ctx),
            HttpKind::Send => send::paused(header, ctx),
            _ => {},
        }
    }

    fn hook_done<H: MmsHandler, S: SettingsProvider>(
        header: &mut TaskHeader,
        body: &mut TaskBody,
        status: HttpDone,
        ctx: &mut TaskContext<'_, H, S>,
    ) {
        let http = Self::me(body);
        let receive_path = http.receive_path.clone();
        let success = status == HttpDone::Success;
        match &http.kind {
            HttpKind::Retrieve { transaction_id } => {
                let transaction_id = transaction_id.clone();
                retrieve::done(header, &transaction_id, receive_path, success, ctx);
            },
            HttpKind::Send => send::done(header, receive_path, success, ctx),
            HttpKind::ReadReport => read_report::done(header, status, ctx),
            HttpKind::Ack | HttpKind::NotifyResp => {
                notifyresp::done(header, success);
            },
        }
    }

    /// Drops working files once the task is finished.
    pub fn cleanup(&mut self, keep_temp_files: bool) {
        if !keep_temp_files {
            if let Some(path) = &self.send_path {
                crate::file_util::remove_file_and_dir(path);
            }
            if let Some(path) = &self.receive_path {
                crate::file_util::remove_file_and_dir(path);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfer execution

#[derive(Debug, Clone)]
struct TransferParams {
    uri: String,
    send_path: Option<PathBuf>,
    receive_path: Option<PathBuf>,
    proxy: Option<String>,
    netif: Option<String>,
    user_agent: String,
    uaprof: Option<String>,
}

fn with_http_scheme(uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.to_string()
    } else {
        format!("http://{uri}")
    }
}

/// IP address of the bearer interface, for binding the client socket.
fn interface_address(netif: &str) -> Option<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(addrs) => addrs
            .into_iter()
            .find(|ifa| ifa.name == netif)
            .map(|ifa| ifa.ip()),
        Err(e) => {
            warn!("failed to query interface addresses: {e}");
            None
        },
    }
}

fn spawn_transfer(
    seq: u64,
    params: TransferParams,
    abort: CancellationToken,
    task_abort: CancellationToken,
    events: &mpsc::UnboundedSender<Event>,
) {
    let events = events.clone();
    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = abort.cancelled() => return,
            _ = task_abort.cancelled() => return,
            outcome = perform_transfer(params) => outcome,
        };
        let _ = events.send(Event::TransferDone { seq, outcome });
    });
}

async fn perform_transfer(params: TransferParams) -> TransferOutcome {
    match try_transfer(&params).await {
        Ok(status) => TransferOutcome::Status(status),
        Err(e) => TransferOutcome::TransportError(e),
    }
}

async fn try_transfer(params: &TransferParams) -> Result<u16, String> {
    let mut builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(&params.user_agent)
        .connect_timeout(std::time::Duration::from_secs(30));

    if let Some(netif) = &params.netif {
        match interface_address(netif) {
            Some(addr) => {
                debug!("MMS interface address {addr}");
                builder = builder.local_address(addr);
            },
            None => warn!("MMS interface {netif} has no address"),
        }
    } else {
        warn!("MMS interface is unknown");
    }

    if let Some(proxy) = &params.proxy {
        debug!("MMS proxy {proxy}");
        let proxy = reqwest::Proxy::all(with_http_scheme(proxy))
            .map_err(|e| format!("bad proxy: {e}"))?;
        builder = builder.proxy(proxy);
    }

    let client = builder.build().map_err(|e| format!("client setup: {e}"))?;
    let uri = with_http_scheme(&params.uri);

    let request = match &params.send_path {
        Some(send_path) => {
            let file = tokio::fs::File::open(send_path)
                .await
                .map_err(|e| format!("cannot open upload file: {e}"))?;
            let len = file
                .metadata()
                .await
                .map_err(|e| format!("cannot stat upload file: {e}"))?
                .len();
            let stream = ReaderStream::with_capacity(file, HTTP_MAX_CHUNK);
            client
                .post(&uri)
                .header(reqwest::header::CONTENT_TYPE, tables::CONTENT_TYPE_MMS_MESSAGE)
                .header(reqwest::header::CONTENT_LENGTH, len)
                .body(reqwest::Body::wrap_stream(stream))
        },
        None => client.get(&uri),
    };
    let request = match &params.uaprof {
        Some(uaprof) => request.header("x-wap-profile", uaprof),
        None => request,
    };

    let mut response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status().as_u16();

    if let Some(receive_path) = &params.receive_path {
        let mut file = tokio::fs::File::create(receive_path)
            .await
            .map_err(|e| format!("cannot create receive file: {e}"))?;
        let mut received: u64 = 0;
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    received += chunk.len() as u64;
                    file.write_all(&chunk)
                        .await
                        .map_err(|e| format!("write error: {e}"))?;
                },
                Ok(None) => break,
                Err(e) => return Err(e.to_string()),
            }
        }
        file.flush().await.map_err(|e| format!("write error: {e}"))?;
        debug!("{received} byte(s) received");
    }

    Ok(status)
}
