// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Test doubles for the engine's external collaborators: a recording
//! message-store handler, a connection manager with an instantly-open
//! bearer, and a local HTTP fixture server playing the MMSC.

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use mms_engine_rs::{
    cfg::config::Config,
    codec::wsp,
    connection::{ConnMan, Connection, ConnectionController, ConnectionState},
    handler::{
        DeliveryStatus, MmsHandler, ReadReportStatus, ReadStatus, ReceiveState,
        SendState,
    },
    message::MmsMessage,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

// ─────────────────────────────────────────────────────────────────────────────
// Engine configuration

pub fn test_config(name: &str) -> Config {
    let root = std::env::temp_dir()
        .join(format!("mms-engine-test-{}", std::process::id()))
        .join(name);
    let _ = std::fs::remove_dir_all(&root);
    Config {
        root_dir: root,
        retry_secs: 1,
        idle_secs: 1,
        keep_temp_files: false,
        attic_enabled: false,
    }
}

pub fn write_temp_file(config: &Config, name: &str, data: &[u8]) -> PathBuf {
    let dir = config.root_dir.join("input");
    std::fs::create_dir_all(&dir).expect("create input dir");
    let path = dir.join(name);
    std::fs::write(&path, data).expect("write input file");
    path
}

// ─────────────────────────────────────────────────────────────────────────────
// Message-store handler double

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    Notified { from: String, subject: String },
    ReceiveState(String, ReceiveState),
    SendState(String, SendState),
    Sent(String, String),
    Delivery(String, String, DeliveryStatus),
    Read(String, String, ReadStatus),
    ReadReportStatus(String, ReadReportStatus),
}

/// What `message_notify` should answer with.
#[derive(Debug, Clone)]
pub enum NotifyMode {
    Assign(String),
    Defer,
    Reject,
    /// Never answer; used to test cancellation mid-notify.
    Block,
}

#[derive(Debug)]
pub struct HandlerInner {
    pub mode: Mutex<NotifyMode>,
    pub events: Mutex<Vec<HandlerEvent>>,
    pub received: Mutex<Vec<MmsMessage>>,
    /// Part payloads read while the files are still guaranteed to exist.
    pub part_bodies: Mutex<Vec<Vec<(String, Vec<u8>)>>>,
}

#[derive(Debug, Clone)]
pub struct TestHandler(pub Arc<HandlerInner>);

impl TestHandler {
    pub fn new(mode: NotifyMode) -> Self {
        Self(Arc::new(HandlerInner {
            mode: Mutex::new(mode),
            events: Mutex::new(Vec::new()),
            received: Mutex::new(Vec::new()),
            part_bodies: Mutex::new(Vec::new()),
        }))
    }

    pub fn part_bodies(&self) -> Vec<Vec<(String, Vec<u8>)>> {
        self.0.part_bodies.lock().expect("part bodies lock").clone()
    }

    pub fn events(&self) -> Vec<HandlerEvent> {
        self.0.events.lock().expect("events lock").clone()
    }

    pub fn received(&self) -> Vec<MmsMessage> {
        self.0.received.lock().expect("received lock").clone()
    }

    fn push_event(&self, event: HandlerEvent) {
        self.0.events.lock().expect("events lock").push(event);
    }

    pub fn receive_states(&self, id: &str) -> Vec<ReceiveState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HandlerEvent::ReceiveState(i, s) if i == id => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn send_states(&self, id: &str) -> Vec<SendState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HandlerEvent::SendState(i, s) if i == id => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Polls until the predicate holds or the timeout expires.
    pub async fn wait_until(
        &self,
        what: &str,
        mut pred: impl FnMut(&TestHandler) -> bool,
    ) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        while !pred(self) {
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for {what}; events: {:?}", self.events());
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

impl MmsHandler for TestHandler {
    async fn message_notify(
        &self,
        _imsi: &str,
        from: &str,
        subject: &str,
        _expiry: u64,
        _push: Bytes,
    ) -> Option<String> {
        self.push_event(HandlerEvent::Notified {
            from: from.to_string(),
            subject: subject.to_string(),
        });
        let mode = self.0.mode.lock().expect("mode lock").clone();
        match mode {
            NotifyMode::Assign(id) => Some(id),
            NotifyMode::Defer => Some(String::new()),
            NotifyMode::Reject => None,
            NotifyMode::Block => std::future::pending().await,
        }
    }

    async fn message_received(&self, msg: &MmsMessage) -> bool {
        let bodies = msg
            .parts
            .iter()
            .map(|p| {
                (
                    p.content_type.clone(),
                    std::fs::read(&p.file).unwrap_or_default(),
                )
            })
            .collect();
        self.0
            .part_bodies
            .lock()
            .expect("part bodies lock")
            .push(bodies);
        self.0
            .received
            .lock()
            .expect("received lock")
            .push(msg.clone());
        true
    }

    fn message_receive_state_changed(&self, id: &str, state: ReceiveState) {
        self.push_event(HandlerEvent::ReceiveState(id.to_string(), state));
    }

    fn message_send_state_changed(
        &self,
        id: &str,
        state: SendState,
        _details: Option<&str>,
    ) {
        self.push_event(HandlerEvent::SendState(id.to_string(), state));
    }

    fn message_sent(&self, id: &str, msgid: &str) {
        self.push_event(HandlerEvent::Sent(id.to_string(), msgid.to_string()));
    }

    fn delivery_report(
        &self,
        _imsi: &str,
        msgid: &str,
        recipient: &str,
        status: DeliveryStatus,
    ) {
        self.push_event(HandlerEvent::Delivery(
            msgid.to_string(),
            recipient.to_string(),
            status,
        ));
    }

    fn read_report(
        &self,
        _imsi: &str,
        msgid: &str,
        recipient: &str,
        status: ReadStatus,
    ) {
        self.push_event(HandlerEvent::Read(
            msgid.to_string(),
            recipient.to_string(),
            status,
        ));
    }

    fn read_report_send_status(&self, id: &str, status: ReadReportStatus) {
        self.push_event(HandlerEvent::ReadReportStatus(id.to_string(), status));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection manager double

#[derive(Debug)]
pub struct ConnManInner {
    mmsc: String,
    /// Keep controllers alive so the state channel stays up.
    controllers: Mutex<Vec<ConnectionController>>,
    opened: Mutex<u32>,
    refuse: bool,
}

#[derive(Debug, Clone)]
pub struct TestConnMan(pub Arc<ConnManInner>);

impl TestConnMan {
    pub fn new(mmsc: String) -> Self {
        Self(Arc::new(ConnManInner {
            mmsc,
            controllers: Mutex::new(Vec::new()),
            opened: Mutex::new(0),
            refuse: false,
        }))
    }

    pub fn refusing() -> Self {
        Self(Arc::new(ConnManInner {
            mmsc: String::new(),
            controllers: Mutex::new(Vec::new()),
            opened: Mutex::new(0),
            refuse: true,
        }))
    }

    pub fn opened(&self) -> u32 {
        *self.0.opened.lock().expect("opened lock")
    }
}

impl ConnMan for TestConnMan {
    fn open_connection(&self, imsi: &str, _user_request: bool) -> Option<Connection> {
        if self.0.refuse {
            return None;
        }
        *self.0.opened.lock().expect("opened lock") += 1;
        let (conn, controller) =
            Connection::channel(imsi, self.0.mmsc.clone(), None, None);
        controller.set_state(ConnectionState::Open);
        self.0
            .controllers
            .lock()
            .expect("controllers lock")
            .push(controller);
        Some(conn)
    }

    fn default_imsi(&self) -> Option<String> {
        Some("001010123456789".to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Local HTTP fixture server

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct HttpInner {
    routes: Mutex<HashMap<String, (u16, String, Vec<u8>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

#[derive(Debug, Clone)]
pub struct TestHttp {
    pub addr: SocketAddr,
    inner: Arc<HttpInner>,
}

impl TestHttp {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fixture server");
        let addr = listener.local_addr().expect("local addr");
        let inner = Arc::new(HttpInner::default());
        let server = inner.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let server = server.clone();
                tokio::spawn(async move {
                    let _ = serve_one(stream, server).await;
                });
            }
        });
        Self { addr, inner }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn route(
        &self,
        method: &str,
        path: &str,
        status: u16,
        content_type: &str,
        body: Vec<u8>,
    ) {
        self.inner
            .routes
            .lock()
            .expect("routes lock")
            .insert(format!("{method} {path}"), (status, content_type.to_string(), body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().expect("requests lock").clone()
    }
}

async fn serve_one(
    mut stream: tokio::net::TcpStream,
    server: Arc<HttpInner>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut content_type = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(0);
        } else if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    server.requests.lock().expect("requests lock").push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        content_type,
        body,
    });

    let route = server
        .routes
        .lock()
        .expect("routes lock")
        .get(&format!("{method} {path}"))
        .cloned();
    let (status, ct, payload) = route.unwrap_or((
        404,
        "text/html".to_string(),
        b"<html>not found</html>".to_vec(),
    ));

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: {ct}\r\nContent-Length: {}\r\n\
         Connection: close\r\n\r\n",
        if (200..300).contains(&status) { "OK" } else { "Error" },
        payload.len(),
    );
    stream.write_all(response.as_bytes()).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire fixtures

fn text(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Polls an arbitrary condition until it holds or a 15 s budget runs out.
pub async fn wait_for(what: &str, mut pred: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    while !pred() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

pub fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_secs()
}

/// M-Notification.ind push with an absolute expiry.
pub fn build_notification_push(
    transaction_id: &str,
    from: &str,
    location: &str,
    expiry_epoch: u32,
) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0x8c);
    out.push(130);
    out.push(0x98);
    text(&mut out, transaction_id);
    out.push(0x8d);
    out.push(0x91);
    out.push(0x89);
    out.push((1 + from.len() + 1) as u8);
    out.push(0x80);
    text(&mut out, from);
    out.push(0x8a);
    out.push(128);
    out.push(0x8e);
    out.extend_from_slice(&[2, 0x04, 0x00]);
    out.push(0x88);
    out.push(6);
    out.push(0x80);
    out.push(4);
    out.extend_from_slice(&expiry_epoch.to_be_bytes());
    out.push(0x83);
    text(&mut out, location);
    out
}

fn push_text_part(out: &mut Vec<u8>, cid: &str, location: &str, body: &[u8]) {
    let mut headers = Vec::new();
    headers.extend_from_slice(&[3, 0x83, 0x81, 0xea]); // text/plain; charset=utf-8
    headers.push(0xc0);
    headers.push(b'"');
    headers.push(b'<');
    headers.extend_from_slice(cid.as_bytes());
    headers.push(b'>');
    headers.push(0);
    headers.push(0x8e);
    text(&mut headers, location);

    wsp::encode_uintvar(headers.len() as u32, out);
    wsp::encode_uintvar(body.len() as u32, out);
    out.extend_from_slice(&headers);
    out.extend_from_slice(body);
}

fn push_jpeg_part(out: &mut Vec<u8>, cid: &str, body: &[u8]) {
    let mut headers = Vec::new();
    headers.push(0x9e); // image/jpeg, short form
    headers.push(0xc0);
    headers.push(b'"');
    headers.push(b'<');
    headers.extend_from_slice(cid.as_bytes());
    headers.push(b'>');
    headers.push(0);

    wsp::encode_uintvar(headers.len() as u32, out);
    wsp::encode_uintvar(body.len() as u32, out);
    out.extend_from_slice(&headers);
    out.extend_from_slice(body);
}

/// M-Retrieve.conf with a text part and a JPEG part.
pub fn build_retrieve_conf(transaction_id: &str, msgid: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0x8c);
    out.push(132);
    out.push(0x98);
    text(&mut out, transaction_id);
    out.push(0x8d);
    out.push(0x91);
    out.push(0x89);
    let from = "+15557654321/TYPE=PLMN";
    out.push((1 + from.len() + 1) as u8);
    out.push(0x80);
    text(&mut out, from);
    out.push(0x97);
    text(&mut out, "+15551234567/TYPE=PLMN");
    out.push(0x96);
    text(&mut out, "Greetings");
    out.push(0x8b);
    text(&mut out, msgid);
    out.push(0x85);
    out.extend_from_slice(&[4, 0x5f, 0x00, 0x00, 0x00]);

    out.push(0x84); // Content-Type: application/vnd.wap.multipart.mixed
    out.push(0xa3);
    out.push(2);
    push_text_part(&mut out, "text0", "hello.txt", b"Hello from the MMSC!");
    push_jpeg_part(&mut out, "img0", &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]);
    out
}

/// M-Send.conf acknowledging the submission with `msgid`.
pub fn build_send_conf(transaction_id: &str, msgid: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0x8c);
    out.push(129);
    out.push(0x98);
    text(&mut out, transaction_id);
    out.push(0x8d);
    out.push(0x91);
    out.push(0x92);
    out.push(128);
    out.push(0x8b);
    text(&mut out, msgid);
    out
}

/// A tiny valid JPEG (2x1 white pixels) so the image pipeline can decode
/// it if it ever needs to.
pub fn tiny_jpeg() -> Vec<u8> {
    // Not a real scan; content-type is supplied explicitly in tests so
    // the bytes only matter when resizing kicks in.
    let mut data = vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0u8; 64]);
    data.extend_from_slice(&[0xff, 0xd9]);
    data
}
