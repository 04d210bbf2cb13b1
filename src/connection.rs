// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Bearer connection object and the connection-manager interface.
//!
//! The dispatcher owns at most one connection at a time; the connection
//! manager (operator integration, out of the engine core) activates the
//! data bearer and feeds state changes through a watch channel.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Opening,
    Open,
    Failed,
    Closed,
}

impl ConnectionState {
    pub fn name(self) -> &'static str {
        match self {
            ConnectionState::Opening => "OPENING",
            ConnectionState::Open => "OPEN",
            ConnectionState::Failed => "FAILED",
            ConnectionState::Closed => "CLOSED",
        }
    }

    /// Failed and Closed are terminal; a fresh connection object must be
    /// obtained afterwards.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}

/// One activated (or activating) data bearer for an IMSI.
#[derive(Debug, Clone)]
pub struct Connection {
    pub imsi: String,
    /// MMSC URL for this bearer.
    pub mmsc: String,
    /// HTTP proxy as "host:port", when the APN requires one.
    pub proxy: Option<String>,
    /// Name of the network interface the bearer came up on.
    pub netif: Option<String>,
    state: watch::Receiver<ConnectionState>,
    closer: CancellationToken,
}

/// Held by the connection manager to drive the connection state.
#[derive(Debug, Clone)]
pub struct ConnectionController {
    state: watch::Sender<ConnectionState>,
    closer: CancellationToken,
}

impl Connection {
    /// Creates a connection/controller pair starting in `Opening`.
    pub fn channel(
        imsi: impl Into<String>,
        mmsc: impl Into<String>,
        proxy: Option<String>,
        netif: Option<String>,
    ) -> (Self, ConnectionController) {
        let (tx, rx) = watch::channel(ConnectionState::Opening);
        let closer = CancellationToken::new();
        (
            Self {
                imsi: imsi.into(),
                mmsc: mmsc.into(),
                proxy,
                netif,
                state: rx,
                closer: closer.clone(),
            },
            ConnectionController { state: tx, closer },
        )
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Waits for the next state change. Returns the new state, or the
    /// current one if the controller went away.
    pub async fn changed(&mut self) -> ConnectionState {
        if self.state.changed().await.is_err() {
            return ConnectionState::Closed;
        }
        *self.state.borrow()
    }

    /// Asks the connection manager to tear the bearer down.
    pub fn close(&self) {
        self.closer.cancel();
    }
}

impl ConnectionController {
    pub fn set_state(&self, state: ConnectionState) {
        let _ = self.state.send(state);
    }

    /// Resolved when the dispatcher no longer needs the bearer.
    pub fn closed(&self) -> CancellationToken {
        self.closer.clone()
    }
}

/// Connection manager interface: requests and observes data bearers.
pub trait ConnMan: Send + Sync + 'static {
    /// Opens (or starts opening) a bearer for the subscriber. `None`
    /// means the bearer cannot be activated at all.
    fn open_connection(&self, imsi: &str, user_request: bool) -> Option<Connection>;

    /// Subscriber to use when the caller does not name one.
    fn default_imsi(&self) -> Option<String> {
        None
    }
}
