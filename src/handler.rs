// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Interface to the external message store. The handler persists
//! notifications, records send/receive state transitions and delivers
//! decoded messages to the end user; the engine only drives it.

use std::future::Future;

use bytes::Bytes;

use crate::message::MmsMessage;

/// Receive-side progress, the authoritative channel for inbound state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveState {
    Receiving,
    Deferred,
    NoSpace,
    Decoding,
    DownloadError,
    DecodingError,
}

/// Send-side progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Encoding,
    TooBig,
    Sending,
    Deferred,
    NoSpace,
    SendError,
    Refused,
}

/// Delivery report status as reported to the handler. Indeterminate
/// wire values collapse to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Unknown,
    Expired,
    Retrieved,
    Rejected,
    Deferred,
    Unrecognised,
    Forwarded,
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Read,
    Deleted,
}

/// Outcome of posting a read report to the MMSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadReportStatus {
    Ok,
    IoError,
    PermanentError,
}

/// Message-store interface. `message_notify` and `message_received` are
/// asynchronous round trips; the state-change notifications are fire and
/// forget.
pub trait MmsHandler: Send + Sync + 'static {
    /// New incoming message notification. A non-empty id starts the
    /// download immediately, an empty string postpones it, `None`
    /// rejects the message.
    fn message_notify(
        &self,
        imsi: &str,
        from: &str,
        subject: &str,
        expiry: u64,
        push: Bytes,
    ) -> impl Future<Output = Option<String>> + Send;

    /// Delivers a fully decoded message. `false` asks the engine to
    /// retry later.
    fn message_received(
        &self,
        msg: &MmsMessage,
    ) -> impl Future<Output = bool> + Send;

    fn message_receive_state_changed(&self, id: &str, state: ReceiveState);

    fn message_send_state_changed(
        &self,
        id: &str,
        state: SendState,
        details: Option<&str>,
    );

    /// Message accepted by the MMSC under `msgid`.
    fn message_sent(&self, id: &str, msgid: &str);

    fn delivery_report(
        &self,
        imsi: &str,
        msgid: &str,
        recipient: &str,
        status: DeliveryStatus,
    );

    fn read_report(
        &self,
        imsi: &str,
        msgid: &str,
        recipient: &str,
        status: ReadStatus,
    );

    fn read_report_send_status(&self, id: &str, status: ReadReportStatus);
}
