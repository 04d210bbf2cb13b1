// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! In-memory MMS PDU model: a tagged variant over the nine PDU kinds
//! with a shared transaction-id/version header.

use bytes::Bytes;

pub const MMS_VERSION_1_0: u8 = 0x90;
pub const MMS_VERSION_1_1: u8 = 0x91;
pub const MMS_VERSION_1_2: u8 = 0x92;
pub const MMS_VERSION_1_3: u8 = 0x93;

/// Version the engine claims on everything it emits.
pub const MMS_VERSION: u8 = MMS_VERSION_1_1;

pub const MESSAGE_CLASS_PERSONAL: &str = "Personal";
pub const MESSAGE_CLASS_ADVERTISEMENT: &str = "Advertisement";
pub const MESSAGE_CLASS_INFORMATIONAL: &str = "Informational";
pub const MESSAGE_CLASS_AUTO: &str = "Auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    SendReq = 128,
    SendConf = 129,
    NotificationInd = 130,
    NotifyRespInd = 131,
    RetrieveConf = 132,
    AcknowledgeInd = 133,
    DeliveryInd = 134,
    ReadRecInd = 135,
    ReadOrigInd = 136,
}

impl MessageType {
    pub fn from_wire(octet: u8) -> Option<Self> {
        Some(match octet {
            128 => MessageType::SendReq,
            129 => MessageType::SendConf,
            130 => MessageType::NotificationInd,
            131 => MessageType::NotifyRespInd,
            132 => MessageType::RetrieveConf,
            133 => MessageType::AcknowledgeInd,
            134 => MessageType::DeliveryInd,
            135 => MessageType::ReadRecInd,
            136 => MessageType::ReadOrigInd,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Priority {
    Low = 128,
    #[default]
    Normal = 129,
    High = 130,
}

impl Priority {
    pub fn from_wire(octet: u8) -> Option<Self> {
        Some(match octet {
            128 => Priority::Low,
            129 => Priority::Normal,
            130 => Priority::High,
            _ => return None,
        })
    }
}

/// M-Send.conf response status. Values outside the explicitly assigned
/// set are folded onto the generic failure of their band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseStatus {
    Ok = 128,
    ErrUnsupportedMessage = 136,
    ErrTransFailure = 192,
    ErrTransNetworkProblem = 195,
    ErrPermFailure = 224,
    ErrPermServiceDenied = 225,
    ErrPermMessageFormatCorrupt = 226,
    ErrPermSendingAddressUnresolved = 227,
    ErrPermContentNotAccepted = 229,
    ErrPermLackOfPrepaid = 235,
}

impl ResponseStatus {
    pub fn from_wire(octet: u8) -> Option<Self> {
        Some(match octet {
            128 => ResponseStatus::Ok,
            136 => ResponseStatus::ErrUnsupportedMessage,
            192 => ResponseStatus::ErrTransFailure,
            195 => ResponseStatus::ErrTransNetworkProblem,
            224 => ResponseStatus::ErrPermFailure,
            225 => ResponseStatus::ErrPermServiceDenied,
            226 => ResponseStatus::ErrPermMessageFormatCorrupt,
            227 => ResponseStatus::ErrPermSendingAddressUnresolved,
            229 => ResponseStatus::ErrPermContentNotAccepted,
            235 => ResponseStatus::ErrPermLackOfPrepaid,
            129..=136 => ResponseStatus::ErrUnsupportedMessage,
            193..=196 => ResponseStatus::ErrTransFailure,
            228..=235 => ResponseStatus::ErrPermFailure,
            _ => return None,
        })
    }
}

/// X-Mms-Retrieve-Status bands parallel the response status ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RetrieveStatus {
    Ok = 128,
    ErrTransFailure = 192,
    ErrTransMessageNotFound = 193,
    ErrTransNetworkProblem = 194,
    ErrPermFailure = 224,
    ErrPermServiceDenied = 225,
    ErrPermMessageNotFound = 226,
    ErrPermContentUnsupported = 227,
}

impl RetrieveStatus {
    pub fn from_wire(octet: u8) -> Option<Self> {
        Some(match octet {
            128 => RetrieveStatus::Ok,
            192 => RetrieveStatus::ErrTransFailure,
            193 => RetrieveStatus::ErrTransMessageNotFound,
            194 => RetrieveStatus::ErrTransNetworkProblem,
            224 => RetrieveStatus::ErrPermFailure,
            225 => RetrieveStatus::ErrPermServiceDenied,
            226 => RetrieveStatus::ErrPermMessageNotFound,
            227 => RetrieveStatus::ErrPermContentUnsupported,
            _ => return None,
        })
    }
}

/// X-Mms-Status on M-Notifyresp.ind / M-Acknowledge.ind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NotifyStatus {
    Retrieved = 129,
    Rejected = 130,
    Deferred = 131,
    Unrecognised = 132,
}

/// X-Mms-Status on M-Delivery.ind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeliveryStatus {
    Expired = 128,
    Retrieved = 129,
    Rejected = 130,
    Deferred = 131,
    Unrecognised = 132,
    Indeterminate = 133,
    Forwarded = 134,
    Unreachable = 135,
}

impl DeliveryStatus {
    pub fn from_wire(octet: u8) -> Option<Self> {
        Some(match octet {
            128 => DeliveryStatus::Expired,
            129 => DeliveryStatus::Retrieved,
            130 => DeliveryStatus::Rejected,
            131 => DeliveryStatus::Deferred,
            132 => DeliveryStatus::Unrecognised,
            133 => DeliveryStatus::Indeterminate,
            134 => DeliveryStatus::Forwarded,
            135 => DeliveryStatus::Unreachable,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadStatus {
    Read = 128,
    Deleted = 129,
}

impl ReadStatus {
    pub fn from_wire(octet: u8) -> Option<Self> {
        Some(match octet {
            128 => ReadStatus::Read,
            129 => ReadStatus::Deleted,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SenderVisibility {
    Hide = 128,
    Show = 129,
}

/// One attachment of a Retrieve.conf or Send.req body. Decoded parts
/// slice the source buffer zero-copy; encoded parts carry mapped file
/// contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub content_type: String,
    pub content_id: Option<String>,
    pub content_location: Option<String>,
    pub data: Bytes,
    /// Offset of the body within the source PDU, when decoded.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationInd {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub class: Option<String>,
    pub size: u64,
    /// Absolute expiry, seconds since the epoch.
    pub expiry: u64,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RetrieveConf {
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub subject: Option<String>,
    pub class: Option<String>,
    pub priority: Option<Priority>,
    pub msgid: Option<String>,
    pub date: u64,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SendReq {
    pub to: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub date: u64,
    /// Request a delivery report.
    pub dr: bool,
    /// Request a read report.
    pub rr: bool,
    pub content_type: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendConf {
    pub rsp_status: ResponseStatus,
    pub msgid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotifyRespInd {
    pub notify_status: NotifyStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AcknowledgeInd {
    pub report: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryInd {
    pub dr_status: DeliveryStatus,
    pub msgid: Option<String>,
    pub to: Option<String>,
    pub date: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadInd {
    pub rr_status: ReadStatus,
    pub msgid: Option<String>,
    pub to: Option<String>,
    pub from: Option<String>,
    pub date: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PduBody {
    SendReq(SendReq),
    SendConf(SendConf),
    NotificationInd(NotificationInd),
    NotifyRespInd(NotifyRespInd),
    RetrieveConf(RetrieveConf),
    AcknowledgeInd(AcknowledgeInd),
    DeliveryInd(DeliveryInd),
    ReadRecInd(ReadInd),
    ReadOrigInd(ReadInd),
}

impl PduBody {
    pub fn message_type(&self) -> MessageType {
        match self {
            PduBody::SendReq(_) => MessageType::SendReq,
            PduBody::SendConf(_) => MessageType::SendConf,
            PduBody::NotificationInd(_) => MessageType::NotificationInd,
            PduBody::NotifyRespInd(_) => MessageType::NotifyRespInd,
            PduBody::RetrieveConf(_) => MessageType::RetrieveConf,
            PduBody::AcknowledgeInd(_) => MessageType::AcknowledgeInd,
            PduBody::DeliveryInd(_) => MessageType::DeliveryInd,
            PduBody::ReadRecInd(_) => MessageType::ReadRecInd,
            PduBody::ReadOrigInd(_) => MessageType::ReadOrigInd,
        }
    }
}

/// One MMS message on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct MmsPdu {
    pub transaction_id: Option<String>,
    pub version: u8,
    pub body: PduBody,
}

impl MmsPdu {
    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    pub fn parts(&self) -> &[Part] {
        match &self.body {
            PduBody::SendReq(sr) => &sr.parts,
            PduBody::RetrieveConf(rc) => &rc.parts,
            _ => &[],
        }
    }
}
