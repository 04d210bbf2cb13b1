// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Well-known header, content-type and charset tables.
//!
//! Charset assignments follow the IANA character-sets registry, content
//! types the OMA WSP well-known table.

use once_cell::sync::Lazy;
use std::collections::HashMap;

// Message-level well-known header codes (low 7 bits of the name octet).
pub const MMS_HEADER_BCC: u8 = 0x01;
pub const MMS_HEADER_CC: u8 = 0x02;
pub const MMS_HEADER_CONTENT_LOCATION: u8 = 0x03;
pub const MMS_HEADER_CONTENT_TYPE: u8 = 0x04;
pub const MMS_HEADER_DATE: u8 = 0x05;
pub const MMS_HEADER_DELIVERY_REPORT: u8 = 0x06;
pub const MMS_HEADER_DELIVERY_TIME: u8 = 0x07;
pub const MMS_HEADER_EXPIRY: u8 = 0x08;
pub const MMS_HEADER_FROM: u8 = 0x09;
pub const MMS_HEADER_MESSAGE_CLASS: u8 = 0x0a;
pub const MMS_HEADER_MESSAGE_ID: u8 = 0x0b;
pub const MMS_HEADER_MESSAGE_TYPE: u8 = 0x0c;
pub const MMS_HEADER_MMS_VERSION: u8 = 0x0d;
pub const MMS_HEADER_MESSAGE_SIZE: u8 = 0x0e;
pub const MMS_HEADER_PRIORITY: u8 = 0x0f;
pub const MMS_HEADER_READ_REPORT: u8 = 0x10;
pub const MMS_HEADER_REPORT_ALLOWED: u8 = 0x11;
pub const MMS_HEADER_RESPONSE_STATUS: u8 = 0x12;
pub const MMS_HEADER_RESPONSE_TEXT: u8 = 0x13;
pub const MMS_HEADER_SENDER_VISIBILITY: u8 = 0x14;
pub const MMS_HEADER_STATUS: u8 = 0x15;
pub const MMS_HEADER_SUBJECT: u8 = 0x16;
pub const MMS_HEADER_TO: u8 = 0x17;
pub const MMS_HEADER_TRANSACTION_ID: u8 = 0x18;
pub const MMS_HEADER_RETRIEVE_STATUS: u8 = 0x19;
pub const MMS_HEADER_RETRIEVE_TEXT: u8 = 0x1a;
pub const MMS_HEADER_READ_STATUS: u8 = 0x1b;
pub const MMS_HEADER_REPLY_CHARGING: u8 = 0x1c;
pub const MMS_HEADER_REPLY_CHARGING_DEADLINE: u8 = 0x1d;
pub const MMS_HEADER_REPLY_CHARGING_ID: u8 = 0x1e;
pub const MMS_HEADER_REPLY_CHARGING_SIZE: u8 = 0x1f;
pub const MMS_HEADER_PREVIOUSLY_SENT_BY: u8 = 0x20;
pub const MMS_HEADER_PREVIOUSLY_SENT_DATE: u8 = 0x21;
pub const MMS_HEADER_MAX: u8 = 0x22;

// Part-level well-known header codes.
pub const MMS_PART_HEADER_CONTENT_LOCATION: u8 = 0x0e;
pub const MMS_PART_HEADER_CONTENT_DISPOSITION: u8 = 0x2e;
pub const MMS_PART_HEADER_CONTENT_ID: u8 = 0x40;
pub const MMS_PART_HEADER_CONTENT_DISPOSITION2: u8 = 0x45;

/// Header names as they appear in a textual dump, indexed by code.
pub fn header_name(code: u8) -> Option<&'static str> {
    Some(match code {
        MMS_HEADER_BCC => "Bcc",
        MMS_HEADER_CC => "Cc",
        MMS_HEADER_CONTENT_LOCATION => "X-Mms-Content-Location",
        MMS_HEADER_CONTENT_TYPE => "Content-Type",
        MMS_HEADER_DATE => "Date",
        MMS_HEADER_DELIVERY_REPORT => "X-Mms-Delivery-Report",
        MMS_HEADER_DELIVERY_TIME => "X-Mms-Delivery-Time",
        MMS_HEADER_EXPIRY => "X-Mms-Expiry",
        MMS_HEADER_FROM => "From",
        MMS_HEADER_MESSAGE_CLASS => "X-Mms-Message-Class",
        MMS_HEADER_MESSAGE_ID => "Message-ID",
        MMS_HEADER_MESSAGE_TYPE => "X-Mms-Message-Type",
        MMS_HEADER_MMS_VERSION => "X-Mms-MMS-Version",
        MMS_HEADER_MESSAGE_SIZE => "X-Mms-Message-Size",
        MMS_HEADER_PRIORITY => "X-Mms-Priority",
        MMS_HEADER_READ_REPORT => "X-Mms-Read-Report",
        MMS_HEADER_REPORT_ALLOWED => "X-Mms-Report-Allowed",
        MMS_HEADER_RESPONSE_STATUS => "X-Mms-Response-Status",
        MMS_HEADER_RESPONSE_TEXT => "X-Mms-Response-Text",
        MMS_HEADER_SENDER_VISIBILITY => "X-Mms-Sender-Visibility",
        MMS_HEADER_STATUS => "X-Mms-Status",
        MMS_HEADER_SUBJECT => "Subject",
        MMS_HEADER_TO => "To",
        MMS_HEADER_TRANSACTION_ID => "X-Mms-Transaction-Id",
        MMS_HEADER_RETRIEVE_STATUS => "X-Mms-Retrieve-Status",
        MMS_HEADER_RETRIEVE_TEXT => "X-Mms-Retrieve-Text",
        MMS_HEADER_READ_STATUS => "X-Mms-Read-Status",
        MMS_HEADER_REPLY_CHARGING => "X-Mms-Reply-Charging",
        MMS_HEADER_REPLY_CHARGING_DEADLINE => "X-Mms-Reply-Charging-Deadline",
        MMS_HEADER_REPLY_CHARGING_ID => "X-Mms-Reply-Charging-ID",
        MMS_HEADER_REPLY_CHARGING_SIZE => "X-Mms-Reply-Charging-Size",
        MMS_HEADER_PREVIOUSLY_SENT_BY => "X-Mms-Previously-Sent-By",
        MMS_HEADER_PREVIOUSLY_SENT_DATE => "X-Mms-Previously-Sent-Date",
        _ => return None,
    })
}

pub fn part_header_name(code: u8) -> Option<&'static str> {
    Some(match code {
        MMS_PART_HEADER_CONTENT_LOCATION => "Content-Location",
        MMS_PART_HEADER_CONTENT_DISPOSITION
        | MMS_PART_HEADER_CONTENT_DISPOSITION2 => "Content-Disposition",
        MMS_PART_HEADER_CONTENT_ID => "Content-ID",
        _ => return None,
    })
}

/// IANA character set assignments, sorted by MIBenum.
static CHARSET_ASSIGNMENTS: &[(u32, &str)] = &[
    (3, "US-ASCII"),
    (4, "ISO_8859-1"),
    (5, "ISO_8859-2"),
    (6, "ISO_8859-3"),
    (7, "ISO_8859-4"),
    (8, "ISO_8859-5"),
    (9, "ISO_8859-6"),
    (10, "ISO_8859-7"),
    (11, "ISO_8859-8"),
    (12, "ISO_8859-9"),
    (13, "ISO-8859-10"),
    (17, "Shift_JIS"),
    (18, "EUC-JP"),
    (36, "KS_C_5601-1987"),
    (37, "ISO-2022-KR"),
    (38, "EUC-KR"),
    (39, "ISO-2022-JP"),
    (40, "ISO-2022-JP-2"),
    (81, "ISO_8859-6-E"),
    (82, "ISO_8859-6-I"),
    (84, "ISO_8859-8-E"),
    (85, "ISO_8859-8-I"),
    (106, "UTF-8"),
    (109, "ISO-8859-13"),
    (110, "ISO-8859-14"),
    (111, "ISO-8859-15"),
    (112, "ISO-8859-16"),
    (113, "GBK"),
    (114, "GB18030"),
    (1000, "ISO-10646-UCS-2"),
    (1001, "ISO-10646-UCS-4"),
    (1004, "ISO-10646-J-1"),
    (1012, "UTF-7"),
    (1013, "UTF-16BE"),
    (1014, "UTF-16LE"),
    (1015, "UTF-16"),
    (1017, "UTF-32"),
    (1018, "UTF-32BE"),
    (1019, "UTF-32LE"),
    (2025, "GB2312"),
    (2026, "Big5"),
    (2027, "macintosh"),
    (2084, "KOI8-R"),
    (2109, "windows-874"),
    (2250, "windows-1250"),
    (2251, "windows-1251"),
    (2252, "windows-1252"),
    (2253, "windows-1253"),
    (2254, "windows-1254"),
    (2255, "windows-1255"),
    (2256, "windows-1256"),
    (2257, "windows-1257"),
    (2258, "windows-1258"),
];

pub fn charset_for_mib(mib: u32) -> Option<&'static str> {
    CHARSET_ASSIGNMENTS
        .binary_search_by_key(&mib, |(m, _)| *m)
        .ok()
        .map(|i| CHARSET_ASSIGNMENTS[i].1)
}

pub fn mib_for_charset(charset: &str) -> Option<u32> {
    CHARSET_ASSIGNMENTS
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(charset))
        .map(|(mib, _)| *mib)
}

/// OMA WSP well-known content types (table 40), indexed by assignment.
static WELL_KNOWN_CONTENT_TYPES: &[&str] = &[
    "*/*",
    "text/*",
    "text/html",
    "text/plain",
    "text/x-hdml",
    "text/x-ttml",
    "text/x-vCalendar",
    "text/x-vCard",
    "text/vnd.wap.wml",
    "text/vnd.wap.wmlscript",
    "text/vnd.wap.wta-event",
    "multipart/*",
    "multipart/mixed",
    "multipart/form-data",
    "multipart/byterantes",
    "multipart/alternative",
    "application/*",
    "application/java-vm",
    "application/x-www-form-urlencoded",
    "application/x-hdmlc",
    "application/vnd.wap.wmlc",
    "application/vnd.wap.wmlscriptc",
    "application/vnd.wap.wta-eventc",
    "application/vnd.wap.uaprof",
    "application/vnd.wap.wtls-ca-certificate",
    "application/vnd.wap.wtls-user-certificate",
    "application/x-x509-ca-cert",
    "application/x-x509-user-cert",
    "image/*",
    "image/gif",
    "image/jpeg",
    "image/tiff",
    "image/png",
    "image/vnd.wap.wbmp",
    "application/vnd.wap.multipart.*",
    "application/vnd.wap.multipart.mixed",
    "application/vnd.wap.multipart.form-data",
    "application/vnd.wap.multipart.byteranges",
    "application/vnd.wap.multipart.alternative",
    "application/xml",
    "text/xml",
    "application/vnd.wap.wbxml",
    "application/x-x968-cross-cert",
    "application/x-x968-ca-cert",
    "application/x-x968-user-cert",
    "text/vnd.wap.si",
    "application/vnd.wap.sic",
    "text/vnd.wap.sl",
    "application/vnd.wap.slc",
    "text/vnd.wap.co",
    "application/vnd.wap.coc",
    "application/vnd.wap.multipart.related",
    "application/vnd.wap.sia",
    "text/vnd.wap.connectivity-xml",
    "application/vnd.wap.connectivity-wbxml",
    "application/pkcs7-mime",
    "application/vnd.wap.hashed-certificate",
    "application/vnd.wap.signed-certificate",
    "application/vnd.wap.cert-response",
    "application/xhtml+xml",
    "application/wml+xml",
    "text/css",
    "application/vnd.wap.mms-message",
    "application/vnd.wap.rollover-certificate",
];

static CONTENT_TYPE_CODES: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    WELL_KNOWN_CONTENT_TYPES
        .iter()
        .enumerate()
        .map(|(i, ct)| (*ct, i as u8))
        .collect()
});

pub fn content_type_for_code(code: u8) -> Option<&'static str> {
    WELL_KNOWN_CONTENT_TYPES.get(code as usize).copied()
}

pub fn code_for_content_type(content_type: &str) -> Option<u8> {
    CONTENT_TYPE_CODES.get(content_type).copied()
}

pub const CONTENT_TYPE_MMS_MESSAGE: &str = "application/vnd.wap.mms-message";
pub const CONTENT_TYPE_MULTIPART_RELATED: &str = "application/vnd.wap.multipart.related";
pub const CONTENT_TYPE_SMIL: &str = "application/smil";
