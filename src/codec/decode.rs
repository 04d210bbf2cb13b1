// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! MMS PDU decoder. Each PDU kind declares its expected well-known
//! headers with MANDATORY / ALLOW_MULTI / PRESET_POS flags; decoding
//! fails when a mandatory header is missing or a preset-position header
//! is out of place. Unknown well-known codes terminate optional header
//! parsing cleanly so that a trailing multipart body can follow.

use bitflags::bitflags;
use bytes::Bytes;

use crate::{
    codec::{
        pdu::*,
        tables,
        wsp::{
            self, HeaderField, HeaderIter, HeaderIterFlags, HeaderName,
            MultipartIter, ParameterIter, ValueType,
        },
    },
    error::{MmsError, Result},
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct HeaderFlags: u32 {
        const MANDATORY = 0x01;
        const ALLOW_MULTI = 0x02;
        const PRESET_POS = 0x04;
    }
}

const MANDATORY: HeaderFlags = HeaderFlags::MANDATORY;
const ALLOW_MULTI: HeaderFlags = HeaderFlags::ALLOW_MULTI;
const PRESET: HeaderFlags =
    HeaderFlags::MANDATORY.union(HeaderFlags::PRESET_POS);

/// Decodes one MMS PDU out of `data`. Part bodies are zero-copy slices
/// of the input buffer.
pub fn decode_message(data: &Bytes) -> Result<MmsPdu> {
    let mut iter = HeaderIter::new(
        data,
        HeaderIterFlags::REJECT_CP | HeaderIterFlags::DETECT_MMS_MULTIPART,
    );

    let field = iter
        .next_field()?
        .ok_or_else(|| MmsError::decode("empty PDU"))?;
    if field.name != HeaderName::WellKnown(tables::MMS_HEADER_MESSAGE_TYPE) {
        return Err(MmsError::decode("PDU does not start with X-Mms-Message-Type"));
    }
    let octet = extract_short(&field)
        .ok_or_else(|| MmsError::decode("bad X-Mms-Message-Type value"))?;
    let mtype = MessageType::from_wire(octet)
        .ok_or_else(|| MmsError::decode(format!("unknown message type {octet}")))?;

    match mtype {
        MessageType::SendReq => decode_send_req(&mut iter, data),
        MessageType::SendConf => decode_send_conf(&mut iter),
        MessageType::NotificationInd => decode_notification_ind(&mut iter),
        MessageType::NotifyRespInd => decode_notify_resp_ind(&mut iter),
        MessageType::RetrieveConf => decode_retrieve_conf(&mut iter, data),
        MessageType::AcknowledgeInd => decode_acknowledge_ind(&mut iter),
        MessageType::DeliveryInd => decode_delivery_ind(&mut iter),
        MessageType::ReadRecInd => decode_read_ind(&mut iter, false),
        MessageType::ReadOrigInd => decode_read_ind(&mut iter, true),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Header scan

/// Walks the header block against the declared expectations. `apply`
/// returns `true` when the value was understood; a `false` stops the
/// optional-header scan, like a value the original would fail to parse.
fn parse_headers(
    iter: &mut HeaderIter,
    spec: &[(u8, HeaderFlags)],
    mut apply: impl FnMut(u8, &HeaderField) -> bool,
) -> Result<()> {
    let mut marked = [false; tables::MMS_HEADER_MAX as usize];
    let mut positions = [0usize; tables::MMS_HEADER_MAX as usize];
    let in_spec = |code: u8| spec.iter().find(|(c, _)| *c == code);

    let mut index = 0usize;
    while let Some(field) = iter.next_field()? {
        index += 1;

        // Application headers are skipped but still occupy a position.
        let HeaderName::WellKnown(code) = field.name else {
            continue;
        };

        // An unrecognized well-known code ends the optional headers.
        if tables::header_name(code).is_none() {
            break;
        }

        let Some((_, flags)) = in_spec(code) else {
            continue;
        };
        if marked[code as usize] && !flags.contains(HeaderFlags::ALLOW_MULTI) {
            continue;
        }
        if !apply(code, &field) {
            break;
        }
        marked[code as usize] = true;
        positions[code as usize] = index;
    }

    for (code, flags) in spec {
        if flags.contains(HeaderFlags::MANDATORY) && !marked[*code as usize] {
            return Err(MmsError::decode(format!(
                "mandatory header 0x{code:02x} is missing"
            )));
        }
    }

    // PRESET_POS headers must sit at the very beginning of the block, in
    // spec order, with no other marked header in between.
    for (i, (code, flags)) in spec.iter().enumerate() {
        if !flags.contains(HeaderFlags::PRESET_POS) || !marked[*code as usize] {
            continue;
        }
        let expected = 1 + spec[..i]
            .iter()
            .filter(|(c, _)| marked[*c as usize])
            .count();
        if positions[*code as usize] != expected {
            return Err(MmsError::decode(format!(
                "header 0x{code:02x} out of position"
            )));
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Value extraction

fn extract_short(field: &HeaderField) -> Option<u8> {
    if field.value_type != ValueType::Short {
        return None;
    }
    Some(field.value.first()? & 0x7f | 0x80)
}

fn extract_text(field: &HeaderField) -> Option<String> {
    if field.value_type != ValueType::Text {
        return None;
    }
    let (s, _) = wsp::decode_text_string(field.value).ok()?;
    Some(s.to_string())
}

fn extract_quoted_string(field: &HeaderField) -> Option<String> {
    if field.value_type != ValueType::Text {
        return None;
    }
    let (s, _) = wsp::decode_quoted_string(field.value).ok()?;
    // Strip the customary angle brackets around a content-id.
    let s = s.strip_prefix('<').and_then(|s| s.strip_suffix('>')).unwrap_or(s);
    Some(s.to_string())
}

fn extract_encoded_text(field: &HeaderField) -> Option<String> {
    wsp::decode_encoded_string(field.value, field.value_type).ok()
}

/// Appends one more address to a comma-joined accumulator.
fn extract_text_array_element(field: &HeaderField, out: &mut Option<String>) -> bool {
    let Some(element) = extract_encoded_text(field) else {
        return false;
    };
    match out {
        Some(list) => {
            list.push(',');
            list.push_str(&element);
        },
        None => *out = Some(element),
    }
    true
}

/// Date long-integer, masked to 31 bits for peer compatibility.
fn extract_date(field: &HeaderField) -> Option<u64> {
    if field.value_type != ValueType::Long || field.value.len() > 4 {
        return None;
    }
    let mut out: u64 = 0;
    for b in field.value {
        out = (out << 8) | u64::from(*b);
    }
    Some(out & 0x7fff_ffff)
}

/// Expiry / Delivery-Time: absolute (0x80) or relative (0x81) date.
fn extract_absolute_relative_date(field: &HeaderField, now: u64) -> Option<u64> {
    if field.value_type != ValueType::Long {
        return None;
    }
    let v = field.value;
    if v.len() < 2 {
        return None;
    }
    let token = v[0];
    if token != 0x80 && token != 0x81 {
        return None;
    }
    let (seconds, _) = wsp::decode_long_integer(&v[1..]).ok()?;
    let out = if token == 0x81 { now.wrapping_add(seconds) } else { seconds };
    Some(out & 0x7fff_ffff)
}

fn extract_boolean(field: &HeaderField) -> Option<bool> {
    if field.value_type != ValueType::Short {
        return None;
    }
    // 128 = Yes, 129 = No; anything else is treated as parsed-but-No.
    Some(field.value.first().copied() == Some(0x80))
}

/// From: 0x80 + encoded address, or the 0x81 insert-address token.
fn extract_from(field: &HeaderField) -> Option<Option<String>> {
    if field.value_type != ValueType::Long {
        return None;
    }
    let v = field.value;
    match v.first()? {
        0x81 => Some(None),
        0x80 => {
            let (s, _) = wsp::decode_text_string(&v[1..]).ok()?;
            Some(Some(s.to_string()))
        },
        _ => None,
    }
}

fn extract_message_class(field: &HeaderField) -> Option<String> {
    match field.value_type {
        ValueType::Short => match field.value.first()? {
            128 => Some(MESSAGE_CLASS_PERSONAL.to_string()),
            129 => Some(MESSAGE_CLASS_ADVERTISEMENT.to_string()),
            130 => Some(MESSAGE_CLASS_INFORMATIONAL.to_string()),
            131 => Some(MESSAGE_CLASS_AUTO.to_string()),
            _ => None,
        },
        ValueType::Text => {
            let (s, _) = wsp::decode_token_text(field.value).ok()?;
            Some(s.to_string())
        },
        ValueType::Long => None,
    }
}

fn extract_unsigned(field: &HeaderField) -> Option<u64> {
    if field.value_type != ValueType::Long || field.value.len() > 8 {
        return None;
    }
    let mut out: u64 = 0;
    for b in field.value {
        out = (out << 8) | u64::from(*b);
    }
    Some(out)
}

fn extract_version(field: &HeaderField) -> Option<u8> {
    let v = extract_short(field)?;
    (MMS_VERSION_1_0..=MMS_VERSION_1_3).contains(&v).then_some(v)
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-kind decoders

use crate::codec::tables::{
    MMS_HEADER_CC, MMS_HEADER_CONTENT_LOCATION, MMS_HEADER_DATE,
    MMS_HEADER_EXPIRY, MMS_HEADER_FROM, MMS_HEADER_MESSAGE_CLASS,
    MMS_HEADER_MESSAGE_ID, MMS_HEADER_MESSAGE_SIZE, MMS_HEADER_MMS_VERSION,
    MMS_HEADER_PRIORITY, MMS_HEADER_READ_STATUS, MMS_HEADER_REPORT_ALLOWED,
    MMS_HEADER_RESPONSE_STATUS, MMS_HEADER_STATUS, MMS_HEADER_SUBJECT,
    MMS_HEADER_TO, MMS_HEADER_TRANSACTION_ID,
};

fn decode_notification_ind(iter: &mut HeaderIter) -> Result<MmsPdu> {
    let mut transaction_id = None;
    let mut version = None;
    let mut ni = NotificationInd::default();
    let now = now_secs();

    parse_headers(
        iter,
        &[
            (MMS_HEADER_TRANSACTION_ID, PRESET),
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_FROM, HeaderFlags::empty()),
            (MMS_HEADER_SUBJECT, HeaderFlags::empty()),
            (MMS_HEADER_MESSAGE_CLASS, MANDATORY),
            (MMS_HEADER_MESSAGE_SIZE, MANDATORY),
            (MMS_HEADER_EXPIRY, MANDATORY),
            (MMS_HEADER_CONTENT_LOCATION, MANDATORY),
        ],
        |code, f| match code {
            MMS_HEADER_TRANSACTION_ID => set(&mut transaction_id, extract_text(f)),
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_FROM => match extract_from(f) {
                Some(v) => {
                    ni.from = v;
                    true
                },
                None => false,
            },
            MMS_HEADER_SUBJECT => set(&mut ni.subject, extract_encoded_text(f)),
            MMS_HEADER_MESSAGE_CLASS => set(&mut ni.class, extract_message_class(f)),
            MMS_HEADER_MESSAGE_SIZE => copy(&mut ni.size, extract_unsigned(f)),
            MMS_HEADER_EXPIRY => {
                copy(&mut ni.expiry, extract_absolute_relative_date(f, now))
            },
            MMS_HEADER_CONTENT_LOCATION => set(&mut ni.location, extract_text(f)),
            _ => false,
        },
    )?;

    Ok(MmsPdu {
        transaction_id,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::NotificationInd(ni),
    })
}

fn decode_notify_resp_ind(iter: &mut HeaderIter) -> Result<MmsPdu> {
    let mut transaction_id = None;
    let mut version = None;
    let mut status = None;

    parse_headers(
        iter,
        &[
            (MMS_HEADER_TRANSACTION_ID, PRESET),
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_STATUS, MANDATORY),
        ],
        |code, f| match code {
            MMS_HEADER_TRANSACTION_ID => set(&mut transaction_id, extract_text(f)),
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_STATUS => set(
                &mut status,
                extract_short(f).and_then(|v| match v {
                    129 => Some(NotifyStatus::Retrieved),
                    130 => Some(NotifyStatus::Rejected),
                    131 => Some(NotifyStatus::Deferred),
                    132 => Some(NotifyStatus::Unrecognised),
                    _ => None,
                }),
            ),
            _ => false,
        },
    )?;

    Ok(MmsPdu {
        transaction_id,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::NotifyRespInd(NotifyRespInd {
            notify_status: status
                .ok_or_else(|| MmsError::decode("missing notify status"))?,
        }),
    })
}

fn decode_acknowledge_ind(iter: &mut HeaderIter) -> Result<MmsPdu> {
    let mut transaction_id = None;
    let mut version = None;
    let mut ai = AcknowledgeInd::default();

    parse_headers(
        iter,
        &[
            (MMS_HEADER_TRANSACTION_ID, PRESET),
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_REPORT_ALLOWED, HeaderFlags::empty()),
        ],
        |code, f| match code {
            MMS_HEADER_TRANSACTION_ID => set(&mut transaction_id, extract_text(f)),
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_REPORT_ALLOWED => copy(&mut ai.report, extract_boolean(f)),
            _ => false,
        },
    )?;

    Ok(MmsPdu {
        transaction_id,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::AcknowledgeInd(ai),
    })
}

fn decode_delivery_ind(iter: &mut HeaderIter) -> Result<MmsPdu> {
    let mut version = None;
    let mut msgid = None;
    let mut to = None;
    let mut date = 0u64;
    let mut status = None;

    parse_headers(
        iter,
        &[
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_MESSAGE_ID, MANDATORY),
            (MMS_HEADER_TO, MANDATORY),
            (MMS_HEADER_DATE, MANDATORY),
            (MMS_HEADER_STATUS, MANDATORY),
        ],
        |code, f| match code {
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_MESSAGE_ID => set(&mut msgid, extract_text(f)),
            MMS_HEADER_TO => extract_text_array_element(f, &mut to),
            MMS_HEADER_DATE => copy(&mut date, extract_date(f)),
            MMS_HEADER_STATUS => set(
                &mut status,
                extract_short(f).and_then(DeliveryStatus::from_wire),
            ),
            _ => false,
        },
    )?;

    Ok(MmsPdu {
        transaction_id: None,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::DeliveryInd(DeliveryInd {
            dr_status: status
                .ok_or_else(|| MmsError::decode("missing delivery status"))?,
            msgid,
            to,
            date,
        }),
    })
}

fn decode_read_ind(iter: &mut HeaderIter, orig: bool) -> Result<MmsPdu> {
    let mut version = None;
    let mut ri = ReadInd {
        rr_status: ReadStatus::Read,
        msgid: None,
        to: None,
        from: None,
        date: 0,
    };
    let mut status = None;

    parse_headers(
        iter,
        &[
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_MESSAGE_ID, MANDATORY),
            (MMS_HEADER_TO, MANDATORY),
            (MMS_HEADER_FROM, MANDATORY),
            (MMS_HEADER_DATE, MANDATORY),
            (MMS_HEADER_READ_STATUS, MANDATORY),
        ],
        |code, f| match code {
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_MESSAGE_ID => set(&mut ri.msgid, extract_text(f)),
            MMS_HEADER_TO => extract_text_array_element(f, &mut ri.to),
            MMS_HEADER_FROM => match extract_from(f) {
                Some(v) => {
                    ri.from = v;
                    true
                },
                None => false,
            },
            MMS_HEADER_DATE => copy(&mut ri.date, extract_date(f)),
            MMS_HEADER_READ_STATUS => set(
                &mut status,
                extract_short(f).and_then(ReadStatus::from_wire),
            ),
            _ => false,
        },
    )?;

    ri.rr_status = status.ok_or_else(|| MmsError::decode("missing read status"))?;
    let body = if orig { PduBody::ReadOrigInd(ri) } else { PduBody::ReadRecInd(ri) };
    Ok(MmsPdu {
        transaction_id: None,
        version: version.unwrap_or(MMS_VERSION),
        body,
    })
}

fn decode_send_conf(iter: &mut HeaderIter) -> Result<MmsPdu> {
    let mut transaction_id = None;
    let mut version = None;
    let mut rsp_status = None;
    let mut msgid = None;

    parse_headers(
        iter,
        &[
            (MMS_HEADER_TRANSACTION_ID, PRESET),
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_RESPONSE_STATUS, MANDATORY),
            (MMS_HEADER_MESSAGE_ID, HeaderFlags::empty()),
        ],
        |code, f| match code {
            MMS_HEADER_TRANSACTION_ID => set(&mut transaction_id, extract_text(f)),
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_RESPONSE_STATUS => set(
                &mut rsp_status,
                extract_short(f).and_then(ResponseStatus::from_wire),
            ),
            MMS_HEADER_MESSAGE_ID => set(&mut msgid, extract_text(f)),
            _ => false,
        },
    )?;

    Ok(MmsPdu {
        transaction_id,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::SendConf(SendConf {
            rsp_status: rsp_status
                .ok_or_else(|| MmsError::decode("missing response status"))?,
            msgid,
        }),
    })
}

fn decode_retrieve_conf(iter: &mut HeaderIter, data: &Bytes) -> Result<MmsPdu> {
    let mut transaction_id = None;
    let mut version = None;
    let mut rc = RetrieveConf::default();

    parse_headers(
        iter,
        &[
            (MMS_HEADER_TRANSACTION_ID, HeaderFlags::PRESET_POS),
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_FROM, HeaderFlags::empty()),
            (MMS_HEADER_TO, ALLOW_MULTI),
            (MMS_HEADER_CC, ALLOW_MULTI),
            (MMS_HEADER_SUBJECT, HeaderFlags::empty()),
            (MMS_HEADER_MESSAGE_CLASS, HeaderFlags::empty()),
            (MMS_HEADER_PRIORITY, HeaderFlags::empty()),
            (MMS_HEADER_MESSAGE_ID, HeaderFlags::empty()),
            (MMS_HEADER_DATE, MANDATORY),
        ],
        |code, f| match code {
            MMS_HEADER_TRANSACTION_ID => set(&mut transaction_id, extract_text(f)),
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_FROM => match extract_from(f) {
                Some(v) => {
                    rc.from = v;
                    true
                },
                None => false,
            },
            MMS_HEADER_TO => extract_text_array_element(f, &mut rc.to),
            MMS_HEADER_CC => extract_text_array_element(f, &mut rc.cc),
            MMS_HEADER_SUBJECT => set(&mut rc.subject, extract_encoded_text(f)),
            MMS_HEADER_MESSAGE_CLASS => set(&mut rc.class, extract_message_class(f)),
            MMS_HEADER_PRIORITY => set(
                &mut rc.priority,
                extract_short(f).and_then(Priority::from_wire),
            ),
            MMS_HEADER_MESSAGE_ID => set(&mut rc.msgid, extract_text(f)),
            MMS_HEADER_DATE => copy(&mut rc.date, extract_date(f)),
            _ => false,
        },
    )?;

    if !iter.at_end() {
        if !iter.is_multipart() {
            return Err(MmsError::decode("trailing garbage after headers"));
        }
        rc.parts = parse_attachments(iter, data)?;
        if !iter.at_end() {
            return Err(MmsError::decode("trailing garbage after multipart"));
        }
    }

    Ok(MmsPdu {
        transaction_id,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::RetrieveConf(rc),
    })
}

fn decode_send_req(iter: &mut HeaderIter, data: &Bytes) -> Result<MmsPdu> {
    let mut transaction_id = None;
    let mut version = None;
    let mut sr = SendReq::default();

    parse_headers(
        iter,
        &[
            (MMS_HEADER_TRANSACTION_ID, PRESET),
            (MMS_HEADER_MMS_VERSION, PRESET),
            (MMS_HEADER_TO, ALLOW_MULTI),
        ],
        |code, f| match code {
            MMS_HEADER_TRANSACTION_ID => set(&mut transaction_id, extract_text(f)),
            MMS_HEADER_MMS_VERSION => set(&mut version, extract_version(f)),
            MMS_HEADER_TO => extract_text_array_element(f, &mut sr.to),
            _ => false,
        },
    )?;

    if !iter.at_end() {
        if !iter.is_multipart() {
            return Err(MmsError::decode("trailing garbage after headers"));
        }
        let ct_span = iter
            .multipart_content_type()
            .ok_or_else(|| MmsError::decode("missing multipart content type"))?;
        let ct = wsp::decode_content_type(ct_span)?;
        sr.content_type = Some(ct.media.into_owned());
        sr.parts = parse_attachments(iter, data)?;
        if !iter.at_end() {
            return Err(MmsError::decode("trailing garbage after multipart"));
        }
    }

    Ok(MmsPdu {
        transaction_id,
        version: version.unwrap_or(MMS_VERSION),
        body: PduBody::SendReq(sr),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Multipart attachments

fn parse_attachments(iter: &mut HeaderIter, data: &Bytes) -> Result<Vec<Part>> {
    let (mut mi, _outer_ct) = MultipartIter::init(iter)?;
    let mut parts = Vec::new();

    while let Some(raw) = mi.next_part()? {
        let ct = wsp::decode_content_type(raw.content_type)?;
        let charset = ParameterIter::find_charset(ct.params);
        let content_type = match charset {
            Some(cs) => format!("{};charset={cs}", ct.media),
            None => ct.media.into_owned(),
        };

        let mut content_id = None;
        let mut content_location = None;
        let mut hi = HeaderIter::new(raw.headers, HeaderIterFlags::empty());
        while let Some(field) = hi.next_field()? {
            let HeaderName::WellKnown(code) = field.name else {
                continue;
            };
            match code {
                tables::MMS_PART_HEADER_CONTENT_ID => {
                    content_id = Some(
                        extract_quoted_string(&field).ok_or_else(|| {
                            MmsError::decode("bad part Content-ID")
                        })?,
                    );
                },
                tables::MMS_PART_HEADER_CONTENT_LOCATION => {
                    content_location = Some(extract_text(&field).ok_or_else(
                        || MmsError::decode("bad part Content-Location"),
                    )?);
                },
                _ => {},
            }
        }
        if !hi.at_end() {
            return Err(MmsError::decode("trailing garbage in part headers"));
        }

        parts.push(Part {
            content_type,
            content_id,
            content_location,
            data: data.slice(raw.body_offset..raw.body_offset + raw.body.len()),
            offset: raw.body_offset,
        });
    }

    mi.close(iter)?;
    Ok(parts)
}

// Closure helpers: store an extracted value, reporting parse success.

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        },
        None => false,
    }
}

fn copy<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        },
        None => false,
    }
}
