// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! MMS PDU encoder. Writes through a small flushing buffer to any
//! `io::Write` sink; large part bodies bypass the buffer. The engine
//! encodes M-Send.req, M-Notifyresp.ind, M-Acknowledge.ind and
//! M-Read-Rec.ind; the remaining kinds are inbound-only.

use std::io::Write;

use crate::{
    codec::{
        media_type::MediaType,
        pdu::*,
        tables,
        wsp::{self, param, QUOTE},
    },
    error::{MmsError, Result},
};

const FB_SIZE: usize = 256;

/// Buffered PDU writer keeping a running total of emitted bytes.
pub struct FileBuffer<W: Write> {
    sink: W,
    buf: Vec<u8>,
    flushed: u64,
}

impl<W: Write> FileBuffer<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, buf: Vec::with_capacity(FB_SIZE), flushed: 0 }
    }

    pub fn file_size(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.sink.write_all(&self.buf)?;
            self.flushed += self.buf.len() as u64;
            self.buf.clear();
        }
        self.sink.flush()?;
        Ok(())
    }

    fn put_u8(&mut self, b: u8) -> Result<()> {
        if self.buf.len() + 1 > FB_SIZE {
            self.flush()?;
        }
        self.buf.push(b);
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > FB_SIZE {
            // Large copy: drain the buffer and hand off to the sink.
            self.flush()?;
            self.sink.write_all(bytes)?;
            self.flushed += bytes.len() as u64;
            return Ok(());
        }
        if self.buf.len() + bytes.len() > FB_SIZE {
            self.flush()?;
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn put_uintvar(&mut self, value: u32) -> Result<()> {
        let mut tmp = Vec::with_capacity(5);
        wsp::encode_uintvar(value, &mut tmp);
        self.put_slice(&tmp)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Header field encoders

fn put_short_header<W: Write>(fb: &mut FileBuffer<W>, code: u8, value: u8) -> Result<()> {
    fb.put_u8(code | 0x80)?;
    fb.put_u8(value | 0x80)
}

fn put_boolean_header<W: Write>(fb: &mut FileBuffer<W>, code: u8, value: bool) -> Result<()> {
    fb.put_u8(code | 0x80)?;
    fb.put_u8(if value { 128 } else { 129 })
}

/// From with the Insert-address token; the MMSC fills in the sender.
fn put_from_insert_address<W: Write>(fb: &mut FileBuffer<W>) -> Result<()> {
    fb.put_slice(&[tables::MMS_HEADER_FROM | 0x80, 1, 0x81])
}

/// Date as a minimum-length big-endian long-integer.
fn put_date_header<W: Write>(fb: &mut FileBuffer<W>, code: u8, date: u64) -> Result<()> {
    fb.put_u8(code | 0x80)?;
    let mut tmp = Vec::with_capacity(9);
    wsp::encode_long_integer(date, &mut tmp);
    fb.put_slice(&tmp)
}

fn put_text<W: Write>(fb: &mut FileBuffer<W>, text: &str) -> Result<()> {
    if text.as_bytes().first().is_some_and(|b| *b & 0x80 != 0) {
        fb.put_u8(QUOTE)?;
    }
    fb.put_slice(text.as_bytes())?;
    fb.put_u8(0)
}

fn put_text_header<W: Write>(fb: &mut FileBuffer<W>, code: u8, text: &str) -> Result<()> {
    fb.put_u8(code | 0x80)?;
    put_text(fb, text)
}

/// Content-ID as a quoted string, wrapped in angle brackets.
fn put_quoted_string_header<W: Write>(
    fb: &mut FileBuffer<W>,
    code: u8,
    text: &str,
) -> Result<()> {
    fb.put_u8(code | 0x80)?;
    fb.put_u8(b'"')?;
    fb.put_u8(b'<')?;
    fb.put_slice(text.as_bytes())?;
    fb.put_u8(b'>')?;
    fb.put_u8(0)
}

/// One Text-string header per comma-separated list element.
fn put_text_array_header<W: Write>(
    fb: &mut FileBuffer<W>,
    code: u8,
    list: &str,
) -> Result<()> {
    for element in list.split(',') {
        put_text_header(fb, code, element)?;
    }
    Ok(())
}

/// Content-Type general form with the `type` and `start` parameters of a
/// multipart/related body. Parameter-less well-known types collapse to
/// the single-octet form.
fn put_content_type_header<W: Write>(
    fb: &mut FileBuffer<W>,
    code: u8,
    value: &str,
) -> Result<()> {
    let parsed = MediaType::parse(value)
        .ok_or_else(|| MmsError::encode(format!("bad content type: {value}")))?;

    let mut body = Vec::new();
    match tables::code_for_content_type(&parsed.mime) {
        Some(wk) => body.push(wk | 0x80),
        None => {
            body.extend_from_slice(parsed.mime.as_bytes());
            body.push(0);
        },
    }
    for (attr, val) in &parsed.params {
        let token = if attr.eq_ignore_ascii_case("type") {
            param::CONTENT_TYPE
        } else if attr.eq_ignore_ascii_case("start") {
            param::START_DEFUNCT
        } else {
            continue;
        };
        body.push(token | 0x80);
        body.extend_from_slice(val.as_bytes());
        body.push(0);
    }

    if body.len() == 1 {
        return put_short_header(fb, code, body[0] & 0x7f);
    }

    fb.put_u8(code | 0x80)?;
    let mut framed = Vec::with_capacity(body.len() + 5);
    wsp::encode_value_length(body.len(), &mut framed);
    framed.extend_from_slice(&body);
    fb.put_slice(&framed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Multipart parts

/// Builds the part header block (content type with charset, Content-ID,
/// Content-Location and, for non-SMIL parts, Content-Disposition).
fn part_header_bytes(part: &Part) -> Result<Vec<u8>> {
    let parsed = MediaType::parse(&part.content_type).ok_or_else(|| {
        MmsError::encode(format!("bad part content type: {}", part.content_type))
    })?;
    let is_smil = parsed.mime == tables::CONTENT_TYPE_SMIL;

    // Content type with its charset parameter, value-length framed.
    let mut ct = Vec::new();
    match tables::code_for_content_type(&parsed.mime) {
        Some(wk) => ct.push(wk | 0x80),
        None => {
            ct.extend_from_slice(parsed.mime.as_bytes());
            ct.push(0);
        },
    }
    if let Some(cs) = parsed.param("charset") {
        let mib = tables::mib_for_charset(cs)
            .ok_or_else(|| MmsError::encode(format!("unknown charset: {cs}")))?;
        ct.push(param::CHARSET | 0x80);
        wsp::encode_integer(u64::from(mib), &mut ct);
    }

    let mut out = Vec::new();
    wsp::encode_value_length(ct.len(), &mut out);
    out.extend_from_slice(&ct);

    if let Some(id) = &part.content_id {
        out.push(tables::MMS_PART_HEADER_CONTENT_ID | 0x80);
        out.push(b'"');
        out.push(b'<');
        out.extend_from_slice(id.as_bytes());
        out.push(b'>');
        out.push(0);
    }

    if let Some(location) = &part.content_location {
        out.push(tables::MMS_PART_HEADER_CONTENT_LOCATION | 0x80);
        if location.as_bytes().first().is_some_and(|b| *b & 0x80 != 0) {
            out.push(QUOTE);
        }
        out.extend_from_slice(location.as_bytes());
        out.push(0);

        if !is_smil {
            // Content-Disposition: Inline with a Filename parameter.
            let mut cd = vec![0x82, param::FILENAME_DEFUNCT | 0x80];
            cd.extend_from_slice(location.as_bytes());
            cd.push(0);
            out.push(tables::MMS_PART_HEADER_CONTENT_DISPOSITION | 0x80);
            wsp::encode_value_length(cd.len(), &mut out);
            out.extend_from_slice(&cd);
        }
    }

    Ok(out)
}

fn put_part<W: Write>(fb: &mut FileBuffer<W>, part: &Part) -> Result<()> {
    let headers = part_header_bytes(part)?;
    fb.put_uintvar(headers.len() as u32)?;
    fb.put_uintvar(part.data.len() as u32)?;
    fb.put_slice(&headers)?;
    fb.put_slice(&part.data)
}

// ─────────────────────────────────────────────────────────────────────────────
// PDU encoders

fn transaction_id(pdu: &MmsPdu) -> Result<&str> {
    pdu.transaction_id
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MmsError::encode("missing transaction id"))
}

fn encode_send_req<W: Write>(pdu: &MmsPdu, sr: &SendReq, fb: &mut FileBuffer<W>) -> Result<()> {
    put_short_header(fb, tables::MMS_HEADER_MESSAGE_TYPE, MessageType::SendReq as u8)?;
    put_text_header(fb, tables::MMS_HEADER_TRANSACTION_ID, transaction_id(pdu)?)?;
    put_short_header(fb, tables::MMS_HEADER_MMS_VERSION, pdu.version)?;
    put_from_insert_address(fb)?;
    if let Some(to) = &sr.to {
        put_text_array_header(fb, tables::MMS_HEADER_TO, to)?;
    }
    if let Some(cc) = &sr.cc {
        put_text_array_header(fb, tables::MMS_HEADER_CC, cc)?;
    }
    if let Some(bcc) = &sr.bcc {
        put_text_array_header(fb, tables::MMS_HEADER_BCC, bcc)?;
    }
    if let Some(subject) = &sr.subject {
        put_text_header(fb, tables::MMS_HEADER_SUBJECT, subject)?;
    }
    put_boolean_header(fb, tables::MMS_HEADER_DELIVERY_REPORT, sr.dr)?;
    put_boolean_header(fb, tables::MMS_HEADER_READ_REPORT, sr.rr)?;
    if let Some(ct) = &sr.content_type {
        put_content_type_header(fb, tables::MMS_HEADER_CONTENT_TYPE, ct)?;
    }

    if !sr.parts.is_empty() {
        fb.put_uintvar(sr.parts.len() as u32)?;
        for part in &sr.parts {
            put_part(fb, part)?;
        }
    }
    fb.flush()
}

fn encode_notify_resp_ind<W: Write>(
    pdu: &MmsPdu,
    nri: &NotifyRespInd,
    fb: &mut FileBuffer<W>,
) -> Result<()> {
    put_short_header(fb, tables::MMS_HEADER_MESSAGE_TYPE, MessageType::NotifyRespInd as u8)?;
    put_text_header(fb, tables::MMS_HEADER_TRANSACTION_ID, transaction_id(pdu)?)?;
    put_short_header(fb, tables::MMS_HEADER_MMS_VERSION, pdu.version)?;
    put_short_header(fb, tables::MMS_HEADER_STATUS, nri.notify_status as u8)?;
    fb.flush()
}

fn encode_acknowledge_ind<W: Write>(
    pdu: &MmsPdu,
    ai: &AcknowledgeInd,
    fb: &mut FileBuffer<W>,
) -> Result<()> {
    put_short_header(fb, tables::MMS_HEADER_MESSAGE_TYPE, MessageType::AcknowledgeInd as u8)?;
    put_text_header(fb, tables::MMS_HEADER_TRANSACTION_ID, transaction_id(pdu)?)?;
    put_short_header(fb, tables::MMS_HEADER_MMS_VERSION, pdu.version)?;
    put_boolean_header(fb, tables::MMS_HEADER_REPORT_ALLOWED, ai.report)?;
    fb.flush()
}

fn encode_read_rec_ind<W: Write>(
    pdu: &MmsPdu,
    ri: &ReadInd,
    fb: &mut FileBuffer<W>,
) -> Result<()> {
    put_short_header(fb, tables::MMS_HEADER_MESSAGE_TYPE, MessageType::ReadRecInd as u8)?;
    put_short_header(fb, tables::MMS_HEADER_MMS_VERSION, pdu.version)?;
    let msgid = ri
        .msgid
        .as_deref()
        .ok_or_else(|| MmsError::encode("missing message id"))?;
    put_text_header(fb, tables::MMS_HEADER_MESSAGE_ID, msgid)?;
    let to = ri
        .to
        .as_deref()
        .ok_or_else(|| MmsError::encode("missing recipient"))?;
    put_text_array_header(fb, tables::MMS_HEADER_TO, to)?;
    put_from_insert_address(fb)?;
    put_date_header(fb, tables::MMS_HEADER_DATE, ri.date)?;
    put_short_header(fb, tables::MMS_HEADER_READ_STATUS, ri.rr_status as u8)?;
    fb.flush()
}

/// Encodes a PDU to the sink, returning the number of bytes written.
pub fn encode_message<W: Write>(pdu: &MmsPdu, sink: W) -> Result<u64> {
    let mut fb = FileBuffer::new(sink);
    match &pdu.body {
        PduBody::SendReq(sr) => encode_send_req(pdu, sr, &mut fb)?,
        PduBody::NotifyRespInd(nri) => encode_notify_resp_ind(pdu, nri, &mut fb)?,
        PduBody::AcknowledgeInd(ai) => encode_acknowledge_ind(pdu, ai, &mut fb)?,
        PduBody::ReadRecInd(ri) => encode_read_rec_ind(pdu, ri, &mut fb)?,
        other => {
            return Err(MmsError::encode(format!(
                "{:?} is not an outbound PDU kind",
                other.message_type()
            )));
        },
    }
    Ok(fb.file_size())
}

/// Convenience wrapper returning the encoded PDU as a byte vector.
pub fn encode_to_vec(pdu: &MmsPdu) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_message(pdu, &mut out)?;
    Ok(out)
}
