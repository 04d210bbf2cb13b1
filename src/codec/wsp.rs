// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! WSP value primitives and iterators (OMA-WAP-230).
//!
//! Everything here works on borrowed byte slices; header, multipart and
//! parameter iterators expose value spans without copying so that PDU
//! bodies can be sliced zero-copy out of the source buffer.

use std::borrow::Cow;

use bitflags::bitflags;

use crate::{
    codec::tables,
    error::{MmsError, Result},
};

/// Quote octet prepended to a Text-string whose first byte is >= 0x80.
pub const QUOTE: u8 = 0x7f;

/// Short-length values above this need the Uintvar escape (0x1F).
pub const MAX_SHORT_LENGTH: u8 = 30;
const LENGTH_QUOTE: u8 = 0x1f;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderIterFlags: u32 {
        /// Fail when a code-page shift octet shows up in the name position.
        const REJECT_CP = 0x01;
        /// Stop at a multipart Content-Type header and expose it separately.
        const DETECT_MMS_MULTIPART = 0x02;
    }
}

/// Value shape inferred from the first octet of a header value span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Single octet with the high bit set.
    Short,
    /// Length-prefixed payload; the span excludes the length indicator.
    Long,
    /// NUL-terminated text; the span includes the terminator.
    Text,
}

// ─────────────────────────────────────────────────────────────────────────────
// Integer primitives

/// Decodes a Uintvar: 7 bits per octet, high bit set on all but the last.
pub fn decode_uintvar(buf: &[u8]) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    for (i, b) in buf.iter().enumerate() {
        if i >= 5 {
            return Err(MmsError::decode("uintvar longer than 5 octets"));
        }
        value = (value << 7) | u32::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(MmsError::decode("truncated uintvar"))
}

/// Encodes a Uintvar in minimum-length form.
pub fn encode_uintvar(mut value: u32, out: &mut Vec<u8>) {
    let mut octets = [0u8; 5];
    let mut n = 0;
    loop {
        octets[n] = (value & 0x7f) as u8;
        value >>= 7;
        n += 1;
        if value == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let cont = if i == 0 { 0 } else { 0x80 };
        out.push(octets[i] | cont);
    }
}

/// Decodes an Integer-value: either a Short-integer or a Long-integer.
pub fn decode_integer(buf: &[u8]) -> Result<(u64, usize)> {
    let first = *buf
        .first()
        .ok_or_else(|| MmsError::decode("empty integer value"))?;
    if first & 0x80 != 0 {
        return Ok((u64::from(first & 0x7f), 1));
    }
    decode_long_integer(buf)
}

/// Decodes a Long-integer: Short-length followed by 1-30 big-endian octets.
pub fn decode_long_integer(buf: &[u8]) -> Result<(u64, usize)> {
    let len = *buf
        .first()
        .ok_or_else(|| MmsError::decode("empty long-integer"))? as usize;
    if len == 0 || len > MAX_SHORT_LENGTH as usize {
        return Err(MmsError::decode("bad long-integer length"));
    }
    let payload = buf
        .get(1..1 + len)
        .ok_or_else(|| MmsError::decode("truncated long-integer"))?;
    if len > 8 {
        return Err(MmsError::decode("long-integer exceeds 8 octets"));
    }
    let mut value: u64 = 0;
    for b in payload {
        value = (value << 8) | u64::from(*b);
    }
    Ok((value, 1 + len))
}

/// Encodes an Integer-value in the shortest form.
pub fn encode_integer(value: u64, out: &mut Vec<u8>) {
    if value < 0x80 {
        out.push(value as u8 | 0x80);
    } else {
        encode_long_integer(value, out);
    }
}

/// Encodes a Long-integer with the minimum number of payload octets.
pub fn encode_long_integer(value: u64, out: &mut Vec<u8>) {
    let octets = value.to_be_bytes();
    let skip = octets.iter().take(7).take_while(|b| **b == 0).count();
    out.push((8 - skip) as u8);
    out.extend_from_slice(&octets[skip..]);
}

/// Decodes a Value-length: short-length octet or 0x1F-prefixed Uintvar.
pub fn decode_value_length(buf: &[u8]) -> Result<(usize, usize)> {
    let first = *buf
        .first()
        .ok_or_else(|| MmsError::decode("empty value-length"))?;
    if first <= MAX_SHORT_LENGTH {
        Ok((first as usize, 1))
    } else if first == LENGTH_QUOTE {
        let (len, used) = decode_uintvar(&buf[1..])?;
        Ok((len as usize, used + 1))
    } else {
        Err(MmsError::decode("bad value-length indicator"))
    }
}

/// Encodes a Value-length.
pub fn encode_value_length(len: usize, out: &mut Vec<u8>) {
    if len <= MAX_SHORT_LENGTH as usize {
        out.push(len as u8);
    } else {
        out.push(LENGTH_QUOTE);
        encode_uintvar(len as u32, out);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Text primitives

/// Decodes a NUL-terminated Text-string, stripping the 0x7F quote octet.
pub fn decode_text_string(buf: &[u8]) -> Result<(&str, usize)> {
    let nul = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| MmsError::decode("unterminated text-string"))?;
    let mut text = &buf[..nul];
    if text.first() == Some(&QUOTE) {
        text = &text[1..];
    }
    let s = std::str::from_utf8(text)
        .map_err(|_| MmsError::decode("text-string is not valid UTF-8"))?;
    Ok((s, nul + 1))
}

/// Decodes a Quoted-string: a leading 0x22 followed by NUL-terminated text.
pub fn decode_quoted_string(buf: &[u8]) -> Result<(&str, usize)> {
    if buf.first() != Some(&b'"') {
        return Err(MmsError::decode("missing quoted-string marker"));
    }
    let (s, used) = decode_text_string(&buf[1..])?;
    Ok((s, used + 1))
}

/// Decodes Token-text (same wire shape as Text-string, no quote handling).
pub fn decode_token_text(buf: &[u8]) -> Result<(&str, usize)> {
    let nul = buf
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| MmsError::decode("unterminated token-text"))?;
    let s = std::str::from_utf8(&buf[..nul])
        .map_err(|_| MmsError::decode("token-text is not valid UTF-8"))?;
    Ok((s, nul + 1))
}

/// Encodes a Text-string, prepending the quote octet when necessary.
pub fn encode_text_string(text: &str, out: &mut Vec<u8>) {
    if text.as_bytes().first().is_some_and(|b| *b & 0x80 != 0) {
        out.push(QUOTE);
    }
    out.extend_from_slice(text.as_bytes());
    out.push(0);
}

/// Decodes an Encoded-string-value to UTF-8. MIB 106 passes through, any
/// other charset is transcoded via its IANA name.
pub fn decode_encoded_string(buf: &[u8], value_type: ValueType) -> Result<String> {
    match value_type {
        ValueType::Text => {
            let (s, _) = decode_text_string(buf)?;
            Ok(s.to_string())
        },
        ValueType::Long => {
            let (mib, used) = decode_integer(buf)?;
            let text = &buf[used..];
            let text = text.strip_suffix(&[0][..]).unwrap_or(text);
            let text = if text.first() == Some(&QUOTE) { &text[1..] } else { text };
            if mib == 106 {
                return Ok(String::from_utf8(text.to_vec())
                    .map_err(|_| MmsError::decode("bad UTF-8 in encoded string"))?);
            }
            let charset = tables::charset_for_mib(mib as u32)
                .ok_or_else(|| MmsError::decode(format!("unknown charset MIB {mib}")))?;
            let enc = encoding_rs::Encoding::for_label(charset.as_bytes())
                .ok_or_else(|| MmsError::decode(format!("unsupported charset {charset}")))?;
            let (decoded, _, _) = enc.decode(text);
            Ok(decoded.into_owned())
        },
        ValueType::Short => Err(MmsError::decode("short value is not a string")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Header iteration

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderName<'a> {
    /// Low 7 bits of a name octet with the high bit set.
    WellKnown(u8),
    /// Application-defined header, carried as token text.
    Application(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderField<'a> {
    pub name: HeaderName<'a>,
    pub value: &'a [u8],
    pub value_type: ValueType,
}

/// Iterates the (name, value) pairs of a WSP header block.
#[derive(Debug)]
pub struct HeaderIter<'a> {
    pdu: &'a [u8],
    pos: usize,
    flags: HeaderIterFlags,
    multipart_ct: Option<&'a [u8]>,
}

impl<'a> HeaderIter<'a> {
    pub fn new(pdu: &'a [u8], flags: HeaderIterFlags) -> Self {
        Self { pdu, pos: 0, flags, multipart_ct: None }
    }

    pub fn pdu(&self) -> &'a [u8] {
        self.pdu
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.pdu.len()
    }

    /// True once the iterator stopped at a multipart Content-Type header.
    pub fn is_multipart(&self) -> bool {
        self.multipart_ct.is_some()
    }

    /// Content-Type value span recorded by DETECT_MMS_MULTIPART.
    pub fn multipart_content_type(&self) -> Option<&'a [u8]> {
        self.multipart_ct
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advances to the next header. `Ok(None)` means end of block or a
    /// detected multipart boundary.
    pub fn next_field(&mut self) -> Result<Option<HeaderField<'a>>> {
        if self.at_end() || self.multipart_ct.is_some() {
            return Ok(None);
        }
        let first = self.pdu[self.pos];

        let name = if first & 0x80 != 0 {
            self.pos += 1;
            HeaderName::WellKnown(first & 0x7f)
        } else if first == 0 || first < 32 {
            // Code page shifts and other control octets.
            if self.flags.contains(HeaderIterFlags::REJECT_CP) {
                return Err(MmsError::decode(format!(
                    "unexpected control octet 0x{first:02x} in header name"
                )));
            }
            return Err(MmsError::decode("capability encoding not supported"));
        } else {
            let (text, used) = decode_token_text(&self.pdu[self.pos..])?;
            self.pos += used;
            HeaderName::Application(text)
        };

        let value_start = self.pos;
        let (value, value_type) = self.read_value()?;

        if self.flags.contains(HeaderIterFlags::DETECT_MMS_MULTIPART)
            && name == HeaderName::WellKnown(tables::MMS_HEADER_CONTENT_TYPE)
        {
            // The full general-form span, value-length framing included.
            let full = &self.pdu[value_start..self.pos];
            if is_multipart_content_type(full) {
                self.multipart_ct = Some(full);
                self.pos = value_start;
                return Ok(None);
            }
        }

        Ok(Some(HeaderField { name, value, value_type }))
    }

    fn read_value(&mut self) -> Result<(&'a [u8], ValueType)> {
        let first = *self
            .pdu
            .get(self.pos)
            .ok_or_else(|| MmsError::decode("missing header value"))?;
        if first & 0x80 != 0 {
            let span = &self.pdu[self.pos..self.pos + 1];
            self.pos += 1;
            Ok((span, ValueType::Short))
        } else if first <= MAX_SHORT_LENGTH {
            let len = first as usize;
            let span = self
                .pdu
                .get(self.pos + 1..self.pos + 1 + len)
                .ok_or_else(|| MmsError::decode("truncated long header value"))?;
            self.pos += 1 + len;
            Ok((span, ValueType::Long))
        } else if first == LENGTH_QUOTE {
            let (len, used) = decode_uintvar(&self.pdu[self.pos + 1..])?;
            let start = self.pos + 1 + used;
            let span = self
                .pdu
                .get(start..start + len as usize)
                .ok_or_else(|| MmsError::decode("truncated long header value"))?;
            self.pos = start + len as usize;
            Ok((span, ValueType::Long))
        } else {
            let rest = &self.pdu[self.pos..];
            let nul = rest
                .iter()
                .position(|b| *b == 0)
                .ok_or_else(|| MmsError::decode("unterminated text header value"))?;
            let span = &rest[..=nul];
            self.pos += nul + 1;
            Ok((span, ValueType::Text))
        }
    }
}

fn is_multipart_content_type(value: &[u8]) -> bool {
    match decode_content_type(value) {
        Ok(ct) => ct.media.starts_with("application/vnd.wap.multipart."),
        Err(_) => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content-type general form

#[derive(Debug)]
pub struct ContentType<'a> {
    /// Media type, either from the well-known table or carried as text.
    pub media: Cow<'a, str>,
    /// Raw parameter span following the media type (may be empty).
    pub params: &'a [u8],
    pub consumed: usize,
}

/// Decodes a Content-type-value: well-known short integer, token text, or
/// a value-length framed media type with parameters.
pub fn decode_content_type(buf: &[u8]) -> Result<ContentType<'_>> {
    let first = *buf
        .first()
        .ok_or_else(|| MmsError::decode("empty content type"))?;
    if first & 0x80 != 0 {
        let media = tables::content_type_for_code(first & 0x7f)
            .ok_or_else(|| MmsError::decode(format!(
                "unknown well-known content type 0x{:02x}",
                first & 0x7f
            )))?;
        return Ok(ContentType { media: Cow::Borrowed(media), params: &[], consumed: 1 });
    }
    if first <= MAX_SHORT_LENGTH || first == LENGTH_QUOTE {
        let (len, used) = decode_value_length(buf)?;
        let region = buf
            .get(used..used + len)
            .ok_or_else(|| MmsError::decode("truncated content type"))?;
        let media_first = *region
            .first()
            .ok_or_else(|| MmsError::decode("empty content type region"))?;
        let (media, media_used): (Cow<'_, str>, usize) = if media_first & 0x80 != 0 {
            let name = tables::content_type_for_code(media_first & 0x7f)
                .ok_or_else(|| MmsError::decode(format!(
                    "unknown well-known content type 0x{:02x}",
                    media_first & 0x7f
                )))?;
            (Cow::Borrowed(name), 1)
        } else {
            let (text, text_used) = decode_token_text(region)?;
            (Cow::Borrowed(text), text_used)
        };
        return Ok(ContentType {
            media,
            params: &region[media_used..],
            consumed: used + len,
        });
    }
    let (text, used) = decode_token_text(buf)?;
    Ok(ContentType { media: Cow::Borrowed(text), params: &[], consumed: used })
}

// ─────────────────────────────────────────────────────────────────────────────
// Content-type parameters

/// Well-known parameter tokens (WSP table 38).
pub mod param {
    pub const Q: u8 = 0x00;
    pub const CHARSET: u8 = 0x01;
    pub const LEVEL: u8 = 0x02;
    pub const TYPE: u8 = 0x03;
    pub const NAME_DEFUNCT: u8 = 0x05;
    pub const FILENAME_DEFUNCT: u8 = 0x06;
    pub const DIFFERENCES: u8 = 0x07;
    pub const PADDING: u8 = 0x08;
    pub const CONTENT_TYPE: u8 = 0x09;
    pub const START_DEFUNCT: u8 = 0x0a;
    pub const START_INFO_DEFUNCT: u8 = 0x0b;
    pub const COMMENT_DEFUNCT: u8 = 0x0c;
    pub const DOMAIN_DEFUNCT: u8 = 0x0d;
    pub const MAX_AGE: u8 = 0x0e;
    pub const PATH_DEFUNCT: u8 = 0x0f;
    pub const SECURE: u8 = 0x10;
    pub const SEC: u8 = 0x11;
    pub const MAC: u8 = 0x12;
    pub const CREATION_DATE: u8 = 0x13;
    pub const MODIFICATION_DATE: u8 = 0x14;
    pub const READ_DATE: u8 = 0x15;
    pub const SIZE: u8 = 0x16;
    pub const NAME: u8 = 0x17;
    pub const FILENAME: u8 = 0x18;
    pub const START: u8 = 0x19;
    pub const START_INFO: u8 = 0x1a;
    pub const COMMENT: u8 = 0x1b;
    pub const DOMAIN: u8 = 0x1c;
    pub const PATH: u8 = 0x1d;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamId<'a> {
    WellKnown(u8),
    Token(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue<'a> {
    Integer(u64),
    Text(&'a str),
    /// Q-value in the compact non-linear WSP scale.
    Q(u32),
    DeltaSeconds(u32),
    /// Seconds since the epoch, from a date long-integer.
    Date(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WspParameter<'a> {
    pub id: ParamId<'a>,
    pub value: ParamValue<'a>,
}

/// Iterates parameters inside a content-type value-length region.
#[derive(Debug)]
pub struct ParameterIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ParameterIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Scans for the charset parameter and resolves its IANA name.
    pub fn find_charset(buf: &'a [u8]) -> Option<&'static str> {
        let mut iter = Self::new(buf);
        while let Ok(Some(p)) = iter.next_param() {
            if p.id == ParamId::WellKnown(param::CHARSET) {
                if let ParamValue::Integer(mib) = p.value {
                    return tables::charset_for_mib(mib as u32);
                }
            }
        }
        None
    }

    pub fn next_param(&mut self) -> Result<Option<WspParameter<'a>>> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let rest = &self.buf[self.pos..];
        let first = rest[0];
        if first & 0x80 != 0 {
            let token = first & 0x7f;
            let (value, used) = self.typed_value(token, &rest[1..])?;
            self.pos += 1 + used;
            Ok(Some(WspParameter { id: ParamId::WellKnown(token), value }))
        } else {
            let (name, name_used) = decode_token_text(rest)?;
            let (value, used) = self.untyped_value(&rest[name_used..])?;
            self.pos += name_used + used;
            Ok(Some(WspParameter { id: ParamId::Token(name), value }))
        }
    }

    fn typed_value(&self, token: u8, buf: &'a [u8]) -> Result<(ParamValue<'a>, usize)> {
        match token {
            param::Q => {
                let (v, used) = decode_uintvar(buf)?;
                Ok((ParamValue::Q(v), used))
            },
            param::CHARSET | param::SEC | param::SIZE | param::PADDING
            | param::LEVEL => {
                let (v, used) = decode_integer(buf)?;
                Ok((ParamValue::Integer(v), used))
            },
            param::MAX_AGE => {
                let (v, used) = decode_integer(buf)?;
                Ok((ParamValue::DeltaSeconds(v as u32), used))
            },
            param::CREATION_DATE | param::MODIFICATION_DATE | param::READ_DATE => {
                let (v, used) = decode_long_integer(buf)?;
                Ok((ParamValue::Date(v), used))
            },
            param::TYPE => self.untyped_value(buf),
            _ => {
                let (s, used) = decode_text_string(buf)?;
                Ok((ParamValue::Text(s), used))
            },
        }
    }

    fn untyped_value(&self, buf: &'a [u8]) -> Result<(ParamValue<'a>, usize)> {
        let first = *buf
            .first()
            .ok_or_else(|| MmsError::decode("missing parameter value"))?;
        if first & 0x80 != 0 || first <= MAX_SHORT_LENGTH {
            let (v, used) = decode_integer(buf)?;
            Ok((ParamValue::Integer(v), used))
        } else {
            let (s, used) = decode_text_string(buf)?;
            Ok((ParamValue::Text(s), used))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Multipart framing

#[derive(Debug)]
pub struct MultipartPart<'a> {
    /// Content-type span at the part start (general form).
    pub content_type: &'a [u8],
    /// Part headers following the content type.
    pub headers: &'a [u8],
    pub body: &'a [u8],
    /// Absolute offset of the body within the source PDU.
    pub body_offset: usize,
}

/// Iterates the parts of a WSP multipart body.
#[derive(Debug)]
pub struct MultipartIter<'a> {
    pdu: &'a [u8],
    pos: usize,
    remaining: u32,
}

impl<'a> MultipartIter<'a> {
    /// Starts multipart iteration where a DETECT_MMS_MULTIPART header
    /// iterator stopped. Returns the iterator and the outer content-type
    /// span.
    pub fn init(iter: &HeaderIter<'a>) -> Result<(Self, &'a [u8])> {
        let ct = iter
            .multipart_content_type()
            .ok_or_else(|| MmsError::decode("not positioned at a multipart body"))?;
        let decoded = decode_content_type(ct)?;
        // The header iterator is parked on the content-type value; the part
        // count follows it.
        let body_pos = iter.position() + decoded.consumed;
        let pdu = iter.pdu();
        let (count, used) = decode_uintvar(
            pdu.get(body_pos..)
                .ok_or_else(|| MmsError::decode("truncated multipart header"))?,
        )?;
        Ok((
            Self { pdu, pos: body_pos + used, remaining: count },
            ct,
        ))
    }

    pub fn next_part(&mut self) -> Result<Option<MultipartPart<'a>>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;

        let rest = &self.pdu[self.pos..];
        let (headers_len, u1) = decode_uintvar(rest)?;
        let (body_len, u2) = decode_uintvar(&rest[u1..])?;
        let headers_start = self.pos + u1 + u2;

        let header_region = self
            .pdu
            .get(headers_start..headers_start + headers_len as usize)
            .ok_or_else(|| MmsError::decode("truncated multipart part headers"))?;
        let ct = decode_content_type(header_region)?;
        let ct_len = ct.consumed;
        if ct_len > headers_len as usize {
            return Err(MmsError::decode("part content type exceeds header length"));
        }

        let body_offset = headers_start + headers_len as usize;
        let body = self
            .pdu
            .get(body_offset..body_offset + body_len as usize)
            .ok_or_else(|| MmsError::decode("truncated multipart part body"))?;

        self.pos = body_offset + body_len as usize;
        Ok(Some(MultipartPart {
            content_type: &header_region[..ct_len],
            headers: &header_region[ct_len..],
            body,
            body_offset,
        }))
    }

    /// Hands the consumed region back to the header iterator; the caller
    /// can then verify `at_end` to enforce the length invariant.
    pub fn close(self, iter: &mut HeaderIter<'a>) -> Result<()> {
        if self.remaining != 0 {
            return Err(MmsError::decode("multipart closed before all parts"));
        }
        iter.set_position(self.pos);
        Ok(())
    }
}
