use anyhow::Result;
use hex_literal::hex;
use mms_engine_rs::codec::wsp::{
    self, HeaderIter, HeaderIterFlags, HeaderName, MultipartIter, ValueType,
};

#[test]
fn uintvar_round_trip_across_range() -> Result<()> {
    // Boundary values across the whole 32-bit range.
    let samples: &[u32] = &[
        0,
        1,
        0x7f,
        0x80,
        0x3fff,
        0x4000,
        0x1f_ffff,
        0x20_0000,
        0xfff_ffff,
        0x1000_0000,
        0x7fff_ffff,
        0xffff_ffff,
    ];
    for &value in samples {
        let mut buf = Vec::new();
        wsp::encode_uintvar(value, &mut buf);
        let (decoded, used) = wsp::decode_uintvar(&buf)?;
        assert_eq!(decoded, value);
        assert_eq!(used, buf.len(), "minimum-length form for {value:#x}");
    }
    Ok(())
}

#[test]
fn uintvar_decode_fails_on_truncation() {
    assert!(wsp::decode_uintvar(&[0x80]).is_err());
    assert!(wsp::decode_uintvar(&[0xff, 0xff]).is_err());
    assert!(wsp::decode_uintvar(&[]).is_err());
}

#[test]
fn integer_value_forms() -> Result<()> {
    // Short-integer for values under 128.
    let mut buf = Vec::new();
    wsp::encode_integer(0x45, &mut buf);
    assert_eq!(buf, [0xc5]);
    assert_eq!(wsp::decode_integer(&buf)?, (0x45, 1));

    // Long-integer in minimum length.
    buf.clear();
    wsp::encode_integer(0x1234, &mut buf);
    assert_eq!(buf, hex!("02 12 34"));
    assert_eq!(wsp::decode_integer(&buf)?, (0x1234, 3));

    buf.clear();
    wsp::encode_long_integer(0x0100_0000, &mut buf);
    assert_eq!(buf, hex!("04 01 00 00 00"));
    Ok(())
}

#[test]
fn value_length_escape() -> Result<()> {
    let mut buf = Vec::new();
    wsp::encode_value_length(12, &mut buf);
    assert_eq!(buf, [12]);

    buf.clear();
    wsp::encode_value_length(300, &mut buf);
    assert_eq!(buf[0], 0x1f);
    let (len, used) = wsp::decode_value_length(&buf)?;
    assert_eq!((len, used), (300, buf.len()));
    Ok(())
}

#[test]
fn header_value_type_inference() -> Result<()> {
    // Short value, long value, text value in one block.
    let block = [
        0x8c, 0x82, // well-known 0x0c, short 0x82
        0x85, 0x02, 0x01, 0x00, // well-known 0x05, 2-byte long
        0x98, b'a', b'b', 0x00, // well-known 0x18, text "ab"
    ];
    let mut iter = HeaderIter::new(&block, HeaderIterFlags::REJECT_CP);

    let h1 = iter.next_field()?.expect("first header");
    assert_eq!(h1.name, HeaderName::WellKnown(0x0c));
    assert_eq!(h1.value_type, ValueType::Short);
    assert_eq!(h1.value, [0x82]);

    let h2 = iter.next_field()?.expect("second header");
    assert_eq!(h2.value_type, ValueType::Long);
    assert_eq!(h2.value, [0x01, 0x00]);

    let h3 = iter.next_field()?.expect("third header");
    assert_eq!(h3.value_type, ValueType::Text);
    assert_eq!(h3.value, b"ab\0");

    assert!(iter.next_field()?.is_none());
    assert!(iter.at_end());
    Ok(())
}

#[test]
fn application_headers_are_exposed_by_name() -> Result<()> {
    let mut block = Vec::new();
    block.extend_from_slice(b"X-Custom\0value\0");
    let mut iter = HeaderIter::new(&block, HeaderIterFlags::empty());
    let field = iter.next_field()?.expect("header");
    assert_eq!(field.name, HeaderName::Application("X-Custom"));
    assert_eq!(field.value, b"value\0");
    Ok(())
}

/// One multipart part: headers_len/body_len framing plus a short-form
/// content type.
fn push_part(out: &mut Vec<u8>, ct: u8, headers: &[u8], body: &[u8]) {
    wsp::encode_uintvar((1 + headers.len()) as u32, out);
    wsp::encode_uintvar(body.len() as u32, out);
    out.push(ct | 0x80);
    out.extend_from_slice(headers);
    out.extend_from_slice(body);
}

fn multipart_block(trailing_garbage: bool) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(0x84); // Content-Type
    out.push(0xa3); // application/vnd.wap.multipart.mixed
    out.push(2); // part count
    push_part(&mut out, 0x03, &[], b"hello"); // text/plain
    push_part(&mut out, 0x1e, &[], &[0xff, 0xd8, 0xff]); // image/jpeg
    if trailing_garbage {
        out.push(0xab);
    }
    out
}

#[test]
fn multipart_lengths_cover_the_region() -> Result<()> {
    let block = multipart_block(false);
    let mut iter = HeaderIter::new(
        &block,
        HeaderIterFlags::DETECT_MMS_MULTIPART | HeaderIterFlags::REJECT_CP,
    );
    assert!(iter.next_field()?.is_none());
    assert!(iter.is_multipart());

    let (mut parts, outer) = MultipartIter::init(&iter)?;
    let ct = wsp::decode_content_type(outer)?;
    assert_eq!(ct.media, "application/vnd.wap.multipart.mixed");

    let p1 = parts.next_part()?.expect("first part");
    assert_eq!(p1.body, b"hello");
    let p1_ct = wsp::decode_content_type(p1.content_type)?;
    assert_eq!(p1_ct.media, "text/plain");
    // Body offsets point into the source buffer without copying.
    assert_eq!(&block[p1.body_offset..p1.body_offset + 5], b"hello");

    let p2 = parts.next_part()?.expect("second part");
    assert_eq!(p2.body, [0xff, 0xd8, 0xff]);
    assert!(parts.next_part()?.is_none());

    parts.close(&mut iter)?;
    assert!(iter.at_end());
    Ok(())
}

#[test]
fn multipart_with_trailing_garbage_is_not_at_end() -> Result<()> {
    let block = multipart_block(true);
    let mut iter = HeaderIter::new(
        &block,
        HeaderIterFlags::DETECT_MMS_MULTIPART | HeaderIterFlags::REJECT_CP,
    );
    assert!(iter.next_field()?.is_none());
    let (mut parts, _) = MultipartIter::init(&iter)?;
    while parts.next_part()?.is_some() {}
    parts.close(&mut iter)?;
    assert!(!iter.at_end());
    Ok(())
}

#[test]
fn encoded_string_transcodes_charsets() -> Result<()> {
    // (Value-len)(charset 106)(text) passes through as UTF-8.
    let value = [0xea, b'h', b'i', 0x00];
    let s = wsp::decode_encoded_string(&value, ValueType::Long)?;
    assert_eq!(s, "hi");

    // windows-1252 0xe9 is "é".
    let value = [2, 0x08, 0xcc, 0xe9, 0x00];
    let (mib, used) = wsp::decode_integer(&value)?;
    assert_eq!((mib, used), (2252, 3)); // ensure the layout is what we think
    let s = wsp::decode_encoded_string(&value, ValueType::Long)?;
    assert_eq!(s, "é");
    Ok(())
}
