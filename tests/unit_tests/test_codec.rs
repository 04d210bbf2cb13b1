use std::fs;

use anyhow::Result;
use bytes::Bytes;
use hex::FromHex;
use mms_engine_rs::codec::{
    decode::decode_message,
    encode::encode_to_vec,
    pdu::*,
};

use super::build_notification;

#[test]
fn notification_fixture_matches_builder() -> Result<()> {
    let hex_str = fs::read_to_string("tests/fixtures/m-notification.ind.hex")?
        .replace(|c: char| c.is_whitespace(), "");
    let bytes = Vec::from_hex(&hex_str).expect("failed to decode hex fixture");
    assert_eq!(
        bytes,
        build_notification(
            "Tx-Fixture",
            "+15551234567/TYPE=PLMN",
            "http://mmsc.example.org/m/7",
            0x6000_0000,
        ),
        "PDU bytes do not match fixture"
    );

    let pdu = decode_message(&Bytes::from(bytes))?;
    assert_eq!(pdu.transaction_id.as_deref(), Some("Tx-Fixture"));
    let PduBody::NotificationInd(ni) = &pdu.body else {
        panic!("wrong body kind");
    };
    assert_eq!(ni.location.as_deref(), Some("http://mmsc.example.org/m/7"));
    Ok(())
}

#[test]
fn decode_notification_ind() -> Result<()> {
    let push = Bytes::from(build_notification(
        "T-0001",
        "+15551234567/TYPE=PLMN",
        "http://mmsc.example.org/m/1",
        0x6000_0000,
    ));
    let pdu = decode_message(&push)?;
    assert_eq!(pdu.message_type(), MessageType::NotificationInd);
    assert_eq!(pdu.transaction_id.as_deref(), Some("T-0001"));
    assert_eq!(pdu.version, MMS_VERSION_1_1);

    let PduBody::NotificationInd(ni) = &pdu.body else {
        panic!("wrong body kind");
    };
    assert_eq!(ni.from.as_deref(), Some("+15551234567/TYPE=PLMN"));
    assert_eq!(ni.class.as_deref(), Some("Personal"));
    assert_eq!(ni.size, 256);
    assert_eq!(ni.expiry, 0x6000_0000);
    assert_eq!(ni.location.as_deref(), Some("http://mmsc.example.org/m/1"));
    Ok(())
}

#[test]
fn decode_fails_without_mandatory_header() {
    // Same notification but with the Expiry header removed.
    let mut push = build_notification(
        "T-0002",
        "+15551234567/TYPE=PLMN",
        "http://mmsc.example.org/m/2",
        0x6000_0000,
    );
    // Expiry: 0x88 token, 1 length byte, then 6 value bytes.
    let at = push
        .iter()
        .position(|b| *b == 0x88)
        .expect("expiry header present");
    push.drain(at..at + 8);
    assert!(decode_message(&Bytes::from(push)).is_err());
}

#[test]
fn decode_fails_on_preset_position_violation() {
    // Swap Transaction-Id and MMS-Version so the preset order breaks.
    let mut out = Vec::new();
    out.push(0x8c); // X-Mms-Message-Type
    out.push(130);
    out.push(0x8d); // X-Mms-MMS-Version first: wrong
    out.push(0x91);
    out.push(0x98); // X-Mms-Transaction-Id second
    out.extend_from_slice(b"T-1\0");
    out.push(0x8a);
    out.push(128);
    out.push(0x8e);
    out.extend_from_slice(&[1, 0x10]);
    out.push(0x88);
    out.extend_from_slice(&[6, 0x80, 4, 0x60, 0, 0, 0]);
    out.push(0x83);
    out.extend_from_slice(b"http://x/\0");
    assert!(decode_message(&Bytes::from(out)).is_err());
}

#[test]
fn acknowledge_round_trip() -> Result<()> {
    let pdu = MmsPdu {
        transaction_id: Some("Tr-77".to_string()),
        version: MMS_VERSION,
        body: PduBody::AcknowledgeInd(AcknowledgeInd { report: true }),
    };
    let wire = encode_to_vec(&pdu)?;
    let back = decode_message(&Bytes::from(wire))?;
    assert_eq!(back, pdu);
    Ok(())
}

#[test]
fn notify_resp_round_trip() -> Result<()> {
    let pdu = MmsPdu {
        transaction_id: Some("Tr-88".to_string()),
        version: MMS_VERSION,
        body: PduBody::NotifyRespInd(NotifyRespInd {
            notify_status: NotifyStatus::Unrecognised,
        }),
    };
    let wire = encode_to_vec(&pdu)?;
    assert_eq!(wire[0], 0x8c);
    assert_eq!(wire[1], 131); // m-notifyresp-ind
    assert_eq!(*wire.last().expect("status octet"), 132); // Unrecognised

    let back = decode_message(&Bytes::from(wire))?;
    assert_eq!(back, pdu);
    Ok(())
}

#[test]
fn read_rec_round_trip_keeps_insert_address() -> Result<()> {
    let pdu = MmsPdu {
        transaction_id: None,
        version: MMS_VERSION,
        body: PduBody::ReadRecInd(ReadInd {
            rr_status: ReadStatus::Deleted,
            msgid: Some("mid-9".to_string()),
            to: Some("+19995550000/TYPE=PLMN".to_string()),
            from: None,
            date: 1_400_000_000,
        }),
    };
    let first = encode_to_vec(&pdu)?;
    let back = decode_message(&Bytes::from(first.clone()))?;
    let PduBody::ReadRecInd(ri) = &back.body else {
        panic!("wrong body kind");
    };
    // The insert-address token decodes to the sentinel and encodes back
    // identically.
    assert_eq!(ri.from, None);
    assert_eq!(ri.rr_status, ReadStatus::Deleted);
    assert_eq!(ri.date, 1_400_000_000);
    assert_eq!(encode_to_vec(&back)?, first);
    Ok(())
}

#[test]
fn send_req_multipart_round_trip() -> Result<()> {
    let smil = Part {
        content_type: "application/smil;charset=utf-8".to_string(),
        content_id: Some("smil".to_string()),
        content_location: Some("smil".to_string()),
        data: Bytes::from_static(b"<smil></smil>"),
        offset: 0,
    };
    let text = Part {
        content_type: "text/plain;charset=utf-8".to_string(),
        content_id: Some("text0".to_string()),
        content_location: Some("hello.txt".to_string()),
        data: Bytes::from_static(b"hello there"),
        offset: 0,
    };
    let pdu = MmsPdu {
        transaction_id: Some("0000001".to_string()),
        version: MMS_VERSION,
        body: PduBody::SendReq(SendReq {
            to: Some("+15551234567/TYPE=PLMN".to_string()),
            cc: None,
            bcc: None,
            subject: Some("greetings".to_string()),
            date: 0,
            dr: true,
            rr: false,
            content_type: Some(
                "application/vnd.wap.multipart.related; \
                 start=\"<smil>\"; type=\"application/smil\""
                    .to_string(),
            ),
            parts: vec![smil, text],
        }),
    };

    let wire = encode_to_vec(&pdu)?;
    let back = decode_message(&Bytes::from(wire))?;
    assert_eq!(back.transaction_id.as_deref(), Some("0000001"));

    let PduBody::SendReq(sr) = &back.body else {
        panic!("wrong body kind");
    };
    assert_eq!(sr.to.as_deref(), Some("+15551234567/TYPE=PLMN"));
    assert_eq!(
        sr.content_type.as_deref(),
        Some("application/vnd.wap.multipart.related")
    );
    assert_eq!(sr.parts.len(), 2);

    let p0 = &sr.parts[0];
    assert_eq!(p0.content_type, "application/smil;charset=UTF-8");
    assert_eq!(p0.content_id.as_deref(), Some("smil"));
    assert_eq!(p0.content_location.as_deref(), Some("smil"));
    assert_eq!(&p0.data[..], b"<smil></smil>");

    let p1 = &sr.parts[1];
    assert_eq!(p1.content_type, "text/plain;charset=UTF-8");
    assert_eq!(p1.content_id.as_deref(), Some("text0"));
    assert_eq!(&p1.data[..], b"hello there");
    Ok(())
}

#[test]
fn send_conf_decode() -> Result<()> {
    let mut out = Vec::new();
    out.push(0x8c);
    out.push(129); // m-send-conf
    out.push(0x98);
    out.extend_from_slice(b"0000001\0");
    out.push(0x8d);
    out.push(0x91);
    out.push(0x92); // X-Mms-Response-Status
    out.push(128);
    out.push(0x8b); // Message-ID
    out.extend_from_slice(b"TestMessageId\0");

    let pdu = decode_message(&Bytes::from(out))?;
    let PduBody::SendConf(sc) = &pdu.body else {
        panic!("wrong body kind");
    };
    assert_eq!(sc.rsp_status, ResponseStatus::Ok);
    assert_eq!(sc.msgid.as_deref(), Some("TestMessageId"));
    Ok(())
}

#[test]
fn delivery_ind_decode() -> Result<()> {
    let mut out = Vec::new();
    out.push(0x8c);
    out.push(134); // m-delivery-ind
    out.push(0x8d);
    out.push(0x91);
    out.push(0x8b);
    out.extend_from_slice(b"mid-1\0");
    out.push(0x97); // To
    out.extend_from_slice(b"+15550001111/TYPE=PLMN\0");
    out.push(0x85); // Date
    out.extend_from_slice(&[4, 0x60, 0, 0, 0]);
    out.push(0x95); // X-Mms-Status
    out.push(129); // Retrieved

    let pdu = decode_message(&Bytes::from(out))?;
    let PduBody::DeliveryInd(di) = &pdu.body else {
        panic!("wrong body kind");
    };
    assert_eq!(di.dr_status, DeliveryStatus::Retrieved);
    assert_eq!(di.msgid.as_deref(), Some("mid-1"));
    assert_eq!(di.to.as_deref(), Some("+15550001111/TYPE=PLMN"));
    assert_eq!(di.date, 0x6000_0000);
    Ok(())
}

#[test]
fn date_is_masked_to_31_bits() -> Result<()> {
    let mut out = Vec::new();
    out.push(0x8c);
    out.push(134);
    out.push(0x8d);
    out.push(0x91);
    out.push(0x8b);
    out.extend_from_slice(b"mid-2\0");
    out.push(0x97);
    out.extend_from_slice(b"+15550001111/TYPE=PLMN\0");
    out.push(0x85); // Date beyond 2038 gets clipped
    out.extend_from_slice(&[4, 0x90, 0, 0, 1]);
    out.push(0x95);
    out.push(128);

    let pdu = decode_message(&Bytes::from(out))?;
    let PduBody::DeliveryInd(di) = &pdu.body else {
        panic!("wrong body kind");
    };
    assert_eq!(di.date, 0x9000_0001 & 0x7fff_ffff);
    Ok(())
}

#[test]
fn garbage_input_is_rejected() {
    let garbage = Bytes::from_static(&[0x13, 0x57, 0x9a, 0xcc, 0x01]);
    assert!(decode_message(&garbage).is_err());
    assert!(decode_message(&Bytes::new()).is_err());
}
