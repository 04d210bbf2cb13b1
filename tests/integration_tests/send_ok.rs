use anyhow::Result;
use bytes::Bytes;
use mms_engine_rs::{
    attachment::AttachmentInfo,
    cfg::config::StaticSettings,
    codec::{decode::decode_message, pdu::PduBody},
    dispatcher::Dispatcher,
    handler::SendState,
    tasks::encode::SEND_FLAG_REQUEST_DELIVERY_REPORT,
};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn send_success_reports_mmsc_message_id() -> Result<()> {
    let server = TestHttp::start().await;
    server.route(
        "POST",
        "/mmsc",
        200,
        "application/vnd.wap.mms-message",
        build_send_conf("m1", "TestMessageId"),
    );

    let config = test_config("send-ok");
    let photo = write_temp_file(&config, "photo.jpg", &tiny_jpeg());
    let note = write_temp_file(&config, "hello.txt", "Hello over MMS!".as_bytes());

    let handler = TestHandler::new(NotifyMode::Reject);
    let connman = TestConnMan::new(server.url("/mmsc"));
    let dispatcher = Dispatcher::start(
        config,
        connman,
        handler.clone(),
        StaticSettings::default(),
    )?;

    let imsi = dispatcher
        .send_message(
            "m1",
            "244123456789012",
            "+1234567890",
            "",
            "",
            "greetings",
            SEND_FLAG_REQUEST_DELIVERY_REPORT,
            vec![
                AttachmentInfo {
                    file: photo,
                    content_type: "image/jpeg".to_string(),
                    content_id: String::new(),
                },
                AttachmentInfo {
                    file: note,
                    content_type: "text/plain; charset=utf-8".to_string(),
                    content_id: String::new(),
                },
            ],
        )
        .await?;
    assert_eq!(imsi, "244123456789012");

    handler
        .wait_until("message sent", |h| {
            h.events()
                .iter()
                .any(|e| matches!(e, HandlerEvent::Sent(..)))
        })
        .await;

    assert!(handler.events().contains(&HandlerEvent::Sent(
        "m1".to_string(),
        "TestMessageId".to_string()
    )));
    let states = handler.send_states("m1");
    assert!(states.contains(&SendState::Encoding));
    assert!(states.contains(&SendState::Sending));

    // The uploaded m-send.req is multipart/related with the generated
    // SMIL wrapper as its first part.
    let requests = server.requests();
    let post = requests
        .iter()
        .find(|r| r.method == "POST")
        .expect("send request");
    let pdu = decode_message(&Bytes::from(post.body.clone()))?;
    assert_eq!(pdu.transaction_id.as_deref(), Some("m1"));
    let PduBody::SendReq(sr) = &pdu.body else {
        panic!("expected M-Send.req, got {:?}", pdu.message_type());
    };
    assert_eq!(sr.to.as_deref(), Some("+1234567890/TYPE=PLMN"));
    assert_eq!(
        sr.content_type.as_deref(),
        Some("application/vnd.wap.multipart.related")
    );
    assert_eq!(sr.parts.len(), 3);
    assert!(sr.parts[0].content_type.starts_with("application/smil"));
    assert!(
        sr.parts.iter().any(|p| p.content_type.starts_with("image/jpeg")),
        "jpeg part missing: {:?}",
        sr.parts.iter().map(|p| &p.content_type).collect::<Vec<_>>()
    );
    assert!(
        sr.parts
            .iter()
            .any(|p| p.data.as_ref() == b"Hello over MMS!"),
        "text part body missing"
    );

    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;
    Ok(())
}
