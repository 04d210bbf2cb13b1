use anyhow::Result;
use bytes::Bytes;
use mms_engine_rs::{
    cfg::config::StaticSettings,
    codec::{decode::decode_message, pdu::PduBody},
    dispatcher::Dispatcher,
    handler::ReceiveState,
};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn retrieve_success_publishes_and_acknowledges() -> Result<()> {
    let server = TestHttp::start().await;
    server.route(
        "GET",
        "/mms/1",
        200,
        "application/vnd.wap.mms-message",
        build_retrieve_conf("Tx-1", "RetrievedId1"),
    );
    server.route("POST", "/mmsc", 200, "text/plain", Vec::new());

    let config = test_config("retrieve-ok");
    let handler = TestHandler::new(NotifyMode::Assign("msg1".to_string()));
    let connman = TestConnMan::new(server.url("/mmsc"));
    let dispatcher = Dispatcher::start(
        config,
        connman.clone(),
        handler.clone(),
        StaticSettings::default(),
    )?;

    let expiry = (now_epoch() + 3600) as u32;
    let push = build_notification_push(
        "Tx-1",
        "+15557654321/TYPE=PLMN",
        &server.url("/mms/1"),
        expiry,
    );
    dispatcher.push_notify("244123456789012", Bytes::from(push)).await?;

    handler
        .wait_until("published message", |h| !h.received().is_empty())
        .await;

    // The handler saw the notification with the type suffix stripped.
    assert!(handler.events().iter().any(|e| matches!(
        e,
        HandlerEvent::Notified { from, .. } if from == "+15557654321"
    )));

    // Receive state went Receiving -> Decoding, nothing else.
    assert_eq!(
        handler.receive_states("msg1"),
        [ReceiveState::Receiving, ReceiveState::Decoding]
    );

    // Exactly one message was published, fully assembled.
    let received = handler.received();
    assert_eq!(received.len(), 1);
    let msg = &received[0];
    assert_eq!(msg.id, "msg1");
    assert_eq!(msg.message_id.as_deref(), Some("RetrievedId1"));
    assert_eq!(msg.from.as_deref(), Some("+15557654321"));
    assert_eq!(msg.to, ["+15551234567"]);
    assert_eq!(msg.subject.as_deref(), Some("Greetings"));
    assert_eq!(msg.class, "Personal");
    assert_eq!(msg.parts.len(), 2);

    let bodies = handler.part_bodies();
    assert_eq!(bodies[0][0].0, "text/plain;charset=UTF-8");
    assert_eq!(bodies[0][0].1, b"Hello from the MMSC!");
    assert_eq!(bodies[0][1].0, "image/jpeg");

    // The MMSC got an M-Acknowledge.ind carrying the pushed
    // transaction id.
    wait_for("acknowledge POST", || {
        server.requests().iter().any(|r| r.method == "POST")
    })
    .await;
    let requests = server.requests();
    let ack = requests
        .iter()
        .find(|r| r.method == "POST")
        .expect("ack request");
    assert_eq!(ack.path, "/mmsc");
    assert_eq!(
        ack.content_type.as_deref(),
        Some("application/vnd.wap.mms-message")
    );
    let pdu = decode_message(&Bytes::from(ack.body.clone()))?;
    assert_eq!(pdu.transaction_id.as_deref(), Some("Tx-1"));
    assert!(matches!(pdu.body, PduBody::AcknowledgeInd(_)));

    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;
    Ok(())
}
