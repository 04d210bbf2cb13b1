use anyhow::Result;
use bytes::Bytes;
use mms_engine_rs::{
    cfg::config::StaticSettings,
    codec::{decode::decode_message, pdu::{NotifyStatus, PduBody}},
    dispatcher::Dispatcher,
    handler::ReceiveState,
};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn garbage_body_answers_notifyresp_unrecognised() -> Result<()> {
    let server = TestHttp::start().await;
    server.route(
        "GET",
        "/mms/2",
        200,
        "application/vnd.wap.mms-message",
        vec![0x13, 0x57, 0x9a, 0xbc, 0xde, 0xf0, 0x42, 0x17],
    );
    server.route("POST", "/mmsc", 200, "text/plain", Vec::new());

    let config = test_config("retrieve-garbage");
    let handler = TestHandler::new(NotifyMode::Assign("msg2".to_string()));
    let connman = TestConnMan::new(server.url("/mmsc"));
    let dispatcher = Dispatcher::start(
        config,
        connman,
        handler.clone(),
        StaticSettings::default(),
    )?;

    let expiry = (now_epoch() + 3600) as u32;
    let push = build_notification_push(
        "Tx-2",
        "+15557654321/TYPE=PLMN",
        &server.url("/mms/2"),
        expiry,
    );
    dispatcher.push_notify("244123456789012", Bytes::from(push)).await?;

    handler
        .wait_until("decoding error", |h| {
            h.receive_states("msg2").contains(&ReceiveState::DecodingError)
        })
        .await;
    wait_for("notify response POST", || {
        server.requests().iter().any(|r| r.method == "POST")
    })
    .await;

    assert_eq!(
        handler.receive_states("msg2"),
        [ReceiveState::Receiving, ReceiveState::Decoding, ReceiveState::DecodingError]
    );
    assert!(handler.received().is_empty());

    // The only POST is an M-Notifyresp.ind with status Unrecognised.
    let requests = server.requests();
    let posts: Vec<_> = requests.iter().filter(|r| r.method == "POST").collect();
    assert_eq!(posts.len(), 1);
    let pdu = decode_message(&Bytes::from(posts[0].body.clone()))?;
    assert_eq!(pdu.transaction_id.as_deref(), Some("Tx-2"));
    let PduBody::NotifyRespInd(nri) = &pdu.body else {
        panic!("expected M-Notifyresp.ind, got {:?}", pdu.message_type());
    };
    assert_eq!(nri.notify_status, NotifyStatus::Unrecognised);

    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;
    Ok(())
}
