use anyhow::Result;
use bytes::Bytes;
use mms_engine_rs::{
    cfg::config::StaticSettings,
    codec::{decode::decode_message, pdu::PduBody},
    dispatcher::Dispatcher,
    handler::{ReadReportStatus, ReadStatus},
};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn read_report_posts_and_reports_ok() -> Result<()> {
    let server = TestHttp::start().await;
    server.route("POST", "/mmsc", 200, "text/plain", Vec::new());

    let config = test_config("read-report-ok");
    let handler = TestHandler::new(NotifyMode::Reject);
    let connman = TestConnMan::new(server.url("/mmsc"));
    let dispatcher = Dispatcher::start(
        config,
        connman,
        handler.clone(),
        StaticSettings::default(),
    )?;

    dispatcher
        .send_read_report(
            "r1",
            "244123456789012",
            "StoredMessageId",
            "  +15550001111 ",
            ReadStatus::Read,
        )
        .await?;

    handler
        .wait_until("read report status", |h| {
            h.events()
                .iter()
                .any(|e| matches!(e, HandlerEvent::ReadReportStatus(..)))
        })
        .await;

    assert!(handler.events().contains(&HandlerEvent::ReadReportStatus(
        "r1".to_string(),
        ReadReportStatus::Ok
    )));

    let requests = server.requests();
    let post = requests
        .iter()
        .find(|r| r.method == "POST")
        .expect("read report POST");
    let pdu = decode_message(&Bytes::from(post.body.clone()))?;
    let PduBody::ReadRecInd(ri) = &pdu.body else {
        panic!("expected M-Read-Rec.ind, got {:?}", pdu.message_type());
    };
    assert_eq!(ri.msgid.as_deref(), Some("StoredMessageId"));
    // The recipient is trimmed and given the default phone-number type.
    assert_eq!(ri.to.as_deref(), Some("+15550001111/TYPE=PLMN"));
    assert_eq!(ri.rr_status, mms_engine_rs::codec::pdu::ReadStatus::Read);
    assert_eq!(ri.from, None);

    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;
    Ok(())
}
