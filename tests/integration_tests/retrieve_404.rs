use anyhow::Result;
use bytes::Bytes;
use mms_engine_rs::{
    cfg::config::StaticSettings, dispatcher::Dispatcher, handler::ReceiveState,
};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn retrieve_404_is_a_permanent_download_error() -> Result<()> {
    // No GET route: the fixture server answers 404 text/html.
    let server = TestHttp::start().await;
    server.route("POST", "/mmsc", 200, "text/plain", Vec::new());

    let config = test_config("retrieve-404");
    let handler = TestHandler::new(NotifyMode::Assign("msg404".to_string()));
    let connman = TestConnMan::new(server.url("/mmsc"));
    let dispatcher = Dispatcher::start(
        config,
        connman,
        handler.clone(),
        StaticSettings::default(),
    )?;

    let expiry = (now_epoch() + 3600) as u32;
    let push = build_notification_push(
        "Tx-404",
        "+15557654321/TYPE=PLMN",
        &server.url("/mms/gone"),
        expiry,
    );
    dispatcher.push_notify("244123456789012", Bytes::from(push)).await?;

    handler
        .wait_until("download error", |h| {
            h.receive_states("msg404").contains(&ReceiveState::DownloadError)
        })
        .await;

    // A 404 is terminal: one attempt, no retries, no acknowledgement.
    assert_eq!(
        handler.receive_states("msg404"),
        [ReceiveState::Receiving, ReceiveState::DownloadError]
    );
    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;
    let gets = server
        .requests()
        .iter()
        .filter(|r| r.method == "GET")
        .count();
    assert_eq!(gets, 1);
    assert!(!server.requests().iter().any(|r| r.method == "POST"));
    assert!(handler.received().is_empty());
    Ok(())
}
