use anyhow::Result;
use bytes::Bytes;
use mms_engine_rs::{cfg::config::StaticSettings, dispatcher::Dispatcher};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn cancel_while_handler_defers_never_downloads() -> Result<()> {
    let server = TestHttp::start().await;

    let config = test_config("cancel-notify");
    // The handler never answers the notify call.
    let handler = TestHandler::new(NotifyMode::Block);
    let connman = TestConnMan::new(server.url("/mmsc"));
    let dispatcher = Dispatcher::start(
        config,
        connman.clone(),
        handler.clone(),
        StaticSettings::default(),
    )?;

    let expiry = (now_epoch() + 3600) as u32;
    let push = build_notification_push(
        "Tx-C",
        "+15557654321/TYPE=PLMN",
        &server.url("/mms/blocked"),
        expiry,
    );
    dispatcher.push_notify("244123456789012", Bytes::from(push)).await?;
    dispatcher.cancel(None);

    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;

    // No retrieve task was ever queued: no bearer, no HTTP traffic, no
    // receive states.
    assert_eq!(connman.opened(), 0);
    assert!(server.requests().is_empty());
    assert!(handler.received().is_empty());
    assert!(handler.events().iter().all(|e| matches!(
        e,
        HandlerEvent::Notified { .. }
    )));
    Ok(())
}
