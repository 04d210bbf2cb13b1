use anyhow::Result;
use mms_engine_rs::{
    attachment::AttachmentInfo,
    cfg::config::{SimSettings, StaticSettings},
    dispatcher::Dispatcher,
    handler::SendState,
};
use serial_test::serial;

use super::common::*;

#[tokio::test]
#[serial]
async fn oversized_message_never_reaches_the_wire() -> Result<()> {
    let server = TestHttp::start().await;

    let config = test_config("send-too-big");
    let note =
        write_temp_file(&config, "novel.txt", "x".repeat(200).as_bytes());

    let handler = TestHandler::new(NotifyMode::Reject);
    let connman = TestConnMan::new(server.url("/mmsc"));
    // A text attachment cannot be resized, so a 100-byte budget is
    // impossible to meet.
    let settings = StaticSettings {
        defaults: SimSettings { size_limit: 100, ..SimSettings::default() },
    };
    let dispatcher =
        Dispatcher::start(config, connman.clone(), handler.clone(), settings)?;

    dispatcher
        .send_message(
            "big1",
            "244123456789012",
            "+1234567890",
            "",
            "",
            "",
            0,
            vec![AttachmentInfo {
                file: note,
                content_type: "text/plain; charset=utf-8".to_string(),
                content_id: String::new(),
            }],
        )
        .await?;

    handler
        .wait_until("terminal too-big state", |h| {
            h.send_states("big1").contains(&SendState::TooBig)
        })
        .await;
    tokio::time::timeout(std::time::Duration::from_secs(15), dispatcher.wait_done())
        .await?;

    assert_eq!(
        handler.send_states("big1"),
        [SendState::Encoding, SendState::TooBig]
    );
    // No POST was issued and no bearer was ever requested.
    assert!(server.requests().is_empty());
    assert_eq!(connman.opened(), 0);
    Ok(())
}
