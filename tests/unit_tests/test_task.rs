use std::time::Duration;

use mms_engine_rs::tasks::task::{TaskHeader, TaskState};

#[tokio::test]
async fn sleep_clamps_wakeup_to_deadline() {
    let (events, _rx) = tokio::sync::mpsc::unbounded_channel();
    let mut header = TaskHeader::new(
        "Test",
        Some("0001".to_string()),
        None,
        Duration::from_secs(600),
    );
    assert!(header.sleep(&events, 5, 0));
    assert_eq!(header.state, TaskState::Sleep);
    let wake = header.wakeup_time.expect("wakeup time set");
    assert!(wake <= header.deadline);

    // Asking for a sleep far longer than the remaining lifetime still
    // wakes up no later than the deadline.
    assert!(header.sleep(&events, 5, 100_000));
    assert_eq!(header.wakeup_time.expect("wakeup time set"), header.deadline);
}

#[tokio::test]
async fn sleep_past_deadline_terminates() {
    let (events, _rx) = tokio::sync::mpsc::unbounded_channel();
    let mut header =
        TaskHeader::new("Test", None, None, Duration::from_secs(0));
    assert!(!header.sleep(&events, 5, 0));
    assert_eq!(header.state, TaskState::Done);
}
