use std::time::Duration;

use classifier::MoodLabel;
use dispenser::{CommandChannel, SerialCommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn send_writes_one_newline_terminated_line() {
    let (ours, mut theirs) = tokio::io::duplex(256);
    let mut channel = CommandChannel::new(ours);

    channel
        .send(&SerialCommand::dispense(MoodLabel::Surprise))
        .await
        .unwrap();

    let mut buf = vec![0u8; 64];
    let n = theirs.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"DISPENSE SURPRISE\n");
}

#[tokio::test]
async fn sequential_sends_stay_line_separated() {
    let (ours, mut theirs) = tokio::io::duplex(256);
    let mut channel = CommandChannel::new(ours);

    channel
        .send(&SerialCommand::dispense(MoodLabel::Happy))
        .await
        .unwrap();
    channel
        .send(&SerialCommand::dispense(MoodLabel::Sad))
        .await
        .unwrap();

    let expected = b"DISPENSE HAPPY\nDISPENSE SAD\n";
    let mut buf = vec![0u8; expected.len()];
    theirs.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, expected);
}

#[tokio::test]
async fn reply_line_is_returned_trimmed() {
    let (ours, mut theirs) = tokio::io::duplex(256);
    let mut channel = CommandChannel::new(ours);

    theirs.write_all(b"OK HAPPY\r\n").await.unwrap();
    let reply = channel
        .read_reply(Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("OK HAPPY"));
}

#[tokio::test]
async fn silent_controller_is_not_an_error() {
    let (ours, _theirs) = tokio::io::duplex(256);
    let mut channel = CommandChannel::new(ours);

    let reply = channel.read_reply(Duration::from_millis(30)).await.unwrap();
    assert_eq!(reply, None);
}

#[tokio::test]
async fn send_then_optional_reply_round_trip() {
    let (ours, mut theirs) = tokio::io::duplex(256);
    let mut channel = CommandChannel::new(ours);

    let controller = tokio::spawn(async move {
        let mut buf = vec![0u8; 64];
        let n = theirs.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"DISPENSE FEAR\n");
        theirs.write_all(b"ACK\n").await.unwrap();
    });

    channel
        .send(&SerialCommand::dispense(MoodLabel::Fear))
        .await
        .unwrap();
    let reply = channel
        .read_reply(Duration::from_millis(200))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("ACK"));
    controller.await.unwrap();
}
