//! A message posted by one viewer reaches every other viewer in the room,
//! over the real hand-rolled WebSocket wire (not the in-process `Gateway`
//! API the crate-level tests exercise directly).

#[path = "support.rs"]
mod support;

use std::time::Duration;

use chat_gateway::commands::{ClientCommand, ServerFrame};
use chat_domain::Event;
use support::{start_gateway, WsTestClient};

#[tokio::test]
async fn two_viewers_see_a_posted_message() {
    let server = start_gateway().await;
    server.channels.register("c1", "owner").await;
    server.tokens.issue("tok-a", "viewer-a").await;
    server.tokens.issue("tok-b", "viewer-b").await;

    let mut a = WsTestClient::connect(server.addr, "tok-a").await;
    let mut b = WsTestClient::connect(server.addr, "tok-b").await;

    a.send_command(&ClientCommand::Join { channel_id: "c1".into() }).await;
    assert_eq!(a.recv_frame().await, ServerFrame::ack(None));
    b.send_command(&ClientCommand::Join { channel_id: "c1".into() }).await;
    assert_eq!(b.recv_frame().await, ServerFrame::ack(None));

    a.send_command(&ClientCommand::Message { channel_id: "c1".into(), content: "hello room".into() })
        .await;
    let ack = a.recv_frame().await;
    assert!(matches!(ack, ServerFrame::Ack { event: Some(Event::Message { .. }) }));

    let forwarded = b
        .recv_frame_within(Duration::from_secs(2))
        .await
        .expect("viewer B never received the broadcast message");
    match forwarded {
        ServerFrame::Event { event: Event::Message { message } } => {
            assert_eq!(message.content, "hello room");
            assert_eq!(message.user_id, "viewer-a");
        }
        other => panic!("expected a message event, got {other:?}"),
    }

    // A posted the message itself; it gets the ack above, not a second copy.
    assert!(a.recv_frame_within(Duration::from_millis(200)).await.is_none());
}
