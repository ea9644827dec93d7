//! A channel owner can time a viewer out over the wire, and the timed-out
//! viewer's subsequent message is rejected rather than broadcast.

#[path = "support.rs"]
mod support;

use chat_domain::Event;
use chat_gateway::commands::{ClientCommand, ServerFrame};
use support::{start_gateway, WsTestClient};

#[tokio::test]
async fn timed_out_user_cannot_speak() {
    let server = start_gateway().await;
    server.channels.register("c1", "owner").await;
    server.tokens.issue("tok-owner", "owner").await;
    server.tokens.issue("tok-troll", "troll").await;

    let mut owner = WsTestClient::connect(server.addr, "tok-owner").await;
    let mut troll = WsTestClient::connect(server.addr, "tok-troll").await;

    troll.send_command(&ClientCommand::Join { channel_id: "c1".into() }).await;
    assert_eq!(troll.recv_frame().await, ServerFrame::ack(None));

    owner
        .send_command(&ClientCommand::Timeout {
            channel_id: "c1".into(),
            target_id: "troll".into(),
            duration_ms: 60_000,
        })
        .await;
    let ack = owner.recv_frame().await;
    assert!(matches!(ack, ServerFrame::Ack { event: Some(Event::Moderation { .. }) }));

    // Troll is in the room, so the moderation action is also broadcast to
    // them, ahead of the rejected message below.
    let broadcast = troll.recv_frame().await;
    assert!(matches!(broadcast, ServerFrame::Event { event: Event::Moderation { .. } }));

    troll
        .send_command(&ClientCommand::Message { channel_id: "c1".into(), content: "let me back in".into() })
        .await;
    let reply = troll.recv_frame().await;
    assert_eq!(reply, ServerFrame::error("user is timed out"));
}
