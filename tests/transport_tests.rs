// Tests for the wire messages and the WebSocket transport
//
// The transport tests run a loopback WebSocket peer on an ephemeral port.

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use live_voice::audio::codec;
use live_voice::session::SessionEvent;
use live_voice::transport::{InboundEnvelope, RealtimeInputMessage, Role, Transport, VoiceConfigMessage, WsTransport};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

#[test]
fn test_voice_config_serialization() -> Result<()> {
    let msg = VoiceConfigMessage {
        voice: "Zephyr".to_string(),
    };

    assert_eq!(serde_json::to_string(&msg)?, r#"{"voice":"Zephyr"}"#);
    Ok(())
}

#[test]
fn test_realtime_input_shape() -> Result<()> {
    let payload = codec::to_transport_text(&codec::encode_frame(&[0.0, -1.0]));
    let json = serde_json::to_string(&RealtimeInputMessage::new(payload.clone()))?;

    let value: Value = serde_json::from_str(&json)?;
    assert_eq!(value["realtime_input"]["media"]["data"], Value::String(payload.clone()));

    let bytes = codec::from_transport_text(&payload)?;
    assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x80]);
    Ok(())
}

#[test]
fn test_inbound_typed_transcription() -> Result<()> {
    let env = InboundEnvelope::parse(r#"{"type":"transcription","role":"user","text":"hello"}"#)?;

    let fragment = env.transcript().expect("fragment");
    assert_eq!(fragment.role, Role::User);
    assert_eq!(fragment.text, "hello");
    Ok(())
}

#[test]
fn test_inbound_all_fields() -> Result<()> {
    let env = InboundEnvelope::parse(
        r#"{"audio":"AAA=","type":"transcription","role":"model","text":"ok","turnComplete":true,"interrupted":true}"#,
    )?;

    assert_eq!(env.audio.as_deref(), Some("AAA="));
    assert!(env.turn_complete);
    assert!(env.interrupted);
    assert_eq!(env.transcript().map(|f| f.role), Some(Role::Model));
    Ok(())
}

#[test]
fn test_inbound_empty_strings_are_absent() -> Result<()> {
    let env = InboundEnvelope::parse(r#"{"audio":"","text":"","role":"model"}"#)?;

    assert!(env.audio.is_none());
    assert!(env.transcript().is_none());
    Ok(())
}

#[test]
fn test_inbound_unknown_fields_ignored() -> Result<()> {
    let env = InboundEnvelope::parse(r#"{"setupComplete":{},"turnComplete":true}"#)?;

    assert!(env.turn_complete);
    assert!(env.audio.is_none());
    Ok(())
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Result<SessionEvent> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("event queue closed"))
}

#[tokio::test]
async fn test_ws_transport_round_trip() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(stream).await?;

        let first = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            other => anyhow::bail!("unexpected first message: {:?}", other),
        };

        ws.send(Message::Text(r#"{"role":"model","text":"Hi"}"#.to_string()))
            .await?;
        ws.close(None).await?;
        anyhow::Ok(first)
    });

    let (events, mut rx) = mpsc::unbounded_channel();
    let transport = WsTransport::connect(&format!("ws://{}", addr), events).await?;

    assert!(matches!(next_event(&mut rx).await?, SessionEvent::TransportOpened));

    transport.send_voice_config("Puck")?;

    match next_event(&mut rx).await? {
        SessionEvent::Inbound(text) => assert_eq!(text, r#"{"role":"model","text":"Hi"}"#),
        other => panic!("expected inbound message, got {:?}", other),
    }
    assert!(matches!(next_event(&mut rx).await?, SessionEvent::TransportClosed));

    let first = peer.await??;
    assert_eq!(first, r#"{"voice":"Puck"}"#);

    Ok(())
}

#[tokio::test]
async fn test_ws_transport_connect_refused() -> Result<()> {
    // Grab a free port, then release it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let (events, mut rx) = mpsc::unbounded_channel();
    let result = WsTransport::connect(&format!("ws://{}", addr), events).await;

    assert!(result.is_err());
    assert!(rx.try_recv().is_err(), "No open event without a connection");
    Ok(())
}
