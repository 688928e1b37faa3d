//! End-to-end relay tests over simulated TCP.
//!
//! The relay under test is the production event loop and WebSocket bridge;
//! only the network and the clock are simulated.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::StreamExt;
use parley_harness::{SimClient, SimEnv, SimServer};
use parley_proto::{ChatMessage, ServerEvent};
use parley_server::{OriginPolicy, RelayConfig};
use tokio_tungstenite::{
    client_async,
    tungstenite::{self, client::IntoClientRequest, http::HeaderValue},
};
use turmoil::net::TcpStream;

const RELAY: &str = "server:4000";

fn sim_with_relay() -> turmoil::Sim<'static> {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        SimServer::bind("0.0.0.0:4000").await?.run().await?;
        Ok(())
    });

    sim
}

#[test]
fn late_joiner_sees_welcome_then_message() {
    let mut sim = sim_with_relay();

    sim.client("alice", async {
        let mut alice = SimClient::connect(RELAY).await?;
        assert_eq!(alice.session_id().len(), 16);

        let history = alice.request_history().await?;
        assert_eq!(history, vec![ChatMessage::welcome()]);

        let hi = ChatMessage::new("hi", "Alice", "u1");
        alice.send_message(hi.clone()).await?;
        assert_eq!(alice.recv_message().await?, hi);

        Ok(())
    });

    sim.client("bob", async {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut bob = SimClient::connect(RELAY).await?;
        let history = bob.request_history().await?;

        assert_eq!(history, vec![
            ChatMessage::welcome(),
            ChatMessage::new("hi", "Alice", "u1")
        ]);

        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn late_joiner_receives_replay_larger_than_client_frame_limit() {
    let mut sim = sim_with_relay();
    let text = "x".repeat(100_000);

    let sent = text.clone();
    sim.client("writer", async move {
        let mut writer = SimClient::connect(RELAY).await?;
        for _ in 0..12 {
            writer.send_message(ChatMessage::new(sent.as_str(), "Alice", "u1")).await?;
            let _ = writer.recv_message().await?;
        }
        Ok(())
    });

    sim.client("reader", async move {
        tokio::time::sleep(Duration::from_secs(3)).await;

        let mut reader = SimClient::connect(RELAY).await?;
        let history = reader.request_history().await?;

        assert_eq!(history.len(), 13);
        assert_eq!(history[0], ChatMessage::welcome());
        assert!(history[1..].iter().all(|m| m.text == text));
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn broadcast_reaches_every_connected_client() {
    let mut sim = sim_with_relay();
    let received = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let received = Arc::clone(&received);
        sim.client(format!("client{i}"), async move {
            let mut client = SimClient::connect(RELAY).await?;

            // Everyone is registered before the message goes out
            tokio::time::sleep(Duration::from_millis(500)).await;
            if i == 0 {
                client.send_message(ChatMessage::new("fan-out", "Zero", "id0")).await?;
            }

            let message = client.recv_message().await?;
            received.lock().unwrap().push((i, message));
            Ok(())
        });
    }

    sim.run().expect("simulation failed");

    let mut received = received.lock().unwrap().clone();
    received.sort_by_key(|(i, _)| *i);
    assert_eq!(received.len(), 3);
    for (_, message) in received {
        assert_eq!(message, ChatMessage::new("fan-out", "Zero", "id0"));
    }
}

#[test]
fn concurrent_senders_share_one_order() {
    const CLIENTS: usize = 3;
    const PER_CLIENT: usize = 5;

    let mut sim = sim_with_relay();
    let orders = Arc::new(Mutex::new(Vec::new()));

    for i in 0..CLIENTS {
        let orders = Arc::clone(&orders);
        sim.client(format!("client{i}"), async move {
            let mut client = SimClient::connect(RELAY).await?;
            tokio::time::sleep(Duration::from_millis(200)).await;

            for n in 0..PER_CLIENT {
                client
                    .send_message(ChatMessage::new(format!("{i}-{n}"), format!("c{i}"), format!("id{i}")))
                    .await?;
            }

            let mut seen = Vec::new();
            for _ in 0..CLIENTS * PER_CLIENT {
                seen.push(client.recv_message().await?);
            }
            orders.lock().unwrap().push(seen);
            Ok(())
        });
    }

    let history = Arc::new(Mutex::new(Vec::new()));
    let late_history = Arc::clone(&history);
    sim.client("late", async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        let mut late = SimClient::connect(RELAY).await?;
        *late_history.lock().unwrap() = late.request_history().await?;
        Ok(())
    });

    sim.run().expect("simulation failed");

    let orders = orders.lock().unwrap();
    assert_eq!(orders.len(), CLIENTS);
    for order in orders.iter() {
        assert_eq!(order, &orders[0]);
    }

    // Each sender's own messages keep their send order
    for i in 0..CLIENTS {
        let own: Vec<&str> = orders[0]
            .iter()
            .filter(|m| m.sender_id == format!("id{i}"))
            .map(|m| m.text.as_str())
            .collect();
        let expected: Vec<String> = (0..PER_CLIENT).map(|n| format!("{i}-{n}")).collect();
        assert_eq!(own, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    let history = history.lock().unwrap();
    assert_eq!(history.len(), CLIENTS * PER_CLIENT + 1);
    assert_eq!(&history[1..], orders[0].as_slice());
}

#[test]
fn disconnect_leaves_log_and_others_untouched() {
    let mut sim = sim_with_relay();

    sim.client("leaver", async {
        let mut leaver = SimClient::connect(RELAY).await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        leaver.send_message(ChatMessage::new("bye", "Leaver", "id-l")).await?;
        let _ = leaver.recv_message().await?;
        leaver.close().await?;
        Ok(())
    });

    sim.client("stayer", async {
        let mut stayer = SimClient::connect(RELAY).await?;
        let _ = stayer.recv_message().await?;

        // Let the leaver's close reach the relay
        tokio::time::sleep(Duration::from_secs(1)).await;

        let after = ChatMessage::new("still here", "Stayer", "id-s");
        stayer.send_message(after.clone()).await?;
        assert_eq!(stayer.recv_message().await?, after);

        Ok(())
    });

    sim.client("observer", async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        let mut observer = SimClient::connect(RELAY).await?;

        let history = observer.request_history().await?;
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec![ChatMessage::WELCOME_TEXT, "bye", "still here"]);

        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn malformed_frames_are_dropped_and_channel_survives() {
    let mut sim = sim_with_relay();

    sim.client("sloppy", async {
        let mut client = SimClient::connect(RELAY).await?;

        client.send_raw("not json at all").await?;
        client.send_raw(r#"{"event":"unknownEvent","data":1}"#).await?;

        // Missing fields default to empty strings and are relayed as-is
        client.send_raw(r#"{"event":"message","data":{"msg":"partial"}}"#).await?;
        assert_eq!(client.recv_message().await?, ChatMessage::new("partial", "", ""));

        let history = client.request_history().await?;
        assert_eq!(history.len(), 2);

        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn strict_relay_drops_blank_messages() {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        let config =
            RelayConfig { payload_policy: parley_server::PayloadPolicy::Strict, ..Default::default() };
        SimServer::bind_with_config("0.0.0.0:4000", config, SimEnv::with_seed(9))
            .await?
            .run()
            .await?;
        Ok(())
    });

    sim.client("client", async {
        let mut client = SimClient::connect(RELAY).await?;

        client.send_message(ChatMessage::new("   ", "A", "a")).await?;
        client.send_message(ChatMessage::new("real", "A", "a")).await?;

        assert_eq!(client.recv_message().await?.text, "real");
        assert_eq!(client.request_history().await?.len(), 2);
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn disallowed_origin_is_refused() {
    let mut sim = turmoil::Builder::new().build();

    sim.host("server", || async {
        SimServer::bind("0.0.0.0:4000")
            .await?
            .with_origin_policy(OriginPolicy::new(vec!["http://localhost:3000".to_string()]))
            .run()
            .await?;
        Ok(())
    });

    sim.client("browser", async {
        let stream = TcpStream::connect(RELAY).await?;
        let mut request = format!("ws://{RELAY}/").into_client_request()?;
        request.headers_mut().insert("origin", HeaderValue::from_static("http://evil.example"));

        match client_async(request, stream).await {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 403),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("handshake should have been refused"),
        }

        // Same relay still serves clients without an Origin header
        let mut client = SimClient::connect(RELAY).await?;
        assert_eq!(client.request_history().await?, vec![ChatMessage::welcome()]);
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn ready_ack_carries_transport_name() {
    let mut sim = sim_with_relay();

    sim.client("client", async {
        let stream = TcpStream::connect(RELAY).await?;
        let (mut ws, _) = client_async(format!("ws://{RELAY}/"), stream).await?;

        let Some(Ok(tungstenite::Message::Text(text))) = ws.next().await else {
            panic!("expected a text frame");
        };
        let event = parley_proto::codec::decode_server_event(text.as_str())?;

        assert!(matches!(event, ServerEvent::Ready(ready) if ready.transport == "websocket"));
        Ok(())
    });

    sim.run().expect("simulation failed");
}
