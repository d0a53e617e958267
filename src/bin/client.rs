//! Lamport Chat - Interactive Client
//!
//! Connects to the server, joins with a random id, then sends each stdin
//! line as a chat message. Typing `exit` (or closing stdin) leaves.

use std::env;
use std::io::Write;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use lamport_chat::{ClientEvent, ClientId, EventType, LamportClock, ServerEvent};

/// Default server URL
const DEFAULT_URL: &str = "ws://127.0.0.1:50052";

type WsSender = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lamport_chat=warn")),
        )
        .init();

    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt("Enter your name: ")?;
    let name = lines.next_line().await?.unwrap_or_default().trim().to_string();
    let id = ClientId(rand::thread_rng().gen_range(1..10_000));

    let clock = Arc::new(Mutex::new(LamportClock::new()));

    send_event(&mut ws_sender, &clock, id, &name, EventType::Join, String::new()).await?;
    debug!("Sent JOIN as {} ({})", name, id);

    // Receive task: print every event and merge its timestamp
    let recv_clock = clock.clone();
    let recv_name = name.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Stream closed: {}", e);
                    break;
                }
            };
            match serde_json::from_str::<ServerEvent>(&text) {
                Ok(event) => {
                    if recv_clock.lock().await.observe(event.timestamp).is_none() {
                        warn!("Ignoring server timestamp {}: clock would overflow", event.timestamp);
                    }
                    println!("\n{}", event.display_line());
                    let _ = prompt(&format!("{}: ", recv_name));
                }
                Err(e) => warn!("Invalid event from server: {}", e),
            }
        }
        println!("\nDisconnected from server");
    });

    // Send loop
    loop {
        prompt(&format!("{}: ", name))?;
        let line = match lines.next_line().await? {
            Some(line) => line.trim().to_string(),
            None => "exit".to_string(),
        };

        if line == "exit" {
            send_event(&mut ws_sender, &clock, id, &name, EventType::Leave, String::new()).await?;
            println!("Leaving chat...");
            let _ = ws_sender.close().await;
            break;
        }

        send_event(&mut ws_sender, &clock, id, &name, EventType::Message, line).await?;
    }

    receive_task.abort();
    Ok(())
}

/// Tick the local clock and send one event
async fn send_event(
    ws_sender: &mut WsSender,
    clock: &Mutex<LamportClock>,
    id: ClientId,
    name: &str,
    event_type: EventType,
    msg: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let timestamp = clock.lock().await.tick().ok_or("logical clock exhausted")?;
    let event = ClientEvent::new(id, name, event_type, timestamp, msg);
    let json = serde_json::to_string(&event)?;
    ws_sender.send(Message::Text(json.into())).await?;
    Ok(())
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()
}
