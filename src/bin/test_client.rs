use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use trivia_party::data::{ClientMessage, CreateSessionResponse};

const HTTP_BASE: &str = "http://127.0.0.1:3000";
const WS_BASE: &str = "ws://127.0.0.1:3000";

#[derive(Debug, Deserialize)]
struct Envelope {
    r#type: String,
    #[serde(default)]
    payload: Value,
}

/// Plays as `name`: guesses the first answer of every question it is shown.
async fn spawn_player(
    websocket_url: String,
    name: String,
) -> Result<tokio::task::JoinHandle<()>, Box<dyn std::error::Error>> {
    let handle = tokio::spawn(async move {
        let url_str = format!("{}{}?player={}", WS_BASE, websocket_url, name);
        let (ws_stream, _) = connect_async(url_str).await.expect("failed to connect");
        let (mut write, mut read) = ws_stream.split();

        println!("....[{name}] Connected!");

        while let Some(msg) = read.next().await {
            let msg = msg.expect("Error reading message");
            let Ok(text) = msg.to_text() else { continue };
            println!("....[{name} RX] {}", text);

            let Ok(envelope) = serde_json::from_str::<Envelope>(text) else { continue };
            if envelope.r#type == "REDIRECT" {
                println!("....[{name}] Session gone, stopping.");
                break;
            }
            if envelope.r#type != "RENDER" || envelope.payload["view"] != "question" {
                continue;
            }

            let Some(answer_id) = envelope.payload["context"]["answers"][0]["id"].as_str() else { continue };
            println!("....[{name}] Guessing {answer_id}");
            let guess = serde_json::to_string(&ClientMessage::SetGuess(answer_id.to_string())).unwrap();
            write.send(Message::Text(guess.into())).await.expect("failed to send guess");
        }
    });

    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();

    println!("--- TRIVIA PARTY TEST CLIENT ---");
    println!("\n[1] Opening room...");
    let created = client
        .post(format!("{}/sessions", HTTP_BASE))
        .send()
        .await?
        .error_for_status()?
        .json::<CreateSessionResponse>()
        .await?;
    println!("Success! Session ID: {}", created.session_id);

    println!("\n[2] Connecting players...");
    let first = spawn_player(created.websocket_url.clone(), "ada".to_string()).await?;
    let second = spawn_player(created.websocket_url, "grace".to_string()).await?;

    let _ = tokio::join!(first, second);

    Ok(())
}
