//! WebSocket client session management.

use std::io::Write;

use futures_util::{SinkExt, StreamExt};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use todoke_server::infrastructure::dto::websocket::{ClientMessage, ServerMessage};
use todoke_shared::time::get_jst_timestamp;

use crate::{error::ClientError, formatter::UpdateFormatter, input::parse_coordinate_line};

/// What the client does after joining the order's room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Follow the order's live position (viewer)
    Track,
    /// Stream positions for the order (delivery partner)
    Publish,
}

/// Redisplay the input prompt after printing a received message
fn redisplay_prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}

/// Run one WebSocket client session until the connection ends.
pub async fn run_client_session(
    url: &str,
    order_id: &str,
    mode: Mode,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to relay server");

    let (mut write, mut read) = ws_stream.split();

    // Join the order's room first; if the server has a cached position it
    // arrives immediately as a replay.
    let join = ClientMessage::JoinRoom {
        order_id: order_id.to_string(),
    };
    let join_json =
        serde_json::to_string(&join).map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    write
        .send(Message::Text(join_json.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    let order_id_for_read = order_id.to_string();
    let show_prompt = mode == Mode::Publish;

    // Spawn a task to handle incoming messages
    let mut read_task = tokio::spawn(async move {
        let mut connection_error = false;

        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::LocationUpdate { lat, lng }) => {
                            let formatted = UpdateFormatter::format_location_update(
                                &order_id_for_read,
                                lat,
                                lng,
                                get_jst_timestamp(),
                            );
                            print!("{}", formatted);
                        }
                        Err(_) => {
                            print!("{}", UpdateFormatter::format_raw_message(&text));
                        }
                    }
                    if show_prompt {
                        redisplay_prompt();
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed the connection");
                    connection_error = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    connection_error = true;
                    break;
                }
                _ => {}
            }
        }

        connection_error
    });

    match mode {
        Mode::Track => {
            println!("\nTracking order '{}'. Press Ctrl+C to exit.\n", order_id);

            let connection_error = (&mut read_task).await.unwrap_or(false);
            if connection_error {
                return Err(ClientError::ConnectionError("Connection lost".to_string()));
            }
        }
        Mode::Publish => {
            println!(
                "\nPublishing positions for order '{}'. Type \"lat,lng\" and press Enter. Press Ctrl+C to exit.\n",
                order_id
            );

            // Create channel for rustyline input
            let (input_tx, mut input_rx) = mpsc::unbounded_channel::<(f64, f64)>();

            // Spawn a blocking thread for rustyline (synchronous readline)
            let _readline_handle = std::thread::spawn(move || {
                let mut rl = match DefaultEditor::new() {
                    Ok(rl) => rl,
                    Err(e) => {
                        eprintln!("Failed to initialize readline: {}", e);
                        return;
                    }
                };

                loop {
                    match rl.readline("> ") {
                        Ok(line) => {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            rl.add_history_entry(line).ok();
                            match parse_coordinate_line(line) {
                                Ok(coordinate) => {
                                    if input_tx.send(coordinate).is_err() {
                                        // Channel closed, exit thread
                                        break;
                                    }
                                }
                                Err(e) => eprintln!("{}", e),
                            }
                        }
                        Err(ReadlineError::Interrupted) => {
                            tracing::info!("Interrupted");
                            break;
                        }
                        Err(ReadlineError::Eof) => {
                            tracing::info!("EOF");
                            break;
                        }
                        Err(err) => {
                            tracing::error!("Readline error: {}", err);
                            break;
                        }
                    }
                }
            });

            // Spawn a task to publish typed positions to the WebSocket
            let order_id_for_write = order_id.to_string();
            let mut write_task = tokio::spawn(async move {
                let mut write_error = false;

                while let Some((lat, lng)) = input_rx.recv().await {
                    let msg = ClientMessage::LocationUpdate {
                        order_id: order_id_for_write.clone(),
                        lat,
                        lng,
                    };

                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize location update: {}", e);
                            continue;
                        }
                    };

                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        tracing::warn!("Failed to send location update: {}", e);
                        write_error = true;
                        break;
                    }

                    // Display sent timestamp and redisplay prompt
                    let formatted =
                        UpdateFormatter::format_sent_confirmation(lat, lng, get_jst_timestamp());
                    print!("\n{}", formatted);
                    redisplay_prompt();
                }

                write_error
            });

            // If any one of the tasks completes, abort the other
            tokio::select! {
                read_result = &mut read_task => {
                    write_task.abort();
                    if read_result.unwrap_or(false) {
                        return Err(ClientError::ConnectionError("Connection lost".to_string()));
                    }
                }
                write_result = &mut write_task => {
                    read_task.abort();
                    if write_result.unwrap_or(false) {
                        return Err(ClientError::ConnectionError("Connection lost".to_string()));
                    }
                }
            }
        }
    }

    Ok(())
}
