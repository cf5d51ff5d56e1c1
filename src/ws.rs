// src/ws.rs
use std::net::SocketAddr;
use std::sync::Arc;

use crossbeam_channel::Sender;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use warp::Filter;

use crate::types::{EncodeRequest, IncomingMessage, NfcCommand, OutgoingMessage, RecordKind};

pub async fn start_server(
    nfc_cmd_tx: Sender<NfcCommand>,
    mut nfc_event_rx: broadcast::Receiver<OutgoingMessage>,
    bind: SocketAddr,
    default_locale: String,
) {
    // Shared Broadcast Channel for WS Clients
    let (ws_tx, _) = broadcast::channel::<OutgoingMessage>(32);
    let ws_tx = Arc::new(ws_tx);

    // Forward NFC Events -> All WS Clients
    let ws_tx_clone = ws_tx.clone();
    tokio::spawn(async move {
        while let Some(msg) = next_event(&mut nfc_event_rx, "NFC event forwarder").await {
            let _ = ws_tx_clone.send(msg);
        }
    });

    info!("WebSocket server running on ws://{}", bind);
    warp::serve(routes(nfc_cmd_tx, ws_tx, default_locale)).run(bind).await;
}

fn routes(
    nfc_cmd_tx: Sender<NfcCommand>,
    ws_tx: Arc<broadcast::Sender<OutgoingMessage>>,
    default_locale: String,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let ws_route = warp::path::end()
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let nfc_cmd_tx = nfc_cmd_tx.clone();
            let ws_tx = ws_tx.clone();
            let default_locale = default_locale.clone();
            ws.on_upgrade(move |socket| {
                handle_connection(socket, nfc_cmd_tx, ws_tx, default_locale)
            })
        });

    ws_route.with(warp::cors().allow_any_origin())
}

/// Next broadcast message. A lagging receiver skips what it missed and
/// keeps going; `None` once every sender is gone.
async fn next_event<T: Clone>(rx: &mut broadcast::Receiver<T>, who: &str) -> Option<T> {
    loop {
        match rx.recv().await {
            Ok(msg) => return Some(msg),
            Err(RecvError::Lagged(skipped)) => {
                warn!("{} lagged, dropped {} message(s)", who, skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

fn encode_request(
    data_type: RecordKind,
    content: String,
    locale: Option<String>,
    default_locale: &str,
) -> EncodeRequest {
    EncodeRequest {
        payload: content,
        kind: data_type,
        locale: locale.unwrap_or_else(|| default_locale.to_string()),
    }
}

/// Maps a client message onto the worker command it stands for.
pub fn to_command(msg: IncomingMessage, default_locale: &str) -> NfcCommand {
    match msg {
        IncomingMessage::GetStatus => NfcCommand::CheckStatus,
        IncomingMessage::TagDiscovered { tag } => NfcCommand::TagDiscovered(tag),
        IncomingMessage::WriteData {
            data_type,
            content,
            locale,
        } => NfcCommand::StartWrite(encode_request(data_type, content, locale, default_locale)),
        IncomingMessage::EncodeData {
            data_type,
            content,
            locale,
        } => NfcCommand::Encode(encode_request(data_type, content, locale, default_locale)),
    }
}

async fn handle_connection(
    ws: warp::ws::WebSocket,
    nfc_cmd_tx: Sender<NfcCommand>,
    ws_tx: Arc<broadcast::Sender<OutgoingMessage>>,
    default_locale: String,
) {
    let (mut client_ws_tx, mut client_ws_rx) = ws.split();
    let mut rx_broadcast = ws_tx.subscribe();

    // Broadcasts -> Client
    tokio::spawn(async move {
        while let Some(msg) = next_event(&mut rx_broadcast, "Client").await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize {:?}: {}", msg, e);
                    continue;
                }
            };
            if client_ws_tx
                .send(warp::ws::Message::text(json))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Client -> NFC thread
    while let Some(result) = client_ws_rx.next().await {
        let Ok(msg) = result else {
            break;
        };
        let Ok(text) = msg.to_str() else {
            continue;
        };
        match serde_json::from_str::<IncomingMessage>(text) {
            Ok(parsed) => {
                debug!("Incoming {:?}", parsed);
                if nfc_cmd_tx.send(to_command(parsed, &default_locale)).is_err() {
                    warn!("NFC service is gone, closing connection");
                    break;
                }
            }
            Err(e) => warn!("Ignoring malformed client message: {}", e),
        }
    }
    debug!("Client disconnected");
}
