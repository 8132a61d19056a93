use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tower_sessions::Session;
use tracing::debug;

use crate::{
    AppResult, gateway,
    registry::RoomRegistry,
    session::{self, Ticket},
};

#[derive(Deserialize)]
struct ChatEvent {
    data: String,
}

#[debug_handler]
pub(crate) async fn room_ws(
    State(registry): State<Arc<RoomRegistry>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    // the ticket has to be read before the upgrade, the session cookie is
    // not available afterwards
    let ticket = session::ticket(&session).await?;
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, registry, ticket))
        .into_response())
}

async fn handle_socket(socket: WebSocket, registry: Arc<RoomRegistry>, ticket: Option<Ticket>) {
    let Some(Ticket { room, name }) = ticket else {
        debug!("socket opened without a room ticket, ignoring");
        return;
    };
    let Some((binding, mut feed)) = gateway::bind(&registry, &room, &name) else {
        debug!("room {room} is gone, dropping socket for {name}");
        return;
    };

    let (mut sender, mut receiver) = socket.split();

    let pump = tokio::spawn(async move {
        loop {
            match feed.recv().await {
                Ok(record) => {
                    let Ok(text) = serde_json::to_string(&record) else {
                        continue;
                    };
                    if sender.send(text.into()).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("slow consumer dropped {skipped} records");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
        let Ok(ChatEvent { data }) = serde_json::from_slice(&msg.into_data()) else {
            continue;
        };
        gateway::say(&registry, &binding, data);
    }

    pump.abort();
    gateway::unbind(&registry, binding);
}
