mod entry;
mod room;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(entry::entry_page).post(entry::enter_room))
        .route("/room", get(room::room_page))
        .route("/room/ws", get(ws::room_ws))
}
