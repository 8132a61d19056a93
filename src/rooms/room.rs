use std::sync::Arc;

use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}};
use tower_sessions::Session;

use crate::{AppResult, include_res, registry::RoomRegistry, res, session};

#[debug_handler]
pub(crate) async fn room_page(
    State(registry): State<Arc<RoomRegistry>>,
    session: Session,
) -> AppResult<Response> {
    let Some(ticket) = session::ticket(&session).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    if !registry.room_exists(&ticket.room) {
        return Ok(Redirect::to("/").into_response());
    }

    let mut messages = String::new();
    for record in registry.messages(&ticket.room) {
        messages += &include_res!(str, "/pages/message.html")
            .replace("{name}", &res::escape(&record.name))
            .replace("{message}", &res::escape(&record.message));
    }

    let body = include_res!(str, "/pages/room.html")
        .replace("{code}", &res::escape(&ticket.room))
        .replace("{messages}", &messages);

    Ok(Html(body).into_response())
}
