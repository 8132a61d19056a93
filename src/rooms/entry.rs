use std::sync::Arc;

use axum::{Form, debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{AppResult, include_res, registry::RoomRegistry, res, session};

#[derive(Debug, Deserialize)]
pub(crate) struct EntryForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    code: String,
    join: Option<String>,
    create: Option<String>,
}

#[debug_handler]
pub(crate) async fn entry_page(session: Session) -> Response {
    // every visit to the entry page starts a fresh session
    session.clear().await;
    render_form("", "", "").into_response()
}

#[debug_handler]
pub(crate) async fn enter_room(
    State(registry): State<Arc<RoomRegistry>>,
    session: Session,
    Form(EntryForm { name, code, join, create }): Form<EntryForm>,
) -> AppResult<Response> {
    session.clear().await;

    if name.is_empty() {
        return Ok(render_form("Please enter a name.", &code, &name).into_response());
    }
    if join.is_some() && code.is_empty() {
        return Ok(render_form("Please enter a room code.", &code, &name).into_response());
    }

    let room = if create.is_some() {
        registry.create_room()
    } else if registry.room_exists(&code) {
        code
    } else {
        return Ok(render_form("Room does not exist.", &code, &name).into_response());
    };

    session::remember(&session, &room, &name).await?;
    Ok(Redirect::to("/room").into_response())
}

fn render_form(error: &str, code: &str, name: &str) -> Html<String> {
    Html(
        include_res!(str, "/pages/home.html")
            .replace("{error}", &res::escape(error))
            .replace("{code}", &res::escape(code))
            .replace("{name}", &res::escape(name)),
    )
}
