use tower_sessions::Session;

use crate::AppResult;

pub const ROOM_CODE: &str = "room";
pub const DISPLAY_NAME: &str = "name";

/// The (room, name) pair the entry form hands to the connection gateway.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub room: String,
    pub name: String,
}

pub async fn remember(session: &Session, room: &str, name: &str) -> AppResult<()> {
    session.insert(ROOM_CODE, room).await?;
    session.insert(DISPLAY_NAME, name).await?;
    Ok(())
}

/// `None` unless both halves were stored by a prior create/join.
pub async fn ticket(session: &Session) -> AppResult<Option<Ticket>> {
    let room = session.get::<String>(ROOM_CODE).await?;
    let name = session.get::<String>(DISPLAY_NAME).await?;
    Ok(match (room, name) {
        (Some(room), Some(name)) => Some(Ticket { room, name }),
        _ => None,
    })
}
