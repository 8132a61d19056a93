use tokio::sync::broadcast;
use tracing::info;

use crate::registry::{MessageRecord, RoomRegistry};

/// Membership handle for one connection. Holding one means the connection is
/// counted in the room and subscribed to its group; giving it back through
/// [`unbind`] is the only way out.
#[derive(Debug)]
pub struct Binding {
    room: String,
    name: String,
}

impl Binding {
    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Attach a freshly connected client to its room. Returns the membership
/// handle together with the feed of records broadcast to the group, or
/// `None` when the room vanished between join validation and connect.
pub fn bind(
    registry: &RoomRegistry,
    room: &str,
    name: &str,
) -> Option<(Binding, broadcast::Receiver<MessageRecord>)> {
    let feed = registry.join(room, name)?;
    info!("{name} joined room {room}");
    Some((
        Binding {
            room: room.to_owned(),
            name: name.to_owned(),
        },
        feed,
    ))
}

/// Relay a chat line from a bound connection to everyone in its room,
/// sender included. Dropped silently if the room is already gone.
pub fn say(registry: &RoomRegistry, binding: &Binding, body: String) {
    info!("{} said: {body}", binding.name);
    registry.publish(&binding.room, MessageRecord::chat(&binding.name, body));
}

/// Detach a connection on disconnect: the member is uncounted (deleting the
/// room if it empties) and the departure announced to whoever remains.
pub fn unbind(registry: &RoomRegistry, binding: Binding) {
    registry.leave(&binding.room, &binding.name);
    info!("{} has left the room {}", binding.name, binding.room);
}
