use std::collections::HashSet;

/// Identifies one connected client within a room.
///
/// Opaque beyond equality/hashing; the gateway mints these per connection.
pub type ClientId = u64;

/// A channel's set of currently connected clients.
///
/// The room registry owns instances of this type; a room with zero clients
/// is removed from the registry rather than kept around empty.
#[derive(Debug, Clone, Default)]
pub struct Room {
    channel_id: String,
    clients: HashSet<ClientId>,
}

impl Room {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            clients: HashSet::new(),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn insert(&mut self, client: ClientId) {
        self.clients.insert(client);
    }

    /// Removes `client`, returning whether the room is now empty.
    pub fn remove(&mut self, client: ClientId) -> bool {
        self.clients.remove(&client);
        self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.clients.contains(&client)
    }

    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.iter().copied()
    }
}
