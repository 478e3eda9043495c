use std::{
    collections::HashMap,
    fmt::{self, Display},
    sync::Arc,
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio_mpmc::Sender;
use uuid::Uuid;

use crate::{Player, api::messages::GameEvent};

/// A unique identifier for a game session (e.g., "AFKRTW")
///
/// Codes are generated using a restricted charset to ensure they are easy to read and type.
/// Characters such as I and O are omitted to reduce mistaken characters.
#[derive(PartialEq, Eq, Hash, Clone, Debug, Serialize, Deserialize)]
pub struct RoomCode(String);

impl RoomCode {
    pub const LEN: usize = 6;

    /// Generates a random 6-character code.
    ///
    /// The charset is "ABCDEFGHJKLMNPQRSTUVWXYZ".
    pub fn generate() -> Self {
        const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
        let mut rng = rand::rng();
        let code: String = (0..Self::LEN)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect();
        Self(code)
    }
}

impl From<String> for RoomCode {
    /// Codes typed by players are matched case-insensitively.
    fn from(value: String) -> Self {
        Self(value.trim().to_ascii_uppercase())
    }
}

impl From<&str> for RoomCode {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for RoomCode {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Identifies one WebSocket connection for as long as it stays open.
///
/// A connection owns at most one seat in one session; the id doubles as the
/// player id inside that session.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a new random UUID v4.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound events buffered per connection. A connection whose buffer is
/// full has stopped reading and gets hung up.
pub const OUTBOX_CAPACITY: usize = 64;

/// Lets the server close a connection it does not own the socket of.
///
/// Each socket handler registers itself on connect and ends its read loop
/// once notified.
#[derive(Debug, Default)]
pub struct Hangups(Mutex<HashMap<ConnectionId, Arc<Notify>>>);

impl Hangups {
    pub async fn register(&self, conn: ConnectionId) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.0.lock().await.insert(conn, notify.clone());
        notify
    }

    pub async fn unregister(&self, conn: ConnectionId) {
        self.0.lock().await.remove(&conn);
    }

    /// Asks the handler of `conn` to close. Returns false for unknown connections.
    pub async fn hang_up(&self, conn: ConnectionId) -> bool {
        match self.0.lock().await.get(&conn) {
            // notify_one keeps a permit if the handler is not waiting yet
            Some(notify) => {
                notify.notify_one();
                true
            }
            None => false,
        }
    }
}

/// A seated player together with the outbound channel of their connection.
pub struct PlayerEntry {
    pub player: Player,
    pub sender: Sender<GameEvent>,
}

impl fmt::Debug for PlayerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerEntry")
            .field("player", &self.player)
            .field("sender len", &self.sender.len())
            .finish()
    }
}

impl PlayerEntry {
    pub fn new(player: Player, sender: Sender<GameEvent>) -> Self {
        Self { player, sender }
    }
}
