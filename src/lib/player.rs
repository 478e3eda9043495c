use serde::{Deserialize, Serialize};

use crate::net::connection::ConnectionId;

/// Players are identified by the connection they joined on.
pub type PlayerId = ConnectionId;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self { id, name }
    }
}
