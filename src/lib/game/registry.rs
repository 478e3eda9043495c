use std::{
    collections::HashMap,
    time::{Duration, SystemTime},
};

use tokio_mpmc::Sender;

use crate::{
    Player,
    api::messages::GameEvent,
    error::GameError,
    game::{RoomResponse, room::Room},
    net::connection::{ConnectionId, PlayerEntry, RoomCode},
};

const MAX_NAME_CHARS: usize = 32;

/// All live sessions, plus which session each connection is seated in.
///
/// Owned by [`crate::AppState`]; one instance per server.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    rooms: HashMap<RoomCode, Room>,
    members: HashMap<ConnectionId, RoomCode>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    pub fn room_code_of(&self, conn: ConnectionId) -> Option<&RoomCode> {
        self.members.get(&conn)
    }

    /// The room `conn` is seated in.
    pub fn room_of_mut(&mut self, conn: ConnectionId) -> Result<&mut Room, GameError> {
        let code = self.members.get(&conn).ok_or(GameError::NotAuthorized)?;
        self.rooms.get_mut(code).ok_or(GameError::NotAuthorized)
    }

    pub fn create(
        &mut self,
        conn: ConnectionId,
        player_name: &str,
        sender: Sender<GameEvent>,
    ) -> Result<(RoomCode, RoomResponse), GameError> {
        self.ensure_unseated(conn)?;
        let name = validate_name(player_name)?;

        let code = loop {
            let candidate = RoomCode::generate();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(room_code = %candidate, "Room code collision, regenerating");
        };

        let room = Room::new(code.clone(), PlayerEntry::new(Player::new(conn, name), sender));
        let created = GameEvent::SessionCreated {
            session_id: code.clone(),
            player_id: conn,
        };
        let response = RoomResponse::to_player(conn, created).merge(room.build_all_views());

        self.rooms.insert(code.clone(), room);
        self.members.insert(conn, code.clone());
        tracing::info!(room_code = %code, player_id = %conn, "Session created");

        Ok((code, response))
    }

    pub fn join(
        &mut self,
        code: &RoomCode,
        conn: ConnectionId,
        player_name: &str,
        sender: Sender<GameEvent>,
    ) -> Result<RoomResponse, GameError> {
        self.ensure_unseated(conn)?;
        let name = validate_name(player_name)?;

        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))?;
        let response = room.add_player(PlayerEntry::new(Player::new(conn, name), sender))?;
        self.members.insert(conn, code.clone());

        Ok(response)
    }

    /// Unseats `conn`. Returns the room's response if the room lives on;
    /// an emptied room is destroyed and yields `None`.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Option<(RoomCode, RoomResponse)> {
        let code = self.members.remove(&conn)?;
        let room = self.rooms.get_mut(&code)?;
        let response = room.remove_player(conn);

        if room.players.is_empty() {
            room.clock.stop();
            self.rooms.remove(&code);
            tracing::info!(room_code = %code, "Session destroyed");
            return None;
        }
        Some((code, response))
    }

    /// Drops every session with no inbound command for longer than `ttl`
    /// and returns them, so the caller can close their connections.
    pub fn reap_idle(&mut self, ttl: Duration) -> Vec<Room> {
        let threshold = SystemTime::now()
            .checked_sub(ttl)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let idle: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(_, room)| room.last_activity < threshold)
            .map(|(code, _)| code.clone())
            .collect();

        self.members.retain(|_, code| !idle.contains(code));
        idle.iter()
            .filter_map(|code| self.rooms.remove(code))
            .map(|mut room| {
                room.clock.stop();
                tracing::info!(room_code = %room.code, "Idle session dropped");
                room
            })
            .collect()
    }

    fn ensure_unseated(&self, conn: ConnectionId) -> Result<(), GameError> {
        match self.members.get(&conn) {
            Some(code) => Err(GameError::AlreadyInSession(code.clone())),
            None => Ok(()),
        }
    }
}

fn validate_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidName);
    }
    Ok(name.chars().take(MAX_NAME_CHARS).collect())
}
