//! The once-per-second clock that drives rounds and round transitions.
//!
//! A [`RoundClock`] lives inside its room and only records whether the room
//! wants ticks. The actual timer is a driver task spawned by [`ensure_driver`]
//! after the room has been mutated; it takes the registry lock on every tick,
//! so ticks and player commands for a room are never processed concurrently.
//!
//! Every start after a stop gets a new epoch. A driver only forwards ticks
//! while the epoch it was spawned for is still live, so a tick that was
//! already waiting on the lock when the room stopped its clock is dropped.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::AbortHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{AppState, game::room::Room, net::connection::RoomCode, net::ws::handler::deliver};

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
pub struct RoundClock {
    epoch: u64,
    running: bool,
    driver: Option<AbortHandle>,
}

impl RoundClock {
    /// Requests ticks. Keeps the current epoch if the clock is already running,
    /// so a round that starts straight out of a transition keeps its cadence.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.epoch += 1;
        self.running = true;
    }

    /// Stops ticking and cancels the driver task.
    pub fn stop(&mut self) {
        self.running = false;
        self.epoch += 1;
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_live(&self, epoch: u64) -> bool {
        self.running && self.epoch == epoch
    }

    fn needs_driver(&self) -> bool {
        self.running && self.driver.is_none()
    }
}

/// Spawns a driver for the room's clock if it is running without one.
pub fn ensure_driver(state: &Arc<AppState>, room: &mut Room) {
    if !room.clock.needs_driver() {
        return;
    }
    let epoch = room.clock.epoch();
    let task = tokio::spawn(drive(state.clone(), room.code.clone(), epoch));
    room.clock.driver = Some(task.abort_handle());
    tracing::debug!(room_code = %room.code, epoch, "Clock driver spawned");
}

#[tracing::instrument(name = "clock", skip(state), fields(room_code = %code))]
async fn drive(state: Arc<AppState>, code: RoomCode, epoch: u64) {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        interval.tick().await;

        let mut registry = state.registry.lock().await;
        let Some(room) = registry.get_mut(&code) else {
            break;
        };
        if !room.clock.is_live(epoch) {
            break;
        }

        // Hold on to our own handle so a stop triggered by this tick cannot
        // abort the task while it is still dispatching.
        let own = room.clock.driver.take();
        let response = room.tick();
        deliver(&state, room, response).await;

        if room.clock.is_live(epoch) {
            room.clock.driver = own;
        } else {
            ensure_driver(&state, room);
            break;
        }
    }
    tracing::debug!(epoch, "Clock driver finished");
}
