//! Room subscription manager.
//!
//! The server forgets room membership whenever a socket drops, so the room of
//! a detail page is joined again after every connect.

use postlive_shared::{JoinPostRoom, OutboundEvent, PostId};

use crate::ws::Emitter;

#[derive(Debug, Clone, Default)]
pub struct RoomManager {
    target: Option<PostId>,
    connected: bool,
    /// Incremented on every transition into the connected state.
    epoch: u64,
    joined_epoch: Option<u64>,
}

impl RoomManager {
    pub fn new(target: Option<PostId>) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<PostId> {
        self.target
    }

    /// The room joined on the current connection, if any.
    pub fn joined_room(&self) -> Option<PostId> {
        match self.joined_epoch {
            Some(epoch) if self.connected && epoch == self.epoch => self.target,
            _ => None,
        }
    }

    /// React to a `connect` event. Returns whether a join was emitted.
    pub fn on_connect(&mut self, emitter: &dyn Emitter) -> bool {
        if !self.connected {
            self.connected = true;
            self.epoch += 1;
        }

        let Some(post_id) = self.target else {
            return false;
        };
        if self.joined_epoch == Some(self.epoch) {
            crate::log_debug!("Room {} already joined on this connection", post_id);
            return false;
        }

        match emitter.emit(OutboundEvent::JoinPostRoom(JoinPostRoom { post_id })) {
            Ok(()) => {
                crate::log_info!("Joining room for post {}", post_id);
                self.joined_epoch = Some(self.epoch);
                true
            }
            Err(e) => {
                crate::log_warn!("Could not join room for post {}: {}", post_id, e);
                false
            }
        }
    }

    pub fn on_disconnect(&mut self) {
        self.connected = false;
        self.joined_epoch = None;
    }
}
