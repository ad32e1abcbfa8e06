// Local players (viewers) and their add/remove listeners

use super::{ActorId, World};
use crate::core::ObjectId;
use crate::engine::input::InputSubsystem;
use std::rc::Rc;

/// Handle to a local player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPlayerId(pub(crate) u32);

/// Callback for local player added/removed events
pub type PlayerListener = Rc<dyn Fn(&mut World, LocalPlayerId)>;

/// A person playing on this machine
pub struct LocalPlayer {
    pub(crate) id: LocalPlayerId,

    /// Player controller currently driven by this player
    pub(crate) controller: Option<ActorId>,

    /// Mapping-context subsystem; absent when the player is not set up for it
    pub(crate) subsystem: Option<InputSubsystem>,
}

impl LocalPlayer {
    pub(crate) fn new(id: LocalPlayerId, with_input_subsystem: bool) -> Self {
        Self {
            id,
            controller: None,
            subsystem: with_input_subsystem.then(InputSubsystem::new),
        }
    }

    pub fn id(&self) -> LocalPlayerId {
        self.id
    }

    pub fn controller(&self) -> Option<ActorId> {
        self.controller
    }

    pub fn input_subsystem(&self) -> Option<&InputSubsystem> {
        self.subsystem.as_ref()
    }

    pub fn input_subsystem_mut(&mut self) -> Option<&mut InputSubsystem> {
        self.subsystem.as_mut()
    }
}

/// Subscriptions to local player add/remove, keyed by owner identity
#[derive(Default)]
pub(crate) struct PlayerListeners {
    added: Vec<(ObjectId, PlayerListener)>,
    removed: Vec<(ObjectId, PlayerListener)>,
}

impl PlayerListeners {
    pub fn subscribe(&mut self, owner: ObjectId, on_added: PlayerListener, on_removed: PlayerListener) {
        self.added.push((owner, on_added));
        self.removed.push((owner, on_removed));
    }

    pub fn is_bound_to(&self, owner: ObjectId) -> bool {
        self.added.iter().any(|(id, _)| *id == owner)
    }

    /// Drop every listener registered by `owner`
    pub fn remove_all(&mut self, owner: ObjectId) -> usize {
        let before = self.added.len() + self.removed.len();
        self.added.retain(|(id, _)| *id != owner);
        self.removed.retain(|(id, _)| *id != owner);
        before - (self.added.len() + self.removed.len())
    }

    pub fn added(&self) -> Vec<PlayerListener> {
        self.added.iter().map(|(_, listener)| listener.clone()).collect()
    }

    pub fn removed(&self) -> Vec<PlayerListener> {
        self.removed.iter().map(|(_, listener)| listener.clone()).collect()
    }
}
