// Extension manager: per-class handlers notified as actors gain or lose extensions

use super::{ActorClass, ActorId, World};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Callback invoked for every extension event on a matching actor
pub type ExtensionHandler = Rc<dyn Fn(&mut World, ActorId, &ExtensionEvent)>;

/// Lifecycle notification delivered to extension handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionEvent {
    /// Handler installed while the actor exists, or actor became a receiver
    ExtensionAdded,
    /// Handler removed while the actor still exists
    ExtensionRemoved,
    /// Actor stopped being a receiver (usually end of play)
    ReceiverRemoved,
    /// Gameplay-defined signal sent to an actor
    Custom(&'static str),
}

impl ExtensionEvent {
    /// An actor's input component is registered and can take processors
    pub const INPUT_COMPONENT_READY: ExtensionEvent = ExtensionEvent::Custom("InputComponentReady");

    /// A pawn finished binding its default input; collaborators bind after it
    pub const BIND_INPUTS_NOW: ExtensionEvent = ExtensionEvent::Custom("BindInputsNow");

    /// Check for the two "take your extension back" notifications
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::ExtensionRemoved | Self::ReceiverRemoved)
    }
}

impl fmt::Display for ExtensionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtensionAdded => f.write_str("ExtensionAdded"),
            Self::ExtensionRemoved => f.write_str("ExtensionRemoved"),
            Self::ReceiverRemoved => f.write_str("ReceiverRemoved"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Registration token for an extension handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionHandlerId(u64);

struct HandlerEntry {
    id: ExtensionHandlerId,
    class: ActorClass,
    handler: ExtensionHandler,
}

/// Registry of extension handlers and receiver actors for one world
///
/// Dispatch needs the whole world, so the event-sending entry points live on
/// [`World`]; this type only keeps the bookkeeping.
#[derive(Default)]
pub struct ExtensionManager {
    handlers: Vec<HandlerEntry>,
    receivers: BTreeSet<ActorId>,
    next_id: u64,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, class: ActorClass, handler: ExtensionHandler) -> ExtensionHandlerId {
        self.next_id += 1;
        let id = ExtensionHandlerId(self.next_id);
        self.handlers.push(HandlerEntry { id, class, handler });
        id
    }

    pub(crate) fn unregister(&mut self, id: ExtensionHandlerId) -> Option<(ActorClass, ExtensionHandler)> {
        let index = self.handlers.iter().position(|entry| entry.id == id)?;
        let entry = self.handlers.remove(index);
        Some((entry.class, entry.handler))
    }

    /// Handlers whose class `class` derives from, in registration order
    pub(crate) fn handlers_for(&self, class: &ActorClass) -> Vec<ExtensionHandler> {
        self.handlers
            .iter()
            .filter(|entry| class.is_child_of(&entry.class))
            .map(|entry| entry.handler.clone())
            .collect()
    }

    pub(crate) fn add_receiver(&mut self, actor: ActorId) -> bool {
        self.receivers.insert(actor)
    }

    pub(crate) fn remove_receiver(&mut self, actor: ActorId) -> bool {
        self.receivers.remove(&actor)
    }

    pub fn is_receiver(&self, actor: ActorId) -> bool {
        self.receivers.contains(&actor)
    }

    pub fn receivers(&self) -> Vec<ActorId> {
        self.receivers.iter().copied().collect()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> ExtensionHandler {
        Rc::new(|_world: &mut World, _actor: ActorId, _event: &ExtensionEvent| {})
    }

    #[test]
    fn test_handlers_match_subclasses() {
        let mut manager = ExtensionManager::new();
        manager.register(ActorClass::pawn(), noop_handler());
        manager.register(ActorClass::controller(), noop_handler());

        let hero = ActorClass::pawn().subclass("Hero");
        assert_eq!(manager.handlers_for(&hero).len(), 1);
        assert_eq!(manager.handlers_for(&ActorClass::player_controller()).len(), 1);
        assert_eq!(manager.handlers_for(&ActorClass::actor()).len(), 0);
    }

    #[test]
    fn test_unregister_once() {
        let mut manager = ExtensionManager::new();
        let id = manager.register(ActorClass::pawn(), noop_handler());

        assert!(manager.unregister(id).is_some());
        assert!(manager.unregister(id).is_none());
        assert_eq!(manager.handler_count(), 0);
    }

    #[test]
    fn test_receivers_are_unique() {
        let mut manager = ExtensionManager::new();
        assert!(manager.add_receiver(ActorId(1)));
        assert!(!manager.add_receiver(ActorId(1)));
        assert!(manager.is_receiver(ActorId(1)));
        assert!(manager.remove_receiver(ActorId(1)));
        assert!(!manager.remove_receiver(ActorId(1)));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ExtensionEvent::BIND_INPUTS_NOW.to_string(), "BindInputsNow");
        assert!(ExtensionEvent::ReceiverRemoved.is_removal());
        assert!(!ExtensionEvent::INPUT_COMPONENT_READY.is_removal());
    }
}
