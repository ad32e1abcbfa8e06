// Feature activation actions: attach input content to actors while a feature is active
//
// Every action follows the same protocol. Activating installs an extension
// handler per game world (and in worlds started later); the handler attaches
// content when an actor gains the extension and detaches it when the actor
// loses it. Deactivating removes the handlers, then detaches whatever is still
// recorded, newest first.
//
// ## Variants
//
// - `mapping_context`: mapping contexts on player controllers' local players
// - `input_processors`: processors on actors' input components
// - `input_configs`: additional input configs on playable pawns

mod input_configs;
mod input_processors;
mod mapping_context;
mod validation;

pub use input_configs::AddInputConfigs;
pub use input_processors::{AddInputProcessors, ProcessorsToAdd};
pub use mapping_context::{AddInputContextMapping, InputMappingEntry};
pub use validation::{DataValidation, DataValidationResult};

use crate::core::ObjectId;
use crate::engine::world::{
    ActorClass, ActorId, Engine, ExtensionEvent, ExtensionHandler, ExtensionHandlerId, World, WorldId,
};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Scope of one activation: every world, or a single one
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ActivationContext {
    world: Option<WorldId>,
}

impl ActivationContext {
    pub fn global() -> Self {
        Self { world: None }
    }

    pub fn for_world(world: WorldId) -> Self {
        Self { world: Some(world) }
    }

    pub fn applies_to(&self, world: WorldId) -> bool {
        self.world.map_or(true, |w| w == world)
    }
}

/// Lifecycle hooks of a game feature action
pub trait GameFeatureAction {
    /// Feature became known to the engine
    fn on_registering(&self, _engine: &mut Engine) {}

    fn on_activating(&self, engine: &mut Engine, context: &ActivationContext);

    fn on_deactivating(&self, engine: &mut Engine, context: &ActivationContext);

    /// Feature is being forgotten by the engine
    fn on_unregistering(&self, _engine: &mut Engine) {}

    fn is_data_valid(&self) -> DataValidation {
        DataValidation::not_validated()
    }
}

/// An actor in a specific world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorRef {
    pub world: WorldId,
    pub actor: ActorId,
}

impl ActorRef {
    pub fn new(world: &World, actor: ActorId) -> Self {
        Self {
            world: world.id(),
            actor,
        }
    }
}

/// Something an action attached content to
pub trait RosterTarget: Clone + PartialEq {
    fn actor_ref(&self) -> ActorRef;
}

impl RosterTarget for ActorRef {
    fn actor_ref(&self) -> ActorRef {
        *self
    }
}

/// What one activation installed: handler registrations and attached targets
pub struct ContextRoster<T> {
    /// Owner of the instance-started listener for this activation
    listener: Option<ObjectId>,
    handlers: Vec<(WorldId, ExtensionHandlerId)>,
    targets: Vec<T>,
}

impl<T> Default for ContextRoster<T> {
    fn default() -> Self {
        Self {
            listener: None,
            handlers: Vec::new(),
            targets: Vec::new(),
        }
    }
}

impl<T: RosterTarget> ContextRoster<T> {
    pub fn is_empty(&self) -> bool {
        self.listener.is_none() && self.handlers.is_empty() && self.targets.is_empty()
    }

    /// Record a target once
    pub fn add_target(&mut self, target: T) -> bool {
        if self.targets.contains(&target) {
            return false;
        }
        self.targets.push(target);
        true
    }

    pub fn remove_target(&mut self, target: &T) -> bool {
        match self.targets.iter().position(|t| t == target) {
            Some(index) => {
                self.targets.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, target: &T) -> bool {
        self.targets.contains(target)
    }

    pub fn targets(&self) -> &[T] {
        &self.targets
    }

    pub fn num_handlers(&self) -> usize {
        self.handlers.len()
    }
}

/// Rosters of one action, one per activation context
pub struct ActivationTracker<T> {
    rosters: RefCell<HashMap<ActivationContext, ContextRoster<T>>>,
}

impl<T> Default for ActivationTracker<T> {
    fn default() -> Self {
        Self {
            rosters: RefCell::new(HashMap::new()),
        }
    }
}

impl<T: RosterTarget> ActivationTracker<T> {
    /// Run `f` on the roster of `context`, creating it if needed
    ///
    /// Never call back into the world from `f`.
    pub fn with<R>(&self, context: &ActivationContext, f: impl FnOnce(&mut ContextRoster<T>) -> R) -> R {
        let mut rosters = self.rosters.borrow_mut();
        f(rosters.entry(context.clone()).or_default())
    }

    pub fn is_empty(&self, context: &ActivationContext) -> bool {
        self.rosters.borrow().get(context).map_or(true, ContextRoster::is_empty)
    }

    pub fn num_targets(&self, context: &ActivationContext) -> usize {
        self.rosters.borrow().get(context).map_or(0, |r| r.targets.len())
    }

    pub fn num_handlers(&self, context: &ActivationContext) -> usize {
        self.rosters.borrow().get(context).map_or(0, ContextRoster::num_handlers)
    }

    pub fn contains(&self, context: &ActivationContext, target: &T) -> bool {
        self.rosters.borrow().get(context).is_some_and(|r| r.contains(target))
    }

    fn forget(&self, context: &ActivationContext) {
        self.rosters.borrow_mut().remove(context);
    }
}

/// An action following the shared activation protocol
pub(crate) trait ExtensionAction: 'static {
    type Target: RosterTarget;

    fn tracker(&self) -> &ActivationTracker<Self::Target>;

    fn this(&self) -> Weak<Self>;

    /// Install this action's handlers in one game world
    fn add_to_world(&self, world: &mut World, context: &ActivationContext);

    /// Undo the attachment to a rostered target; must drop it from the roster
    fn detach(&self, world: &mut World, target: &Self::Target, context: &ActivationContext);
}

/// Start an activation: reset leftovers, then cover current and future worlds
pub(crate) fn activate<A: ExtensionAction>(action: &A, engine: &mut Engine, context: &ActivationContext) {
    if !action.tracker().is_empty(context) {
        warn!("Activation {:?} still has state from a previous run; resetting", context);
        reset(action, engine, context);
    }

    let owner = ObjectId::next();
    action.tracker().with(context, |roster| roster.listener = Some(owner));

    let weak = action.this();
    let scope = context.clone();
    engine.on_instance_started(
        owner,
        Rc::new(move |world: &mut World| {
            if let Some(action) = weak.upgrade() {
                if scope.applies_to(world.id()) {
                    action.add_to_world(world, &scope);
                }
            }
        }),
    );

    for world in engine.worlds_mut() {
        if context.applies_to(world.id()) {
            action.add_to_world(world, context);
        }
    }
}

/// End an activation and forget its roster
pub(crate) fn deactivate<A: ExtensionAction>(action: &A, engine: &mut Engine, context: &ActivationContext) {
    reset(action, engine, context);
    action.tracker().forget(context);
}

/// Remove handlers, then detach remaining targets newest first
pub(crate) fn reset<A: ExtensionAction>(action: &A, engine: &mut Engine, context: &ActivationContext) {
    let (listener, handlers) = action.tracker().with(context, |roster| {
        (roster.listener.take(), std::mem::take(&mut roster.handlers))
    });

    if let Some(owner) = listener {
        engine.remove_instance_listeners(owner);
    }

    // Live receivers are detached by their handler's ExtensionRemoved event
    for (world_id, handler) in handlers {
        if let Some(world) = engine.world_mut(world_id) {
            world.remove_extension_handler(handler);
        }
    }

    loop {
        let Some(target) = action.tracker().with(context, |roster| roster.targets.last().cloned()) else {
            break;
        };
        let actor = target.actor_ref();

        match engine.world_mut(actor.world) {
            Some(world) if world.is_alive(actor.actor) => action.detach(world, &target, context),
            _ => debug!("Dropping stale target {} from {:?}", actor.actor, context),
        }
        action.tracker().with(context, |roster| roster.remove_target(&target));
    }
}

/// Install `react` as an extension handler for `class`, recorded in the roster
///
/// Non-game worlds and worlds without an extension manager are skipped.
pub(crate) fn add_handler<A, F>(
    action: &A,
    world: &mut World,
    context: &ActivationContext,
    class: ActorClass,
    react: F,
) where
    A: ExtensionAction,
    F: Fn(&A, &mut World, ActorId, &ExtensionEvent) + 'static,
{
    if !world.is_game_world() {
        return;
    }

    let weak = action.this();
    let handler: ExtensionHandler = Rc::new(move |world: &mut World, actor: ActorId, event: &ExtensionEvent| {
        if let Some(action) = weak.upgrade() {
            react(&action, world, actor, event);
        }
    });

    if let Some(id) = world.add_extension_handler(class, handler) {
        let world_id = world.id();
        action.tracker().with(context, |roster| roster.handlers.push((world_id, id)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::world::WorldKind;

    fn actor_ref(world: &World, actor: u64) -> ActorRef {
        ActorRef::new(world, ActorId(actor))
    }

    #[test]
    fn test_context_scope() {
        let a = World::new(WorldKind::Game);
        let b = World::new(WorldKind::Game);

        assert!(ActivationContext::global().applies_to(a.id()));
        assert!(ActivationContext::for_world(a.id()).applies_to(a.id()));
        assert!(!ActivationContext::for_world(a.id()).applies_to(b.id()));
    }

    #[test]
    fn test_roster_targets_are_unique() {
        let world = World::new(WorldKind::Game);
        let mut roster = ContextRoster::default();

        assert!(roster.add_target(actor_ref(&world, 1)));
        assert!(!roster.add_target(actor_ref(&world, 1)));
        assert!(roster.add_target(actor_ref(&world, 2)));
        assert_eq!(roster.targets().len(), 2);

        assert!(roster.remove_target(&actor_ref(&world, 1)));
        assert!(!roster.remove_target(&actor_ref(&world, 1)));
        assert!(!roster.is_empty());
    }

    #[test]
    fn test_tracker_rosters_per_context() {
        let world = World::new(WorldKind::Game);
        let tracker: ActivationTracker<ActorRef> = ActivationTracker::default();
        let global = ActivationContext::global();
        let local = ActivationContext::for_world(world.id());

        tracker.with(&global, |roster| roster.add_target(actor_ref(&world, 1)));
        assert_eq!(tracker.num_targets(&global), 1);
        assert!(tracker.is_empty(&local));

        tracker.forget(&global);
        assert!(tracker.is_empty(&global));
    }
}
