// World: the host environment input features attach to
//
// The world owns actors and their components, local players, and the extension
// manager. It is always passed explicitly to the code that needs it; nothing here
// is reachable through a global.
//
// ## Architecture
//
// - `actor`: actor handles, classes, net roles, pawn movement state
// - `extension`: per-class extension handlers and receiver bookkeeping
// - `player`: local players and their add/remove listeners
// - `engine`: the set of running worlds and the instance-started event

mod actor;
mod engine;
mod extension;
mod player;

pub use actor::{Actor, ActorClass, ActorId, ActorSpec, NetRole, PawnMotor};
pub use engine::{Engine, InstanceListener};
pub use extension::{ExtensionEvent, ExtensionHandler, ExtensionHandlerId, ExtensionManager};
pub use player::{LocalPlayer, LocalPlayerId, PlayerListener};

use crate::core::ObjectId;
use crate::engine::input::{
    ActionEvent, InputAction, InputActionValue, InputComponent, InputError, InputSubsystem,
    ProcessorClass, ProcessorContext, TriggerEvent,
};
use crate::game::PlayableFeature;
use log::{debug, trace};
use player::PlayerListeners;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Default frame time (60 updates per second)
pub const DEFAULT_DELTA_SECONDS: f32 = 1.0 / 60.0;

/// Identity of a running world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(ObjectId);

/// What a world is used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldKind {
    /// Standalone or packaged game
    Game,
    /// Play session started from the editor
    PlayInEditor,
    /// Level being edited
    Editor,
    /// Asset thumbnail or preview scene
    EditorPreview,
}

impl WorldKind {
    pub fn is_game_world(&self) -> bool {
        matches!(self, Self::Game | Self::PlayInEditor)
    }
}

/// One running game instance and its world
pub struct World {
    id: WorldId,
    kind: WorldKind,

    /// Live actors, in spawn order
    actors: BTreeMap<ActorId, Actor>,

    /// Input components by owning actor
    input_components: BTreeMap<ActorId, InputComponent>,

    /// Playable features by pawn
    playables: BTreeMap<ActorId, PlayableFeature>,

    local_players: BTreeMap<LocalPlayerId, LocalPlayer>,
    player_listeners: PlayerListeners,

    /// Only game worlds carry an extension manager
    extensions: Option<ExtensionManager>,

    delta_seconds: f32,
    next_actor: u64,
    next_player: u32,
}

impl World {
    /// Create a new world; game worlds get an extension manager
    pub fn new(kind: WorldKind) -> Self {
        Self {
            id: WorldId(ObjectId::next()),
            kind,
            actors: BTreeMap::new(),
            input_components: BTreeMap::new(),
            playables: BTreeMap::new(),
            local_players: BTreeMap::new(),
            player_listeners: PlayerListeners::default(),
            extensions: kind.is_game_world().then(ExtensionManager::new),
            delta_seconds: DEFAULT_DELTA_SECONDS,
            next_actor: 0,
            next_player: 0,
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn kind(&self) -> WorldKind {
        self.kind
    }

    pub fn is_game_world(&self) -> bool {
        self.kind.is_game_world()
    }

    pub fn delta_seconds(&self) -> f32 {
        self.delta_seconds
    }

    pub fn set_delta_seconds(&mut self, delta_seconds: f32) {
        self.delta_seconds = delta_seconds;
    }

    // --- Actors ---

    /// Spawn an actor and run its registration events
    pub fn spawn_actor(&mut self, spec: ActorSpec) -> ActorId {
        self.next_actor += 1;
        let id = ActorId(self.next_actor);

        let is_pawn = spec.class.is_child_of(&ActorClass::pawn());
        let actor = Actor {
            id,
            name: spec.name,
            class: spec.class,
            role: spec.role,
            controller: None,
            pawn: None,
            local_player: spec.local_player,
            motor: is_pawn.then(Default::default),
        };
        debug!("Spawned {} '{}' ({})", id, actor.name, actor.class);
        self.actors.insert(id, actor);

        if let Some(player) = spec.local_player.and_then(|p| self.local_players.get_mut(&p)) {
            player.controller = Some(id);
        }

        if spec.receiver {
            self.add_receiver(id);
        }

        if spec.input_component {
            self.add_input_component(id);
        }

        id
    }

    /// End play for an actor and remove it from the world
    pub fn destroy_actor(&mut self, id: ActorId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        debug!("Destroying {}", id);

        self.remove_receiver(id);
        PlayableFeature::end_play(self, id);

        // A dying controller hands its pawn back before its input component goes away
        if let Some(pawn) = self.pawn_of(id) {
            self.unpossess(id);
            trace!("{} lost its controller {}", pawn, id);
        }
        if let Some(controller) = self.controller_of(id) {
            if let Some(actor) = self.actors.get_mut(&controller) {
                actor.pawn = None;
            }
        }

        self.remove_input_component(id);

        if let Some(actor) = self.actors.remove(&id) {
            if let Some(player) = actor.local_player.and_then(|p| self.local_players.get_mut(&p)) {
                if player.controller == Some(id) {
                    player.controller = None;
                }
            }
        }
        true
    }

    /// End play for every actor, newest first
    pub fn shutdown(&mut self) {
        let ids: Vec<ActorId> = self.actors.keys().rev().copied().collect();
        for id in ids {
            self.destroy_actor(id);
        }
    }

    pub fn is_alive(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    pub fn actor_is_a(&self, id: ActorId, class: &ActorClass) -> bool {
        self.actor(id).is_some_and(|actor| actor.is_a(class))
    }

    // --- Possession ---

    /// Make `controller` drive `pawn`, notifying the pawn's playable feature
    pub fn possess(&mut self, controller: ActorId, pawn: ActorId) {
        assert!(
            self.actor(controller).is_some_and(Actor::is_controller),
            "possess: {controller} is not a live controller"
        );
        assert!(
            self.actor(pawn).is_some_and(Actor::is_pawn),
            "possess: {pawn} is not a live pawn"
        );

        let previous_controller = self.controller_of(pawn);
        if previous_controller == Some(controller) {
            return;
        }

        if self.pawn_of(controller).is_some() {
            self.unpossess(controller);
        }
        if let Some(previous) = previous_controller.and_then(|c| self.actors.get_mut(&c)) {
            previous.pawn = None;
        }

        if let Some(actor) = self.actors.get_mut(&controller) {
            actor.pawn = Some(pawn);
        }
        if let Some(actor) = self.actors.get_mut(&pawn) {
            actor.controller = Some(controller);
        }
        debug!("{} possessed {}", controller, pawn);

        PlayableFeature::handle_controller_changed(self, pawn, previous_controller, Some(controller));
    }

    /// Release the pawn driven by `controller`, if any
    pub fn unpossess(&mut self, controller: ActorId) {
        let Some(pawn) = self.actors.get_mut(&controller).and_then(|a| a.pawn.take()) else {
            return;
        };
        if let Some(actor) = self.actors.get_mut(&pawn) {
            actor.controller = None;
        }
        debug!("{} unpossessed {}", controller, pawn);

        PlayableFeature::handle_controller_changed(self, pawn, Some(controller), None);
    }

    pub fn controller_of(&self, pawn: ActorId) -> Option<ActorId> {
        self.actor(pawn)?.controller
    }

    pub fn pawn_of(&self, controller: ActorId) -> Option<ActorId> {
        self.actor(controller)?.pawn
    }

    pub fn local_player_of(&self, controller: ActorId) -> Option<LocalPlayerId> {
        self.actor(controller)?.local_player
    }

    /// Pawn is driven by a player controller on this machine
    pub fn is_locally_controlled(&self, pawn: ActorId) -> bool {
        self.controller_of(pawn)
            .and_then(|c| self.actor(c))
            .is_some_and(|c| c.is_player_controller() && c.local_player.is_some())
    }

    /// Pawn is driven by an AI controller
    pub fn is_bot_controlled(&self, pawn: ActorId) -> bool {
        self.controller_of(pawn)
            .and_then(|c| self.actor(c))
            .is_some_and(|c| !c.is_player_controller())
    }

    // --- Input components ---

    /// Register an input component on an actor and announce it
    pub fn add_input_component(&mut self, actor: ActorId) -> bool {
        if !self.is_alive(actor) || self.input_components.contains_key(&actor) {
            return false;
        }
        self.input_components.insert(actor, InputComponent::new(actor));
        self.send_extension_event(actor, ExtensionEvent::INPUT_COMPONENT_READY);

        // A pawn waiting on its controller's input component can move on now
        if let Some(pawn) = self.pawn_of(actor) {
            PlayableFeature::check_default_initialization(self, pawn);
        }
        true
    }

    /// Unregister an input component, tearing down its processors
    pub fn remove_input_component(&mut self, actor: ActorId) -> bool {
        let context = self.processor_context(actor);
        match self.input_components.remove(&actor) {
            Some(mut component) => {
                component.remove_all_input_processors(&context);
                true
            }
            None => false,
        }
    }

    pub fn input_component(&self, actor: ActorId) -> Option<&InputComponent> {
        self.input_components.get(&actor)
    }

    pub fn input_component_mut(&mut self, actor: ActorId) -> Option<&mut InputComponent> {
        self.input_components.get_mut(&actor)
    }

    /// Context handed to processors created on `actor`'s input component
    pub fn processor_context(&self, actor: ActorId) -> ProcessorContext {
        // A controller's processors drive its pawn; a pawn's drive itself
        let pawn = match self.actor(actor) {
            Some(a) if a.is_controller() => a.pawn,
            Some(a) if a.is_pawn() => Some(actor),
            _ => None,
        };
        let motor = pawn
            .and_then(|p| self.actor(p))
            .and_then(|p| p.motor.as_ref())
            .map(Rc::downgrade);

        ProcessorContext {
            owner: actor,
            pawn,
            motor,
        }
    }

    /// Add a processor to `actor`'s input component; `None` is a no-op
    pub fn add_input_processor(&mut self, actor: ActorId, class: Option<&ProcessorClass>) -> bool {
        let context = self.processor_context(actor);
        match self.input_components.get_mut(&actor) {
            Some(component) => component.add_input_processor(class, &context),
            None => false,
        }
    }

    pub fn remove_input_processor(&mut self, actor: ActorId, class_name: &str) -> bool {
        let context = self.processor_context(actor);
        match self.input_components.get_mut(&actor) {
            Some(component) => component.remove_input_processor(class_name, &context),
            None => false,
        }
    }

    /// Share a processor on `actor`'s input component with `claimant`
    pub fn claim_input_processor(&mut self, actor: ActorId, class: &ProcessorClass, claimant: ObjectId) -> bool {
        let context = self.processor_context(actor);
        match self.input_components.get_mut(&actor) {
            Some(component) => component.claim_input_processor(class, claimant, &context),
            None => false,
        }
    }

    pub fn release_input_processor(&mut self, actor: ActorId, class_name: &str, claimant: ObjectId) -> bool {
        let context = self.processor_context(actor);
        match self.input_components.get_mut(&actor) {
            Some(component) => component.release_input_processor(class_name, claimant, &context),
            None => false,
        }
    }

    pub fn remove_all_input_processors(&mut self, actor: ActorId) {
        let context = self.processor_context(actor);
        if let Some(component) = self.input_components.get_mut(&actor) {
            component.remove_all_input_processors(&context);
        }
    }

    /// Deliver an input event to `actor`'s input component
    ///
    /// Returns the number of subscriptions that received it.
    pub fn process_input(
        &self,
        actor: ActorId,
        action: &InputAction,
        phase: TriggerEvent,
        value: InputActionValue,
    ) -> usize {
        let event = ActionEvent::new(phase, value, self.delta_seconds);
        self.input_components
            .get(&actor)
            .map_or(0, |component| component.process_action(action, &event))
    }

    // --- Local players ---

    /// Add a local player and notify listeners
    pub fn add_local_player(&mut self, with_input_subsystem: bool) -> LocalPlayerId {
        let id = LocalPlayerId(self.next_player);
        self.next_player += 1;
        self.local_players
            .insert(id, LocalPlayer::new(id, with_input_subsystem));
        debug!("Added local player {:?}", id);

        for listener in self.player_listeners.added() {
            listener(self, id);
        }
        id
    }

    /// Notify listeners, then remove the local player
    pub fn remove_local_player(&mut self, id: LocalPlayerId) -> bool {
        if !self.local_players.contains_key(&id) {
            return false;
        }
        for listener in self.player_listeners.removed() {
            listener(self, id);
        }

        if let Some(player) = self.local_players.remove(&id) {
            if let Some(actor) = player.controller.and_then(|c| self.actors.get_mut(&c)) {
                actor.local_player = None;
            }
        }
        debug!("Removed local player {:?}", id);
        true
    }

    pub fn local_player(&self, id: LocalPlayerId) -> Option<&LocalPlayer> {
        self.local_players.get(&id)
    }

    pub fn local_player_mut(&mut self, id: LocalPlayerId) -> Option<&mut LocalPlayer> {
        self.local_players.get_mut(&id)
    }

    pub fn local_player_ids(&self) -> Vec<LocalPlayerId> {
        self.local_players.keys().copied().collect()
    }

    /// Mapping subsystem of the local player behind `controller`
    pub fn input_subsystem_for_controller(
        &mut self,
        controller: ActorId,
    ) -> Result<&mut InputSubsystem, InputError> {
        let player = self
            .local_player_of(controller)
            .ok_or(InputError::MissingLocalPlayer(controller))?;
        self.local_players
            .get_mut(&player)
            .and_then(LocalPlayer::input_subsystem_mut)
            .ok_or(InputError::MissingInputSubsystem(player))
    }

    pub fn subscribe_player_events(
        &mut self,
        owner: ObjectId,
        on_added: PlayerListener,
        on_removed: PlayerListener,
    ) {
        self.player_listeners.subscribe(owner, on_added, on_removed);
    }

    pub fn is_bound_to_player_events(&self, owner: ObjectId) -> bool {
        self.player_listeners.is_bound_to(owner)
    }

    pub fn unsubscribe_player_events(&mut self, owner: ObjectId) -> usize {
        self.player_listeners.remove_all(owner)
    }

    // --- Extensions ---

    pub fn extension_manager(&self) -> Option<&ExtensionManager> {
        self.extensions.as_ref()
    }

    /// Install a handler for `class`; existing receivers get `ExtensionAdded`
    ///
    /// Returns `None` when the world has no extension manager.
    pub fn add_extension_handler(
        &mut self,
        class: ActorClass,
        handler: ExtensionHandler,
    ) -> Option<ExtensionHandlerId> {
        let manager = self.extensions.as_mut()?;
        let id = manager.register(class.clone(), handler.clone());
        let receivers = manager.receivers();

        for actor in receivers {
            if self.actor_is_a(actor, &class) {
                handler(self, actor, &ExtensionEvent::ExtensionAdded);
            }
        }
        Some(id)
    }

    /// Remove a handler; live receivers get `ExtensionRemoved`
    pub fn remove_extension_handler(&mut self, id: ExtensionHandlerId) -> bool {
        let Some(manager) = self.extensions.as_mut() else {
            return false;
        };
        let Some((class, handler)) = manager.unregister(id) else {
            return false;
        };
        let receivers = manager.receivers();

        for actor in receivers {
            if self.actor_is_a(actor, &class) {
                handler(self, actor, &ExtensionEvent::ExtensionRemoved);
            }
        }
        true
    }

    /// Send a named event to every handler matching `actor`'s class
    pub fn send_extension_event(&mut self, actor: ActorId, event: ExtensionEvent) {
        let Some(class) = self.actor(actor).map(|a| a.class.clone()) else {
            return;
        };
        let handlers = match &self.extensions {
            Some(manager) => manager.handlers_for(&class),
            None => return,
        };
        trace!("Extension event {} on {}", event, actor);

        for handler in handlers {
            handler(self, actor, &event);
        }
    }

    fn add_receiver(&mut self, actor: ActorId) {
        let added = self
            .extensions
            .as_mut()
            .is_some_and(|manager| manager.add_receiver(actor));
        if added {
            self.send_extension_event(actor, ExtensionEvent::ExtensionAdded);
        }
    }

    fn remove_receiver(&mut self, actor: ActorId) {
        let removed = self
            .extensions
            .as_mut()
            .is_some_and(|manager| manager.remove_receiver(actor));
        if removed {
            self.send_extension_event(actor, ExtensionEvent::ReceiverRemoved);
        }
    }

    // --- Playable features ---

    pub fn playable(&self, pawn: ActorId) -> Option<&PlayableFeature> {
        self.playables.get(&pawn)
    }

    pub(crate) fn take_playable(&mut self, pawn: ActorId) -> Option<PlayableFeature> {
        self.playables.remove(&pawn)
    }

    pub(crate) fn put_playable(&mut self, pawn: ActorId, feature: PlayableFeature) {
        self.playables.insert(pawn, feature);
    }
}
