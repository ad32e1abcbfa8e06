// Playable feature: binds a locally controlled pawn's default input
//
// The feature lives on a pawn and walks a linear init-state chain. Entering
// `DataInitialized` on the owning machine applies the default input config to
// the controller's input component and tells collaborators to bind theirs.
//
// The feature is stored in the world. Every entry point takes it out, runs with
// `&mut World`, puts it back, and only then sends the extension events it
// queued, so handlers reacting to those events can find it again.

use crate::core::{GameplayTag, ObjectId};
use crate::engine::input::move_and_look::{apply_mouse_look, apply_move, apply_stick_look};
use crate::engine::input::tags::{INPUT_LOOK_KM, INPUT_LOOK_PAD, INPUT_MOVE_KM, INPUT_MOVE_PAD, MOVE_AND_LOOK};
use crate::engine::input::{
    ActionCallback, ActionEvent, BindingSession, InputConfig, InputError, TagCallback, TriggerEvent,
};
use crate::engine::world::{Actor, ActorId, ExtensionEvent, NetRole, PawnMotor, World};
use crate::settings::PluginSettings;
use log::{debug, error, info};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Initialization stage of a playable pawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum InitState {
    #[default]
    None,
    /// Pawn exists
    Spawned,
    /// Pawn is driven locally by a player with an input component
    DataAvailable,
    /// Default input config is bound
    DataInitialized,
    GameplayReady,
}

impl InitState {
    /// Next state in the chain
    pub fn next(self) -> Option<InitState> {
        match self {
            Self::None => Some(Self::Spawned),
            Self::Spawned => Some(Self::DataAvailable),
            Self::DataAvailable => Some(Self::DataInitialized),
            Self::DataInitialized => Some(Self::GameplayReady),
            Self::GameplayReady => None,
        }
    }
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Spawned => "InitState.Spawned",
            Self::DataAvailable => "InitState.DataAvailable",
            Self::DataInitialized => "InitState.DataInitialized",
            Self::GameplayReady => "InitState.GameplayReady",
        };
        f.write_str(name)
    }
}

/// Receives tag-routed pressed/released input
pub trait TagInputListener {
    fn tag_pressed(&self, _tag: &GameplayTag) {}
    fn tag_released(&self, _tag: &GameplayTag) {}
}

type ListenerSlot = Rc<RefCell<Option<Rc<dyn TagInputListener>>>>;

/// Bindings made on a controller's input component
struct BoundInput {
    controller: ActorId,
    session: BindingSession,
}

struct AdditionalConfig {
    config: Rc<InputConfig>,
    controller: ActorId,
    session: BindingSession,
}

/// Per-pawn input lifecycle
pub struct PlayableFeature {
    /// Identity every binding of this feature is recorded under
    id: ObjectId,
    pawn: ActorId,
    state: InitState,

    default_config: Option<Rc<InputConfig>>,
    default_mapping_priority: i32,
    pad_look_rates: (f32, f32),

    /// Default config bindings, while initialized
    bound: Option<BoundInput>,

    /// Extra configs added by features, keyed by config
    additional: Vec<AdditionalConfig>,

    /// Shared with bound callbacks so the listener can change after binding
    tag_listener: ListenerSlot,

    /// Events to send once the feature is back in the world
    outbox: Vec<(ActorId, ExtensionEvent)>,
}

impl PlayableFeature {
    pub fn new() -> Self {
        Self::with_settings(&PluginSettings::default())
    }

    pub fn with_settings(settings: &PluginSettings) -> Self {
        Self {
            id: ObjectId::next(),
            pawn: ActorId(0),
            state: InitState::None,
            default_config: None,
            default_mapping_priority: settings.default_mapping_priority,
            pad_look_rates: (settings.pad_look_yaw_rate, settings.pad_look_pitch_rate),
            bound: None,
            additional: Vec::new(),
            tag_listener: Rc::new(RefCell::new(None)),
            outbox: Vec::new(),
        }
    }

    pub fn with_default_config(mut self, config: Rc<InputConfig>) -> Self {
        self.default_config = Some(config);
        self
    }

    pub fn with_tag_listener(self, listener: Rc<dyn TagInputListener>) -> Self {
        *self.tag_listener.borrow_mut() = Some(listener);
        self
    }

    pub fn pawn(&self) -> ActorId {
        self.pawn
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    pub fn default_config(&self) -> Option<&Rc<InputConfig>> {
        self.default_config.as_ref()
    }

    /// Identity the feature's bindings are recorded under
    pub fn binding_owner(&self) -> ObjectId {
        self.id
    }

    /// Controller whose input component holds the default bindings
    pub fn bound_controller(&self) -> Option<ActorId> {
        self.bound.as_ref().map(|b| b.controller)
    }

    pub fn num_default_bindings(&self) -> usize {
        self.bound.as_ref().map_or(0, |b| b.session.len())
    }

    pub fn has_additional_config(&self, config: &Rc<InputConfig>) -> bool {
        self.additional.iter().any(|a| Rc::ptr_eq(&a.config, config))
    }

    pub fn num_additional_configs(&self) -> usize {
        self.additional.len()
    }

    // --- World-facing entry points ---

    /// Attach the feature to `pawn` and begin play
    pub fn attach(world: &mut World, pawn: ActorId, mut feature: PlayableFeature) {
        assert!(
            world.actor(pawn).is_some_and(Actor::is_pawn),
            "PlayableFeature on {pawn} can only be added to pawn actors"
        );
        assert!(
            world.playable(pawn).is_none(),
            "Only one PlayableFeature should exist on {pawn}"
        );

        feature.pawn = pawn;
        world.put_playable(pawn, feature);

        Self::with_feature(world, pawn, |feature, world| {
            feature.try_change_init_state(world, InitState::Spawned);
            feature.continue_init_state_chain(world);
        });
    }

    /// Unbind everything and remove the feature from `pawn`
    pub fn end_play(world: &mut World, pawn: ActorId) {
        if let Some(mut feature) = world.take_playable(pawn) {
            feature.unbind_input(world);
            debug!("Playable feature on {} ended play", pawn);
        }
    }

    /// Playable feature on `pawn`, if any
    pub fn find_playable_feature(world: &World, pawn: ActorId) -> Option<&PlayableFeature> {
        world.playable(pawn)
    }

    /// Advance the init-state chain as far as the guards allow
    pub fn check_default_initialization(world: &mut World, pawn: ActorId) {
        Self::with_feature(world, pawn, |feature, world| {
            feature.continue_init_state_chain(world);
        });
    }

    /// Unwind bindings for the previous controller and re-run the chain
    pub fn handle_controller_changed(
        world: &mut World,
        pawn: ActorId,
        old_controller: Option<ActorId>,
        new_controller: Option<ActorId>,
    ) {
        Self::with_feature(world, pawn, |feature, world| {
            debug!(
                "Controller of {} changed: {:?} -> {:?}",
                pawn, old_controller, new_controller
            );
            feature.unbind_input(world);

            // Locality and bot checks must be re-evaluated for the new controller
            if feature.state > InitState::Spawned {
                feature.state = InitState::Spawned;
                feature.log_state(world, InitState::Spawned);
            }
            feature.continue_init_state_chain(world);
        });
    }

    /// Replace the default config of a locally controlled pawn
    pub fn set_input_config(world: &mut World, pawn: ActorId, config: Rc<InputConfig>) {
        Self::with_feature(world, pawn, |feature, world| {
            if !world.is_locally_controlled(pawn) {
                return;
            }
            if feature
                .default_config
                .as_ref()
                .is_some_and(|current| Rc::ptr_eq(current, &config))
            {
                return;
            }
            feature.default_config = Some(config);

            if feature.state >= InitState::DataInitialized {
                feature.unbind_input(world);
                if let Err(err) = feature.initialize_player_input(world) {
                    error!("Failed to rebind input on {}: {}", pawn, err);
                }
            } else {
                feature.continue_init_state_chain(world);
            }
        });
    }

    /// Bind an extra config's tag-routed actions; a config already added is a no-op
    ///
    /// Returns `Ok(false)` when nothing was bound.
    pub fn add_additional_input_config(
        world: &mut World,
        pawn: ActorId,
        config: Rc<InputConfig>,
    ) -> Result<bool, InputError> {
        Self::with_feature(world, pawn, |feature, world| feature.bind_additional(world, config))
            .unwrap_or(Ok(false))
    }

    /// Remove exactly the bindings an extra config made
    pub fn remove_additional_input_config(world: &mut World, pawn: ActorId, config: &Rc<InputConfig>) -> bool {
        Self::with_feature(world, pawn, |feature, world| {
            let Some(index) = feature.additional.iter().position(|a| Rc::ptr_eq(&a.config, config)) else {
                return false;
            };
            let mut extra = feature.additional.remove(index);
            match world.input_component_mut(extra.controller) {
                Some(component) => extra.session.flush(component),
                None => extra.session.forget(),
            }
            debug!("Removed input config {} from {}", config.name(), pawn);
            true
        })
        .unwrap_or(false)
    }

    /// Route tag-routed input to `listener` from now on
    pub fn set_tag_listener(world: &World, pawn: ActorId, listener: Rc<dyn TagInputListener>) -> bool {
        match world.playable(pawn) {
            Some(feature) => {
                *feature.tag_listener.borrow_mut() = Some(listener);
                true
            }
            None => false,
        }
    }

    fn with_feature<R>(
        world: &mut World,
        pawn: ActorId,
        f: impl FnOnce(&mut PlayableFeature, &mut World) -> R,
    ) -> Option<R> {
        let mut feature = world.take_playable(pawn)?;
        let result = f(&mut feature, world);

        let outbox = std::mem::take(&mut feature.outbox);
        world.put_playable(pawn, feature);
        for (actor, event) in outbox {
            world.send_extension_event(actor, event);
        }
        Some(result)
    }

    // --- Init-state chain ---

    fn can_change_init_state(&self, world: &World, current: InitState, desired: InitState) -> bool {
        match (current, desired) {
            (InitState::None, InitState::Spawned) => world.is_alive(self.pawn),
            (InitState::Spawned, InitState::DataAvailable) => {
                let Some(pawn) = world.actor(self.pawn) else {
                    return false;
                };
                if pawn.role() == NetRole::SimulatedProxy {
                    return false;
                }
                if !world.is_locally_controlled(self.pawn) || world.is_bot_controlled(self.pawn) {
                    return false;
                }
                world
                    .controller_of(self.pawn)
                    .is_some_and(|controller| world.input_component(controller).is_some())
            }
            (InitState::DataAvailable, InitState::DataInitialized) => self.default_config.is_some(),
            (InitState::DataInitialized, InitState::GameplayReady) => true,
            _ => false,
        }
    }

    fn handle_change_init_state(&mut self, world: &mut World, current: InitState, desired: InitState) {
        self.log_state(world, desired);

        if current == InitState::DataAvailable
            && desired == InitState::DataInitialized
            && world.is_locally_controlled(self.pawn)
        {
            if let Err(err) = self.initialize_player_input(world) {
                error!("Failed to bind input on {}: {}", self.pawn, err);
            }
        }
    }

    fn try_change_init_state(&mut self, world: &mut World, desired: InitState) -> bool {
        let current = self.state;
        if !self.can_change_init_state(world, current, desired) {
            return false;
        }
        self.handle_change_init_state(world, current, desired);
        self.state = desired;
        true
    }

    fn continue_init_state_chain(&mut self, world: &mut World) {
        while let Some(next) = self.state.next() {
            if !self.try_change_init_state(world, next) {
                break;
            }
        }
    }

    fn log_state(&self, world: &World, state: InitState) {
        let side = match world.actor(self.pawn).map(Actor::role) {
            Some(NetRole::Authority) => "SERVER",
            _ => "CLIENT",
        };
        info!("[{}] Playable feature init state reached: {}", side, state);
    }

    // --- Binding ---

    fn initialize_player_input(&mut self, world: &mut World) -> Result<(), InputError> {
        let Some(config) = self.default_config.clone() else {
            return Ok(());
        };
        let controller = world
            .controller_of(self.pawn)
            .ok_or(InputError::MissingController(self.pawn))?;

        let subsystem = world.input_subsystem_for_controller(controller)?;
        subsystem.clear_all_mappings();
        if let Some(mapping) = config.default_mapping() {
            subsystem.add_mapping_context(mapping, self.default_mapping_priority);
        }

        let motor = world
            .actor(self.pawn)
            .and_then(Actor::motor)
            .map(Rc::downgrade)
            .unwrap_or_default();
        let (pressed, released) = self.tag_callbacks();

        let component = world
            .input_component_mut(controller)
            .ok_or(InputError::MissingInputComponent(controller))?;
        let mut session = BindingSession::new();
        session.bind_tags(&config, component, self.id, Some(&pressed), Some(&released));

        for tag in MOVE_AND_LOOK {
            let callback = self.native_callback(tag, motor.clone());
            session.bind_native(&config, component, &GameplayTag::new(tag), TriggerEvent::Triggered, self.id, callback);
        }
        debug!(
            "Bound input config {} for {} on {} ({} bindings)",
            config.name(),
            self.pawn,
            controller,
            session.len()
        );
        self.bound = Some(BoundInput { controller, session });

        self.outbox.push((controller, ExtensionEvent::BIND_INPUTS_NOW));
        self.outbox.push((self.pawn, ExtensionEvent::BIND_INPUTS_NOW));
        Ok(())
    }

    fn bind_additional(&mut self, world: &mut World, config: Rc<InputConfig>) -> Result<bool, InputError> {
        if self.has_additional_config(&config) {
            return Ok(false);
        }
        let controller = world
            .controller_of(self.pawn)
            .ok_or(InputError::MissingController(self.pawn))?;
        world.input_subsystem_for_controller(controller)?;

        let (pressed, released) = self.tag_callbacks();
        let component = world
            .input_component_mut(controller)
            .ok_or(InputError::MissingInputComponent(controller))?;
        let mut session = BindingSession::new();
        session.bind_tags(&config, component, self.id, Some(&pressed), Some(&released));

        debug!("Added input config {} to {}", config.name(), self.pawn);
        self.additional.push(AdditionalConfig {
            config,
            controller,
            session,
        });
        Ok(true)
    }

    /// Drop every binding and the local player's mappings
    fn unbind_input(&mut self, world: &mut World) {
        for mut extra in self.additional.drain(..) {
            match world.input_component_mut(extra.controller) {
                Some(component) => extra.session.flush(component),
                None => extra.session.forget(),
            }
        }

        let Some(mut bound) = self.bound.take() else {
            return;
        };
        match world.input_component_mut(bound.controller) {
            Some(component) => {
                bound.session.flush(component);
                component.clear_bindings_for_owner(self.id);
            }
            None => bound.session.forget(),
        }
        if let Ok(subsystem) = world.input_subsystem_for_controller(bound.controller) {
            subsystem.clear_all_mappings();
        }
        debug!("Unbound input for {} from {}", self.pawn, bound.controller);
    }

    fn tag_callbacks(&self) -> (TagCallback, TagCallback) {
        let slot = self.tag_listener.clone();
        let pressed: TagCallback = Rc::new(move |tag: &GameplayTag| {
            let listener = slot.borrow().clone();
            if let Some(listener) = listener {
                listener.tag_pressed(tag);
            }
        });

        let slot = self.tag_listener.clone();
        let released: TagCallback = Rc::new(move |tag: &GameplayTag| {
            let listener = slot.borrow().clone();
            if let Some(listener) = listener {
                listener.tag_released(tag);
            }
        });
        (pressed, released)
    }

    fn native_callback(&self, tag: &'static str, motor: Weak<RefCell<PawnMotor>>) -> ActionCallback {
        let (yaw_rate, pitch_rate) = self.pad_look_rates;
        Rc::new(move |event: &ActionEvent| {
            let Some(motor) = motor.upgrade() else {
                return;
            };
            let mut motor = motor.borrow_mut();
            let value = event.value.as_axis2d();
            match tag {
                INPUT_MOVE_KM | INPUT_MOVE_PAD => apply_move(&mut motor, value),
                INPUT_LOOK_KM => apply_mouse_look(&mut motor, value),
                INPUT_LOOK_PAD => apply_stick_look(&mut motor, value, yaw_rate, pitch_rate, event.delta_seconds),
                _ => {}
            }
        })
    }
}

impl Default for PlayableFeature {
    fn default() -> Self {
        Self::new()
    }
}
