// Adds mapping contexts to local players of player controllers

use super::{
    activate, add_handler, deactivate, ActivationContext, ActivationTracker, ActorRef, DataValidation,
    ExtensionAction, GameFeatureAction,
};
use crate::core::ObjectId;
use crate::engine::assets::{SharedAssets, SoftRef};
use crate::engine::input::{InputError, InputSubsystem, MappingContext};
use crate::engine::world::{ActorClass, ActorId, Engine, ExtensionEvent, LocalPlayerId, World};
use log::{debug, error};
use std::rc::{Rc, Weak};

/// One mapping context to apply
#[derive(Debug, Clone)]
pub struct InputMappingEntry {
    pub mapping: SoftRef<MappingContext>,
    pub priority: i32,

    /// Also register the context with the player's settings for rebinding
    pub register_with_settings: bool,
}

impl InputMappingEntry {
    pub fn new(mapping: SoftRef<MappingContext>, priority: i32) -> Self {
        Self {
            mapping,
            priority,
            register_with_settings: true,
        }
    }

    pub fn without_settings(mut self) -> Self {
        self.register_with_settings = false;
        self
    }
}

/// Feature action applying mapping contexts to every local player controller
pub struct AddInputContextMapping {
    entries: Vec<InputMappingEntry>,
    assets: SharedAssets,
    this: Weak<Self>,

    /// Identity for instance and local player subscriptions
    owner: ObjectId,
    tracker: ActivationTracker<ActorRef>,
}

impl AddInputContextMapping {
    pub fn new(assets: SharedAssets, entries: Vec<InputMappingEntry>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            entries,
            assets,
            this: this.clone(),
            owner: ObjectId::next(),
            tracker: ActivationTracker::default(),
        })
    }

    pub fn entries(&self) -> &[InputMappingEntry] {
        &self.entries
    }

    pub fn tracker(&self) -> &ActivationTracker<ActorRef> {
        &self.tracker
    }

    fn handle_controller_extension(
        &self,
        world: &mut World,
        controller: ActorId,
        event: &ExtensionEvent,
        context: &ActivationContext,
    ) {
        if event.is_removal() {
            self.remove_input_mapping(world, controller, context);
        } else if *event == ExtensionEvent::ExtensionAdded
            || *event == ExtensionEvent::INPUT_COMPONENT_READY
            || *event == ExtensionEvent::BIND_INPUTS_NOW
        {
            // A pawn binding its default input clears the player's mappings first
            self.add_input_mapping_for_player(world, controller, context);
        }
    }

    fn add_input_mapping_for_player(&self, world: &mut World, controller: ActorId, context: &ActivationContext) {
        let contexts: Vec<(Rc<MappingContext>, i32)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let mapping = self.assets.borrow_mut().resolve(&entry.mapping).ok()?;
                Some((mapping, entry.priority))
            })
            .collect();

        match world.input_subsystem_for_controller(controller) {
            Ok(subsystem) => {
                for (mapping, priority) in &contexts {
                    subsystem.add_mapping_context(mapping, *priority);
                }
                debug!("Added {} mapping contexts for {}", contexts.len(), controller);
            }
            Err(InputError::MissingInputSubsystem(player)) => {
                error!(
                    "Failed to find an input subsystem for local player {:?}. Input mappings will not be added.",
                    player
                );
            }
            // Remote or AI controller
            Err(_) => {}
        }

        let target = ActorRef::new(world, controller);
        self.tracker.with(context, |roster| roster.add_target(target));
    }

    fn remove_input_mapping(&self, world: &mut World, controller: ActorId, context: &ActivationContext) {
        let target = ActorRef::new(world, controller);
        if !self.tracker.with(context, |roster| roster.remove_target(&target)) {
            return;
        }

        if let Ok(subsystem) = world.input_subsystem_for_controller(controller) {
            let assets = self.assets.borrow();
            for entry in &self.entries {
                if let Some(mapping) = assets.get(&entry.mapping) {
                    subsystem.remove_mapping_context(&mapping);
                }
            }
            debug!("Removed mapping contexts for {}", controller);
        }
    }

    // --- Settings registration ---

    fn register_for_world(&self, world: &mut World) {
        if world.is_bound_to_player_events(self.owner) {
            return;
        }

        let (added, removed) = (self.this.clone(), self.this.clone());
        world.subscribe_player_events(
            self.owner,
            Rc::new(move |world: &mut World, player: LocalPlayerId| {
                if let Some(action) = added.upgrade() {
                    action.register_for_player(world, player);
                }
            }),
            Rc::new(move |world: &mut World, player: LocalPlayerId| {
                if let Some(action) = removed.upgrade() {
                    action.unregister_for_player(world, player);
                }
            }),
        );

        for player in world.local_player_ids() {
            self.register_for_player(world, player);
        }
    }

    fn unregister_for_world(&self, world: &mut World) {
        world.unsubscribe_player_events(self.owner);
        for player in world.local_player_ids() {
            self.unregister_for_player(world, player);
        }
    }

    fn register_for_player(&self, world: &mut World, player: LocalPlayerId) {
        let Some(subsystem) = subsystem_of(world, player) else {
            return;
        };
        let settings = subsystem.user_settings_mut();

        for entry in self.entries.iter().filter(|e| e.register_with_settings) {
            match self.assets.borrow_mut().resolve(&entry.mapping) {
                Ok(mapping) => {
                    settings.register_input_mapping_context(&mapping);
                }
                Err(err) => debug!("Skipping mapping registration: {}", err),
            }
        }
    }

    fn unregister_for_player(&self, world: &mut World, player: LocalPlayerId) {
        let Some(subsystem) = subsystem_of(world, player) else {
            return;
        };
        let settings = subsystem.user_settings_mut();
        let assets = self.assets.borrow();

        for entry in self.entries.iter().filter(|e| e.register_with_settings) {
            if let Some(mapping) = assets.get(&entry.mapping) {
                settings.unregister_input_mapping_context(&mapping);
            }
        }
    }
}

fn subsystem_of(world: &mut World, player: LocalPlayerId) -> Option<&mut InputSubsystem> {
    world.local_player_mut(player)?.input_subsystem_mut()
}

impl ExtensionAction for AddInputContextMapping {
    type Target = ActorRef;

    fn tracker(&self) -> &ActivationTracker<ActorRef> {
        &self.tracker
    }

    fn this(&self) -> Weak<Self> {
        self.this.clone()
    }

    fn add_to_world(&self, world: &mut World, context: &ActivationContext) {
        let scope = context.clone();
        add_handler(
            self,
            world,
            context,
            ActorClass::player_controller(),
            move |action: &Self, world: &mut World, actor: ActorId, event: &ExtensionEvent| {
                action.handle_controller_extension(world, actor, event, &scope);
            },
        );
    }

    fn detach(&self, world: &mut World, target: &ActorRef, context: &ActivationContext) {
        self.remove_input_mapping(world, target.actor, context);
    }
}

impl GameFeatureAction for AddInputContextMapping {
    fn on_registering(&self, engine: &mut Engine) {
        let weak = self.this.clone();
        engine.on_instance_started(
            self.owner,
            Rc::new(move |world: &mut World| {
                if let Some(action) = weak.upgrade() {
                    action.register_for_world(world);
                }
            }),
        );

        for world in engine.worlds_mut() {
            self.register_for_world(world);
        }
    }

    fn on_activating(&self, engine: &mut Engine, context: &ActivationContext) {
        activate(self, engine, context);
    }

    fn on_deactivating(&self, engine: &mut Engine, context: &ActivationContext) {
        deactivate(self, engine, context);
    }

    fn on_unregistering(&self, engine: &mut Engine) {
        engine.remove_instance_listeners(self.owner);
        for world in engine.worlds_mut() {
            self.unregister_for_world(world);
        }
    }

    fn is_data_valid(&self) -> DataValidation {
        let mut validation = DataValidation::valid();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.mapping.is_null() {
                validation.add_error(format!("Null InputMapping at index {index}."));
            }
        }
        validation
    }
}
