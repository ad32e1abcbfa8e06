// Adds extra input configs to playable pawns

use super::{
    activate, add_handler, deactivate, ActivationContext, ActivationTracker, ActorRef, DataValidation,
    ExtensionAction, GameFeatureAction,
};
use crate::engine::assets::{SharedAssets, SoftRef};
use crate::engine::input::{InputConfig, InputError};
use crate::engine::world::{ActorClass, ActorId, Engine, ExtensionEvent, World};
use crate::game::PlayableFeature;
use log::{debug, error};
use std::rc::{Rc, Weak};

/// Feature action binding additional input configs on locally controlled pawns
///
/// Configs are applied when a pawn gains the extension or announces
/// `BindInputsNow`, and removed again when the extension goes away.
pub struct AddInputConfigs {
    configs: Vec<SoftRef<InputConfig>>,
    assets: SharedAssets,
    this: Weak<Self>,
    tracker: ActivationTracker<ActorRef>,
}

impl AddInputConfigs {
    pub fn new(assets: SharedAssets, configs: Vec<SoftRef<InputConfig>>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            configs,
            assets,
            this: this.clone(),
            tracker: ActivationTracker::default(),
        })
    }

    pub fn configs(&self) -> &[SoftRef<InputConfig>] {
        &self.configs
    }

    pub fn tracker(&self) -> &ActivationTracker<ActorRef> {
        &self.tracker
    }

    fn handle_pawn_extension(
        &self,
        world: &mut World,
        pawn: ActorId,
        event: &ExtensionEvent,
        context: &ActivationContext,
    ) {
        if event.is_removal() {
            self.remove_input_configs(world, &ActorRef::new(world, pawn), context);
        } else if *event == ExtensionEvent::ExtensionAdded || *event == ExtensionEvent::BIND_INPUTS_NOW {
            self.add_input_configs(world, pawn, context);
        }
    }

    fn add_input_configs(&self, world: &mut World, pawn: ActorId, context: &ActivationContext) {
        let Some(controller) = world.controller_of(pawn) else {
            return;
        };
        match world.input_subsystem_for_controller(controller) {
            Ok(_) => {}
            Err(err @ InputError::MissingInputSubsystem(_)) => {
                error!("{}; input configs will not be added to {}", err, pawn);
                return;
            }
            Err(_) => return,
        }

        if PlayableFeature::find_playable_feature(world, pawn).is_some() {
            for config in self.resolve_configs() {
                if let Err(err) = PlayableFeature::add_additional_input_config(world, pawn, config.clone()) {
                    error!("Failed to add input config {} to {}: {}", config.name(), pawn, err);
                }
            }
        }

        let target = ActorRef::new(world, pawn);
        self.tracker.with(context, |roster| roster.add_target(target));
    }

    fn remove_input_configs(&self, world: &mut World, target: &ActorRef, context: &ActivationContext) {
        if !self.tracker.with(context, |roster| roster.remove_target(target)) {
            return;
        }

        for config in self.resolve_configs() {
            PlayableFeature::remove_additional_input_config(world, target.actor, &config);
        }
        debug!("Removed input configs from {}", target.actor);
    }

    fn resolve_configs(&self) -> Vec<Rc<InputConfig>> {
        let mut assets = self.assets.borrow_mut();
        self.configs
            .iter()
            .filter_map(|reference| match assets.resolve(reference) {
                Ok(config) => Some(config),
                Err(err) => {
                    debug!("Skipping input config: {}", err);
                    None
                }
            })
            .collect()
    }
}

impl ExtensionAction for AddInputConfigs {
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
            ActorClass::pawn(),
            move |action: &Self, world: &mut World, pawn: ActorId, event: &ExtensionEvent| {
                action.handle_pawn_extension(world, pawn, event, &scope);
            },
        );
    }

    fn detach(&self, world: &mut World, target: &ActorRef, context: &ActivationContext) {
        self.remove_input_configs(world, target, context);
    }
}

impl GameFeatureAction for AddInputConfigs {
    fn on_activating(&self, engine: &mut Engine, context: &ActivationContext) {
        activate(self, engine, context);
    }

    fn on_deactivating(&self, engine: &mut Engine, context: &ActivationContext) {
        deactivate(self, engine, context);
    }

    fn is_data_valid(&self) -> DataValidation {
        let mut validation = DataValidation::valid();
        for (index, config) in self.configs.iter().enumerate() {
            if config.is_null() {
                validation.add_error(format!("Null InputConfig at index {index}."));
            }
        }
        validation
    }
}
