// Adds input processors to actors' input components

use super::{
    activate, add_handler, deactivate, ActivationContext, ActivationTracker, ActorRef, DataValidation,
    ExtensionAction, GameFeatureAction, RosterTarget,
};
use crate::core::ObjectId;
use crate::engine::assets::{SharedAssets, SoftRef};
use crate::engine::input::ProcessorClass;
use crate::engine::world::{ActorClass, ActorId, Engine, ExtensionEvent, World};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Processors to add to every actor of a class
#[derive(Debug, Clone)]
pub struct ProcessorsToAdd {
    pub actor_class: SoftRef<ActorClass>,
    pub processors: Vec<SoftRef<ProcessorClass>>,
}

/// Actor plus the entry whose processors it received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorTarget {
    pub actor: ActorRef,
    pub entry: usize,
}

impl RosterTarget for ProcessorTarget {
    fn actor_ref(&self) -> ActorRef {
        self.actor
    }
}

/// Feature action installing input processors on matching actors
///
/// Processors are claimed rather than owned: a class already on the component,
/// or shared with another activation, stays until its last claim is released.
pub struct AddInputProcessors {
    entries: Vec<ProcessorsToAdd>,
    assets: SharedAssets,
    this: Weak<Self>,
    tracker: ActivationTracker<ProcessorTarget>,
    claimants: RefCell<HashMap<(ActivationContext, usize), ObjectId>>,
}

impl AddInputProcessors {
    pub fn new(assets: SharedAssets, entries: Vec<ProcessorsToAdd>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            entries,
            assets,
            this: this.clone(),
            tracker: ActivationTracker::default(),
            claimants: RefCell::new(HashMap::new()),
        })
    }

    pub fn tracker(&self) -> &ActivationTracker<ProcessorTarget> {
        &self.tracker
    }

    /// Identity the processors of one entry are claimed under in one activation
    fn claimant(&self, context: &ActivationContext, entry: usize) -> ObjectId {
        *self
            .claimants
            .borrow_mut()
            .entry((context.clone(), entry))
            .or_insert_with(ObjectId::next)
    }

    fn handle_actor_extension(
        &self,
        world: &mut World,
        actor: ActorId,
        event: &ExtensionEvent,
        entry: usize,
        context: &ActivationContext,
    ) {
        let target = ProcessorTarget {
            actor: ActorRef::new(world, actor),
            entry,
        };
        if event.is_removal() {
            self.remove_processors(world, &target, context);
        } else if *event == ExtensionEvent::ExtensionAdded || *event == ExtensionEvent::INPUT_COMPONENT_READY {
            self.add_processors(world, target, context);
        }
    }

    fn add_processors(&self, world: &mut World, target: ProcessorTarget, context: &ActivationContext) {
        let actor = target.actor.actor;
        // Actors get an input component later; InputComponentReady brings us back
        if world.input_component(actor).is_none() {
            return;
        }

        let claimant = self.claimant(context, target.entry);
        for class in self.resolve_processors(target.entry) {
            world.claim_input_processor(actor, &class, claimant);
        }
        debug!("Added processors of entry {} to {}", target.entry, actor);
        self.tracker.with(context, |roster| roster.add_target(target));
    }

    fn remove_processors(&self, world: &mut World, target: &ProcessorTarget, context: &ActivationContext) {
        if !self.tracker.with(context, |roster| roster.remove_target(target)) {
            return;
        }

        let actor = target.actor.actor;
        let names: Vec<String> = {
            let assets = self.assets.borrow();
            self.entries[target.entry]
                .processors
                .iter()
                .filter_map(|reference| assets.get(reference))
                .map(|class| class.name().to_string())
                .collect()
        };
        let claimant = self.claimant(context, target.entry);
        for name in &names {
            world.release_input_processor(actor, name, claimant);
        }
        debug!("Removed processors of entry {} from {}", target.entry, actor);
    }

    fn resolve_processors(&self, entry: usize) -> Vec<Rc<ProcessorClass>> {
        let mut assets = self.assets.borrow_mut();
        self.entries[entry]
            .processors
            .iter()
            .filter_map(|reference| match assets.resolve(reference) {
                Ok(class) => Some(class),
                Err(err) => {
                    debug!("Skipping processor: {}", err);
                    None
                }
            })
            .collect()
    }
}

impl ExtensionAction for AddInputProcessors {
    type Target = ProcessorTarget;

    fn tracker(&self) -> &ActivationTracker<ProcessorTarget> {
        &self.tracker
    }

    fn this(&self) -> Weak<Self> {
        self.this.clone()
    }

    fn add_to_world(&self, world: &mut World, context: &ActivationContext) {
        for (index, entry) in self.entries.iter().enumerate() {
            let class = match self.assets.borrow_mut().resolve(&entry.actor_class) {
                Ok(class) => (*class).clone(),
                Err(err) => {
                    debug!("Skipping processor entry {}: {}", index, err);
                    continue;
                }
            };

            let scope = context.clone();
            add_handler(
                self,
                world,
                context,
                class,
                move |action: &Self, world: &mut World, actor: ActorId, event: &ExtensionEvent| {
                    action.handle_actor_extension(world, actor, event, index, &scope);
                },
            );
        }
    }

    fn detach(&self, world: &mut World, target: &ProcessorTarget, context: &ActivationContext) {
        self.remove_processors(world, target, context);
    }
}

impl GameFeatureAction for AddInputProcessors {
    fn on_activating(&self, engine: &mut Engine, context: &ActivationContext) {
        activate(self, engine, context);
    }

    fn on_deactivating(&self, engine: &mut Engine, context: &ActivationContext) {
        deactivate(self, engine, context);
    }

    fn is_data_valid(&self) -> DataValidation {
        let mut validation = DataValidation::valid();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.actor_class.is_null() {
                validation.add_error(format!("Null ActorClass at index {index}."));
            }
        }
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameplayTag;
    use crate::engine::input::{
        ActionEvent, InputAction, InputActionValue, InputProcessor, MoveAndLook, ProcessorContext, ProcessorSettings,
        TriggerEvent,
    };
    use crate::engine::input::tags::INPUT_MOVE_KM;
    use crate::engine::world::{ActorSpec, WorldId, WorldKind};
    use std::cell::Cell;

    struct Counter {
        settings: ProcessorSettings,
        hits: Rc<RefCell<u32>>,
    }

    impl InputProcessor for Counter {
        fn settings(&self) -> &ProcessorSettings {
            &self.settings
        }

        fn on_started(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {
            *self.hits.borrow_mut() += 1;
        }
    }

    struct Fixture {
        engine: Engine,
        world: WorldId,
        jump: Rc<InputAction>,
        hits: Rc<RefCell<u32>>,
        action: Rc<AddInputProcessors>,
    }

    fn fixture() -> Fixture {
        let mut engine = Engine::new();
        let jump = InputAction::digital("IA_Jump");
        let hits = Rc::new(RefCell::new(0));

        let (counter, move_and_look, turret) = {
            let shared = engine.assets();
            let mut assets = shared.borrow_mut();
            let settings = ProcessorSettings::new().with_action("Input.Jump", jump.clone());
            let sink = hits.clone();
            let counter = assets.add_loadable("Processors/Counter", move || {
                let settings = settings.clone();
                let sink = sink.clone();
                ProcessorClass::new("Counter", move || Counter {
                    settings: settings.clone(),
                    hits: sink.clone(),
                })
            });
            let move_and_look = assets.add_loaded(
                "Processors/MoveAndLook",
                Rc::new(MoveAndLook::class(
                    MoveAndLook::new().with_action(INPUT_MOVE_KM, InputAction::axis2d("IA_Move")),
                )),
            );
            let turret = assets.add_loaded("Classes/Turret", Rc::new(ActorClass::actor().subclass("Turret")));
            assets.add_loaded("Classes/Pawn", Rc::new(ActorClass::pawn()));
            (counter, move_and_look, turret)
        };

        let action = AddInputProcessors::new(
            engine.assets(),
            vec![
                ProcessorsToAdd {
                    actor_class: turret,
                    processors: vec![counter, SoftRef::new("Processors/Missing")],
                },
                ProcessorsToAdd {
                    actor_class: SoftRef::new("Classes/Pawn"),
                    processors: vec![move_and_look],
                },
            ],
        );

        let world = engine.start_instance(World::new(WorldKind::Game));
        Fixture {
            engine,
            world,
            jump,
            hits,
            action,
        }
    }

    fn turret_spec() -> ActorSpec {
        ActorSpec::new("Turret", ActorClass::actor().subclass("Turret")).with_input_component(true)
    }

    fn press(world: &World, actor: ActorId, action: &InputAction) -> usize {
        world.process_input(actor, action, TriggerEvent::Started, InputActionValue::Digital(true))
    }

    #[test]
    fn test_processors_follow_activation() {
        let Fixture {
            mut engine,
            world,
            jump,
            hits,
            action,
        } = fixture();
        let context = ActivationContext::global();
        let turret = engine.world_mut(world).unwrap().spawn_actor(turret_spec());

        action.on_activating(&mut engine, &context);
        let w = engine.world(world).unwrap();
        assert!(w.input_component(turret).unwrap().has_input_processor("Counter"));
        assert_eq!(press(w, turret, &jump), 1);
        assert_eq!(*hits.borrow(), 1);

        action.on_deactivating(&mut engine, &context);
        let w = engine.world(world).unwrap();
        assert_eq!(w.input_component(turret).unwrap().num_input_processors(), 0);
        assert_eq!(press(w, turret, &jump), 0);
        assert!(action.tracker().is_empty(&context));
    }

    #[test]
    fn test_actor_without_component_waits_for_ready() {
        let Fixture {
            mut engine,
            world,
            action,
            ..
        } = fixture();
        let context = ActivationContext::global();
        action.on_activating(&mut engine, &context);

        let w = engine.world_mut(world).unwrap();
        let pawn = w.spawn_actor(ActorSpec::pawn("Hero"));
        assert!(w.input_component(pawn).is_none());
        assert_eq!(action.tracker().num_targets(&context), 0);

        w.add_input_component(pawn);
        assert!(w.input_component(pawn).unwrap().has_input_processor(MoveAndLook::CLASS_NAME));
        assert_eq!(action.tracker().num_targets(&context), 1);
    }

    #[test]
    fn test_detach_keeps_foreign_processors() {
        let Fixture {
            mut engine,
            world,
            action,
            ..
        } = fixture();
        let context = ActivationContext::global();
        let w = engine.world_mut(world).unwrap();
        let pawn = w.spawn_actor(ActorSpec::pawn("Hero").with_input_component(true));
        let extra = ProcessorClass::new("Extra", || Counter {
            settings: ProcessorSettings::new(),
            hits: Rc::new(RefCell::new(0)),
        });
        w.add_input_processor(pawn, Some(&extra));

        action.on_activating(&mut engine, &context);
        action.on_deactivating(&mut engine, &context);

        let component = engine.world(world).unwrap().input_component(pawn).unwrap();
        assert!(component.has_input_processor("Extra"));
        assert!(!component.has_input_processor(MoveAndLook::CLASS_NAME));
    }

    #[test]
    fn test_shared_processor_stays_until_last_context() {
        let Fixture {
            mut engine,
            world,
            action,
            ..
        } = fixture();
        let global = ActivationContext::global();
        let local = ActivationContext::for_world(world);
        let pawn = engine
            .world_mut(world)
            .unwrap()
            .spawn_actor(ActorSpec::pawn("Hero").with_input_component(true));

        action.on_activating(&mut engine, &global);
        action.on_activating(&mut engine, &local);
        let component = engine.world(world).unwrap().input_component(pawn).unwrap();
        assert_eq!(component.num_input_processors(), 1);
        assert_eq!(component.processors().num_claims(MoveAndLook::CLASS_NAME), 2);

        action.on_deactivating(&mut engine, &global);
        let component = engine.world(world).unwrap().input_component(pawn).unwrap();
        assert!(component.has_input_processor(MoveAndLook::CLASS_NAME));
        assert!(action.tracker().contains(
            &local,
            &ProcessorTarget {
                actor: ActorRef::new(engine.world(world).unwrap(), pawn),
                entry: 1,
            }
        ));

        action.on_deactivating(&mut engine, &local);
        let component = engine.world(world).unwrap().input_component(pawn).unwrap();
        assert!(!component.has_input_processor(MoveAndLook::CLASS_NAME));
    }

    #[test]
    fn test_processor_added_by_game_code_survives_deactivation() {
        let Fixture {
            mut engine,
            world,
            action,
            ..
        } = fixture();
        let context = ActivationContext::global();
        let move_and_look = engine
            .assets()
            .borrow()
            .get(&SoftRef::<ProcessorClass>::new("Processors/MoveAndLook"))
            .unwrap();
        let w = engine.world_mut(world).unwrap();
        let pawn = w.spawn_actor(ActorSpec::pawn("Hero").with_input_component(true));
        assert!(w.add_input_processor(pawn, Some(&move_and_look)));
        let before = w.input_component(pawn).unwrap().processors().get(MoveAndLook::CLASS_NAME).unwrap().id();

        action.on_activating(&mut engine, &context);
        action.on_deactivating(&mut engine, &context);

        let component = engine.world(world).unwrap().input_component(pawn).unwrap();
        let after = component.processors().get(MoveAndLook::CLASS_NAME).unwrap().id();
        assert_eq!(before, after);
        assert_eq!(component.processors().num_claims(MoveAndLook::CLASS_NAME), 0);
    }

    #[derive(Default)]
    struct Lifecycle {
        inits: Cell<u32>,
        deinits: Cell<u32>,
    }

    struct Tracked {
        settings: ProcessorSettings,
        lifecycle: Rc<Lifecycle>,
    }

    impl InputProcessor for Tracked {
        fn settings(&self) -> &ProcessorSettings {
            &self.settings
        }

        fn on_initialized(&mut self, _context: &ProcessorContext) {
            self.lifecycle.inits.set(self.lifecycle.inits.get() + 1);
        }

        fn on_deinitialize(&mut self, _context: &ProcessorContext) {
            self.lifecycle.deinits.set(self.lifecycle.deinits.get() + 1);
        }
    }

    #[test]
    fn test_each_attachment_detached_exactly_once() {
        let mut engine = Engine::new();
        let lifecycle = Rc::new(Lifecycle::default());
        let (pawn_class, tracked) = {
            let shared = engine.assets();
            let mut assets = shared.borrow_mut();
            let sink = lifecycle.clone();
            let tracked = assets.add_loaded(
                "Processors/Tracked",
                Rc::new(ProcessorClass::new("Tracked", move || Tracked {
                    settings: ProcessorSettings::new(),
                    lifecycle: sink.clone(),
                })),
            );
            (assets.add_loaded("Classes/Pawn", Rc::new(ActorClass::pawn())), tracked)
        };
        let action = AddInputProcessors::new(
            engine.assets(),
            vec![ProcessorsToAdd {
                actor_class: pawn_class,
                processors: vec![tracked],
            }],
        );
        let context = ActivationContext::global();
        let world = engine.start_instance(World::new(WorldKind::Game));

        engine
            .world_mut(world)
            .unwrap()
            .spawn_actor(ActorSpec::pawn("Early").with_input_component(true));
        action.on_activating(&mut engine, &context);

        let w = engine.world_mut(world).unwrap();
        let late = w.spawn_actor(ActorSpec::pawn("Late"));
        w.add_input_component(late);
        let doomed = w.spawn_actor(ActorSpec::pawn("Doomed").with_input_component(true));
        w.destroy_actor(doomed);
        assert_eq!(lifecycle.inits.get(), 3);
        assert_eq!(lifecycle.deinits.get(), 1);
        assert_eq!(action.tracker().num_targets(&context), 2);

        action.on_deactivating(&mut engine, &context);
        assert_eq!(lifecycle.inits.get(), 3);
        assert_eq!(lifecycle.deinits.get(), 3);
        assert!(action.tracker().is_empty(&context));

        // Already released; tearing the components down adds nothing
        engine.stop_instance(world);
        assert_eq!(lifecycle.deinits.get(), 3);
    }

    #[test]
    fn test_destroyed_actor_detached_once() {
        let Fixture {
            mut engine,
            world,
            action,
            ..
        } = fixture();
        let context = ActivationContext::global();
        action.on_activating(&mut engine, &context);

        let w = engine.world_mut(world).unwrap();
        let turret = w.spawn_actor(turret_spec());
        assert_eq!(action.tracker().num_targets(&context), 1);

        w.destroy_actor(turret);
        assert_eq!(action.tracker().num_targets(&context), 0);

        action.on_deactivating(&mut engine, &context);
        assert!(action.tracker().is_empty(&context));
    }

    #[test]
    fn test_reactivation_resets_leftovers() {
        let Fixture {
            mut engine,
            world,
            action,
            ..
        } = fixture();
        let context = ActivationContext::global();
        let turret = engine.world_mut(world).unwrap().spawn_actor(turret_spec());

        action.on_activating(&mut engine, &context);
        action.on_activating(&mut engine, &context);

        let w = engine.world(world).unwrap();
        assert_eq!(w.extension_manager().unwrap().handler_count(), 2);
        assert_eq!(w.input_component(turret).unwrap().num_input_processors(), 1);
        assert_eq!(action.tracker().num_targets(&context), 1);
    }

    #[test]
    fn test_null_actor_class_is_invalid() {
        let engine = Engine::new();
        let action = AddInputProcessors::new(
            engine.assets(),
            vec![ProcessorsToAdd {
                actor_class: SoftRef::null(),
                processors: Vec::new(),
            }],
        );

        assert_eq!(action.is_data_valid().errors, vec!["Null ActorClass at index 0."]);
    }
}
