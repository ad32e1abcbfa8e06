use anyhow::{Context, Result};
use feature_input::core::GameplayTag;
use feature_input::engine::assets::SoftRef;
use feature_input::engine::input::tags::{INPUT_LOOK_KM, INPUT_MOVE_KM};
use feature_input::engine::input::{
    ActionEvent, InputAction, InputActionValue, InputConfig, InputProcessor, MappingContext, ProcessorClass,
    ProcessorSettings, TriggerEvent,
};
use feature_input::engine::world::{ActorClass, ActorId, ActorSpec, Engine, World, WorldKind};
use feature_input::game::{
    ActivationContext, AddInputConfigs, AddInputContextMapping, AddInputProcessors, GameFeatureAction,
    InputMappingEntry, PlayableFeature, ProcessorsToAdd, TagInputListener,
};
use feature_input::PluginSettings;
use glam::Vec2;
use log::{info, warn};
use std::rc::Rc;

/// Logs tag-routed input
struct TagLogger;

impl TagInputListener for TagLogger {
    fn tag_pressed(&self, tag: &GameplayTag) {
        info!("Tag pressed: {}", tag);
    }

    fn tag_released(&self, tag: &GameplayTag) {
        info!("Tag released: {}", tag);
    }
}

/// Toggles a crouch flag on every press
struct CrouchToggle {
    settings: ProcessorSettings,
    crouched: bool,
}

impl InputProcessor for CrouchToggle {
    fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    fn on_started(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {
        self.crouched = !self.crouched;
        info!("Crouched: {}", self.crouched);
    }
}

struct Actions {
    mappings: Rc<AddInputContextMapping>,
    processors: Rc<AddInputProcessors>,
    configs: Rc<AddInputConfigs>,
}

impl Actions {
    fn all(&self) -> [&dyn GameFeatureAction; 3] {
        [&*self.mappings, &*self.processors, &*self.configs]
    }
}

/// Register the demo feature's content and build its actions
fn build_feature(engine: &Engine, crouch: &Rc<InputAction>, emote: &Rc<InputAction>) -> Actions {
    let shared = engine.assets();
    let mut assets = shared.borrow_mut();

    let feature_mapping = assets.add_loaded(
        "Feature/IMC_Feature",
        Rc::new(MappingContext::new("IMC_Feature").map("C", crouch).map("E", emote)),
    );
    let crouch_settings = ProcessorSettings::new().with_action("Input.Crouch", crouch.clone());
    let crouch_processor = assets.add_loadable("Feature/CrouchToggle", move || {
        let settings = crouch_settings.clone();
        ProcessorClass::new("CrouchToggle", move || CrouchToggle {
            settings: settings.clone(),
            crouched: false,
        })
    });
    let pawn_class = assets.add_loaded("Classes/Pawn", Rc::new(ActorClass::pawn()));
    let emote_config = assets.add_loaded(
        "Feature/IC_Emote",
        InputConfig::builder("IC_Emote").tagged("Input.Emote", emote.clone()).build(),
    );
    drop(assets);

    Actions {
        mappings: AddInputContextMapping::new(shared.clone(), vec![InputMappingEntry::new(feature_mapping, 1)]),
        processors: AddInputProcessors::new(
            shared.clone(),
            vec![ProcessorsToAdd {
                actor_class: pawn_class,
                processors: vec![crouch_processor],
            }],
        ),
        configs: AddInputConfigs::new(shared, vec![emote_config, SoftRef::new("Feature/IC_Missing")]),
    }
}

/// Look up the action mapped to `key` for `controller` and deliver it to `target`
fn press_key(world: &mut World, controller: ActorId, target: ActorId, key: &str, value: InputActionValue) -> Result<usize> {
    let action = world
        .input_subsystem_for_controller(controller)?
        .action_for_key(key)
        .with_context(|| format!("no mapping for key {key}"))?;

    let mut delivered = world.process_input(target, &action, TriggerEvent::Started, value);
    delivered += world.process_input(target, &action, TriggerEvent::Triggered, value);
    delivered += world.process_input(target, &action, TriggerEvent::Completed, value);
    Ok(delivered)
}

fn main() -> Result<()> {
    let settings = PluginSettings::default();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(settings.log_filter.as_str())).init();

    info!("Starting feature input demo...");

    let jump = InputAction::digital("IA_Jump");
    let movement = InputAction::axis2d("IA_Move");
    let look = InputAction::axis2d("IA_Look");
    let crouch = InputAction::digital("IA_Crouch");
    let emote = InputAction::digital("IA_Emote");

    let default_mapping = Rc::new(
        MappingContext::new("IMC_Default")
            .map("Space", &jump)
            .map("W", &movement)
            .map("Mouse", &look),
    );
    let default_config = InputConfig::builder("IC_Default")
        .tagged("Input.Jump", jump.clone())
        .native(INPUT_MOVE_KM, movement.clone())
        .native(INPUT_LOOK_KM, look.clone())
        .default_mapping(default_mapping)
        .build();
    for problem in default_config.validate() {
        warn!("{}", problem);
    }

    let mut engine = Engine::new();
    let actions = build_feature(&engine, &crouch, &emote);
    for action in actions.all() {
        let validation = action.is_data_valid();
        info!("Feature action validation: {:?}", validation.result);
    }

    let world_id = engine.start_instance(World::new(WorldKind::Game));
    let world = engine.world_mut(world_id).context("world stopped unexpectedly")?;
    let player = world.add_local_player(true);
    let pc = world.spawn_actor(ActorSpec::player_controller("PlayerController", player));

    let context = ActivationContext::global();
    for action in actions.all() {
        action.on_registering(&mut engine);
        action.on_activating(&mut engine, &context);
    }

    let world = engine.world_mut(world_id).context("world stopped unexpectedly")?;
    let pawn = world.spawn_actor(ActorSpec::pawn("Hero").with_input_component(true));
    PlayableFeature::attach(
        world,
        pawn,
        PlayableFeature::with_settings(&settings)
            .with_default_config(default_config)
            .with_tag_listener(Rc::new(TagLogger)),
    );
    world.possess(pc, pawn);

    let state = world.playable(pawn).map(PlayableFeature::state).context("pawn lost its playable feature")?;
    info!("Playable feature state: {}", state);

    press_key(world, pc, pc, "Space", InputActionValue::Digital(true))?;
    press_key(world, pc, pc, "W", InputActionValue::Axis2D(Vec2::new(0.0, 1.0)))?;
    press_key(world, pc, pc, "Mouse", InputActionValue::Axis2D(Vec2::new(15.0, -5.0)))?;
    press_key(world, pc, pawn, "C", InputActionValue::Digital(true))?;
    press_key(world, pc, pc, "E", InputActionValue::Digital(true))?;

    let motor = world
        .actor(pawn)
        .and_then(|actor| actor.motor())
        .context("pawn has no motor")?;
    let movement = motor.borrow_mut().consume_movement();
    info!(
        "Pawn movement {:?}, yaw {:.1}, pitch {:.1}",
        movement,
        motor.borrow().yaw(),
        motor.borrow().pitch()
    );

    for action in actions.all() {
        action.on_deactivating(&mut engine, &context);
        action.on_unregistering(&mut engine);
    }

    let world = engine.world_mut(world_id).context("world stopped unexpectedly")?;
    let processors = world.input_component(pawn).map_or(0, |c| c.num_input_processors());
    let delivered = press_key(world, pc, pc, "E", InputActionValue::Digital(true)).unwrap_or(0);
    info!("After deactivation: {} processors on pawn, emote reached {} bindings", processors, delivered);

    engine.stop_instance(world_id);
    info!("Demo finished");
    Ok(())
}
