// Input processors: pluggable handlers bound to tagged input actions
//
// A processor declares which actions it wants (keyed by tag) and in which phases.
// Initializing it subscribes once per (action, enabled phase) on an input
// component; deinitializing drops everything it subscribed.

use super::action::{ActionEvent, InputAction, TriggerEvent};
use super::component::{ActionCallback, InputComponent};
use crate::core::{GameplayTag, ObjectId};
use crate::engine::world::{ActorId, PawnMotor};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Which actions a processor binds and in which phases
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    /// Tag to action; unset actions are skipped at initialization
    actions: Vec<(GameplayTag, Option<Rc<InputAction>>)>,

    pub bind_started: bool,
    pub bind_ongoing: bool,
    pub bind_triggered: bool,
    pub bind_canceled: bool,
    pub bind_completed: bool,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            bind_started: true,
            bind_ongoing: false,
            bind_triggered: false,
            bind_canceled: false,
            bind_completed: true,
        }
    }
}

impl ProcessorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable exactly the given phases
    pub fn with_phases(mut self, phases: &[TriggerEvent]) -> Self {
        self.bind_started = phases.contains(&TriggerEvent::Started);
        self.bind_ongoing = phases.contains(&TriggerEvent::Ongoing);
        self.bind_triggered = phases.contains(&TriggerEvent::Triggered);
        self.bind_canceled = phases.contains(&TriggerEvent::Canceled);
        self.bind_completed = phases.contains(&TriggerEvent::Completed);
        self
    }

    /// Set the action for a tag, replacing any previous one
    pub fn with_action(mut self, tag: impl Into<GameplayTag>, action: impl Into<Option<Rc<InputAction>>>) -> Self {
        self.set_action(tag.into(), action.into());
        self
    }

    pub fn set_action(&mut self, tag: GameplayTag, action: Option<Rc<InputAction>>) {
        match self.actions.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = action,
            None => self.actions.push((tag, action)),
        }
    }

    pub fn action(&self, tag: &GameplayTag) -> Option<&Rc<InputAction>> {
        self.actions
            .iter()
            .find(|(t, _)| t == tag)
            .and_then(|(_, action)| action.as_ref())
    }

    pub fn actions(&self) -> &[(GameplayTag, Option<Rc<InputAction>>)] {
        &self.actions
    }

    pub fn is_phase_enabled(&self, phase: TriggerEvent) -> bool {
        match phase {
            TriggerEvent::Started => self.bind_started,
            TriggerEvent::Ongoing => self.bind_ongoing,
            TriggerEvent::Triggered => self.bind_triggered,
            TriggerEvent::Canceled => self.bind_canceled,
            TriggerEvent::Completed => self.bind_completed,
        }
    }

    /// Enabled phases in lifecycle order
    pub fn enabled_phases(&self) -> Vec<TriggerEvent> {
        TriggerEvent::ALL
            .into_iter()
            .filter(|phase| self.is_phase_enabled(*phase))
            .collect()
    }

    /// Pairs that will actually be bound: valid tag with an action set
    fn bindable(&self) -> Vec<(GameplayTag, Rc<InputAction>)> {
        self.actions
            .iter()
            .filter(|(tag, _)| tag.is_valid())
            .filter_map(|(tag, action)| action.clone().map(|a| (tag.clone(), a)))
            .collect()
    }
}

/// What a processor learns about where it was installed
#[derive(Debug, Clone)]
pub struct ProcessorContext {
    /// Actor owning the input component
    pub owner: ActorId,

    /// Pawn the processor should drive: the owner itself, or a controller's pawn
    pub pawn: Option<ActorId>,

    /// Movement state of that pawn
    pub motor: Option<Weak<RefCell<PawnMotor>>>,
}

/// Pluggable input handler
///
/// Only `settings` is required; every hook defaults to doing nothing.
pub trait InputProcessor {
    fn settings(&self) -> &ProcessorSettings;

    /// Called after all subscriptions are made
    fn on_initialized(&mut self, _context: &ProcessorContext) {}

    /// Called before subscriptions are dropped
    fn on_deinitialize(&mut self, _context: &ProcessorContext) {}

    fn on_started(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {}
    fn on_ongoing(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {}
    fn on_triggered(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {}
    fn on_canceled(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {}
    fn on_complete(&mut self, _tag: &GameplayTag, _event: &ActionEvent) {}
}

type ProcessorFactory = Rc<dyn Fn() -> Rc<RefCell<dyn InputProcessor>>>;

/// Named processor type; two classes are the same type when names match
#[derive(Clone)]
pub struct ProcessorClass {
    name: String,
    factory: ProcessorFactory,
}

impl ProcessorClass {
    pub fn new<P, F>(name: impl Into<String>, factory: F) -> Self
    where
        P: InputProcessor + 'static,
        F: Fn() -> P + 'static,
    {
        Self {
            name: name.into(),
            factory: Rc::new(move || {
                let processor: Rc<RefCell<dyn InputProcessor>> = Rc::new(RefCell::new(factory()));
                processor
            }),
        }
    }

    /// Class built from the processor's `Default`
    pub fn of<P: InputProcessor + Default + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, P::default)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a fresh, uninitialized instance
    pub fn instantiate(&self) -> ProcessorInstance {
        ProcessorInstance {
            id: ObjectId::next(),
            processor: (self.factory)(),
        }
    }
}

impl fmt::Debug for ProcessorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorClass").field("name", &self.name).finish()
    }
}

impl PartialEq for ProcessorClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A live processor and the identity its subscriptions are recorded under
#[derive(Clone)]
pub struct ProcessorInstance {
    id: ObjectId,
    processor: Rc<RefCell<dyn InputProcessor>>,
}

impl ProcessorInstance {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn processor(&self) -> &Rc<RefCell<dyn InputProcessor>> {
        &self.processor
    }
}

struct RegistryEntry {
    name: String,
    instance: ProcessorInstance,
    /// Activations sharing this processor
    claims: Vec<ObjectId>,
    /// Added directly by game code; survives every release
    pinned: bool,
}

/// Live processors of one input component, at most one per class
#[derive(Default)]
pub struct ProcessorRegistry {
    entries: Vec<RegistryEntry>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, class_name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == class_name)
    }

    fn entry_mut(&mut self, class_name: &str) -> Option<&mut RegistryEntry> {
        self.entries.iter_mut().find(|e| e.name == class_name)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.entry(class_name).is_some()
    }

    pub fn get(&self, class_name: &str) -> Option<&ProcessorInstance> {
        self.entry(class_name).map(|e| &e.instance)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn num_claims(&self, class_name: &str) -> usize {
        self.entry(class_name).map_or(0, |e| e.claims.len())
    }

    pub fn is_pinned(&self, class_name: &str) -> bool {
        self.entry(class_name).is_some_and(|e| e.pinned)
    }

    /// Store a new instance, claimed by `claimant` or pinned when there is none
    pub(crate) fn insert(&mut self, class_name: &str, instance: ProcessorInstance, claimant: Option<ObjectId>) {
        debug_assert!(!self.contains(class_name));
        self.entries.push(RegistryEntry {
            name: class_name.to_string(),
            instance,
            claims: claimant.into_iter().collect(),
            pinned: claimant.is_none(),
        });
    }

    /// Record another claim on a live processor
    pub(crate) fn add_claim(&mut self, class_name: &str, claimant: ObjectId) -> bool {
        match self.entry_mut(class_name) {
            Some(entry) if !entry.claims.contains(&claimant) => {
                entry.claims.push(claimant);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn pin(&mut self, class_name: &str) -> bool {
        match self.entry_mut(class_name) {
            Some(entry) => {
                entry.pinned = true;
                true
            }
            None => false,
        }
    }

    /// Drop one claim; returns the instance once nothing holds it any more
    pub(crate) fn release(&mut self, class_name: &str, claimant: ObjectId) -> Option<ProcessorInstance> {
        let entry = self.entry_mut(class_name)?;
        let index = entry.claims.iter().position(|c| *c == claimant)?;
        entry.claims.remove(index);
        if !entry.claims.is_empty() || entry.pinned {
            return None;
        }
        self.remove(class_name)
    }

    pub(crate) fn remove(&mut self, class_name: &str) -> Option<ProcessorInstance> {
        let index = self.entries.iter().position(|e| e.name == class_name)?;
        Some(self.entries.remove(index).instance)
    }

    pub(crate) fn take_all(&mut self) -> Vec<ProcessorInstance> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|e| e.instance)
            .collect()
    }
}

/// Subscribe a processor's actions on `component`, then run `on_initialized`
pub fn initialize(instance: &ProcessorInstance, component: &mut InputComponent, context: &ProcessorContext) {
    assert_eq!(
        context.owner,
        component.owner(),
        "processor context does not belong to this input component"
    );

    let (bindable, phases) = {
        let processor = instance.processor.borrow();
        let settings = processor.settings();
        (settings.bindable(), settings.enabled_phases())
    };

    for (tag, action) in bindable {
        for &phase in &phases {
            let callback = route(Rc::downgrade(&instance.processor), tag.clone(), phase);
            component.bind_action(&action, phase, instance.id, callback);
        }
    }

    instance.processor.borrow_mut().on_initialized(context);
}

/// Run `on_deinitialize`, then drop every subscription the processor made
pub fn deinitialize(instance: &ProcessorInstance, component: &mut InputComponent, context: &ProcessorContext) {
    instance.processor.borrow_mut().on_deinitialize(context);
    component.clear_bindings_for_owner(instance.id);
}

fn route(processor: Weak<RefCell<dyn InputProcessor>>, tag: GameplayTag, phase: TriggerEvent) -> ActionCallback {
    Rc::new(move |event: &ActionEvent| {
        let Some(processor) = processor.upgrade() else {
            return;
        };
        let mut processor = processor.borrow_mut();
        match phase {
            TriggerEvent::Started => processor.on_started(&tag, event),
            TriggerEvent::Ongoing => processor.on_ongoing(&tag, event),
            TriggerEvent::Triggered => processor.on_triggered(&tag, event),
            TriggerEvent::Canceled => processor.on_canceled(&tag, event),
            TriggerEvent::Completed => processor.on_complete(&tag, event),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::InputActionValue;

    /// Records every hook call as a string
    struct Recorder {
        settings: ProcessorSettings,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl InputProcessor for Recorder {
        fn settings(&self) -> &ProcessorSettings {
            &self.settings
        }

        fn on_initialized(&mut self, _context: &ProcessorContext) {
            self.log.borrow_mut().push("init".into());
        }

        fn on_deinitialize(&mut self, _context: &ProcessorContext) {
            self.log.borrow_mut().push("deinit".into());
        }

        fn on_started(&mut self, tag: &GameplayTag, _event: &ActionEvent) {
            self.log.borrow_mut().push(format!("started {tag}"));
        }

        fn on_complete(&mut self, tag: &GameplayTag, _event: &ActionEvent) {
            self.log.borrow_mut().push(format!("complete {tag}"));
        }
    }

    fn recorder_class(settings: ProcessorSettings, log: &Rc<RefCell<Vec<String>>>) -> ProcessorClass {
        let log = log.clone();
        ProcessorClass::new("Recorder", move || Recorder {
            settings: settings.clone(),
            log: log.clone(),
        })
    }

    fn context() -> ProcessorContext {
        ProcessorContext {
            owner: ActorId(1),
            pawn: None,
            motor: None,
        }
    }

    fn event(phase: TriggerEvent) -> ActionEvent {
        ActionEvent::new(phase, InputActionValue::Digital(true), 0.016)
    }

    #[test]
    fn test_default_phases() {
        let settings = ProcessorSettings::new();
        assert_eq!(
            settings.enabled_phases(),
            vec![TriggerEvent::Started, TriggerEvent::Completed]
        );
    }

    #[test]
    fn test_initialize_subscribes_per_phase() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let jump = InputAction::digital("IA_Jump");
        let settings = ProcessorSettings::new()
            .with_action("Input.Jump", jump.clone())
            .with_action("Input.Crouch", None::<Rc<InputAction>>)
            .with_action(GameplayTag::none(), InputAction::digital("IA_Unused"));
        let mut component = InputComponent::new(ActorId(1));

        component.add_input_processor(Some(&recorder_class(settings, &log)), &context());
        assert_eq!(component.num_bindings(), 2);

        component.process_action(&jump, &event(TriggerEvent::Started));
        component.process_action(&jump, &event(TriggerEvent::Triggered));
        component.process_action(&jump, &event(TriggerEvent::Completed));
        assert_eq!(
            *log.borrow(),
            vec!["init", "started Input.Jump", "complete Input.Jump"]
        );
    }

    #[test]
    fn test_add_is_idempotent_per_class() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let settings = ProcessorSettings::new().with_action("Input.Jump", InputAction::digital("IA_Jump"));
        let class = recorder_class(settings, &log);
        let mut component = InputComponent::new(ActorId(1));

        assert!(component.add_input_processor(Some(&class), &context()));
        assert!(!component.add_input_processor(Some(&class), &context()));
        assert!(!component.add_input_processor(None, &context()));
        assert_eq!(component.num_input_processors(), 1);
        assert_eq!(component.num_bindings(), 2);
    }

    #[test]
    fn test_remove_all_twice() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let settings = ProcessorSettings::new().with_action("Input.Jump", InputAction::digital("IA_Jump"));
        let mut component = InputComponent::new(ActorId(1));
        component.add_input_processor(Some(&recorder_class(settings, &log)), &context());

        component.remove_all_input_processors(&context());
        assert_eq!(component.num_input_processors(), 0);
        assert_eq!(component.num_bindings(), 0);

        component.remove_all_input_processors(&context());
        assert_eq!(log.borrow().iter().filter(|e| *e == "deinit").count(), 1);
    }

    #[test]
    fn test_remove_single_class() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut component = InputComponent::new(ActorId(1));
        component.add_input_processor(Some(&recorder_class(ProcessorSettings::new(), &log)), &context());

        assert!(component.remove_input_processor("Recorder", &context()));
        assert!(!component.remove_input_processor("Recorder", &context()));
        assert!(!component.has_input_processor("Recorder"));
    }

    #[test]
    fn test_shared_processor_outlives_first_release() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = recorder_class(ProcessorSettings::new(), &log);
        let (first, second) = (ObjectId::next(), ObjectId::next());
        let mut component = InputComponent::new(ActorId(1));

        assert!(component.claim_input_processor(&class, first, &context()));
        assert!(!component.claim_input_processor(&class, second, &context()));
        assert_eq!(component.processors().num_claims("Recorder"), 2);

        assert!(!component.release_input_processor("Recorder", first, &context()));
        assert!(!component.release_input_processor("Recorder", first, &context()));
        assert!(component.has_input_processor("Recorder"));

        assert!(component.release_input_processor("Recorder", second, &context()));
        assert!(!component.has_input_processor("Recorder"));
        assert_eq!(*log.borrow(), vec!["init", "deinit"]);
    }

    #[test]
    fn test_pinned_processor_survives_release() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let class = recorder_class(ProcessorSettings::new(), &log);
        let claimant = ObjectId::next();
        let mut component = InputComponent::new(ActorId(1));

        assert!(component.add_input_processor(Some(&class), &context()));
        assert!(!component.claim_input_processor(&class, claimant, &context()));
        assert!(!component.release_input_processor("Recorder", claimant, &context()));
        assert!(component.has_input_processor("Recorder"));
        assert!(component.processors().is_pinned("Recorder"));

        // Claimed first, added by game code later
        let mut component = InputComponent::new(ActorId(1));
        component.claim_input_processor(&class, claimant, &context());
        assert!(!component.add_input_processor(Some(&class), &context()));
        assert!(!component.release_input_processor("Recorder", claimant, &context()));
        assert_eq!(component.num_input_processors(), 1);
    }

    #[test]
    #[should_panic(expected = "processor context")]
    fn test_foreign_context_panics() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut component = InputComponent::new(ActorId(1));
        let foreign = ProcessorContext {
            owner: ActorId(2),
            ..context()
        };
        component.add_input_processor(Some(&recorder_class(ProcessorSettings::new(), &log)), &foreign);
    }
}
