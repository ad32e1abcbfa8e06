// Input component: action subscriptions and the processors installed on an actor

use super::action::{ActionEvent, InputAction, TriggerEvent};
use super::processor::{self, ProcessorClass, ProcessorContext, ProcessorRegistry};
use crate::core::ObjectId;
use crate::engine::world::ActorId;
use log::{debug, trace};
use std::rc::Rc;

/// Callback run when a bound action fires in the bound phase
pub type ActionCallback = Rc<dyn Fn(&ActionEvent)>;

/// Opaque handle to one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingHandle(u32);

struct ActionBinding {
    handle: BindingHandle,
    owner: ObjectId,
    action: Rc<InputAction>,
    phase: TriggerEvent,
    callback: ActionCallback,
}

/// Per-actor subscription registry
///
/// Every subscription records the object that made it so everything an object
/// bound can be dropped at once.
pub struct InputComponent {
    owner: ActorId,
    bindings: Vec<ActionBinding>,
    next_handle: u32,
    processors: ProcessorRegistry,
}

impl InputComponent {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            bindings: Vec::new(),
            next_handle: 1,
            processors: ProcessorRegistry::new(),
        }
    }

    /// Actor this component belongs to
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    // --- Subscriptions ---

    /// Subscribe `callback` to `action` in `phase` on behalf of `owner`
    pub fn bind_action(
        &mut self,
        action: &Rc<InputAction>,
        phase: TriggerEvent,
        owner: ObjectId,
        callback: ActionCallback,
    ) -> BindingHandle {
        let handle = BindingHandle(self.next_handle);
        self.next_handle += 1;

        trace!("Bind {} {} -> {:?}", action.name(), phase, handle);
        self.bindings.push(ActionBinding {
            handle,
            owner,
            action: action.clone(),
            phase,
            callback,
        });
        handle
    }

    /// Remove one subscription; unknown handles are ignored
    pub fn remove_binding_by_handle(&mut self, handle: BindingHandle) -> bool {
        match self.bindings.iter().position(|b| b.handle == handle) {
            Some(index) => {
                self.bindings.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every subscription made by `owner`
    pub fn clear_bindings_for_owner(&mut self, owner: ObjectId) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.owner != owner);
        before - self.bindings.len()
    }

    pub fn has_binding(&self, handle: BindingHandle) -> bool {
        self.bindings.iter().any(|b| b.handle == handle)
    }

    pub fn num_bindings(&self) -> usize {
        self.bindings.len()
    }

    pub fn num_bindings_for_owner(&self, owner: ObjectId) -> usize {
        self.bindings.iter().filter(|b| b.owner == owner).count()
    }

    /// Deliver an event to every subscription of `action` in the event's phase
    pub fn process_action(&self, action: &InputAction, event: &ActionEvent) -> usize {
        // Snapshot first: callbacks may outlive their subscription mid-dispatch
        let callbacks: Vec<ActionCallback> = self
            .bindings
            .iter()
            .filter(|b| *b.action == *action && b.phase == event.phase)
            .map(|b| b.callback.clone())
            .collect();

        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    // --- Processors ---

    /// Instantiate and initialize a processor; `None` or a known class is a no-op
    pub fn add_input_processor(
        &mut self,
        class: Option<&ProcessorClass>,
        context: &ProcessorContext,
    ) -> bool {
        let Some(class) = class else {
            return false;
        };
        if self.processors.pin(class.name()) {
            return false;
        }
        self.install(class, None, context);
        true
    }

    /// Share a processor with `claimant`, instantiating it if absent
    ///
    /// Returns whether a new instance was created.
    pub fn claim_input_processor(
        &mut self,
        class: &ProcessorClass,
        claimant: ObjectId,
        context: &ProcessorContext,
    ) -> bool {
        if self.processors.contains(class.name()) {
            self.processors.add_claim(class.name(), claimant);
            return false;
        }
        self.install(class, Some(claimant), context);
        true
    }

    /// Give up `claimant`'s share; the last share out deinitializes the processor
    pub fn release_input_processor(&mut self, class_name: &str, claimant: ObjectId, context: &ProcessorContext) -> bool {
        match self.processors.release(class_name, claimant) {
            Some(instance) => {
                processor::deinitialize(&instance, self, context);
                debug!("Released processor {} from {}", class_name, self.owner);
                true
            }
            None => false,
        }
    }

    fn install(&mut self, class: &ProcessorClass, claimant: Option<ObjectId>, context: &ProcessorContext) {
        let instance = class.instantiate();
        processor::initialize(&instance, self, context);
        debug!("Added processor {} to {}", class.name(), self.owner);
        self.processors.insert(class.name(), instance, claimant);
    }

    /// Deinitialize and drop the processor of one class, whoever holds it
    pub fn remove_input_processor(&mut self, class_name: &str, context: &ProcessorContext) -> bool {
        match self.processors.remove(class_name) {
            Some(instance) => {
                processor::deinitialize(&instance, self, context);
                debug!("Removed processor {} from {}", class_name, self.owner);
                true
            }
            None => false,
        }
    }

    /// Deinitialize and drop every processor
    pub fn remove_all_input_processors(&mut self, context: &ProcessorContext) {
        for instance in self.processors.take_all() {
            processor::deinitialize(&instance, self, context);
        }
    }

    pub fn has_input_processor(&self, class_name: &str) -> bool {
        self.processors.contains(class_name)
    }

    pub fn num_input_processors(&self) -> usize {
        self.processors.len()
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.processors
    }
}
