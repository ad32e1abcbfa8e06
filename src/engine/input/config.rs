// Input configs: immutable tag-to-action tables and binding sessions over them

use super::action::{ActionEvent, InputAction, TriggerEvent};
use super::component::{ActionCallback, BindingHandle, InputComponent};
use super::mapping::MappingContext;
use crate::core::{GameplayTag, ObjectId};
use std::rc::Rc;

/// Callback for a tag-routed action; receives the tag it was bound under
pub type TagCallback = Rc<dyn Fn(&GameplayTag)>;

type ActionTable = Vec<(GameplayTag, Option<Rc<InputAction>>)>;

/// Immutable input configuration, shared as `Rc<InputConfig>`
///
/// Native actions are bound by hand to specific handlers; tag-routed actions
/// are bound in bulk to generic pressed/released handlers that receive the tag.
#[derive(Debug)]
pub struct InputConfig {
    name: String,
    native_actions: ActionTable,
    tag_actions: ActionTable,

    /// Mapping context applied to the local player when this is a pawn's default config
    default_mapping: Option<Rc<MappingContext>>,
}

impl InputConfig {
    pub fn builder(name: impl Into<String>) -> InputConfigBuilder {
        InputConfigBuilder {
            config: InputConfig {
                name: name.into(),
                native_actions: Vec::new(),
                tag_actions: Vec::new(),
                default_mapping: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_mapping(&self) -> Option<&Rc<MappingContext>> {
        self.default_mapping.as_ref()
    }

    pub fn find_native_action(&self, tag: &GameplayTag) -> Option<&Rc<InputAction>> {
        find(&self.native_actions, tag)
    }

    pub fn find_tag_action(&self, tag: &GameplayTag) -> Option<&Rc<InputAction>> {
        find(&self.tag_actions, tag)
    }

    pub fn native_actions(&self) -> &[(GameplayTag, Option<Rc<InputAction>>)] {
        &self.native_actions
    }

    pub fn tag_actions(&self) -> &[(GameplayTag, Option<Rc<InputAction>>)] {
        &self.tag_actions
    }

    /// Bind the native action under `tag`, if the config has one
    pub fn bind_native_action(
        &self,
        component: &mut InputComponent,
        tag: &GameplayTag,
        phase: TriggerEvent,
        owner: ObjectId,
        callback: ActionCallback,
    ) -> Option<BindingHandle> {
        let action = self.find_native_action(tag)?;
        Some(component.bind_action(action, phase, owner, callback))
    }

    /// Bind every tag-routed action: Started goes to `pressed`, Completed to `released`
    ///
    /// Handles are appended to `handles`. A missing callback binds nothing for
    /// its phase.
    pub fn bind_tag_actions(
        &self,
        component: &mut InputComponent,
        owner: ObjectId,
        pressed: Option<&TagCallback>,
        released: Option<&TagCallback>,
        handles: &mut Vec<BindingHandle>,
    ) {
        for (tag, action) in &self.tag_actions {
            let Some(action) = action else {
                continue;
            };
            if !tag.is_valid() {
                continue;
            }

            if let Some(pressed) = pressed {
                let handle = component.bind_action(action, TriggerEvent::Started, owner, with_tag(pressed, tag));
                handles.push(handle);
            }
            if let Some(released) = released {
                let handle = component.bind_action(action, TriggerEvent::Completed, owner, with_tag(released, tag));
                handles.push(handle);
            }
        }
    }

    /// Remove each handle from `component` and empty the list
    pub fn remove_binds(component: &mut InputComponent, handles: &mut Vec<BindingHandle>) {
        for handle in handles.drain(..) {
            component.remove_binding_by_handle(handle);
        }
    }

    /// Content problems: unset actions and invalid tags
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (kind, table) in [("native", &self.native_actions), ("tag", &self.tag_actions)] {
            for (index, (tag, action)) in table.iter().enumerate() {
                if !tag.is_valid() {
                    errors.push(format!("Invalid tag for {kind} action at index {index}."));
                }
                if action.is_none() {
                    errors.push(format!("Null {kind} InputAction for tag '{tag}'."));
                }
            }
        }
        errors
    }
}

fn find<'a>(table: &'a ActionTable, tag: &GameplayTag) -> Option<&'a Rc<InputAction>> {
    table
        .iter()
        .find(|(t, _)| t == tag)
        .and_then(|(_, action)| action.as_ref())
}

fn with_tag(callback: &TagCallback, tag: &GameplayTag) -> ActionCallback {
    let callback = callback.clone();
    let tag = tag.clone();
    Rc::new(move |_event: &ActionEvent| callback(&tag))
}

fn set(table: &mut ActionTable, tag: GameplayTag, action: Option<Rc<InputAction>>) {
    match table.iter_mut().find(|(t, _)| *t == tag) {
        Some(slot) => slot.1 = action,
        None => table.push((tag, action)),
    }
}

/// Builder for [`InputConfig`]
pub struct InputConfigBuilder {
    config: InputConfig,
}

impl InputConfigBuilder {
    pub fn native(mut self, tag: impl Into<GameplayTag>, action: impl Into<Option<Rc<InputAction>>>) -> Self {
        set(&mut self.config.native_actions, tag.into(), action.into());
        self
    }

    pub fn tagged(mut self, tag: impl Into<GameplayTag>, action: impl Into<Option<Rc<InputAction>>>) -> Self {
        set(&mut self.config.tag_actions, tag.into(), action.into());
        self
    }

    pub fn default_mapping(mut self, context: Rc<MappingContext>) -> Self {
        self.config.default_mapping = Some(context);
        self
    }

    pub fn build(self) -> Rc<InputConfig> {
        Rc::new(self.config)
    }
}

/// Handles produced by binding a config, removed together
#[derive(Debug, Default)]
pub struct BindingSession {
    handles: Vec<BindingHandle>,
}

impl BindingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_tags(
        &mut self,
        config: &InputConfig,
        component: &mut InputComponent,
        owner: ObjectId,
        pressed: Option<&TagCallback>,
        released: Option<&TagCallback>,
    ) {
        config.bind_tag_actions(component, owner, pressed, released, &mut self.handles);
    }

    pub fn bind_native(
        &mut self,
        config: &InputConfig,
        component: &mut InputComponent,
        tag: &GameplayTag,
        phase: TriggerEvent,
        owner: ObjectId,
        callback: ActionCallback,
    ) -> bool {
        match config.bind_native_action(component, tag, phase, owner, callback) {
            Some(handle) => {
                self.handles.push(handle);
                true
            }
            None => false,
        }
    }

    /// Remove every recorded handle
    pub fn flush(&mut self, component: &mut InputComponent) {
        InputConfig::remove_binds(component, &mut self.handles);
    }

    /// Forget the handles without touching a component (it is already gone)
    pub fn forget(&mut self) {
        self.handles.clear();
    }

    pub fn handles(&self) -> &[BindingHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::InputActionValue;
    use crate::engine::world::ActorId;
    use std::cell::RefCell;

    fn event(phase: TriggerEvent) -> ActionEvent {
        ActionEvent::new(phase, InputActionValue::Digital(true), 0.016)
    }

    fn recording(log: &Rc<RefCell<Vec<String>>>, prefix: &'static str) -> TagCallback {
        let log = log.clone();
        Rc::new(move |tag: &GameplayTag| log.borrow_mut().push(format!("{prefix} {tag}")))
    }

    #[test]
    fn test_bind_native_absent_tag() {
        let config = InputConfig::builder("IC_Test")
            .native("Input.Move.KM", InputAction::axis2d("IA_Move"))
            .build();
        let mut component = InputComponent::new(ActorId(1));
        let noop: ActionCallback = Rc::new(|_event: &ActionEvent| {});

        let missing = GameplayTag::new("Input.Look.KM");
        assert!(config
            .bind_native_action(&mut component, &missing, TriggerEvent::Triggered, ObjectId::next(), noop.clone())
            .is_none());
        assert_eq!(component.num_bindings(), 0);

        let present = GameplayTag::new("Input.Move.KM");
        assert!(config
            .bind_native_action(&mut component, &present, TriggerEvent::Triggered, ObjectId::next(), noop)
            .is_some());
        assert_eq!(component.num_bindings(), 1);
    }

    #[test]
    fn test_tag_actions_press_and_release() {
        let jump = InputAction::digital("IA_Jump");
        let config = InputConfig::builder("IC_Test").tagged("Input.Jump", jump.clone()).build();
        let mut component = InputComponent::new(ActorId(1));
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut handles = Vec::new();

        config.bind_tag_actions(
            &mut component,
            ObjectId::next(),
            Some(&recording(&log, "pressed")),
            Some(&recording(&log, "released")),
            &mut handles,
        );
        assert_eq!(handles.len(), 2);

        component.process_action(&jump, &event(TriggerEvent::Started));
        component.process_action(&jump, &event(TriggerEvent::Completed));
        assert_eq!(*log.borrow(), vec!["pressed Input.Jump", "released Input.Jump"]);

        InputConfig::remove_binds(&mut component, &mut handles);
        assert!(handles.is_empty());
        assert_eq!(component.num_bindings(), 0);
    }

    #[test]
    fn test_missing_callback_binds_nothing() {
        let config = InputConfig::builder("IC_Test")
            .tagged("Input.Jump", InputAction::digital("IA_Jump"))
            .tagged("Input.Crouch", None::<Rc<InputAction>>)
            .build();
        let mut component = InputComponent::new(ActorId(1));
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut handles = Vec::new();

        config.bind_tag_actions(&mut component, ObjectId::next(), Some(&recording(&log, "p")), None, &mut handles);
        assert_eq!(handles.len(), 1);
    }

    #[test]
    fn test_session_flush() {
        let config = InputConfig::builder("IC_Test")
            .tagged("Input.Jump", InputAction::digital("IA_Jump"))
            .native("Input.Move.KM", InputAction::axis2d("IA_Move"))
            .build();
        let mut component = InputComponent::new(ActorId(1));
        let log = Rc::new(RefCell::new(Vec::new()));
        let owner = ObjectId::next();
        let mut session = BindingSession::new();

        session.bind_tags(&config, &mut component, owner, Some(&recording(&log, "p")), Some(&recording(&log, "r")));
        session.bind_native(
            &config,
            &mut component,
            &GameplayTag::new("Input.Move.KM"),
            TriggerEvent::Triggered,
            owner,
            Rc::new(|_event: &ActionEvent| {}),
        );
        assert_eq!(session.len(), 3);

        session.flush(&mut component);
        assert!(session.is_empty());
        assert_eq!(component.num_bindings(), 0);

        session.flush(&mut component);
        assert_eq!(component.num_bindings(), 0);
    }

    #[test]
    fn test_validate_reports_null_actions() {
        let config = InputConfig::builder("IC_Test")
            .native("Input.Move.KM", None::<Rc<InputAction>>)
            .tagged("Input.Jump", InputAction::digital("IA_Jump"))
            .build();

        assert_eq!(config.validate(), vec!["Null native InputAction for tag 'Input.Move.KM'."]);
    }
}
