// Mapping contexts and the per-player subsystem that applies them

use super::action::InputAction;
use log::trace;
use std::rc::Rc;

/// One physical key routed to an action
#[derive(Debug, Clone)]
pub struct KeyMapping {
    pub key: String,
    pub action: Rc<InputAction>,
}

/// A set of key-to-action mappings applied to a local player as a unit
#[derive(Debug, Clone)]
pub struct MappingContext {
    name: String,
    mappings: Vec<KeyMapping>,
}

impl MappingContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
        }
    }

    /// Add a key mapping (builder style)
    pub fn map(mut self, key: impl Into<String>, action: &Rc<InputAction>) -> Self {
        self.mappings.push(KeyMapping {
            key: key.into(),
            action: action.clone(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mappings(&self) -> &[KeyMapping] {
        &self.mappings
    }

    /// Action this context routes `key` to
    pub fn action_for_key(&self, key: &str) -> Option<&Rc<InputAction>> {
        self.mappings
            .iter()
            .find(|mapping| mapping.key == key)
            .map(|mapping| &mapping.action)
    }
}

impl PartialEq for MappingContext {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Contexts a player has made available for key rebinding
#[derive(Debug, Default)]
pub struct UserSettings {
    registered: Vec<Rc<MappingContext>>,
}

impl UserSettings {
    /// Register a context for rebinding; false if already registered
    pub fn register_input_mapping_context(&mut self, context: &Rc<MappingContext>) -> bool {
        if self.is_registered(context) {
            return false;
        }
        self.registered.push(context.clone());
        true
    }

    pub fn unregister_input_mapping_context(&mut self, context: &MappingContext) -> bool {
        let before = self.registered.len();
        self.registered.retain(|c| **c != *context);
        before != self.registered.len()
    }

    pub fn is_registered(&self, context: &MappingContext) -> bool {
        self.registered.iter().any(|c| **c == *context)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }
}

/// Active mapping contexts of one local player, highest priority first
#[derive(Debug, Default)]
pub struct InputSubsystem {
    contexts: Vec<(Rc<MappingContext>, i32)>,
    user_settings: UserSettings,
}

impl InputSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a context; re-adding an applied context only updates its priority
    pub fn add_mapping_context(&mut self, context: &Rc<MappingContext>, priority: i32) {
        match self.contexts.iter_mut().find(|(c, _)| **c == **context) {
            Some(entry) => entry.1 = priority,
            None => self.contexts.push((context.clone(), priority)),
        }
        // Stable sort keeps insertion order among equal priorities
        self.contexts.sort_by(|a, b| b.1.cmp(&a.1));
        trace!("Mapping context {} applied at priority {}", context.name(), priority);
    }

    pub fn remove_mapping_context(&mut self, context: &MappingContext) -> bool {
        let before = self.contexts.len();
        self.contexts.retain(|(c, _)| **c != *context);
        before != self.contexts.len()
    }

    pub fn clear_all_mappings(&mut self) {
        self.contexts.clear();
    }

    pub fn has_mapping_context(&self, context: &MappingContext) -> bool {
        self.contexts.iter().any(|(c, _)| **c == *context)
    }

    pub fn priority_of(&self, context: &MappingContext) -> Option<i32> {
        self.contexts
            .iter()
            .find(|(c, _)| **c == *context)
            .map(|(_, priority)| *priority)
    }

    /// Applied context names, highest priority first
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|(c, _)| c.name()).collect()
    }

    pub fn num_contexts(&self) -> usize {
        self.contexts.len()
    }

    /// Route a key through the applied contexts; the highest priority match wins
    pub fn action_for_key(&self, key: &str) -> Option<Rc<InputAction>> {
        self.contexts
            .iter()
            .find_map(|(c, _)| c.action_for_key(key))
            .cloned()
    }

    pub fn user_settings(&self) -> &UserSettings {
        &self.user_settings
    }

    pub fn user_settings_mut(&mut self) -> &mut UserSettings {
        &mut self.user_settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_updates_priority_in_place() {
        let mut subsystem = InputSubsystem::new();
        let context = Rc::new(MappingContext::new("IMC_Default"));

        subsystem.add_mapping_context(&context, 0);
        subsystem.add_mapping_context(&context, 5);

        assert_eq!(subsystem.num_contexts(), 1);
        assert_eq!(subsystem.priority_of(&context), Some(5));
    }

    #[test]
    fn test_priority_routing() {
        let jump = InputAction::digital("IA_Jump");
        let vault = InputAction::digital("IA_Vault");
        let low = Rc::new(MappingContext::new("IMC_Low").map("Space", &jump));
        let high = Rc::new(MappingContext::new("IMC_High").map("Space", &vault));
        let mut subsystem = InputSubsystem::new();

        subsystem.add_mapping_context(&low, 0);
        subsystem.add_mapping_context(&high, 1);
        assert_eq!(subsystem.context_names(), vec!["IMC_High", "IMC_Low"]);
        assert_eq!(subsystem.action_for_key("Space").unwrap().name(), "IA_Vault");

        subsystem.remove_mapping_context(&high);
        assert_eq!(subsystem.action_for_key("Space").unwrap().name(), "IA_Jump");
        assert!(subsystem.action_for_key("LeftShift").is_none());
    }

    #[test]
    fn test_clear_all_mappings() {
        let mut subsystem = InputSubsystem::new();
        subsystem.add_mapping_context(&Rc::new(MappingContext::new("A")), 0);
        subsystem.add_mapping_context(&Rc::new(MappingContext::new("B")), 0);

        subsystem.clear_all_mappings();
        assert_eq!(subsystem.num_contexts(), 0);
    }

    #[test]
    fn test_user_settings_registration() {
        let mut settings = UserSettings::default();
        let context = Rc::new(MappingContext::new("IMC_Default"));

        assert!(settings.register_input_mapping_context(&context));
        assert!(!settings.register_input_mapping_context(&context));
        assert!(settings.unregister_input_mapping_context(&context));
        assert!(!settings.is_registered(&context));
    }
}
