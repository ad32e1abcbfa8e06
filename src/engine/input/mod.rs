// Input handling system
//
// Actions fire through per-actor input components. Everything that binds to a
// component records its own identity so it can be unbound in one call.
//
// ## Architecture
//
// - `action`: input actions, trigger phases and action values
// - `component`: the per-actor subscription registry and its processors
// - `processor`: pluggable processors bound to tagged actions
// - `move_and_look`: built-in movement/look processor and shared movement glue
// - `config`: immutable input configs and binding sessions
// - `mapping`: mapping contexts and the per-player input subsystem
// - `tags`: well-known input tags

pub mod action;
pub mod component;
pub mod config;
pub mod mapping;
pub mod move_and_look;
pub mod processor;
pub mod tags;

// Re-export commonly used types
pub use action::{ActionEvent, InputAction, InputActionValue, TriggerEvent, ValueType};
pub use component::{ActionCallback, BindingHandle, InputComponent};
pub use config::{BindingSession, InputConfig, InputConfigBuilder, TagCallback};
pub use mapping::{InputSubsystem, KeyMapping, MappingContext, UserSettings};
pub use move_and_look::MoveAndLook;
pub use processor::{
    InputProcessor, ProcessorClass, ProcessorContext, ProcessorInstance, ProcessorRegistry,
    ProcessorSettings,
};

use crate::engine::world::{ActorId, LocalPlayerId};

/// Input lookups that can fail because the environment is not set up
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{0} is not possessed by a controller")]
    MissingController(ActorId),

    #[error("{0} has no local player")]
    MissingLocalPlayer(ActorId),

    #[error("Local player {0:?} has no input subsystem")]
    MissingInputSubsystem(LocalPlayerId),

    #[error("{0} has no input component")]
    MissingInputComponent(ActorId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_display() {
        let err = InputError::MissingInputComponent(ActorId(7));
        assert_eq!(err.to_string(), "Actor#7 has no input component");
    }
}
