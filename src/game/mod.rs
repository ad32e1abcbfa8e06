// Game layer
//
// - Playable feature: per-pawn default input binding and its init-state chain
// - Feature actions: input content attached while a game feature is active

pub mod feature;
pub mod playable;

// Re-export commonly used types
pub use feature::{
    ActivationContext, AddInputConfigs, AddInputContextMapping, AddInputProcessors, GameFeatureAction,
    InputMappingEntry, ProcessorsToAdd,
};
pub use playable::{InitState, PlayableFeature, TagInputListener};
