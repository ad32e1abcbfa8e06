// Core types shared by the engine and game layers

pub mod math;
pub mod object;
pub mod tag;

pub use object::ObjectId;
pub use tag::GameplayTag;
