// Actors, actor classes and pawn movement state

use crate::core::math::{clamp, normalize_degrees};
use crate::engine::world::LocalPlayerId;
use glam::Vec3;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle to an actor in a world
///
/// IDs are never reused, so a stale ID simply fails the liveness check instead
/// of aliasing a newer actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub(crate) u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor#{}", self.0)
    }
}

/// Actor class with its full ancestry, most derived first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorClass {
    lineage: Vec<String>,
}

impl ActorClass {
    /// Root class of everything placed in a world
    pub fn actor() -> Self {
        Self {
            lineage: vec!["Actor".to_string()],
        }
    }

    pub fn pawn() -> Self {
        Self::actor().subclass("Pawn")
    }

    pub fn controller() -> Self {
        Self::actor().subclass("Controller")
    }

    pub fn player_controller() -> Self {
        Self::controller().subclass("PlayerController")
    }

    pub fn ai_controller() -> Self {
        Self::controller().subclass("AIController")
    }

    /// Derive a new class from this one
    pub fn subclass(&self, name: &str) -> Self {
        let mut lineage = Vec::with_capacity(self.lineage.len() + 1);
        lineage.push(name.to_string());
        lineage.extend(self.lineage.iter().cloned());
        Self { lineage }
    }

    /// Most derived class name
    pub fn name(&self) -> &str {
        &self.lineage[0]
    }

    /// Check if this class is `other` or derives from it
    pub fn is_child_of(&self, other: &ActorClass) -> bool {
        self.lineage.ends_with(&other.lineage)
    }
}

impl fmt::Display for ActorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Network role of this instance of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetRole {
    /// This process owns the actor
    #[default]
    Authority,
    /// Remote actor driven by the local player
    AutonomousProxy,
    /// Remote actor replaying another machine's state
    SimulatedProxy,
}

/// Movement and view input accumulated on a pawn
#[derive(Debug, Clone, Default)]
pub struct PawnMotor {
    /// Movement requested since the last consume
    pending_movement: Vec3,

    /// Control rotation yaw in degrees
    yaw: f32,

    /// Control rotation pitch in degrees, clamped to avoid flipping
    pitch: f32,
}

impl PawnMotor {
    const MAX_PITCH: f32 = 89.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Request movement along `direction`, scaled by `scale`
    pub fn add_movement_input(&mut self, direction: Vec3, scale: f32) {
        self.pending_movement += direction * scale;
    }

    pub fn add_yaw_input(&mut self, degrees: f32) {
        self.yaw = normalize_degrees(self.yaw + degrees);
    }

    pub fn add_pitch_input(&mut self, degrees: f32) {
        self.pitch = clamp(self.pitch + degrees, -Self::MAX_PITCH, Self::MAX_PITCH);
    }

    pub fn pending_movement(&self) -> Vec3 {
        self.pending_movement
    }

    /// Take the accumulated movement, leaving zero behind
    pub fn consume_movement(&mut self) -> Vec3 {
        std::mem::take(&mut self.pending_movement)
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }
}

/// An object placed in a world
#[derive(Debug)]
pub struct Actor {
    pub(crate) id: ActorId,
    pub(crate) name: String,
    pub(crate) class: ActorClass,
    pub(crate) role: NetRole,

    /// Controller possessing this pawn
    pub(crate) controller: Option<ActorId>,

    /// Pawn possessed by this controller
    pub(crate) pawn: Option<ActorId>,

    /// Local player driving this player controller
    pub(crate) local_player: Option<LocalPlayerId>,

    /// Movement state, pawns only
    pub(crate) motor: Option<Rc<RefCell<PawnMotor>>>,
}

impl Actor {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &ActorClass {
        &self.class
    }

    pub fn role(&self) -> NetRole {
        self.role
    }

    pub fn controller(&self) -> Option<ActorId> {
        self.controller
    }

    pub fn pawn(&self) -> Option<ActorId> {
        self.pawn
    }

    pub fn local_player(&self) -> Option<LocalPlayerId> {
        self.local_player
    }

    pub fn motor(&self) -> Option<&Rc<RefCell<PawnMotor>>> {
        self.motor.as_ref()
    }

    pub fn is_pawn(&self) -> bool {
        self.class.is_child_of(&ActorClass::pawn())
    }

    pub fn is_controller(&self) -> bool {
        self.class.is_child_of(&ActorClass::controller())
    }

    pub fn is_player_controller(&self) -> bool {
        self.class.is_child_of(&ActorClass::player_controller())
    }

    pub fn is_a(&self, class: &ActorClass) -> bool {
        self.class.is_child_of(class)
    }
}

/// Description of an actor to spawn
#[derive(Debug, Clone)]
pub struct ActorSpec {
    pub name: String,
    pub class: ActorClass,
    pub role: NetRole,

    /// Create an input component when the actor is spawned
    pub input_component: bool,

    /// Register the actor with the extension manager
    pub receiver: bool,

    /// Local player that drives this player controller
    pub local_player: Option<LocalPlayerId>,
}

impl ActorSpec {
    /// Generic actor of the given class
    pub fn new(name: impl Into<String>, class: ActorClass) -> Self {
        Self {
            name: name.into(),
            class,
            role: NetRole::Authority,
            input_component: false,
            receiver: true,
            local_player: None,
        }
    }

    pub fn pawn(name: impl Into<String>) -> Self {
        Self::new(name, ActorClass::pawn())
    }

    /// Player controller driven by a local player, with its own input component
    pub fn player_controller(name: impl Into<String>, local_player: LocalPlayerId) -> Self {
        Self {
            input_component: true,
            local_player: Some(local_player),
            ..Self::new(name, ActorClass::player_controller())
        }
    }

    /// Player controller of a remote client, as seen on the server
    pub fn remote_player_controller(name: impl Into<String>) -> Self {
        Self::new(name, ActorClass::player_controller())
    }

    pub fn ai_controller(name: impl Into<String>) -> Self {
        Self::new(name, ActorClass::ai_controller())
    }

    pub fn with_class(mut self, class: ActorClass) -> Self {
        self.class = class;
        self
    }

    pub fn with_role(mut self, role: NetRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_input_component(mut self, enabled: bool) -> Self {
        self.input_component = enabled;
        self
    }

    pub fn with_receiver(mut self, enabled: bool) -> Self {
        self.receiver = enabled;
        self
    }
}
