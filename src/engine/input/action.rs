// Input actions, trigger phases and action values

use glam::{Vec2, Vec3};
use std::fmt;
use std::rc::Rc;

/// Kind of value an action produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    #[default]
    Digital,
    Axis1D,
    Axis2D,
    Axis3D,
}

/// A semantic input action such as "Jump" or "Move"
///
/// Actions are shared content; two references name the same action when their
/// names match.
#[derive(Debug, Clone)]
pub struct InputAction {
    name: String,
    value_type: ValueType,
}

impl InputAction {
    /// Create a new action
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            value_type,
        })
    }

    /// Create a digital (button) action
    pub fn digital(name: impl Into<String>) -> Rc<Self> {
        Self::new(name, ValueType::Digital)
    }

    /// Create a 2D axis action (sticks, WASD, mouse delta)
    pub fn axis2d(name: impl Into<String>) -> Rc<Self> {
        Self::new(name, ValueType::Axis2D)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

impl PartialEq for InputAction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for InputAction {}

/// Stage of an input gesture's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    /// Gesture began this frame
    Started,
    /// Gesture is being evaluated but has not fired
    Ongoing,
    /// Gesture fired (every frame while the trigger condition holds)
    Triggered,
    /// Gesture was abandoned before firing
    Canceled,
    /// Gesture finished
    Completed,
}

impl TriggerEvent {
    /// All phases in lifecycle order
    pub const ALL: [TriggerEvent; 5] = [
        TriggerEvent::Started,
        TriggerEvent::Ongoing,
        TriggerEvent::Triggered,
        TriggerEvent::Canceled,
        TriggerEvent::Completed,
    ];
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Started => "Started",
            Self::Ongoing => "Ongoing",
            Self::Triggered => "Triggered",
            Self::Canceled => "Canceled",
            Self::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// Raw value delivered with an action event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputActionValue {
    Digital(bool),
    Axis1D(f32),
    Axis2D(Vec2),
    Axis3D(Vec3),
}

impl Default for InputActionValue {
    fn default() -> Self {
        Self::Digital(false)
    }
}

impl InputActionValue {
    /// Read the value as a button state
    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Digital(pressed) => pressed,
            Self::Axis1D(x) => x != 0.0,
            Self::Axis2D(v) => v != Vec2::ZERO,
            Self::Axis3D(v) => v != Vec3::ZERO,
        }
    }

    /// Read the value as a single axis
    pub fn as_axis1d(&self) -> f32 {
        match *self {
            Self::Digital(pressed) => {
                if pressed {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Axis1D(x) => x,
            Self::Axis2D(v) => v.x,
            Self::Axis3D(v) => v.x,
        }
    }

    /// Read the value as a 2D axis; lower-dimension values fill X
    pub fn as_axis2d(&self) -> Vec2 {
        match *self {
            Self::Axis2D(v) => v,
            Self::Axis3D(v) => v.truncate(),
            other => Vec2::new(other.as_axis1d(), 0.0),
        }
    }
}

/// One delivery of an action to a subscriber
#[derive(Debug, Clone, PartialEq)]
pub struct ActionEvent {
    pub phase: TriggerEvent,
    pub value: InputActionValue,
    /// Frame time, for rate-based handlers such as stick look
    pub delta_seconds: f32,
}

impl ActionEvent {
    pub fn new(phase: TriggerEvent, value: InputActionValue, delta_seconds: f32) -> Self {
        Self {
            phase,
            value,
            delta_seconds,
        }
    }
}
