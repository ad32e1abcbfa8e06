// Move-and-look processor and the movement glue shared with playable pawns

use super::action::{ActionEvent, InputAction, TriggerEvent};
use super::processor::{InputProcessor, ProcessorClass, ProcessorContext, ProcessorSettings};
use super::tags::{INPUT_LOOK_KM, INPUT_LOOK_PAD, INPUT_MOVE_KM, INPUT_MOVE_PAD};
use crate::core::math::{forward_from_yaw, right_from_yaw};
use crate::core::GameplayTag;
use crate::engine::world::PawnMotor;
use glam::Vec2;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Default stick look rate around the vertical axis, degrees per second
pub const DEFAULT_PAD_LOOK_YAW_RATE: f32 = 300.0;

/// Default stick look rate around the lateral axis, degrees per second
pub const DEFAULT_PAD_LOOK_PITCH_RATE: f32 = 165.0;

/// Move relative to the control yaw: x strafes, y goes forward
pub fn apply_move(motor: &mut PawnMotor, value: Vec2) {
    let yaw = motor.yaw();
    if value.x != 0.0 {
        motor.add_movement_input(right_from_yaw(yaw), value.x);
    }
    if value.y != 0.0 {
        motor.add_movement_input(forward_from_yaw(yaw), value.y);
    }
}

/// Mouse deltas rotate the view directly
pub fn apply_mouse_look(motor: &mut PawnMotor, value: Vec2) {
    if value.x != 0.0 {
        motor.add_yaw_input(value.x);
    }
    if value.y != 0.0 {
        motor.add_pitch_input(value.y);
    }
}

/// Stick deflection rotates the view at a rate
pub fn apply_stick_look(motor: &mut PawnMotor, value: Vec2, yaw_rate: f32, pitch_rate: f32, delta_seconds: f32) {
    if value.x != 0.0 {
        motor.add_yaw_input(value.x * yaw_rate * delta_seconds);
    }
    if value.y != 0.0 {
        motor.add_pitch_input(value.y * pitch_rate * delta_seconds);
    }
}

/// Processor driving pawn movement and view from the four move/look tags
pub struct MoveAndLook {
    settings: ProcessorSettings,
    pad_look_yaw_rate: f32,
    pad_look_pitch_rate: f32,

    /// Pawn being driven; set while initialized
    motor: Weak<RefCell<PawnMotor>>,
}

impl MoveAndLook {
    pub const CLASS_NAME: &'static str = "MoveAndLook";

    pub fn new() -> Self {
        let settings = ProcessorSettings::new()
            .with_phases(&[TriggerEvent::Triggered])
            .with_action(INPUT_LOOK_PAD, None::<Rc<InputAction>>)
            .with_action(INPUT_MOVE_PAD, None::<Rc<InputAction>>)
            .with_action(INPUT_LOOK_KM, None::<Rc<InputAction>>)
            .with_action(INPUT_MOVE_KM, None::<Rc<InputAction>>);

        Self {
            settings,
            pad_look_yaw_rate: DEFAULT_PAD_LOOK_YAW_RATE,
            pad_look_pitch_rate: DEFAULT_PAD_LOOK_PITCH_RATE,
            motor: Weak::new(),
        }
    }

    /// Set the action for one of the move/look tags
    pub fn with_action(mut self, tag: &str, action: Rc<InputAction>) -> Self {
        self.settings.set_action(GameplayTag::new(tag), Some(action));
        self
    }

    pub fn with_pad_look_rates(mut self, yaw_rate: f32, pitch_rate: f32) -> Self {
        self.pad_look_yaw_rate = yaw_rate;
        self.pad_look_pitch_rate = pitch_rate;
        self
    }

    /// Processor class producing copies of `template`
    pub fn class(template: MoveAndLook) -> ProcessorClass {
        let settings = template.settings;
        let (yaw_rate, pitch_rate) = (template.pad_look_yaw_rate, template.pad_look_pitch_rate);
        ProcessorClass::new(Self::CLASS_NAME, move || MoveAndLook {
            settings: settings.clone(),
            pad_look_yaw_rate: yaw_rate,
            pad_look_pitch_rate: pitch_rate,
            motor: Weak::new(),
        })
    }
}

impl Default for MoveAndLook {
    fn default() -> Self {
        Self::new()
    }
}

impl InputProcessor for MoveAndLook {
    fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    fn on_initialized(&mut self, context: &ProcessorContext) {
        self.motor = context.motor.clone().unwrap_or_default();
    }

    fn on_deinitialize(&mut self, _context: &ProcessorContext) {
        self.motor = Weak::new();
    }

    fn on_triggered(&mut self, tag: &GameplayTag, event: &ActionEvent) {
        let Some(motor) = self.motor.upgrade() else {
            return;
        };
        let mut motor = motor.borrow_mut();
        let value = event.value.as_axis2d();

        match tag.name() {
            INPUT_MOVE_KM | INPUT_MOVE_PAD => apply_move(&mut motor, value),
            INPUT_LOOK_PAD => apply_stick_look(
                &mut motor,
                value,
                self.pad_look_yaw_rate,
                self.pad_look_pitch_rate,
                event.delta_seconds,
            ),
            INPUT_LOOK_KM => apply_mouse_look(&mut motor, value),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::{InputActionValue, InputComponent};
    use crate::engine::world::ActorId;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn setup() -> (InputComponent, Rc<RefCell<PawnMotor>>, ProcessorContext) {
        let motor = Rc::new(RefCell::new(PawnMotor::new()));
        let context = ProcessorContext {
            owner: ActorId(1),
            pawn: Some(ActorId(1)),
            motor: Some(Rc::downgrade(&motor)),
        };
        (InputComponent::new(ActorId(1)), motor, context)
    }

    fn triggered(value: Vec2, delta_seconds: f32) -> ActionEvent {
        ActionEvent::new(TriggerEvent::Triggered, InputActionValue::Axis2D(value), delta_seconds)
    }

    #[test]
    fn test_binds_triggered_only_for_set_actions() {
        let (mut component, _motor, context) = setup();
        let class = MoveAndLook::class(MoveAndLook::new().with_action(INPUT_MOVE_KM, InputAction::axis2d("IA_Move")));

        component.add_input_processor(Some(&class), &context);
        assert_eq!(component.num_bindings(), 1);
    }

    #[test]
    fn test_move_relative_to_yaw() {
        let (mut component, motor, context) = setup();
        let movement = InputAction::axis2d("IA_Move");
        let class = MoveAndLook::class(MoveAndLook::new().with_action(INPUT_MOVE_KM, movement.clone()));
        component.add_input_processor(Some(&class), &context);

        motor.borrow_mut().add_yaw_input(90.0);
        component.process_action(&movement, &triggered(Vec2::new(0.0, 1.0), 0.016));

        let pending = motor.borrow().pending_movement();
        assert_relative_eq!(pending.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(pending.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_stick_look_uses_rate_and_delta() {
        let (mut component, motor, context) = setup();
        let look = InputAction::axis2d("IA_Look_Pad");
        let class = MoveAndLook::class(MoveAndLook::new().with_action(INPUT_LOOK_PAD, look.clone()));
        component.add_input_processor(Some(&class), &context);

        component.process_action(&look, &triggered(Vec2::new(1.0, 0.5), 0.1));

        assert_relative_eq!(motor.borrow().yaw(), 30.0, epsilon = 1e-4);
        assert_relative_eq!(motor.borrow().pitch(), 8.25, epsilon = 1e-4);
    }

    #[test]
    fn test_mouse_look_is_direct() {
        let mut motor = PawnMotor::new();
        apply_mouse_look(&mut motor, Vec2::new(10.0, -5.0));
        assert_relative_eq!(motor.yaw(), 10.0);
        assert_relative_eq!(motor.pitch(), -5.0);
    }

    #[test]
    fn test_deinitialized_processor_ignores_input() {
        let (mut component, motor, context) = setup();
        let movement = InputAction::axis2d("IA_Move");
        let class = MoveAndLook::class(MoveAndLook::new().with_action(INPUT_MOVE_KM, movement.clone()));
        component.add_input_processor(Some(&class), &context);
        component.remove_all_input_processors(&context);

        assert_eq!(component.process_action(&movement, &triggered(Vec2::ONE, 0.016)), 0);
        assert_eq!(motor.borrow().pending_movement(), Vec3::ZERO);
    }
}
