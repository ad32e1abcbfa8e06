// Well-known input tags

/// Movement from mouse and keyboard
pub const INPUT_MOVE_KM: &str = "Input.Move.KM";

/// Movement from a gamepad stick
pub const INPUT_MOVE_PAD: &str = "Input.Move.Pad";

/// View rotation from mouse delta
pub const INPUT_LOOK_KM: &str = "Input.Look.KM";

/// View rotation from a gamepad stick, applied as a rate
pub const INPUT_LOOK_PAD: &str = "Input.Look.Pad";

/// The four native move/look tags
pub const MOVE_AND_LOOK: [&str; 4] = [INPUT_MOVE_KM, INPUT_MOVE_PAD, INPUT_LOOK_KM, INPUT_LOOK_PAD];
