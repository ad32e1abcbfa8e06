// Math utilities for movement axes and view rotation

use glam::Vec3;

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Wrap an angle in degrees into the (-180, 180] range
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Forward axis (+X) rotated around Z by `yaw_degrees`
pub fn forward_from_yaw(yaw_degrees: f32) -> Vec3 {
    let (sin, cos) = yaw_degrees.to_radians().sin_cos();
    Vec3::new(cos, sin, 0.0)
}

/// Right axis (+Y) rotated around Z by `yaw_degrees`
pub fn right_from_yaw(yaw_degrees: f32) -> Vec3 {
    let (sin, cos) = yaw_degrees.to_radians().sin_cos();
    Vec3::new(-sin, cos, 0.0)
}
