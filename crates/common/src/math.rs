//! Scalar helpers shared by the kart and flight models.

pub use std::f32::consts::{PI, TAU};

/// Wrap a value into `[0, 1)`.
pub fn wrap01(v: f32) -> f32 {
    let t = v.rem_euclid(1.0);
    // rem_euclid can return exactly 1.0 for tiny negative inputs.
    if t >= 1.0 { 0.0 } else { t }
}

/// Normalize an angle into `[0, TAU)`.
pub fn norm_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU { 0.0 } else { a }
}

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_pi(angle: f32) -> f32 {
    let a = norm_angle(angle);
    if a > PI { a - TAU } else { a }
}

/// Frame-rate independent exponential approach of `current` toward `target`.
pub fn damp(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * (1.0 - (-rate * dt).exp())
}

/// Move `current` toward `target` by at most `max_delta`.
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// `-1`, `0` or `1` following the sign of `v`, with zero mapped to zero.
pub fn sign0(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
