//! Semi-implicit Euler + quaternion integration — spec.md §4.5.

use crate::entity::EntityState;

/// Advances `state` by `dt` seconds in place: velocity from control inputs
/// and a constant-gravity pull, position from the *updated* velocity
/// (semi-implicit, not symplectic-exact but unconditionally stable for a
/// fixed small `dt`), and orientation by integrating the angular velocity
/// quaternion derivative.
pub fn step(state: &mut EntityState, dt: f32) {
    let [throttle, pitch, roll, yaw] = state.control;

    const GRAVITY: f32 = -9.81;
    const THRUST_GAIN: f32 = 20.0;
    const TORQUE_GAIN: f32 = 4.0;

    let up = body_up(&state.orientation);
    for i in 0..3 {
        state.velocity[i] += up[i] * throttle * THRUST_GAIN * dt;
    }
    state.velocity[1] += GRAVITY * dt;

    for i in 0..3 {
        state.position[i] += state.velocity[i] * dt;
    }

    state.angular_velocity = [pitch * TORQUE_GAIN, yaw * TORQUE_GAIN, roll * TORQUE_GAIN];
    state.orientation = integrate_quaternion(state.orientation, state.angular_velocity, dt);
}

/// The body-frame "up" vector (local +Z) rotated into world space by `q`.
fn body_up(q: &[f32; 4]) -> [f32; 3] {
    let [x, y, z, w] = *q;
    [
        2.0 * (x * z + w * y),
        2.0 * (y * z - w * x),
        1.0 - 2.0 * (x * x + y * y),
    ]
}

/// Integrates orientation forward by treating angular velocity as a pure
/// quaternion derivative: `q' = q + 0.5 * omega_quat * q * dt`, then
/// renormalizes to counter the linearization's drift away from unit length.
fn integrate_quaternion(q: [f32; 4], omega: [f32; 3], dt: f32) -> [f32; 4] {
    let [x, y, z, w] = q;
    let [ox, oy, oz] = omega;

    let dx = 0.5 * (ox * w + oy * z - oz * y);
    let dy = 0.5 * (oy * w + oz * x - ox * z);
    let dz = 0.5 * (oz * w + ox * y - oy * x);
    let dw = 0.5 * (-ox * x - oy * y - oz * z);

    let mut out = [x + dx * dt, y + dy * dt, z + dz * dt, w + dw * dt];
    let norm = (out[0] * out[0] + out[1] * out[1] + out[2] * out[2] + out[3] * out[3]).sqrt();
    if norm > f32::EPSILON {
        for c in &mut out {
            *c /= norm;
        }
    }
    out
}
