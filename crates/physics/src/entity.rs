//! Per-entity state record — spec.md §4.5.
//!
//! One fixed-stride record per entity: position, velocity, orientation
//! quaternion, angular velocity, control inputs, flags, and a checksum used
//! to detect a torn read (scenario 4 in spec.md §8). Laid out
//! array-of-structs at [`inos_fabric::layout::ENTITY_STRIDE_BYTES`] per
//! entity, the same fixed-stride-record choice `onyx_core::MarketStateManager`
//! makes for a small, dense, integer-keyed space — direct indexing, no
//! hashing, no heap churn on the hot loop.

use inos_fabric::layout::{ENTITY_CAPACITY, ENTITY_STRIDE_BYTES};

/// One entity's physics state, decoded from its stride in the ping-pong
/// buffer. `repr(C)` so the field order matches the wire layout exactly.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityState {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    /// `[x, y, z, w]`.
    pub orientation: [f32; 4],
    pub angular_velocity: [f32; 3],
    /// `[throttle, pitch, roll, yaw]`, copied in from the control slab at
    /// the top of each step.
    pub control: [f32; 4],
    pub flags: u32,
    /// XOR-fold of every other field's bits, recomputed on every write and
    /// checked by readers to catch a torn half-written record.
    pub checksum: u32,
}

const _: () = assert!(std::mem::size_of::<EntityState>() <= ENTITY_STRIDE_BYTES);

impl Default for EntityState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            angular_velocity: [0.0; 3],
            control: [0.0; 4],
            flags: 0,
            checksum: 0,
        }
    }
}

impl EntityState {
    fn compute_checksum(&self) -> u32 {
        let mut acc = 0u32;
        for v in self.position.iter().chain(&self.velocity).chain(&self.orientation).chain(&self.angular_velocity).chain(&self.control) {
            acc ^= v.to_bits();
        }
        acc ^ self.flags
    }

    /// Recomputes and stores the checksum. Must be called as the final step
    /// before publishing the record.
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// `true` if the checksum matches the rest of the record — i.e. this
    /// isn't a torn read.
    pub fn is_consistent(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    pub fn write_into(&self, dst: &mut [u8]) {
        debug_assert!(dst.len() >= std::mem::size_of::<Self>());
        let bytes = unsafe {
            std::slice::from_raw_parts(
                self as *const Self as *const u8,
                std::mem::size_of::<Self>(),
            )
        };
        dst[..bytes.len()].copy_from_slice(bytes);
    }

    pub fn read_from(src: &[u8]) -> Self {
        debug_assert!(src.len() >= std::mem::size_of::<Self>());
        let mut out = Self::default();
        unsafe {
            std::ptr::copy_nonoverlapping(
                src.as_ptr(),
                &mut out as *mut Self as *mut u8,
                std::mem::size_of::<Self>(),
            );
        }
        out
    }
}

/// Reads entity `index`'s record out of a ping-pong half buffer.
pub fn entity_at(buf: &[u8], index: usize) -> EntityState {
    debug_assert!(index < ENTITY_CAPACITY);
    let start = index * ENTITY_STRIDE_BYTES;
    EntityState::read_from(&buf[start..start + ENTITY_STRIDE_BYTES])
}

/// Writes entity `index`'s record into a ping-pong half buffer.
pub fn write_entity_at(buf: &mut [u8], index: usize, state: &EntityState) {
    debug_assert!(index < ENTITY_CAPACITY);
    let start = index * ENTITY_STRIDE_BYTES;
    state.write_into(&mut buf[start..start + ENTITY_STRIDE_BYTES]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_state_is_self_consistent() {
        let mut s = EntityState::default();
        s.position = [1.0, 2.0, 3.0];
        s.seal();
        assert!(s.is_consistent());
    }

    #[test]
    fn tampering_after_seal_is_detected() {
        let mut s = EntityState::default();
        s.seal();
        s.position[0] = 99.0;
        assert!(!s.is_consistent());
    }

    #[test]
    fn round_trips_through_a_byte_buffer() {
        let mut buf = vec![0u8; ENTITY_STRIDE_BYTES * 2];
        let mut s = EntityState::default();
        s.velocity = [1.0, -1.0, 0.5];
        s.seal();
        write_entity_at(&mut buf, 1, &s);
        let back = entity_at(&buf, 1);
        assert_eq!(back, s);
        assert!(back.is_consistent());
    }
}
