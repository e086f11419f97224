//! External control slab — spec.md §4.5/§6.
//!
//! A small per-entity array of the latest [`ControlFrame`] each external
//! control client has sent, applied to the matching entity at the top of
//! every physics step. Backed by the fabric's supervisor-alloc scratch
//! region, since the distilled spec never carves out a dedicated named
//! region for it (only "a separate small slab" is specified).

use inos_events::ControlFrame;
use inos_fabric::layout::ENTITY_CAPACITY;

pub const CONTROL_SLAB_BYTES: usize = ENTITY_CAPACITY * ControlFrame::WIRE_LEN;

pub struct ControlSlab {
    base: *mut u8,
}

unsafe impl Send for ControlSlab {}
unsafe impl Sync for ControlSlab {}

impl ControlSlab {
    /// # Safety
    /// `base` must point to at least [`CONTROL_SLAB_BYTES`] valid, writable
    /// bytes for the fabric's lifetime.
    pub unsafe fn from_raw(base: *mut u8) -> Self {
        Self { base }
    }

    fn slot(&self, entity_id: usize) -> &mut [u8] {
        debug_assert!(entity_id < ENTITY_CAPACITY);
        let start = entity_id * ControlFrame::WIRE_LEN;
        unsafe { std::slice::from_raw_parts_mut(self.base.add(start), ControlFrame::WIRE_LEN) }
    }

    /// Applies an incoming control frame from an external client. Each call
    /// bumps nothing itself — the caller (the socket-reading thread) bumps
    /// the relevant control epoch after writing, per spec.md §6.
    pub fn apply(&self, frame: ControlFrame) {
        let bytes = frame.to_bytes();
        self.slot(frame.entity_id as usize).copy_from_slice(&bytes);
    }

    /// Reads entity `id`'s current control inputs as `[throttle, pitch,
    /// roll, yaw]`, or all-zero if no frame has ever arrived for it.
    pub fn read(&self, entity_id: usize) -> [f32; 4] {
        let bytes = self.slot(entity_id);
        match ControlFrame::from_bytes(bytes) {
            Some(f) => [f.throttle, f.pitch, f.roll, f.yaw],
            None => [0.0; 4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_frame_is_readable_by_entity_id() {
        let mut buf = vec![0u8; CONTROL_SLAB_BYTES];
        let slab = unsafe { ControlSlab::from_raw(buf.as_mut_ptr()) };
        slab.apply(ControlFrame {
            entity_id: 3,
            throttle: 0.8,
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
        });
        assert_eq!(slab.read(3), [0.8, 0.0, 0.0, 0.0]);
        assert_eq!(slab.read(4), [0.0, 0.0, 0.0, 0.0]);
    }
}
