//! `inos-physics`: the batched physics / ping-pong compute unit — spec.md
//! §4.5. Canonical example of a unit built on `inos-fabric`'s ping-pong
//! discipline; boids, drones, and any other per-entity stepper follow this
//! same shape.

pub mod control_slab;
pub mod entity;
pub mod integrator;

use std::time::{Duration, Instant};

use inos_bridge::Bridge;
use inos_fabric::layout::{self, slot, ENTITY_CAPACITY, ENTITY_STRIDE_BYTES, MATRIX_STRIDE_BYTES};
use inos_fabric::RegionId;

use control_slab::ControlSlab;
use entity::EntityState;

/// Owns the entity state pair, the matrix-buffer pair (a cheap
/// orientation-only projection consumers can read without decoding the
/// full stride), and the control slab. Runs the hot loop:
/// read control -> integrate -> write inactive half -> flip -> bump epoch.
pub struct PhysicsUnit {
    state_a: *mut u8,
    state_b: *mut u8,
    matrix_a: *mut u8,
    matrix_b: *mut u8,
    control: ControlSlab,
    entity_count: usize,
    tick: Duration,
}

unsafe impl Send for PhysicsUnit {}

impl PhysicsUnit {
    pub fn new(bridge: &mut Bridge, entity_count: usize, tick_hz: f64) -> Self {
        assert!(entity_count <= ENTITY_CAPACITY);
        let state_a = bridge.region_ptr(RegionId::StateBufferA);
        let state_b = bridge.region_ptr(RegionId::StateBufferB);
        let matrix_a = bridge.region_ptr(RegionId::MatrixBufferA);
        let matrix_b = bridge.region_ptr(RegionId::MatrixBufferB);
        let control_ptr = bridge.region_ptr(RegionId::SupervisorAlloc);
        let control = unsafe { ControlSlab::from_raw(control_ptr) };
        Self {
            state_a,
            state_b,
            matrix_a,
            matrix_b,
            control,
            entity_count,
            tick: Duration::from_secs_f64(1.0 / tick_hz),
        }
    }

    fn half_ptrs(&self, inactive: i32) -> (*mut u8, *mut u8) {
        if inactive == 0 {
            (self.state_a, self.matrix_a)
        } else {
            (self.state_b, self.matrix_b)
        }
    }

    /// Runs one integration step over every tracked entity and publishes
    /// the result, following spec.md §4.1's ping-pong discipline directly
    /// (rather than through `inos_fabric::PingPong`) because this unit
    /// flips two buffer pairs — state and matrix — as a single atomic
    /// publish rather than two independent ones.
    pub fn step(&self, bridge: &Bridge, dt: f32) {
        let active = bridge.atomic_load(slot::PINGPONG_ACTIVE);
        let inactive = 1 - active;
        let (active_state_ptr, _) = self.half_ptrs(active);
        let (inactive_state_ptr, inactive_matrix_ptr) = self.half_ptrs(inactive);

        let active_buf =
            unsafe { std::slice::from_raw_parts(active_state_ptr, ENTITY_CAPACITY * ENTITY_STRIDE_BYTES) };
        let inactive_buf = unsafe {
            std::slice::from_raw_parts_mut(inactive_state_ptr, ENTITY_CAPACITY * ENTITY_STRIDE_BYTES)
        };
        let matrix_buf = unsafe {
            std::slice::from_raw_parts_mut(inactive_matrix_ptr, ENTITY_CAPACITY * MATRIX_STRIDE_BYTES)
        };

        for id in 0..self.entity_count {
            let mut e = entity::entity_at(active_buf, id);
            e.control = self.control.read(id);
            integrator::step(&mut e, dt);
            e.seal();
            entity::write_entity_at(inactive_buf, id, &e);

            let m_start = id * MATRIX_STRIDE_BYTES;
            matrix_buf[m_start..m_start + 16].copy_from_slice(unsafe {
                std::slice::from_raw_parts(e.orientation.as_ptr() as *const u8, 16)
            });
        }

        std::sync::atomic::fence(std::sync::atomic::Ordering::Release);
        bridge
            .atomic_store(slot::PINGPONG_ACTIVE, inactive)
            .expect("physics ping-pong flip must not race the panic latch");
        bridge.atomic_add(slot::PHYSICS_EPOCH, 1);
    }

    /// Reads entity `id`'s current (published, never mid-write) state.
    pub fn read_entity(&self, bridge: &Bridge, id: usize) -> EntityState {
        let active = bridge.atomic_load(slot::PINGPONG_ACTIVE);
        let (ptr, _) = self.half_ptrs(active);
        let buf = unsafe { std::slice::from_raw_parts(ptr, ENTITY_CAPACITY * ENTITY_STRIDE_BYTES) };
        entity::entity_at(buf, id)
    }

    /// Runs the tick-rate-driven hot loop until `should_stop` returns true.
    /// Matches `bins/onyx`'s wall-clock poll loop shape, generalized from a
    /// fixed sleep to a tick duration derived from configured Hz.
    pub fn run(&self, bridge: &Bridge, mut should_stop: impl FnMut() -> bool) {
        let dt = self.tick.as_secs_f32();
        loop {
            if should_stop() {
                return;
            }
            let started = Instant::now();
            self.step(bridge, dt);
            let elapsed = started.elapsed();
            if elapsed < self.tick {
                std::thread::sleep(self.tick - elapsed);
            }
        }
    }
}

pub use layout::ENTITY_CAPACITY as MAX_ENTITIES;

#[cfg(test)]
mod tests {
    use super::*;
    use inos_fabric::Fabric;

    #[test]
    fn stepping_advances_entities_and_flips_epoch() {
        let fabric = Fabric::create_anon().unwrap();
        let mut bridge = Bridge::new(fabric);
        let unit = PhysicsUnit::new(&mut bridge, 4, 250.0);

        let epoch_before = bridge.atomic_load(slot::PHYSICS_EPOCH);
        unit.step(&bridge, 1.0 / 250.0);
        let epoch_after = bridge.atomic_load(slot::PHYSICS_EPOCH);
        assert_eq!(epoch_after, epoch_before + 1);

        let e = unit.read_entity(&bridge, 0);
        assert!(e.is_consistent());
    }

    #[test]
    fn reader_never_observes_a_torn_entity_across_many_steps() {
        let fabric = Fabric::create_anon().unwrap();
        let mut bridge = Bridge::new(fabric);
        let unit = PhysicsUnit::new(&mut bridge, 16, 250.0);
        for _ in 0..1_000 {
            unit.step(&bridge, 1.0 / 250.0);
            for id in 0..16 {
                assert!(unit.read_entity(&bridge, id).is_consistent());
            }
        }
    }
}
