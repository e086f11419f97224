//! External control frame for drone-like compute units — spec.md §6.

/// Fixed 17-byte binary frame written into a unit's control slab.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlFrame {
    pub entity_id: u8,
    pub throttle: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl ControlFrame {
    pub const WIRE_LEN: usize = 17;

    pub fn to_bytes(self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        out[0] = self.entity_id;
        out[1..5].copy_from_slice(&self.throttle.to_le_bytes());
        out[5..9].copy_from_slice(&self.pitch.to_le_bytes());
        out[9..13].copy_from_slice(&self.roll.to_le_bytes());
        out[13..17].copy_from_slice(&self.yaw.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::WIRE_LEN {
            return None;
        }
        Some(Self {
            entity_id: bytes[0],
            throttle: f32::from_le_bytes(bytes[1..5].try_into().ok()?),
            pitch: f32::from_le_bytes(bytes[5..9].try_into().ok()?),
            roll: f32::from_le_bytes(bytes[9..13].try_into().ok()?),
            yaw: f32::from_le_bytes(bytes[13..17].try_into().ok()?),
        })
    }
}
