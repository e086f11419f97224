//! Unit lifecycle registry — spec.md §4.3.

use std::collections::HashMap;

use inos_events::UnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Unregistered,
    Registering,
    Ready,
    Running,
    Draining,
    Halted,
}

#[derive(Debug, Clone)]
pub struct UnitEntry {
    pub state: UnitState,
    /// `"library:method"` capability strings this unit advertises.
    pub capabilities: Vec<String>,
    pub headroom: u32,
}

/// Registers units and enforces the state machine spec.md §4.3 defines:
/// `Unregistered -> Registering -> Ready -> Running -> Draining -> Halted`,
/// with any state able to transition directly to `Halted`.
pub struct UnitRegistry {
    units: HashMap<UnitId, UnitEntry>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
        }
    }

    pub fn register(&mut self, id: UnitId, capabilities: Vec<String>, headroom: u32) {
        self.units.insert(
            id,
            UnitEntry {
                state: UnitState::Ready,
                capabilities,
                headroom,
            },
        );
    }

    pub fn state(&self, id: &UnitId) -> UnitState {
        self.units
            .get(id)
            .map(|e| e.state)
            .unwrap_or(UnitState::Unregistered)
    }

    /// Marks a unit as having started executing a job. Valid from `Ready`
    /// or already-`Running` (a unit may run more than one job).
    pub fn mark_running(&mut self, id: &UnitId) {
        if let Some(entry) = self.units.get_mut(id) {
            if matches!(entry.state, UnitState::Ready | UnitState::Running) {
                entry.state = UnitState::Running;
            }
        }
    }

    pub fn mark_draining(&mut self, id: &UnitId) {
        if let Some(entry) = self.units.get_mut(id) {
            entry.state = UnitState::Draining;
        }
    }

    /// Fatal transition from any state — panic latch or missing heartbeat.
    pub fn halt(&mut self, id: &UnitId) {
        if let Some(entry) = self.units.get_mut(id) {
            entry.state = UnitState::Halted;
        }
    }

    /// Finds a registered, non-halted unit advertising `library:method`
    /// with headroom remaining, for the dispatch algorithm's local-route
    /// check (spec.md §4.3 step 3).
    pub fn find_capable(&self, library: &str, method: &str) -> Option<&UnitId> {
        let capability = format!("{library}:{method}");
        self.units.iter().find_map(|(id, entry)| {
            let available = !matches!(entry.state, UnitState::Halted | UnitState::Draining)
                && entry.headroom > 0
                && entry.capabilities.iter().any(|c| c == &capability);
            available.then_some(id)
        })
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}
