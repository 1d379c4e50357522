//! Session state tracked between update ticks.
use glam::Vec3;

use crate::dropper::config::DropConfig;
use crate::scene::NodePath;

/// A spawned copy of the part that is still being watched.
#[derive(Debug, Clone, PartialEq)]
pub struct PartInstance {
    /// Ordinal of the instance within the session, starting at 1.
    pub index: u32,
    pub path: NodePath,
    /// Local translation seen at the previous poll.
    pub last_observed: Vec3,
}

/// State of a drop session.
///
/// A fresh value is the initial (and cleared) state: not dropping, no parts, nothing watched.
/// While `is_dropping` is set, `current` holds the watched instance.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct DropSessionState {
    pub is_dropping: bool,
    pub target_part_count: u32,
    pub drop_interval_ms: u64,
    pub last_drop_time_ms: u64,
    /// Instances spawned since the last clear.
    pub part_count: u32,
    pub current: Option<PartInstance>,
}

impl DropSessionState {
    pub fn new(config: &DropConfig) -> Self {
        Self {
            is_dropping: false,
            target_part_count: config.target_part_count,
            drop_interval_ms: config.drop_interval_ms,
            last_drop_time_ms: 0,
            part_count: 0,
            current: None,
        }
    }

    pub fn target_reached(&self) -> bool {
        self.part_count >= self.target_part_count
    }
}

/// Outcome of one [`crate::dropper::controller::PartDropper::update`] tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateResult {
    /// No session is running.
    Idle,
    /// Waiting for the poll interval or for the current part to settle.
    Dropping,
    /// The current part settled and the part with this index was spawned.
    PartDropped { index: u32 },
    /// The target count was reached; the session stopped.
    TargetReached { part_count: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_takes_limits_from_config() {
        let config = DropConfig::new()
            .with_target_part_count(3)
            .with_drop_interval_ms(250);
        let state = DropSessionState::new(&config);
        assert!(!state.is_dropping);
        assert_eq!(state.target_part_count, 3);
        assert_eq!(state.drop_interval_ms, 250);
        assert_eq!(state.part_count, 0);
        assert!(state.current.is_none());
        assert!(!state.target_reached());
    }

    #[test]
    fn zero_target_is_reached_immediately() {
        let state = DropSessionState::new(&DropConfig::new().with_target_part_count(0));
        assert!(state.target_reached());
    }
}
