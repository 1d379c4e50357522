//! Event types and sinks for observing drop sessions.
//!
//! A [`crate::dropper::controller::PartDropper`] reports what it does to an [`EventSink`]
//! in addition to logging. Hosts use this to refresh their UI without polling.
use std::path::PathBuf;

use glam::Vec3;

use crate::scene::NodePath;

/// Why a session stopped without reaching its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`crate::dropper::controller::PartDropper::stop_dropping`] was called.
    Requested,
    /// Container, part or scale factor changed.
    Reassigned,
    /// Instances were cleared.
    Cleared,
    /// An adapter call failed during a tick or spawn.
    Failed,
}

/// Describes events emitted by the drop controller.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum DropEvent {
    /// Emitted when a session starts.
    SessionStarted {
        /// Count at which the session stops by itself.
        target_part_count: u32,
    },

    /// Emitted after a part instance was created.
    PartSpawned {
        /// Ordinal of the instance.
        index: u32,
        /// Scene path of the instance.
        path: NodePath,
        /// Initial local translation.
        translation: Vec3,
        /// Uniform scale applied.
        scale: f32,
    },

    /// Emitted when the watched part was polled.
    PartPolled {
        /// Ordinal of the watched instance.
        index: u32,
        /// Local translation read from the scene.
        translation: Vec3,
        /// Distance travelled since the previous poll.
        displacement: f32,
        /// Whether the settle policy accepted the part as settled.
        settled: bool,
    },

    /// Emitted when a session reached its target count.
    TargetReached {
        /// Parts spawned in the session.
        part_count: u32,
    },

    /// Emitted when a running session stopped for another reason.
    SessionStopped {
        /// Parts spawned in the session.
        part_count: u32,
        reason: StopReason,
    },

    /// Emitted when the parts subtree was removed.
    InstancesCleared {
        /// Number of instances that existed before clearing.
        removed: u32,
    },

    /// Emitted when the container was instantiated in the primary scene.
    ContainerPlaced {
        path: NodePath,
        offset: Vec3,
        size: Vec3,
    },

    /// Emitted after a flattened scene was written.
    SceneExported {
        path: PathBuf,
        /// Number of part nodes written.
        part_count: usize,
    },

    /// Non-fatal warning.
    Warning {
        /// Context string (e.g. operation name).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// A generic event sink that accepts [`DropEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: DropEvent);
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: DropEvent) {}
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(DropEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(DropEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(DropEvent),
{
    #[inline]
    fn send(&mut self, event: DropEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<DropEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<DropEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[DropEvent] {
        &self.events
    }

    /// Removes and returns all collected events.
    pub fn drain(&mut self) -> Vec<DropEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: DropEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_and_drains() {
        let mut sink = VecSink::new();
        assert!(sink.is_empty());
        sink.send(DropEvent::TargetReached { part_count: 3 });
        sink.send(DropEvent::Warning {
            context: "export".into(),
            message: "m".into(),
        });
        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained[0], DropEvent::TargetReached { part_count: 3 });
        assert!(sink.is_empty());
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(DropEvent::InstancesCleared { removed: 2 });
        assert_eq!(count, 1);
    }
}
