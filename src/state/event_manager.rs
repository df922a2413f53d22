use crate::state::{events::Timed, timeline::Timeline};

/// Uniform per-category wrapper used for cursor groups and judgements, where
/// no checkpoint/delta split applies.
#[derive(Debug, Clone)]
pub struct SpectatorEventManager<T> {
    timeline: Timeline<T>,
}

impl<T> Default for SpectatorEventManager<T> {
    fn default() -> Self {
        Self {
            timeline: Timeline::default(),
        }
    }
}

impl<T: Timed> SpectatorEventManager<T> {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event.
    pub fn add(&mut self, event: T) {
        self.timeline.insert(event);
    }

    /// Latest event at or before `time`.
    pub fn event_at(&self, time: i64) -> Option<&T> {
        self.timeline.event_at(time)
    }

    /// Forget every recorded event.
    pub fn clear(&mut self) {
        self.timeline.clear();
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Most recently timed event regardless of query time.
    pub fn latest(&self) -> Option<&T> {
        self.timeline.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::events::{CursorKind, CursorSample, Position};

    fn sample(time: i64, x: f32, kind: CursorKind) -> CursorSample {
        CursorSample {
            time,
            group_id: 0,
            position: Position::new(x, 100.0),
            kind,
        }
    }

    #[test]
    fn cursor_sequencing() {
        let mut manager = SpectatorEventManager::new();
        manager.add(sample(0, 100.0, CursorKind::Down));
        manager.add(sample(50, 110.0, CursorKind::Move));

        let at_25 = manager.event_at(25).unwrap();
        assert_eq!(at_25.kind, CursorKind::Down);
        assert_eq!(at_25.time, 0);

        let at_60 = manager.event_at(60).unwrap();
        assert_eq!(at_60.kind, CursorKind::Move);
        assert_eq!(at_60.position, Position::new(110.0, 100.0));

        assert!(manager.event_at(-5).is_none());
    }

    #[test]
    fn clear_then_query_is_empty() {
        let mut manager = SpectatorEventManager::new();
        manager.add(sample(10, 1.0, CursorKind::Move));
        manager.clear();

        assert!(manager.is_empty());
        assert!(manager.event_at(10).is_none());
        assert!(manager.latest().is_none());
    }
}
