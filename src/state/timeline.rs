use crate::state::events::Timed;

/// Time-ordered store of events for one (player, category) pair.
///
/// Entries are kept sorted by [`Timed::time`] at all times: in-order arrivals are
/// pushed, late arrivals are shifted into place. Events sharing a timestamp keep
/// their arrival order. Entries are only ever removed all at once by [`Timeline::clear`].
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    entries: Vec<T>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Timed> Timeline<T> {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event at its sorted position.
    pub fn insert(&mut self, event: T) {
        let time = event.time();
        match self.entries.last() {
            Some(last) if time < last.time() => {
                let index = self.entries.partition_point(|entry| entry.time() <= time);
                self.entries.insert(index, event);
            }
            _ => self.entries.push(event),
        }
    }

    /// Latest event with `time <= at`, or `None` when the timeline is empty or
    /// `at` precedes the first entry.
    pub fn event_at(&self, at: i64) -> Option<&T> {
        let index = self.entries.partition_point(|entry| entry.time() <= at);
        index.checked_sub(1).map(|index| &self.entries[index])
    }

    /// Events with `after < time <= upto`, in time order.
    pub fn between(&self, after: i64, upto: i64) -> &[T] {
        if upto <= after {
            return &[];
        }
        let start = self.entries.partition_point(|entry| entry.time() <= after);
        let end = self.entries.partition_point(|entry| entry.time() <= upto);
        &self.entries[start..end]
    }

    /// Discard every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no event has been stored since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest stored event.
    pub fn first(&self) -> Option<&T> {
        self.entries.first()
    }

    /// Latest stored event.
    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    /// Iterate over events in time order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}
