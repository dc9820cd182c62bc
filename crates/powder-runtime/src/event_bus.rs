//! Bounded queue of game events between drains

use crate::event::GameEvent;
use std::collections::VecDeque;

/// Events kept when nobody drains the bus (a few seconds of chunk churn)
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Queue the simulation publishes to and the frame loop drains.
///
/// When full, the oldest event is discarded so a consumer that never
/// drains cannot grow memory without bound.
pub struct EventBus {
    events: VecDeque<GameEvent>,
    capacity: usize,
    /// Events discarded since the last drain
    overflowed: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_EVENT_CAPACITY)),
            capacity,
            overflowed: 0,
        }
    }

    pub fn push(&mut self, event: GameEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.overflowed += 1;
        }
        self.events.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// Take every queued event in publish order, with the number discarded
    /// to make room since the previous drain
    pub fn drain(&mut self) -> (Vec<GameEvent>, usize) {
        let overflowed = std::mem::take(&mut self.overflowed);
        (self.events.drain(..).collect(), overflowed)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_events_in_order_once() {
        let mut bus = EventBus::default();
        assert!(bus.is_empty());

        bus.push(GameEvent::ChunkLoaded { x: 0, z: -1 });
        bus.extend([GameEvent::Jumped, GameEvent::Landed]);
        assert_eq!(bus.len(), 3);

        let (events, overflowed) = bus.drain();
        assert_eq!(
            events,
            vec![
                GameEvent::ChunkLoaded { x: 0, z: -1 },
                GameEvent::Jumped,
                GameEvent::Landed
            ]
        );
        assert_eq!(overflowed, 0);
        assert!(bus.is_empty());
        assert!(bus.drain().0.is_empty());
    }

    #[test]
    fn full_bus_drops_the_oldest() {
        let mut bus = EventBus::with_capacity(2);
        bus.extend((0..5).map(|x| GameEvent::ChunkRetired { x, z: 0 }));
        assert_eq!(bus.len(), 2);

        let (events, overflowed) = bus.drain();
        assert_eq!(overflowed, 3);
        assert_eq!(
            events,
            vec![
                GameEvent::ChunkRetired { x: 3, z: 0 },
                GameEvent::ChunkRetired { x: 4, z: 0 }
            ]
        );
        assert_eq!(bus.drain().1, 0);
    }
}
