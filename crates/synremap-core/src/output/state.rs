// Synremap Pressed Key State Management
// Tracks keys held down on a sink so they can be released on shutdown

use std::collections::BTreeSet;

use crate::codes::{EV_KEY, VALUE_RELEASED};
use crate::input::RawEvent;

/// Key codes currently held down on one sink
#[derive(Debug, Clone, Default)]
pub struct PressedKeyState {
    pressed: BTreeSet<u16>,
}

impl PressedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from an event written to the sink
    pub fn observe(&mut self, event: &RawEvent) {
        if event.kind != EV_KEY {
            return;
        }
        if event.value == VALUE_RELEASED {
            self.pressed.remove(&event.code);
        } else {
            self.pressed.insert(event.code);
        }
    }

    pub fn is_pressed_code(&self, code: u16) -> bool {
        self.pressed.contains(&code)
    }

    /// Release events for every held key, highest code first, followed by a
    /// sync. Empty when nothing is held. Clears the state.
    pub fn drain_releases(&mut self) -> Vec<RawEvent> {
        if self.pressed.is_empty() {
            return Vec::new();
        }
        let mut events: Vec<RawEvent> = self
            .pressed
            .iter()
            .rev()
            .map(|code| RawEvent::key(*code, VALUE_RELEASED))
            .collect();
        events.push(RawEvent::sync());
        self.pressed.clear();
        events
    }

    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }
}
