// Synremap Input Layer - Raw Events
// Backend-neutral input event record and event classification helpers

use crate::codes::{EV_KEY, EV_MSC, EV_REL, EV_SYN, MSC_SCAN, SYN_REPORT, VALUE_PRESSED};

/// One kernel input event: type, code and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEvent {
    pub const fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    pub const fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }

    pub const fn relative(axis: u16, value: i32) -> Self {
        Self::new(EV_REL, axis, value)
    }

    pub const fn scan(value: i32) -> Self {
        Self::new(EV_MSC, MSC_SCAN, value)
    }

    /// `SYN_REPORT` terminating a report group
    pub const fn sync() -> Self {
        Self::new(EV_SYN, SYN_REPORT, 0)
    }

    pub fn is_key(&self) -> bool {
        self.kind == EV_KEY
    }

    pub fn is_scan(&self) -> bool {
        self.kind == EV_MSC && self.code == MSC_SCAN
    }

    pub fn is_sync_report(&self) -> bool {
        self.kind == EV_SYN && self.code == SYN_REPORT
    }

    /// Key went down (not a repeat)
    pub fn is_press(&self) -> bool {
        self.is_key() && self.value == VALUE_PRESSED
    }
}
