// Synremap Event Translation
// Per-event remapping of one interface's stream onto the virtual sinks

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::action::Action;
use crate::codes::{self, BTN_EXTRA, BTN_SIDE, REL_WHEEL, VALUE_PRESSED, VALUE_RELEASED};
use crate::input::RawEvent;
use crate::mapping::MappingTable;
use crate::output::SinkRole;
use crate::strategy;

/// One event destined for one sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    pub role: SinkRole,
    pub event: RawEvent,
}

impl Emission {
    fn new(role: SinkRole, event: RawEvent) -> Self {
        Self { role, event }
    }
}

pub type Emissions = SmallVec<[Emission; 4]>;

/// Turns source events into sink writes.
///
/// Holds the per-report scan code and a name cache, so one translator
/// serves exactly one source stream.
pub struct EventTranslator {
    device_path: String,
    mappings: Arc<MappingTable>,
    passthrough: bool,
    has_keyboard: bool,
    has_pointer: bool,
    pending_scan: Option<u32>,
    names: HashMap<u16, String>,
}

impl EventTranslator {
    pub fn new(
        device_path: impl Into<String>,
        mappings: Arc<MappingTable>,
        passthrough: bool,
        has_keyboard: bool,
        has_pointer: bool,
    ) -> Self {
        Self {
            device_path: device_path.into(),
            mappings,
            passthrough,
            has_keyboard,
            has_pointer,
            pending_scan: None,
            names: HashMap::new(),
        }
    }

    /// Scan code waiting to qualify the next key event of this report
    pub fn pending_scan(&self) -> Option<u32> {
        self.pending_scan
    }

    pub fn translate(&mut self, event: RawEvent) -> Emissions {
        let mut out = Emissions::new();

        if event.is_scan() {
            let scan = event.value as u32;
            log::trace!("[{}] scan code 0x{:x}", self.device_path, scan);
            self.pending_scan = Some(scan);
            return out;
        }

        if event.is_sync_report() {
            self.pending_scan = None;
            self.forward(event, &mut out);
            return out;
        }

        if event.is_key() {
            self.translate_key(event, &mut out);
            return out;
        }

        self.forward(event, &mut out);
        out
    }

    fn translate_key(&mut self, event: RawEvent, out: &mut Emissions) {
        let name = self
            .names
            .entry(event.code)
            .or_insert_with(|| codes::display_code_name(event.code))
            .as_str();

        let action =
            match strategy::resolve(&self.mappings, name, event.code, self.pending_scan) {
                Some(action) => action,
                None => {
                    if event.is_press() {
                        log::debug!(
                            "[{}] {} ({}) scan={:?} unmapped",
                            self.device_path,
                            name,
                            event.code,
                            self.pending_scan
                        );
                    }
                    self.forward(event, out);
                    return;
                }
            };

        if event.is_press() {
            log::debug!(
                "[{}] {} ({}) scan={:?} -> {}",
                self.device_path,
                name,
                event.code,
                self.pending_scan,
                action
            );
        }

        match action {
            Action::None => {}
            Action::Keystroke { target } => {
                let Some(target_code) = codes::code_from_name(target) else {
                    log::warn!(
                        "[{}] Unknown keystroke target '{}', dropping {}",
                        self.device_path,
                        target,
                        name
                    );
                    return;
                };
                if self.has_keyboard {
                    out.push(Emission::new(
                        SinkRole::Keyboard,
                        RawEvent::key(target_code, event.value),
                    ));
                    out.push(Emission::new(SinkRole::Keyboard, RawEvent::sync()));
                }
            }
            Action::ScrollUp | Action::ScrollDown => {
                if event.value != VALUE_PRESSED {
                    return;
                }
                let Some(role) = self.pointer_role() else {
                    return;
                };
                let delta = if matches!(action, Action::ScrollUp) { 1 } else { -1 };
                out.push(Emission::new(role, RawEvent::relative(REL_WHEEL, delta)));
                out.push(Emission::new(role, RawEvent::sync()));
            }
            Action::AuxButton1 | Action::AuxButton2 => {
                if event.value != VALUE_PRESSED {
                    return;
                }
                let Some(role) = self.pointer_role() else {
                    return;
                };
                let button = if matches!(action, Action::AuxButton1) {
                    BTN_SIDE
                } else {
                    BTN_EXTRA
                };
                out.push(Emission::new(role, RawEvent::key(button, VALUE_PRESSED)));
                out.push(Emission::new(role, RawEvent::key(button, VALUE_RELEASED)));
                out.push(Emission::new(role, RawEvent::sync()));
            }
        }
    }

    /// Pointer sink when present, else the keyboard sink.
    fn pointer_role(&self) -> Option<SinkRole> {
        if self.has_pointer {
            Some(SinkRole::Pointer)
        } else if self.has_keyboard {
            Some(SinkRole::Keyboard)
        } else {
            None
        }
    }

    fn forward(&self, event: RawEvent, out: &mut Emissions) {
        if self.passthrough && self.has_keyboard {
            out.push(Emission::new(SinkRole::Keyboard, event));
        }
    }
}
