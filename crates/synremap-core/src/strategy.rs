// Synremap Mapping Resolution Strategy
// Code-key candidate matching, target-code extraction and the auxiliary-only heuristic

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::action::Action;
use crate::codes::{self, BTN_BACK, BTN_EXTRA, BTN_FORWARD, BTN_SIDE, KEY_F13};
use crate::mapping::MappingTable;

/// Candidate code keys for one key event, in lookup order.
pub type Candidates = SmallVec<[String; 6]>;

/// Build the ordered candidate keys for a key event.
///
/// Symbolic name first, then any other kernel names of the same code, then
/// the decimal code. A scan code pending for the current report adds
/// `MSC_SCAN:<dec>`, `MSC_SCAN:<hex>`, `MSC_SCAN:0x<hex>` and
/// `MSC_SCAN_HEX:<hex>`.
pub fn candidate_keys(code_name: &str, code: u16, pending_scan: Option<u32>) -> Candidates {
    let mut candidates = Candidates::new();
    candidates.push(code_name.to_string());
    candidates.extend(
        codes::code_names(code)
            .iter()
            .filter(|alias| **alias != code_name)
            .map(|alias| alias.to_string()),
    );
    candidates.push(code.to_string());

    if let Some(scan) = pending_scan {
        let hex = format!("{:x}", scan);
        candidates.push(format!("MSC_SCAN:{}", scan));
        candidates.push(format!("MSC_SCAN:{}", hex));
        candidates.push(format!("MSC_SCAN:0x{}", hex));
        candidates.push(format!("MSC_SCAN_HEX:{}", hex));
    }

    candidates
}

/// Find the action configured for a key event.
///
/// The first candidate present in the table wins.
pub fn resolve<'a>(
    table: &'a MappingTable,
    code_name: &str,
    code: u16,
    pending_scan: Option<u32>,
) -> Option<&'a Action> {
    if table.is_empty() {
        return None;
    }
    candidate_keys(code_name, code, pending_scan)
        .iter()
        .find_map(|key| table.get(key.as_str()))
}

/// Canonical numeric code of a code key, if it has one.
///
/// Pure digit strings are decimal codes; `KEY_*` / `BTN_*` names are looked
/// up. Scan-code designators and anything else have no single code.
pub fn parse_target_code(key: &str) -> Option<u16> {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        return key.parse().ok();
    }
    if key.starts_with("KEY_") || key.starts_with("BTN_") {
        return codes::code_from_name(key);
    }
    None
}

/// Numeric key/button codes a mapping table targets.
pub fn extract_target_codes(table: &MappingTable) -> BTreeSet<u16> {
    table.keys().filter_map(|key| parse_target_code(key)).collect()
}

/// Tunables for [`is_auxiliary_only_with`].
///
/// The defaults match one vendor's code layout: codes from `KEY_F13` up are
/// treated as macro keys, and only the side/extra/forward/back buttons count
/// as auxiliary below that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryPolicy {
    /// Codes at or above this value are macro keys
    pub macro_threshold: u16,
    /// Pointer buttons below the threshold that still count as auxiliary
    pub auxiliary_buttons: BTreeSet<u16>,
}

impl Default for AuxiliaryPolicy {
    fn default() -> Self {
        Self {
            macro_threshold: KEY_F13,
            auxiliary_buttons: [BTN_SIDE, BTN_EXTRA, BTN_FORWARD, BTN_BACK]
                .into_iter()
                .collect(),
        }
    }
}

impl AuxiliaryPolicy {
    pub fn is_auxiliary_code(&self, code: u16) -> bool {
        code >= self.macro_threshold || self.auxiliary_buttons.contains(&code)
    }
}

/// Whether a table only touches auxiliary controls, using the default policy.
pub fn is_auxiliary_only(table: &MappingTable) -> bool {
    is_auxiliary_only_with(table, &AuxiliaryPolicy::default())
}

/// Whether a table only touches auxiliary controls.
///
/// True when the table is non-empty, holds no keystroke remap, targets at
/// least one numeric code, and every targeted code is a macro key or an
/// auxiliary pointer button.
pub fn is_auxiliary_only_with(table: &MappingTable, policy: &AuxiliaryPolicy) -> bool {
    if table.is_empty() {
        return false;
    }
    if !table.values().all(Action::is_auxiliary) {
        return false;
    }

    let codes = extract_target_codes(table);
    if codes.is_empty() {
        return false;
    }

    codes.iter().all(|code| policy.is_auxiliary_code(*code))
}
