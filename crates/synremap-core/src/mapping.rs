// Synremap Mapping Configuration
// Code-key -> Action tables and the per-interface mapper configuration

use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::action::{Action, ActionRecord};

/// Mapping from a code key to an action.
///
/// A code key is a symbolic name (`KEY_F13`), a decimal code (`183`) or a
/// scan-code designator (`MSC_SCAN:70068`). Insertion order is kept so that
/// a table written back out reads the way it was loaded.
pub type MappingTable = IndexMap<String, Action>;

/// Errors decoding a mapping configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
}

/// Configuration consumed by one [`InputMapper`](crate::mapper::InputMapper).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingConfig {
    /// OS input interface to read from
    pub device_path: String,
    /// Take exclusive access of the source device
    pub grab: bool,
    /// Forward unmapped events verbatim
    pub passthrough: bool,
    // Tables last: TOML cannot place plain values after a table.
    pub mappings: MappingTable,
}

impl MappingConfig {
    pub fn new(device_path: impl Into<String>, mappings: MappingTable) -> Self {
        Self {
            device_path: device_path.into(),
            mappings,
            grab: true,
            passthrough: true,
        }
    }

    pub fn with_grab(mut self, grab: bool) -> Self {
        self.grab = grab;
        self
    }

    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn needs_keystroke_output(&self) -> bool {
        self.mappings.values().any(Action::is_keystroke)
    }

    pub fn needs_pointer_output(&self) -> bool {
        self.mappings.values().any(Action::is_pointer)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }
}

/// One `mappings` entry as found on disk: either a well-formed record or
/// anything else, which is skipped.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Record(ActionRecord),
    Other(IgnoredAny),
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct MappingConfigRecord {
    device_path: String,
    #[serde(default)]
    mappings: IndexMap<String, RawEntry>,
    #[serde(default = "default_true")]
    grab: bool,
    #[serde(default = "default_true")]
    passthrough: bool,
}

impl<'de> Deserialize<'de> for MappingConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = MappingConfigRecord::deserialize(deserializer)?;
        Ok(Self {
            device_path: record.device_path,
            mappings: decode_entries(record.mappings),
            grab: record.grab,
            passthrough: record.passthrough,
        })
    }
}

fn decode_entries(entries: IndexMap<String, RawEntry>) -> MappingTable {
    let mut table = MappingTable::with_capacity(entries.len());
    for (code, entry) in entries {
        match entry {
            RawEntry::Record(record) => match Action::from_record(&record) {
                Ok(action) => {
                    table.insert(code, action);
                }
                Err(e) => log::warn!("Skipping mapping '{}': {}", code, e),
            },
            RawEntry::Other(_) => {
                log::warn!("Skipping mapping '{}': not a {{type, payload}} record", code)
            }
        }
    }
    table
}

/// Decode a `mappings` object on its own, entry by entry.
///
/// Entries that fail to decode are logged and left out.
pub fn decode_mapping_table(value: serde_json::Value) -> MappingTable {
    match serde_json::from_value::<IndexMap<String, RawEntry>>(value) {
        Ok(entries) => decode_entries(entries),
        Err(e) => {
            log::warn!("Mapping table is not an object: {}", e);
            MappingTable::new()
        }
    }
}

/// Expand table entries across alias groups.
///
/// An alias group lists code keys that identify the same physical key
/// (for example `["KEY_F13", "183", "MSC_SCAN:70068"]`). Every entry whose
/// key is a member of a group is written under each member of that group.
/// The first group containing a key wins; keys in no group are kept as-is.
pub fn normalize_with_aliases<G, S>(table: &MappingTable, groups: &[G]) -> MappingTable
where
    G: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut normalized = MappingTable::with_capacity(table.len());
    for (code, action) in table {
        let group = groups
            .iter()
            .map(AsRef::as_ref)
            .find(|group| group.iter().any(|member| member.as_ref() == code.as_str()));

        match group {
            Some(members) => {
                for member in members {
                    normalized.insert(member.as_ref().to_string(), action.clone());
                }
            }
            None => {
                normalized.insert(code.clone(), action.clone());
            }
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(entries: &[(&str, Action)]) -> MappingTable {
        entries
            .iter()
            .map(|(code, action)| (code.to_string(), action.clone()))
            .collect()
    }

    #[test]
    fn test_defaults_when_fields_absent() {
        let config = MappingConfig::from_json_str(r#"{"device_path": "/dev/input/event3"}"#)
            .unwrap();
        assert_eq!(config.device_path, "/dev/input/event3");
        assert!(config.mappings.is_empty());
        assert!(config.grab);
        assert!(config.passthrough);
    }

    #[test]
    fn test_device_path_is_required() {
        assert!(MappingConfig::from_json_str(r#"{"mappings": {}}"#).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = MappingConfig::new(
            "/dev/input/by-id/usb-Razer_Razer_BlackWidow-event-kbd",
            table(&[
                ("KEY_F13", Action::ScrollUp),
                ("KEY_A", Action::keystroke("KEY_B")),
                ("MSC_SCAN:70068", Action::AuxButton1),
            ]),
        )
        .with_grab(false);

        let encoded = config.to_json_string().unwrap();
        let decoded = MappingConfig::from_json_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = MappingConfig::new("/dev/input/event5", table(&[("183", Action::ScrollDown)]))
            .with_passthrough(false);

        let encoded = config.to_toml_string().unwrap();
        let decoded = MappingConfig::from_toml_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let raw = json!({
            "device_path": "/dev/input/event3",
            "mappings": {
                "KEY_F13": {"type": "scroll_up", "payload": {}},
                "KEY_F14": {"type": "teleport", "payload": {}},
                "KEY_F15": "scroll_down",
                "KEY_F16": {"type": "keystroke", "payload": {}},
                "KEY_F17": {"type": "keystroke", "payload": {"key": "KEY_C"}}
            },
            "grab": false
        });

        let config: MappingConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings["KEY_F13"], Action::ScrollUp);
        assert_eq!(config.mappings["KEY_F17"], Action::keystroke("KEY_C"));
        assert!(!config.grab);
    }

    #[test]
    fn test_decode_mapping_table() {
        let decoded = decode_mapping_table(json!({
            "183": {"type": "mouse_button_x2"},
            "184": {"type": "nope"}
        }));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["183"], Action::AuxButton2);

        assert!(decode_mapping_table(json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_null_and_extended_payloads_are_kept() {
        let decoded = decode_mapping_table(json!({
            "KEY_F13": {"type": "scroll_up", "payload": null},
            "KEY_F14": {"type": "scroll_down", "payload": {"key": "x", "n": 1}},
            "KEY_F15": {"type": "keystroke", "payload": {"key": 48}}
        }));
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded["KEY_F13"], Action::ScrollUp);
        assert_eq!(decoded["KEY_F14"], Action::ScrollDown);
    }

    #[test]
    fn test_toml_payload_with_extra_fields() {
        let config = MappingConfig::from_toml_str(
            r#"
            device_path = "/dev/input/event5"

            [mappings.KEY_F13]
            type = "keystroke"
            payload = { key = "KEY_B", hold = true }
            "#,
        )
        .unwrap();
        assert_eq!(config.mappings["KEY_F13"], Action::keystroke("KEY_B"));
    }

    #[test]
    fn test_output_needs() {
        let config = MappingConfig::new("/dev/null", table(&[("KEY_F13", Action::ScrollUp)]));
        assert!(config.needs_pointer_output());
        assert!(!config.needs_keystroke_output());

        let config = MappingConfig::new("/dev/null", table(&[("KEY_A", Action::keystroke("KEY_B"))]));
        assert!(!config.needs_pointer_output());
        assert!(config.needs_keystroke_output());
    }

    #[test]
    fn test_normalize_expands_alias_group() {
        let mappings = table(&[("KEY_F13", Action::ScrollUp), ("KEY_A", Action::None)]);
        let groups = vec![
            vec!["KEY_F13", "KEY_MACRO1", "183"],
            vec!["KEY_F13", "something_else"],
        ];

        let normalized = normalize_with_aliases(&mappings, &groups);
        assert_eq!(normalized.len(), 4);
        assert_eq!(normalized["KEY_F13"], Action::ScrollUp);
        assert_eq!(normalized["KEY_MACRO1"], Action::ScrollUp);
        assert_eq!(normalized["183"], Action::ScrollUp);
        assert_eq!(normalized["KEY_A"], Action::None);
        assert!(!normalized.contains_key("something_else"));
    }

    #[test]
    fn test_normalize_without_groups_is_identity() {
        let mappings = table(&[("MSC_SCAN:70068", Action::AuxButton1)]);
        let groups: Vec<Vec<String>> = Vec::new();
        assert_eq!(normalize_with_aliases(&mappings, &groups), mappings);
    }
}
