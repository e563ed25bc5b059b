// Synremap Action Model
// Output behaviors assigned to a physical key, and their persisted record form

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Payload field naming the target key of a keystroke action.
pub const KEYSTROKE_KEY_FIELD: &str = "key";

/// Type tag of an [`Action`] as written in a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, EnumIter)]
pub enum ActionKind {
    #[strum(serialize = "none")]
    None,
    #[strum(serialize = "keystroke")]
    Keystroke,
    #[strum(serialize = "scroll_up")]
    ScrollUp,
    #[strum(serialize = "scroll_down")]
    ScrollDown,
    #[strum(serialize = "mouse_button_x1")]
    AuxButton1,
    #[strum(serialize = "mouse_button_x2")]
    AuxButton2,
}

/// What a remapped key does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Swallow the event.
    None,
    /// Emit another key, mirroring press/release/repeat of the source key.
    Keystroke { target: String },
    ScrollUp,
    ScrollDown,
    /// First auxiliary mouse button (`BTN_SIDE`).
    AuxButton1,
    /// Second auxiliary mouse button (`BTN_EXTRA`).
    AuxButton2,
}

/// Persisted `{type, payload}` form of an [`Action`].
///
/// A missing or `null` payload reads as empty. Payload fields other than
/// the keystroke `key` are carried but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "payload_or_empty")]
    pub payload: BTreeMap<String, Value>,
}

fn payload_or_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, Value>, D::Error> {
    Ok(Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Errors decoding an [`ActionRecord`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Unknown action type: {0}")]
    UnknownType(String),

    #[error("Keystroke action is missing payload field 'key'")]
    MissingKeystrokeTarget,

    #[error("Keystroke payload field 'key' is not a string: {0}")]
    InvalidKeystrokeTarget(String),
}

impl Action {
    pub fn keystroke(target: impl Into<String>) -> Self {
        Action::Keystroke {
            target: target.into(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::None => ActionKind::None,
            Action::Keystroke { .. } => ActionKind::Keystroke,
            Action::ScrollUp => ActionKind::ScrollUp,
            Action::ScrollDown => ActionKind::ScrollDown,
            Action::AuxButton1 => ActionKind::AuxButton1,
            Action::AuxButton2 => ActionKind::AuxButton2,
        }
    }

    /// Returns true for actions that need a pointer-shaped output device
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            Action::ScrollUp | Action::ScrollDown | Action::AuxButton1 | Action::AuxButton2
        )
    }

    /// Returns true for actions that never touch a primary key:
    /// pointer actions and [`Action::None`].
    pub fn is_auxiliary(&self) -> bool {
        matches!(self, Action::None) || self.is_pointer()
    }

    pub fn is_keystroke(&self) -> bool {
        matches!(self, Action::Keystroke { .. })
    }

    pub fn to_record(&self) -> ActionRecord {
        let mut payload = BTreeMap::new();
        if let Action::Keystroke { target } = self {
            payload.insert(KEYSTROKE_KEY_FIELD.to_string(), Value::String(target.clone()));
        }
        ActionRecord {
            kind: self.kind().to_string(),
            payload,
        }
    }

    /// Decode a persisted record.
    ///
    /// Fails per record so that a loader can skip one bad entry and keep
    /// the rest of the table.
    pub fn from_record(record: &ActionRecord) -> Result<Self, ActionError> {
        let kind = ActionKind::from_str(&record.kind)
            .map_err(|_| ActionError::UnknownType(record.kind.clone()))?;
        Ok(match kind {
            ActionKind::None => Action::None,
            ActionKind::Keystroke => Action::keystroke(keystroke_target(record)?),
            ActionKind::ScrollUp => Action::ScrollUp,
            ActionKind::ScrollDown => Action::ScrollDown,
            ActionKind::AuxButton1 => Action::AuxButton1,
            ActionKind::AuxButton2 => Action::AuxButton2,
        })
    }
}

fn keystroke_target(record: &ActionRecord) -> Result<&str, ActionError> {
    match record.payload.get(KEYSTROKE_KEY_FIELD) {
        Some(Value::String(target)) => Ok(target.as_str()),
        Some(other) => Err(ActionError::InvalidKeystrokeTarget(other.to_string())),
        None => Err(ActionError::MissingKeystrokeTarget),
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Keystroke { target } => write!(f, "keystroke({})", target),
            other => write!(f, "{}", other.kind()),
        }
    }
}

impl From<&Action> for ActionRecord {
    fn from(action: &Action) -> Self {
        action.to_record()
    }
}

impl TryFrom<&ActionRecord> for Action {
    type Error = ActionError;

    fn try_from(record: &ActionRecord) -> Result<Self, Self::Error> {
        Action::from_record(record)
    }
}

impl Serialize for Action {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = ActionRecord::deserialize(deserializer)?;
        Action::from_record(&record).map_err(serde::de::Error::custom)
    }
}
