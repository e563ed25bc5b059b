// Synremap Remap Session
// Applies one mapping table across every interface of a composite device

use crate::backend::DeviceBackend;
use crate::input::filter_paths_for_codes;
use crate::mapper::{InputMapper, MapperError, MapperOptions};
use crate::mapping::{MappingConfig, MappingTable};
use crate::settings::Settings;
use crate::strategy::{extract_target_codes, is_auxiliary_only_with};

/// Marker of a generic vendor interface in a by-id name
const VENDOR_INTERFACE_MARKER: &str = "-if";

/// An interface that could not be started
#[derive(Debug)]
pub struct InterfaceFailure {
    pub path: String,
    pub error: MapperError,
}

impl std::fmt::Display for InterfaceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.error)
    }
}

/// Errors applying a mapping table to a device
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No device path selected")]
    EmptySelection,

    #[error("No interface of {} could be started: {}", .selected, join_failures(.failures))]
    NoInterfaceStarted {
        selected: String,
        failures: Vec<InterfaceFailure>,
    },
}

fn join_failures(failures: &[InterfaceFailure]) -> String {
    if failures.is_empty() {
        return "no interfaces found".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Running mappers for all interfaces of one selected device.
///
/// Dropping the session stops every mapper.
#[derive(Debug)]
pub struct RemapSession {
    selected: String,
    mappers: Vec<InputMapper>,
    failures: Vec<InterfaceFailure>,
    auxiliary_only: bool,
}

impl RemapSession {
    /// Expand `selected_path` to its sibling interfaces and start a mapper
    /// on each one that can produce a targeted code.
    ///
    /// When the table only touches auxiliary controls, generic vendor
    /// interfaces run without grab or passthrough so primary keys on the
    /// same device are never routed through a virtual device.
    pub fn apply<B: DeviceBackend>(
        backend: &B,
        selected_path: &str,
        mappings: &MappingTable,
        settings: &Settings,
    ) -> Result<Self, SessionError> {
        let selected_path = selected_path.trim();
        if selected_path.is_empty() {
            return Err(SessionError::EmptySelection);
        }

        let expanded = settings.path_resolver().expand(selected_path);
        let codes = extract_target_codes(mappings);
        let paths = filter_paths_for_codes(backend, &expanded, &codes);
        let auxiliary_only = is_auxiliary_only_with(mappings, settings.auxiliary_policy());
        let options = MapperOptions::from(settings);

        log::info!("Applying {} mapping entries", mappings.len());
        log::info!("Mapper paths: {}", paths.join(", "));
        log::info!(
            "Auxiliary-only mode: {}",
            if auxiliary_only { "enabled" } else { "disabled" }
        );

        let mut mappers = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();

        for path in paths {
            let fast = auxiliary_only && path.contains(VENDOR_INTERFACE_MARKER);
            let config = MappingConfig::new(path.clone(), mappings.clone())
                .with_grab(!fast)
                .with_passthrough(!fast);

            let mut mapper = InputMapper::with_options(config, options.clone());
            match mapper.start(backend) {
                Ok(()) => mappers.push(mapper),
                Err(error) => {
                    log::warn!("[{}] Interface did not start: {}", path, error);
                    failures.push(InterfaceFailure { path, error });
                }
            }
        }

        if mappers.is_empty() {
            return Err(SessionError::NoInterfaceStarted {
                selected: selected_path.to_string(),
                failures,
            });
        }

        log::info!(
            "Remapper active on {} interface(s){}",
            mappers.len(),
            if auxiliary_only { " (auxiliary-only)" } else { "" }
        );

        Ok(Self {
            selected: selected_path.to_string(),
            mappers,
            failures,
            auxiliary_only,
        })
    }

    pub fn selected_path(&self) -> &str {
        &self.selected
    }

    pub fn mappers(&self) -> &[InputMapper] {
        &self.mappers
    }

    /// Interfaces that failed to start while others did
    pub fn failures(&self) -> &[InterfaceFailure] {
        &self.failures
    }

    pub fn is_auxiliary_only(&self) -> bool {
        self.auxiliary_only
    }

    /// Number of mappers whose read loop is still alive
    pub fn running_count(&self) -> usize {
        self.mappers.iter().filter(|m| m.is_running()).count()
    }

    /// Stop every mapper. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.mappers.is_empty() {
            return;
        }
        for mapper in &mut self.mappers {
            mapper.stop();
        }
        log::info!("Remapper stopped on {} interface(s)", self.mappers.len());
        self.mappers.clear();
    }
}

impl Drop for RemapSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages() {
        let failures = vec![
            InterfaceFailure {
                path: "/dev/input/event3".to_string(),
                error: MapperError::EmptyDevicePath,
            },
            InterfaceFailure {
                path: "/dev/input/event4".to_string(),
                error: MapperError::AlreadyStarted("/dev/input/event4".to_string()),
            },
        ];
        let error = SessionError::NoInterfaceStarted {
            selected: "/dev/input/event3".to_string(),
            failures,
        };
        let message = error.to_string();
        assert!(message.starts_with("No interface of /dev/input/event3 could be started"));
        assert!(message.contains("/dev/input/event3: Device path is empty"));
        assert!(message.contains("; /dev/input/event4: Mapper for"));
    }
}
