// Synremap Input Layer - Interface Filtering
// Keep only the interfaces that can produce the codes a mapping targets

use std::collections::BTreeSet;

use crate::backend::DeviceBackend;

use super::device::DeviceDescriptor;

/// Check if an interface should be opened for the given target codes.
///
/// An interface that could not be probed is kept; opening it for real will
/// either work or report the failure at start time.
pub fn matches_target_codes(descriptor: Option<&DeviceDescriptor>, codes: &BTreeSet<u16>) -> bool {
    match descriptor {
        Some(descriptor) => descriptor.capabilities.intersects_keys(codes),
        None => true,
    }
}

/// Narrow `paths` to interfaces whose key capabilities intersect `codes`.
///
/// With no target codes, or when nothing matches, `paths` comes back as-is.
pub fn filter_paths_for_codes<B: DeviceBackend>(
    backend: &B,
    paths: &[String],
    codes: &BTreeSet<u16>,
) -> Vec<String> {
    if codes.is_empty() {
        return paths.to_vec();
    }

    let selected: Vec<String> = paths
        .iter()
        .filter(|path| {
            let descriptor = match DeviceDescriptor::probe(backend, path) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    log::debug!("[{}] cannot inspect capabilities: {}", path, e);
                    None
                }
            };
            matches_target_codes(descriptor.as_ref(), codes)
        })
        .cloned()
        .collect();

    if selected.is_empty() {
        paths.to_vec()
    } else {
        selected
    }
}
