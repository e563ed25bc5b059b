// Synremap Input Layer
// Interface discovery, classification, filtering and the source abstraction

mod device;
mod event;
mod filter;
pub mod paths;
mod source;

pub use device::{classify, DeviceCapabilities, DeviceDescriptor, DeviceKind};
pub use event::RawEvent;
pub use filter::{filter_paths_for_codes, matches_target_codes};
pub use paths::{display_name, PathResolver};
pub use source::InputSource;
