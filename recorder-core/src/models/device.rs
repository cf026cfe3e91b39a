use serde::{Deserialize, Serialize};

/// An input device available for capture.
///
/// The `index` is stable for one enumeration pass and is what
/// `RecorderConfig::device_index` refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDevice {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}
