use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::view::DEFAULT_LAYER_ATTRIBUTE;

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub manager: ManagerConfig,
}

/// Settings for a [`ViewManager`](crate::manager::ViewManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Selector for the element holding every layer (e.g. "#view-root").
    /// Defaults to the surface root when unset.
    #[serde(default)]
    pub container: Option<String>,
    /// Attribute marking a view's root element with its layer index
    /// (default: "data-layer-index").
    #[serde(default = "default_layer_attribute")]
    pub layer_attribute: String,
    /// Upper bound for a single render or transition in milliseconds.
    /// Unset means steps may take forever.
    #[serde(default)]
    pub step_timeout_ms: Option<u64>,
}

fn default_layer_attribute() -> String {
    DEFAULT_LAYER_ATTRIBUTE.to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            container: None,
            layer_attribute: default_layer_attribute(),
            step_timeout_ms: None,
        }
    }
}

impl ManagerConfig {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }
}
