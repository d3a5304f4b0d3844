//! Parameters accepted by [`ViewManager::load`](super::ViewManager::load).

use serde_json::{Map, Value};

/// Target layer plus extra fields merged onto a newly built view.
///
/// Built from a bare layer index or from a JSON object whose `layer` field
/// selects the layer; the remaining fields become the view's params.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadParams {
    pub layer: usize,
    pub extras: Map<String, Value>,
}

impl LoadParams {
    pub fn on_layer(layer: usize) -> Self {
        Self {
            layer,
            extras: Map::new(),
        }
    }

    /// Add an extra field for the view.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

impl From<usize> for LoadParams {
    fn from(layer: usize) -> Self {
        Self::on_layer(layer)
    }
}

impl From<Map<String, Value>> for LoadParams {
    fn from(mut extras: Map<String, Value>) -> Self {
        let layer = match extras.remove("layer") {
            Some(value) => value
                .as_u64()
                .and_then(|layer| usize::try_from(layer).ok())
                .unwrap_or_else(|| {
                    tracing::debug!(value = %value, "Ignoring non-numeric layer parameter");
                    0
                }),
            None => 0,
        };
        Self { layer, extras }
    }
}

impl From<Value> for LoadParams {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(extras) => extras.into(),
            Value::Number(number) => number
                .as_u64()
                .and_then(|layer| usize::try_from(layer).ok())
                .map(Self::on_layer)
                .unwrap_or_default(),
            _ => Self::default(),
        }
    }
}
