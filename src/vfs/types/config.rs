/*!
 * Per-call and per-filesystem configuration
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::permissions::Visibility;

/// Options accepted by write, update, put and create_dir
///
/// `visibility` is the only key the bundled adapters act on. Every other key
/// lands in `extra` and is passed through untouched so that other adapters
/// can read their own options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsConfig {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub visibility: Option<Visibility>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            extra: Map::new(),
        }
    }

    /// Attach an adapter-specific option
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Layer `overrides` on top of `self`
    ///
    /// Keys set in `overrides` win. Nested objects in `extra` are merged key by
    /// key instead of being replaced wholesale.
    #[must_use]
    pub fn merged(&self, overrides: &FsConfig) -> FsConfig {
        let mut extra = self.extra.clone();
        merge_maps(&mut extra, &overrides.extra);

        FsConfig {
            visibility: overrides.visibility.or(self.visibility),
            extra,
        }
    }
}

fn merge_maps(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_maps(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
