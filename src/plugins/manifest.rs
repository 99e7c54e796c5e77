//! On-disk plugin manifests
//!
//! A manifest is a JSON file in the plugin directory:
//!
//! ```json
//! {
//!   "interval": 3,
//!   "producer": "price_levels",
//!   "target_group": "default",
//!   "settings": { "symbol": "BTCUSDT", "timeframe": "1h" }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LoadError;

/// File extension of plugin manifests
pub const MANIFEST_EXTENSION: &str = "json";

/// Files starting with this marker are private and never loaded
pub const PRIVATE_MARKER: &str = "__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Overrides the file stem as plugin name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Seconds between ticks; must be a positive number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_group: Option<String>,

    /// Producer specific settings
    #[serde(default)]
    pub settings: Value,
}

impl PluginManifest {
    /// Read and parse a manifest file
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LoadError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Plugin name: explicit `name`, else the file stem
    pub fn plugin_name(&self, path: &Path) -> String {
        self.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// The interval, if present, finite and strictly positive
    pub fn positive_interval(&self) -> Option<f64> {
        self.interval.filter(|secs| secs.is_finite() && *secs > 0.0)
    }
}
