//! Producer that publishes a fixed payload

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LoadError, ProduceError};
use crate::plugins::Producer;
use crate::types::Payload;

pub const STATIC_KIND: &str = "static";

#[derive(Debug, Default, Deserialize)]
struct StaticSettings {
    #[serde(default)]
    payload: Value,
    /// Publish only on the first tick
    #[serde(default)]
    once: bool,
}

#[derive(Debug)]
pub struct StaticPayload {
    payload: Value,
    once: bool,
    fired: AtomicBool,
}

impl StaticPayload {
    pub fn new(payload: Value, once: bool) -> Self {
        Self {
            payload,
            once,
            fired: AtomicBool::new(false),
        }
    }

    pub fn from_settings(name: &str, settings: &Value) -> Result<Self, LoadError> {
        let settings: StaticSettings = if settings.is_null() {
            StaticSettings::default()
        } else {
            serde_json::from_value(settings.clone()).map_err(|e| LoadError::InvalidSettings {
                name: name.to_string(),
                reason: e.to_string(),
            })?
        };
        Ok(Self::new(settings.payload, settings.once))
    }
}

impl Producer for StaticPayload {
    fn produce(&self) -> Result<Option<Payload>, ProduceError> {
        if self.once && self.fired.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        if self.payload.is_null() {
            return Ok(None);
        }
        Ok(Some(self.payload.clone()))
    }
}
