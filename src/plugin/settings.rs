//! Plugin settings, persisted by the host as an opaque MessagePack blob.

use serde::{Deserialize, Serialize};

use crate::workspace::ViewKind;

/// Settings encode/decode error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to encode settings: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode settings: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// How duplicate opens are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Wrap the host's open path and redirect before anything loads.
    #[default]
    Intercept,
    /// Watch notifications and move focus back after the fact.
    Observe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Mode,
    /// Kind of view tracked, and created for documents not yet open.
    pub view_kind: ViewKind,
    /// Scan the live views on activation instead of starting cold.
    pub warm_up: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            view_kind: ViewKind::default(),
            warm_up: true,
        }
    }
}

impl Settings {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SettingsError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettingsError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
