use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Rest,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Rest => "rest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    pub workers: usize,
    pub rpc_timeout_ms: u64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            rpc_timeout_ms: 10_000,
        }
    }
}

impl ReconcileSettings {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    pub rent_fn: String,
    pub return_fn: String,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            rent_fn: "admin_rent_copy".to_string(),
            return_fn: "admin_return_copy".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    pub bot_name: String,
    pub avatar_url: Option<String>,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            bot_name: "Rental Watch".to_string(),
            avatar_url: None,
        }
    }
}

/// Typed view over the merged config. Absent keys take defaults; secret env
/// var names are read separately by [`crate::resolve_secrets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub reconcile: ReconcileSettings,
    pub rpc: RpcSettings,
    pub notify: NotifySettings,
}

impl Settings {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let s: Settings =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID settings")?;

        if s.reconcile.workers == 0 {
            bail!("CONFIG_INVALID reconcile.workers must be at least 1");
        }
        if s.reconcile.rpc_timeout_ms == 0 {
            bail!("CONFIG_INVALID reconcile.rpc_timeout_ms must be positive");
        }
        for (key, name) in [("rpc.rent_fn", &s.rpc.rent_fn), ("rpc.return_fn", &s.rpc.return_fn)] {
            if name.trim().is_empty() {
                bail!("CONFIG_INVALID {key} must not be empty");
            }
        }
        Ok(s)
    }
}
