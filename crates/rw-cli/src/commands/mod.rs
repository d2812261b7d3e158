//! Command handlers for the `rentwatch` binary.
//!
//! Shared plumbing lives here: config loading, backend selection and the
//! Discord identity. Command-specific logic lives in the submodules.

pub mod admin;
pub mod db;
pub mod overdue;
pub mod reconcile;

use std::path::Path;

use anyhow::{Context, Result};
use rw_config::{
    report_unused_keys, resolve_secrets, LoadedConfig, ResolvedSecrets, Settings, StoreBackend,
    UnusedKeyPolicy,
};
use rw_repair::{StateReader, TransitionRpc};
use rw_schemas::Scope;
use tracing::{info, warn};

/// Exit code for fatal errors (store unavailable, schema mismatch, bad config).
pub const EXIT_FATAL: u8 = 1;
/// Exit code for a completed pass that left unresolved or failed items.
pub const EXIT_ATTENTION: u8 = 2;

pub const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn parse_scope(s: &str) -> std::result::Result<Scope, String> {
    Scope::parse(s).map_err(|_| format!("invalid scope '{s}'. expected one of: all | reserved-only"))
}

/// Explicit `--config` paths win; otherwise the default file if it exists.
pub fn config_paths(explicit: Vec<String>) -> Vec<String> {
    if !explicit.is_empty() {
        return explicit;
    }
    if Path::new(DEFAULT_CONFIG_PATH).is_file() {
        return vec![DEFAULT_CONFIG_PATH.to_string()];
    }
    Vec::new()
}

/// Load the layered config and warn about leaves no code reads.
pub fn load_config(paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = rw_config::load_layered_yaml(&path_refs)?;

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(
            unused_leaf_keys = report.unused_leaf_pointers.len(),
            "CONFIG_UNUSED_KEYS"
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            warn!(unused = %p, "unused config key");
        }
    }

    info!(
        config_hash = %loaded.config_hash,
        layers = paths.len(),
        "config loaded"
    );
    Ok(loaded)
}

/// Everything a store-facing command needs, resolved once.
pub struct Runtime {
    pub loaded: LoadedConfig,
    pub settings: Settings,
    pub secrets: ResolvedSecrets,
}

impl Runtime {
    pub fn load(paths: &[String]) -> Result<Self> {
        let loaded = load_config(paths)?;
        let settings = loaded.settings()?;
        let secrets = resolve_secrets(&loaded.config_json, settings.store.backend)?;
        Ok(Self {
            loaded,
            settings,
            secrets,
        })
    }

    pub fn bot_identity(&self) -> rw_notify::BotIdentity {
        rw_notify::BotIdentity {
            username: self.settings.notify.bot_name.clone(),
            avatar_url: self.settings.notify.avatar_url.clone(),
        }
    }
}

/// Reader and procedure client for the configured backend.
pub struct Store {
    pub reader: Box<dyn StateReader>,
    pub rpc: Box<dyn TransitionRpc>,
}

pub async fn open_store(rt: &Runtime) -> Result<Store> {
    let rpc_cfg = &rt.settings.rpc;
    match rt.settings.store.backend {
        StoreBackend::Postgres => {
            let url = rt
                .secrets
                .database_url
                .as_deref()
                .context("database url not resolved")?;
            let pool = rw_db::connect(url).await?;
            let rpc = rw_db::PgTransitions::new(pool.clone(), &rpc_cfg.rent_fn, &rpc_cfg.return_fn)?;
            Ok(Store {
                reader: Box::new(rw_db::PgStateReader::new(pool)),
                rpc: Box::new(rpc),
            })
        }
        StoreBackend::Rest => {
            let url = rt
                .secrets
                .rest_url
                .as_deref()
                .context("rest url not resolved")?;
            let key = rt
                .secrets
                .rest_api_key
                .clone()
                .context("rest api key not resolved")?;
            let store = rw_rest::PostgrestStore::new(url, key)
                .with_procedures(&rpc_cfg.rent_fn, &rpc_cfg.return_fn);
            Ok(Store {
                reader: Box::new(store.clone()),
                rpc: Box::new(store),
            })
        }
    }
}

/// Post `payload` to `webhook`. Delivery failures are logged, never fatal.
pub async fn notify(webhook: Option<&str>, what: &str, payload: &rw_notify::WebhookPayload) {
    let Some(url) = webhook else {
        warn!(what, "--notify given but no webhook configured; skipping");
        return;
    };
    if let Err(e) = rw_notify::DiscordNotifier::new(url.to_string())
        .send(payload)
        .await
    {
        warn!(what, error = %e, "notification failed");
    }
}
