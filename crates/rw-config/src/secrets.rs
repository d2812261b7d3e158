//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (e.g. `"RW_SUPABASE_KEY"`). Callers
//! invoke [`resolve_secrets`] once at startup and pass the result into
//! constructors. `Debug` output redacts every value and errors name the env
//! var, never its content.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::StoreBackend;

pub const DEFAULT_DATABASE_URL_ENV: &str = "RW_DATABASE_URL";
pub const DEFAULT_REST_URL_ENV: &str = "RW_SUPABASE_URL";
pub const DEFAULT_REST_API_KEY_ENV: &str = "RW_SUPABASE_KEY";

/// Discord webhook URLs resolved from the environment. Both optional.
#[derive(Clone, Default)]
pub struct ResolvedDiscordWebhooks {
    /// Reconciliation passes that need attention.
    pub alerts: Option<String>,
    /// Overdue / expired DIBS briefing.
    pub briefing: Option<String>,
}

impl std::fmt::Debug for ResolvedDiscordWebhooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Webhook URLs carry auth in the URL itself.
        f.debug_struct("ResolvedDiscordWebhooks")
            .field("alerts", &self.alerts.as_ref().map(|_| "<REDACTED>"))
            .field("briefing", &self.briefing.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub database_url: Option<String>,
    pub rest_url: Option<String>,
    pub rest_api_key: Option<String>,
    pub discord: ResolvedDiscordWebhooks,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &self.database_url.as_ref().map(|_| "<REDACTED>"))
            .field("rest_url", &self.rest_url.as_ref().map(|_| "<REDACTED>"))
            .field("rest_api_key", &self.rest_api_key.as_ref().map(|_| "<REDACTED>"))
            .field("discord", &self.discord)
            .finish()
    }
}

struct SecretEnvNames {
    database_url_var: String,
    rest_url_var: String,
    rest_api_key_var: String,
    discord_alerts_var: Option<String>,
    discord_briefing_var: Option<String>,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        database_url_var: read_str_at(config_json, "/store/database_url_env")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string()),
        rest_url_var: read_str_at(config_json, "/store/rest/url_env")
            .unwrap_or_else(|| DEFAULT_REST_URL_ENV.to_string()),
        rest_api_key_var: read_str_at(config_json, "/store/rest/api_key_env")
            .unwrap_or_else(|| DEFAULT_REST_API_KEY_ENV.to_string()),
        discord_alerts_var: read_str_at(config_json, "/notify/discord/alerts_env"),
        discord_briefing_var: read_str_at(config_json, "/notify/discord/briefing_env"),
    }
}

/// Resolve secrets for `backend`.
///
/// | Backend  | Required                     |
/// |----------|------------------------------|
/// | postgres | database URL                 |
/// | rest     | REST base URL + REST API key |
///
/// Discord webhooks are always optional.
pub fn resolve_secrets(config_json: &Value, backend: StoreBackend) -> Result<ResolvedSecrets> {
    let names = parse_env_names(config_json);

    let database_url = resolve_env(&names.database_url_var);
    let rest_url = resolve_env(&names.rest_url_var);
    let rest_api_key = resolve_env(&names.rest_api_key_var);

    let required: Vec<(&Option<String>, &str, &str)> = match backend {
        StoreBackend::Postgres => vec![(&database_url, names.database_url_var.as_str(), "database url")],
        StoreBackend::Rest => vec![
            (&rest_url, names.rest_url_var.as_str(), "rest url"),
            (&rest_api_key, names.rest_api_key_var.as_str(), "rest api key"),
        ],
    };
    for (value, var, what) in required {
        if value.is_none() {
            bail!(
                "SECRETS_MISSING backend={}: required env var '{}' ({}) is not set or empty",
                backend.as_str(),
                var,
                what,
            );
        }
    }

    let discord = ResolvedDiscordWebhooks {
        alerts: names.discord_alerts_var.as_deref().and_then(resolve_env),
        briefing: names.discord_briefing_var.as_deref().and_then(resolve_env),
    };

    Ok(ResolvedSecrets {
        database_url,
        rest_url,
        rest_api_key,
        discord,
    })
}
