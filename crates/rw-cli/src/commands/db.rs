//! `rentwatch db status`

use std::process::ExitCode;

use anyhow::{Context, Result};
use rw_config::{resolve_secrets, StoreBackend};

use super::{load_config, EXIT_FATAL};

/// Always probes Postgres directly, whatever `store.backend` says.
pub async fn run_status(config_paths: &[String]) -> Result<ExitCode> {
    let loaded = load_config(config_paths)?;
    let secrets = resolve_secrets(&loaded.config_json, StoreBackend::Postgres)?;
    let url = secrets
        .database_url
        .as_deref()
        .context("database url not resolved")?;

    let pool = rw_db::connect(url).await?;
    let s = rw_db::status(&pool).await?;

    println!(
        "db_ok={} has_game_copies={} has_rentals={}",
        s.ok, s.has_game_copies, s.has_rentals
    );
    for m in &s.missing_columns {
        println!("missing_column={m}");
    }
    println!("schema_ready={}", s.is_ready());

    if s.is_ready() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FATAL))
    }
}
