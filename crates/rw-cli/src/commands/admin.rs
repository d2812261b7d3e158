//! `rentwatch admin`: manual calls to the store's transition procedures.
//!
//! Both commands write to the live store, so they refuse to run without
//! `--yes`. The check happens before any config or network access.

use anyhow::{bail, Result};
use rw_schemas::GameId;
use tracing::info;
use uuid::Uuid;

use super::{open_store, Runtime};

fn require_yes(yes: bool, what: &str, rerun: &str) -> Result<()> {
    if !yes {
        bail!("REFUSING {what}: this writes to the live store. Re-run with: `{rerun} --yes`");
    }
    Ok(())
}

pub async fn run_return(config_paths: &[String], game_id: GameId, yes: bool) -> Result<()> {
    require_yes(
        yes,
        "ADMIN RETURN",
        &format!("rentwatch admin return --game-id {game_id}"),
    )?;

    let rt = Runtime::load(config_paths)?;
    let store = open_store(&rt).await?;

    info!(game_id, procedure = %rt.settings.rpc.return_fn, "admin force return");
    store.rpc.return_copy(game_id).await?;
    println!("returned=true game_id={game_id}");
    Ok(())
}

pub async fn run_rent(
    config_paths: &[String],
    game_id: GameId,
    renter_name: &str,
    user_id: Option<Uuid>,
    yes: bool,
) -> Result<()> {
    let renter_name = renter_name.trim();
    if renter_name.is_empty() {
        bail!("--renter-name must not be empty");
    }
    require_yes(
        yes,
        "ADMIN RENT",
        &format!("rentwatch admin rent --game-id {game_id} --renter-name \"{renter_name}\""),
    )?;

    let rt = Runtime::load(config_paths)?;
    let store = open_store(&rt).await?;

    info!(game_id, procedure = %rt.settings.rpc.rent_fn, "admin rent");
    let rental_id = store.rpc.rent_copy(game_id, renter_name, user_id).await?;
    match rental_id {
        Some(id) => println!("rented=true game_id={game_id} rental_id={id}"),
        None => println!("rented=true game_id={game_id}"),
    }
    Ok(())
}
