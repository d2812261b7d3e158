//! `rentwatch reconcile`

use std::process::ExitCode;

use anyhow::{Context, Result};
use rw_repair::{render, run_pass, PassOptions, PassReport, RepairOptions};
use rw_schemas::Scope;
use tracing::info;

use super::{notify, open_store, OutputFormat, Runtime, EXIT_ATTENTION};

pub struct ReconcileArgs {
    pub dry_run: bool,
    pub scope: Scope,
    pub format: OutputFormat,
    pub notify: bool,
}

fn pass_options(rt: &Runtime, args: &ReconcileArgs) -> PassOptions {
    PassOptions {
        scope: args.scope,
        dry_run: args.dry_run,
        repair: RepairOptions {
            workers: rt.settings.reconcile.workers,
            rpc_timeout: rt.settings.reconcile.rpc_timeout(),
        },
    }
}

fn render_report(report: &PassReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render::to_text(report)),
        OutputFormat::Json => render::to_json(report).context("report serialize failed"),
    }
}

fn exit_code_for(report: &PassReport) -> ExitCode {
    if report.needs_attention() {
        ExitCode::from(EXIT_ATTENTION)
    } else {
        ExitCode::SUCCESS
    }
}

pub async fn run_reconcile(config_paths: &[String], args: ReconcileArgs) -> Result<ExitCode> {
    let rt = Runtime::load(config_paths)?;
    let store = open_store(&rt).await?;
    let opts = pass_options(&rt, &args);

    info!(
        backend = rt.settings.store.backend.as_str(),
        scope = args.scope.as_str(),
        dry_run = args.dry_run,
        workers = opts.repair.workers,
        "reconcile starting"
    );

    let mut report = run_pass(store.reader.as_ref(), store.rpc.as_ref(), &opts)
        .await
        .context("reconciliation pass aborted")?;
    report.config_hash = Some(rt.loaded.config_hash.clone());

    println!("{}", render_report(&report, args.format)?);

    if args.notify {
        match rw_notify::pass_alert(&rt.bot_identity(), &report) {
            Some(payload) => {
                notify(rt.secrets.discord.alerts.as_deref(), "pass_alert", &payload).await
            }
            None => info!("nothing to notify"),
        }
    }

    Ok(exit_code_for(&report))
}
