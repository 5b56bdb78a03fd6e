use std::process::ExitCode;

use relay_core::{
    config::Config,
    pacing::FixedPacing,
    relay::{PassOutcome, RelayEngine},
    watermark::{EmptyReason, JsonFileStore, LoadOutcome, WatermarkStore},
};
use relay_discord::{DiscordClient, DiscordConfig};

/// One fetch/relay/persist pass, then exit. Meant to be run by a scheduler.
///
/// Exit status is 1 only for configuration errors. Runtime failures are
/// logged and the process still exits 0.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = relay_core::logging::init("relay") {
        eprintln!("failed to init logging: {e}");
    }

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(1);
        }
    };

    match run(&cfg).await {
        Ok(outcome) => {
            tracing::info!(
                routes = outcome.routes.len(),
                relayed = outcome.dispatched(),
                saves = outcome.saves,
                elapsed_ms = (outcome.finished_at - outcome.started_at).num_milliseconds(),
                "pass complete"
            );
        }
        Err(e) => tracing::error!("relay error: {e}"),
    }

    tracing::info!("done (no gateway connection used)");
    ExitCode::SUCCESS
}

async fn run(cfg: &Config) -> relay_core::Result<PassOutcome> {
    let store = JsonFileStore::new(cfg.state_file.clone());
    let watermarks = match store.load()? {
        LoadOutcome::Loaded(w) => {
            tracing::info!(path = %store.path().display(), sources = w.len(), "state loaded");
            w
        }
        LoadOutcome::Empty(EmptyReason::Missing) => {
            tracing::info!(path = %store.path().display(), "no state file, starting fresh");
            Default::default()
        }
        LoadOutcome::Empty(EmptyReason::Corrupt(why)) => {
            tracing::warn!(
                path = %store.path().display(),
                "state file unreadable, starting fresh: {why}"
            );
            Default::default()
        }
    };

    let discord = DiscordClient::new(DiscordConfig::from_config(cfg))?;
    let pacing = FixedPacing(cfg.pacing_interval);
    let engine = RelayEngine::new(&discord, &discord, &pacing)
        .with_fetch_limit(cfg.fetch_limit)
        .with_dry_run(cfg.dry_run);

    engine
        .run_pass(&cfg.routes, watermarks, &store, cfg.persist_mode)
        .await
}
