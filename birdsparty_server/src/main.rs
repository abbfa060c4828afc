use std::sync::Arc;

use birdsparty_core::{Engine, EngineConfig, SeedDeriver, TriggerPolicy};
use clap::Parser;
use tracing::{info, warn};

mod routes;
mod upstream;

use routes::{router, AppState};
use upstream::{http_client, HttpOutcomes, HttpSettings};

const DEV_SEED_SECRET: &str = "dev-seed-secret";

#[derive(Parser, Debug)]
#[command(name = "birdsparty-server", about = "Birds Party rules engine over HTTP")]
struct Config {
    #[arg(long, env = "BIND", default_value = "127.0.0.1:8080")]
    bind: String,
    /// Base URL of the game settings service.
    #[arg(long, env = "SETTINGS_URL", default_value = "http://127.0.0.1:8081")]
    settings_url: String,
    /// Base URL of the RNG decision service.
    #[arg(long, env = "RNG_URL", default_value = "http://127.0.0.1:8082")]
    rng_url: String,
    #[arg(long, env = "SEED_SECRET", default_value = DEV_SEED_SECRET, hide_env_values = true)]
    seed_secret: String,
    /// allow | follow-game-mode
    #[arg(long, env = "PROGRESSION_TRIGGER", default_value = "allow")]
    progression_trigger: TriggerPolicy,
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_filter: String,
    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value_t = 5000)]
    upstream_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::parse();
    tracing_subscriber::fmt()
        .with_env_filter(cfg.log_filter.as_str())
        .init();

    if cfg.seed_secret == DEV_SEED_SECRET {
        warn!("SEED_SECRET not set, using the development secret");
    }
    let seeds = SeedDeriver::new(cfg.seed_secret.clone());
    let client = http_client(cfg.upstream_timeout_ms)?;
    let engine = Engine::new(
        EngineConfig {
            progression_trigger: cfg.progression_trigger,
        },
        HttpSettings::new(client.clone(), cfg.settings_url.clone()),
        HttpOutcomes::new(client, cfg.rng_url.clone()),
    );
    info!(
        settings_url = %cfg.settings_url,
        rng_url = %cfg.rng_url,
        progression_trigger = %cfg.progression_trigger,
        seed_hash = %seeds.secret_hash_hex(),
        "engine configured"
    );

    let app = router(Arc::new(AppState { engine, seeds }));
    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    info!("listening on {}", cfg.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
