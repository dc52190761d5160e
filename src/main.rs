//! Shortening service binary.
//!
//! Serves `POST /shorten`, `GET /{code}`, `GET /count/{code}` and
//! `GET /valid/{code}` from an in-memory store.

use anyhow::Result;
use shorturl_operator::config;
use shorturl_operator::server;
use shorturl_operator::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_from_env()?;

    init_tracing(&config.log_level, &config.log_format)?;
    config.print_summary();

    server::run(config).await
}
