use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;
mod service;

use config::Config;
use dbus_interface::AttendanceInterface;
use service::RecognitionService;
use tally_model::OnnxEmbedder;
use tally_store::{db, AttendanceLedger, IdentityStore, ToggleEngine};

const BUS_NAME: &str = "org.tally.Attendance1";
const OBJECT_PATH: &str = "/org/tally/Attendance1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("tallyd starting");

    let config = Config::from_env();

    // Fail fast: storage and model must both be available before we
    // claim the bus name.
    let conn = db::open(&config.db_path).await?;
    let identities = IdentityStore::new(conn.clone());
    let ledger = AttendanceLedger::new(conn);
    let toggles = ToggleEngine::new(ledger.clone());

    let embedder = OnnxEmbedder::load(&config.model_path())?;
    let handle = engine::spawn_embedder(embedder);

    let service = Arc::new(RecognitionService::new(
        handle,
        identities,
        ledger,
        toggles,
        config.similarity_threshold,
    ));

    let _bus = zbus::connection::Builder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, AttendanceInterface::new(service))?
        .build()
        .await?;

    tracing::info!(
        bus = BUS_NAME,
        threshold = config.similarity_threshold,
        "tallyd ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("tallyd shutting down");

    Ok(())
}
