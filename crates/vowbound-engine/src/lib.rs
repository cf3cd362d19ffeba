//! Vowbound engine.
//!
//! Wires configuration, tracing, the event store and the optimistic
//! [`controller::GameController`] together.

use std::sync::Arc;

use vowbound_core::clock::SystemClock;
use vowbound_core::rng::SystemRng;

pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod store;
pub mod sync;
pub mod telemetry;

use config::EngineConfig;
use controller::GameController;
use error::EngineError;

/// Installs tracing, opens the configured store and returns a controller
/// running on the system clock and an OS-seeded RNG.
///
/// # Errors
///
/// Returns `EngineError::Telemetry` if tracing is already installed, or the
/// errors of [`store::connect`].
pub async fn start(config: &EngineConfig) -> Result<GameController, EngineError> {
    telemetry::init(config.log_format)?;
    tracing::info!("starting Vowbound engine");
    let store = store::connect(config).await?;
    Ok(GameController::new(
        store,
        Arc::new(SystemClock),
        Box::new(SystemRng::from_os_entropy()),
        config,
    ))
}
