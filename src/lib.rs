//! Bookshelf application library
//!
//! Hosts the `books` module and the bootstrap that wires modules, settings
//! and the HTTP server together.

pub mod modules;

use anyhow::Context;
use bookshelf_kernel::{InitCtx, ModuleRegistry, Settings};

/// Build a registry holding every application module.
pub async fn build_registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings)
        .await
        .context("failed to register modules")?;
    Ok(registry)
}

/// Run the service until shutdown: init and start modules, serve HTTP, then
/// stop modules in reverse order.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        addr = %settings.server.bind_addr(),
        snapshot = ?settings.database.snapshot_path,
        "bookshelf bootstrap starting"
    );

    let registry = build_registry(&settings).await?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;
    tracing::info!("bookshelf bootstrap complete");

    let served = bookshelf_http::start_server(&registry, &settings).await;

    registry.stop_all().await?;
    served
}
