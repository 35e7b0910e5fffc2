pub mod books;

use bookshelf_kernel::{ModuleRegistry, Settings};

/// Register all project-specific modules with the registry
pub async fn register_all(registry: &mut ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    registry.register(books::create_module(&settings.database).await?);
    Ok(())
}
