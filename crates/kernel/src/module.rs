use async_trait::async_trait;
use axum::Router;
use folio_store::Store;

/// Context provided to modules during initialization.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub store: &'a Store,
}

/// Core module trait that all Folio modules implement.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module. Routes mount under `/{name}`.
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context.
    /// Called during application startup before collections are prepared.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes. The store handle is
    /// injected here so handlers receive it as router state rather than
    /// reaching for a global.
    fn routes(&self, _store: Store) -> Router {
        Router::new()
    }

    /// Return OpenAPI specification fragment for this module as JSON.
    /// Will be merged with other modules' specs.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Document collections this module stores records in. Each is created
    /// in the store at startup if absent.
    fn collections(&self) -> &'static [&'static str] {
        &[]
    }

    /// Start background tasks for this module.
    /// Called after collections are prepared.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and clean up resources.
    /// Called during application shutdown.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
