use anyhow::Context;
use folio_app::modules;
use folio_kernel::settings::Settings;
use folio_kernel::{InitCtx, ModuleRegistry};
use folio_store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load Folio settings")?;
    folio_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "folio bootstrap starting"
    );

    let store = Store::open(&settings.database.path)
        .await
        .with_context(|| format!("failed to open document store at '{}'", settings.database.path))?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);

    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };
    registry.init_modules(&ctx).await?;

    for (module, collection) in registry.collect_collections() {
        store.ensure_collection(collection).await.with_context(|| {
            format!("failed to prepare collection '{collection}' for module '{module}'")
        })?;
    }

    registry.start_modules(&ctx).await?;

    tracing::info!("folio bootstrap complete");

    folio_http::start_server(&registry, &settings, store.clone()).await?;

    registry.stop_modules().await?;

    Ok(())
}
