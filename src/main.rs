//! Restaurant map + chat assistant server

use osm_restaurant_chat::api;
use osm_restaurant_chat::infrastructure::database::DatabaseConnection;
use osm_restaurant_chat::infrastructure::settings::{Settings, StoreBackend};
use osm_restaurant_chat::service_provider;

use anyhow::Context;
use di::ServiceProvider;
use log::info;
use tokio::runtime::{Builder, Runtime};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(web_server_task(settings))
}

async fn web_server_task(settings: Settings) -> anyhow::Result<()> {
    let store = settings.store;
    let bind_address = settings.bind_address.clone();
    info!(
        "restaurant store: {:?}, chat model: {}",
        store, settings.openai_model
    );

    let provider = service_provider(settings)?;

    if store == StoreBackend::Sqlite {
        run_migrations(&provider).await?;
    }

    let app = api::app(provider);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}

async fn run_migrations(provider: &ServiceProvider) -> anyhow::Result<()> {
    let connection = provider.get_required::<DatabaseConnection>();
    sqlx::migrate!()
        .run(&**connection)
        .await
        .context("failed to run migrations")?;
    info!("database migrations applied");
    Ok(())
}
