use std::error::Error;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use upfesto_server::config::Config;
use upfesto_server::mail::create_mailer;
use upfesto_server::revalidate::create_revalidator;
use upfesto_server::routes::create_routes;
use upfesto_server::state::AppState;
use upfesto_server::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("upfesto_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let mailer = create_mailer(&config.mail)?;
    let revalidator = create_revalidator(config.revalidate.as_ref());

    match config.database_url.clone() {
        Some(database_url) => {
            let store = PgStore::connect(&database_url, config.database_max_connections).await?;
            tracing::info!("Successfully connected to database");
            store.run_migrations().await?;
            serve(AppState::new(store, mailer, revalidator, config)).await
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, data is kept in memory only");
            serve(AppState::new(MemoryStore::new(), mailer, revalidator, config)).await
        }
    }
}

async fn serve<S: Store>(state: AppState<S>) -> Result<(), Box<dyn Error>> {
    let addr = state.config.bind_addr;
    let app = create_routes(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
