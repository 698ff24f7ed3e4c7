//! VigiTVA web server
//!
//! Run with: cargo run -p vigitva-web

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigitva_config::Config;
use vigitva_db::{seed_demo_data, Database};
use vigitva_llm::{LlmBackend, OpenAiCompatibleBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting VigiTVA web server...");
    let config = Config::load()?;

    let db = Arc::new(Database::open(&config.storage.data_dir).await?);
    if config.storage.seed_demo_data {
        let report = seed_demo_data(db.clone(), &mut StdRng::from_entropy()).await?;
        info!(?report, "Demo data checked");
    }

    let llm = OpenAiCompatibleBackend::from_config(&config.llm)?
        .map(|b| Arc::new(b) as Arc<dyn LlmBackend>);
    if llm.is_some() {
        info!(model = %config.llm.model, "DeepSeek analysis enabled");
    } else {
        info!("Running in demonstration mode");
    }

    let addr = config.server.bind_addr();
    let state = vigitva_web::state::AppState::new(db, config, llm);
    let app = vigitva_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
