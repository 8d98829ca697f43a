use meterread::api;
use meterread::{
    config::Config, db::init_db, ContentAddressedImageStore, DedupGuard, ExtractionProvider,
    GeminiExtractionProvider, ImageStore, MeasurePipeline, Repository,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; real environment wins.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    let repo = Arc::new(Repository::new(pool));

    let extractor: Arc<dyn ExtractionProvider> =
        match GeminiExtractionProvider::from_config(&config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                eprintln!("Failed to create extraction client: {}", e);
                std::process::exit(1);
            }
        };
    let images: Arc<dyn ImageStore> =
        Arc::new(ContentAddressedImageStore::new(config.image_base_url.clone()));

    let pipeline = Arc::new(MeasurePipeline::new(
        DedupGuard::new(repo.clone()),
        extractor,
        images,
    ));
    let app = api::create_router(api::AppState::new(repo, pipeline));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        %addr,
        provider = %config.gemini_api_url,
        timeout_ms = config.extraction_timeout.as_millis() as u64,
        "Server listening"
    );

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
