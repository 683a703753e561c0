use std::sync::Arc;

use axum::{Json, Router, http::HeaderValue, http::Method, response::IntoResponse, routing::get};
use research_hub::{AxumIntegration, DatabaseAdapter, HubBuilder, HubConfig};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using a development-only secret");
        "research-hub-development-secret-change-me".to_string()
    });

    let config = HubConfig::new(secret)
        .base_url(format!("http://localhost:{}", port))
        .frontend_url(&frontend_url)
        .upload_dir(&upload_dir);

    #[cfg(feature = "sqlx-postgres")]
    let db = {
        let adapter = research_hub::adapters::SqlxAdapter::new(&database_url()).await?;
        adapter.migrate().await?;
        tracing::info!("connected to PostgreSQL");
        adapter
    };

    #[cfg(not(feature = "sqlx-postgres"))]
    let db = {
        if std::env::var("DATABASE_URL").is_ok() {
            tracing::warn!("DATABASE_URL ignored: built without the sqlx-postgres feature");
        }
        tracing::info!("using the in-memory database; data is lost on restart");
        research_hub::adapters::MemoryDatabaseAdapter::new()
    };

    serve(config, db, &port).await
}

/// `DATABASE_URL`, or a URL assembled from the `DB_*` variables.
#[cfg(feature = "sqlx-postgres")]
fn database_url() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return url;
    }
    let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.into());
    format!(
        "postgres://{}:{}@{}:{}/{}",
        var("DB_USER", "postgres"),
        var("DB_PASSWORD", "postgres"),
        var("DB_HOST", "localhost"),
        var("DB_PORT", "5432"),
        var("DB_NAME", "research_hub"),
    )
}

async fn serve<DB: DatabaseAdapter>(config: HubConfig, db: DB, port: &str) -> Result<(), BoxError> {
    let base_path = config.base_path.clone();
    let upload_dir = config.uploads.upload_dir.clone();
    let frontend_url = config.frontend_url.clone();

    let hub = Arc::new(
        HubBuilder::new(config)
            .database(db)
            .default_plugins()
            .build()
            .await?,
    );
    tracing::info!(plugins = ?hub.plugin_names(), "research hub ready");

    // The hub answers CORS for the API itself; static files need their own.
    let uploads_cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(frontend_url.parse::<HeaderValue>()?))
        .allow_methods([Method::GET]);
    let uploads = Router::new()
        .nest_service("/uploads", ServeDir::new(&upload_dir))
        .layer(uploads_cors);

    let app = Router::new()
        .route("/test", get(test_route))
        .nest(&base_path, hub.clone().axum_router())
        .merge(uploads)
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, %base_path, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn test_route() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Research Collaboration Platform API is running"
    }))
}
