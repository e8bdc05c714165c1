// main.rs - Screenshot compression service

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use screenshot_squeeze::{
    prepare_screenshot_async, CompressionConfig, CompressionResult, Compressor, ImageContentBlock,
    Logger, OutputFormat,
};

/// Application state shared across requests
#[derive(Clone)]
struct AppState {
    compressor: Compressor,
    compress_semaphore: Arc<Semaphore>,
    logger: Logger,
}

/// Server configuration
#[derive(Clone, Debug)]
struct ServerConfig {
    port: u16,
    max_body_bytes: usize,
    max_concurrent: usize,
}

impl ServerConfig {
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        ServerConfig {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            max_body_bytes: lookup("MAX_BODY_MB")
                .and_then(|v| v.parse::<usize>().ok())
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(defaults.max_body_bytes),
            max_concurrent: lookup("MAX_CONCURRENT_COMPRESSIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 3000,
            max_body_bytes: 25 * 1024 * 1024,
            max_concurrent: 4,
        }
    }
}

/// Request body for the compression endpoint
#[derive(Debug, Deserialize)]
struct CompressRequest {
    image: String,
}

/// Result metadata without the payload, which is already in `content`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompressionStats {
    size_bytes: usize,
    #[serde(rename = "sizeKB")]
    size_kb: f64,
    #[serde(rename = "sizeMB")]
    size_mb: f64,
    quality: u8,
    format: OutputFormat,
    iterations: u32,
    width: u32,
    height: u32,
}

impl From<&CompressionResult> for CompressionStats {
    fn from(result: &CompressionResult) -> Self {
        CompressionStats {
            size_bytes: result.size_bytes,
            size_kb: result.size_kb,
            size_mb: result.size_mb,
            quality: result.quality,
            format: result.format,
            iterations: result.iterations,
            width: result.width,
            height: result.height,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompressResponse {
    content: ImageContentBlock,
    compressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<CompressionStats>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create an error response
fn create_error_response(status_code: StatusCode, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_code,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Health check handler
async fn health_check() -> &'static str {
    "screenshot-squeeze"
}

/// Compress a screenshot into a tool-result image block. Compression
/// failures degrade to the original frame, so this only fails on bad requests.
async fn compress_handler(
    State(state): State<AppState>,
    Json(request): Json<CompressRequest>,
) -> Result<Json<CompressResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.image.trim().is_empty() {
        return Err(create_error_response(StatusCode::BAD_REQUEST, "Missing image payload"));
    }

    let _permit = state.compress_semaphore.acquire().await.map_err(|_| {
        state.logger.error("Semaphore closed", &serde_json::json!({}));
        create_error_response(StatusCode::SERVICE_UNAVAILABLE, "Server shutting down")
    })?;

    let prepared = prepare_screenshot_async(&state.compressor, request.image).await;

    Ok(Json(CompressResponse {
        compressed: prepared.compressed(),
        stats: prepared.compression.as_ref().map(CompressionStats::from),
        content: prepared.block,
    }))
}

/// Create the application router
fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/screenshot/compress", post(compress_handler))
        .route("/health", get(health_check))
        .route("/health/", get(health_check))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

fn pipeline_summary(config: &CompressionConfig) -> String {
    if !config.enabled() {
        return "disabled (pass-through)".to_string();
    }
    let dims = match (config.max_width(), config.max_height()) {
        (None, None) => "native".to_string(),
        (w, h) => format!(
            "{}x{}",
            w.map(|w| w.to_string()).unwrap_or_else(|| "*".to_string()),
            h.map(|h| h.to_string()).unwrap_or_else(|| "*".to_string())
        ),
    };
    format!(
        "{} <= {} KB, q {}..{}, {} iters, max {}",
        config.format(),
        config.target_size_kb(),
        config.min_quality(),
        config.initial_quality(),
        config.max_iterations(),
        dims
    )
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let log_enabled = std::env::var("LOG_ENABLED").unwrap_or_else(|_| "true".to_string()) != "false";
    Logger::init(&log_level, log_enabled);

    let logger = Logger::new(log_enabled);

    // Configuration is validated once here, never per request
    let compression_config = Arc::new(CompressionConfig::from_env()?);
    let config = ServerConfig::from_lookup(|key| std::env::var(key).ok());

    let state = AppState {
        compressor: Compressor::new(Arc::clone(&compression_config)).with_logger(logger.clone()),
        compress_semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        logger: logger.clone(),
    };

    let app = create_router(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let address = format!("0.0.0.0:{}", config.port);

    logger.log_startup(
        env!("CARGO_PKG_VERSION"),
        &address,
        &pipeline_summary(&compression_config),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
