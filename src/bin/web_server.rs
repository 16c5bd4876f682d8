//! Web server for the image steganography API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use clap::Parser;
use log::{error, info};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use uuid::Uuid;

use imgpack::codec::{CodecConfig, CodecError, FrameHeader, FrameSummary};
use imgpack::common::config::AppConfig;
use imgpack::processing::{self, Inspection};
use imgpack::utils::init_logger;

/// Command-line arguments for the web server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct EmbedResponse {
    success: bool,
    message: String,
    summary: FrameSummary,
    image_base64: String,
}

#[derive(Serialize)]
struct ExtractResponse {
    header: FrameHeader,
    payload_base64: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

struct AppState {
    codec: CodecConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load_or_default(args.config.as_deref())?;
    init_logger(&config.log, &config.app.name)?;

    info!("🚀 Initializing web server...");

    let state = Arc::new(AppState {
        codec: config.codec.clone(),
    });

    let app = Router::new()
        .route("/hello", get(hello))
        .route("/api/health", get(health_check))
        .route("/api/inspect", post(inspect_handler))
        .route("/api/embed", post(embed_handler))
        .route("/api/extract", post(extract_handler))
        .fallback_service(ServeDir::new(&config.web.static_dir))
        .layer(DefaultBodyLimit::max(config.web.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.web.address.as_str();
    info!("🌐 Web server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn hello() -> &'static str {
    "Hello, World!"
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "imgpack",
    }))
}

fn bad_request(error: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Map a processing failure to an HTTP status.
fn codec_failure(request_id: Uuid, err: anyhow::Error) -> ApiError {
    let status = match err.downcast_ref::<CodecError>() {
        Some(CodecError::NotCoded) => StatusCode::NOT_FOUND,
        Some(
            CodecError::IneligibleImage { .. }
            | CodecError::TooSmallToCode { .. }
            | CodecError::CapacityExceeded { .. }
            | CodecError::FieldOverflow { .. }
            | CodecError::NonAsciiField { .. }
            | CodecError::TruncatedFrame { .. }
            | CodecError::MalformedField { .. },
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(CodecError::Image(_)) => StatusCode::BAD_REQUEST,
        _ if err.downcast_ref::<image::ImageError>().is_some() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("❌ Request {} failed: {:#}", request_id, err);
    (
        status,
        Json(ErrorResponse {
            error: format!("{err:#}"),
        }),
    )
}

/// Upload fields understood by the API.
#[derive(Default)]
struct Upload {
    image: Option<Vec<u8>>,
    file: Option<(String, Vec<u8>)>,
    password: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Failed to read multipart data: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read image data: {}", e)))?;
                upload.image = Some(data.to_vec());
            }
            "file" => {
                let filename = field.file_name().unwrap_or("payload.bin").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read file data: {}", e)))?;
                upload.file = Some((filename, data.to_vec()));
            }
            "password" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read password: {}", e)))?;
                if !text.is_empty() {
                    upload.password = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Run CPU-bound codec work off the async runtime.
async fn run_blocking<T, F>(request_id: Uuid, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| codec_failure(request_id, anyhow::anyhow!("Codec task panicked: {}", e)))?
        .map_err(|e| codec_failure(request_id, e))
}

async fn inspect_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Inspection>, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = read_upload(multipart).await?;
    let image = upload.image.ok_or_else(|| bad_request("No image provided"))?;
    info!("📤 Request {}: inspecting {} byte image", request_id, image.len());

    let codec = state.codec.clone();
    let report = run_blocking(request_id, move || processing::inspect_bytes(&image, &codec)).await?;
    Ok(Json(report))
}

async fn embed_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<EmbedResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = read_upload(multipart).await?;
    let image = upload.image.ok_or_else(|| bad_request("No image provided"))?;
    let (filename, payload) = upload.file.ok_or_else(|| bad_request("No file provided"))?;
    let password = upload.password;

    info!(
        "📤 Request {}: embedding {} ({} bytes) into {} byte image",
        request_id,
        filename,
        payload.len(),
        image.len()
    );

    let codec = state.codec.clone();
    let name = filename.clone();
    let (png, summary) = run_blocking(request_id, move || {
        processing::embed_bytes(&image, &payload, &name, password.as_deref(), &codec)
    })
    .await?;

    info!("✅ Request {}: coded image is {} bytes", request_id, png.len());
    Ok(Json(EmbedResponse {
        success: true,
        message: format!("Successfully embedded {}", filename),
        summary,
        image_base64: general_purpose::STANDARD.encode(&png),
    }))
}

async fn extract_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = read_upload(multipart).await?;
    let image = upload.image.ok_or_else(|| bad_request("No image provided"))?;
    info!("📤 Request {}: extracting from {} byte image", request_id, image.len());

    let codec = state.codec.clone();
    let (header, payload) =
        run_blocking(request_id, move || processing::extract_bytes(&image, &codec)).await?;

    info!("✅ Request {}: extracted {} bytes", request_id, payload.len());
    Ok(Json(ExtractResponse {
        header,
        payload_base64: general_purpose::STANDARD.encode(&payload),
    }))
}
