/// schemaforge API - HTTP front for the project generator
///
/// Accepts a schema definition as JSON and either streams back the generated
/// project archive or a validation report. Generation and archiving run on
/// the blocking pool; the archive is streamed in chunks from its temporary file.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream;
use serde::Serialize;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

use schemaforge::{
    archive_file_name, ArchiveStream, Archiver, ErrorReport, GenerationError, GenerationWarning,
    Generator, GeneratorConfig, RelationKind, SchemaDefinition, StoredSchema,
};

const CHUNK_SIZE: usize = 64 * 1024;

struct AppState {
    generator: Generator,
    archiver: Archiver,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = GeneratorConfig::resolve(None, None)?;
    let overlay = config.load_overlay()?;
    let archiver = Archiver::from_config(&config);
    let generator = Generator::new(config)
        .map_err(|e| format!("Failed to compile templates: {}", e))?
        .with_overlay(overlay);

    let state = Arc::new(AppState { generator, archiver });

    let app = Router::new()
        .route("/generate", post(generate_project))
        .route("/generate/stored", post(generate_stored))
        .route("/validate", post(validate_schema))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("Invalid PORT: {}", e))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("schemaforge API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

/// Generate a project and stream it back as an archive
async fn generate_project(
    State(state): State<Arc<AppState>>,
    Json(schema): Json<SchemaDefinition>,
) -> Result<Response, AppError> {
    let archive = tokio::task::spawn_blocking(move || build_archive(&state, &schema))
        .await
        .map_err(|e| AppError::Internal(format!("generation task failed: {}", e)))??;

    Ok(archive_response(archive))
}

/// Generate a project from a record in the persistence layer's format
async fn generate_stored(
    State(state): State<Arc<AppState>>,
    Json(stored): Json<StoredSchema>,
) -> Result<Response, AppError> {
    let schema = stored.into_definition().map_err(AppError::Generation)?;
    let archive = tokio::task::spawn_blocking(move || build_archive(&state, &schema))
        .await
        .map_err(|e| AppError::Internal(format!("generation task failed: {}", e)))??;

    Ok(archive_response(archive))
}

fn build_archive(state: &AppState, schema: &SchemaDefinition) -> Result<ArchiveStream, AppError> {
    let generated = state.generator.generate(schema).map_err(AppError::Generation)?;
    let name = archive_file_name(&schema.name).map_err(AppError::Generation)?;

    state
        .archiver
        .archive(&generated.tree, &name)
        .map_err(|e| AppError::Archive(e.report()))
}

/// Stream an archive in fixed-size chunks read on the blocking pool
fn archive_response(mut archive: ArchiveStream) -> Response {
    let file_name = archive.file_name().to_string();
    let media_type = archive.media_type();
    let len = archive.len();

    let (tx, rx) = mpsc::channel::<std::io::Result<Vec<u8>>>(4);
    tokio::task::spawn_blocking(move || loop {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        match archive.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                chunk.truncate(n);
                if tx.blocking_send(Ok(chunk)).is_err() {
                    // Client went away; dropping the archive removes the temp file
                    break;
                }
            }
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    });

    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, media_type.to_string()),
            (header::CONTENT_LENGTH, len.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Serialize)]
struct RelationshipSummary {
    source: String,
    target: String,
    foreign_key: String,
    accessor: String,
}

#[derive(Debug, Serialize)]
struct ValidationResponse {
    valid: bool,
    files: usize,
    relationships: Vec<RelationshipSummary>,
    migration_order: Vec<String>,
    warnings: Vec<GenerationWarning>,
}

/// Validate a schema and report what would be generated
async fn validate_schema(
    State(state): State<Arc<AppState>>,
    Json(schema): Json<SchemaDefinition>,
) -> Result<Json<ValidationResponse>, AppError> {
    let generated = tokio::task::spawn_blocking(move || state.generator.generate(&schema))
        .await
        .map_err(|e| AppError::Internal(format!("validation task failed: {}", e)))?
        .map_err(AppError::Generation)?;

    let relationships = generated
        .relationships
        .edges()
        .iter()
        .filter(|edge| edge.kind == RelationKind::BelongsTo)
        .map(|edge| RelationshipSummary {
            source: edge.source_entity.clone(),
            target: edge.target_entity.clone(),
            foreign_key: edge.foreign_key_column.clone(),
            accessor: edge.accessor.clone(),
        })
        .collect();

    Ok(Json(ValidationResponse {
        valid: true,
        files: generated.tree.len(),
        relationships,
        migration_order: generated.migration_order,
        warnings: generated.warnings,
    }))
}

/// Health check endpoint (liveness)
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "schemaforge-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// Error handling

#[derive(Debug)]
enum AppError {
    Generation(GenerationError),
    Archive(ErrorReport),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Generation(e) => {
                tracing::info!(kind = e.kind(), "rejected schema: {}", e);
                (StatusCode::UNPROCESSABLE_ENTITY, Json(e.report())).into_response()
            }
            AppError::Archive(report) => {
                tracing::error!("{}", report.message);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(report)).into_response()
            }
            AppError::Internal(message) => {
                tracing::error!("{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}
