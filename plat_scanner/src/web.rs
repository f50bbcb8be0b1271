//! Local JSON API over the scanner commands
//!
//! Every command is one route; responses are wrapped as
//! `{success, data?, error?}`. CORS is open so a browser front end on another
//! origin can drive it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use plat_common::{ItemCategory, SortDirection, SortField};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::error::ScannerError;
use crate::inventory::{InventoryEntry, InventoryStats};
use crate::queue::{QueueSnapshot, UploadOutcome};
use crate::scanner::{RefreshSummary, Scanner};

/// Shared application state
#[derive(Clone)]
struct AppState {
    scanner: Arc<Scanner>,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> ApiResult<T> {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
}

fn failure<T>(err: ScannerError) -> ApiResult<T> {
    let status = match &err {
        ScannerError::UnknownItem(_) | ScannerError::UnknownJob(_) => StatusCode::NOT_FOUND,
        ScannerError::UnknownCategory(_) | ScannerError::UnsupportedImage(_) => {
            StatusCode::BAD_REQUEST
        }
        ScannerError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::BAD_REQUEST,
        ScannerError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    } else {
        log::warn!("Request rejected: {}", err);
    }

    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(err.to_string()),
        }),
    )
}

fn respond<T>(result: crate::error::Result<T>) -> ApiResult<T> {
    match result {
        Ok(data) => ok(data),
        Err(e) => failure(e),
    }
}

fn parse_category(raw: &str) -> crate::error::Result<ItemCategory> {
    Ok(raw.parse::<ItemCategory>()?)
}

/// Upload request body
#[derive(Deserialize)]
struct UploadRequest {
    paths: Vec<PathBuf>,
}

/// Inventory listing query parameters
#[derive(Deserialize, Default)]
struct InventoryParams {
    category: Option<String>,
    #[serde(default)]
    sort: SortField,
    #[serde(default)]
    asc: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryView {
    items: Vec<InventoryEntry>,
    stats: InventoryStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    persistence_error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Removed {
    removed: usize,
}

/// GET /api/queue
async fn queue_handler(State(state): State<AppState>) -> ApiResult<QueueSnapshot> {
    ok(state.scanner.snapshot())
}

/// POST /api/images
async fn upload_handler(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<UploadOutcome> {
    respond(state.scanner.upload_paths(&request.paths))
}

/// POST /api/images/{id}/select
async fn select_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QueueSnapshot> {
    respond(
        state
            .scanner
            .select_active(&id)
            .map(|()| state.scanner.snapshot()),
    )
}

/// DELETE /api/images/{id}
async fn remove_image_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QueueSnapshot> {
    respond(
        state
            .scanner
            .remove_image(&id)
            .map(|()| state.scanner.snapshot()),
    )
}

/// GET /api/inventory?category={c}&sort={price|ducats|name}&asc={bool}
async fn inventory_handler(
    State(state): State<AppState>,
    Query(params): Query<InventoryParams>,
) -> ApiResult<InventoryView> {
    let category = match params.category.as_deref().map(parse_category).transpose() {
        Ok(category) => category,
        Err(e) => return failure(e),
    };
    let direction = if params.asc {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };

    ok(InventoryView {
        items: state
            .scanner
            .inventory_view(category, params.sort, direction),
        stats: state.scanner.stats(),
        persistence_error: state.scanner.persistence_error(),
    })
}

/// DELETE /api/inventory/items/{name}
async fn remove_item_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<InventoryStats> {
    respond(
        state
            .scanner
            .remove_inventory_item(&name)
            .map(|()| state.scanner.stats()),
    )
}

/// POST /api/inventory/items/{name}/refresh
async fn refresh_item_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<InventoryEntry> {
    respond(state.scanner.refresh_item(&name).await)
}

/// POST /api/inventory/categories/{category}/refresh
async fn refresh_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<RefreshSummary> {
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(e) => return failure(e),
    };
    respond(state.scanner.refresh_category(category).await)
}

/// DELETE /api/inventory/categories/{category}
async fn clear_category_handler(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Removed> {
    respond(parse_category(&category).map(|category| Removed {
        removed: state.scanner.clear_category(Some(category)),
    }))
}

/// Build the API router
pub fn create_router(scanner: Arc<Scanner>) -> Router {
    let state = AppState { scanner };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/queue", get(queue_handler))
        .route("/api/images", post(upload_handler))
        .route("/api/images/{id}/select", post(select_handler))
        .route("/api/images/{id}", delete(remove_image_handler))
        .route("/api/inventory", get(inventory_handler))
        .route("/api/inventory/items/{name}", delete(remove_item_handler))
        .route(
            "/api/inventory/items/{name}/refresh",
            post(refresh_item_handler),
        )
        .route(
            "/api/inventory/categories/{category}/refresh",
            post(refresh_category_handler),
        )
        .route(
            "/api/inventory/categories/{category}",
            delete(clear_category_handler),
        )
        .layer(cors)
        .with_state(state)
}

/// Start the API server
///
/// Binds to 127.0.0.1; the API can read arbitrary image paths on this machine.
pub async fn serve(scanner: Arc<Scanner>, port: u16) -> crate::error::Result<()> {
    let app = create_router(scanner);
    let addr = format!("127.0.0.1:{}", port);

    log::info!("JSON API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("JSON API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
