//! # API REST
//!
//! REST API implementation for the lab portal.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, multipart uploads, CORS)
//!
//! Uses `api-shared` for request/response types and `lab-core` for the pricing and tracking
//! rules. Handlers translate core errors into status codes and never carry business logic.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Multipart, Path as AxumPath, State},
    http::{header, StatusCode},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    CartDocumentReq, CartReq, CatalogRes, DeleteRes, EstimateReq, GuidelineRes, HealthRes,
    HealthService, ItemDocumentReq, StageRes, UploadRes,
};
use catalog::{CatalogError, Estimate};
use lab_core::{
    config::{prepare_upload_dir, resolve_catalog},
    BaseAmountQuote, CartGroupQuote, CoreConfig, OrderItem, OrderStatus, PortalError,
    PortalService, QuotationDocument,
};
use lab_files::{sniff_mime_type, FilesError, UploadStore};
use lab_types::SampleCount;

/// Application state for the REST API server
///
/// Shared by every request handler. Both members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    service: PortalService,
    uploads: Arc<UploadStore>,
}

impl AppState {
    /// Build the state from a configuration resolved at startup.
    ///
    /// Loads the guideline catalog and creates the upload directory if it is missing.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the catalog override file cannot be read or parsed,
    /// - the upload directory cannot be created, or
    /// - the upload store rejects the directory.
    pub fn from_config(cfg: Arc<CoreConfig>) -> anyhow::Result<Self> {
        let catalog = resolve_catalog(&cfg)?;
        prepare_upload_dir(cfg.upload_dir())?;
        let uploads = UploadStore::new(cfg.upload_dir(), cfg.public_base_url())?;

        Ok(Self {
            service: PortalService::new(cfg, Arc::new(catalog)),
            uploads: Arc::new(uploads),
        })
    }

    pub fn service(&self) -> &PortalService {
        &self.service
    }
}

/// Read the portal configuration from the process environment.
///
/// # Environment Variables
/// - `LAB_UPLOAD_DIR`: Upload storage directory (default: "uploads")
/// - `LAB_PUBLIC_BASE_URL`: URL prefix for stored uploads (default: "http://localhost:3000/files")
/// - `LAB_QUOTATION_PREFIX`: Prefix for issued quotation numbers (default: "QT")
/// - `LAB_CATALOG_FILE`: Optional YAML file replacing the built-in guideline catalog
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    Ok(CoreConfig::from_values(
        std::env::var("LAB_UPLOAD_DIR").ok(),
        std::env::var("LAB_PUBLIC_BASE_URL").ok(),
        std::env::var("LAB_QUOTATION_PREFIX").ok(),
        std::env::var("LAB_CATALOG_FILE").ok(),
    )?)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_catalog,
        lookup_guideline,
        estimate,
        preview_pricing,
        cart_pricing,
        order_stage,
        item_document,
        cart_document,
        upload_files,
        delete_upload,
        download_file,
    ),
    components(schemas(
        HealthRes,
        CatalogRes,
        GuidelineRes,
        EstimateReq,
        CartReq,
        StageRes,
        ItemDocumentReq,
        CartDocumentReq,
        UploadRes,
        DeleteRes,
        catalog::CatalogCategory,
        catalog::GuidelineEntry,
        catalog::Estimate,
        lab_core::OrderItem,
        lab_core::OrderStatus,
        lab_core::Customer,
        lab_core::LineItem,
        lab_core::BaseAmountQuote,
        lab_core::GrandTotalSplit,
        lab_core::PricedItem,
        lab_core::CartGroupQuote,
        lab_core::Stage,
        lab_core::Checkpoint,
        lab_core::CheckpointStatus,
        lab_core::StageView,
        lab_core::stages::StageProgress,
        lab_core::stages::CheckpointProgress,
        lab_core::ChronologyAnomaly,
        lab_core::QuotationNumber,
        lab_core::QuotationDocument,
        lab_core::DocumentProduct,
        lab_core::DocumentSummary,
        lab_core::order::StructuredTimestamp,
        lab_files::UploadedFile,
        lab_files::UploadOutcome,
        lab_types::NonEmptyText,
        lab_types::SampleCount,
    ))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/catalog", get(list_catalog))
        .route("/catalog/estimate", post(estimate))
        .route("/catalog/:category/:study", get(lookup_guideline))
        .route("/pricing/preview", post(preview_pricing))
        .route("/pricing/cart", post(cart_pricing))
        .route("/orders/stage", post(order_stage))
        .route("/quotations/document", post(item_document))
        .route("/quotations/cart-document", post(cart_document))
        .route("/uploads", post(upload_files))
        .route("/uploads/:key", delete(delete_upload))
        .route("/files/:key", get(download_file))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Map a core error to the status and message returned to the client.
fn portal_error_response(e: &PortalError) -> (StatusCode, &'static str) {
    match e {
        PortalError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "Invalid quantity"),
        PortalError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "Invalid amount"),
        PortalError::EmptyCartGroup => (StatusCode::BAD_REQUEST, "Cart group is empty"),
        PortalError::InvalidQuotationNumber(_) => {
            (StatusCode::BAD_REQUEST, "Invalid quotation number")
        }
        PortalError::InvalidInput(_) | PortalError::Deserialization(_) => {
            (StatusCode::BAD_REQUEST, "Bad request")
        }
        PortalError::Catalog(e) => catalog_error_response(e),
        PortalError::UploadDirCreation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    }
}

fn catalog_error_response(e: &CatalogError) -> (StatusCode, &'static str) {
    match e {
        CatalogError::UnknownCategory(_) => (StatusCode::NOT_FOUND, "Unknown study category"),
        CatalogError::UnknownStudy { .. } => (StatusCode::NOT_FOUND, "Unknown study"),
        CatalogError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/catalog",
    responses(
        (status = 200, description = "Study categories with their guidelines", body = CatalogRes)
    )
)]
#[axum::debug_handler]
async fn list_catalog(State(state): State<AppState>) -> Json<CatalogRes> {
    Json(CatalogRes {
        categories: state.service.catalog().categories().to_vec(),
    })
}

#[utoipa::path(
    get,
    path = "/catalog/{category}/{study}",
    params(
        ("category" = String, Path, description = "Study category name"),
        ("study" = String, Path, description = "Guideline or study name")
    ),
    responses(
        (status = 200, description = "Catalog entry", body = GuidelineRes),
        (status = 404, description = "Unknown category or study")
    )
)]
/// Look up one guideline by `(category, study)`
#[axum::debug_handler]
async fn lookup_guideline(
    State(state): State<AppState>,
    AxumPath((category, study)): AxumPath<(String, String)>,
) -> Result<Json<GuidelineRes>, (StatusCode, &'static str)> {
    match state.service.lookup_guideline(&category, &study) {
        Some(entry) => Ok(Json(GuidelineRes {
            category,
            entry: entry.clone(),
        })),
        None => {
            tracing::debug!("No catalog entry for {:?} / {:?}", category, study);
            Err((StatusCode::NOT_FOUND, "Unknown study"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/catalog/estimate",
    request_body = EstimateReq,
    responses(
        (status = 200, description = "Base amount from list prices, excluding GST", body = Estimate),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Unknown category or study")
    )
)]
/// Estimate a base amount from catalog list prices
///
/// The estimate is the sum of each selected study's price multiplied by the sample count.
#[axum::debug_handler]
async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateReq>,
) -> Result<Json<Estimate>, (StatusCode, &'static str)> {
    let samples = match SampleCount::new(req.number_of_samples) {
        Ok(samples) => samples,
        Err(e) => {
            tracing::error!("Estimate error: {:?}", e);
            return Err((StatusCode::BAD_REQUEST, "Invalid quantity"));
        }
    };

    match state
        .service
        .catalog()
        .estimate(&req.category, &req.studies, samples)
    {
        Ok(estimate) => Ok(Json(estimate)),
        Err(e) => {
            tracing::error!("Estimate error: {:?}", e);
            Err(catalog_error_response(&e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/pricing/preview",
    request_body = OrderItem,
    responses(
        (status = 200, description = "Breakdown for an amount that excludes GST", body = BaseAmountQuote),
        (status = 400, description = "Bad request")
    )
)]
/// Price a single item whose amount excludes GST
#[axum::debug_handler]
async fn preview_pricing(
    State(state): State<AppState>,
    Json(item): Json<OrderItem>,
) -> Result<Json<BaseAmountQuote>, (StatusCode, &'static str)> {
    match state.service.preview_item(&item) {
        Ok(quote) => Ok(Json(quote)),
        Err(e) => {
            tracing::error!("Preview pricing error: {:?}", e);
            Err(portal_error_response(&e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/pricing/cart",
    request_body = CartReq,
    responses(
        (status = 200, description = "Breakdown for a cart group whose amounts include GST", body = CartGroupQuote),
        (status = 400, description = "Bad request")
    )
)]
/// Price a cart group whose item amounts include GST
///
/// The returned `documentSubTotal` is recomputed from the line items and is not reconciled with
/// `totals.subTotal`.
#[axum::debug_handler]
async fn cart_pricing(
    State(state): State<AppState>,
    Json(req): Json<CartReq>,
) -> Result<Json<CartGroupQuote>, (StatusCode, &'static str)> {
    match state.service.price_cart(&req.items) {
        Ok(quote) => Ok(Json(quote)),
        Err(e) => {
            tracing::error!("Cart pricing error: {:?}", e);
            Err(portal_error_response(&e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/orders/stage",
    request_body = OrderStatus,
    responses(
        (status = 200, description = "Current stage and checkpoint statuses", body = StageRes)
    )
)]
/// Derive the tracking view for an order status snapshot
#[axum::debug_handler]
async fn order_stage(
    State(state): State<AppState>,
    Json(status): Json<OrderStatus>,
) -> Json<StageRes> {
    let (view, anomalies) = state.service.track(&status);
    Json(StageRes { view, anomalies })
}

#[utoipa::path(
    post,
    path = "/quotations/document",
    request_body = ItemDocumentReq,
    responses(
        (status = 200, description = "Quotation document for one item", body = QuotationDocument),
        (status = 400, description = "Bad request")
    )
)]
/// Build the quotation document for one item
///
/// A quotation number is issued when the request does not carry one.
#[axum::debug_handler]
async fn item_document(
    State(state): State<AppState>,
    Json(req): Json<ItemDocumentReq>,
) -> Result<Json<QuotationDocument>, (StatusCode, &'static str)> {
    match state
        .service
        .item_document(req.customer, &req.item, req.quotation_number)
    {
        Ok(document) => Ok(Json(document)),
        Err(e) => {
            tracing::error!("Item document error: {:?}", e);
            Err(portal_error_response(&e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/quotations/cart-document",
    request_body = CartDocumentReq,
    responses(
        (status = 200, description = "Combined quotation document for a cart group", body = QuotationDocument),
        (status = 400, description = "Bad request")
    )
)]
/// Build the combined quotation document for a cart group
#[axum::debug_handler]
async fn cart_document(
    State(state): State<AppState>,
    Json(req): Json<CartDocumentReq>,
) -> Result<Json<QuotationDocument>, (StatusCode, &'static str)> {
    match state
        .service
        .cart_document(req.customer, &req.items, req.quotation_number)
    {
        Ok(document) => Ok(Json(document)),
        Err(e) => {
            tracing::error!("Cart document error: {:?}", e);
            Err(portal_error_response(&e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-file upload outcomes", body = UploadRes),
        (status = 400, description = "Malformed multipart body or no files")
    )
)]
/// Store uploaded documents
///
/// Every file part is stored independently; one failed file does not fail the request.
/// Parts without a file name are ignored.
#[axum::debug_handler]
async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadRes>, (StatusCode, &'static str)> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Multipart error: {:?}", e);
                return Err((StatusCode::BAD_REQUEST, "Malformed multipart body"));
            }
        };

        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };

        match field.bytes().await {
            Ok(bytes) => files.push((name, bytes.to_vec())),
            Err(e) => {
                tracing::error!("Multipart error: {:?}", e);
                return Err((StatusCode::BAD_REQUEST, "Malformed multipart body"));
            }
        }
    }

    if files.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No files in upload"));
    }

    Ok(Json(UploadRes {
        data: state.uploads.store_batch(&files),
    }))
}

#[utoipa::path(
    delete,
    path = "/uploads/{key}",
    params(("key" = String, Path, description = "Upload key (hex SHA-256)")),
    responses(
        (status = 200, description = "Upload removed", body = DeleteRes),
        (status = 400, description = "Malformed key", body = DeleteRes),
        (status = 404, description = "No upload under this key", body = DeleteRes),
        (status = 500, description = "Internal server error", body = DeleteRes)
    )
)]
/// Remove a stored upload
///
/// The key is a content hash, so every upload of the same bytes is removed with it.
#[axum::debug_handler]
async fn delete_upload(
    State(state): State<AppState>,
    AxumPath(key): AxumPath<String>,
) -> (StatusCode, Json<DeleteRes>) {
    let (status, success, message) = match state.uploads.remove(&key) {
        Ok(()) => (StatusCode::OK, true, "Upload removed"),
        Err(FilesError::InvalidKey(_)) => (StatusCode::BAD_REQUEST, false, "Invalid upload key"),
        Err(FilesError::NotFound(_)) => (StatusCode::NOT_FOUND, false, "Upload not found"),
        Err(e) => {
            tracing::error!("Delete upload error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, false, "Internal error")
        }
    };

    (
        status,
        Json(DeleteRes {
            success,
            message: message.into(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/files/{key}",
    params(("key" = String, Path, description = "Upload key (hex SHA-256)")),
    responses(
        (status = 200, description = "Stored bytes with the sniffed content type"),
        (status = 400, description = "Malformed key"),
        (status = 404, description = "No upload under this key")
    )
)]
/// Serve a stored upload with its sniffed content type
#[axum::debug_handler]
async fn download_file(
    State(state): State<AppState>,
    AxumPath(key): AxumPath<String>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), (StatusCode, &'static str)> {
    match state.uploads.read(&key) {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, sniff_mime_type(&bytes))], bytes)),
        Err(FilesError::InvalidKey(_)) => Err((StatusCode::BAD_REQUEST, "Invalid upload key")),
        Err(FilesError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "Upload not found")),
        Err(e) => {
            tracing::error!("Read upload error: {:?}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error"))
        }
    }
}
