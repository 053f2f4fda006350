use crate::{
    auth::AuthUser,
    errors::ApiError,
    handlers::common::{split_id_list, success_response},
    services::products::{ProductComparison, ProductDetail, ProductSummary},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

/// Query string of the comparison endpoint
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CompareQuery {
    /// Comma-separated product ids, e.g. `0000001,0000002`
    #[serde(default)]
    pub product_ids: String,
}

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/compare", get(compare_products))
        .route("/:id", get(get_product))
}

/// List all products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "Products ordered by id", body = [ProductSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "products"
)]
pub async fn list_products(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state.services.products.list_products().await?;
    Ok(success_response(products))
}

/// Product with its daily inventory history
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(
        ("id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product detail", body = ProductDetail),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "products"
)]
pub async fn get_product(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.services.products.get_product_detail(&id).await?;
    Ok(success_response(detail))
}

/// Side-by-side daily history for several products
#[utoipa::path(
    get,
    path = "/api/v1/products/compare",
    params(CompareQuery),
    responses(
        (status = 200, description = "Known products in request order", body = [ProductComparison]),
        (status = 400, description = "No product IDs provided", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("Bearer" = [])),
    tag = "products"
)]
pub async fn compare_products(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = split_id_list(&query.product_ids);
    if ids.is_empty() {
        return Err(ApiError::bad_request("No product IDs provided"));
    }

    let comparison = state.services.products.compare_products(&ids).await?;
    Ok(success_response(comparison))
}
