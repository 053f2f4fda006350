use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory Management API",
        version = "1.0.0",
        description = r#"
# Inventory Management API

Imports product spreadsheets and exposes the resulting day-by-day inventory history.

## Spreadsheet layout

One row per product with the columns `ID`, `Product Name` and `Opening Inventory`,
followed by four columns per day `n`:

- `Procurement Qty (Day n)`
- `Procurement Price (Day n)`
- `Sales Qty (Day n)`
- `Sales Price (Day n)`

Closing inventory is computed as opening inventory plus cumulative procurement minus
cumulative sales. Re-uploading a product replaces its stored history.

## Authentication

Register at `/auth/register`, obtain a token from `/auth/login` and send it on every
`/api/v1` request:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

```json
{
  "error": "Bad Request",
  "message": "Schema error: Missing required column: Opening Inventory",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Account and token endpoints"),
        (name = "products", description = "Product inventory history"),
        (name = "uploads", description = "Spreadsheet import")
    ),
    paths(
        // Auth
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::compare_products,

        // Uploads
        crate::handlers::uploads::upload_spreadsheet,
    ),
    components(
        schemas(
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::UserResponse,
            crate::auth::TokenResponse,

            crate::services::products::ProductSummary,
            crate::services::products::ProductDetail,
            crate::services::products::ProductComparison,
            crate::services::products::DaySnapshot,

            crate::handlers::uploads::UploadResponse,
            crate::handlers::uploads::UploadForm,

            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
