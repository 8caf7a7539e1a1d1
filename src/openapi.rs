use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "0.1.0",
        description = r#"
Single-tenant inventory backend: products, categories, an append-only
IN/OUT stock-movement ledger, reports, and an audit trail.

Quantities change only through the ledger endpoints under `/api/v1/stock`.
Outgoing movements that exceed the available quantity are rejected with
`422` and leave no trace in the ledger or the audit trail.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::product_movements,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::create_category,
        crate::handlers::categories::delete_category,
        crate::handlers::stock::stock_in,
        crate::handlers::stock::stock_out,
        crate::handlers::stock::list_movements,
        crate::handlers::reports::dashboard,
        crate::handlers::reports::inventory_snapshot,
        crate::handlers::reports::stock_out_report,
        crate::handlers::reports::stock_out_totals,
        crate::handlers::reports::low_stock,
        crate::handlers::reports::daily_movements,
        crate::handlers::activity::list_activity,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::product::StockStatus,
        crate::entities::stock_movement::MovementType,
        crate::entities::activity_log::ActivityAction,
        crate::handlers::products::ProductRequest,
        crate::handlers::products::ProductResponse,
        crate::handlers::categories::CategoryRequest,
        crate::handlers::categories::CategoryResponse,
        crate::handlers::stock::StockMovementRequest,
    )),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "categories", description = "Category management"),
        (name = "stock", description = "Stock-movement ledger"),
        (name = "reports", description = "Aggregated reports"),
        (name = "activity", description = "Audit trail"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
