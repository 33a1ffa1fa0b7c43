//! HTTP routes definition

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::handlers;

/// Collection and document routes
///
/// REST API for the document store:
/// - GET    /collections                        - List collections
/// - POST   /collections                        - Create a collection
/// - GET    /collections/:name                  - Get collection info
/// - DELETE /collections/:name                  - Delete a collection
/// - GET    /collections/:name/documents        - List documents
/// - PUT    /collections/:name/documents        - Store a document
/// - GET    /collections/:name/documents/:key   - Fetch a document
/// - DELETE /collections/:name/documents/:key   - Delete a document
/// - POST   /collections/:name/indexes          - Create an index
/// - DELETE /collections/:name/indexes/:field   - Delete an index
/// - GET    /collections/:name/query            - Range query over an index
pub fn api_routes() -> Router {
    Router::new()
        .route("/collections", get(handlers::list_collections))
        .route("/collections", post(handlers::create_collection))
        .route("/collections/:name", get(handlers::get_collection))
        .route("/collections/:name", delete(handlers::delete_collection))
        .route(
            "/collections/:name/documents",
            get(handlers::list_documents),
        )
        .route(
            "/collections/:name/documents",
            put(handlers::put_document),
        )
        .route(
            "/collections/:name/documents/:key",
            get(handlers::get_document),
        )
        .route(
            "/collections/:name/documents/:key",
            delete(handlers::delete_document),
        )
        .route(
            "/collections/:name/indexes",
            post(handlers::create_index),
        )
        .route(
            "/collections/:name/indexes/:field",
            delete(handlers::delete_index),
        )
        .route("/collections/:name/query", get(handlers::query_documents))
}

/// Health check routes
pub fn health_routes() -> Router {
    Router::new().route("/health", get(handlers::health))
}
