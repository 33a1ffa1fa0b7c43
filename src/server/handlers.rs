//! HTTP route handlers

use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::document::Document;
use crate::error::Error;
use crate::network::dispatch::error_code;
use crate::server::AppState;
use crate::store::{CollectionConfig, QueryParams};
use crate::VERSION;

// ===== Request/Response Types =====

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateIndexRequest {
    pub field: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub field: String,
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub collections: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionListResponse {
    pub ok: bool,
    pub collections: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionDetails {
    pub name: String,
    pub primary_key: String,
    pub indexes: Vec<String>,
    pub documents: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub ok: bool,
    pub collection: CollectionDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub ok: bool,
    pub document: Document,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub ok: bool,
    pub documents: Vec<Document>,
    pub count: usize,
}

// ===== Error Mapping =====

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::DocumentNotFound(_) | Error::CollectionNotFound(_) | Error::IndexNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        Error::CollectionExists(_) | Error::IndexExists(_) => StatusCode::CONFLICT,
        Error::NoPrimaryKey
        | Error::InvalidKeyType
        | Error::EmptyPrimaryKey
        | Error::EmptyIndexKey
        | Error::IndexEntryNotFound
        | Error::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        Error::DumpFailed(_) | Error::ParseFailed(_) | Error::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn fail(err: Error) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    }

    (
        status,
        Json(StatusResponse {
            ok: false,
            error: Some(err.to_string()),
            code: Some(error_code(&err).to_string()),
        }),
    )
        .into_response()
}

fn ack() -> Response {
    Json(StatusResponse {
        ok: true,
        error: None,
        code: None,
    })
    .into_response()
}

// ===== Handlers =====

/// Health check
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Response {
    let uptime = (chrono::Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        ok: true,
        service: env!("CARGO_PKG_NAME").to_string(),
        version: VERSION.to_string(),
        uptime_secs: uptime,
        collections: state.store.collection_names().len(),
    })
    .into_response()
}

/// List all collections
#[instrument(skip(state))]
pub async fn list_collections(Extension(state): Extension<Arc<AppState>>) -> Response {
    let collections = state.store.collection_names();
    let count = collections.len();
    debug!(count, "Listing collections");

    Json(CollectionListResponse {
        ok: true,
        collections,
        count,
    })
    .into_response()
}

/// Create a collection
#[instrument(skip(state, payload))]
pub async fn create_collection(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateCollectionRequest>,
) -> Response {
    info!(collection = %payload.name, primary_key = %payload.primary_key, "Creating collection");

    match state
        .store
        .create_collection(&payload.name, CollectionConfig::new(payload.primary_key))
    {
        Ok(_) => ack(),
        Err(e) => fail(e),
    }
}

/// Get collection info
#[instrument(skip(state))]
pub async fn get_collection(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.store.collection(&name) {
        Ok(collection) => Json(CollectionResponse {
            ok: true,
            collection: CollectionDetails {
                name: collection.name().to_string(),
                primary_key: collection.config().primary_key.clone(),
                indexes: collection.index_names(),
                documents: collection.len(),
            },
        })
        .into_response(),
        Err(e) => fail(e),
    }
}

/// Delete a collection
#[instrument(skip(state))]
pub async fn delete_collection(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    info!(collection = %name, "Deleting collection");

    match state.store.delete_collection(&name) {
        Ok(()) => ack(),
        Err(e) => fail(e),
    }
}

/// List documents in a collection
#[instrument(skip(state))]
pub async fn list_documents(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.store.collection(&name) {
        Ok(collection) => {
            let documents = collection.list();
            let count = documents.len();
            Json(DocumentListResponse {
                ok: true,
                documents,
                count,
            })
            .into_response()
        }
        Err(e) => fail(e),
    }
}

/// Store a document
#[instrument(skip(state, document))]
pub async fn put_document(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    Json(document): Json<Document>,
) -> Response {
    info!(collection = %name, "Storing document");

    match state.store.collection(&name).and_then(|c| c.put(document)) {
        Ok(()) => ack(),
        Err(e) => fail(e),
    }
}

/// Fetch a document by primary key
#[instrument(skip(state))]
pub async fn get_document(
    Extension(state): Extension<Arc<AppState>>,
    Path((name, key)): Path<(String, String)>,
) -> Response {
    match state.store.collection(&name).and_then(|c| c.get(&key)) {
        Ok(document) => Json(DocumentResponse { ok: true, document }).into_response(),
        Err(e) => fail(e),
    }
}

/// Delete a document by primary key
#[instrument(skip(state))]
pub async fn delete_document(
    Extension(state): Extension<Arc<AppState>>,
    Path((name, key)): Path<(String, String)>,
) -> Response {
    info!(collection = %name, key = %key, "Deleting document");

    match state.store.collection(&name).and_then(|c| c.delete(&key)) {
        Ok(()) => ack(),
        Err(e) => fail(e),
    }
}

/// Create a secondary index
#[instrument(skip(state, payload))]
pub async fn create_index(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    Json(payload): Json<CreateIndexRequest>,
) -> Response {
    info!(collection = %name, field = %payload.field, "Creating index");

    match state
        .store
        .collection(&name)
        .and_then(|c| c.create_index(&payload.field))
    {
        Ok(()) => ack(),
        Err(e) => fail(e),
    }
}

/// Delete a secondary index
#[instrument(skip(state))]
pub async fn delete_index(
    Extension(state): Extension<Arc<AppState>>,
    Path((name, field)): Path<(String, String)>,
) -> Response {
    info!(collection = %name, field = %field, "Deleting index");

    match state
        .store
        .collection(&name)
        .and_then(|c| c.delete_index(&field))
    {
        Ok(()) => ack(),
        Err(e) => fail(e),
    }
}

/// Range query over a secondary index
#[instrument(skip(state, params))]
pub async fn query_documents(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<QueryRequest>,
) -> Response {
    debug!(collection = %name, field = %params.field, "Querying documents");

    let query = QueryParams {
        min_value: params.min,
        max_value: params.max,
        descending: params.descending,
    };

    match state
        .store
        .collection(&name)
        .and_then(|c| c.query(&params.field, &query))
    {
        Ok(documents) => {
            let count = documents.len();
            Json(DocumentListResponse {
                ok: true,
                documents,
                count,
            })
            .into_response()
        }
        Err(e) => fail(e),
    }
}
