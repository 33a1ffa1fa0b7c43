//! Maps protocol requests onto store operations.
//!
//! Dispatch is a pure function of the store and the request. Failures come
//! back as error responses; nothing here logs on the caller's behalf.

use crate::error::Error;
use crate::network::protocol::{CollectionInfo, Request, Response};
use crate::store::{CollectionConfig, QueryParams, Store};
use crate::VERSION;

/// Executes one request against the store and produces its response.
pub fn dispatch(store: &Store, request: Request) -> Response {
    tracing::debug!(command = request.name(), "Processing command");

    match request {
        Request::Ping => Response::ok().with_version(VERSION),
        Request::CreateCollection { name, primary_key } => reply(
            store
                .create_collection(&name, CollectionConfig::new(primary_key))
                .map(|_| Response::ok()),
        ),
        Request::GetCollection { name } => reply(
            store
                .collection(&name)
                .map(|collection| Response::ok().with_collection(describe(&collection))),
        ),
        Request::ListCollections => {
            Response::ok().with_collections(store.collection_names())
        }
        Request::DeleteCollection { name } => {
            reply(store.delete_collection(&name).map(|_| Response::ok()))
        }
        Request::Put {
            collection,
            document,
        } => reply(
            store
                .collection(&collection)
                .and_then(|c| c.put(document))
                .map(|_| Response::ok()),
        ),
        Request::Get { collection, key } => reply(
            store
                .collection(&collection)
                .and_then(|c| c.get(&key))
                .map(|document| Response::ok().with_document(document)),
        ),
        Request::Delete { collection, key } => reply(
            store
                .collection(&collection)
                .and_then(|c| c.delete(&key))
                .map(|_| Response::ok()),
        ),
        Request::List { collection } => reply(
            store
                .collection(&collection)
                .map(|c| Response::ok().with_documents(c.list())),
        ),
        Request::CreateIndex { collection, field } => reply(
            store
                .collection(&collection)
                .and_then(|c| c.create_index(&field))
                .map(|_| Response::ok()),
        ),
        Request::DeleteIndex { collection, field } => reply(
            store
                .collection(&collection)
                .and_then(|c| c.delete_index(&field))
                .map(|_| Response::ok()),
        ),
        Request::Query {
            collection,
            field,
            min,
            max,
            descending,
        } => {
            let params = QueryParams {
                min_value: min,
                max_value: max,
                descending,
            };
            reply(
                store
                    .collection(&collection)
                    .and_then(|c| c.query(&field, &params))
                    .map(|documents| Response::ok().with_documents(documents)),
            )
        }
    }
}

fn reply(result: crate::error::Result<Response>) -> Response {
    result.unwrap_or_else(|err| Response::error(error_code(&err), err.to_string()))
}

fn describe(collection: &crate::store::Collection) -> CollectionInfo {
    CollectionInfo {
        name: collection.name().to_string(),
        primary_key: collection.config().primary_key.clone(),
        indexes: collection.index_names(),
        documents: collection.len(),
    }
}

/// A stable machine-readable code for each error variant.
pub fn error_code(err: &Error) -> &'static str {
    match err {
        Error::NoPrimaryKey => "no_primary_key",
        Error::InvalidKeyType => "invalid_key_type",
        Error::EmptyPrimaryKey => "empty_primary_key",
        Error::DocumentNotFound(_) => "document_not_found",
        Error::CollectionNotFound(_) => "collection_not_found",
        Error::CollectionExists(_) => "collection_exists",
        Error::IndexNotFound(_) => "index_not_found",
        Error::IndexExists(_) => "index_exists",
        Error::EmptyIndexKey => "empty_index_key",
        Error::IndexEntryNotFound => "index_entry_not_found",
        Error::TypeMismatch { .. } => "type_mismatch",
        Error::DumpFailed(_) => "dump_failed",
        Error::ParseFailed(_) => "parse_failed",
        Error::Io(_) => "io_error",
    }
}
