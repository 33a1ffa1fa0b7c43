//! Wire protocol: framed JSON requests and responses.
//!
//! Every message on the wire is a 4-byte little-endian length followed by
//! that many bytes of UTF-8 JSON. Requests are tagged by a `command` field;
//! responses carry a `status` of `ok` or `error` plus whatever payload the
//! command produces.

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::document::Document;

/// Hard cap on a single framed message.
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024; // 16 MiB

/// A client command, one per store or collection operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    Ping,
    CreateCollection {
        name: String,
        primary_key: String,
    },
    GetCollection {
        name: String,
    },
    ListCollections,
    DeleteCollection {
        name: String,
    },
    Put {
        collection: String,
        document: Document,
    },
    Get {
        collection: String,
        key: String,
    },
    Delete {
        collection: String,
        key: String,
    },
    List {
        collection: String,
    },
    CreateIndex {
        collection: String,
        field: String,
    },
    DeleteIndex {
        collection: String,
        field: String,
    },
    Query {
        collection: String,
        field: String,
        #[serde(default)]
        min: Option<String>,
        #[serde(default)]
        max: Option<String>,
        #[serde(default)]
        descending: bool,
    },
}

impl Request {
    /// The wire name of the command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::CreateCollection { .. } => "create_collection",
            Request::GetCollection { .. } => "get_collection",
            Request::ListCollections => "list_collections",
            Request::DeleteCollection { .. } => "delete_collection",
            Request::Put { .. } => "put",
            Request::Get { .. } => "get",
            Request::Delete { .. } => "delete",
            Request::List { .. } => "list",
            Request::CreateIndex { .. } => "create_index",
            Request::DeleteIndex { .. } => "delete_index",
            Request::Query { .. } => "query",
        }
    }
}

/// Summary of one collection, returned by `get_collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub primary_key: String,
    pub indexes: Vec<String>,
    pub documents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// A server reply. Only the fields relevant to the answered command are
/// present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Ok,
            code: None,
            message: None,
            document: None,
            documents: None,
            collection: None,
            collections: None,
            count: None,
            version: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            code: Some(code.into()),
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    /// Attaches a document list, setting `count` alongside it.
    pub fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.count = Some(documents.len());
        self.documents = Some(documents);
        self
    }

    pub fn with_collection(mut self, collection: CollectionInfo) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Attaches a collection name list, setting `count` alongside it.
    pub fn with_collections(mut self, collections: Vec<String>) -> Self {
        self.count = Some(collections.len());
        self.collections = Some(collections);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

async fn read_frame<T, M>(stream: &mut T) -> Result<M>
where
    T: AsyncRead + Unpin,
    M: DeserializeOwned,
{
    let size = stream.read_u32_le().await?;

    if size == 0 {
        bail!("Empty message");
    }
    if size > MAX_MESSAGE_SIZE {
        bail!("Message too large: {} bytes (max: {})", size, MAX_MESSAGE_SIZE);
    }

    let mut buffer = vec![0u8; size as usize];
    stream.read_exact(&mut buffer).await?;

    Ok(serde_json::from_slice(&buffer)?)
}

async fn write_frame<T, M>(stream: &mut T, message: &M) -> Result<()>
where
    T: AsyncWrite + Unpin,
    M: Serialize,
{
    let payload = serde_json::to_vec(message)?;

    stream.write_u32_le(payload.len() as u32).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;

    Ok(())
}

/// Read a request frame (server side).
pub async fn read_request<T>(stream: &mut T) -> Result<Request>
where
    T: AsyncRead + Unpin,
{
    read_frame(stream).await
}

/// Write a request frame (client side).
pub async fn write_request<T>(stream: &mut T, request: &Request) -> Result<()>
where
    T: AsyncWrite + Unpin,
{
    write_frame(stream, request).await
}

/// Read a response frame (client side).
pub async fn read_response<T>(stream: &mut T) -> Result<Response>
where
    T: AsyncRead + Unpin,
{
    read_frame(stream).await
}

/// Write a response frame (server side).
pub async fn write_response<T>(stream: &mut T, response: &Response) -> Result<()>
where
    T: AsyncWrite + Unpin,
{
    write_frame(stream, response).await
}
