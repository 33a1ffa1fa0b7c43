//! Integration tests for the TCP wire protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};

use vellumdb::document::Document;
use vellumdb::network::{
    read_response, write_request, ProtocolServer, Request, Response, ServerConfig,
};
use vellumdb::store::Store;

/// Helper to start a test server on an ephemeral port
async fn start_test_server() -> SocketAddr {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        max_connections: 10,
    };
    let server = ProtocolServer::bind(&config, Arc::new(Store::new()))
        .await
        .expect("Failed to bind test server");
    let addr = server.local_addr().expect("Failed to read bound address");

    tokio::spawn(async move {
        let _ = server.serve().await;
    });

    addr
}

async fn connect(addr: SocketAddr) -> TcpStream {
    timeout(Duration::from_secs(1), TcpStream::connect(addr))
        .await
        .expect("Connect timed out")
        .expect("Failed to connect")
}

async fn roundtrip(stream: &mut TcpStream, request: Request) -> Response {
    write_request(stream, &request)
        .await
        .expect("Failed to write request");
    read_response(stream).await.expect("Failed to read response")
}

fn doc(id: &str, name: &str) -> Document {
    Document::new().with_field("id", id).with_field("name", name)
}

#[tokio::test]
async fn test_ping() {
    let addr = start_test_server().await;
    let mut stream = connect(addr).await;

    let response = roundtrip(&mut stream, Request::Ping).await;
    assert!(response.is_ok());
    assert_eq!(response.version.as_deref(), Some(vellumdb::VERSION));
}

#[tokio::test]
async fn test_full_session() {
    let addr = start_test_server().await;
    let mut stream = connect(addr).await;

    let response = roundtrip(
        &mut stream,
        Request::CreateCollection {
            name: "users".to_string(),
            primary_key: "id".to_string(),
        },
    )
    .await;
    assert!(response.is_ok());

    for (id, name) in [("u-1", "Alice"), ("u-2", "Bob"), ("u-3", "Charlie")] {
        let response = roundtrip(
            &mut stream,
            Request::Put {
                collection: "users".to_string(),
                document: doc(id, name),
            },
        )
        .await;
        assert!(response.is_ok());
    }

    let response = roundtrip(
        &mut stream,
        Request::CreateIndex {
            collection: "users".to_string(),
            field: "name".to_string(),
        },
    )
    .await;
    assert!(response.is_ok());

    let response = roundtrip(
        &mut stream,
        Request::Query {
            collection: "users".to_string(),
            field: "name".to_string(),
            min: Some("Alice".to_string()),
            max: Some("Bob".to_string()),
            descending: false,
        },
    )
    .await;
    assert!(response.is_ok());
    assert_eq!(response.count, Some(2));
    let names: Vec<_> = response
        .documents
        .unwrap()
        .iter()
        .map(|d| d.get("name").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);

    let response = roundtrip(
        &mut stream,
        Request::Get {
            collection: "users".to_string(),
            key: "u-3".to_string(),
        },
    )
    .await;
    assert_eq!(
        response.document.unwrap().get("name").unwrap().as_str(),
        Some("Charlie")
    );

    let response = roundtrip(
        &mut stream,
        Request::GetCollection {
            name: "users".to_string(),
        },
    )
    .await;
    let info = response.collection.unwrap();
    assert_eq!(info.primary_key, "id");
    assert_eq!(info.indexes, vec!["name".to_string()]);
    assert_eq!(info.documents, 3);

    let response = roundtrip(
        &mut stream,
        Request::Delete {
            collection: "users".to_string(),
            key: "u-2".to_string(),
        },
    )
    .await;
    assert!(response.is_ok());

    let response = roundtrip(
        &mut stream,
        Request::List {
            collection: "users".to_string(),
        },
    )
    .await;
    assert_eq!(response.count, Some(2));

    let response = roundtrip(
        &mut stream,
        Request::DeleteCollection {
            name: "users".to_string(),
        },
    )
    .await;
    assert!(response.is_ok());

    let response = roundtrip(&mut stream, Request::ListCollections).await;
    assert_eq!(response.count, Some(0));
}

#[tokio::test]
async fn test_error_codes_over_wire() {
    let addr = start_test_server().await;
    let mut stream = connect(addr).await;

    let response = roundtrip(
        &mut stream,
        Request::Get {
            collection: "ghosts".to_string(),
            key: "g-1".to_string(),
        },
    )
    .await;
    assert!(!response.is_ok());
    assert_eq!(response.code.as_deref(), Some("collection_not_found"));

    roundtrip(
        &mut stream,
        Request::CreateCollection {
            name: "users".to_string(),
            primary_key: "id".to_string(),
        },
    )
    .await;

    let response = roundtrip(
        &mut stream,
        Request::CreateCollection {
            name: "users".to_string(),
            primary_key: "id".to_string(),
        },
    )
    .await;
    assert_eq!(response.code.as_deref(), Some("collection_exists"));

    let response = roundtrip(
        &mut stream,
        Request::Put {
            collection: "users".to_string(),
            document: Document::new().with_field("name", "Alice"),
        },
    )
    .await;
    assert_eq!(response.code.as_deref(), Some("no_primary_key"));

    // The connection survives engine errors.
    let response = roundtrip(&mut stream, Request::Ping).await;
    assert!(response.is_ok());
}

#[tokio::test]
async fn test_two_clients_share_one_store() {
    let addr = start_test_server().await;

    let mut writer = connect(addr).await;
    roundtrip(
        &mut writer,
        Request::CreateCollection {
            name: "users".to_string(),
            primary_key: "id".to_string(),
        },
    )
    .await;
    roundtrip(
        &mut writer,
        Request::Put {
            collection: "users".to_string(),
            document: doc("u-1", "Alice"),
        },
    )
    .await;

    let mut reader = connect(addr).await;
    let response = roundtrip(
        &mut reader,
        Request::Get {
            collection: "users".to_string(),
            key: "u-1".to_string(),
        },
    )
    .await;
    assert!(response.is_ok());
    assert_eq!(
        response.document.unwrap().get("name").unwrap().as_str(),
        Some("Alice")
    );
}

#[tokio::test]
async fn test_malformed_frame_gets_error_then_close() {
    let addr = start_test_server().await;
    let mut stream = connect(addr).await;

    let garbage = b"hello";
    stream
        .write_all(&(garbage.len() as u32).to_le_bytes())
        .await
        .unwrap();
    stream.write_all(garbage).await.unwrap();
    stream.flush().await.unwrap();

    let response = read_response(&mut stream)
        .await
        .expect("Expected an error response before close");
    assert!(!response.is_ok());
    assert_eq!(response.code.as_deref(), Some("bad_request"));
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
    let addr = start_test_server().await;
    let mut stream = connect(addr).await;

    let size = vellumdb::network::MAX_MESSAGE_SIZE + 1;
    stream.write_all(&size.to_le_bytes()).await.unwrap();
    stream.flush().await.unwrap();

    let response = read_response(&mut stream)
        .await
        .expect("Expected an error response before close");
    assert_eq!(response.code.as_deref(), Some("bad_request"));
}
