//! VellumDB server binary
//!
//! Command-line interface for VellumDB with support for:
//! - Running the HTTP and TCP servers (`serve`)
//! - An interactive protocol client (`client`)
//! - Offline snapshot inspection (`snapshot`)
//!
//! # Examples
//!
//! ```bash
//! # Start both listeners, persisting across restarts
//! vellumdb serve --bind 0.0.0.0:8080 --snapshot data/store.json
//!
//! # Talk to a running server
//! vellumdb client --addr 127.0.0.1:28015
//!
//! # Inspect a snapshot file without a server
//! vellumdb snapshot data/store.json inspect
//! ```

use std::io::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpStream;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vellumdb::network::{
    read_response, write_request, ProtocolServer, Request, Response, ServerConfig as TcpConfig,
};
use vellumdb::server::{start_server, ServerConfig};
use vellumdb::store::{Store, StoreSnapshot};

/// VellumDB - an embeddable, schema-flexible document store
#[derive(Parser, Debug)]
#[command(name = "vellumdb")]
#[command(version = vellumdb::VERSION)]
#[command(about = "VellumDB - an embeddable, schema-flexible document store", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "VELLUM_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the VellumDB server
    Serve(ServeArgs),

    /// Connect an interactive client to a running server
    Client(ClientArgs),

    /// Work with snapshot files offline
    Snapshot {
        /// Snapshot file path
        path: PathBuf,

        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Show server version
    Version,
}

/// Server configuration arguments
#[derive(Args, Debug)]
struct ServeArgs {
    /// HTTP bind address
    #[arg(short, long, default_value = "127.0.0.1:8080", env = "VELLUM_BIND")]
    bind: SocketAddr,

    /// TCP protocol bind address
    #[arg(long, default_value = "127.0.0.1:28015", env = "VELLUM_TCP_BIND")]
    tcp_bind: SocketAddr,

    /// Maximum concurrent TCP connections
    #[arg(long, default_value = "1024")]
    max_connections: usize,

    /// Snapshot file: restored at startup, written back on shutdown
    #[arg(long, env = "VELLUM_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Disable CORS on the HTTP API
    #[arg(long)]
    no_cors: bool,
}

/// Client configuration arguments
#[derive(Args, Debug)]
struct ClientArgs {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:28015", env = "VELLUM_ADDR")]
    addr: SocketAddr,
}

#[derive(Subcommand, Debug)]
enum SnapshotCommands {
    /// Print collection, document, and index counts
    Inspect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    match cli.command {
        Commands::Serve(args) => serve_command(args).await,
        Commands::Client(args) => client_command(args).await,
        Commands::Snapshot { path, command } => match command {
            SnapshotCommands::Inspect => inspect_command(&path),
        },
        Commands::Version => {
            println!("VellumDB {}", vellumdb::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with rolling files and console output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "vellumdb.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(!cli.no_color),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Serve command - run the HTTP and TCP listeners until shutdown
async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    info!(version = %vellumdb::VERSION, "VellumDB starting");

    let store = match &args.snapshot {
        Some(path) if path.exists() => {
            let store = Store::from_file(path)
                .with_context(|| format!("failed to restore snapshot {}", path.display()))?;
            info!(
                path = %path.display(),
                collections = store.collection_names().len(),
                "Store restored from snapshot"
            );
            store
        }
        Some(path) => {
            info!(path = %path.display(), "Snapshot file not found, starting empty");
            Store::new()
        }
        None => Store::new(),
    };
    let store = Arc::new(store);

    let tcp_config = TcpConfig {
        bind_addr: args.tcp_bind,
        max_connections: args.max_connections,
    };
    let tcp_server = ProtocolServer::bind(&tcp_config, store.clone()).await?;
    let tcp_handle = tokio::spawn(async move {
        if let Err(e) = tcp_server.serve().await {
            error!("TCP server error: {}", e);
        }
    });

    let http_config = ServerConfig {
        http_addr: args.bind.ip().to_string(),
        http_port: args.bind.port(),
        enable_cors: !args.no_cors,
    };
    let http_store = store.clone();
    let http_handle = tokio::spawn(async move { start_server(http_config, http_store).await });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        result = http_handle => {
            result??;
        }
        _ = tcp_handle => {}
    }

    if let Some(path) = &args.snapshot {
        store
            .dump_to_file(path)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
    }

    Ok(())
}

/// Client command - interactive line-oriented protocol client
async fn client_command(args: ClientArgs) -> anyhow::Result<()> {
    let mut stream = TcpStream::connect(args.addr)
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;

    println!("Connected to {}", args.addr);
    println!("Type 'help' for commands, 'quit' to exit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if line == "help" {
            print_help();
            continue;
        }

        let request = match parse_command(line) {
            Ok(request) => request,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };

        write_request(&mut stream, &request).await?;
        let response = read_response(&mut stream).await?;
        print_response(&response);
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  ping                                      check the server");
    println!("  collections                               list collections");
    println!("  create-collection <name> <primary-key>    create a collection");
    println!("  collection <name>                         show collection info");
    println!("  delete-collection <name>                  delete a collection");
    println!("  put <collection> <document-json>          store a document");
    println!("  get <collection> <key>                    fetch a document");
    println!("  delete <collection> <key>                 delete a document");
    println!("  list <collection>                         list all documents");
    println!("  create-index <collection> <field>         index a string field");
    println!("  delete-index <collection> <field>         drop an index");
    println!("  query <collection> <field> [min=A] [max=Z] [asc|desc]");
    println!("  quit");
    println!();
    println!("Documents use the typed field form, for example:");
    println!(r#"  put users {{"id":{{"type":"string","value":"u-1"}}}}"#);
}

fn parse_command(line: &str) -> anyhow::Result<Request> {
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    match word {
        "ping" => Ok(Request::Ping),
        "collections" => Ok(Request::ListCollections),
        "create-collection" => {
            let usage = "usage: create-collection <name> <primary-key>";
            Ok(Request::CreateCollection {
                name: args.next().context(usage)?.to_string(),
                primary_key: args.next().context(usage)?.to_string(),
            })
        }
        "collection" => Ok(Request::GetCollection {
            name: args.next().context("usage: collection <name>")?.to_string(),
        }),
        "delete-collection" => Ok(Request::DeleteCollection {
            name: args
                .next()
                .context("usage: delete-collection <name>")?
                .to_string(),
        }),
        "put" => {
            let (collection, json) = rest
                .split_once(char::is_whitespace)
                .context("usage: put <collection> <document-json>")?;
            let document = serde_json::from_str(json.trim())
                .context("document must be valid document JSON")?;
            Ok(Request::Put {
                collection: collection.to_string(),
                document,
            })
        }
        "get" => {
            let usage = "usage: get <collection> <key>";
            Ok(Request::Get {
                collection: args.next().context(usage)?.to_string(),
                key: args.next().context(usage)?.to_string(),
            })
        }
        "delete" => {
            let usage = "usage: delete <collection> <key>";
            Ok(Request::Delete {
                collection: args.next().context(usage)?.to_string(),
                key: args.next().context(usage)?.to_string(),
            })
        }
        "list" => Ok(Request::List {
            collection: args.next().context("usage: list <collection>")?.to_string(),
        }),
        "create-index" => {
            let usage = "usage: create-index <collection> <field>";
            Ok(Request::CreateIndex {
                collection: args.next().context(usage)?.to_string(),
                field: args.next().context(usage)?.to_string(),
            })
        }
        "delete-index" => {
            let usage = "usage: delete-index <collection> <field>";
            Ok(Request::DeleteIndex {
                collection: args.next().context(usage)?.to_string(),
                field: args.next().context(usage)?.to_string(),
            })
        }
        "query" => {
            let usage = "usage: query <collection> <field> [min=A] [max=Z] [asc|desc]";
            let collection = args.next().context(usage)?.to_string();
            let field = args.next().context(usage)?.to_string();

            let mut min = None;
            let mut max = None;
            let mut descending = false;
            for arg in args {
                if let Some(value) = arg.strip_prefix("min=") {
                    min = Some(value.to_string());
                } else if let Some(value) = arg.strip_prefix("max=") {
                    max = Some(value.to_string());
                } else if arg == "desc" {
                    descending = true;
                } else if arg == "asc" {
                    descending = false;
                } else {
                    anyhow::bail!("unrecognized query argument: {}", arg);
                }
            }

            Ok(Request::Query {
                collection,
                field,
                min,
                max,
                descending,
            })
        }
        _ => anyhow::bail!("unknown command: {} (try 'help')", word),
    }
}

fn print_response(response: &Response) {
    if !response.is_ok() {
        println!(
            "error [{}]: {}",
            response.code.as_deref().unwrap_or("unknown"),
            response.message.as_deref().unwrap_or("")
        );
        return;
    }

    if let Some(document) = &response.document {
        print_json(document);
    } else if let Some(documents) = &response.documents {
        for document in documents {
            print_json(document);
        }
        println!("{} document(s)", documents.len());
    } else if let Some(info) = &response.collection {
        println!("Collection: {}", info.name);
        println!("Primary key: {}", info.primary_key);
        println!("Documents: {}", info.documents);
        println!(
            "Indexes: {}",
            if info.indexes.is_empty() {
                "none".to_string()
            } else {
                info.indexes.join(", ")
            }
        );
    } else if let Some(collections) = &response.collections {
        for name in collections {
            println!("{}", name);
        }
        println!("{} collection(s)", collections.len());
    } else if let Some(version) = &response.version {
        println!("server version {}", version);
    } else {
        println!("ok");
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!("error: {}", e),
    }
}

/// Inspect command - summarize a snapshot file without a server
fn inspect_command(path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot: StoreSnapshot =
        serde_json::from_str(&text).context("snapshot file is not valid snapshot JSON")?;

    println!("Snapshot: {}", path.display());
    println!("Collections: {}", snapshot.collections.len());
    for (name, collection) in &snapshot.collections {
        println!(
            "  {}  (primary key: {}, documents: {}, indexes: {})",
            name,
            collection.config.primary_key,
            collection.documents.len(),
            if collection.indexes.is_empty() {
                "none".to_string()
            } else {
                collection.indexes.join(", ")
            }
        );
    }

    Ok(())
}
