#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use blog_tonic_core::proto::{FILE_DESCRIPTOR_SET, blog_service_server::BlogServiceServer};
use bson::{Document, doc};
use clap::Parser;
use futures::Stream;
use mongodb::Client;
use server::config::{CliArgs, ServerConfig};
use server::service::handler::BlogRecordService;
use server::store::mongo::MongoBlogStore;
use server::telemetry::init_telemetry;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// mimalloc holds up better than the system allocator under contention,
// especially on musl.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let client = match connect_mongodb(&config).await {
        Ok(client) => client,
        Err(err) => {
            tracing::error!("Startup failed: {err:#}");
            providers.shutdown();
            return Err(err);
        }
    };
    let collection = client
        .database(&config.database)
        .collection::<Document>(&config.collection);
    let store = Arc::new(MongoBlogStore::new(collection));
    let service = BlogRecordService::new(store, config.clone());

    let res = if config.uds {
        #[cfg(unix)]
        {
            use tokio::net::UnixListener;
            use tokio_stream::wrappers::UnixListenerStream;
            let uds_path = config.server_addr.clone();
            let uds = UnixListener::bind(&uds_path)?;
            let incoming = UnixListenerStream::new(uds);
            log_startup_info(&uds_path, &config);
            let res = run_server_with_incoming(service, incoming).await;
            // Best effort; a panic may still leave the socket file behind.
            let _ = std::fs::remove_file(&uds_path);
            res
        }
        #[cfg(not(unix))]
        {
            anyhow::bail!("Unix domain sockets are not supported on this platform");
        }
    } else {
        let tcp_path = config.server_addr.clone();
        let tcp = TcpListener::bind(&tcp_path).await?;
        let incoming = TcpListenerStream::new(tcp);
        log_startup_info(&tcp_path, &config);
        run_server_with_incoming(service, incoming).await
    };

    tracing::info!("Closing MongoDB connection");
    client.shutdown().await;
    providers.shutdown();
    res
}

/// Connects to MongoDB and pings the configured database so that a bad URI
/// or unreachable server fails startup instead of the first request.
async fn connect_mongodb(config: &ServerConfig) -> anyhow::Result<Client> {
    tracing::info!("Connecting to MongoDB...");
    let client = Client::with_uri_str(&config.mongodb_uri)
        .await
        .context("invalid MongoDB connection string")?;

    client
        .database(&config.database)
        .run_command(doc! { "ping": 1 })
        .await
        .context("could not connect to MongoDB")?;

    tracing::info!(
        database = %config.database,
        collection = %config.collection,
        "Connected to MongoDB"
    );
    Ok(client)
}

async fn run_server_with_incoming<I, IO, IE>(
    service: BlogRecordService,
    incoming: I,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<BlogServiceServer<BlogRecordService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_blog_service(service))
        .serve_with_incoming_shutdown(incoming, shutdown_signal(health_reporter))
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(addr: &str, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting blog service on {} with full config: {:#?}",
            addr,
            config
        );
    } else {
        tracing::info!(
            "Starting blog service on {} backed by {}.{}",
            addr,
            config.database,
            config.collection
        );
    }
}

fn build_blog_service(service: BlogRecordService) -> BlogServiceServer<BlogRecordService> {
    BlogServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

async fn shutdown_signal(health_reporter: HealthReporter) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // Stop advertising before in-flight requests drain.
    health_reporter
        .set_not_serving::<BlogServiceServer<BlogRecordService>>()
        .await;
}
