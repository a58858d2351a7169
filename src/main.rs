//! FlashProxy - A Binary-Safe RESP Request Decoder
//!
//! This is the main entry point for the FlashProxy server.
//! It sets up the TCP listener and decodes requests on every incoming
//! connection, echoing back what each request decoded to.

use clap::Parser;
use flashproxy::connection::{handle_connection, ConnectionStats, EchoHandler};
use flashproxy::protocol::decoder::{MAX_ARGUMENTS, MAX_ARGUMENT_LEN, MAX_LINE_LEN};
use flashproxy::protocol::{DecodeLimits, RequestDecoder};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Parser)]
#[command(
    name = "flashproxy",
    version,
    about = "FlashProxy - A Binary-Safe RESP Request Decoder",
    after_help = "CONNECTING:\n    $ redis-cli -p 6380\n    127.0.0.1:6380> SET name \"Ariz\"\n    1) \"set\"\n    2) \"name\"\n    3) \"Ariz\""
)]
struct Config {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = flashproxy::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = flashproxy::DEFAULT_PORT)]
    port: u16,

    /// Longest accepted header or inline line, in bytes
    #[arg(long, default_value_t = MAX_LINE_LEN, value_parser = parse_line_len)]
    max_line_len: usize,

    /// Largest accepted multibulk argument count
    #[arg(long, default_value_t = MAX_ARGUMENTS)]
    max_arguments: usize,

    /// Largest accepted argument, in bytes
    #[arg(long, default_value_t = MAX_ARGUMENT_LEN)]
    max_argument_len: usize,

    /// Seconds to wait for the next request before closing the connection
    #[arg(long)]
    idle_timeout: Option<u64>,
}

impl Config {
    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_line_len: self.max_line_len,
            max_arguments: self.max_arguments,
            max_argument_len: self.max_argument_len,
        }
    }

    fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout.map(Duration::from_secs)
    }
}

/// A line limit of zero would reject every request, so it is refused up front.
fn parse_line_len(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn print_banner(config: &Config) {
    println!(
        r#"
FlashProxy v{} - Binary-Safe RESP Request Decoder
──────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        flashproxy::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::parse();

    // Set up logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    let decoder = RequestDecoder::with_limits(config.decode_limits());
    info!(limits = ?decoder.limits(), "Request decoder configured");

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, decoder, config.idle_timeout(), Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        requests = stats.requests_decoded.load(Ordering::Relaxed),
        decode_errors = stats.decode_errors.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    decoder: RequestDecoder,
    idle_timeout: Option<Duration>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, decoder, EchoHandler, idle_timeout, stats)
                        .await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
