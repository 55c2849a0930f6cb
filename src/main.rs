//! Room chat server - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roomchat::{handle_connection_with_buffer, ChatServer, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=roomchat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomchat=info")),
        )
        .init();

    // Panics are logged through tracing; in-flight state is not recovered
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic: {}", panic_info);
    }));

    let config = Config::from_env();

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Room chat server listening on {}", config.bind_addr);

    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let server = ChatServer::new(cmd_rx).with_status_interval(config.status_interval);
    tokio::spawn(server.run());

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let outbound_buffer = config.outbound_buffer;

                tokio::spawn(async move {
                    let result =
                        handle_connection_with_buffer(stream, cmd_tx, outbound_buffer).await;
                    if let Err(e) = result {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
