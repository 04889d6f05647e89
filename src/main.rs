//! Entry point for `arq-over-udp`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing, exit status).

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;
use clap::{Parser, Subcommand};

use arq_over_udp::client::Session;
use arq_over_udp::config::{ClientConfig, ServerConfig};
use arq_over_udp::server::Server;
use arq_over_udp::socket::Socket;

/// Reliable ordered byte transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Listen on the fixed port and acknowledge transfer sessions.
    Server,
    /// Transfer the configured number of segments to a server.
    Client {
        /// Server IP address (e.g. 127.0.0.1).
        server_ip: String,
        /// Server UDP port.
        server_port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log filtering follows the RUST_LOG convention.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Server => {
            let server = Server::bind(ServerConfig::default()).await?;
            server.run().await;
        }
        Mode::Client {
            server_ip,
            server_port,
        } => {
            let ip: IpAddr = server_ip
                .parse()
                .with_context(|| format!("invalid server IP {server_ip:?}"))?;
            let server = SocketAddr::new(ip, server_port);

            let socket = Socket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await?;
            let session = Session::connect(socket, server, ClientConfig::default())
                .await
                .context("connection could not be established")?;
            let report = session.run().await?;
            println!("{report}");
        }
    }
    Ok(())
}
