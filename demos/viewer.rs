//! Frame viewer client
//!
//! Run with: cargo run --example viewer [SERVER_HOST] [OUTPUT_FILE]
//!
//! Registers with the server, reassembles incoming frames and reports
//! throughput and sequence gaps. When OUTPUT_FILE is given the newest
//! frame is written there as JPEG every second. Ctrl+C unregisters.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::UdpSocket;

use framecast::protocol::constants::{
    DEFAULT_REGISTRATION_PORT, MAX_UDP_PAYLOAD, MSG_REGISTER, MSG_REGISTERED, MSG_UNREGISTER,
};
use framecast::{Fragment, Reassembler};

fn print_usage() {
    eprintln!("Usage: viewer [SERVER_HOST] [OUTPUT_FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  SERVER_HOST  Host the server is bound to (default: 127.0.0.1)");
    eprintln!("  OUTPUT_FILE  Write the newest frame here once a second");
}

async fn register(socket: &UdpSocket, server: SocketAddr) -> std::io::Result<bool> {
    let mut buf = [0u8; 64];

    for attempt in 1..=3 {
        socket.send_to(MSG_REGISTER.as_bytes(), server).await?;

        match tokio::time::timeout(Duration::from_secs(1), socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) if from == server && &buf[..n] == MSG_REGISTERED.as_bytes() => {
                return Ok(true);
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => tracing::warn!(attempt = attempt, "No reply to REGISTER"),
        }
    }

    Ok(false)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framecast=info".parse()?)
                .add_directive("viewer=debug".parse()?),
        )
        .init();

    let host: IpAddr = match args.get(1) {
        Some(h) => h.replace("localhost", "127.0.0.1").parse()?,
        None => IpAddr::from([127, 0, 0, 1]),
    };
    let output = args.get(2).map(PathBuf::from);
    let server = SocketAddr::new(host, DEFAULT_REGISTRATION_PORT);

    // Frames arrive on the socket that registered
    let socket = UdpSocket::bind(SocketAddr::new(host, 0)).await?;

    if !register(&socket, server).await? {
        eprintln!("Server at {} did not answer", server);
        std::process::exit(1);
    }
    println!("Registered with {} from {}", server, socket.local_addr()?);

    let mut reassembler = Reassembler::new();
    let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
    let mut latest: Option<Bytes> = None;
    let mut last_sequence: Option<u32> = None;
    let mut gaps = 0u64;
    let mut frames = 0u64;
    let mut bytes = 0u64;
    let mut window = Instant::now();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let received = tokio::select! {
            _ = &mut ctrl_c => break,
            r = socket.recv_from(&mut buf) => r,
        };

        let (n, _) = match received {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Receive failed");
                continue;
            }
        };

        let fragment = match Fragment::parse(Bytes::copy_from_slice(&buf[..n])) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!(error = %e, len = n, "Ignoring datagram");
                continue;
            }
        };

        if let Some(frame) = reassembler.push(fragment) {
            if let Some(prev) = last_sequence {
                let skipped = frame.sequence.wrapping_sub(prev).saturating_sub(1);
                if skipped > 0 {
                    tracing::debug!(from = prev, to = frame.sequence, "Sequence gap");
                    gaps += skipped as u64;
                }
            }
            last_sequence = Some(frame.sequence);
            frames += 1;
            bytes += frame.data.len() as u64;
            latest = Some(frame.data);
        }

        if window.elapsed() >= Duration::from_secs(1) {
            let stats = reassembler.stats();
            println!(
                "seq={} frames/s={} kB/s={} gaps={} incomplete={} stale={}",
                last_sequence.unwrap_or(0),
                frames,
                bytes / 1024,
                gaps,
                stats.incomplete_frames,
                stats.stale_fragments,
            );

            if let (Some(path), Some(jpeg)) = (&output, &latest) {
                if let Err(e) = tokio::fs::write(path, jpeg).await {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to write frame");
                }
            }

            frames = 0;
            bytes = 0;
            window = Instant::now();
        }
    }

    println!("\nUnregistering...");
    socket.send_to(MSG_UNREGISTER.as_bytes(), server).await?;

    Ok(())
}
