//! Frame broadcast server
//!
//! Run with: cargo run --example broadcast_server [BIND_HOST] [FPS]
//!
//! Examples:
//!   cargo run --example broadcast_server                 # 127.0.0.1, 15 fps
//!   cargo run --example broadcast_server 0.0.0.0         # all interfaces
//!   cargo run --example broadcast_server localhost 30    # 127.0.0.1, 30 fps
//!
//! Frames come from a synthetic gradient, are tinted with the live
//! parameters and sent as JPEG to every registered client.
//!
//! ## Watching
//!
//!   cargo run --example viewer
//!
//! ## Tuning (any UDP tool works)
//!
//!   echo -n "COLOR:255,100,150" | nc -u -w1 127.0.0.1 8890
//!   echo -n "INTENSITY:0.8"     | nc -u -w1 127.0.0.1 8890
//!   echo -n "BLUR:25"           | nc -u -w1 127.0.0.1 8890

use std::net::IpAddr;
use std::time::Duration;

use framecast::{BundledServer, ServerConfig};

/// Parse the bind host, accepting "localhost"
fn parse_bind_host(arg: &str) -> Result<IpAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    normalized.parse::<IpAddr>().map_err(|_| {
        format!(
            "Invalid bind host: '{}'. Expected an IP address or 'localhost'",
            arg
        )
    })
}

fn print_usage() {
    eprintln!("Usage: broadcast_server [BIND_HOST] [FPS]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_HOST    Host to bind all three ports on (default: 127.0.0.1)");
    eprintln!("  FPS          Target frame rate (default: 15)");
    eprintln!();
    eprintln!("Ports:");
    eprintln!("  8888  frames        server -> client");
    eprintln!("  8889  registration  REGISTER / UNREGISTER");
    eprintln!("  8890  control       COLOR:r,g,b | INTENSITY:x | BLUR:n");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::default();

    if let Some(host) = args.get(1) {
        match parse_bind_host(host) {
            Ok(host) => config = config.bind(host),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    if let Some(fps) = args.get(2) {
        match fps.parse::<u32>() {
            Ok(fps) => config = config.target_fps(fps),
            Err(_) => {
                eprintln!("Error: invalid FPS '{}'", fps);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framecast=debug".parse()?)
                .add_directive("broadcast_server=debug".parse()?),
        )
        .init();

    let server = BundledServer::bundled(config).await?;
    let addrs = server.local_addrs();

    println!("Broadcasting frames from {}", addrs.frame);
    println!("Register at {}", addrs.registration);
    println!("Control at  {}", addrs.control);
    println!();

    let stats = server.stats_handle();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(5));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snap = stats.snapshot();
            println!(
                "Stats: frames={} dropped={} fps={:.1} bitrate={}kbps evicted={}",
                snap.frames_sent,
                snap.frames_dropped,
                snap.framerate(),
                snap.bitrate() / 1000,
                snap.clients_evicted,
            );
        }
    });

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    reporter.abort();
    Ok(())
}
