// CLI entry point for the gomoku relay.
//
// Starts a standalone relay server that two game peers connect to. The
// relay owns the board, validates moves, and broadcasts authoritative
// results. See `server.rs` for the networking architecture and
// `coordinator.rs` for the game coordination.
//
// Usage:
//   relay [OPTIONS]
//     --port <PORT>    Listen port (default: 10000)

use tracing_subscriber::EnvFilter;

use gomoku_relay::server::{RelayConfig, start_relay};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = parse_args();

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    println!("Relay listening on {addr}");
    println!("Press Enter to stop.");

    // Block until stdin yields a line or closes. Ctrl+C still terminates
    // the process directly, tearing the relay threads down with it.
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    println!("Shutting down...");
    handle.stop();
}

/// Parse command-line arguments into a `RelayConfig`. Uses simple
/// `std::env::args()` matching — no clap dependency.
fn parse_args() -> RelayConfig {
    let mut config = RelayConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>    Listen port (default: 10000)");
    println!("  --help, -h       Show this help");
}
