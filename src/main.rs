use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use dnsgate::server::{self, ServerConfig};

#[derive(Parser)]
#[command(name = "dnsgate")]
#[command(about = "HTTP/1.1 gateway to the system DNS resolver", long_about = None)]
struct Args {
    /// TCP port to listen on (all interfaces)
    port: u16,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(server::run(ServerConfig::all_interfaces(args.port))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
