//! rasterlab server and CLI
//!
//! A binary exposing the transformation catalog over HTTP or applying a
//! single operation from the command line.
//!
//! # Usage
//!
//! ## CLI Mode
//! ```bash
//! rasterlab-server apply --input photo.png --output edges.png --operation morph_edge --params '{"op":"canny"}'
//! ```
//!
//! ## Server Mode
//! ```bash
//! rasterlab-server serve --port 8000
//! ```

mod cli;
mod config;
mod handlers;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "rasterlab-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Raster image transformations via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a single operation to a local image file
    Apply {
        /// Input image path
        #[arg(long, short)]
        input: PathBuf,

        /// Output image path (format chosen by extension)
        #[arg(long, short)]
        output: PathBuf,

        /// Operation identifier (e.g. grayscale, convolution, denoise)
        #[arg(long)]
        operation: String,

        /// JSON parameter object for the operation
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, short, default_value = "8000", env = "RASTERLAB_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "RASTERLAB_HOST")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    rasterlab::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            input,
            output,
            operation,
            params,
        } => {
            info!("Processing file: {}", input.display());
            cli::apply(&input, &output, &operation, &params)?;
        }
        Commands::Serve { port, host } => {
            let config = config::ServerConfig { host, port };
            info!("Starting server on {}:{}", config.host, config.port);
            server::run_server(config).await?;
        }
    }

    Ok(())
}
