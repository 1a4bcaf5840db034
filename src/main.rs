use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nest_egg::api::format::Currency;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "nest-egg",
    about = "Accumulation and fixed-withdrawal retirement projections"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one plan and print the JSON response.
    Plan {
        #[arg(
            long,
            help = "JSON plan payload; read from stdin when omitted, blank input runs the defaults"
        )]
        input: Option<PathBuf>,
        #[arg(long, value_enum, help = "Display currency; overrides the payload's")]
        currency: Option<Currency>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Serve { port } => nest_egg::api::run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Plan { input, currency } => read_input(input)
            .and_then(|json| nest_egg::api::render_plan_json(&json, currency))
            .map(|rendered| println!("{rendered}")),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn read_input(path: Option<PathBuf>) -> Result<String, String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}
