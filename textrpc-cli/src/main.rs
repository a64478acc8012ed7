//! textrpc-cli - Command-line client for textrpc
//!
//! Runs one call given on the command line, or an interactive REPL when no
//! function is named.

mod commands;
mod repl;

use clap::Parser;
use colored::Colorize;
use textrpc_client::{Client, ConnectionConfig};
use textrpc_protocol::{DEFAULT_HOST, DEFAULT_PORT};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "textrpc-cli")]
#[command(about = "Call functions on a textrpc server")]
#[command(version)]
struct Cli {
    /// Function to call (`listdir` lists a directory); starts a REPL if omitted
    function: Option<String>,

    /// Arguments passed to the function
    #[arg(allow_negative_numbers = true)]
    args: Vec<String>,

    /// Server host
    #[arg(short = 'H', long, env = "TEXTRPC_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, env = "TEXTRPC_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// With `listdir`, list recursively through the server's ls command
    #[arg(short, long)]
    recursive: bool,

    /// Log requests and responses
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = Client::new(ConnectionConfig::new(cli.host, cli.port));

    match cli.function {
        None => repl::run(client).await?,
        Some(function) => {
            let invocation = commands::resolve_invocation(&function, cli.args, cli.recursive);
            match commands::execute(&client, &invocation).await {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
