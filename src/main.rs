//! anki-mcp - MCP server exposing Anki flashcards to AI tools.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use anki_mcp::anki::AnkiClient;
use anki_mcp::config::Config;
use anki_mcp::error::Error;
use anki_mcp::http;
use anki_mcp::mcp::McpServer;

#[derive(Parser)]
#[command(name = "anki-mcp")]
#[command(about = "MCP server exposing Anki flashcards to AI tools via AnkiConnect")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio (default)
    Mcp,

    /// Run the streaming HTTP transport (SSE + REST)
    Serve {
        /// Bind address, e.g. 127.0.0.1:3030
        #[arg(long)]
        bind: Option<String>,
    },

    /// Check that AnkiConnect is reachable
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Logs go to stderr: stdout is the MCP wire in stdio mode.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("anki_mcp=info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        None | Some(Commands::Mcp) => {
            let server = McpServer::new(&config)?;
            server.run_stdio().await?;
        }
        Some(Commands::Serve { bind }) => {
            let mut config = config;
            if let Some(bind) = bind {
                config.http.bind = bind;
            }
            http::serve(config).await?;
        }
        Some(Commands::Status) => {
            let client = AnkiClient::new(&config.ankiconnect)?;
            match client.version().await {
                Ok(version) => {
                    println!("✅ AnkiConnect v{} at {}", version, client.url());
                }
                Err(e) => {
                    eprintln!("❌ AnkiConnect unreachable at {}: {}", client.url(), e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
