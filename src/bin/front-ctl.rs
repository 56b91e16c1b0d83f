use clap::{Parser, Subcommand};
use serde::Serialize;

use front_gateway::control::ControlClient;

#[derive(Parser)]
#[command(name = "front-ctl")]
#[command(about = "Control plane CLI for the front gateway", long_about = None)]
struct Cli {
    /// Control listener of the gateway.
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a backend address under a path prefix
    Update { prefix: String, url: String },
    /// Deregister a backend address from a path prefix
    Delete { prefix: String, url: String },
    /// List clusters and their endpoints
    Clusters,
    /// Show gateway status and request counter
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ControlClient::new(&cli.url);

    match cli.command {
        Commands::Update { prefix, url } => {
            client.update(&prefix, &url).await?;
            println!("registered {} under {}", url, prefix);
        }
        Commands::Delete { prefix, url } => {
            client.delete(&prefix, &url).await?;
            println!("deregistered {} from {}", url, prefix);
        }
        Commands::Clusters => print_json(&client.clusters().await?)?,
        Commands::Status => print_json(&client.status().await?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
