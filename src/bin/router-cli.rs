use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Management CLI for the inference router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check router status and registry generation
    Status,
    /// List backends with status, load and queue time
    Backends,
    /// Fleet-wide statistics
    Stats,
    /// Per-region statistics
    Regions,
    /// Update one backend's status and/or load
    Update {
        id: String,
        /// healthy, degraded or down
        #[arg(long)]
        status: Option<String>,
        /// Load percentage in [0, 100]
        #[arg(long)]
        load: Option<f64>,
    },
    /// Trigger one fluctuation tick
    Fluctuate,
    /// Route a single request
    Route {
        #[arg(long)]
        model: String,
        #[arg(long, default_value_t = 1000)]
        tokens: u64,
        #[arg(long, default_value_t = 200)]
        latency: u64,
        #[arg(long, default_value = "us-east-1")]
        region: String,
        /// Required compliance tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, default_value_t = 1)]
        priority: u8,
        #[arg(long)]
        max_cost: Option<f64>,
        #[arg(long)]
        prefer_cost: bool,
        #[arg(long)]
        simulate_failure: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)).send().await?,
        Commands::Backends => client.get(format!("{}/api/backends", cli.url)).send().await?,
        Commands::Stats => client.get(format!("{}/admin/stats", cli.url)).send().await?,
        Commands::Regions => {
            client
                .get(format!("{}/admin/regions/stats", cli.url))
                .send()
                .await?
        }
        Commands::Update { id, status, load } => {
            client
                .post(format!("{}/admin/backends/{}", cli.url, id))
                .json(&json!({ "status": status, "load": load }))
                .send()
                .await?
        }
        Commands::Fluctuate => client.post(format!("{}/admin/fluctuate", cli.url)).send().await?,
        Commands::Route {
            model,
            tokens,
            latency,
            region,
            tags,
            priority,
            max_cost,
            prefer_cost,
            simulate_failure,
        } => {
            client
                .post(format!("{}/api/route", cli.url))
                .json(&json!({
                    "model": model,
                    "token_size": tokens,
                    "required_latency": latency,
                    "user_region": region,
                    "compliance_tags": tags,
                    "priority": priority,
                    "max_cost": max_cost,
                    "prefer_cost": prefer_cost,
                    "simulate_failure": simulate_failure,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await?;
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        let body: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("Error: {}", status);
        let text = res.text().await?;
        println!("{}", text);
    }
    Ok(())
}
