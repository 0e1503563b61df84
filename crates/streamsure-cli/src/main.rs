//! StreamSure CLI: mint development tokens and inspect the moderation queue.
//!
//! API commands read STREAMSURE_API_URL and STREAMSURE_TOKEN.

use anyhow::Context;
use clap::{Parser, Subcommand};
use streamsure_api::constants::DEV_TOKEN_TTL_SECS;
use streamsure_cli::api_client::ApiClient;
use streamsure_cli::{init_tracing, mint_token, truncate_string};
use streamsure_core::models::{AssetResponse, ReviewAction, Role};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "streamsure", about = "StreamSure API CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a bearer token signed with JWT_SECRET
    Token {
        /// admin, editor or viewer
        #[arg(long, default_value = "editor")]
        role: Role,
        /// Subject id (random when omitted)
        #[arg(long)]
        subject: Option<Uuid>,
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        secret: String,
        #[arg(long, default_value_t = DEV_TOKEN_TTL_SECS)]
        ttl_secs: i64,
    },
    /// List assets visible to the token's subject
    List {
        /// Output format: json or table
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show one asset as JSON
    Show { id: Uuid },
    /// Approve or reject an asset (admin token required)
    Review {
        id: Uuid,
        /// approve or reject
        action: ReviewAction,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete an asset and its content
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Token {
            role,
            subject,
            secret,
            ttl_secs,
        } => {
            let (subject, token) = mint_token(&secret, subject, role, ttl_secs)?;
            eprintln!("subject {} ({})", subject.id, subject.role);
            println!("{}", token);
        }
        Commands::List { format } => {
            let assets = ApiClient::from_env()?.list_assets().await?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&assets)?);
            } else {
                print_table(&assets);
            }
        }
        Commands::Show { id } => {
            let asset = ApiClient::from_env()?
                .get_asset(id)
                .await
                .with_context(|| format!("Failed to fetch asset {}", id))?;
            println!("{}", serde_json::to_string_pretty(&asset)?);
        }
        Commands::Review { id, action, notes } => {
            let asset = ApiClient::from_env()?
                .review_asset(id, action, notes)
                .await?;
            println!("{} -> {}", asset.id, asset.status);
        }
        Commands::Delete { id } => {
            ApiClient::from_env()?.delete_asset(id).await?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}

fn print_table(assets: &[AssetResponse]) {
    if assets.is_empty() {
        println!("No assets found.");
        return;
    }
    println!(
        "{:<36}  {:<30}  {:<10}  {:>6}  {:>10}",
        "ID", "TITLE", "STATUS", "RISK", "SIZE"
    );
    for asset in assets {
        let risk = asset
            .risk_score
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36}  {:<30}  {:<10}  {:>6}  {:>10}",
            asset.id,
            truncate_string(&asset.title, 30),
            asset.status.to_string(),
            risk,
            asset.size
        );
    }
    println!("\n{} asset(s)", assets.len());
}
