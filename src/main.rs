//! Bookshelf - personal book tracking service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookshelf::{
    api::{self, ApiState},
    catalog::CatalogClient,
    library::Shelf,
    session::SessionManager,
    store::RecordStore,
};

/// Personal book tracking service.
#[derive(Parser)]
#[command(name = "bookshelf", about = "Track your personal library")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API daemon.
    Daemon {
        /// Address to bind the API server.
        #[arg(long, default_value = "127.0.0.1:5000", env = "BOOKSHELF_BIND")]
        bind: String,

        /// Data directory for record storage.
        #[arg(long, env = "BOOKSHELF_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Show daemon status.
    Status {
        /// Bookshelf API URL.
        #[arg(long, env = "BOOKSHELF_API_URL", default_value = "http://localhost:5000")]
        api_url: String,
    },

    /// List the logged-in user's books.
    Books {
        /// Bookshelf API URL.
        #[arg(long, env = "BOOKSHELF_API_URL", default_value = "http://localhost:5000")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookshelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon { bind, data_dir } => {
            run_daemon(&bind, data_dir).await?;
        }

        Commands::Status { api_url } => {
            show_status(&api_url).await?;
        }

        Commands::Books { api_url } => {
            list_books(&api_url).await?;
        }
    }

    Ok(())
}

/// Default data directory when none is configured.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "bookshelf", "bookshelf")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".bookshelf"))
}

/// Run the API daemon.
async fn run_daemon(bind: &str, data_dir: Option<PathBuf>) -> Result<()> {
    tracing::info!("Starting Bookshelf daemon...");

    let data_dir = data_dir.unwrap_or_else(default_data_dir);
    let store = RecordStore::open(&data_dir)?;
    tracing::info!(data_dir = %data_dir.display(), "Record store opened");

    let shelf = Shelf::new(store.clone());

    // Restore any persisted session exactly once, before serving.
    let mut sessions = SessionManager::new(store);
    sessions.init().await?;
    if let Some(user) = sessions.current_user() {
        tracing::info!(email = %user.email, "Session restored from previous run");
    }

    let state = Arc::new(ApiState::new(shelf, sessions, CatalogClient::new()));

    api::serve(state, bind).await?;

    Ok(())
}

/// Show daemon status via API.
async fn show_status(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/status", api_url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", response.status());
    }

    let status: serde_json::Value = response.json().await?;

    println!("Bookshelf Status");
    println!("================");
    println!("Status:    {}", status["status"]);
    println!("Logged in: {}", status["logged_in"]);
    if status["logged_in"].as_bool() == Some(true) {
        println!("User:      {}", status["user_email"]);
        println!(
            "Shelf:     {} total, {} reading, {} finished",
            status["stats"]["total"], status["stats"]["reading"], status["stats"]["finished"]
        );
    }

    Ok(())
}

/// List books via API.
async fn list_books(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/books", api_url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to list books: {}", response.status());
    }

    let books: Vec<serde_json::Value> = response.json().await?;

    if books.is_empty() {
        println!("No books on the shelf.");
        return Ok(());
    }

    println!("{:<40} {:<10} {:<4}", "TITLE", "STATUS", "FAV");
    println!("{}", "-".repeat(56));

    for book in books {
        let title: String = book["title"]
            .as_str()
            .unwrap_or("?")
            .chars()
            .take(40)
            .collect();
        println!(
            "{:<40} {:<10} {:<4}",
            title,
            book["status"].as_str().unwrap_or("?"),
            if book["favourite"].as_bool() == Some(true) {
                "*"
            } else {
                ""
            }
        );
    }

    Ok(())
}
