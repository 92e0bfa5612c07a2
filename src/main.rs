//! git-updater - keep an application tree in sync with its git remote
//!
//! # Usage
//! ```bash
//! git-updater sync                      # Clone or update the tracked branch
//! git-updater latest                    # Check whether an update is available
//! git-updater log --page 0              # Show update history
//! git-updater show config/app.yml       # Print a file as committed at HEAD
//! git-updater reset 1a2b3c4             # Roll back to a commit
//! git-updater serve --port 3001         # Start the status API
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_updater::{GitService, Provider, SyncConfig, Transport, routes};

/// Keep an application tree in sync with its git remote
#[derive(Parser)]
#[command(name = "git-updater")]
#[command(about = "Self-update engine for git-deployed applications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to <WORK_DIR>/git-updater.json when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Application directory kept in sync
    #[arg(short, long, global = true, value_name = "WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Branch to track
    #[arg(short, long, global = true)]
    branch: Option<String>,

    /// Allow resets that discard local changes and commits
    #[arg(long, global = true)]
    force: bool,

    #[arg(long, global = true, value_enum)]
    provider: Option<Provider>,

    #[arg(long, global = true, value_enum)]
    transport: Option<Transport>,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone or update the tracked branch
    Sync,
    /// Check whether the local branch matches the remote
    Latest,
    /// Show a page of commit history, newest first
    Log {
        /// Zero-based page index
        #[arg(long, default_value = "0")]
        page: usize,
        #[arg(long, default_value = "10")]
        page_size: usize,
    },
    /// Print the deployed version
    Version,
    /// Print the newest stable and pre-release tags on the remote
    Tags,
    /// Print a file as committed at a revision
    Show {
        path: String,
        /// Commit, branch or tag (defaults to HEAD)
        #[arg(long = "ref", value_name = "REF")]
        rev: Option<String>,
    },
    /// Hard-reset the work directory to a revision
    Reset { rev: String },
    /// Apply the configured proxy to the repository config
    Proxy,
    /// Point the origin remote at the configured URL
    Remote,
    /// Serve the status API
    Serve {
        #[arg(short, long, default_value = "3001")]
        port: u16,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<SyncConfig> {
    let mut config = match (&cli.config, &cli.work_dir) {
        (Some(path), _) => SyncConfig::load(path)?,
        (None, Some(work_dir)) => SyncConfig::discover(work_dir)?,
        (None, None) => SyncConfig::discover(".")?,
    };

    if let Some(work_dir) = &cli.work_dir {
        config.work_dir = work_dir.clone();
    }
    if let Some(branch) = &cli.branch {
        config.branch = branch.clone();
    }
    if cli.force {
        config.force_update = true;
    }
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }

    config.validate()?;
    Ok(config)
}

fn print_progress(fraction: f32, message: &str) {
    if fraction < 0.0 {
        println!("  [....] {}", message);
    } else {
        println!("  [{:>3.0}%] {}", fraction * 100.0, message);
    }
}

fn handle_sync(service: &mut GitService) {
    let mut progress = print_progress;
    let result = service.sync(Some(&mut progress));

    if result.success {
        println!("✓ {} [{}]", result.message, result.code);
    } else {
        eprintln!("✗ {} [{}]", result.message, result.code);
        if let Some(detail) = &result.detail {
            eprintln!("  {}", detail);
        }
        std::process::exit(1);
    }
}

fn handle_log(service: &mut GitService, page: usize, page_size: usize) {
    let total = service.total_commit_count();
    let commits = service.page_commits(page, page_size);

    println!("  Page {} ({} commits total)", page, total);
    println!();
    for commit in commits {
        println!("  {}  {}  {:<16}  {}", commit.short_id, commit.commit_time, commit.author, commit.message);
    }
}

async fn serve(service: GitService, port: u16) -> anyhow::Result<()> {
    let shared = Arc::new(Mutex::new(service));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(shared))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {}: {}", port, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    println!();
    println!("  Status API: http://{}", addr);
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&cli)?;
    let mut service = GitService::new(config);

    match cli.command {
        Commands::Sync => handle_sync(&mut service),
        Commands::Latest => {
            let (latest, message) = service.is_current_branch_latest();
            if latest {
                println!("✓ Up to date");
            } else {
                println!("✗ {}", message);
            }
        }
        Commands::Log { page, page_size } => handle_log(&mut service, page, page_size),
        Commands::Version => match service.current_version() {
            Some(version) => println!("{}", version),
            None => println!("✗ No commits"),
        },
        Commands::Tags => {
            let tags = service.latest_tags();
            println!("  Stable: {}", tags.latest_stable.as_deref().unwrap_or("-"));
            println!("  Beta:   {}", tags.latest_beta.as_deref().unwrap_or("-"));
        }
        Commands::Show { path, rev } => match service.read_file_at(&path, rev.as_deref()) {
            Some(content) => print!("{}", content),
            None => {
                eprintln!("✗ {} not found at {}", path, rev.as_deref().unwrap_or("HEAD"));
                std::process::exit(1);
            }
        },
        Commands::Reset { rev } => {
            if service.reset_to_commit(&rev) {
                println!("✓ Reset to {}", rev);
            } else {
                eprintln!("✗ Failed to reset to {}", rev);
                std::process::exit(1);
            }
        }
        Commands::Proxy => {
            if !service.init_proxy() {
                eprintln!("✗ No repository at {}", service.config().work_dir.display());
                std::process::exit(1);
            }
            match service.proxy_address() {
                Some(proxy) => println!("✓ Proxy set to {}", proxy),
                None => println!("✓ Proxy cleared"),
            }
        }
        Commands::Remote => {
            if service.update_remote() {
                println!("✓ Remote set to {}", service.remote_url(false).unwrap_or_default());
            } else {
                eprintln!("✗ Failed to update remote");
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve(service, port))?;
        }
    }

    Ok(())
}
