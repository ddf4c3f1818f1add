use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pizza_restaurant_service::{
    app, db::LEGACY_DATABASE_URL_ENV, establish_pool, resolve_database_url, run_migrations,
    seed::seed, AppState, DbConnection, DbPool, DEFAULT_BIND_ADDRESS,
};

#[derive(Parser)]
#[command(version)]
struct Cli {
    /// SQLite path or URL; `DB_URI` is read when `DATABASE_URL` is unset
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "BIND_ADDRESS", default_value = DEFAULT_BIND_ADDRESS)]
        bind: SocketAddr,
        #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 8)]
        pool_size: u32,
    },
    /// Apply pending migrations and exit
    Migrate,
    /// Replace all rows with the sample dataset
    Seed,
}

fn migrated_pool(
    database_url: &str,
    pool_size: u32,
) -> Result<DbPool, Box<dyn std::error::Error>> {
    let pool = establish_pool(database_url, pool_size)?;
    let mut conn: DbConnection = pool.get()?;
    run_migrations(&mut conn)?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let database_url = resolve_database_url(
        cli.database_url,
        std::env::var(LEGACY_DATABASE_URL_ENV).ok(),
    );
    match cli.command {
        Commands::Serve { bind, pool_size } => {
            let pool = migrated_pool(&database_url, pool_size)?;
            let listener = tokio::net::TcpListener::bind(bind).await?;
            info!("listening on {}", listener.local_addr()?);

            axum::serve(listener, app(AppState::new(pool)))
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Migrate => {
            migrated_pool(&database_url, 1)?;
        }
        Commands::Seed => {
            let pool = migrated_pool(&database_url, 1)?;
            let mut conn: DbConnection = pool.get()?;
            seed(&mut conn)?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("received Ctrl+C, shutting down"),
        _ = terminate => warn!("received SIGTERM, shutting down"),
    }
}
