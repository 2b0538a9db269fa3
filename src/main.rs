use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use okr_tracker::api;
use okr_tracker::config::AppConfig;
use okr_tracker::db::Database;
use okr_tracker::engine::{AppState, Request, Store};
use okr_tracker::services::Services;

#[derive(Parser)]
#[command(name = "okrt")]
#[command(about = "Objectives, areas and time frames, reconciled")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the engine over HTTP
    Serve {
        /// Port for HTTP API (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize and print the resulting state as JSON
    Init,
    /// Print a one-line summary of what is stored
    Status,
    /// Print the effective configuration
    Config {
        /// Write it to the user config file
        #[arg(long)]
        save: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "okr_tracker=debug,tower_http=debug".into()),
    );

    // Logs go to stderr so `init` output stays machine readable.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    let db = match &config.database_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;

    if db.get_project_name()?.is_none() {
        db.set_project_name(&config.project_name)?;
    }
    Ok(db)
}

/// Start an engine and run initialization to completion.
async fn start_initialized(config: &AppConfig) -> anyhow::Result<(Store, std::sync::Arc<AppState>)> {
    let db = open_database(config)?;
    let store = Store::start(Services::sqlite(db));

    store.dispatch(Request::GetProjectName)?;
    store.dispatch(Request::Initialize)?;
    let state = store
        .wait_until(|s| s.initialized || s.pending_error.is_some())
        .await?;

    if let Some(time_frame_id) = state.displayed_time_frame_id {
        store.dispatch(Request::GetObjectives(time_frame_id))?;
    }
    Ok((store, state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::load();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.port);
            tracing::info!("Starting okr-tracker on port {}", port);

            let (store, _) = start_initialized(&config).await?;
            let app = api::create_router(store);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("okr-tracker listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Init => {
            let (store, state) = start_initialized(&config).await?;
            let state = match state.displayed_time_frame_id {
                Some(id) => {
                    store
                        .wait_until(|s| {
                            s.loaded_objectives_for == Some(id) || s.pending_error.is_some()
                        })
                        .await?
                }
                None => state,
            };
            println!("{}", serde_json::to_string_pretty(&*state)?);
        }
        Commands::Status => {
            let (_store, state) = start_initialized(&config).await?;
            match &state.pending_error {
                Some(error) => println!("error: {}", error),
                None => println!(
                    "{} area(s), {} time frame(s), displaying {}",
                    state.areas.len(),
                    state.time_frames.len(),
                    state
                        .displayed_time_frame()
                        .map(|tf| tf.name.as_str())
                        .unwrap_or("nothing"),
                ),
            }
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save()?;
            }
        }
    }

    Ok(())
}
