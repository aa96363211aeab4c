use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use engagement_dashboard::api::{self, AppState};
use engagement_dashboard::backend::{AnalysisClient, AnalysisContext};
use engagement_dashboard::config::AppConfig;
use engagement_dashboard::data::load_frames_csv;
use engagement_dashboard::database::Database;
use engagement_dashboard::model::CategorySet;

#[derive(Parser)]
#[command(name = "engagement-dashboard", about = "Student engagement dashboard API")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "ENGAGEMENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Summarize a CSV of per-frame engagement labels and print the report
    Summarize {
        path: PathBuf,
        /// Track Neutral as a third category
        #[arg(long)]
        neutral: bool,
    },
}

async fn start_api(config: AppConfig) -> Result<()> {
    let db = Database::connect(&config.database_url)
        .await
        .context("opening database")?;
    let client = AnalysisClient::new(&config.backend_url).context("building analysis client")?;
    let state = web::Data::new(AppState {
        db,
        client,
        categories: config.categories(),
        heatmap_bucket: config.heatmap_bucket,
    });

    info!("Analysis backend at {}", config.backend_url);
    info!("Tracking categories: {:?}", config.categories().iter().collect::<Vec<_>>());
    info!("Starting Student Engagement Dashboard API on http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("binding {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}

fn summarize_file(path: &PathBuf, neutral: bool, heatmap_bucket: usize) -> Result<()> {
    let frames = load_frames_csv(path).with_context(|| format!("loading {}", path.display()))?;
    info!("Loaded {} frames from {}", frames.len(), path.display());

    let context = AnalysisContext::new(CategorySet::from_flag(neutral), heatmap_bucket);
    let report = context.report(&frames);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => start_api(config).await,
        Command::Summarize { path, neutral } => summarize_file(&path, neutral, config.heatmap_bucket),
    }
}
