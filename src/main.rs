use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use geodemo::catalog::Demo;
use geodemo::common;
use geodemo::engine::{QueryEngine, ScriptedEngine};
use geodemo::executor::QueryExecutor;
use geodemo::ingest::{self, HttpFetcher};
use geodemo::map::InMemoryMap;
use geodemo::output::PaneContent;
use geodemo::toggle::ToggleOutcome;
use geodemo::{AppConfig, DemoReport, DemoSession};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(short, long, global = true, default_value = "geodemo.yaml")]
    config: String,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct EngineArgs {
    /// Use the scripted engine: SQL is shown but returns no rows
    #[clap(long)]
    offline: bool,
    /// Skip loading the remote GeoJSON files
    #[clap(long)]
    no_remote: bool,
    /// Write the resulting map as a MapLibre style document
    #[clap(long)]
    map_out: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init,
    /// List the demos
    Demos,
    Run {
        demo: String,
        /// Buffer radius in meters
        #[clap(long)]
        radius: Option<f64>,
        #[clap(flatten)]
        engine: EngineArgs,
    },
    All {
        #[clap(flatten)]
        engine: EngineArgs,
    },
    Sql {
        query: String,
        #[clap(flatten)]
        engine: EngineArgs,
    },
    Toggle {
        #[clap(required = true)]
        datasets: Vec<String>,
        #[clap(flatten)]
        engine: EngineArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config_path = Path::new(&args.config);
    match args.command {
        Commands::Init => {
            info!("Initializing config: {}", args.config);
            let serialized = AppConfig::default().to_yaml()?;
            common::write_string_to_file(&args.config, &serialized)?;
        }
        Commands::Demos => {
            for demo in Demo::all() {
                println!("{:<14} {}", demo.to_string().bold(), demo.title());
            }
        }
        Commands::Run {
            demo,
            radius,
            engine,
        } => {
            let mut config = AppConfig::load_or_default(config_path)?;
            if let Some(radius) = radius {
                config.demos.buffer_radius_m = radius;
            }
            let session = open_session(config, &engine).await?;
            let report = session.run_named(&demo).await?;
            print_report(&session, &report).await;
            write_map(&session, &engine).await?;
        }
        Commands::All { engine } => {
            let config = AppConfig::load_or_default(config_path)?;
            let session = open_session(config, &engine).await?;
            for report in session.run_all().await? {
                print_report(&session, &report).await;
            }
            write_map(&session, &engine).await?;
        }
        Commands::Sql { query, engine } => {
            let config = AppConfig::load_or_default(config_path)?;
            let session = open_session(config, &engine).await?;
            let content = session.run_custom(&query).await;
            print_content(&content);
        }
        Commands::Toggle { datasets, engine } => {
            let config = AppConfig::load_or_default(config_path)?;
            let session = open_session(config, &engine).await?;
            for name in &datasets {
                match session.toggle(name).await? {
                    ToggleOutcome::Loaded { dataset, features } => {
                        println!("{} {} ({} features)", "loaded".green(), dataset, features)
                    }
                    ToggleOutcome::Removed { dataset } => {
                        println!("{} {}", "removed".yellow(), dataset)
                    }
                    ToggleOutcome::Failed { dataset, message } => {
                        println!("{} {}: {}", "failed".red(), dataset, message)
                    }
                }
            }
            write_map(&session, &engine).await?;
        }
    }

    Ok(())
}

type Session = DemoSession<dyn QueryEngine, InMemoryMap>;

async fn open_session(config: AppConfig, args: &EngineArgs) -> Result<Session> {
    let engine = open_engine(&config, args).await?;
    let map = InMemoryMap::new(config.map.center, config.map.zoom);
    Ok(DemoSession::new(engine, map, config))
}

async fn open_engine(config: &AppConfig, args: &EngineArgs) -> Result<Arc<dyn QueryEngine>> {
    let engine = if args.offline {
        info!("Using the offline scripted engine");
        Arc::new(ScriptedEngine::new()) as Arc<dyn QueryEngine>
    } else {
        duckdb_engine(config).await?
    };

    ingest::seed(engine.as_ref()).await?;
    let summary = QueryExecutor::new(Arc::clone(&engine))
        .execute_and_show(ingest::SEED_SUMMARY_SQL)
        .await;
    info!("Seed tables:\n{}", summary);

    if !args.offline && !args.no_remote {
        let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
        let report = ingest::ingest_remote(engine.as_ref(), &fetcher, &config.data).await;
        info!(
            "Remote data: {} tables loaded, {} skipped",
            report.loaded.len(),
            report.skipped.len()
        );
    }
    Ok(engine)
}

#[cfg(feature = "duckdb")]
async fn duckdb_engine(config: &AppConfig) -> Result<Arc<dyn QueryEngine>> {
    use geodemo::engine::DuckDbEngine;

    let engine = match &config.database.path {
        Some(path) => DuckDbEngine::open(path)?,
        None => DuckDbEngine::open_in_memory()?,
    };
    engine.load_extensions(&config.database.extensions).await?;
    Ok(Arc::new(engine))
}

#[cfg(not(feature = "duckdb"))]
async fn duckdb_engine(_config: &AppConfig) -> Result<Arc<dyn QueryEngine>> {
    anyhow::bail!("built without the duckdb feature, use --offline")
}

async fn print_report(session: &Session, report: &DemoReport) {
    println!(
        "{} {}",
        format!("== {} ==", report.demo).bold(),
        report.demo.title()
    );
    let panes = session.panes().await;
    if let Some(sql) = panes.get(&report.demo.pane()).and_then(|p| p.sql.as_deref()) {
        println!("{}", sql.dimmed());
    }
    print_content(&report.content);
    if !report.applied {
        warn!("{} was superseded before it finished", report.demo);
    }
    println!();
}

fn print_content(content: &PaneContent) {
    match content {
        PaneContent::Error(_) => println!("{}", content.to_string().red()),
        PaneContent::Empty => println!("{}", content.to_string().yellow()),
        PaneContent::Table(_) => println!("{}", content),
    }
}

async fn write_map(session: &Session, args: &EngineArgs) -> Result<()> {
    let Some(path) = &args.map_out else {
        return Ok(());
    };
    let style = session.with_map(|map| map.to_style_json()).await;
    common::write_string_to_file(path, &serde_json::to_string_pretty(&style)?)?;
    println!("{} {}", "map written to".green(), path);
    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "handlebars=off,reqwest=warn,{}",
            log_level
        )))
        .without_time()
        .init();
}
