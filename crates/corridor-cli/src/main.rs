mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use corridor_lib::{
    build_matrices_at, find_route, load_graph, AccessMode, GraphSnapshot, LocationResolver,
    RouteStrategy, RoutingSettings,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Indoor routing over a corridor graph")]
struct Cli {
    /// Path to the SQLite graph store.
    #[arg(long, env = "CORRIDOR_DB")]
    db: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a room id, room name, node id or node name.
    Resolve {
        /// Text to resolve.
        query: String,
    },
    /// Compute the fastest walking route between two locations.
    Route {
        /// Starting location.
        #[arg(long = "from")]
        from: String,
        /// Destination location.
        #[arg(long = "to")]
        to: String,
        /// Avoid stairs; also ignores one-way corridors.
        #[arg(long)]
        step_free: bool,
        /// Allow walking one-way corridors in both directions.
        #[arg(long)]
        ignore_one_way: bool,
        /// Ignore congestion windows.
        #[arg(long)]
        no_congestion: bool,
        /// Departure time (HH:MM or HH:MM:SS); defaults to the local clock.
        #[arg(long, value_parser = parse_time)]
        at: Option<NaiveTime>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Resolve { query } => handle_resolve(&cli.db, cli.format, &query),
        Command::Route {
            from,
            to,
            step_free,
            ignore_one_way,
            no_congestion,
            at,
        } => {
            let settings = RoutingSettings {
                access: AccessMode::new(!ignore_one_way, step_free),
                use_congestion: !no_congestion,
            };
            let departure = at.unwrap_or_else(|| Local::now().time());
            handle_route(&cli.db, cli.format, &from, &to, settings, departure)
        }
    }
}

fn load(db: &Path) -> Result<GraphSnapshot> {
    load_graph(db).with_context(|| format!("failed to load graph store from {}", db.display()))
}

fn handle_resolve(db: &Path, format: OutputFormat, query: &str) -> Result<()> {
    let graph = load(db)?;
    let location = LocationResolver::new(&graph, AccessMode::standard())
        .resolve(query)
        .with_context(|| format!("could not resolve '{query}'"))?;

    match format {
        OutputFormat::Text => print!("{}", output::render_location(&location)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&location)?),
    }
    Ok(())
}

fn handle_route(
    db: &Path,
    format: OutputFormat,
    from: &str,
    to: &str,
    settings: RoutingSettings,
    departure: NaiveTime,
) -> Result<()> {
    let graph = load(db)?;
    let resolver = LocationResolver::new(&graph, settings.access);
    let start = resolver
        .resolve(from)
        .with_context(|| format!("could not resolve start '{from}'"))?;
    let target = resolver
        .resolve(to)
        .with_context(|| format!("could not resolve destination '{to}'"))?;

    let bundle = build_matrices_at(&graph, &settings, departure)
        .context("failed to build routing matrices")?;
    debug!(congested = bundle.congested(), %departure, "matrices ready");

    let route = find_route(&graph, &bundle, &start, &target).with_context(|| {
        format!(
            "no route from {} to {}",
            start.display_name, target.display_name
        )
    })?;

    if route.strategy == RouteStrategy::Stationary {
        println!("{}", output::STATIONARY_NOTICE);
        return Ok(());
    }

    match format {
        OutputFormat::Text => print!("{}", output::render_route(&graph, &route, departure)),
        OutputFormat::Json => {
            let report = output::RouteReport::new(&route, departure, bundle.congested());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|err| format!("expected HH:MM or HH:MM:SS: {err}"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
