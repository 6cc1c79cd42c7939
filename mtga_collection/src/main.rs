//! mtga-collection - MTG Arena log tooling
//!
//! Collection export, opponent cards, match history and live draw odds, all
//! read from the Arena client's Player.log.

use clap::{Parser, Subcommand};
use mtga_collection::commands::{
    self, CollectionExportArgs, MatchesIngestArgs, MatchesStatsArgs, OddsWatchArgs,
    OpponentSeenArgs,
};
use mtga_collection::journal::Journal;
use mtga_collection::{Config, Result, Settings};
use std::path::PathBuf;

/// MTG Arena log tooling
#[derive(Parser, Debug)]
#[command(name = "mtga-collection")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config profile to apply
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Directory holding config.json (default: $MTGA_CONFIG_DIR or ~/.mtga-cli)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export owned cards from Player.log as CSV or JSON
    CollectionExport(CollectionExportArgs),
    /// List cards opponents cast, played or revealed
    OpponentSeen(OpponentSeenArgs),
    /// Store match summaries from Player.log in the local datastore
    MatchesIngest(MatchesIngestArgs),
    /// Win/loss statistics by deck, queue or opponent archetype
    MatchesStats(MatchesStatsArgs),
    /// Live hypergeometric draw odds for a deck
    OddsWatch(OddsWatchArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::CollectionExport(_) => "collection-export",
            Command::OpponentSeen(_) => "opponent-seen",
            Command::MatchesIngest(_) => "matches-ingest",
            Command::MatchesStats(_) => "matches-stats",
            Command::OddsWatch(_) => "odds-watch",
        }
    }

    /// Flags that override config for this command
    fn settings(&self) -> Settings {
        match self {
            Command::OddsWatch(args) => Settings {
                seat_id: args.seat,
                poll_interval_ms: args.poll_interval,
                ..Settings::default()
            },
            Command::MatchesIngest(MatchesIngestArgs { datastore, .. })
            | Command::MatchesStats(MatchesStatsArgs { datastore, .. }) => Settings {
                datastore_path: datastore.clone(),
                ..Settings::default()
            },
            _ => Settings::default(),
        }
    }
}

async fn run(command: &Command, config: &Config) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::CollectionExport(args) => commands::collection::run(args, config, &mut out).await,
        Command::OpponentSeen(args) => commands::opponent::run(args, config, &mut out).await,
        Command::MatchesIngest(args) => commands::matches::run_ingest(args, config, &mut out).await,
        Command::MatchesStats(args) => commands::matches::run_stats(args, config, &mut out),
        Command::OddsWatch(args) => commands::odds::run(args, config, &mut out).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = Config::load(
        cli.config_dir.as_deref(),
        cli.profile.as_deref(),
        cli.command.settings(),
    );
    log::debug!("Resolved config: {:?}", config);

    let journal = Journal::from_env(&config.cache_dir);
    let span = journal.start(cli.command.name());
    let outcome = run(&cli.command, &config).await;
    span.finish(&outcome);

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
