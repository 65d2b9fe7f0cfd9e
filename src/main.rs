use clap::{Parser, Subcommand};
use food_aggregator::cache::RequestCache;
use food_aggregator::common::constants::DEFAULT_CONFIG_PATH;
use food_aggregator::config::{Config, Credentials};
use food_aggregator::infra::http_client::ReqwestHttp;
use food_aggregator::observability::{logging, metrics};
use food_aggregator::pipeline::AggregatePipeline;
use food_aggregator::repl::{Flow, Session};
use food_aggregator::storage::RestaurantStore;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "food_aggregator")]
#[command(about = "Restaurant ratings aggregated from Yelp and Google Places")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive prompt (default)
    Repl,
    /// Fetch, reconcile and store data for one city
    City {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Show a report for the stored city, e.g. `display ratings categories scatter`
    Display {
        #[arg(required = true, num_args = 1..)]
        keywords: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenv::dotenv().ok();
    logging::init_logging();
    metrics::init_metrics();

    let config = Config::load_from(&cli.config)?;
    let pipeline = match Credentials::from_env() {
        Ok(credentials) => {
            let pipeline = AggregatePipeline::from_config(&config, &credentials);
            info!(policy = pipeline.policy_name(), "Pipeline ready");
            Some(pipeline)
        }
        Err(e) => {
            warn!("City lookups disabled: {}", e);
            None
        }
    };

    let cache = RequestCache::load(&config.cache_path);
    let http = ReqwestHttp::new(config.request_timeout())?;
    let store = RestaurantStore::open(&config.database_path)?;
    let mut session = Session::new(cache, Box::new(http), pipeline, store, config.top_categories)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    let flow = match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            session.run(&mut input, &mut stdout)?;
            Flow::Exit
        }
        Commands::City { name } => {
            session.handle_line(&format!("city {}", name.join(" ")), &mut input, &mut stdout)?
        }
        Commands::Display { keywords } => session.handle_line(
            &format!("display {}", keywords.join(" ")),
            &mut input,
            &mut stdout,
        )?,
    };
    stdout.flush()?;

    if let Some(snapshot) = metrics::render() {
        debug!(snapshot = %snapshot, "Metrics at exit");
    }
    if flow == Flow::Failed {
        anyhow::bail!("command failed");
    }
    Ok(())
}
