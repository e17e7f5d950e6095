use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stock_fundamentals::api::CsvDirectoryProvider;
use stock_fundamentals::batch::{build_panels, score_symbols};
use stock_fundamentals::dataset::{load_panels, prepare};
use stock_fundamentals::models::{Config, ScoreCard};
use stock_fundamentals::panel::PanelBuilder;
use stock_fundamentals::report::{write_score_raw, write_score_summary};
use stock_fundamentals::scoring::{group_by_tier, ScoringConfig};
use stock_fundamentals::utils::parse_symbol_list;

/// Fundamental scoring and quarterly panel builder
#[derive(Parser)]
#[command(name = "stock-fundamentals")]
#[command(version = "0.1.0")]
#[command(about = "Build quarterly fundamental panels, score companies and prepare training data")]
#[command(long_about = "
Reads statement, price and dividend exports from a data directory (one folder per
symbol), then either builds a quarterly panel per symbol with a forward-return label,
scores companies with a fixed fundamental rubric and a dividend-discount fair price,
or stacks persisted panels into a chronologically split training set.

Settings come from the environment (.env is honoured) and can be overridden by flags.

Examples:
  stock-fundamentals panel --symbols KO,PEP --horizon 1
  stock-fundamentals score --symbols VZ,JNJ,PFE
  stock-fundamentals dataset --input output --train-fraction 0.8
")]
struct Args {
    /// Directory holding one sub-directory of CSV exports per symbol
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Directory the CSV reports are written to
    #[arg(long, global = true)]
    output_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and save quarterly panels
    Panel {
        /// Comma separated symbols (prompted for when neither this nor SYMBOLS is set)
        #[arg(long, short = 's')]
        symbols: Option<String>,

        /// Quarters to look ahead for the label
        #[arg(long)]
        horizon: Option<usize>,

        /// Most recent price quarters to keep (0 keeps all)
        #[arg(long)]
        price_quarters: Option<usize>,
    },
    /// Score companies and estimate a fair price
    Score {
        /// Comma separated symbols (prompted for when neither this nor SYMBOLS is set)
        #[arg(long, short = 's')]
        symbols: Option<String>,

        /// Trailing window in fiscal years
        #[arg(long)]
        window: Option<usize>,

        /// Print score cards as JSON as well
        #[arg(long)]
        json: bool,
    },
    /// Stack saved panels into a train/test split
    Dataset {
        /// Directory with quarterly_panel_*.csv files (defaults to the output directory)
        #[arg(long)]
        input: Option<String>,

        #[arg(long, default_value_t = 0.8)]
        train_fraction: f64,
    },
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stock_fundamentals=info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }

    match args.command {
        Commands::Panel { symbols, horizon, price_quarters } => {
            if let Some(h) = horizon {
                config.horizon = h;
            }
            if let Some(n) = price_quarters {
                config.price_quarters = (n > 0).then_some(n);
            }
            config.validate()?;
            let symbols = resolve_symbols(symbols, &config)?;
            run_panels(&config, &symbols)
        }
        Commands::Score { symbols, window, json } => {
            if let Some(w) = window {
                config.score_window_years = w;
            }
            config.validate()?;
            let symbols = resolve_symbols(symbols, &config)?;
            run_scoring(&config, &symbols, json)
        }
        Commands::Dataset { input, train_fraction } => {
            let dir = PathBuf::from(input.unwrap_or_else(|| config.output_dir.clone()));
            run_dataset(&dir, train_fraction)
        }
    }
}

/// Flag first, then SYMBOLS from the environment, then an interactive prompt
fn resolve_symbols(flag: Option<String>, config: &Config) -> Result<Vec<String>> {
    if let Some(list) = flag {
        return non_empty(parse_symbol_list(&list));
    }
    if std::env::var("SYMBOLS").is_ok() {
        return non_empty(config.symbols.clone());
    }
    let input = prompt("Please input stock symbols (comma separated, empty for defaults): ")?;
    if input.trim().is_empty() {
        return non_empty(config.symbols.clone());
    }
    non_empty(parse_symbol_list(&input))
}

fn non_empty(symbols: Vec<String>) -> Result<Vec<String>> {
    if symbols.is_empty() {
        return Err(anyhow!("No symbols given"));
    }
    Ok(symbols)
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

fn run_panels(config: &Config, symbols: &[String]) -> Result<()> {
    let provider = CsvDirectoryProvider::new(&config.data_dir);
    let builder = PanelBuilder::new(config.horizon).with_price_quarters(config.price_quarters);
    let output_dir = PathBuf::from(&config.output_dir);

    let outcome = build_panels(&provider, symbols, &builder, Some(&output_dir));

    println!("{}", "=".repeat(60));
    for table in &outcome.succeeded {
        let labelled = table.rows.iter().filter(|r| r.target_up.is_some()).count();
        println!("📊 {:<6} {:>3} quarters, {:>3} labelled", table.symbol, table.len(), labelled);
    }
    for (symbol, message) in &outcome.failed {
        println!("❌ {:<6} {}", symbol, message);
    }
    println!("{}", "=".repeat(60));

    if outcome.succeeded.is_empty() {
        error!("No panels were built");
        return Err(anyhow!("No panels were built"));
    }
    Ok(())
}

fn run_scoring(config: &Config, symbols: &[String], json: bool) -> Result<()> {
    let provider = CsvDirectoryProvider::new(&config.data_dir);
    let scoring_config = ScoringConfig {
        window_years: config.score_window_years,
        target_dividend_yield: config.target_dividend_yield,
    };

    let outcome = score_symbols(&provider, symbols, &scoring_config);
    if outcome.succeeded.is_empty() {
        println!("No stock data could be scored");
        return Ok(());
    }

    let cards: Vec<ScoreCard> = outcome.succeeded.iter().map(|r| r.card.clone()).collect();
    let groups = group_by_tier(&cards);

    println!("{}", "-".repeat(50));
    println!("Tier A (score >= 5, discount 8%): {:?}", groups.a);
    println!("Tier B (score >= 3, discount 10%): {:?}", groups.b);
    println!("Tier C (score < 3, discount 12%): {:?}", groups.c);
    println!("Trading below fair price: {:?}", groups.below_fair);
    println!("{}", "-".repeat(50));

    if json {
        println!("{}", serde_json::to_string_pretty(&cards)?);
    }

    let name = outcome
        .succeeded
        .iter()
        .map(|r| r.card.symbol.as_str())
        .collect::<Vec<_>>()
        .join("_");
    let out = PathBuf::from(&config.output_dir);
    let summary_path = out.join(format!("score_summary_{}.csv", name));
    let raw_path = out.join(format!("score_raw_{}.csv", name));
    write_score_summary(&cards, &summary_path)?;
    write_score_raw(&outcome.succeeded, &raw_path)?;

    info!("Scores saved to {} and {}", summary_path.display(), raw_path.display());
    Ok(())
}

fn run_dataset(dir: &std::path::Path, train_fraction: f64) -> Result<()> {
    let panels = load_panels(dir).with_context(|| format!("Failed to load panels from {}", dir.display()))?;
    let set = prepare(&panels, train_fraction);
    if set.is_empty() {
        return Err(anyhow!("No labelled rows found in {}", dir.display()));
    }

    println!("Rows: {}, features: {}", set.len(), set.columns.len());
    println!("Train: {} rows, test: {} rows", set.train.len(), set.test.len());
    if let Some(rate) = set.train_positive_rate() {
        println!("Share of 'up' labels in training block: {:.1}%", rate * 100.0);
    }
    if let (Some(first), Some(last)) = (set.train.first(), set.test.last().or(set.train.last())) {
        println!("Quarters covered: {} to {}", first.quarter_end, last.quarter_end);
    }
    Ok(())
}
