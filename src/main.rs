//! aprender-basket CLI: association rule mining over service purchase logs.

use aprender_basket::{
    basket::ItemId,
    config::{ConfigOverrides, MiningConfig},
    data::load_observations,
    mining::{AssociationRule, Itemset, RuleMetric},
    pipeline::BasketAnalysis,
    BasketError,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aprender-basket")]
#[command(about = "Monthly basket association rules and service recommendations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine frequent itemsets and association rules from a purchase log
    Mine {
        #[command(flatten)]
        mining: MiningArgs,

        /// Number of itemsets and rules to print (0 prints all)
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Recommend services for a purchased service
    Recommend {
        #[command(flatten)]
        mining: MiningArgs,

        /// Purchased item as <service_id>_<category_id>, e.g. 2_0
        #[arg(short, long)]
        item: String,

        /// Number of recommendations (overrides config)
        #[arg(short, long)]
        top: Option<usize>,
    },
}

#[derive(Args)]
struct MiningArgs {
    /// Purchase log CSV (UserId,ServiceId,CategoryId,CreateDate)
    input: PathBuf,

    /// TOML file with mining parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum itemset support, in (0, 1]
    #[arg(long)]
    min_support: Option<f64>,

    /// Rule filter metric: support, confidence or lift
    #[arg(long)]
    metric: Option<RuleMetric>,

    /// Minimum value of the rule filter metric
    #[arg(long)]
    min_threshold: Option<f64>,

    /// Maximum itemset size
    #[arg(long)]
    max_len: Option<usize>,
}

/// JSON output of `mine`.
#[derive(Serialize)]
struct MineReport {
    config: MiningConfig,
    n_baskets: usize,
    n_items: usize,
    itemsets: Vec<Itemset>,
    rules: Vec<AssociationRule>,
}

impl MiningArgs {
    fn load_config(&self, top_n: Option<usize>) -> Result<MiningConfig, BasketError> {
        let overrides = ConfigOverrides {
            min_support: self.min_support,
            metric: self.metric,
            min_threshold: self.min_threshold,
            top_n,
            max_len: self.max_len,
        };
        MiningConfig::load(self.config.as_deref(), overrides)
    }

    fn run(&self, config: &MiningConfig) -> Result<BasketAnalysis, BasketError> {
        let observations = load_observations(&self.input)?;
        if observations.is_empty() {
            return Err(BasketError::empty_input(&format!(
                "no records in {}",
                self.input.display()
            )));
        }
        info!(records = observations.len(), input = %self.input.display(), "purchase log loaded");
        BasketAnalysis::run(&observations, config)
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Mine {
            mining,
            limit,
            json,
        } => cmd_mine(&mining, limit, json),
        Commands::Recommend { mining, item, top } => cmd_recommend(&mining, &item, top),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}

/// Log to stderr; stdout carries results only.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(err: &BasketError) -> ExitCode {
    match err {
        BasketError::InvalidParameter { .. } | BasketError::Config(_) => ExitCode::from(2),
        BasketError::Io { .. } => ExitCode::from(3),
        BasketError::MalformedObservation { .. } | BasketError::Csv(_) => ExitCode::from(4),
        BasketError::EmptyInput { .. } => ExitCode::from(5),
        BasketError::DegenerateRule { .. } | BasketError::Serialization(_) => ExitCode::from(1),
    }
}

fn take<T>(items: &[T], limit: usize) -> &[T] {
    if limit == 0 {
        items
    } else {
        &items[..limit.min(items.len())]
    }
}

fn cmd_mine(mining: &MiningArgs, limit: usize, json: bool) -> Result<(), BasketError> {
    let config = mining.load_config(None)?;
    let start = Instant::now();
    let analysis = mining.run(&config)?;
    let elapsed = start.elapsed();

    let itemsets = analysis.itemsets().sorted_by_support();
    let rules = analysis.rules();

    if json {
        let report = MineReport {
            config: *analysis.config(),
            n_baskets: analysis.matrix().n_rows(),
            n_items: analysis.matrix().n_cols(),
            itemsets: take(&itemsets, limit).to_vec(),
            rules: take(rules, limit).to_vec(),
        };
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| BasketError::Serialization(e.to_string()))?;
        println!("{out}");
        return Ok(());
    }

    println!("Association Rule Mining");
    println!("=======================");
    print_summary(&mining.input, &analysis, elapsed.as_secs_f64());
    println!();

    println!("Frequent Itemsets (by support)");
    println!("------------------------------");
    print_itemsets(take(&itemsets, limit));
    println!();

    println!("Rules (by lift)");
    println!("---------------");
    for rule in take(rules, limit) {
        println!("  {rule}");
    }
    if rules.is_empty() {
        println!("  (none)");
    }

    Ok(())
}

fn print_summary(input: &Path, analysis: &BasketAnalysis, secs: f64) {
    let config = analysis.config();
    let (rows, cols) = analysis.matrix().shape();
    println!("Input:          {}", input.display());
    println!("Observations:   {}", analysis.baskets().n_observations());
    println!("Baskets:        {rows}");
    println!("Items:          {cols}");
    println!("Min support:    {}", config.min_support);
    println!("Rule filter:    {} >= {}", config.metric, config.min_threshold);
    println!("Itemsets:       {}", analysis.itemsets().len());
    println!("Rules:          {}", analysis.rules().len());
    println!("Mining time:    {secs:.2}s");
}

fn print_itemsets(itemsets: &[Itemset]) {
    for set in itemsets {
        let items: Vec<String> = set.items.iter().map(ToString::to_string).collect();
        println!("  {:.5}  {{{}}}", set.support, items.join(", "));
    }
    if itemsets.is_empty() {
        println!("  (none)");
    }
}

fn cmd_recommend(mining: &MiningArgs, item: &str, top: Option<usize>) -> Result<(), BasketError> {
    let query: ItemId = item.parse()?;
    let config = mining.load_config(top)?;
    let analysis = mining.run(&config)?;

    let recs = analysis.recommend(&query)?;
    if recs.is_empty() {
        info!(item = %query, "no rule has this item in its antecedent");
    }
    for rec in recs {
        println!("{rec}");
    }
    Ok(())
}
