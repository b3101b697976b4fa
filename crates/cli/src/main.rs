use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wikigraph_annotate::{LinkOverlapScorer, QueryResolver};
use wikigraph_codec::{LabelRecord, LinkLocation, PageId, PageLabel, StructureNode, Translation};
use wikigraph_graph::{
    LinkDirection, LoadMode, Loader, Page, StructureQuery, TableName, WarmUpReport, Wikipedia,
};
use wikigraph_store::StoreDir;

mod config;

use config::WikigraphConfig;

#[derive(Parser)]
#[command(name = "wikigraph")]
#[command(about = "Build and query a Wikipedia link graph", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store directory (one sub-directory per table)
    #[arg(long, global = true, default_value = "wikigraph-store")]
    store: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load tab-separated relation files into the store
    Build(BuildArgs),

    /// Show available tables and corpus statistics
    Stats,

    /// Show a page by id or title
    Page(PageArgs),

    /// Show a label's statistics and senses
    Label(LabelArgs),

    /// List a page's links with sentence positions
    Links(LinksArgs),

    /// Show a page's section/paragraph tree
    Structure(StructureArgs),

    /// Resolve a free-text query to pages
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Directory holding page.tsv, label.tsv, ...
    #[arg(long)]
    data: PathBuf,

    /// Rebuild tables that already exist
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args)]
struct PageArgs {
    /// Page id, or a title when not numeric
    page: String,
}

#[derive(Args)]
struct LabelArgs {
    text: String,
}

#[derive(Args)]
struct LinksArgs {
    id: PageId,

    /// Link direction: in|out
    #[arg(long, default_value = "in")]
    direction: LinkDirection,
}

#[derive(Args)]
struct StructureArgs {
    id: PageId,

    /// Also report the section and sentence enclosing this character offset
    #[arg(long)]
    at: Option<i32>,
}

#[derive(Args)]
struct ResolveArgs {
    query: String,

    /// Minimum prior probability for a sense to be considered
    #[arg(long)]
    min_prior: Option<f64>,

    /// Cache the configured tables before resolving
    #[arg(long)]
    warm: bool,

    /// Treat the whole query as a single label
    #[arg(long)]
    simple: bool,
}

#[derive(Serialize)]
struct StatsOutput {
    root: PathBuf,
    tables: Vec<TableName>,
    page_estimate: u64,
    statistics: BTreeMap<String, i64>,
}

#[derive(Serialize)]
struct PageOutput {
    page: Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirects_to: Option<Page>,
    parent_categories: Vec<PageId>,
    redirects: Vec<PageId>,
    translations: Vec<Translation>,
    labels: Vec<PageLabel>,
}

#[derive(Serialize)]
struct LabelOutput {
    text: String,
    link_probability: f64,
    #[serde(flatten)]
    label: LabelRecord,
}

#[derive(Serialize)]
struct LinksOutput {
    id: PageId,
    direction: LinkDirection,
    links: Vec<LinkLocation>,
}

#[derive(Serialize)]
struct SentenceView {
    position: i32,
    section_start: i32,
    sentence: Option<(i32, i32)>,
}

#[derive(Serialize)]
struct StructureOutput {
    id: PageId,
    structure: StructureNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<SentenceView>,
}

#[derive(Serialize)]
struct ResolveOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    warm_up: Option<WarmUpReport>,
    #[serde(flatten)]
    result: T,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = WikigraphConfig::load(cli.config.as_deref())?;
    let store = StoreDir::new(&cli.store, config.store.clone())
        .with_context(|| format!("Invalid store directory {}", cli.store.display()))?;

    let output = match cli.command {
        Commands::Build(args) => {
            let quiet = cli.quiet;
            blocking(move || run_build(store, args, quiet)).await?
        }
        Commands::Stats => blocking(move || run_stats(store)).await?,
        Commands::Page(args) => blocking(move || run_page(store, &args.page)).await?,
        Commands::Label(args) => blocking(move || run_label(store, args.text)).await?,
        Commands::Links(args) => blocking(move || run_links(store, args)).await?,
        Commands::Structure(args) => blocking(move || run_structure(store, args)).await?,
        Commands::Resolve(args) => blocking(move || run_resolve(store, &config, args)).await?,
    };
    println!("{output}");
    Ok(())
}

/// Run store work off the async runtime
async fn blocking<F>(work: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .context("Worker thread failed")?
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn open(store: StoreDir) -> Result<Wikipedia> {
    let root = store.root().to_path_buf();
    Wikipedia::open(store).with_context(|| format!("Failed to open store {}", root.display()))
}

fn run_build(store: StoreDir, args: BuildArgs, quiet: bool) -> Result<String> {
    let mode = if args.overwrite {
        LoadMode::Overwrite
    } else {
        LoadMode::Preserve
    };

    let bar = if quiet {
        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner} {elapsed_precise} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));

    let ticker = bar.clone();
    let report = Loader::new(store, &args.data, mode)
        .with_progress(Arc::new(move |table, rows| {
            ticker.set_message(format!("{table}: {rows} rows"));
        }))
        .load_all()
        .with_context(|| format!("Failed to load {}", args.data.display()))?;
    bar.finish_and_clear();

    log::info!(
        "Loaded {} rows across {} tables",
        report.total_rows(),
        report.tables.len()
    );
    to_json(&report)
}

fn run_stats(store: StoreDir) -> Result<String> {
    let wiki = open(store)?;
    let statistics = wiki
        .statistics()?
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    to_json(&StatsOutput {
        root: wiki.store().root().to_path_buf(),
        tables: wiki.available_tables(),
        page_estimate: wiki.page_count_estimate()?,
        statistics,
    })
}

fn run_page(store: StoreDir, key: &str) -> Result<String> {
    let wiki = open(store)?;
    let page = match key.parse::<PageId>() {
        Ok(id) => wiki.page(id)?,
        Err(_) => wiki.page_by_title(key)?,
    }
    .with_context(|| format!("No page '{key}'"))?;

    let redirects_to = if page.page_type == wikigraph_codec::PageType::Redirect {
        wiki.resolve_redirect(page.id)?
    } else {
        None
    };
    to_json(&PageOutput {
        parent_categories: wiki.parent_categories(page.id)?,
        redirects: wiki.redirects_to(page.id)?,
        translations: wiki.translations(page.id)?,
        labels: wiki.labels_for_page(page.id)?,
        redirects_to,
        page,
    })
}

fn run_label(store: StoreDir, text: String) -> Result<String> {
    let wiki = open(store)?;
    let label = wiki
        .label(&text)?
        .with_context(|| format!("No label '{text}'"))?;
    to_json(&LabelOutput {
        link_probability: label.link_probability(),
        label: label.as_ref().clone(),
        text,
    })
}

fn run_links(store: StoreDir, args: LinksArgs) -> Result<String> {
    let wiki = open(store)?;
    to_json(&LinksOutput {
        id: args.id,
        direction: args.direction,
        links: wiki.links(args.id, args.direction)?,
    })
}

fn run_structure(store: StoreDir, args: StructureArgs) -> Result<String> {
    let wiki = open(store)?;
    let tree = wiki
        .structure(args.id)?
        .with_context(|| format!("No structure for page {}", args.id))?;
    let at = args.at.map(|position| SentenceView {
        position,
        section_start: tree.enclosing_section(position).start(),
        sentence: tree.sentence_bounds(position),
    });
    to_json(&StructureOutput {
        id: args.id,
        structure: tree.as_ref().clone(),
        at,
    })
}

fn run_resolve(store: StoreDir, config: &WikigraphConfig, args: ResolveArgs) -> Result<String> {
    let wiki = open(store)?;
    let warm_up = if args.warm {
        Some(wiki.warm_up(&config.cache)?)
    } else {
        None
    };

    let mut settings = config.disambiguation.clone();
    if let Some(min_prior) = args.min_prior {
        settings.min_prior_probability = min_prior;
    }
    let stopwords = config.stopwords();
    let scorer = LinkOverlapScorer::new(&wiki)?;
    let resolver = QueryResolver::new(&wiki, &scorer, &stopwords, settings)?;

    let result = if args.simple {
        resolver.resolve_simple(&args.query)?
    } else {
        resolver.resolve(&args.query)?
    };
    to_json(&ResolveOutput { warm_up, result })
}
