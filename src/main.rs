use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use sai_alpha::{
    config::{self, AppConfig},
    errors::ServiceError,
    export::export_report,
    generate_dataset,
    models::{Currency, Dataset},
    services::{
        analytics::{DateRange, KpiAggregator, KpiFilter, KpiReport},
        assembler::verify_integrity,
    },
    tables::{dataset_exists, load_dataset, write_dataset},
};
use serde::Serialize;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut app_config = config::load_config().context("failed to load application config")?;
    config::init_tracing(app_config.log_level(), app_config.log_json);
    if let Some(dir) = cli.data_dir.clone() {
        app_config.data_dir = dir;
    }

    match cli.command {
        Commands::Generate(args) => handle_generate(&app_config, args, cli.json),
        Commands::Verify => handle_verify(&app_config, cli.json),
        Commands::Inspect => handle_inspect(&app_config, cli.json),
        Commands::Kpis(args) => handle_kpis(&app_config, args, cli.json),
        Commands::Export(args) => handle_export(&app_config, args, cli.json),
    }
}

#[derive(Parser)]
#[command(
    name = "sai-alpha",
    about = "Generate the SAI Alpha dBase dataset and compute dashboard KPIs",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(long, global = true, help = "Directory holding the .dbf tables (overrides config)")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the dataset and write one table file per entity
    Generate(GenerateArgs),
    /// Load the tables and check every cross-table invariant
    Verify,
    /// Print row counts and date coverage of each table
    Inspect,
    /// Compute the KPI report for a filter selection
    Kpis(FilterArgs),
    /// Write the KPI report views as CSV files
    Export(ExportArgs),
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, help = "Override the configured seed")]
    seed: Option<u64>,
    #[arg(long, help = "Override the first generated day (YYYY-MM-DD)")]
    start: Option<NaiveDate>,
    #[arg(long, help = "Override the last generated day (YYYY-MM-DD)")]
    end: Option<NaiveDate>,
    #[arg(long, action = ArgAction::SetTrue, help = "Overwrite an existing dataset")]
    force: bool,
}

#[derive(Args, Clone)]
struct FilterArgs {
    #[arg(long, help = "First day of the period (YYYY-MM-DD)")]
    from: Option<NaiveDate>,
    #[arg(long, help = "Last day of the period (YYYY-MM-DD)")]
    to: Option<NaiveDate>,
    #[arg(long = "brand", help = "Restrict to a brand (repeatable)")]
    brands: Vec<String>,
    #[arg(long = "seller", help = "Restrict to a seller name (repeatable)")]
    sellers: Vec<String>,
    #[arg(long, default_value = "MXN", help = "Reporting currency: MXN or USD")]
    currency: Currency,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    filter: FilterArgs,
    #[arg(long, default_value = "exports", help = "Directory for the CSV files")]
    out: PathBuf,
}

#[derive(Serialize)]
struct GenerateOutput {
    data_dir: String,
    seed: u64,
    tables: Vec<sai_alpha::models::TableCount>,
}

#[derive(Serialize)]
struct InspectOutput {
    data_dir: String,
    tables: Vec<sai_alpha::models::TableCount>,
    first_fx_date: Option<NaiveDate>,
    last_fx_date: Option<NaiveDate>,
    first_sale_date: Option<NaiveDate>,
    last_sale_date: Option<NaiveDate>,
}

fn handle_generate(app_config: &AppConfig, args: GenerateArgs, json: bool) -> Result<()> {
    let dir = app_config.data_dir();
    if dataset_exists(dir) && !args.force {
        return Err(ServiceError::DatasetExists(dir.display().to_string()).into());
    }

    let mut generator = app_config.generator.clone();
    if let Some(seed) = args.seed {
        generator.seed = seed;
    }
    if let Some(start) = args.start {
        generator.start_date = start;
    }
    if let Some(end) = args.end {
        generator.end_date = end;
    }

    let dataset = generate_dataset(&generator).context("dataset generation failed")?;
    write_dataset(dir, &dataset).context("failed to write tables")?;

    let output = GenerateOutput {
        data_dir: dir.display().to_string(),
        seed: generator.seed,
        tables: dataset.table_counts(),
    };
    if json {
        print_json(&output)?;
    } else {
        println!("Dataset written to {} (seed {})", output.data_dir, output.seed);
        for count in &output.tables {
            println!("  {:<14} {:>8} rows", count.table, count.rows);
        }
    }
    Ok(())
}

fn load(dir: &Path) -> Result<Dataset> {
    if !dataset_exists(dir) {
        return Err(anyhow!(
            "no dataset found in {}; run `sai-alpha generate` first",
            dir.display()
        ));
    }
    load_dataset(dir).with_context(|| format!("failed to load tables from {}", dir.display()))
}

fn handle_verify(app_config: &AppConfig, json: bool) -> Result<()> {
    let dataset = load(app_config.data_dir())?;
    verify_integrity(&dataset).context("integrity check failed")?;
    if json {
        print_json(&dataset.table_counts())?;
    } else {
        println!("All invariants hold for {}", app_config.data_dir().display());
    }
    Ok(())
}

fn handle_inspect(app_config: &AppConfig, json: bool) -> Result<()> {
    let dataset = load(app_config.data_dir())?;
    let output = InspectOutput {
        data_dir: app_config.data_dir().display().to_string(),
        tables: dataset.table_counts(),
        first_fx_date: dataset.fx_rates.first_date(),
        last_fx_date: dataset.fx_rates.last_date(),
        first_sale_date: dataset.sales.iter().map(|s| s.sale_date).min(),
        last_sale_date: dataset.sales.iter().map(|s| s.sale_date).max(),
    };
    if json {
        print_json(&output)?;
    } else {
        println!("Tables in {}", output.data_dir);
        for count in &output.tables {
            println!("  {:<14} {:>8} rows", count.table, count.rows);
        }
        if let (Some(first), Some(last)) = (output.first_fx_date, output.last_fx_date) {
            println!("FX calendar: {} .. {}", first, last);
        }
        if let (Some(first), Some(last)) = (output.first_sale_date, output.last_sale_date) {
            println!("Sales:       {} .. {}", first, last);
        }
    }
    Ok(())
}

fn build_filter(args: &FilterArgs, dataset: &Dataset) -> Result<KpiFilter> {
    let mut filter = KpiFilter::new();
    if args.from.is_some() || args.to.is_some() {
        let start = args
            .from
            .or_else(|| dataset.fx_rates.first_date())
            .ok_or_else(|| anyhow!("--to needs --from on a dataset without an FX calendar"))?;
        let end = args
            .to
            .or_else(|| dataset.fx_rates.last_date())
            .ok_or_else(|| anyhow!("--from needs --to on a dataset without an FX calendar"))?;
        filter = filter.with_range(DateRange::new(start, end)?);
    }
    for brand in &args.brands {
        filter = filter.with_brand(brand.clone());
    }
    for seller in &args.sellers {
        filter = filter.with_seller(seller.clone());
    }
    Ok(filter)
}

fn handle_kpis(app_config: &AppConfig, args: FilterArgs, json: bool) -> Result<()> {
    let dataset = load(app_config.data_dir())?;
    let filter = build_filter(&args, &dataset)?;
    let report = KpiAggregator::new(&dataset).aggregate(&filter, args.currency);
    if json {
        print_json(&report)?;
    } else {
        render_report(&report);
    }
    Ok(())
}

fn handle_export(app_config: &AppConfig, args: ExportArgs, json: bool) -> Result<()> {
    let dataset = load(app_config.data_dir())?;
    let filter = build_filter(&args.filter, &dataset)?;
    let aggregator = KpiAggregator::new(&dataset);
    let report = aggregator.aggregate(&filter, args.filter.currency);
    let (sales, _) = aggregator.filtered_sales(&filter, args.filter.currency);
    let files = export_report(&args.out, &report, &sales).context("export failed")?;
    info!(files = files.len(), out = %args.out.display(), "CSV export finished");

    if json {
        let paths: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        print_json(&paths)?;
    } else {
        for path in &files {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn render_report(report: &KpiReport) {
    let s = &report.summary;
    let cur = report.currency;
    if let Some(period) = report.period {
        println!("Period {} .. {} ({})", period.start, period.end, cur);
    }
    println!("Revenue         {} {}", s.revenue, cur);
    println!("Net revenue     {} {} ({} credit notes)", s.net_revenue, cur, s.credit_notes);
    println!("Invoices        {} • lines {} • units {}", s.invoices, s.lines, s.units);
    println!("Average ticket  {} {}", s.average_ticket, cur);
    println!("Active clients  {}", s.active_clients);
    match s.average_fx_rate {
        Some(rate) => println!("Average FX      {} MXN/USD", rate),
        None => println!("Average FX      n/a"),
    }
    if let Some(peak) = &report.peak_month {
        println!("Peak month      {}", peak);
    }
    if let Some(cmp) = &report.comparison {
        match cmp.revenue_change_pct {
            Some(pct) => println!("vs previous     {}% ({} .. {})", pct, cmp.previous.start, cmp.previous.end),
            None => println!("vs previous     n/a"),
        }
    }

    println!("\nTop products");
    for p in &report.top_products {
        println!("  {:>2}. {} • {} • {} {}", p.rank, p.sku, p.name, p.revenue, cur);
    }
    println!("\nTop clients");
    for c in &report.top_clients {
        println!("  {:>2}. {} • {} {}", c.rank, c.name, c.revenue, cur);
    }
    println!("\nTop sellers");
    for v in &report.top_sellers {
        println!("  {:>2}. {} • {} {} • {} /day", v.rank, v.name, v.revenue, cur, v.daily_average);
    }

    let o = &report.open_orders;
    println!(
        "\nOpen orders     {} • {} units pending • {} {}",
        o.orders, o.pending_units, o.pending_value, cur
    );
    for b in &o.aging {
        println!("  {:>5} days: {} orders", b.label, b.orders);
    }
    println!(
        "Inventory       {} low stock • {} overstock",
        report.inventory.low_stock.len(),
        report.inventory.overstock.len()
    );

    let d = &report.diagnostics;
    if !d.is_clean() {
        println!(
            "\nExcluded rows: {} orphaned, {} without FX rate",
            d.orphaned_rows(),
            d.unknown_date_rows
        );
        for (key, count) in &d.foreign_key_mismatches {
            println!("  {}: {}", key, count);
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
