use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use spend_analytics::io::{load_csv, load_partitioned_parquet, write_report_csv, ColumnMapping};
use spend_analytics::{AnalysisConfig, ConcentrationEngine, Grouping, HhiScale};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum GroupByArg {
    Organization,
    OrganizationPeriod,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScaleArg {
    Fraction,
    Points,
}

#[derive(Parser)]
#[command(name = "spend-analytics")]
#[command(about = "Vendor concentration (HHI) analysis over procurement spend records")]
struct Args {
    /// Input: a CSV file, a parquet file, or a glob over parquet partitions
    input: String,

    /// Grouping granularity
    #[arg(long, value_enum, default_value = "organization")]
    group_by: GroupByArg,

    /// Minimum records a group needs to be reported
    #[arg(long, default_value_t = 5)]
    min_records: u64,

    /// Rank cutoff for the top-N concentration share
    #[arg(long, default_value_t = 5)]
    top_n: u32,

    /// Market-share floor for the dominance count
    #[arg(long, default_value_t = 0.10)]
    dominance_threshold: f64,

    /// HHI scale: fraction (0-1) or points (0-10,000)
    #[arg(long, value_enum, default_value = "fraction")]
    scale: ScaleArg,

    /// Vendor column name in the source
    #[arg(long, default_value = "vendor_name")]
    vendor_column: String,

    /// Organization column name in the source
    #[arg(long, default_value = "organization")]
    organization_column: String,

    /// Fiscal period column name in the source
    #[arg(long, default_value = "fiscal_year_begin")]
    period_column: String,

    /// Amount column name in the source
    #[arg(long, default_value = "dollars_spent_to_date")]
    amount_column: String,

    /// Write the report to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of top groups to print
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let grouping = match args.group_by {
        GroupByArg::Organization => Grouping::Organization,
        GroupByArg::OrganizationPeriod => Grouping::OrganizationPeriod,
    };
    let scale = match args.scale {
        ScaleArg::Fraction => HhiScale::Fraction,
        ScaleArg::Points => HhiScale::Points,
    };
    let config = AnalysisConfig {
        min_group_records: args.min_records,
        top_n: args.top_n,
        dominance_threshold: args.dominance_threshold,
        ..AnalysisConfig::with_scale(scale)
    };

    let mapping = ColumnMapping {
        vendor: args.vendor_column,
        organization: args.organization_column,
        fiscal_period: Some(args.period_column),
        amount: args.amount_column,
    };

    info!("Loading spend records from {}", args.input);
    let records = if args.input.ends_with(".csv") {
        load_csv(&PathBuf::from(&args.input), &mapping)?
    } else if args.input.contains(".parquet") {
        load_partitioned_parquet(&args.input, &mapping)?
    } else {
        bail!("Unsupported input: {} (expected .csv or .parquet)", args.input);
    };

    let engine = ConcentrationEngine::new(config, grouping)?;
    let report = engine.analyze(records)?;

    println!(
        "\n{} eligible group(s); {} of {} records used ({} dropped)",
        report.entries.len(),
        report.filter_stats.records_kept,
        report.filter_stats.records_seen,
        report.filter_stats.records_dropped()
    );
    println!("\nMost concentrated groups:");
    println!(
        "{:<40} {:>12} {:>10} {:>8} {:>8}  {}",
        "group", "total_spend", "hhi", "vendors", "top_n", "level"
    );
    for entry in report.entries.iter().take(args.limit) {
        println!(
            "{:<40} {:>12.2} {:>10.4} {:>8} {:>8.3}  {}",
            entry.group_key.to_string(),
            entry.total_spend,
            entry.hhi,
            entry.unique_vendors,
            entry.top_n_share,
            entry.concentration_level
        );
    }

    if let Some(output) = &args.output {
        write_report_csv(&report, output)?;
        println!("\nReport written to {}", output.display());
    }

    Ok(())
}
