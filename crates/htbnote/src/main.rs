use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use htbnote_core::config::{DEFAULT_CONFIG_FILENAME, Settings, load_config};
use htbnote_core::transport::HttpTransport;
use htbnote_core::{EnrichReport, EnrichRequest, enrich};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "htbnote",
    version,
    about = "Fill a machine note's frontmatter (_os, _difficulty, _image) from its Hack The Box page"
)]
struct Cli {
    /// Machine name as displayed, e.g. "Active"
    name: String,
    /// Note whose frontmatter should be enriched
    #[arg(value_name = "DOCUMENT")]
    document: PathBuf,
    /// Directory the machine avatar is stored in
    #[arg(value_name = "OUTPUT_DIR")]
    output_dir: PathBuf,
    #[arg(long, value_name = "PATH", help = "Config file (default: ./htbnote.toml)")]
    config: Option<PathBuf>,
    #[arg(short, long, help = "Emit internal decision state to stderr")]
    verbose: bool,
    #[arg(long, help = "Fetch and extract, but do not download or write")]
    dry_run: bool,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let settings = resolve_settings(&cli)?;
    init_logging(settings.verbose);

    let request = EnrichRequest {
        name: cli.name.clone(),
        document_path: absolute(&cli.document)?,
        output_dir: absolute(&cli.output_dir)?,
        dry_run: cli.dry_run,
    };
    let transport = HttpTransport::from_settings(&settings)?;
    let report = enrich(&request, &settings, &transport)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if cli.dry_run {
        print_dry_run(&report);
    }
    Ok(())
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let config_path = match &cli.config {
        Some(path) if !path.exists() => bail!("config file not found: {}", path.display()),
        Some(path) => path.clone(),
        None => PathBuf::from(DEFAULT_CONFIG_FILENAME),
    };
    let mut settings = load_config(&config_path)?.resolve();
    settings.verbose |= cli.verbose;
    Ok(settings)
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("htbnote={level},htbnote_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn print_dry_run(report: &EnrichReport) {
    println!("dry run: {}", report.page_url);
    println!("fetched: {}", format_flag(report.fetched));
    println!(
        "asset_url: {}",
        report.asset_url.as_deref().unwrap_or("<none>")
    );
    match &report.diff {
        Some(diff) => print!("{diff}"),
        None => println!("document: unchanged"),
    }
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
