//! GemHunter - AI triage for secondhand auction listings
//!
//! A CLI tool that sends listing photos to a Gemini vision model,
//! extracts buy/pass verdicts and writes a ranked digest.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, manifest, image folder, etc.)
//!   2 - Completed, but at least one item was rate limited

mod analysis;
mod appraisal;
mod cli;
mod config;
mod error;
mod images;
mod manifest;
mod models;
mod pipeline;
mod report;
mod rotation;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use images::{DirectoryImageSource, ImageScanConfig};
use models::ListingItem;
use report::ReportOptions;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("GemHunter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Triage failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .gemhunter.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   API keys are best supplied via GEMINI_API_KEYS rather than the file.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over --verbose/--quiet when set.
fn init_logging(args: &Args) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = log_filter(rust_log.as_deref(), args.log_level());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Filter from `RUST_LOG` directives, falling back to the CLI level.
fn log_filter(directives: Option<&str>, level: tracing::Level) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(level.to_string().to_lowercase()))
}

/// Run the complete triage workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let manifest_path = args
        .items
        .clone()
        .context("An items manifest is required (--items)")?;
    let mut items = manifest::load_items(&manifest_path)?;
    if let Some(max) = args.max_items {
        items.truncate(max);
    }
    info!("Loaded {} items from {}", items.len(), manifest_path.display());

    let image_source = DirectoryImageSource::new(
        PathBuf::from(&config.images.root),
        ImageScanConfig::from(&config.images),
    );

    if args.dry_run {
        return handle_dry_run(&items, &image_source);
    }

    let settings = config.triage_settings();
    println!("🤖 Starting triage...");
    println!("   Items: {}", items.len());
    println!("   API keys: {}", settings.api_keys.len());
    println!("   Models: {}", settings.models.join(", "));
    println!(
        "   Delay: {:.1}s between appraisals",
        settings.inter_request_delay.as_secs_f64()
    );

    let provider = appraisal::GeminiClient::new(config.gemini_config())?;
    let run = pipeline::run_triage(
        &items,
        &settings,
        &image_source,
        &provider,
        !args.quiet,
    )
    .await?;

    // Raw outcomes for later re-runs
    let results_path = PathBuf::from(&config.general.results);
    let results_json =
        serde_json::to_string_pretty(&run.outcomes).context("Failed to serialize results")?;
    std::fs::write(&results_path, results_json)
        .with_context(|| format!("Failed to write results to {}", results_path.display()))?;

    let options = ReportOptions::from(&config.report);
    let output = match args.format {
        OutputFormat::Markdown => report::generate_markdown_report(&run.digest, &options),
        OutputFormat::Html => report::generate_html_report(&run.digest, &options),
        OutputFormat::Json => report::generate_json_report(&run.digest)?,
    };

    let output_path = digest_path(&args, &config);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write digest to {}", output_path.display()))?;

    let summary = &run.digest.summary;
    println!("\n📊 Triage Summary:");
    println!("   Items analyzed: {}/{}", summary.evaluated, summary.items_total);
    println!(
        "   - Strong buy: {} | Buy: {} | Maybe: {} | Pass: {} | Strong pass: {} | Unknown: {}",
        summary.strong_buy,
        summary.buy,
        summary.maybe,
        summary.pass,
        summary.strong_pass,
        summary.unknown
    );
    if summary.failed() > 0 {
        println!(
            "   - Failed: {} (no images: {}, rate limited: {}, errors: {}, skipped: {})",
            summary.failed(),
            summary.no_images,
            summary.rate_limited,
            summary.provider_errors,
            summary.skipped
        );
    }
    print!("{}", run.digest.usage);
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Digest saved to: {}", output_path.display());
    println!("   Results saved to: {}", results_path.display());

    if summary.rate_limited > 0 {
        warn!("{} items were rate limited", summary.rate_limited);
        return Ok(2);
    }

    Ok(0)
}

/// Handle --dry-run: count images per item, exit without calling the model.
fn handle_dry_run(items: &[ListingItem], image_source: &DirectoryImageSource) -> Result<i32> {
    println!("\n🔍 Dry run: scanning image folders (no model calls)...\n");

    let mut with_images = 0;
    for item in items {
        let count = image_source.scan(item)?.len();
        if count > 0 {
            with_images += 1;
        }
        println!(
            "   📦 {} | ${} | {} images | {}",
            item.item_id, item.price, count, item.title
        );
    }

    println!(
        "\n   {} of {} items would be appraised.",
        with_images,
        items.len()
    );
    println!("\n✅ Dry run complete. No model calls were made.");
    Ok(0)
}

/// Digest path; the extension follows --format unless --output was given.
fn digest_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }

    let mut path = PathBuf::from(&config.general.output);
    path.set_extension(match args.format {
        OutputFormat::Markdown => "md",
        OutputFormat::Html => "html",
        OutputFormat::Json => "json",
    });
    path
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
