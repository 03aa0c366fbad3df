use anyhow::Result;
use clap::{Parser, Subcommand};
use pageweight_cli::{OutputFormat, commands};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pageweight")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "Classify and aggregate the resources a page loaded, for page-weight audits",
    long_about = "pageweight reads captured network traffic (a HAR file or a JSON list of \
                  resource observations), classifies every response as CSS, JavaScript, \
                  image, font or other, and reports deduplicated counts and sizes per \
                  category and per domain."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Report page weight per category and domain
    Analyze {
        /// HAR file or JSON observation list
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Show per-domain breakdowns
        #[arg(long)]
        domains: bool,

        /// JSON config file (compression ratios, validity rules)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Override a compression ratio, e.g. --ratio css=0.18 (repeatable)
        #[arg(long = "ratio", value_name = "CATEGORY=RATIO")]
        ratios: Vec<String>,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the category (or exclusion reason) of every observation
    Classify {
        /// HAR file or JSON observation list
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON config file (validity rules)
        #[arg(long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Only list observations that no category claimed
        #[arg(long)]
        excluded_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    tracing::debug!("Output format: {}", cli.format.as_str());

    match cli.command {
        Commands::Analyze {
            file,
            domains,
            config,
            ratios,
            output,
        } => commands::analyze::execute(&file, domains, config, ratios, output, cli.format),
        Commands::Classify {
            file,
            config,
            excluded_only,
        } => commands::classify::execute(&file, config, excluded_only, cli.format),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("pageweight=debug,pageweight_cli=debug,pageweight_core=debug")
    } else {
        EnvFilter::new("pageweight=info,pageweight_cli=info,pageweight_core=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
