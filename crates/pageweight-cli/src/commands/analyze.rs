use crate::OutputFormat;
use anyhow::Result;
use pageweight_core::AnalysisConfig;
use pageweight_core::analysis::{AggregateReport, Analyzer, Category, ResourceAnalyzer};
use pageweight_core::observation::CaptureSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Analyze a capture file and return the aggregate report
pub fn analyze_file(file: &Path, config: &AnalysisConfig) -> Result<AggregateReport> {
    tracing::debug!("Reading capture file: {}", file.display());

    let capture = CaptureSet::from_file(file, &config.validity)?;

    let analyzer = ResourceAnalyzer::new(config.clone());
    let mut report = analyzer.analyze(&capture)?;

    if report.analyzed_url.is_none() {
        report.analyzed_url = Some(file.display().to_string());
    }

    Ok(report)
}

pub fn execute(
    file: &Path,
    domains: bool,
    config_file: Option<PathBuf>,
    ratios: Vec<String>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Analyzing capture: {}", file.display());

    let config = super::load_config(config_file.as_deref(), &ratios)?;
    let report = analyze_file(file, &config)?;

    if let Some(path) = output {
        write_report(&report, &path)?;
    }

    match format {
        OutputFormat::Json => output_json(&report)?,
        OutputFormat::Table => output_table(&report, domains),
        OutputFormat::Pretty => output_pretty(&report, domains),
    }

    Ok(())
}

/// Persist the report as pretty-printed JSON
pub fn write_report(report: &AggregateReport, path: &Path) -> Result<()> {
    tracing::debug!("Writing report to: {}", path.display());

    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;

    tracing::info!("Report written to {}", path.display());
    Ok(())
}

fn output_pretty(report: &AggregateReport, include_domains: bool) {
    use console::style;

    println!("\n{}", style("Page Weight Report").bold().cyan());
    println!("{}", style("==================").cyan());

    println!("\n{}", style("Overview:").bold());
    if let Some(url) = &report.analyzed_url {
        println!("  Analyzed:        {}", style(url).green());
    }
    println!(
        "  Requests:        {} counted ({} observed, {} excluded)",
        style(report.total_requests).yellow(),
        report.observed,
        report.excluded
    );
    println!("  Total Size:      {}", report.total_raw_size_display);
    println!("  Domains:         {}", report.unique_domains);
    if let Some(load_time) = &report.load_time_display {
        println!("  Load Time:       {}", load_time);
    }

    println!("\n{}", style("Resources:").bold());
    for category in report.categories() {
        println!(
            "  {:<12} {:>4} requests ({} unique)  {:>14}  transfer (est.): {}",
            format!("{}:", category.category.label()),
            category.count,
            category.unique_count,
            category.total_size,
            category.total_transfer_size
        );
    }

    if include_domains {
        for category in Category::ALL {
            let stats = &report.category(category).domain_stats;
            if stats.is_empty() {
                continue;
            }

            println!(
                "\n{}",
                style(format!("{} by domain:", category.label())).bold()
            );
            for (host, domain) in stats.iter() {
                println!("  {}", style(host).green());
                println!("    Requests:          {}", domain.count);
                println!(
                    "    Total Size:        {}",
                    pageweight_core::analysis::format_size(domain.raw_size_total)
                );
                println!(
                    "    Transfer (est.):   {}",
                    pageweight_core::analysis::format_size(domain.estimated_transfer_total)
                );
            }
        }
    }

    println!(
        "\n{}",
        style("Transfer figures are estimates from per-category compression ratios.").dim()
    );
    println!();
}

fn output_json(report: &AggregateReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

fn output_table(report: &AggregateReport, include_domains: bool) {
    print!("{}", report.render_summary_table());

    if include_domains {
        println!();
        print!("{}", report.render_domain_tables());
    }
}
