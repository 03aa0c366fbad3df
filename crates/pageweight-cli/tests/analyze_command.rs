use assert_cmd::Command;
use pageweight_core::AnalysisConfig;
use pageweight_core::analysis::{AggregateReport, Category};
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get path to test fixtures
fn fixture_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(filename)
}

#[allow(deprecated)]
fn get_pageweight_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("pageweight")
}

/// Test that analyze_file reads a HAR and aggregates its resources
#[test]
fn test_analyze_har_totals() {
    let result = pageweight_cli::commands::analyze::analyze_file(
        &fixture_path("sample.har"),
        &AnalysisConfig::default(),
    );
    assert!(result.is_ok(), "Should successfully analyze HAR file");

    let report: AggregateReport = result.unwrap();

    // document, redirect hop and 404 are excluded
    assert_eq!(report.observed, 10);
    assert_eq!(report.excluded, 3);
    assert_eq!(report.total_requests, 7);
    assert_eq!(report.total_raw_size, 260_000);
    assert_eq!(report.unique_domains, 4);
    assert_eq!(report.analyzed_url.as_deref(), Some("https://www.example.com/"));
    assert_eq!(report.load_time_ms, Some(1830.5));
}

#[test]
fn test_analyze_har_categories() {
    let report = pageweight_cli::commands::analyze::analyze_file(
        &fixture_path("sample.har"),
        &AnalysisConfig::default(),
    )
    .unwrap();

    let js = report.category(Category::Js);
    assert_eq!(js.count, 2);
    assert_eq!(js.unique_count, 1, "cache-busted copies collapse");
    assert_eq!(js.raw_size_total, 80_000);
    assert_eq!(js.estimated_transfer_total, 26_400);
    assert_eq!(js.transfer_size_total, 53_400);
    assert_eq!(js.domain_stats.get("cdn.example.net").unwrap().count, 2);

    let css = report.category(Category::Css);
    assert_eq!(css.count, 1);
    assert_eq!(css.estimated_transfer_total, 4_700);

    let images = report.category(Category::Image);
    assert_eq!(images.count, 2);
    assert_eq!(images.raw_size_total, 128_000);
    assert_eq!(images.domain_stats.get("www.example.com").unwrap().count, 2);
    let logo = images
        .entries
        .iter()
        .find(|e| e.url.ends_with("logo.png"))
        .unwrap();
    assert_eq!(logo.redirects, vec!["http://www.example.com/img/logo.png"]);

    assert_eq!(report.category(Category::Font).count, 1);

    let other = report.category(Category::Other);
    assert_eq!(other.count, 1);
    assert_eq!(other.estimated_transfer_total, 1_000);
}

#[test]
fn test_analyze_observation_list() {
    let report = pageweight_cli::commands::analyze::analyze_file(
        &fixture_path("observations.json"),
        &AnalysisConfig::default(),
    )
    .unwrap();

    assert_eq!(report.observed, 6);
    assert_eq!(report.total_requests, 3);
    assert_eq!(report.excluded, 3);
    assert_eq!(report.unique_domains, 2);
    assert_eq!(report.category(Category::Js).transfer_size_total, 900);
    // falls back to the file name when the capture names no page
    assert!(report.analyzed_url.unwrap().ends_with("observations.json"));
}

#[test]
fn test_analyze_with_config_and_override() {
    let config = pageweight_cli::commands::load_config(
        Some(fixture_path("config.json").as_path()),
        &["other=0.4".to_string()],
    )
    .unwrap();
    assert_eq!(config.ratios.css, 0.18);
    assert_eq!(config.ratios.other, 0.4);

    let report =
        pageweight_cli::commands::analyze::analyze_file(&fixture_path("sample.har"), &config)
            .unwrap();

    assert_eq!(report.category(Category::Css).estimated_transfer_total, 3_600);
    assert_eq!(report.category(Category::Js).estimated_transfer_total, 20_000);
    assert_eq!(report.category(Category::Other).estimated_transfer_total, 800);
    assert_eq!(report.compression_ratios.js, 0.25);
}

#[test]
fn test_load_config_rejects_bad_override() {
    let result = pageweight_cli::commands::load_config(None, &["css=-1".to_string()]);
    assert!(result.is_err());

    let result = pageweight_cli::commands::load_config(None, &["video=0.5".to_string()]);
    assert!(result.is_err());
}

#[test]
fn test_analyze_writes_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("report.json");

    let result = pageweight_cli::commands::analyze::execute(
        &fixture_path("sample.har"),
        false,
        None,
        vec![],
        Some(output.clone()),
        pageweight_cli::OutputFormat::Table,
    );
    assert!(result.is_ok(), "Should analyze and write the report");

    let content = std::fs::read_to_string(&output).unwrap();
    let report: AggregateReport = serde_json::from_str(&content).unwrap();
    assert_eq!(report.total_requests, 7);
    assert_eq!(report.js.count, 2);
}

#[test]
fn test_analyze_command_json_output() {
    let mut cmd = Command::new(get_pageweight_bin());
    cmd.arg("analyze")
        .arg(fixture_path("sample.har"))
        .arg("--format")
        .arg("json");

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(json["totalRequests"], 7);
    assert_eq!(json["js"]["count"], 2);
    assert_eq!(json["js"]["domainStats"]["cdn.example.net"]["count"], 2);
    assert_eq!(json["images"]["entries"][0]["url"], "https://www.example.com/img/hero.jpg");
}

#[test]
fn test_analyze_command_table_with_domains() {
    let mut cmd = Command::new(get_pageweight_bin());
    cmd.arg("analyze")
        .arg(fixture_path("sample.har"))
        .arg("--domains")
        .arg("--format")
        .arg("table");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Transfer (est.)"))
        .stdout(predicate::str::contains("JavaScript by domain"))
        .stdout(predicate::str::contains("fonts.example.org"))
        .stdout(predicate::str::contains("253.91 KB"));
}

#[test]
fn test_analyze_command_ratio_flag() {
    let mut cmd = Command::new(get_pageweight_bin());
    cmd.arg("analyze")
        .arg(fixture_path("sample.har"))
        .args(["--ratio", "css=0.18", "--format", "json"]);

    let output = cmd.assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["css"]["estimatedTransferTotal"], 3600);
}

#[test]
fn test_analyze_command_rejects_unknown_input() {
    let mut cmd = Command::new(get_pageweight_bin());
    cmd.arg("analyze").arg(fixture_path("not-a-capture.json"));

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("HAR document"));
}

#[test]
fn test_analyze_command_missing_file() {
    let mut cmd = Command::new(get_pageweight_bin());
    cmd.arg("analyze").arg(fixture_path("does-not-exist.har"));

    cmd.assert().failure();
}

#[test]
fn test_analyze_help() {
    let mut cmd = Command::new(get_pageweight_bin());
    cmd.arg("analyze").arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--domains"))
        .stdout(predicate::str::contains("CATEGORY=RATIO"));
}
