use super::bucket::estimate_transfer;
use super::{Category, CategoryBucket, DedupedEntry, DomainStats, format_duration_ms, format_size};
use crate::CompressionRatios;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Final numbers for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub category: Category,
    pub count: usize,
    pub unique_count: usize,
    pub raw_size_total: u64,
    pub total_size: String,
    /// Sum of the transfer sizes the capture layer reported
    pub transfer_size_total: u64,
    pub total_measured_transfer_size: String,
    /// Ratio-based estimate; see [`CompressionRatios`]
    pub compression_ratio: f64,
    pub estimated_transfer_total: u64,
    pub total_transfer_size: String,
    /// Same estimate under its legacy report name
    pub total_original_size: String,
    pub entries: Vec<DedupedEntry>,
    pub domain_stats: DomainStats,
}

impl CategoryReport {
    fn from_bucket(bucket: CategoryBucket, ratio: f64) -> Self {
        let estimated = estimate_transfer(bucket.raw_size_total, ratio);
        Self {
            category: bucket.category,
            count: bucket.count,
            unique_count: bucket.unique_count(),
            raw_size_total: bucket.raw_size_total,
            total_size: format_size(bucket.raw_size_total),
            transfer_size_total: bucket.transfer_size_total,
            total_measured_transfer_size: format_size(bucket.transfer_size_total),
            compression_ratio: ratio,
            estimated_transfer_total: estimated,
            total_transfer_size: format_size(estimated),
            total_original_size: format_size(estimated),
            entries: bucket.entries,
            domain_stats: bucket.domain_stats,
        }
    }
}

/// Result of one analysis run. Built once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_url: Option<String>,
    /// Every observation fed to the run
    pub observed: usize,
    /// Observations no category claimed
    pub excluded: usize,
    pub total_requests: usize,
    pub total_raw_size: u64,
    pub total_raw_size_display: String,
    pub unique_domains: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_time_display: Option<String>,
    pub compression_ratios: CompressionRatios,
    pub css: CategoryReport,
    pub js: CategoryReport,
    pub images: CategoryReport,
    pub fonts: CategoryReport,
    pub other: CategoryReport,
}

impl AggregateReport {
    pub fn category(&self, category: Category) -> &CategoryReport {
        match category {
            Category::Css => &self.css,
            Category::Js => &self.js,
            Category::Image => &self.images,
            Category::Font => &self.fonts,
            Category::Other => &self.other,
        }
    }

    /// Categories in report order
    pub fn categories(&self) -> impl Iterator<Item = &CategoryReport> {
        Category::ALL.into_iter().map(|c| self.category(c))
    }

    /// Fixed-width overview: one row per category plus a total row
    pub fn render_summary_table(&self) -> String {
        let rule = "-".repeat(60);
        let mut lines = vec![
            summary_row("Category", "Count", "Unique", "Size", "Transfer (est.)"),
            rule.clone(),
        ];

        lines.extend(self.categories().map(|report| {
            summary_row(
                report.category.label(),
                &report.count.to_string(),
                &report.unique_count.to_string(),
                &report.total_size,
                &report.total_transfer_size,
            )
        }));

        lines.push(rule);
        lines.push(summary_row(
            "Total",
            &self.total_requests.to_string(),
            "",
            &self.total_raw_size_display,
            "",
        ));
        to_block(lines)
    }

    /// Per-domain rows for one category, in first-seen order
    pub fn render_domain_table(&self, category: Category) -> String {
        let report = self.category(category);
        let mut lines = vec![format!("{} by domain", category.label())];

        if report.domain_stats.is_empty() {
            lines.push("  (no requests)".to_string());
            return to_block(lines);
        }

        lines.push(domain_row("Domain", "Count", "Size", "Transfer (est.)"));
        lines.extend(report.domain_stats.iter().map(|(host, stats)| {
            domain_row(
                host,
                &stats.count.to_string(),
                &format_size(stats.raw_size_total),
                &format_size(stats.estimated_transfer_total),
            )
        }));
        to_block(lines)
    }

    /// Domain tables for every category that has at least one domain
    pub fn render_domain_tables(&self) -> String {
        Category::ALL
            .into_iter()
            .filter(|c| !self.category(*c).domain_stats.is_empty())
            .map(|c| self.render_domain_table(c))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn summary_row(category: &str, count: &str, unique: &str, size: &str, transfer: &str) -> String {
    format!(
        "{:<12} {:>7} {:>7} {:>14} {:>16}",
        category, count, unique, size, transfer
    )
}

fn domain_row(host: &str, count: &str, size: &str, transfer: &str) -> String {
    format!("  {:<40} {:>7} {:>14} {:>16}", host, count, size, transfer)
}

/// Newline-terminated block of lines
fn to_block(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Assembles an [`AggregateReport`] from finished buckets
pub struct ReportBuilder {
    ratios: CompressionRatios,
    analyzed_url: Option<String>,
    load_time_ms: Option<f64>,
    observed: Option<usize>,
}

impl ReportBuilder {
    pub fn new(ratios: CompressionRatios) -> Self {
        Self {
            ratios,
            analyzed_url: None,
            load_time_ms: None,
            observed: None,
        }
    }

    pub fn analyzed_url(mut self, url: Option<String>) -> Self {
        self.analyzed_url = url;
        self
    }

    pub fn load_time_ms(mut self, ms: Option<f64>) -> Self {
        self.load_time_ms = ms;
        self
    }

    pub fn observed(mut self, observed: usize) -> Self {
        self.observed = Some(observed);
        self
    }

    /// Missing categories are reported empty; repeated ones are merged
    pub fn build<I>(self, buckets: I) -> AggregateReport
    where
        I: IntoIterator<Item = CategoryBucket>,
    {
        let mut slots: [Option<CategoryBucket>; 5] = Default::default();
        for bucket in buckets {
            let idx = bucket.category.index();
            let merged = match slots[idx].take() {
                Some(mut existing) => {
                    tracing::warn!("Merging repeated {} bucket into the report", bucket.category);
                    existing.merge(bucket);
                    existing
                }
                None => bucket,
            };
            slots[idx] = Some(merged);
        }

        let [css, js, images, fonts, other] = Category::ALL.map(|category| {
            let bucket = slots[category.index()]
                .take()
                .unwrap_or_else(|| CategoryBucket::new(category));
            CategoryReport::from_bucket(bucket, self.ratios.get(category))
        });
        let reports = [&css, &js, &images, &fonts, &other];

        let total_requests = reports
            .iter()
            .map(|r| r.count)
            .fold(0, usize::saturating_add);
        let total_raw_size = reports
            .iter()
            .map(|r| r.raw_size_total)
            .fold(0, u64::saturating_add);
        let unique_domains = reports
            .iter()
            .flat_map(|r| r.domain_stats.hostnames())
            .collect::<HashSet<_>>()
            .len();
        let observed = self.observed.unwrap_or(total_requests);

        AggregateReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            analyzed_url: self.analyzed_url,
            observed,
            excluded: observed.saturating_sub(total_requests),
            total_requests,
            total_raw_size,
            total_raw_size_display: format_size(total_raw_size),
            unique_domains,
            load_time_display: self.load_time_ms.map(format_duration_ms),
            load_time_ms: self.load_time_ms,
            compression_ratios: self.ratios,
            css,
            js,
            images,
            fonts,
            other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisRun;
    use crate::observation::{ResourceObservation, ResourceType};

    fn sample_report() -> AggregateReport {
        let mut run = AnalysisRun::default();
        run.set_analyzed_url("https://a.com/");
        run.ingest(&ResourceObservation::new("https://a.com/", Some(ResourceType::Document)).with_size(900));
        run.ingest(&ResourceObservation::new("https://cdn.a/app.js?v=1", Some(ResourceType::Script)).with_size(1000));
        run.ingest(&ResourceObservation::new("https://cdn.a/app.js?v=2", Some(ResourceType::Script)).with_size(1000));
        run.ingest(&ResourceObservation::new("https://cdn.b/vendor.js", Some(ResourceType::Script)).with_size(2048));
        run.ingest(&ResourceObservation::new("https://cdn.a/app.css", Some(ResourceType::Stylesheet)).with_size(500));
        run.finish()
    }

    #[test]
    fn test_totals() {
        let report = sample_report();
        assert_eq!(report.observed, 5);
        assert_eq!(report.excluded, 1);
        assert_eq!(report.total_requests, 4);
        assert_eq!(report.total_raw_size, 4548);
        assert_eq!(report.total_raw_size_display, "4.44 KB");
        assert_eq!(report.unique_domains, 2);
    }

    #[test]
    fn test_category_figures() {
        let report = sample_report();

        let js = report.category(Category::Js);
        assert_eq!(js.count, 3);
        assert_eq!(js.unique_count, 2);
        assert_eq!(js.raw_size_total, 4048);
        assert_eq!(js.total_size, "3.95 KB");
        assert_eq!(js.compression_ratio, 0.33);
        // round(4048 * 0.33)
        assert_eq!(js.estimated_transfer_total, 1336);
        assert_eq!(js.total_original_size, js.total_transfer_size);

        let css = report.category(Category::Css);
        assert_eq!(css.count, 1);
        assert_eq!(css.total_size, "500.00 Bytes");

        assert_eq!(report.category(Category::Font).total_size, "0 Bytes");
    }

    #[test]
    fn test_summary_table() {
        let table = sample_report().render_summary_table();
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Category"));
        assert!(lines[0].contains("Transfer (est.)"));
        assert!(lines.iter().any(|l| l.starts_with("JavaScript") && l.contains("3.95 KB")));
        assert!(lines.iter().any(|l| l.starts_with("Fonts") && l.contains("0 Bytes")));
        assert!(lines.last().unwrap().starts_with("Total"));
        assert!(lines.last().unwrap().contains("4.44 KB"));
    }

    #[test]
    fn test_domain_table_first_seen_order() {
        let report = sample_report();
        let table = report.render_domain_table(Category::Js);

        let a = table.find("cdn.a").unwrap();
        let b = table.find("cdn.b").unwrap();
        assert!(a < b, "cdn.a was seen first even though cdn.b is larger");
        assert!(table.starts_with("JavaScript by domain"));

        let empty = report.render_domain_table(Category::Font);
        assert!(empty.contains("(no requests)"));
    }

    #[test]
    fn test_domain_tables_skip_empty_categories() {
        let tables = sample_report().render_domain_tables();
        assert!(tables.contains("CSS by domain"));
        assert!(tables.contains("JavaScript by domain"));
        assert!(!tables.contains("Fonts by domain"));
    }

    #[test]
    fn test_json_roundtrip_keeps_nesting() {
        let report = sample_report();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["js"]["count"], 3);
        assert_eq!(json["js"]["domainStats"]["cdn.a"]["count"], 2);
        assert_eq!(
            json["js"]["domainStats"]["cdn.a"]["requests"][1]["url"],
            "https://cdn.a/app.js?v=2"
        );
        assert_eq!(json["css"]["entries"][0]["normalized"], "https://cdn.a/app.css");
        assert_eq!(json["compressionRatios"]["css"], 0.235);

        let back: AggregateReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_build_merges_repeated_category() {
        let mut first = CategoryBucket::new(Category::Js);
        first.record(&ResourceObservation::new("https://a.com/a.js", Some(ResourceType::Script)).with_size(10), 0.33);
        let mut second = CategoryBucket::new(Category::Js);
        second.record(&ResourceObservation::new("https://b.com/b.js", Some(ResourceType::Script)).with_size(20), 0.33);

        let report = ReportBuilder::new(CompressionRatios::default()).build(vec![first, second]);
        assert_eq!(report.js.count, 2);
        assert_eq!(report.js.unique_count, 2);
        assert_eq!(report.js.raw_size_total, 30);
        assert_eq!(report.total_requests, 2);
        assert_eq!(report.unique_domains, 2);
    }

    #[test]
    fn test_totals_saturate() {
        let huge = u64::MAX / 2 + 1;
        let mut images = CategoryBucket::new(Category::Image);
        images.record(&ResourceObservation::new("https://a.com/a.png", Some(ResourceType::Image)).with_size(huge), 1.0);
        let mut fonts = CategoryBucket::new(Category::Font);
        fonts.record(&ResourceObservation::new("https://a.com/a.woff2", Some(ResourceType::Font)).with_size(huge), 1.0);

        let report = ReportBuilder::new(CompressionRatios::default()).build(vec![images, fonts]);
        assert_eq!(report.total_raw_size, u64::MAX);
        assert_eq!(report.total_requests, 2);
    }

    #[test]
    fn test_build_without_run_metadata() {
        let mut js = CategoryBucket::new(Category::Js);
        js.record(&ResourceObservation::new("https://a.com/a.js", Some(ResourceType::Script)).with_size(10), 0.33);

        let report = ReportBuilder::new(CompressionRatios::default()).build(vec![js]);
        assert_eq!(report.observed, 1);
        assert_eq!(report.excluded, 0);
        assert_eq!(report.total_requests, 1);
        assert_eq!(report.css.count, 0);
        assert_eq!(report.load_time_ms, None);
        assert_eq!(report.analyzed_url, None);
    }
}
