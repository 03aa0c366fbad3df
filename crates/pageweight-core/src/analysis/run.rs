use super::{AggregateReport, Category, CategoryBucket, Classification, ReportBuilder, classify};
use crate::CompressionRatios;
use crate::observation::ResourceObservation;

/// Owns every accumulator for one analysis.
///
/// Build a fresh run per page. Observations can be fed one at a time as they
/// arrive or all at once; the buckets are the only state carried between
/// calls.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    ratios: CompressionRatios,
    buckets: [CategoryBucket; 5],
    observed: usize,
    excluded: usize,
    analyzed_url: Option<String>,
    load_time_ms: Option<f64>,
}

impl AnalysisRun {
    pub fn new(ratios: CompressionRatios) -> Self {
        Self {
            ratios,
            buckets: Category::ALL.map(CategoryBucket::new),
            observed: 0,
            excluded: 0,
            analyzed_url: None,
            load_time_ms: None,
        }
    }

    pub fn set_analyzed_url(&mut self, url: &str) {
        self.analyzed_url = Some(url.to_string());
    }

    pub fn set_load_time_ms(&mut self, ms: f64) {
        self.load_time_ms = Some(ms);
    }

    /// Classify one observation and fold it into its bucket
    pub fn ingest(&mut self, obs: &ResourceObservation) -> Classification {
        self.observed += 1;

        let classification = classify(obs);
        match classification {
            Classification::Counted(category) => {
                self.handle_resource(obs, category);
            }
            Classification::Excluded(reason) => {
                self.excluded += 1;
                tracing::debug!("Excluded ({}): {}", reason.as_str(), obs.url);
            }
        }
        classification
    }

    pub fn ingest_all<'a, I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = &'a ResourceObservation>,
    {
        for obs in observations {
            self.ingest(obs);
        }
    }

    /// Record an observation already routed to `category`
    pub fn handle_resource(&mut self, obs: &ResourceObservation, category: Category) -> bool {
        let ratio = self.ratios.get(category);
        self.buckets[category.index()].record(obs, ratio)
    }

    pub fn bucket(&self, category: Category) -> &CategoryBucket {
        &self.buckets[category.index()]
    }

    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Close the run and build its report
    pub fn finish(self) -> AggregateReport {
        tracing::debug!(
            "Finishing run: {} observed, {} excluded",
            self.observed,
            self.excluded
        );

        ReportBuilder::new(self.ratios)
            .analyzed_url(self.analyzed_url)
            .load_time_ms(self.load_time_ms)
            .observed(self.observed)
            .build(self.buckets)
    }
}

impl Default for AnalysisRun {
    fn default() -> Self {
        Self::new(CompressionRatios::default())
    }
}
