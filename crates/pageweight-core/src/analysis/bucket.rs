use super::{Category, format_size, normalize_url};
use crate::observation::{Initiator, ResourceObservation};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use url::Url;

/// First-seen representative of one dedup key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupedEntry {
    pub url: String,
    pub normalized: String,
    pub initiator: Initiator,
    pub size: String,
    pub size_bytes: u64,
    pub transfer_size: String,
    pub transfer_size_bytes: u64,
    pub status: u16,
    pub cached: bool,
    pub redirects: Vec<String>,
}

/// One request as listed under its hostname
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub url: String,
    pub size: String,
    pub size_bytes: u64,
    pub estimated_transfer: String,
    pub estimated_transfer_bytes: u64,
    pub status: u16,
    pub cached: bool,
    pub redirects: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainBucket {
    pub count: usize,
    pub raw_size_total: u64,
    pub estimated_transfer_total: u64,
    pub requests: Vec<RequestSummary>,
}

/// Per-hostname buckets in first-seen order.
///
/// Serializes as a map whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainStats {
    buckets: Vec<(String, DomainBucket)>,
    index: HashMap<String, usize>,
}

impl DomainStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for `host`, created empty on first use
    pub fn bucket_mut(&mut self, host: &str) -> &mut DomainBucket {
        let idx = match self.index.get(host) {
            Some(idx) => *idx,
            None => {
                self.buckets.push((host.to_string(), DomainBucket::default()));
                let idx = self.buckets.len() - 1;
                self.index.insert(host.to_string(), idx);
                idx
            }
        };
        &mut self.buckets[idx].1
    }

    pub fn get(&self, host: &str) -> Option<&DomainBucket> {
        self.index.get(host).map(|idx| &self.buckets[*idx].1)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(host, _)| host.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DomainBucket)> {
        self.buckets.iter().map(|(host, bucket)| (host.as_str(), bucket))
    }

    /// Add another set of domain buckets; hosts new to this set go last
    pub fn merge(&mut self, other: DomainStats) {
        for (host, incoming) in other.buckets {
            let bucket = self.bucket_mut(&host);
            bucket.count = bucket.count.saturating_add(incoming.count);
            bucket.raw_size_total = bucket.raw_size_total.saturating_add(incoming.raw_size_total);
            bucket.estimated_transfer_total = bucket
                .estimated_transfer_total
                .saturating_add(incoming.estimated_transfer_total);
            bucket.requests.extend(incoming.requests);
        }
    }
}

impl Serialize for DomainStats {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (host, bucket) in &self.buckets {
            map.serialize_entry(host, bucket)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DomainStats {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DomainStatsVisitor;

        impl<'de> Visitor<'de> for DomainStatsVisitor {
            type Value = DomainStats;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of hostname to domain stats")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut stats = DomainStats::new();
                while let Some((host, bucket)) = access.next_entry::<String, DomainBucket>()? {
                    *stats.bucket_mut(&host) = bucket;
                }
                Ok(stats)
            }
        }

        deserializer.deserialize_map(DomainStatsVisitor)
    }
}

/// Accumulator for one category during one run
#[derive(Debug, Clone)]
pub struct CategoryBucket {
    pub category: Category,
    /// Every observation routed here, duplicates included
    pub count: usize,
    pub raw_size_total: u64,
    pub transfer_size_total: u64,
    pub entries: Vec<DedupedEntry>,
    pub domain_stats: DomainStats,
    seen: HashSet<String>,
}

impl CategoryBucket {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            count: 0,
            raw_size_total: 0,
            transfer_size_total: 0,
            entries: Vec::new(),
            domain_stats: DomainStats::new(),
            seen: HashSet::new(),
        }
    }

    /// Identity of a logical request: normalized URL, initiator and redirect path
    pub fn dedup_key(obs: &ResourceObservation) -> String {
        entry_key(&normalize_url(&obs.url), &obs.initiator, &obs.redirect_chain)
    }

    /// Count the observation and keep it as a representative if its key is new.
    ///
    /// Size totals grow on every call; only `entries` is deduplicated.
    pub fn dedupe(&mut self, obs: &ResourceObservation) -> bool {
        self.count = self.count.saturating_add(1);
        self.raw_size_total = self.raw_size_total.saturating_add(obs.size);
        self.transfer_size_total = self.transfer_size_total.saturating_add(obs.transfer_size);

        let key = Self::dedup_key(obs);
        if !self.seen.insert(key) {
            tracing::debug!("Repeat {} observation: {}", self.category, obs.url);
            return false;
        }

        self.entries.push(DedupedEntry {
            url: obs.url.clone(),
            normalized: normalize_url(&obs.url),
            initiator: obs.initiator.clone(),
            size: format_size(obs.size),
            size_bytes: obs.size,
            transfer_size: format_size(obs.transfer_size),
            transfer_size_bytes: obs.transfer_size,
            status: obs.status,
            cached: obs.from_cache,
            redirects: obs.redirect_chain.clone(),
        });
        true
    }

    /// Roll the observation into its hostname's bucket.
    ///
    /// Returns false when the URL has no hostname; the run carries on.
    pub fn aggregate(&mut self, obs: &ResourceObservation, ratio: f64) -> bool {
        let host = match Url::parse(&obs.url) {
            Ok(url) => match url.host_str() {
                Some(host) => host.to_string(),
                None => {
                    tracing::warn!("No host in {} URL, skipping domain stats: {}", self.category, obs.url);
                    return false;
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {} URL {}, skipping domain stats: {}",
                    self.category,
                    obs.url,
                    e
                );
                return false;
            }
        };

        let estimated = estimate_transfer(obs.size, ratio);
        let bucket = self.domain_stats.bucket_mut(&host);
        bucket.count = bucket.count.saturating_add(1);
        bucket.raw_size_total = bucket.raw_size_total.saturating_add(obs.size);
        bucket.estimated_transfer_total = bucket.estimated_transfer_total.saturating_add(estimated);
        bucket.requests.push(RequestSummary {
            url: obs.url.clone(),
            size: format_size(obs.size),
            size_bytes: obs.size,
            estimated_transfer: format_size(estimated),
            estimated_transfer_bytes: estimated,
            status: obs.status,
            cached: obs.from_cache,
            redirects: obs.redirect_chain.clone(),
        });
        true
    }

    /// Dedupe, then aggregate by domain. Returns whether the key was new.
    pub fn record(&mut self, obs: &ResourceObservation, ratio: f64) -> bool {
        let is_new = self.dedupe(obs);
        self.aggregate(obs, ratio);
        is_new
    }

    /// Fold another bucket of the same category into this one.
    ///
    /// Totals add up, entries stay deduplicated across both and the other
    /// bucket's domains follow this one's in first-seen order.
    pub fn merge(&mut self, other: CategoryBucket) {
        self.count = self.count.saturating_add(other.count);
        self.raw_size_total = self.raw_size_total.saturating_add(other.raw_size_total);
        self.transfer_size_total = self
            .transfer_size_total
            .saturating_add(other.transfer_size_total);

        for entry in other.entries {
            let key = entry_key(&entry.normalized, &entry.initiator, &entry.redirects);
            if self.seen.insert(key) {
                self.entries.push(entry);
            }
        }

        self.domain_stats.merge(other.domain_stats);
    }

    /// Number of distinct logical resources
    pub fn unique_count(&self) -> usize {
        self.entries.len()
    }

    pub fn estimated_transfer_total(&self, ratio: f64) -> u64 {
        estimate_transfer(self.raw_size_total, ratio)
    }
}

fn entry_key(normalized: &str, initiator: &Initiator, redirects: &[String]) -> String {
    [
        normalized.to_string(),
        initiator.kind.clone(),
        initiator.url.clone(),
        initiator.top_frame_url.to_lowercase(),
        redirects.join("|"),
    ]
    .join("__")
}

pub(crate) fn estimate_transfer(size: u64, ratio: f64) -> u64 {
    (size as f64 * ratio).round() as u64
}
