use super::{Initiator, ResourceObservation, ResourceType, ValidityRules};
use crate::har::{Entry, Har};
use std::collections::HashMap;
use url::Url;

/// Turn every HAR entry into an observation, in capture order.
///
/// Redirect hops are separate 3xx entries in a HAR; the hops leading to an
/// entry are folded into its `redirect_chain`.
pub fn observations_from_har(har: &Har, rules: &ValidityRules) -> Vec<ResourceObservation> {
    let mut pending_redirects: HashMap<String, Vec<String>> = HashMap::new();
    let mut observations = Vec::with_capacity(har.log.entries.len());

    for entry in &har.log.entries {
        let request_url = &entry.request.url;
        let chain = pending_redirects
            .remove(&canonical_url(request_url))
            .unwrap_or_default();

        let redirect_target = &entry.response.redirect_url;
        if !redirect_target.is_empty() {
            let target = Url::parse(request_url)
                .and_then(|base| base.join(redirect_target))
                .map(|u| u.to_string())
                .unwrap_or_else(|_| redirect_target.clone());

            let mut next_chain = chain.clone();
            next_chain.push(request_url.clone());
            pending_redirects.insert(canonical_url(&target), next_chain);
        }

        observations.push(observation_from_entry(entry, chain, rules));
    }

    tracing::debug!(
        "Converted {} HAR entries into observations",
        observations.len()
    );

    observations
}

fn observation_from_entry(
    entry: &Entry,
    redirect_chain: Vec<String>,
    rules: &ValidityRules,
) -> ResourceObservation {
    let response = &entry.response;

    let status = u16::try_from(response.status).unwrap_or(0);
    let size = response.content.size.max(0) as u64;
    let content_type = response
        .header("content-type")
        .unwrap_or(&response.content.mime_type)
        .to_string();

    let transfer_size = entry
        .transfer_size
        .filter(|t| *t > 0)
        .map(|t| t as u64)
        .or_else(|| {
            response
                .header("content-length")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
        })
        .or_else(|| (response.body_size > 0).then_some(response.body_size as u64))
        .unwrap_or(size);

    let initiator = entry
        .initiator
        .as_ref()
        .map(|i| Initiator {
            kind: i.kind.clone(),
            url: i.url.clone().unwrap_or_default(),
            top_frame_url: i.top_frame_url().unwrap_or_default().to_string(),
        })
        .unwrap_or_default();

    ResourceObservation {
        url: entry.request.url.clone(),
        declared_type: entry.resource_type.as_deref().and_then(ResourceType::parse),
        is_valid: rules.is_valid(status, size, &content_type),
        content_type,
        size,
        transfer_size,
        status,
        from_cache: entry.from_cache.is_some(),
        initiator,
        redirect_chain,
    }
}

fn canonical_url(raw: &str) -> String {
    Url::parse(raw)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| raw.to_string())
}
