use std::future::Future;

use chrono::{DateTime, Utc};

use super::prelude::*;

/// Probes every domain concurrently, one task per domain, and waits for all of them.
///
/// The returned results are in the same order as `domains`: the join handles are
/// awaited by index, so completion order does not matter. A probe task that panics
/// is recorded as that domain's error and does not affect the others.
pub async fn probe_all<F, Fut>(domains: &[String], probe: F) -> Vec<ProbeResult>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<DateTime<Utc>, ProbeError>> + Send + 'static,
{
    let mut handles = Vec::with_capacity(domains.len());
    for domain in domains {
        handles.push(tokio::spawn(probe(domain.clone())));
    }

    let mut results = Vec::with_capacity(domains.len());
    for (domain, handle) in domains.iter().zip(handles) {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(ProbeError::Task(e.to_string())),
        };
        match &outcome {
            Ok(not_after) => log::debug!("{domain}: certificate valid until {not_after}"),
            Err(e) => log::debug!("{domain}: probe failed: {e}"),
        }
        results.push(ProbeResult::new(domain.clone(), outcome));
    }
    results
}
