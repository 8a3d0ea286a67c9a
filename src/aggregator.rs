use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::{error, info, warn};

use crate::error::SourceError;
use crate::fetcher::{Browser, PageFetcher};
use crate::job::{JobCandidate, JobRecord};
use crate::normalizer;
use crate::policy::Policy;
use crate::sources::{self, SourceSpec};

/// Per-source result of a run, for the summary log.
#[derive(Debug)]
pub struct SourceOutcome {
    pub label: String,
    pub accepted: usize,
    pub seen: usize,
    pub error: Option<SourceError>,
}

#[derive(Debug)]
pub struct Aggregation {
    pub records: Vec<JobRecord>,
    pub outcomes: Vec<SourceOutcome>,
}

/// Drives every source through one exclusive browsing session.
pub struct Aggregator<'p, B: Browser> {
    policy: &'p Policy,
    fetcher: PageFetcher<B>,
}

impl<'p, B: Browser> Aggregator<'p, B> {
    pub fn new(policy: &'p Policy, fetcher: PageFetcher<B>) -> Self {
        Aggregator { policy, fetcher }
    }

    pub fn fetcher(&self) -> &PageFetcher<B> {
        &self.fetcher
    }

    /// Runs all sources in tier order, then normalizes and deduplicates the accepted
    /// candidates. A failing source contributes nothing and never stops the run.
    pub fn aggregate_all(&mut self, specs: &[SourceSpec]) -> Aggregation {
        let mut ordered: Vec<&SourceSpec> = specs.iter().collect();
        ordered.sort_by_key(|s| s.tier);

        info!("Starting multi-source scraping over {} sources...", ordered.len());
        let mut accumulator: Vec<JobCandidate> = Vec::new();
        let mut outcomes = Vec::with_capacity(ordered.len());

        for (i, source) in ordered.iter().enumerate() {
            let label = source.label();
            info!("Processing {} / {} : {}", i + 1, ordered.len(), label);

            let policy = self.policy;
            let fetcher = &mut self.fetcher;
            let result = panic::catch_unwind(AssertUnwindSafe(|| sources::collect(source, fetcher, policy)))
                .unwrap_or_else(|payload| {
                    Err(SourceError::Panicked {
                        source_id: source.id,
                        message: panic_message(payload.as_ref()),
                    })
                });

            match result {
                Ok(collected) => {
                    info!(
                        "{}: {} of {} candidates accepted ({} / {} pages loaded)",
                        label,
                        collected.accepted.len(),
                        collected.seen,
                        collected.pages_loaded,
                        collected.pages_attempted
                    );
                    outcomes.push(SourceOutcome {
                        label,
                        accepted: collected.accepted.len(),
                        seen: collected.seen,
                        error: None,
                    });
                    accumulator.extend(collected.accepted);
                }
                Err(e) => {
                    if e.is_defect() {
                        error!("{}: {}", label, e);
                    } else {
                        warn!("{}: {}", label, e);
                    }
                    outcomes.push(SourceOutcome {
                        label,
                        accepted: 0,
                        seen: 0,
                        error: Some(e),
                    });
                }
            }
        }

        let normalized: Vec<JobRecord> = accumulator.iter().filter_map(normalizer::normalize).collect();
        let records = normalizer::dedupe(normalized);
        info!(
            "Scraping complete: {} accepted candidates, {} unique jobs.",
            accumulator.len(),
            records.len()
        );

        Aggregation { records, outcomes }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::extractor::Strategy;
    use crate::fetcher::fixtures::FixtureBrowser;
    use crate::sources::{SourceId, SourceKind, Snippet, Tier};
    use std::time::Duration;
    use url::Url;

    fn single(id: SourceId, tier: Tier, url: &str, strategies: Vec<Strategy>) -> SourceSpec {
        SourceSpec {
            id,
            tier,
            kind: SourceKind::Single { url: url.to_string() },
            strategies,
            settle: Duration::ZERO,
            scroll: None,
            snippet: Snippet::None,
        }
    }

    #[test]
    fn two_sources_resolve_links_and_collapse_duplicates() {
        let browser = FixtureBrowser::new()
            .page(
                "https://a.example/list",
                r#"<table><tr><td>1</td><td>Python Intern</td><td>Acme</td><td><a href="/jobs/1">open</a></td></tr></table>"#,
            )
            .page(
                "https://b.example/search",
                r#"<table><tr><td>9</td><td>python intern</td><td>acme</td><td><a href="https://a.example/jobs/1">open</a></td></tr></table>"#,
            );
        let policy = Policy::default();
        let mut aggregator = Aggregator::new(&policy, PageFetcher::new(browser).without_delays());

        let sources = vec![
            single(SourceId::Infopark, Tier::RegionalPark, "https://a.example/list", vec![Strategy::table("tr", 1, 2, 3)]),
            single(SourceId::Indeed, Tier::SearchPortal, "https://b.example/search", vec![Strategy::table("tr", 1, 2, 3)]),
        ];
        let result = aggregator.aggregate_all(&sources);

        assert_eq!(
            result.records,
            vec![JobRecord {
                title: "Python Intern".to_string(),
                company: "Acme".to_string(),
                link: "https://a.example/jobs/1".to_string(),
            }]
        );
        assert_eq!(result.outcomes.iter().map(|o| o.accepted).sum::<usize>(), 2);
    }

    #[test]
    fn sources_run_in_tier_order() {
        let browser = FixtureBrowser::new();
        let policy = Policy::default();
        let mut aggregator = Aggregator::new(&policy, PageFetcher::new(browser).without_delays());

        let sources = vec![
            single(SourceId::LinkedIn, Tier::BestEffort, "https://l.example/", vec![Strategy::GenericAnchor]),
            single(SourceId::Indeed, Tier::SearchPortal, "https://i.example/", vec![Strategy::GenericAnchor]),
            single(SourceId::Infopark, Tier::RegionalPark, "https://p.example/", vec![Strategy::GenericAnchor]),
        ];
        let result = aggregator.aggregate_all(&sources);

        assert_eq!(
            aggregator.fetcher().browser().visited,
            vec!["https://p.example/", "https://i.example/", "https://l.example/"]
        );
        assert!(result.records.is_empty());
        assert!(result.outcomes.iter().all(|o| o.error.is_some()));
    }

    #[test]
    fn broken_source_does_not_abort_the_run() {
        let browser = FixtureBrowser::new().page("https://ok.example/", "<a href='/1'>React Developer</a>");
        let policy = Policy::default();
        let mut aggregator = Aggregator::new(&policy, PageFetcher::new(browser).without_delays());

        let sources = vec![
            single(SourceId::Cyberpark, Tier::RegionalPark, "https://ok.example/", vec![Strategy::anchors("a[")]),
            single(SourceId::Stpi, Tier::RegionalPark, "https://down.example/", vec![Strategy::GenericAnchor]),
            single(SourceId::TidelPark, Tier::RegionalPark, "https://ok.example/", vec![Strategy::GenericAnchor]),
        ];
        let result = aggregator.aggregate_all(&sources);

        assert!(result.outcomes[0].error.as_ref().unwrap().is_defect());
        assert!(!result.outcomes[1].error.as_ref().unwrap().is_defect());
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].company, "TIDEL Park Chennai");
    }

    struct PanickingBrowser;

    impl Browser for PanickingBrowser {
        fn navigate(&mut self, _url: &Url) -> Result<(), FetchError> {
            panic!("driver crashed")
        }

        fn page_source(&self) -> Result<String, FetchError> {
            Err(FetchError::NoPage)
        }

        fn scroll_step(&mut self) -> Result<(), FetchError> {
            Ok(())
        }
    }

    #[test]
    fn panicking_collector_is_reported_distinctly() {
        let policy = Policy::default();
        let mut aggregator = Aggregator::new(&policy, PageFetcher::new(PanickingBrowser).without_delays());
        let sources = vec![single(SourceId::Stpi, Tier::RegionalPark, "https://x.example/", vec![Strategy::GenericAnchor])];

        let result = aggregator.aggregate_all(&sources);
        match &result.outcomes[0].error {
            Some(SourceError::Panicked { message, .. }) => assert_eq!(message, "driver crashed"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
