use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};

use crate::classifier::{self, Verdict};
use crate::error::SourceError;
use crate::extractor::{self, Extractor, LinkRule, Strategy, StrategyUsed};
use crate::fetcher::{Browser, FetchedPage, PageFetcher, ScrollPlan};
use crate::job::JobCandidate;
use crate::policy::Policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Infopark,
    Technopark,
    Cyberpark,
    SmartCityKochi,
    TidelPark,
    Stpi,
    BengaluruHub,
    Indeed,
    Naukri,
    LinkedIn,
}

impl SourceId {
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceId::Infopark => "Infopark",
            SourceId::Technopark => "Technopark",
            SourceId::Cyberpark => "Cyberpark",
            SourceId::SmartCityKochi => "SmartCity Kochi",
            SourceId::TidelPark => "TIDEL Park Chennai",
            SourceId::Stpi => "STPI India",
            SourceId::BengaluruHub => "Bengaluru Hub",
            SourceId::Indeed => "Indeed",
            SourceId::Naukri => "Naukri",
            SourceId::LinkedIn => "LinkedIn",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Aggregation priority. Lower tiers run first so failures further down cannot
/// disturb what was already collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    RegionalPark,
    SearchPortal,
    BestEffort,
}

#[derive(Debug, Clone, Copy)]
pub enum SearchPaging {
    /// `{offset}` = page index × page size, page index starting at 0.
    Offset { page_size: usize },
    /// `{page}` = 1-based page number.
    PageNumber,
}

#[derive(Debug, Clone)]
pub enum SourceKind {
    Single { url: String },
    /// `{page}` in the template runs from 1 to `pages`.
    Paged { template: String, pages: usize },
    Search {
        template: String,
        terms: Vec<String>,
        separator: String,
        pages: usize,
        paging: SearchPaging,
    },
    /// A landing page whose career/job links are followed one level deep.
    Hub { url: String, keywords: Vec<String>, max_links: usize },
}

/// Which text besides the title is handed to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snippet {
    None,
    Company,
}

#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub id: SourceId,
    pub tier: Tier,
    pub kind: SourceKind,
    pub strategies: Vec<Strategy>,
    pub settle: Duration,
    pub scroll: Option<ScrollPlan>,
    pub snippet: Snippet,
}

impl SourceSpec {
    pub fn label(&self) -> String {
        match &self.kind {
            SourceKind::Hub { url, .. } => format!("{} ({})", self.id, url),
            _ => self.id.to_string(),
        }
    }
}

/// What one source produced in a run.
#[derive(Debug, Default)]
pub struct Collected {
    pub accepted: Vec<JobCandidate>,
    pub seen: usize,
    pub pages_attempted: usize,
    pub pages_loaded: usize,
    pub fallbacks: usize,
}

const PARK_SETTLE: Duration = Duration::from_millis(1200);
const PORTAL_SETTLE: Duration = Duration::from_secs(2);
const HUB_PAGE_SETTLE: Duration = Duration::from_secs(1);
const SCROLL_PAUSE: Duration = Duration::from_millis(700);

const INFOPARK_PAGES: usize = 6;
const TECHNOPARK_PAGES: usize = 6;
const INDEED_PAGES: usize = 4;
const NAUKRI_PAGES: usize = 3;
const LINKEDIN_PAGES: usize = 1;

const SEARCH_TERMS: &[&str] = &["python", "data analyst", "data scientist", "machine learning", "react"];
const HUB_KEYWORDS: &[&str] = &["career", "job", "vacancy"];
const HUB_URLS: &[&str] = &["https://manyata.com", "https://itpbengaluru.org", "https://www.embassymanyata.com"];

fn terms() -> Vec<String> {
    SEARCH_TERMS.iter().map(|t| t.to_string()).collect()
}

fn park_table(id: SourceId, template: &str, pages: usize) -> SourceSpec {
    SourceSpec {
        id,
        tier: Tier::RegionalPark,
        kind: SourceKind::Paged { template: template.to_string(), pages },
        strategies: vec![Strategy::table("table tr", 1, 2, 3), Strategy::GenericAnchor],
        settle: PARK_SETTLE,
        scroll: None,
        snippet: Snippet::None,
    }
}

fn park_page(id: SourceId, url: &str, anchors: &str, fallback: bool) -> SourceSpec {
    let mut strategies = vec![Strategy::anchors(anchors)];
    if fallback {
        strategies.push(Strategy::GenericAnchor);
    }
    SourceSpec {
        id,
        tier: Tier::RegionalPark,
        kind: SourceKind::Single { url: url.to_string() },
        strategies,
        settle: PARK_SETTLE,
        scroll: None,
        snippet: Snippet::None,
    }
}

/// The built-in source list, in the order the sites are visited.
pub fn catalog() -> Vec<SourceSpec> {
    let mut sources = vec![
        park_table(SourceId::Infopark, "https://infopark.in/companies/job-search?page={page}", INFOPARK_PAGES),
        park_table(SourceId::Technopark, "https://technopark.in/job-search?page={page}", TECHNOPARK_PAGES),
        park_page(
            SourceId::Cyberpark,
            "https://cyberparks.in/careers",
            "a[href*='job'], a[href*='career'], .job, .career, .vacancy, .job-card",
            true,
        ),
        park_page(
            SourceId::SmartCityKochi,
            "https://smartcitykochi.in/careers",
            "a[href*='job'], a[href*='career'], .vacancy, .career-item, .job-card",
            true,
        ),
        park_page(
            SourceId::TidelPark,
            "https://www.tidelpark.com/careers",
            "a[href*='career'], a[href*='job'], .career, .vacancy",
            false,
        ),
        park_page(
            SourceId::Stpi,
            "https://www.stpi.in/career",
            "a[href*='career'], a[href*='job'], .vacancy, .career",
            false,
        ),
    ];

    for url in HUB_URLS {
        sources.push(SourceSpec {
            id: SourceId::BengaluruHub,
            tier: Tier::RegionalPark,
            kind: SourceKind::Hub {
                url: url.to_string(),
                keywords: HUB_KEYWORDS.iter().map(|k| k.to_string()).collect(),
                max_links: 10,
            },
            strategies: vec![Strategy::GenericAnchor],
            settle: PARK_SETTLE,
            scroll: None,
            snippet: Snippet::None,
        });
    }

    sources.push(SourceSpec {
        id: SourceId::Indeed,
        tier: Tier::SearchPortal,
        kind: SourceKind::Search {
            template: "https://www.indeed.co.in/jobs?q={query}&l=India&start={offset}".to_string(),
            terms: terms(),
            separator: "+".to_string(),
            pages: INDEED_PAGES,
            paging: SearchPaging::Offset { page_size: 10 },
        },
        strategies: vec![
            Strategy::cards(
                "a[data-jk], .job_seen_beacon, .result",
                Some("h2.jobTitle, .jobTitle, .title"),
                Some(".companyName, .company"),
                vec![
                    LinkRule::Attribute {
                        name: "data-jk".to_string(),
                        template: "https://www.indeed.co.in/viewjob?jk={value}".to_string(),
                    },
                    LinkRule::OwnHref,
                ],
                120,
            ),
            Strategy::cards("a[href*='/rc/clk']", Some("h2.jobTitle, .jobTitle, .title"), None, vec![LinkRule::OwnHref], 120),
        ],
        settle: PORTAL_SETTLE,
        scroll: Some(ScrollPlan { steps: 5, pause: SCROLL_PAUSE }),
        snippet: Snippet::Company,
    });

    sources.push(SourceSpec {
        id: SourceId::Naukri,
        tier: Tier::SearchPortal,
        kind: SourceKind::Search {
            template: "https://www.naukri.com/{query}-jobs-{page}".to_string(),
            terms: terms(),
            separator: "%20".to_string(),
            pages: NAUKRI_PAGES,
            paging: SearchPaging::PageNumber,
        },
        strategies: vec![
            Strategy::cards(
                ".jobTuple, .jobCard, .list",
                None,
                Some(".company, .orgName, .companyName"),
                vec![LinkRule::OwnHref, LinkRule::FirstAnchor],
                140,
            ),
            Strategy::GenericAnchor,
        ],
        settle: PORTAL_SETTLE,
        scroll: Some(ScrollPlan { steps: 4, pause: SCROLL_PAUSE }),
        snippet: Snippet::Company,
    });

    sources.push(SourceSpec {
        id: SourceId::LinkedIn,
        tier: Tier::BestEffort,
        kind: SourceKind::Search {
            template: "https://www.linkedin.com/jobs/search?keywords={query}&location=India&start={offset}".to_string(),
            terms: terms(),
            separator: "%20".to_string(),
            pages: LINKEDIN_PAGES,
            paging: SearchPaging::Offset { page_size: 25 },
        },
        strategies: vec![Strategy::cards(
            ".result-card__contents, .jobs-search-results__list-item, .base-search-card__info",
            Some("h3, .base-search-card__title"),
            Some("h4, .base-search-card__subtitle"),
            vec![LinkRule::FirstAnchor],
            120,
        )],
        settle: PORTAL_SETTLE,
        scroll: Some(ScrollPlan { steps: 6, pause: SCROLL_PAUSE }),
        snippet: Snippet::Company,
    });

    sources
}

/// Form-encodes each term (spaces become `+`) and joins them with `separator`.
pub fn encode_query(terms: &[String], separator: &str) -> String {
    terms
        .iter()
        .map(|t| urlencoding::encode(t.trim()).replace("%20", "+"))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Every URL a search source visits, in order.
pub fn search_urls(template: &str, terms: &[String], separator: &str, pages: usize, paging: SearchPaging) -> Vec<String> {
    let query = encode_query(terms, separator);
    (0..pages)
        .map(|index| {
            let url = template.replace("{query}", &query);
            match paging {
                SearchPaging::Offset { page_size } => url.replace("{offset}", &(index * page_size).to_string()),
                SearchPaging::PageNumber => url.replace("{page}", &(index + 1).to_string()),
            }
        })
        .collect()
}

/// Fetches, extracts and classifies one source. Page-level failures are skipped;
/// a source where no page could be loaded at all is reported as unreachable.
pub fn collect<B: Browser>(
    source: &SourceSpec,
    fetcher: &mut PageFetcher<B>,
    policy: &Policy,
) -> Result<Collected, SourceError> {
    let extractor = Extractor::new(&source.strategies).map_err(|reason| SourceError::Extractor {
        source_id: source.id,
        reason,
    })?;
    let mut collected = Collected::default();
    let identity = source.id.display_name();
    if source.scroll.is_some() && !fetcher.can_scroll() {
        info!("{}: session cannot scroll, lazy-loaded results will be missing.", source.id);
    }

    match &source.kind {
        SourceKind::Single { url } => {
            if let Some(page) = load(source, fetcher, url, &mut collected) {
                take(source, policy, &extractor, &page, identity, &mut collected);
            }
        }
        SourceKind::Paged { template, pages } => {
            for number in 1..=*pages {
                let url = template.replace("{page}", &number.to_string());
                let page = match load(source, fetcher, &url, &mut collected) {
                    Some(p) => p,
                    None => continue,
                };
                let used = take(source, policy, &extractor, &page, identity, &mut collected);
                if !matches!(used, StrategyUsed::Structured(_)) {
                    info!("{}: listing missing on page {}. Stopping pagination.", source.id, number);
                    break;
                }
            }
        }
        SourceKind::Search { template, terms, separator, pages, paging } => {
            for url in search_urls(template, terms, separator, *pages, *paging) {
                match load(source, fetcher, &url, &mut collected) {
                    Some(page) => {
                        take(source, policy, &extractor, &page, identity, &mut collected);
                    }
                    None if source.tier == Tier::BestEffort => {
                        warn!("{}: page failed, giving up on this source (likely blocked).", source.id);
                        break;
                    }
                    None => continue,
                }
            }
        }
        SourceKind::Hub { url, keywords, max_links } => {
            if let Some(hub) = load(source, fetcher, url, &mut collected) {
                let host = hub.url.host_str().unwrap_or(url.as_str()).to_string();
                let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
                let links = extractor::discover_links(&hub, &keywords, *max_links);
                debug!("{}: {} career links discovered", source.label(), links.len());

                for link in links {
                    if let Some(page) = load_with(fetcher, &link, HUB_PAGE_SETTLE, source.scroll, &mut collected) {
                        take(source, policy, &extractor, &page, &host, &mut collected);
                    }
                }
            }
        }
    }

    if collected.pages_attempted > 0 && collected.pages_loaded == 0 {
        return Err(SourceError::Unreachable {
            source_id: source.id,
            attempts: collected.pages_attempted,
        });
    }
    Ok(collected)
}

fn load<B: Browser>(
    source: &SourceSpec,
    fetcher: &mut PageFetcher<B>,
    url: &str,
    collected: &mut Collected,
) -> Option<FetchedPage> {
    load_with(fetcher, url, source.settle, source.scroll, collected)
}

fn load_with<B: Browser>(
    fetcher: &mut PageFetcher<B>,
    url: &str,
    settle: Duration,
    scroll: Option<ScrollPlan>,
    collected: &mut Collected,
) -> Option<FetchedPage> {
    collected.pages_attempted += 1;
    let page = fetcher.fetch(url, settle)?;
    collected.pages_loaded += 1;
    Some(match scroll {
        Some(plan) => fetcher.scroll_to_bottom(page, plan),
        None => page,
    })
}

/// Extracts one page and keeps the candidates the policy accepts.
fn take(
    source: &SourceSpec,
    policy: &Policy,
    extractor: &Extractor,
    page: &FetchedPage,
    identity: &str,
    collected: &mut Collected,
) -> StrategyUsed {
    let extraction = extractor.extract(page, source.id, identity);
    if extraction.strategy == StrategyUsed::GenericAnchor {
        collected.fallbacks += 1;
        info!("{}: structured layout not found on {}, scanning all links.", source.id, page.url);
    }

    for candidate in extraction.candidates {
        collected.seen += 1;
        let snippet = match source.snippet {
            Snippet::Company => candidate.company.as_str(),
            Snippet::None => "",
        };
        match classifier::classify(policy, &candidate.title, snippet) {
            Verdict::Accepted => collected.accepted.push(candidate),
            verdict => debug!("Rejected '{}' ({:?})", candidate.title, verdict),
        }
    }
    extraction.strategy
}
