use log::debug;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::fetcher::FetchedPage;
use crate::job::JobCandidate;
use crate::sources::SourceId;

/// Where a link comes from inside a card. Rules are tried in order.
#[derive(Debug, Clone)]
pub enum LinkRule {
    /// Build the link from an attribute value, substituted into `{value}`.
    Attribute { name: String, template: String },
    OwnHref,
    FirstAnchor,
}

/// Source-specific container layout for the structured strategy.
#[derive(Debug, Clone)]
pub enum Layout {
    /// One row per job; title and company sit in fixed `td` columns.
    Table {
        rows: String,
        title_col: usize,
        company_col: usize,
        min_cols: usize,
    },
    /// One card per job with optional title/company sub-elements.
    Cards {
        cards: String,
        title: Option<String>,
        company: Option<String>,
        links: Vec<LinkRule>,
        title_limit: usize,
    },
    /// Each matched element is a job; its text is the title.
    Anchors { anchors: String },
}

#[derive(Debug, Clone)]
pub enum Strategy {
    Structured(Layout),
    GenericAnchor,
}

impl Strategy {
    pub fn table(rows: &str, title_col: usize, company_col: usize, min_cols: usize) -> Self {
        Strategy::Structured(Layout::Table {
            rows: rows.to_string(),
            title_col,
            company_col,
            min_cols,
        })
    }

    pub fn anchors(anchors: &str) -> Self {
        Strategy::Structured(Layout::Anchors { anchors: anchors.to_string() })
    }

    pub fn cards(cards: &str, title: Option<&str>, company: Option<&str>, links: Vec<LinkRule>, title_limit: usize) -> Self {
        Strategy::Structured(Layout::Cards {
            cards: cards.to_string(),
            title: title.map(str::to_string),
            company: company.map(str::to_string),
            links,
            title_limit,
        })
    }
}

/// Which strategy produced the candidates of one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyUsed {
    Structured(usize),
    GenericAnchor,
    Nothing,
}

#[derive(Debug)]
pub struct Extraction {
    pub candidates: Vec<JobCandidate>,
    pub strategy: StrategyUsed,
}

enum Compiled {
    Table {
        rows: Selector,
        title_col: usize,
        company_col: usize,
        min_cols: usize,
    },
    Cards {
        cards: Selector,
        title: Option<Selector>,
        company: Option<Selector>,
        links: Vec<LinkRule>,
        title_limit: usize,
    },
    Anchors { anchors: Selector },
    GenericAnchor,
}

pub struct Extractor {
    strategies: Vec<Compiled>,
    cell: Selector,
    anchor: Selector,
}

impl Extractor {
    /// Compiles every selector up front. A selector that does not parse is a bug in
    /// the source definition, reported as `Err` with the offending selector.
    pub fn new(strategies: &[Strategy]) -> Result<Self, String> {
        let mut compiled = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            compiled.push(match strategy {
                Strategy::GenericAnchor => Compiled::GenericAnchor,
                Strategy::Structured(Layout::Table { rows, title_col, company_col, min_cols }) => Compiled::Table {
                    rows: compile(rows)?,
                    title_col: *title_col,
                    company_col: *company_col,
                    min_cols: *min_cols,
                },
                Strategy::Structured(Layout::Cards { cards, title, company, links, title_limit }) => Compiled::Cards {
                    cards: compile(cards)?,
                    title: title.as_deref().map(compile).transpose()?,
                    company: company.as_deref().map(compile).transpose()?,
                    links: links.clone(),
                    title_limit: *title_limit,
                },
                Strategy::Structured(Layout::Anchors { anchors }) => Compiled::Anchors { anchors: compile(anchors)? },
            });
        }

        Ok(Extractor {
            strategies: compiled,
            cell: compile("td")?,
            anchor: compile("a[href]")?,
        })
    }

    /// Tries each strategy in order; the first one that finds at least one container wins,
    /// even when none of its containers yields a usable title.
    pub fn extract(&self, page: &FetchedPage, source: SourceId, identity: &str) -> Extraction {
        for (index, strategy) in self.strategies.iter().enumerate() {
            let found = match strategy {
                Compiled::Table { rows, title_col, company_col, min_cols } => {
                    self.extract_table(page, source, rows, *title_col, *company_col, *min_cols)
                }
                Compiled::Cards { cards, title, company, links, title_limit } => {
                    self.extract_cards(page, source, identity, cards, title.as_ref(), company.as_ref(), links, *title_limit)
                }
                Compiled::Anchors { anchors } => self.extract_anchors(page, source, identity, anchors),
                Compiled::GenericAnchor => self.extract_anchors(page, source, identity, &self.anchor),
            };

            if let Some(candidates) = found {
                let used = match strategy {
                    Compiled::GenericAnchor => StrategyUsed::GenericAnchor,
                    _ => StrategyUsed::Structured(index),
                };
                debug!("{:?} on {} yielded {} candidates", used, page.url, candidates.len());
                return Extraction { candidates, strategy: used };
            }
        }

        debug!("No strategy matched anything on {}", page.url);
        Extraction { candidates: Vec::new(), strategy: StrategyUsed::Nothing }
    }

    fn extract_table(
        &self,
        page: &FetchedPage,
        source: SourceId,
        rows: &Selector,
        title_col: usize,
        company_col: usize,
        min_cols: usize,
    ) -> Option<Vec<JobCandidate>> {
        let rows: Vec<ElementRef> = page.document.select(rows).collect();
        if rows.is_empty() {
            return None;
        }

        let mut jobs = Vec::new();
        for row in rows {
            let cols: Vec<ElementRef> = row.select(&self.cell).collect();
            if cols.len() < min_cols.max(title_col + 1).max(company_col + 1) {
                continue;
            }
            let title = element_text(cols[title_col]);
            if title.is_empty() {
                continue;
            }
            let link = row
                .select(&self.anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| resolve_link(&page.url, href))
                .unwrap_or_default();

            jobs.push(JobCandidate {
                title,
                company: element_text(cols[company_col]),
                link,
                source,
            });
        }
        Some(jobs)
    }

    #[allow(clippy::too_many_arguments)]
    fn extract_cards(
        &self,
        page: &FetchedPage,
        source: SourceId,
        identity: &str,
        cards: &Selector,
        title: Option<&Selector>,
        company: Option<&Selector>,
        links: &[LinkRule],
        title_limit: usize,
    ) -> Option<Vec<JobCandidate>> {
        let cards: Vec<ElementRef> = page.document.select(cards).collect();
        if cards.is_empty() {
            return None;
        }

        let mut jobs = Vec::new();
        for card in cards {
            let mut job_title = title
                .and_then(|sel| card.select(sel).next())
                .map(element_text)
                .unwrap_or_default();
            if job_title.is_empty() {
                job_title = truncate_chars(&element_text(card), title_limit);
            }
            if job_title.is_empty() {
                continue;
            }

            let job_company = company
                .and_then(|sel| card.select(sel).next())
                .map(element_text)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| identity.to_string());

            jobs.push(JobCandidate {
                title: job_title,
                company: job_company,
                link: self.card_link(card, links, &page.url),
                source,
            });
        }
        Some(jobs)
    }

    fn card_link(&self, card: ElementRef, rules: &[LinkRule], base: &Url) -> String {
        for rule in rules {
            let href = match rule {
                LinkRule::Attribute { name, template } => card
                    .value()
                    .attr(name)
                    .map(|v| template.replace("{value}", &urlencoding::encode(v.trim()))),
                LinkRule::OwnHref => card.value().attr("href").map(str::to_string),
                LinkRule::FirstAnchor => card
                    .select(&self.anchor)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(str::to_string),
            };
            if let Some(href) = href {
                let link = resolve_link(base, &href);
                if !link.is_empty() {
                    return link;
                }
            }
        }
        String::new()
    }

    fn extract_anchors(
        &self,
        page: &FetchedPage,
        source: SourceId,
        identity: &str,
        anchors: &Selector,
    ) -> Option<Vec<JobCandidate>> {
        let anchors: Vec<ElementRef> = page.document.select(anchors).collect();
        if anchors.is_empty() {
            return None;
        }

        let mut jobs = Vec::new();
        for a in anchors {
            let title = element_text(a);
            if title.is_empty() {
                continue;
            }
            let href = a
                .value()
                .attr("href")
                .or_else(|| a.select(&self.anchor).next().and_then(|inner| inner.value().attr("href")))
                .unwrap_or_default();

            jobs.push(JobCandidate {
                title,
                company: identity.to_string(),
                link: resolve_link(&page.url, href),
                source,
            });
        }
        Some(jobs)
    }
}

fn compile(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|e| format!("'{}': {}", selector, e))
}

/// Visible text of an element, whitespace collapsed.
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect::<String>().trim_end().to_string()
}

/// Resolves `href` against the page URL. Returns an empty string for links that
/// cannot be made absolute.
pub fn resolve_link(base: &Url, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match Url::parse(href) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => base.join(href).map(|u| u.to_string()).unwrap_or_default(),
    }
}

/// Finds career/job pages linked from a hub page: an anchor qualifies when a keyword
/// appears in its href or text. Links keep first-seen order and are capped at `max`.
pub fn discover_links(page: &FetchedPage, keywords: &[&str], max: usize) -> Vec<String> {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let mut links: Vec<String> = Vec::new();

    for element in page.document.select(&selector) {
        let text = element_text(element);
        if text.is_empty() {
            continue;
        }
        let href = element.value().attr("href").unwrap_or_default();
        let href_lower = href.to_lowercase();
        let text_lower = text.to_lowercase();
        if !keywords.iter().any(|k| href_lower.contains(k) || text_lower.contains(k)) {
            continue;
        }
        let link = resolve_link(&page.url, href);
        if link.is_empty() || links.contains(&link) {
            continue;
        }
        links.push(link);
        if links.len() >= max {
            break;
        }
    }
    links
}
