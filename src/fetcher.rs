use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::Html;
use url::Url;

use crate::delay_manager;
use crate::error::FetchError;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// A stateful browsing session. Navigation replaces the current page.
pub trait Browser {
    fn navigate(&mut self, url: &Url) -> Result<(), FetchError>;

    /// HTML of the current page.
    fn page_source(&self) -> Result<String, FetchError>;

    /// Scrolls the current page down by one viewport.
    fn scroll_step(&mut self) -> Result<(), FetchError>;

    /// Whether scrolling can change what `page_source` returns.
    fn supports_scroll(&self) -> bool {
        true
    }

    /// Address of the current page after redirects, when the session knows it.
    fn current_url(&self) -> Option<Url> {
        None
    }
}

/// Session over a blocking HTTP client. Pages are served as the server rendered them,
/// so scrolling cannot reveal anything new.
pub struct HttpBrowser {
    client: Client,
    current: Option<String>,
    final_url: Option<Url>,
}

impl HttpBrowser {
    pub fn new() -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        info!("Browsing session opened.");
        Ok(HttpBrowser { client, current: None, final_url: None })
    }

    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }
}

impl Browser for HttpBrowser {
    fn navigate(&mut self, url: &Url) -> Result<(), FetchError> {
        self.current = None;
        self.final_url = None;

        let resp = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, self.random_user_agent())
            .send()
            .map_err(|source| FetchError::Http { url: url.to_string(), source })?;

        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            return Err(FetchError::Blocked { url: url.to_string(), status: status.as_u16() });
        }
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let landed = resp.url().clone();
        if landed != *url {
            debug!("{} redirected to {}", url, landed);
        }
        let text = resp
            .text()
            .map_err(|source| FetchError::Http { url: url.to_string(), source })?;
        self.current = Some(text);
        self.final_url = Some(landed);
        Ok(())
    }

    fn page_source(&self) -> Result<String, FetchError> {
        self.current.clone().ok_or(FetchError::NoPage)
    }

    fn scroll_step(&mut self) -> Result<(), FetchError> {
        if self.current.is_none() {
            return Err(FetchError::NoPage);
        }
        Ok(())
    }

    fn supports_scroll(&self) -> bool {
        false
    }

    fn current_url(&self) -> Option<Url> {
        self.final_url.clone()
    }
}

impl Drop for HttpBrowser {
    fn drop(&mut self) {
        self.current = None;
        self.final_url = None;
        info!("Browsing session closed.");
    }
}

/// A page as it was when extraction started.
pub struct FetchedPage {
    pub url: Url,
    pub document: Html,
}

impl FetchedPage {
    pub fn new(url: Url, html: &str) -> Self {
        FetchedPage {
            url,
            document: Html::parse_document(html),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollPlan {
    pub steps: usize,
    pub pause: Duration,
}

/// Owns the browsing session and turns navigation failures into "no page".
pub struct PageFetcher<B: Browser> {
    browser: B,
    delays: bool,
}

impl<B: Browser> PageFetcher<B> {
    pub fn new(browser: B) -> Self {
        PageFetcher { browser, delays: true }
    }

    /// Skips every settle and scroll wait. Used for fixture replays.
    pub fn without_delays(mut self) -> Self {
        self.delays = false;
        self
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn can_scroll(&self) -> bool {
        self.browser.supports_scroll()
    }

    /// Navigates to `url`, waits `settle`, and parses the result.
    /// The page keeps the address the session landed on, so relative links
    /// resolve against it. Any failure is logged and reported as `None`.
    pub fn fetch(&mut self, url: &str, settle: Duration) -> Option<FetchedPage> {
        match self.try_fetch(url, settle) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Could not load {}: {}", url, e);
                None
            }
        }
    }

    fn try_fetch(&mut self, url: &str, settle: Duration) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        info!("Visiting: {}", parsed);
        self.browser.navigate(&parsed)?;
        if self.delays {
            delay_manager::settle_delay(settle);
        }
        let html = self.browser.page_source()?;
        let landed = self.browser.current_url().unwrap_or(parsed);
        Ok(FetchedPage::new(landed, &html))
    }

    /// Scrolls the current page to trigger lazy loading, then re-reads it.
    /// Scroll failures stop scrolling early; the page is still returned when readable.
    /// Sessions that cannot scroll get the page back untouched, without any pauses.
    pub fn scroll_to_bottom(&mut self, page: FetchedPage, plan: ScrollPlan) -> FetchedPage {
        if !self.browser.supports_scroll() {
            debug!("Session cannot scroll, keeping {} as loaded.", page.url);
            return page;
        }

        for step in 0..plan.steps {
            if let Err(e) = self.browser.scroll_step() {
                debug!("Scrolling stopped at step {} on {}: {}", step, page.url, e);
                break;
            }
            if self.delays {
                delay_manager::scroll_pause(plan.pause);
            }
        }

        match self.browser.page_source() {
            Ok(html) => FetchedPage::new(page.url, &html),
            Err(e) => {
                debug!("Keeping pre-scroll content for {}: {}", page.url, e);
                page
            }
        }
    }
}
