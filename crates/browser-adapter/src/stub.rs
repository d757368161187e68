//! In-process simulation of the demo web application.
//!
//! Mirrors the pages the environment is trained against: a home page, a login
//! form (`username`, `password`, `button`), a dashboard reached on valid
//! credentials, and a contact form (`name`, `message`, `button`). Faults can be
//! injected to exercise the environment's recovery paths without a browser.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use url::Url;

use crate::{adapter::BrowserAdapter, error::AdapterError, selector::Selector};

pub const STUB_USERNAME: &str = "admin";
pub const STUB_PASSWORD: &str = "123";

/// Pages served by the simulated application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubPage {
    Blank,
    Home,
    Login { error: bool },
    Dashboard,
    Contact { sent: bool },
    NotFound,
}

impl StubPage {
    fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => StubPage::Home,
            "/login" => StubPage::Login { error: false },
            "/dashboard" => StubPage::Dashboard,
            "/contact" => StubPage::Contact { sent: false },
            _ => StubPage::NotFound,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StubPage::Blank => "",
            StubPage::Home => "Home",
            StubPage::Login { .. } => "Login",
            StubPage::Dashboard => "Dashboard",
            StubPage::Contact { .. } => "Contact",
            StubPage::NotFound => "404 Not Found",
        }
    }

    fn has(&self, selector: &Selector) -> bool {
        let (names, tags): (&[&str], &[&str]) = match self {
            StubPage::Login { .. } => (&["username", "password"], &["form", "input", "button"]),
            StubPage::Contact { .. } => (&["name", "message"], &["form", "input", "textarea", "button"]),
            StubPage::Home | StubPage::Dashboard => (&[], &["a"]),
            StubPage::Blank | StubPage::NotFound => (&[], &[]),
        };
        match selector {
            Selector::Name(name) => names.contains(&name.as_str()),
            Selector::Tag(tag) => tags.contains(&tag.as_str()),
            Selector::Css(css) => css == "button" && tags.contains(&"button"),
        }
    }
}

/// One recorded adapter call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StubCall {
    Navigate(String),
    Fill(Selector, String),
    Click(Selector),
    Probe(Selector),
    Title,
    Close,
}

#[derive(Default)]
struct StubState {
    page: Option<StubPage>,
    fields: HashMap<String, String>,
    hidden: HashSet<Selector>,
    nav_failures: VecDeque<String>,
    calls: Vec<StubCall>,
    closed: bool,
    close_count: usize,
}

/// Scriptable fake browser serving the demo application.
pub struct StubAdapter {
    base: Url,
    state: Mutex<StubState>,
}

impl StubAdapter {
    pub fn new(base_url: &str) -> Result<Self, AdapterError> {
        let base = Url::parse(base_url).map_err(|err| AdapterError::navigation(base_url, err))?;
        Ok(Self {
            base,
            state: Mutex::new(StubState::default()),
        })
    }

    /// Hide an element on every page until [`StubAdapter::restore`] is called.
    pub fn hide(&self, selector: Selector) {
        self.state.lock().hidden.insert(selector);
    }

    pub fn restore(&self, selector: &Selector) {
        self.state.lock().hidden.remove(selector);
    }

    /// Make the next navigation fail with `reason`.
    pub fn fail_next_navigation(&self, reason: impl Into<String>) {
        self.state.lock().nav_failures.push_back(reason.into());
    }

    pub fn page(&self) -> StubPage {
        self.state.lock().page.unwrap_or(StubPage::Blank)
    }

    pub fn calls(&self) -> Vec<StubCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default()
    }
}

impl StubState {
    fn ensure_open(&self) -> Result<(), AdapterError> {
        if self.closed {
            Err(AdapterError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn current(&self) -> StubPage {
        self.page.unwrap_or(StubPage::Blank)
    }

    fn find(&self, selector: &Selector) -> bool {
        !self.hidden.contains(selector) && self.current().has(selector)
    }

    fn load(&mut self, page: StubPage) {
        self.page = Some(page);
        self.fields.clear();
    }

    /// Form submission triggered by clicking the page's button.
    fn submit(&mut self) {
        match self.current() {
            StubPage::Login { .. } => {
                let ok = self.fields.get("username").map(String::as_str) == Some(STUB_USERNAME)
                    && self.fields.get("password").map(String::as_str) == Some(STUB_PASSWORD);
                if ok {
                    self.load(StubPage::Dashboard);
                } else {
                    self.load(StubPage::Login { error: true });
                }
            }
            StubPage::Contact { .. } => self.load(StubPage::Contact { sent: true }),
            _ => {}
        }
    }
}

#[async_trait]
impl BrowserAdapter for StubAdapter {
    async fn navigate(&self, url: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(StubCall::Navigate(url.to_string()));
        state.ensure_open()?;
        if let Some(reason) = state.nav_failures.pop_front() {
            return Err(AdapterError::navigation(url, reason));
        }
        let parsed = Url::parse(url).map_err(|err| AdapterError::navigation(url, err))?;
        if !self.same_origin(&parsed) {
            return Err(AdapterError::navigation(url, "connection refused"));
        }
        let page = StubPage::from_path(parsed.path());
        debug!(%url, ?page, "stub navigate");
        state.load(page);
        Ok(())
    }

    async fn await_and_fill(&self, selector: &Selector, value: &str) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(StubCall::Fill(selector.clone(), value.to_string()));
        state.ensure_open()?;
        if !state.find(selector) {
            return Err(AdapterError::element_not_found(selector, 0));
        }
        let key = match selector {
            Selector::Name(name) => name.clone(),
            other => other.to_css(),
        };
        state.fields.insert(key, value.to_string());
        Ok(())
    }

    async fn await_and_click(&self, selector: &Selector) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(StubCall::Click(selector.clone()));
        state.ensure_open()?;
        if !state.find(selector) {
            return Err(AdapterError::element_not_found(selector, 0));
        }
        state.submit();
        Ok(())
    }

    async fn is_present(&self, selector: &Selector) -> Result<bool, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(StubCall::Probe(selector.clone()));
        state.ensure_open()?;
        Ok(state.find(selector))
    }

    async fn current_title(&self) -> Result<String, AdapterError> {
        let mut state = self.state.lock();
        state.calls.push(StubCall::Title);
        state.ensure_open()?;
        Ok(state.current().title().to_string())
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        state.calls.push(StubCall::Close);
        state.close_count += 1;
        state.closed = true;
    }
}
