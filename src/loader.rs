use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::Sender;

use crate::data::CatalogService;
use crate::entry::{Entry, EntryRef};
use crate::filter;

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load entries. Please try again later.";
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_CATEGORY_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub page_size: usize,
    pub category_window: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            category_window: DEFAULT_CATEGORY_WINDOW,
        }
    }
}

impl LoaderSettings {
    pub fn window(&self, page: usize, category: Option<&str>) -> (usize, usize) {
        let limit = match category {
            Some(_) => self.category_window.max(1),
            None => self.page_size.max(1),
        };
        (limit, page.saturating_mul(limit))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    Page {
        page: usize,
        category: Option<String>,
    },
    Search {
        query: String,
    },
}

impl LoadRequest {
    pub fn page(page: usize, category: Option<String>) -> Self {
        let category = category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty());
        LoadRequest::Page { page, category }
    }

    pub fn search(query: impl Into<String>) -> Self {
        LoadRequest::Search {
            query: query.into(),
        }
    }

    pub fn page_index(&self) -> usize {
        match self {
            LoadRequest::Page { page, .. } => *page,
            LoadRequest::Search { .. } => 0,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            LoadRequest::Page { category, .. } => category.as_deref(),
            LoadRequest::Search { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    pub request: LoadRequest,
    pub entries: Vec<Entry>,
    pub total_count: u64,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready(LoadedPage),
    Failed(String),
}

impl LoadState {
    pub fn entries(&self) -> &[Entry] {
        match self {
            LoadState::Ready(page) => &page.entries,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub token: u64,
    pub request: LoadRequest,
}

#[derive(Debug)]
pub struct LoadResponse {
    pub ticket: LoadTicket,
    pub result: Result<LoadedPage>,
}

pub trait Diagnostics: Send + Sync {
    fn load_started(&self, _ticket: &LoadTicket) {}
    fn load_finished(&self, _ticket: &LoadTicket, _entries: usize) {}
    fn load_failed(&self, ticket: &LoadTicket, error: &anyhow::Error);
    fn load_superseded(&self, _ticket: &LoadTicket, _latest: u64) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn load_started(&self, ticket: &LoadTicket) {
        tracing::debug!(token = ticket.token, request = ?ticket.request, "catalog load started");
    }

    fn load_finished(&self, ticket: &LoadTicket, entries: usize) {
        tracing::info!(token = ticket.token, entries, "catalog load finished");
    }

    fn load_failed(&self, ticket: &LoadTicket, error: &anyhow::Error) {
        tracing::error!(
            token = ticket.token,
            request = ?ticket.request,
            "catalog load failed: {error:#}"
        );
    }

    fn load_superseded(&self, ticket: &LoadTicket, latest: u64) {
        tracing::debug!(
            token = ticket.token,
            latest,
            "dropping result of superseded catalog load"
        );
    }
}

pub struct Loader {
    service: Arc<dyn CatalogService>,
    diagnostics: Arc<dyn Diagnostics>,
    settings: LoaderSettings,
    state: LoadState,
    next_token: u64,
    latest_token: Option<u64>,
}

impl Loader {
    pub fn new(service: Arc<dyn CatalogService>, settings: LoaderSettings) -> Self {
        Self::with_diagnostics(service, settings, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(
        service: Arc<dyn CatalogService>,
        settings: LoaderSettings,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            service,
            diagnostics,
            settings,
            state: LoadState::Idle,
            next_token: 1,
            latest_token: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn settings(&self) -> LoaderSettings {
        self.settings
    }

    pub fn service(&self) -> Arc<dyn CatalogService> {
        self.service.clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn begin(&mut self, request: LoadRequest) -> LoadTicket {
        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        self.latest_token = Some(token);
        self.state = LoadState::Loading;
        let ticket = LoadTicket { token, request };
        self.diagnostics.load_started(&ticket);
        ticket
    }

    /// Commits only when `ticket` is the latest issued; returns whether it did.
    pub fn complete(&mut self, ticket: &LoadTicket, result: Result<LoadedPage>) -> bool {
        if self.latest_token != Some(ticket.token) {
            self.diagnostics
                .load_superseded(ticket, self.latest_token.unwrap_or_default());
            return false;
        }

        self.state = match result {
            Ok(page) => {
                self.diagnostics.load_finished(ticket, page.entries.len());
                LoadState::Ready(page)
            }
            Err(err) => {
                self.diagnostics.load_failed(ticket, &err);
                LoadState::Failed(LOAD_FAILED_MESSAGE.to_string())
            }
        };
        true
    }

    pub fn load(&mut self, page: usize, category: Option<String>) -> &LoadState {
        self.run(LoadRequest::page(page, category))
    }

    pub fn search(&mut self, query: &str) -> &LoadState {
        self.run(LoadRequest::search(query))
    }

    fn run(&mut self, request: LoadRequest) -> &LoadState {
        let ticket = self.begin(request);
        let result = fetch(self.service.as_ref(), &self.settings, &ticket.request);
        self.complete(&ticket, result);
        &self.state
    }

    pub fn spawn(&mut self, request: LoadRequest, tx: Sender<LoadResponse>) -> LoadTicket {
        let ticket = self.begin(request);
        let service = self.service.clone();
        let settings = self.settings;
        let thread_ticket = ticket.clone();
        thread::spawn(move || {
            let result = fetch(service.as_ref(), &settings, &thread_ticket.request);
            let _ = tx.send(LoadResponse {
                ticket: thread_ticket,
                result,
            });
        });
        ticket
    }
}

pub fn fetch(
    service: &dyn CatalogService,
    settings: &LoaderSettings,
    request: &LoadRequest,
) -> Result<LoadedPage> {
    match request {
        LoadRequest::Page { page, category } => {
            let (limit, offset) = settings.window(*page, category.as_deref());
            let listing = service.fetch_page(limit, offset)?;
            let mut entries = resolve_all(service, &listing.results)?;
            if let Some(category) = category {
                filter::retain_category(&mut entries, category);
            }
            Ok(LoadedPage {
                request: request.clone(),
                entries,
                total_count: listing.count,
                has_next: listing.has_next(),
            })
        }
        LoadRequest::Search { query } => {
            if query.trim().is_empty() {
                bail!("search query must not be empty");
            }
            let references = service.search_references(query)?;
            let entries = resolve_all(service, &references)?;
            Ok(LoadedPage {
                request: request.clone(),
                total_count: entries.len() as u64,
                entries,
                has_next: false,
            })
        }
    }
}

pub fn resolve_all(service: &dyn CatalogService, references: &[EntryRef]) -> Result<Vec<Entry>> {
    let resolved: Vec<Result<Entry>> = thread::scope(|scope| {
        let handles: Vec<_> = references
            .iter()
            .map(|reference| scope.spawn(move || service.fetch_detail(&reference.name)))
            .collect();
        handles
            .into_iter()
            .zip(references)
            .map(|(handle, reference)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("detail fetch for {:?} panicked", reference.name)))
            })
            .collect()
    });

    let entries = resolved.into_iter().collect::<Result<Vec<Entry>>>()?;
    Ok(dedup_by_id(entries))
}

fn dedup_by_id(entries: Vec<Entry>) -> Vec<Entry> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut unique = Vec::with_capacity(entries.len());
    for entry in entries {
        if seen.insert(entry.id) {
            unique.push(entry);
        } else {
            tracing::warn!(id = entry.id, name = %entry.name, "duplicate entry id in page");
        }
    }
    unique
}
