use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use dex_tui::data::{CatalogService, MockCatalogService};
use dex_tui::entry::{CatalogPage, Entry, EntryRef};
use dex_tui::loader::{LoadRequest, LoadResponse, LoadState, Loader, LoaderSettings};
use parking_lot::Mutex;

/// Holds each page request until the test releases its offset.
struct GatedService {
    inner: MockCatalogService,
    gates: Mutex<HashMap<usize, Receiver<()>>>,
}

impl GatedService {
    fn new(offsets: &[usize]) -> (Arc<Self>, HashMap<usize, Sender<()>>) {
        let mut gates = HashMap::new();
        let mut releases = HashMap::new();
        for &offset in offsets {
            let (tx, rx) = bounded(1);
            gates.insert(offset, rx);
            releases.insert(offset, tx);
        }
        let service = Arc::new(Self {
            inner: MockCatalogService::default(),
            gates: Mutex::new(gates),
        });
        (service, releases)
    }
}

impl CatalogService for GatedService {
    fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage> {
        let gate = self.gates.lock().remove(&offset);
        if let Some(gate) = gate {
            gate.recv_timeout(Duration::from_secs(5))
                .map_err(|_| anyhow!("gate for offset {offset} never opened"))?;
        }
        self.inner.fetch_page(limit, offset)
    }

    fn fetch_detail(&self, identifier: &str) -> Result<Entry> {
        self.inner.fetch_detail(identifier)
    }

    fn fetch_categories(&self) -> Result<Vec<String>> {
        self.inner.fetch_categories()
    }

    fn search_references(&self, query: &str) -> Result<Vec<EntryRef>> {
        self.inner.search_references(query)
    }
}

fn recv(rx: &Receiver<LoadResponse>) -> LoadResponse {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("load response")
}

#[test]
fn newer_load_wins_when_older_one_finishes_last() {
    let (service, releases) = GatedService::new(&[0, 3]);
    let mut loader = Loader::new(
        service,
        LoaderSettings {
            page_size: 3,
            category_window: 3,
        },
    );
    let (tx, rx) = unbounded();

    let first = loader.spawn(LoadRequest::page(0, None), tx.clone());
    let second = loader.spawn(LoadRequest::page(1, None), tx);
    assert_eq!(loader.state(), &LoadState::Loading);

    releases[&3].send(()).unwrap();
    let response = recv(&rx);
    assert_eq!(response.ticket, second);
    assert!(loader.complete(&response.ticket, response.result));

    releases[&0].send(()).unwrap();
    let response = recv(&rx);
    assert_eq!(response.ticket, first);
    assert!(!loader.complete(&response.ticket, response.result));

    let LoadState::Ready(page) = loader.state() else {
        panic!("expected ready, got {:?}", loader.state());
    };
    assert_eq!(page.request, LoadRequest::page(1, None));
    let names: Vec<&str> = page.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["squirtle", "pikachu", "jigglypuff"]);
}

#[test]
fn in_order_completion_shows_latest_request() {
    let (service, releases) = GatedService::new(&[0, 3]);
    let mut loader = Loader::new(
        service,
        LoaderSettings {
            page_size: 3,
            category_window: 3,
        },
    );
    let (tx, rx) = unbounded();

    loader.spawn(LoadRequest::page(0, None), tx.clone());
    loader.spawn(LoadRequest::page(1, None), tx);

    releases[&0].send(()).unwrap();
    let response = recv(&rx);
    assert!(!loader.complete(&response.ticket, response.result));
    assert_eq!(loader.state(), &LoadState::Loading);

    releases[&3].send(()).unwrap();
    let response = recv(&rx);
    assert!(loader.complete(&response.ticket, response.result));
    assert_eq!(loader.state().entries()[0].name, "squirtle");
}

#[test]
fn details_are_fetched_concurrently() {
    struct SlowDetails {
        inner: MockCatalogService,
    }

    impl CatalogService for SlowDetails {
        fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage> {
            self.inner.fetch_page(limit, offset)
        }

        fn fetch_detail(&self, identifier: &str) -> Result<Entry> {
            std::thread::sleep(Duration::from_millis(200));
            self.inner.fetch_detail(identifier)
        }

        fn fetch_categories(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn search_references(&self, _query: &str) -> Result<Vec<EntryRef>> {
            Ok(Vec::new())
        }
    }

    let mut loader = Loader::new(
        Arc::new(SlowDetails {
            inner: MockCatalogService::default(),
        }),
        LoaderSettings {
            page_size: 10,
            category_window: 10,
        },
    );
    let started = std::time::Instant::now();
    let state = loader.load(0, None);
    assert_eq!(state.entries().len(), 10);
    // ten sequential fetches would take two seconds
    assert!(
        started.elapsed() < Duration::from_millis(1500),
        "took {:?}",
        started.elapsed()
    );
}

#[test]
fn page_keeps_reference_order_when_details_finish_in_reverse() {
    struct ReverseDelays {
        inner: MockCatalogService,
        order: Vec<String>,
        arrivals: Mutex<Vec<String>>,
    }

    impl CatalogService for ReverseDelays {
        fn fetch_page(&self, limit: usize, offset: usize) -> Result<CatalogPage> {
            self.inner.fetch_page(limit, offset)
        }

        fn fetch_detail(&self, identifier: &str) -> Result<Entry> {
            let position = self
                .order
                .iter()
                .position(|name| name == identifier)
                .unwrap_or_default();
            let steps = (self.order.len() - position) as u64;
            std::thread::sleep(Duration::from_millis(60 * steps));
            self.arrivals.lock().push(identifier.to_string());
            self.inner.fetch_detail(identifier)
        }

        fn fetch_categories(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn search_references(&self, _query: &str) -> Result<Vec<EntryRef>> {
            Ok(Vec::new())
        }
    }

    let inner = MockCatalogService::default();
    let expected: Vec<u32> = inner.entries()[..5].iter().map(|e| e.id).collect();
    let order: Vec<String> = inner.entries()[..5]
        .iter()
        .map(|e| e.name.clone())
        .collect();
    let service = Arc::new(ReverseDelays {
        inner,
        order: order.clone(),
        arrivals: Mutex::new(Vec::new()),
    });
    let mut loader = Loader::new(
        service.clone(),
        LoaderSettings {
            page_size: 5,
            category_window: 5,
        },
    );

    let ids: Vec<u32> = loader.load(0, None).entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, expected);

    let arrivals = service.arrivals.lock().clone();
    assert_eq!(arrivals.len(), 5);
    assert_eq!(arrivals.last(), order.first(), "arrivals: {arrivals:?}");
}
