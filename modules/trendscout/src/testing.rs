// Test mocks for the trendscout pipeline.
//
// One mock per trait seam:
// - MockEngine (EntityRecognizer): canned entities per text, or a fixed outage
// - MockBrowser / MockSession (BrowserLauncher / BrowserSession): scripted
//   elements per locator and optional slow navigation or release, records
//   navigations, clicks and releases
// - MockTrendSource (TrendSource): scripted poll batches and failures
// - MockResolver (MetricResolver): link → result map, records calls
// - MemoryRecordStore (RecordStore): in-memory rows with a write log
//
// Plus NoDelay for zero-wait pacing.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use webdriver_client::{ElementRef, Locator};

use trendscout_common::{Record, SearchResults, TrendScoutError};

use crate::classify::{Entity, EntityRecognizer, Recognition};
use crate::scheduling::DelayPolicy;
use crate::traits::{BrowserLauncher, BrowserSession, MetricResolver, RecordStore, TrendSource};

// ---------------------------------------------------------------------------
// NoDelay
// ---------------------------------------------------------------------------

pub struct NoDelay;

impl DelayPolicy for NoDelay {
    fn next_delay(&self) -> Duration {
        Duration::ZERO
    }
}

// ---------------------------------------------------------------------------
// MockEngine
// ---------------------------------------------------------------------------

enum EngineMode {
    Answering(HashMap<String, Vec<Entity>>),
    Unavailable,
    Failing(String),
}

/// Recognition engine with canned answers. Unregistered texts yield no entities.
pub struct MockEngine {
    name: String,
    mode: EngineMode,
    calls: AtomicUsize,
}

impl MockEngine {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: EngineMode::Answering(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(name: &str) -> Self {
        Self {
            mode: EngineMode::Unavailable,
            ..Self::new(name)
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            mode: EngineMode::Failing(reason.to_string()),
            ..Self::new(name)
        }
    }

    pub fn on(mut self, text: &str, entities: Vec<Entity>) -> Self {
        if let EngineMode::Answering(answers) = &mut self.mode {
            answers.insert(text.to_string(), entities);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityRecognizer for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recognize(&self, text: &str) -> Recognition {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            EngineMode::Answering(answers) => {
                Recognition::Entities(answers.get(text).cloned().unwrap_or_default())
            }
            EngineMode::Unavailable => Recognition::Unavailable,
            EngineMode::Failing(reason) => Recognition::Failed(reason.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockBrowser
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BrowserState {
    elements: HashMap<String, Vec<String>>,
    launch_error: Option<String>,
    navigation_error: Option<String>,
    navigation_delay: Duration,
    release_delay: Duration,
    launches: usize,
    releases: usize,
    clicks: usize,
    navigations: Vec<String>,
}

/// Scripted browser. Locators are matched on their raw value (selector,
/// expression or id). Clones share state, so a test can keep one handle
/// while the code under test launches sessions from another.
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements with these texts appear whenever `locator_value` is waited for.
    pub fn on_elements(self, locator_value: &str, texts: Vec<String>) -> Self {
        self.lock().elements.insert(locator_value.to_string(), texts);
        self
    }

    pub fn failing_launch(self, reason: &str) -> Self {
        self.lock().launch_error = Some(reason.to_string());
        self
    }

    pub fn failing_navigation(self, reason: &str) -> Self {
        self.lock().navigation_error = Some(reason.to_string());
        self
    }

    /// Navigation blocks this long before it takes effect.
    pub fn navigation_delay(self, delay: Duration) -> Self {
        self.lock().navigation_delay = delay;
        self
    }

    /// Release takes this long before the session counts as closed.
    pub fn release_delay(self, delay: Duration) -> Self {
        self.lock().release_delay = delay;
        self
    }

    /// A session that does not count as a launch.
    pub fn session(&self) -> MockSession {
        MockSession {
            state: self.state.clone(),
        }
    }

    pub fn launches(&self) -> usize {
        self.lock().launches
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    pub fn clicks(&self) -> usize {
        self.lock().clicks
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl BrowserLauncher for MockBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let mut state = self.lock();
        if let Some(reason) = &state.launch_error {
            bail!("MockBrowser: launch failed: {reason}");
        }
        state.launches += 1;
        drop(state);
        Ok(Box::new(self.session()))
    }
}

pub struct MockSession {
    state: Arc<Mutex<BrowserState>>,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let delay = self.state.lock().unwrap().navigation_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.navigation_error {
            bail!("MockBrowser: navigation to {url} failed: {reason}");
        }
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<Vec<ElementRef>> {
        let state = self.state.lock().unwrap();
        match state.elements.get(locator.value()) {
            Some(texts) if !texts.is_empty() => Ok((0..texts.len())
                .map(|i| ElementRef(format!("{}#{i}", locator.value())))
                .collect()),
            _ => Err(anyhow!(
                "MockBrowser: {locator} not found within {}ms",
                timeout.as_millis()
            )),
        }
    }

    async fn click(&self, _element: &ElementRef) -> Result<()> {
        self.state.lock().unwrap().clicks += 1;
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        let (value, index) = element
            .0
            .rsplit_once('#')
            .ok_or_else(|| anyhow!("MockBrowser: unknown element {}", element.0))?;
        let index: usize = index.parse()?;
        let state = self.state.lock().unwrap();
        state
            .elements
            .get(value)
            .and_then(|texts| texts.get(index))
            .cloned()
            .ok_or_else(|| anyhow!("MockBrowser: stale element {}", element.0))
    }

    async fn release(&self) {
        let delay = self.state.lock().unwrap().release_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().releases += 1;
    }
}

// ---------------------------------------------------------------------------
// MockTrendSource
// ---------------------------------------------------------------------------

/// Replays scripted polls in order. Once the script runs out every poll fails,
/// which ends collection.
#[derive(Default)]
pub struct MockTrendSource {
    script: Mutex<VecDeque<std::result::Result<Vec<String>, String>>>,
    polls: AtomicUsize,
}

impl MockTrendSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch(self, fragments: &[&str]) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(fragments.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn failure(self, reason: &str) -> Self {
        self.script.lock().unwrap().push_back(Err(reason.to_string()));
        self
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrendSource for MockTrendSource {
    async fn poll(&self) -> Result<Vec<String>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(batch)) => Ok(batch),
            Some(Err(reason)) => Err(anyhow!("MockTrendSource: {reason}")),
            None => Err(anyhow!("MockTrendSource: script exhausted")),
        }
    }
}

// ---------------------------------------------------------------------------
// MockResolver
// ---------------------------------------------------------------------------

/// Link → result map. Unregistered links resolve to `N/A`.
#[derive(Default)]
pub struct MockResolver {
    results: HashMap<String, SearchResults>,
    calls: Mutex<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, link: &str, result: SearchResults) -> Self {
        self.results.insert(link.to_string(), result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricResolver for MockResolver {
    async fn resolve(&self, link: &str) -> SearchResults {
        self.calls.lock().unwrap().push(link.to_string());
        self.results
            .get(link)
            .cloned()
            .unwrap_or(SearchResults::NotAvailable)
    }
}

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

/// In-memory run file. Every successful write is kept as a snapshot.
pub struct MemoryRecordStore {
    records: Mutex<Vec<Record>>,
    snapshots: Mutex<Vec<Vec<Record>>>,
    fail_after: Option<usize>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            snapshots: Mutex::new(Vec::new()),
            fail_after: None,
        }
    }

    /// Writes beyond the first `n` fail, leaving the last good state in place.
    pub fn fail_after_writes(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<Vec<Record>> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl RecordStore for MemoryRecordStore {
    fn read_all(&self) -> Result<Vec<Record>, TrendScoutError> {
        Ok(self.records())
    }

    fn write_all(&self, records: &[Record]) -> Result<(), TrendScoutError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        if self.fail_after.is_some_and(|n| snapshots.len() >= n) {
            return Err(TrendScoutError::Store {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("MemoryRecordStore: disk full"),
            });
        }
        snapshots.push(records.to_vec());
        *self.records.lock().unwrap() = records.to_vec();
        Ok(())
    }
}
