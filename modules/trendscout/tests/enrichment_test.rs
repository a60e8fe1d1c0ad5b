//! Stage-two tests against a real CSV run file in a temp directory.
//!
//! Resolver and delays are mocked; the store is the production CSV store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use trendscout::pipeline::resolver::{RESULT_STATS_ID, TOOLS_XPATH};
use trendscout::pipeline::{BrowserMetricResolver, Enricher};
use trendscout::scheduling::{FixedDelay, Interrupt, InterruptHandle};
use trendscout::store::CsvRecordStore;
use trendscout::testing::{MemoryRecordStore, MockBrowser, MockResolver, NoDelay};
use trendscout::traits::{MetricResolver, RecordStore};
use trendscout_common::{Record, SearchResults, TrendScoutError};

fn person(name: &str) -> Record {
    Record::new(name, true).unwrap()
}

fn store_with(dir: &tempfile::TempDir, records: &[Record]) -> CsvRecordStore {
    let store = CsvRecordStore::new(dir.path().join("run.csv"));
    store.write_all(records).unwrap();
    store
}

// ---------------------------------------------------------------------------
// Resume
// ---------------------------------------------------------------------------

#[tokio::test]
async fn terminal_rows_are_not_queried_again() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = vec![
        person("Pedro Pascal"),
        person("Jenna Ortega"),
        person("Sabrina Carpenter"),
        person("Glen Powell"),
        person("Ayo Edebiri"),
    ];
    rows[2].search_results = Some(SearchResults::Count(42));
    let store = store_with(&dir, &rows);

    let resolver = MockResolver::new();
    let stats = Enricher::new(&resolver, &NoDelay, Interrupt::never())
        .enrich(&store)
        .await
        .unwrap();

    let expected: Vec<String> = [0, 1, 3, 4].iter().map(|&i| rows[i].link.clone()).collect();
    assert_eq!(resolver.calls(), expected);
    assert_eq!(stats.already_processed, 1);

    let after = store.read_all().unwrap();
    assert_eq!(after[2].search_results, Some(SearchResults::Count(42)));
    assert_eq!(after[0].search_results, Some(SearchResults::NotAvailable));
}

#[tokio::test]
async fn rerun_retries_only_not_available_rows() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![person("Pedro Pascal"), person("Jenna Ortega")];
    let store = store_with(&dir, &rows);

    let first = MockResolver::new().with(&rows[0].link, SearchResults::Count(5));
    Enricher::new(&first, &NoDelay, Interrupt::never())
        .enrich(&store)
        .await
        .unwrap();

    let second = MockResolver::new().with(&rows[1].link, SearchResults::Count(9));
    let stats = Enricher::new(&second, &NoDelay, Interrupt::never())
        .enrich(&store)
        .await
        .unwrap();

    assert_eq!(second.calls(), vec![rows[1].link.clone()]);
    assert_eq!(stats.already_processed, 1);
    assert_eq!(stats.resolved, 1);
    let after = store.read_all().unwrap();
    assert_eq!(after[0].search_results, Some(SearchResults::Count(5)));
    assert_eq!(after[1].search_results, Some(SearchResults::Count(9)));
}

#[tokio::test]
async fn non_person_rows_are_marked_without_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![
        Record::new("The Bear Season 3", false).unwrap(),
        person("Pedro Pascal"),
    ];
    let store = store_with(&dir, &rows);

    let resolver = MockResolver::new().with(&rows[1].link, SearchResults::Count(1_000));
    let stats = Enricher::new(&resolver, &NoDelay, Interrupt::never())
        .enrich(&store)
        .await
        .unwrap();

    assert_eq!(resolver.calls(), vec![rows[1].link.clone()]);
    assert_eq!(stats.not_a_person, 1);
    let text = std::fs::read_to_string(store.path()).unwrap();
    assert!(text.contains("The Bear Season 3,False,"));
    assert!(text.contains("Not a person - skipped"));
}

#[tokio::test]
async fn missing_search_results_column_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.csv");
    let link = person("Pedro Pascal").link;
    std::fs::write(&path, format!("Name,Is Person,Link\nPedro Pascal,True,{link}\n")).unwrap();
    let store = CsvRecordStore::new(&path);

    let resolver = MockResolver::new().with(&link, SearchResults::Count(77));
    let stats = Enricher::new(&resolver, &NoDelay, Interrupt::never())
        .enrich(&store)
        .await
        .unwrap();

    assert_eq!(stats.resolved, 1);
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Name,Is Person,Link,Search Results\n"));
    assert!(text.contains(",77"));
}

#[tokio::test]
async fn malformed_run_file_aborts_the_stage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");
    std::fs::write(&path, "Name,Is Person,Link,Search Results\nPedro Pascal,maybe,x,\n").unwrap();

    let resolver = MockResolver::new();
    let err = Enricher::new(&resolver, &NoDelay, Interrupt::never())
        .enrich(&CsvRecordStore::new(&path))
        .await
        .unwrap_err();
    assert!(matches!(err, TrendScoutError::MalformedRunFile { .. }));
    assert!(resolver.calls().is_empty());
}

#[tokio::test]
async fn hand_edited_cells_and_extra_columns_survive_enrichment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edited.csv");
    std::fs::write(
        &path,
        "Name,Is Person,Link,Search Results,Notes\n\
         Ann Lee,yes,l0,0012500,keep me\n\
         Bo Diaz,1,l1,,call back\n",
    )
    .unwrap();

    let resolver = MockResolver::new().with("l1", SearchResults::Count(77));
    let stats = Enricher::new(&resolver, &NoDelay, Interrupt::never())
        .enrich(&CsvRecordStore::new(&path))
        .await
        .unwrap();

    assert_eq!(resolver.calls(), vec!["l1".to_string()]);
    assert_eq!(stats.already_processed, 1);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Name,Is Person,Link,Search Results,Notes\n\
         Ann Lee,yes,l0,0012500,keep me\n\
         Bo Diaz,1,l1,77,call back\n"
    );
}

// ---------------------------------------------------------------------------
// Interruption
// ---------------------------------------------------------------------------

/// Answers the first lookup, then fires the interrupt during the second.
struct InterruptingResolver {
    handle: InterruptHandle,
    calls: Mutex<u32>,
}

#[async_trait]
impl MetricResolver for InterruptingResolver {
    async fn resolve(&self, _link: &str) -> SearchResults {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == 1 {
            SearchResults::Count(11)
        } else {
            self.handle.trigger();
            SearchResults::Count(22)
        }
    }
}

#[tokio::test]
async fn interrupt_keeps_completed_rows_and_drops_the_row_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let rows = vec![person("Pedro Pascal"), person("Jenna Ortega"), person("Glen Powell")];
    let store = store_with(&dir, &rows);

    let (handle, interrupt) = Interrupt::new();
    let resolver = InterruptingResolver {
        handle,
        calls: Mutex::new(0),
    };
    let err = Enricher::new(&resolver, &NoDelay, interrupt)
        .enrich(&store)
        .await
        .unwrap_err();
    assert!(matches!(err, TrendScoutError::Interrupted));

    let after = store.read_all().unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(after[0].search_results, Some(SearchResults::Count(11)));
    assert_eq!(after[1].search_results, None);
    assert_eq!(after[2].search_results, None);
}

#[tokio::test]
async fn interrupt_during_lookup_waits_for_the_browser_to_close() {
    let browser = MockBrowser::new()
        .on_elements(TOOLS_XPATH, vec!["Tools".to_string()])
        .on_elements(RESULT_STATS_ID, vec!["About 3 results".to_string()])
        .navigation_delay(Duration::from_secs(3600))
        .release_delay(Duration::from_millis(20));
    let (handle, interrupt) = Interrupt::new();
    let resolver = BrowserMetricResolver::new(
        Arc::new(browser.clone()),
        Arc::new(FixedDelay(Duration::ZERO)),
        Duration::from_millis(50),
        interrupt.clone(),
    );
    let store = MemoryRecordStore::new(vec![person("Pedro Pascal")]);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.trigger();
    });
    let err = tokio::time::timeout(
        Duration::from_secs(5),
        Enricher::new(&resolver, &NoDelay, interrupt).enrich(&store),
    )
    .await
    .expect("enrichment should stop promptly")
    .unwrap_err();

    assert!(matches!(err, TrendScoutError::Interrupted));
    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.releases(), 1);
    assert_eq!(store.writes(), 0);
}
