//! Person/non-person verdicts for normalized names.
//!
//! Signals are consulted in a fixed order and the first decisive one wins:
//! shape checks, the exclusion lexicon, each recognition engine, then two
//! name-shape patterns. Engine trouble never decides a verdict; it is counted
//! and logged so a missing model shows up in the run summary instead of
//! silently turning everyone into "not a person".

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::engines::{Recognition, RecognitionEngines};
use super::normalize::normalize;

/// Substrings that mark a title, show or event rather than a person.
pub const EXCLUDED_TERMS: &[&str] = &[
    "tv", "show", "movie", "film", "series", "season", "song", "music", "award", "channel",
    "network", "episode", "live", "stream", "premiere", "finale",
];

/// Function words that disqualify the capitalized-words pattern.
const STOPWORDS: &[&str] = &["the", "and", "of"];

/// One to four capitalized words.
static CAPITALIZED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,3}$").expect("valid regex")
});

/// Initials followed by a surname. Normalization strips the periods, so both
/// `J. K. Rowling` and `J K Rowling` have to match.
static INITIALS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z](?:\.\s*|\s+))+[A-Z][a-z]+$").expect("valid regex")
});

/// Which signal settled the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Empty, single character or all digits after normalization.
    Malformed,
    Excluded(&'static str),
    Engine(String),
    CapitalizedName,
    Initials,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_person: bool,
    pub signal: Signal,
}

impl Verdict {
    fn accept(signal: Signal) -> Self {
        Self {
            is_person: true,
            signal,
        }
    }

    fn reject(signal: Signal) -> Self {
        Self {
            is_person: false,
            signal,
        }
    }
}

/// Counters for one classifier over its lifetime.
#[derive(Debug, Default)]
struct Counters {
    evaluated: AtomicU64,
    accepted: AtomicU64,
    excluded: AtomicU64,
    engine_accepts: AtomicU64,
    pattern_accepts: AtomicU64,
    engine_unavailable: AtomicU64,
    engine_failed: AtomicU64,
}

/// Snapshot of classifier counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassifierStats {
    pub evaluated: u64,
    pub accepted: u64,
    pub excluded: u64,
    pub engine_accepts: u64,
    pub pattern_accepts: u64,
    pub engine_unavailable: u64,
    pub engine_failed: u64,
}

impl ClassifierStats {
    /// True when some engine could not answer at least once.
    pub fn engines_degraded(&self) -> bool {
        self.engine_unavailable > 0 || self.engine_failed > 0
    }
}

impl fmt::Display for ClassifierStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Names classified:   {}", self.evaluated)?;
        writeln!(f, "  People:           {}", self.accepted)?;
        writeln!(f, "  Lexicon rejects:  {}", self.excluded)?;
        writeln!(f, "  Engine accepts:   {}", self.engine_accepts)?;
        writeln!(f, "  Pattern accepts:  {}", self.pattern_accepts)?;
        if self.engines_degraded() {
            writeln!(
                f,
                "  Engine problems:  {} unavailable, {} failed",
                self.engine_unavailable, self.engine_failed
            )?;
        }
        Ok(())
    }
}

pub struct PersonClassifier {
    engines: RecognitionEngines,
    counters: Counters,
}

impl PersonClassifier {
    pub fn new(engines: RecognitionEngines) -> Self {
        Self {
            engines,
            counters: Counters::default(),
        }
    }

    /// Classifier that relies on the lexicon and name patterns only.
    pub fn patterns_only() -> Self {
        Self::new(RecognitionEngines::none())
    }

    pub async fn is_person(&self, text: &str) -> bool {
        self.classify(text).await.is_person
    }

    pub async fn classify(&self, text: &str) -> Verdict {
        let text = normalize(text);
        let verdict = self.decide(&text).await;

        self.counters.evaluated.fetch_add(1, Ordering::Relaxed);
        if verdict.is_person {
            self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            name = text.as_str(),
            is_person = verdict.is_person,
            signal = ?verdict.signal,
            "Classified"
        );
        verdict
    }

    async fn decide(&self, text: &str) -> Verdict {
        if text.chars().count() < 2 || text.chars().all(char::is_numeric) {
            return Verdict::reject(Signal::Malformed);
        }

        if let Some(term) = excluded_term(text) {
            self.counters.excluded.fetch_add(1, Ordering::Relaxed);
            return Verdict::reject(Signal::Excluded(term));
        }

        for engine in self.engines.iter() {
            match engine.recognize(text).await {
                Recognition::Entities(entities) => {
                    if entities.iter().any(|e| e.is_person()) {
                        self.counters.engine_accepts.fetch_add(1, Ordering::Relaxed);
                        return Verdict::accept(Signal::Engine(engine.name().to_string()));
                    }
                }
                Recognition::Unavailable => {
                    self.counters.engine_unavailable.fetch_add(1, Ordering::Relaxed);
                    warn!(engine = engine.name(), name = text, "Recognition engine unavailable");
                }
                Recognition::Failed(reason) => {
                    self.counters.engine_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        engine = engine.name(),
                        name = text,
                        reason = reason.as_str(),
                        "Recognition engine failed"
                    );
                }
            }
        }

        if looks_like_capitalized_name(text) {
            self.counters.pattern_accepts.fetch_add(1, Ordering::Relaxed);
            return Verdict::accept(Signal::CapitalizedName);
        }

        if INITIALS_NAME.is_match(text) {
            self.counters.pattern_accepts.fetch_add(1, Ordering::Relaxed);
            return Verdict::accept(Signal::Initials);
        }

        Verdict::reject(Signal::NoMatch)
    }

    pub fn stats(&self) -> ClassifierStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ClassifierStats {
            evaluated: load(&self.counters.evaluated),
            accepted: load(&self.counters.accepted),
            excluded: load(&self.counters.excluded),
            engine_accepts: load(&self.counters.engine_accepts),
            pattern_accepts: load(&self.counters.pattern_accepts),
            engine_unavailable: load(&self.counters.engine_unavailable),
            engine_failed: load(&self.counters.engine_failed),
        }
    }
}

/// First lexicon term contained anywhere in the lowercase text.
pub fn excluded_term(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    EXCLUDED_TERMS
        .iter()
        .copied()
        .find(|term| lower.contains(term))
}

fn looks_like_capitalized_name(text: &str) -> bool {
    CAPITALIZED_NAME.is_match(text)
        && !text
            .split_whitespace()
            .any(|word| STOPWORDS.contains(&word.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::classify::engines::{Entity, EntityRecognizer};
    use crate::testing::MockEngine;

    fn engines(list: Vec<Arc<dyn EntityRecognizer>>) -> RecognitionEngines {
        RecognitionEngines::new(list)
    }

    #[tokio::test]
    async fn lexicon_term_rejects_titles() {
        let classifier = PersonClassifier::patterns_only();
        let verdict = classifier.classify("Stranger Things Season 5").await;
        assert!(!verdict.is_person);
        assert_eq!(verdict.signal, Signal::Excluded("season"));
    }

    #[tokio::test]
    async fn lexicon_matches_substrings() {
        let classifier = PersonClassifier::patterns_only();
        assert!(!classifier.is_person("Deliverance").await);
        assert!(!classifier.is_person("Oliver Stone").await);
        assert!(classifier.is_person("Olivia Rodrigo").await);
    }

    #[tokio::test]
    async fn capitalized_words_are_people_without_engines() {
        let classifier = PersonClassifier::patterns_only();
        assert!(classifier.is_person("John Smith").await);
        assert!(classifier.is_person("Cher").await);
        assert!(classifier.is_person("Mary Jane Watson Parker").await);
    }

    #[tokio::test]
    async fn stopwords_and_odd_shapes_are_rejected() {
        let classifier = PersonClassifier::patterns_only();
        assert!(!classifier.is_person("The Of").await);
        assert!(!classifier.is_person("Lord of Rings").await);
        assert!(!classifier.is_person("john smith").await);
        assert!(!classifier.is_person("NASA").await);
        assert!(!classifier.is_person("One Two Three Four Five").await);
    }

    #[tokio::test]
    async fn initials_pattern_accepts() {
        let classifier = PersonClassifier::patterns_only();
        let verdict = classifier.classify("J. K. Rowling").await;
        assert!(verdict.is_person);
        assert_eq!(verdict.signal, Signal::Initials);
        assert!(classifier.is_person("J K Rowling").await);
        assert!(!classifier.is_person("JK Rowling").await);
    }

    #[tokio::test]
    async fn malformed_inputs_are_rejected() {
        let classifier = PersonClassifier::patterns_only();
        for text in ["", "A", "   ", "2024", "!!"] {
            let verdict = classifier.classify(text).await;
            assert!(!verdict.is_person, "{text:?}");
            assert_eq!(verdict.signal, Signal::Malformed);
        }
    }

    #[tokio::test]
    async fn input_is_normalized_first() {
        let classifier = PersonClassifier::patterns_only();
        assert!(classifier.is_person("  John   Smith!! ").await);
    }

    #[tokio::test]
    async fn engine_person_entity_accepts_lowercase_names() {
        let engine = MockEngine::new("spacy").on("bad bunny", vec![Entity::new("PERSON")]);
        let classifier = PersonClassifier::new(engines(vec![Arc::new(engine)]));
        let verdict = classifier.classify("bad bunny").await;
        assert!(verdict.is_person);
        assert_eq!(verdict.signal, Signal::Engine("spacy".to_string()));
    }

    #[tokio::test]
    async fn lexicon_wins_over_engines() {
        let engine = MockEngine::new("spacy").on("Taylor Swift Live", vec![Entity::new("PERSON")]);
        let engine = Arc::new(engine);
        let classifier = PersonClassifier::new(engines(vec![engine.clone()]));
        assert!(!classifier.is_person("Taylor Swift Live").await);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn second_engine_consulted_when_first_finds_nothing() {
        let first = Arc::new(MockEngine::new("spacy").on("sza", vec![Entity::new("ORG")]));
        let second = Arc::new(MockEngine::new("transformer").on("sza", vec![Entity::new("B-PER")]));
        let classifier = PersonClassifier::new(engines(vec![first.clone(), second.clone()]));
        let verdict = classifier.classify("sza").await;
        assert_eq!(verdict.signal, Signal::Engine("transformer".to_string()));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn failing_engines_fall_through_to_patterns() {
        let down = Arc::new(MockEngine::unavailable("spacy"));
        let broken = Arc::new(MockEngine::failing("transformer", "model crashed"));
        let classifier = PersonClassifier::new(engines(vec![down, broken]));

        let verdict = classifier.classify("John Smith").await;
        assert!(verdict.is_person);
        assert_eq!(verdict.signal, Signal::CapitalizedName);

        let stats = classifier.stats();
        assert_eq!(stats.engine_unavailable, 1);
        assert_eq!(stats.engine_failed, 1);
        assert!(stats.engines_degraded());
    }

    #[tokio::test]
    async fn engine_problems_do_not_change_rejections() {
        let down = Arc::new(MockEngine::unavailable("spacy"));
        let classifier = PersonClassifier::new(engines(vec![down]));
        assert!(!classifier.is_person("the weekend lineup").await);
    }

    #[tokio::test]
    async fn stats_track_verdicts() {
        let classifier = PersonClassifier::patterns_only();
        classifier.is_person("John Smith").await;
        classifier.is_person("Reality Show").await;
        classifier.is_person("x").await;
        let stats = classifier.stats();
        assert_eq!(stats.evaluated, 3);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.excluded, 1);
        assert_eq!(stats.pattern_accepts, 1);
        assert!(!stats.engines_degraded());
    }
}
