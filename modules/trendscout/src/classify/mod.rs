pub mod classifier;
pub mod engines;
pub mod normalize;

pub use classifier::{ClassifierStats, PersonClassifier, Signal, Verdict};
pub use engines::{Entity, EntityRecognizer, Recognition, RecognitionEngines};
pub use normalize::normalize;
