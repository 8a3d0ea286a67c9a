pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod delay_manager;
pub mod delivery;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod job;
pub mod logger;
pub mod normalizer;
pub mod policy;
pub mod sources;

// Exporting types for convenience
pub use aggregator::{Aggregation, Aggregator};
pub use classifier::{classify, is_relevant, Verdict};
pub use fetcher::{Browser, HttpBrowser, PageFetcher};
pub use job::{JobCandidate, JobRecord};
pub use policy::{Policy, PolicyConfig, PreferenceMode};
pub use sources::{SourceId, SourceSpec};
