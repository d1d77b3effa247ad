//! discovery - fuzzy catalog search and personalized activity
//! recommendations for young learners.
//!
//! A [`DiscoveryEngine`] indexes a catalog of activities, app features and
//! content resources. It answers keyword searches with typo-tolerant
//! scoring and structured filters, and it keeps one preference profile per
//! learner. Those profiles drive ranked, explainable recommendations along
//! with home-screen shortcuts and "what next" navigation.
//!
//! # Quick start
//!
//! ```
//! use chrono::Utc;
//! use discovery::{
//!     DiscoveryEngine,
//!     catalog,
//!     context::ContextBuilder,
//!     filter::SearchFilter,
//!     profile::ChildInfo,
//!     search::SearchOptions,
//! };
//!
//! let entries = catalog::parse_catalog(r#"[
//!     {"id": "counting-train", "kind": "activity", "title": "Counting Train",
//!      "category": "math", "min_age": 3, "max_age": 6, "difficulty": 1,
//!      "duration_minutes": 10}
//! ]"#).unwrap();
//! let engine = DiscoveryEngine::with_catalog(&entries);
//!
//! let hits = engine
//!     .search("countin", &SearchFilter::default(), &SearchOptions::default())
//!     .unwrap();
//! assert_eq!(hits[0].id, "counting-train");
//!
//! engine.initialize_profile(&ChildInfo {
//!     id: "sam".to_string(),
//!     ..Default::default()
//! });
//! let context = ContextBuilder::new(Utc::now()).build();
//! for rec in engine.recommendations("sam", &context) {
//!     println!("{} {:.2} {:?}", rec.activity_id, rec.score, rec.reasons);
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod content;
pub mod content_index;
pub mod context;
pub mod data_dir;
pub mod engine;
pub mod error;
pub mod filter;
pub mod history;
pub mod profile;
pub mod recommend;
pub mod search;
pub mod store;
pub mod text_util;

pub use content::{ContentEntry, EntryKind};
pub use content_index::{ContentIndex, ContentRepository};
pub use data_dir::DataDir;
pub use engine::DiscoveryEngine;
pub use error::{Error, Result};
pub use profile::{ProfileStore, UserPreferenceProfile};
pub use recommend::RecommendationScorer;
pub use search::SearchEngine;
pub use store::EngineStore;
