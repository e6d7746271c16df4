//! Concurrent, deadline-bounded access to the current index snapshot.

pub mod collector;
pub mod facade;
pub mod query;
pub mod types;

pub use collector::DeadlineCollector;
pub use facade::ConcurrentSearcher;
pub use query::QueryBuilder;
pub use types::{Hit, IndexInfo, RankingConfig, SearchOptions, SearchRequest, SearchResponse};
