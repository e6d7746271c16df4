//! searchgate: a concurrency and distribution layer in front of an
//! immutable, periodically rebuilt tantivy index.
//!
//! Three pieces, tightly coupled:
//! - [`searcher::ConcurrentSearcher`] serializes snapshot refresh against
//!   unbounded concurrent reads behind a reader/writer lock.
//! - [`searcher::DeadlineCollector`] bounds the wall-clock cost of any
//!   single query, all-or-nothing.
//! - [`grpc`] exports the same capability set over the network, with a
//!   client proxy that reconnects on transport failure.
//!
//! Index construction and the query language belong to the engine; an
//! external writer commits new generations that `refresh` adopts.

pub mod config;
pub mod error;
pub mod grpc;
pub mod searcher;

pub use config::Config;
pub use error::{Result, SearchError};
pub use searcher::{
    ConcurrentSearcher, DeadlineCollector, Hit, IndexInfo, RankingConfig, SearchRequest,
    SearchResponse,
};
