//! Request/response types shared by the local facade and the remote gateway

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tantivy::DocAddress;

/// Ranking configuration owned by the active searcher.
///
/// Survives snapshot refreshes: the searcher adopted by a refresh inherits
/// the configuration of the one it replaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Fields queried when a query string names none
    pub default_fields: Vec<String>,

    /// Per-field score boosts applied at query-build time
    #[serde(default)]
    pub field_boosts: HashMap<String, f32>,
}

impl RankingConfig {
    pub fn new(default_fields: Vec<String>) -> Self {
        Self {
            default_fields,
            field_boosts: HashMap::new(),
        }
    }

    pub fn with_boost(mut self, field: impl Into<String>, boost: f32) -> Self {
        self.field_boosts.insert(field.into(), boost);
        self
    }
}

/// A ranked search over the current snapshot
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Query string, parsed server-side over the configured default fields
    pub query: String,

    /// Optional filter query, combined as a must clause
    pub filter: Option<String>,

    /// Sort by a fast u64 field (descending) instead of relevance
    pub sort_by: Option<String>,

    /// Maximum hits to return; must be positive
    pub limit: usize,

    /// Wall-clock budget for hit collection; `Duration::ZERO` expires
    /// immediately. `None` leaves the scan unbounded.
    pub deadline: Option<Duration>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filter: None,
            sort_by: None,
            limit: 10,
            deadline: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub(crate) fn options(&self) -> SearchOptions {
        SearchOptions {
            sort_by: self.sort_by.clone(),
            limit: self.limit,
            deadline: self.deadline,
        }
    }
}

/// Collection options for callers that already hold a parsed query plan
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub sort_by: Option<String>,
    pub limit: usize,
    pub deadline: Option<Duration>,
}

impl SearchOptions {
    pub fn new(limit: usize) -> Self {
        Self {
            sort_by: None,
            limit,
            deadline: None,
        }
    }

    pub fn with_sort(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// A single hit: score or sort key, plus the address inside the snapshot
/// that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub score: f32,
    pub sort_key: Option<u64>,
    pub address: DocAddress,
}

/// Ranked results, fully attributable to exactly one snapshot
#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub hits: Vec<Hit>,
    pub elapsed_ms: u64,
}

/// Reader diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Live documents visible to the active searcher
    pub num_docs: u64,

    /// Segment count of the active snapshot
    pub num_segments: u64,

    /// Commit stamp the active snapshot was adopted at
    pub opstamp: u64,
}
