//! Concurrent access to a periodically rebuilt index.
//!
//! `ConcurrentSearcher` owns the one mutable piece of shared state in the
//! system: the active (snapshot, ranking) pair. Reads hold the shared side
//! of a reader/writer lock for their whole duration; `refresh` holds the
//! exclusive side, so no read ever straddles a snapshot swap and the
//! superseded snapshot is released only after the replacement is published.

use parking_lot::RwLock;
use std::path::Path;
#[cfg(test)]
use std::time::Duration;
use std::time::Instant;
use tantivy::collector::TopDocs;
use tantivy::query::Query;
use tantivy::schema::NamedFieldDocument;
use tantivy::{
    DocAddress, Document, Index, IndexReader, Opstamp, Order, ReloadPolicy, Searcher,
    TantivyDocument, Term,
};

use crate::error::{Result, SearchError};
use crate::searcher::collector::DeadlineCollector;
use crate::searcher::query::QueryBuilder;
use crate::searcher::types::{
    Hit, IndexInfo, RankingConfig, SearchOptions, SearchRequest, SearchResponse,
};

/// The (snapshot, ranking) pair answering queries right now.
struct ActiveSearcher {
    searcher: Searcher,
    opstamp: Opstamp,
    ranking: RankingConfig,
}

/// Thread-safe facade over the current index snapshot.
///
/// Any number of read operations run in parallel; `refresh` swaps in a newer
/// snapshot between them. Lock release is a guard drop, so it happens on
/// every exit path, including errors.
pub struct ConcurrentSearcher {
    index: Index,
    reader: IndexReader,
    active: RwLock<ActiveSearcher>,
}

impl ConcurrentSearcher {
    /// Open the index in `dir` at its current generation.
    pub fn open(dir: &Path, ranking: RankingConfig) -> Result<Self> {
        let index = Index::open_in_dir(dir)
            .map_err(|e| SearchError::Index(format!("failed to open index: {e}")))?;
        Self::from_index(index, ranking)
    }

    /// Wrap an already opened index. Reload stays manual: snapshots advance
    /// only through `refresh`.
    pub fn from_index(index: Index, ranking: RankingConfig) -> Result<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: tantivy::TantivyError| {
                SearchError::Index(format!("failed to create reader: {e}"))
            })?;
        let opstamp = index.load_metas()?.opstamp;
        let searcher = reader.searcher();

        tracing::info!(opstamp, num_docs = searcher.num_docs(), "searcher opened");

        Ok(Self {
            index,
            reader,
            active: RwLock::new(ActiveSearcher {
                searcher,
                opstamp,
                ranking,
            }),
        })
    }

    /// Ranked top-N search from a query string, with optional filter,
    /// fast-field sort, and deadline.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if request.limit == 0 {
            return Err(SearchError::InvalidArgument(
                "result limit must be positive".to_string(),
            ));
        }

        let active = self.active.read();
        let builder = QueryBuilder::new(&self.index, &active.ranking);
        let query = builder.build_with_filter(&request.query, request.filter.as_deref())?;
        Self::execute(&active.searcher, &*query, &request.options())
    }

    /// Ranked top-N search from an already parsed query plan.
    pub fn search_query(
        &self,
        query: &dyn Query,
        filter: Option<&dyn Query>,
        options: &SearchOptions,
    ) -> Result<SearchResponse> {
        if options.limit == 0 {
            return Err(SearchError::InvalidArgument(
                "result limit must be positive".to_string(),
            ));
        }

        let active = self.active.read();
        match filter {
            Some(filter) => {
                let combined = tantivy::query::BooleanQuery::new(vec![
                    (tantivy::query::Occur::Must, query.box_clone()),
                    (tantivy::query::Occur::Must, filter.box_clone()),
                ]);
                Self::execute(&active.searcher, &combined, options)
            }
            None => Self::execute(&active.searcher, query, options),
        }
    }

    fn execute(
        searcher: &Searcher,
        query: &dyn Query,
        options: &SearchOptions,
    ) -> Result<SearchResponse> {
        let started = Instant::now();

        let hits = match (&options.sort_by, options.deadline) {
            (None, None) => {
                let fruits = searcher.search(query, &TopDocs::with_limit(options.limit))?;
                fruits
                    .into_iter()
                    .map(|(score, address)| Hit {
                        score,
                        sort_key: None,
                        address,
                    })
                    .collect()
            }
            (None, Some(budget)) => {
                let collector = DeadlineCollector::new(TopDocs::with_limit(options.limit), budget);
                let fruits = searcher.search(query, &collector)?;
                fruits
                    .into_iter()
                    .map(|(score, address)| Hit {
                        score,
                        sort_key: None,
                        address,
                    })
                    .collect()
            }
            (Some(field), None) => {
                let collector =
                    TopDocs::with_limit(options.limit).order_by_u64_field(field.clone(), Order::Desc);
                let fruits = searcher.search(query, &collector)?;
                fruits
                    .into_iter()
                    .map(|(key, address)| Hit {
                        score: 0.0,
                        sort_key: Some(key),
                        address,
                    })
                    .collect()
            }
            (Some(field), Some(budget)) => {
                let inner =
                    TopDocs::with_limit(options.limit).order_by_u64_field(field.clone(), Order::Desc);
                let fruits = searcher.search(query, &DeadlineCollector::new(inner, budget))?;
                fruits
                    .into_iter()
                    .map(|(key, address)| Hit {
                        score: 0.0,
                        sort_key: Some(key),
                        address,
                    })
                    .collect()
            }
        };

        Ok(SearchResponse {
            hits,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Resolve a (field, value) pair against the active schema.
    pub fn term(&self, field: &str, value: &str) -> Result<Term> {
        let schema = self.index.schema();
        let field = schema
            .get_field(field)
            .map_err(|_| SearchError::InvalidArgument(format!("unknown field: {field}")))?;
        Ok(Term::from_field_text(field, value))
    }

    /// Number of documents containing `term`.
    pub fn doc_freq(&self, term: &Term) -> Result<u64> {
        let active = self.active.read();
        Ok(active.searcher.doc_freq(term)?)
    }

    /// Batched document frequencies, all answered by the same snapshot.
    pub fn doc_freqs(&self, terms: &[Term]) -> Result<Vec<u64>> {
        let active = self.active.read();
        terms
            .iter()
            .map(|term| Ok(active.searcher.doc_freq(term)?))
            .collect()
    }

    /// Fetch a stored document by address.
    pub fn doc(&self, address: DocAddress) -> Result<NamedFieldDocument> {
        let active = self.active.read();
        Self::fetch(&active.searcher, address)
    }

    /// Fetch a stored document restricted to the named fields. An empty
    /// selection returns every stored field.
    pub fn doc_fields(&self, address: DocAddress, fields: &[String]) -> Result<NamedFieldDocument> {
        let active = self.active.read();
        let mut named = Self::fetch(&active.searcher, address)?;
        if !fields.is_empty() {
            named.0.retain(|name, _| fields.iter().any(|f| f == name));
        }
        Ok(named)
    }

    fn fetch(searcher: &Searcher, address: DocAddress) -> Result<NamedFieldDocument> {
        let segment = searcher
            .segment_readers()
            .get(address.segment_ord as usize)
            .ok_or_else(|| SearchError::NotFound(format!("no segment {}", address.segment_ord)))?;
        if address.doc_id >= segment.max_doc() {
            return Err(SearchError::NotFound(format!(
                "no document {}/{}",
                address.segment_ord, address.doc_id
            )));
        }
        let doc: TantivyDocument = searcher.doc(address)?;
        Ok(doc.to_named_doc(searcher.schema()))
    }

    /// Explain how `query` scored the document at `address`.
    pub fn explain(&self, query: &str, address: DocAddress) -> Result<tantivy::query::Explanation> {
        let active = self.active.read();
        let builder = QueryBuilder::new(&self.index, &active.ranking);
        let query = builder.build(query)?;
        Ok(query.explain(&active.searcher, address)?)
    }

    /// Explain with an already parsed query plan.
    pub fn explain_query(
        &self,
        query: &dyn Query,
        address: DocAddress,
    ) -> Result<tantivy::query::Explanation> {
        let active = self.active.read();
        Ok(query.explain(&active.searcher, address)?)
    }

    /// Current ranking configuration.
    pub fn ranking(&self) -> RankingConfig {
        self.active.read().ranking.clone()
    }

    /// Replace the ranking configuration; carried forward by later refreshes.
    pub fn set_ranking(&self, ranking: RankingConfig) {
        self.active.write().ranking = ranking;
    }

    /// Diagnostics for the active snapshot.
    pub fn info(&self) -> IndexInfo {
        let active = self.active.read();
        IndexInfo {
            num_docs: active.searcher.num_docs(),
            num_segments: active.searcher.segment_readers().len() as u64,
            opstamp: active.opstamp,
        }
    }

    /// Adopt a newer snapshot if one has been committed.
    ///
    /// Returns `false` without disturbing readers when the committed opstamp
    /// matches the one already adopted. On failure the previous snapshot
    /// stays live and serving.
    pub fn refresh(&self) -> Result<bool> {
        let mut active = self.active.write();

        let metas = self.index.load_metas()?;
        if metas.opstamp == active.opstamp {
            tracing::debug!(opstamp = active.opstamp, "refresh: index unchanged");
            return Ok(false);
        }

        self.reader.reload()?;
        let searcher = self.reader.searcher();
        let ranking = active.ranking.clone();

        // An external commit can land between the metas read and the reload,
        // leaving the reloaded searcher ahead of the opstamp read above.
        // Re-read so the recorded opstamp is the one the reload saw.
        let adopted = self.index.load_metas()?;

        tracing::info!(
            from = active.opstamp,
            to = adopted.opstamp,
            num_docs = searcher.num_docs(),
            "refresh: adopting new snapshot"
        );

        // Publish first; the superseded snapshot drops after the slot holds
        // its replacement. Exclusivity alone guarantees no reader still uses
        // it.
        let previous = std::mem::replace(
            &mut *active,
            ActiveSearcher {
                searcher,
                opstamp: adopted.opstamp,
                ranking,
            },
        );
        drop(previous);

        Ok(true)
    }
}
