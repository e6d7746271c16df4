//! Deadline-enforcing collection.
//!
//! Wraps any tantivy collector and aborts the scan once an absolute
//! deadline has passed. The bound is all-or-nothing: an expired deadline
//! fails the whole search, it never truncates the top-N.

use std::time::{Duration, Instant};
use tantivy::collector::{Collector, SegmentCollector};
use tantivy::query::{Scorer, Weight};
use tantivy::{DocSet, SegmentReader, TantivyError, TERMINATED};

/// Sentinel carried inside the engine error so the facade can tell a
/// deadline expiry apart from a genuine engine failure.
pub(crate) const DEADLINE_EXCEEDED_MSG: &str = "search deadline exceeded";

/// A collector wrapper that polls a wall-clock deadline before forwarding
/// each candidate document to the inner collector.
///
/// The deadline is computed once at construction. Cooperative polling only:
/// a query that never yields a candidate cannot time out, so the bound
/// constrains matching-document iteration cost, not query setup.
pub struct DeadlineCollector<C> {
    inner: C,
    deadline: Instant,
}

impl<C: Collector> DeadlineCollector<C> {
    /// Wrap `inner`, expiring `budget` from now. A zero budget times out on
    /// the very first candidate.
    pub fn new(inner: C, budget: Duration) -> Self {
        let now = Instant::now();
        let deadline = now.checked_add(budget).unwrap_or_else(|| {
            // Budget too large to represent; clamp far enough out to never fire.
            now + Duration::from_secs(60 * 60 * 24 * 365)
        });
        Self { inner, deadline }
    }

    fn expired(&self) -> bool {
        // `>=` so a zero budget expires even if no time has measurably passed.
        Instant::now() >= self.deadline
    }
}

impl<C: Collector> Collector for DeadlineCollector<C> {
    type Fruit = C::Fruit;
    type Child = C::Child;

    fn for_segment(
        &self,
        segment_local_id: u32,
        segment: &SegmentReader,
    ) -> tantivy::Result<Self::Child> {
        self.inner.for_segment(segment_local_id, segment)
    }

    fn requires_scoring(&self) -> bool {
        self.inner.requires_scoring()
    }

    fn merge_fruits(
        &self,
        segment_fruits: Vec<<Self::Child as SegmentCollector>::Fruit>,
    ) -> tantivy::Result<Self::Fruit> {
        self.inner.merge_fruits(segment_fruits)
    }

    fn collect_segment(
        &self,
        weight: &dyn Weight,
        segment_ord: u32,
        reader: &SegmentReader,
    ) -> tantivy::Result<<Self::Child as SegmentCollector>::Fruit> {
        let mut child = self.inner.for_segment(segment_ord, reader)?;
        let scoring = self.inner.requires_scoring();
        let alive_bitset = reader.alive_bitset();

        let mut scorer = weight.scorer(reader, 1.0)?;
        let mut doc = scorer.doc();
        while doc != TERMINATED {
            if self.expired() {
                return Err(TantivyError::SystemError(DEADLINE_EXCEEDED_MSG.to_string()));
            }
            if alive_bitset.map_or(true, |bitset| bitset.is_alive(doc)) {
                let score = if scoring { scorer.score() } else { 0.0 };
                child.collect(doc, score);
            }
            doc = scorer.advance();
        }
        Ok(child.harvest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::collector::TopDocs;
    use tantivy::query::QueryParser;
    use tantivy::schema::{Schema, STORED, TEXT};
    use tantivy::{doc, Index};

    fn sample_index(num_docs: usize) -> (Index, tantivy::schema::Field) {
        let mut builder = Schema::builder();
        let body = builder.add_text_field("body", TEXT | STORED);
        let schema = builder.build();

        let index = Index::create_in_ram(schema);
        let mut writer: tantivy::IndexWriter = index.writer(15_000_000).unwrap();
        for i in 0..num_docs {
            writer
                .add_document(doc!(body => format!("common term number {i}")))
                .unwrap();
        }
        writer.commit().unwrap();
        (index, body)
    }

    #[test]
    fn test_zero_budget_times_out_on_first_candidate() {
        let (index, body) = sample_index(8);
        let reader = index.reader().unwrap();
        let searcher = reader.searcher();

        let query = QueryParser::for_index(&index, vec![body])
            .parse_query("common")
            .unwrap();

        let collector = DeadlineCollector::new(TopDocs::with_limit(5), Duration::ZERO);
        let result = searcher.search(&query, &collector);

        match result {
            Err(TantivyError::SystemError(msg)) => assert_eq!(msg, DEADLINE_EXCEEDED_MSG),
            other => panic!("expected deadline expiry, got {other:?}"),
        }
    }

    #[test]
    fn test_generous_budget_matches_unwrapped_collector() {
        let (index, body) = sample_index(8);
        let reader = index.reader().unwrap();
        let searcher = reader.searcher();

        let query = QueryParser::for_index(&index, vec![body])
            .parse_query("common")
            .unwrap();

        let plain = searcher.search(&query, &TopDocs::with_limit(5)).unwrap();
        let bounded = searcher
            .search(
                &query,
                &DeadlineCollector::new(TopDocs::with_limit(5), Duration::from_secs(60)),
            )
            .unwrap();

        assert_eq!(plain.len(), bounded.len());
        let plain_docs: Vec<_> = plain.iter().map(|(_, addr)| *addr).collect();
        let bounded_docs: Vec<_> = bounded.iter().map(|(_, addr)| *addr).collect();
        assert_eq!(plain_docs, bounded_docs);
    }

    /// Top-docs collection slowed down per hit, so a scan reliably outlives
    /// a small deadline without needing a huge index.
    struct SlowTopDocs {
        inner: TopDocs,
        delay: Duration,
    }

    struct SlowSegmentCollector {
        inner: <TopDocs as Collector>::Child,
        delay: Duration,
    }

    impl Collector for SlowTopDocs {
        type Fruit = <TopDocs as Collector>::Fruit;
        type Child = SlowSegmentCollector;

        fn for_segment(
            &self,
            segment_local_id: u32,
            segment: &SegmentReader,
        ) -> tantivy::Result<Self::Child> {
            Ok(SlowSegmentCollector {
                inner: self.inner.for_segment(segment_local_id, segment)?,
                delay: self.delay,
            })
        }

        fn requires_scoring(&self) -> bool {
            self.inner.requires_scoring()
        }

        fn merge_fruits(
            &self,
            segment_fruits: Vec<<Self::Child as SegmentCollector>::Fruit>,
        ) -> tantivy::Result<Self::Fruit> {
            self.inner.merge_fruits(segment_fruits)
        }
    }

    impl SegmentCollector for SlowSegmentCollector {
        type Fruit = <<TopDocs as Collector>::Child as SegmentCollector>::Fruit;

        fn collect(&mut self, doc: u32, score: tantivy::Score) {
            std::thread::sleep(self.delay);
            self.inner.collect(doc, score);
        }

        fn harvest(self) -> Self::Fruit {
            self.inner.harvest()
        }
    }

    #[test]
    fn test_mid_scan_expiry_fails_whole_search() {
        let (index, body) = sample_index(100);
        let reader = index.reader().unwrap();
        let searcher = reader.searcher();

        let query = QueryParser::for_index(&index, vec![body])
            .parse_query("common")
            .unwrap();

        // 100 candidates at 2ms each outlast a 20ms budget many times over,
        // so the deadline fires well into the scan, not on the first hit.
        let slow = SlowTopDocs {
            inner: TopDocs::with_limit(100),
            delay: Duration::from_millis(2),
        };
        let result = searcher.search(&query, &DeadlineCollector::new(slow, Duration::from_millis(20)));

        // The whole search fails; no truncated top-N escapes.
        match result {
            Err(TantivyError::SystemError(msg)) => assert_eq!(msg, DEADLINE_EXCEEDED_MSG),
            other => panic!("expected deadline expiry, got {other:?}"),
        }

        // The same slow scan with room to finish returns every hit.
        let slow = SlowTopDocs {
            inner: TopDocs::with_limit(100),
            delay: Duration::from_millis(2),
        };
        let hits = searcher
            .search(&query, &DeadlineCollector::new(slow, Duration::from_secs(60)))
            .unwrap();
        assert_eq!(hits.len(), 100);
    }

    #[test]
    fn test_no_candidates_cannot_time_out() {
        let (index, body) = sample_index(8);
        let reader = index.reader().unwrap();
        let searcher = reader.searcher();

        let query = QueryParser::for_index(&index, vec![body])
            .parse_query("absent")
            .unwrap();

        // Zero matching documents: the deadline check never runs.
        let hits = searcher
            .search(
                &query,
                &DeadlineCollector::new(TopDocs::with_limit(5), Duration::ZERO),
            )
            .unwrap();
        assert!(hits.is_empty());
    }
}
