//! Conversions between proto messages and domain types.

use std::time::Duration;
use tantivy::DocAddress;

use crate::grpc::proto;
use crate::searcher::types::{Hit, IndexInfo, RankingConfig, SearchRequest, SearchResponse};

impl From<proto::SearchRequest> for SearchRequest {
    fn from(req: proto::SearchRequest) -> Self {
        SearchRequest {
            query: req.query,
            filter: req.filter,
            sort_by: req.sort_by,
            limit: req.limit as usize,
            deadline: req.deadline_ms.map(Duration::from_millis),
        }
    }
}

impl From<&SearchRequest> for proto::SearchRequest {
    fn from(req: &SearchRequest) -> Self {
        proto::SearchRequest {
            query: req.query.clone(),
            filter: req.filter.clone(),
            sort_by: req.sort_by.clone(),
            limit: req.limit as u64,
            deadline_ms: req.deadline.map(|d| d.as_millis() as u64),
        }
    }
}

impl From<Hit> for proto::Hit {
    fn from(hit: Hit) -> Self {
        proto::Hit {
            score: hit.score,
            sort_key: hit.sort_key,
            segment_ord: hit.address.segment_ord,
            doc_id: hit.address.doc_id,
        }
    }
}

impl From<proto::Hit> for Hit {
    fn from(hit: proto::Hit) -> Self {
        Hit {
            score: hit.score,
            sort_key: hit.sort_key,
            address: DocAddress::new(hit.segment_ord, hit.doc_id),
        }
    }
}

impl From<SearchResponse> for proto::SearchResponse {
    fn from(resp: SearchResponse) -> Self {
        proto::SearchResponse {
            hits: resp.hits.into_iter().map(Into::into).collect(),
            elapsed_ms: resp.elapsed_ms,
        }
    }
}

impl From<proto::SearchResponse> for SearchResponse {
    fn from(resp: proto::SearchResponse) -> Self {
        SearchResponse {
            hits: resp.hits.into_iter().map(Into::into).collect(),
            elapsed_ms: resp.elapsed_ms,
        }
    }
}

impl From<RankingConfig> for proto::RankingConfig {
    fn from(ranking: RankingConfig) -> Self {
        proto::RankingConfig {
            default_fields: ranking.default_fields,
            field_boosts: ranking.field_boosts.into_iter().collect(),
        }
    }
}

impl From<proto::RankingConfig> for RankingConfig {
    fn from(ranking: proto::RankingConfig) -> Self {
        RankingConfig {
            default_fields: ranking.default_fields,
            field_boosts: ranking.field_boosts.into_iter().collect(),
        }
    }
}

impl From<IndexInfo> for proto::IndexInfo {
    fn from(info: IndexInfo) -> Self {
        proto::IndexInfo {
            num_docs: info.num_docs,
            num_segments: info.num_segments,
            opstamp: info.opstamp,
        }
    }
}

impl From<proto::IndexInfo> for IndexInfo {
    fn from(info: proto::IndexInfo) -> Self {
        IndexInfo {
            num_docs: info.num_docs,
            num_segments: info.num_segments,
            opstamp: info.opstamp,
        }
    }
}
