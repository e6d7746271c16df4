use std::sync::Arc;
use tantivy::DocAddress;
use tonic::{Request, Response, Status};

use crate::error::SearchError;
use crate::grpc::proto;
use crate::searcher::ConcurrentSearcher;
use crate::searcher::SearchRequest;

/// gRPC face of the concurrent searcher. Stateless beyond the shared
/// facade, which is already thread-safe, so concurrent invocations simply
/// delegate.
pub struct SearchServiceImpl {
    searcher: Arc<ConcurrentSearcher>,
}

impl SearchServiceImpl {
    pub fn new(searcher: Arc<ConcurrentSearcher>) -> Self {
        Self { searcher }
    }

    /// Run a blocking facade operation off the async worker threads.
    async fn run<T, F>(&self, op: F) -> Result<T, Status>
    where
        T: Send + 'static,
        F: FnOnce(&ConcurrentSearcher) -> Result<T, SearchError> + Send + 'static,
    {
        let searcher = Arc::clone(&self.searcher);
        tokio::task::spawn_blocking(move || op(&searcher))
            .await
            .map_err(|e| Status::internal(format!("search task failed: {e}")))?
            .map_err(Status::from)
    }
}

#[tonic::async_trait]
impl proto::search_service_server::SearchService for SearchServiceImpl {
    async fn search(
        &self,
        request: Request<proto::SearchRequest>,
    ) -> Result<Response<proto::SearchResponse>, Status> {
        let req: SearchRequest = request.into_inner().into();

        tracing::debug!(query = %req.query, limit = req.limit, "grpc: search");

        let response = self.run(move |s| s.search(&req)).await?;
        Ok(Response::new(response.into()))
    }

    async fn doc_freq(
        &self,
        request: Request<proto::DocFreqRequest>,
    ) -> Result<Response<proto::DocFreqReply>, Status> {
        let term = request
            .into_inner()
            .term
            .ok_or_else(|| Status::invalid_argument("missing term"))?;

        let doc_freq = self
            .run(move |s| {
                let term = s.term(&term.field, &term.value)?;
                s.doc_freq(&term)
            })
            .await?;
        Ok(Response::new(proto::DocFreqReply { doc_freq }))
    }

    async fn doc_freqs(
        &self,
        request: Request<proto::DocFreqsRequest>,
    ) -> Result<Response<proto::DocFreqsReply>, Status> {
        let terms = request.into_inner().terms;

        let doc_freqs = self
            .run(move |s| {
                let terms = terms
                    .iter()
                    .map(|t| s.term(&t.field, &t.value))
                    .collect::<Result<Vec<_>, _>>()?;
                s.doc_freqs(&terms)
            })
            .await?;
        Ok(Response::new(proto::DocFreqsReply { doc_freqs }))
    }

    async fn fetch_doc(
        &self,
        request: Request<proto::FetchDocRequest>,
    ) -> Result<Response<proto::FetchDocReply>, Status> {
        let req = request.into_inner();
        let address = DocAddress::new(req.segment_ord, req.doc_id);

        tracing::debug!(segment_ord = req.segment_ord, doc_id = req.doc_id, "grpc: fetch doc");

        let doc_json = self
            .run(move |s| {
                let named = s.doc_fields(address, &req.fields)?;
                Ok(serde_json::to_string(&named)?)
            })
            .await?;
        Ok(Response::new(proto::FetchDocReply { doc_json }))
    }

    async fn explain(
        &self,
        request: Request<proto::ExplainRequest>,
    ) -> Result<Response<proto::ExplainReply>, Status> {
        let req = request.into_inner();
        let address = DocAddress::new(req.segment_ord, req.doc_id);

        let explanation_json = self
            .run(move |s| Ok(s.explain(&req.query, address)?.to_pretty_json()))
            .await?;
        Ok(Response::new(proto::ExplainReply { explanation_json }))
    }

    async fn get_ranking(
        &self,
        _request: Request<proto::GetRankingRequest>,
    ) -> Result<Response<proto::RankingConfig>, Status> {
        let ranking = self.run(|s| Ok(s.ranking())).await?;
        Ok(Response::new(ranking.into()))
    }

    async fn set_ranking(
        &self,
        request: Request<proto::RankingConfig>,
    ) -> Result<Response<proto::RankingConfig>, Status> {
        let ranking: crate::searcher::RankingConfig = request.into_inner().into();

        tracing::info!(fields = ?ranking.default_fields, "grpc: set ranking");

        let applied = self
            .run(move |s| {
                s.set_ranking(ranking);
                Ok(s.ranking())
            })
            .await?;
        Ok(Response::new(applied.into()))
    }

    async fn info(
        &self,
        _request: Request<proto::InfoRequest>,
    ) -> Result<Response<proto::IndexInfo>, Status> {
        let info = self.run(|s| Ok(s.info())).await?;
        Ok(Response::new(info.into()))
    }

    async fn refresh(
        &self,
        _request: Request<proto::RefreshRequest>,
    ) -> Result<Response<proto::RefreshReply>, Status> {
        tracing::debug!("grpc: refresh");
        let swapped = self.run(|s| s.refresh()).await?;
        Ok(Response::new(proto::RefreshReply { swapped }))
    }
}
