//! Client-side proxy with the same capability set as the local facade.
//!
//! Connection state machine: disconnected until the first call; a
//! transport-level failure drops the cached channel so the next call
//! re-resolves and reconnects instead of failing permanently. Callers see
//! transport failures as [`SearchError::Transport`], distinct from query
//! execution failures (timeout, invalid argument, index error).

use std::time::Duration;
use tantivy::DocAddress;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;

use crate::error::{Result, SearchError};
use crate::grpc::proto;
use crate::grpc::proto::search_service_client::SearchServiceClient;
use crate::searcher::types::{IndexInfo, RankingConfig, SearchRequest, SearchResponse};

pub struct RemoteSearcher {
    endpoint: Endpoint,
    client: Mutex<Option<SearchServiceClient<Channel>>>,
}

impl RemoteSearcher {
    /// Proxy for the service at `host:port` with a default connect timeout.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_connect_timeout(host, port, Duration::from_secs(5))
    }

    /// Reconnect attempts are bounded by the same `connect_timeout` as the
    /// initial connection.
    pub fn with_connect_timeout(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{host}:{port}"))
            .map_err(|e| SearchError::Configuration(format!("invalid endpoint: {e}")))?
            .connect_timeout(connect_timeout);

        Ok(Self {
            endpoint,
            client: Mutex::new(None),
        })
    }

    /// Return the cached client, connecting first if necessary.
    async fn connected(&self) -> Result<SearchServiceClient<Channel>> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        tracing::debug!(endpoint = %self.endpoint.uri(), "connecting to search service");
        let channel = self
            .endpoint
            .connect()
            .await
            .map_err(|e| SearchError::Transport(format!("connect failed: {e}")))?;
        let client = SearchServiceClient::new(channel);
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Map a call failure, dropping the cached channel on transport errors
    /// so the next call reconnects.
    async fn fail(&self, status: Status) -> SearchError {
        let err = SearchError::from_status(&status);
        if err.is_transport() {
            tracing::warn!(message = %status.message(), "transport failure; will reconnect on next call");
            self.client.lock().await.take();
        }
        err
    }

    /// Drop the connection. The proxy can still be used afterwards; the
    /// next call simply reconnects.
    pub async fn disconnect(&self) {
        self.client.lock().await.take();
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let mut client = self.connected().await?;
        match client.search(proto::SearchRequest::from(request)).await {
            Ok(response) => Ok(response.into_inner().into()),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn doc_freq(&self, field: &str, value: &str) -> Result<u64> {
        let mut client = self.connected().await?;
        let request = proto::DocFreqRequest {
            term: Some(proto::Term {
                field: field.to_string(),
                value: value.to_string(),
            }),
        };
        match client.doc_freq(request).await {
            Ok(response) => Ok(response.into_inner().doc_freq),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn doc_freqs(&self, terms: &[(String, String)]) -> Result<Vec<u64>> {
        let mut client = self.connected().await?;
        let request = proto::DocFreqsRequest {
            terms: terms
                .iter()
                .map(|(field, value)| proto::Term {
                    field: field.clone(),
                    value: value.clone(),
                })
                .collect(),
        };
        match client.doc_freqs(request).await {
            Ok(response) => Ok(response.into_inner().doc_freqs),
            Err(status) => Err(self.fail(status).await),
        }
    }

    /// Fetch a stored document as a JSON object, optionally restricted to
    /// the named fields.
    pub async fn fetch_doc(
        &self,
        address: DocAddress,
        fields: &[String],
    ) -> Result<serde_json::Value> {
        let mut client = self.connected().await?;
        let request = proto::FetchDocRequest {
            segment_ord: address.segment_ord,
            doc_id: address.doc_id,
            fields: fields.to_vec(),
        };
        match client.fetch_doc(request).await {
            Ok(response) => Ok(serde_json::from_str(&response.into_inner().doc_json)?),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn explain(&self, query: &str, address: DocAddress) -> Result<serde_json::Value> {
        let mut client = self.connected().await?;
        let request = proto::ExplainRequest {
            query: query.to_string(),
            segment_ord: address.segment_ord,
            doc_id: address.doc_id,
        };
        match client.explain(request).await {
            Ok(response) => Ok(serde_json::from_str(
                &response.into_inner().explanation_json,
            )?),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn ranking(&self) -> Result<RankingConfig> {
        let mut client = self.connected().await?;
        match client.get_ranking(proto::GetRankingRequest {}).await {
            Ok(response) => Ok(response.into_inner().into()),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn set_ranking(&self, ranking: RankingConfig) -> Result<RankingConfig> {
        let mut client = self.connected().await?;
        match client.set_ranking(proto::RankingConfig::from(ranking)).await {
            Ok(response) => Ok(response.into_inner().into()),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn info(&self) -> Result<IndexInfo> {
        let mut client = self.connected().await?;
        match client.info(proto::InfoRequest {}).await {
            Ok(response) => Ok(response.into_inner().into()),
            Err(status) => Err(self.fail(status).await),
        }
    }

    pub async fn refresh(&self) -> Result<bool> {
        let mut client = self.connected().await?;
        match client.refresh(proto::RefreshRequest {}).await {
            Ok(response) => Ok(response.into_inner().swapped),
            Err(status) => Err(self.fail(status).await),
        }
    }
}
