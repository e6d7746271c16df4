use std::sync::Arc;
use tonic::transport::Server;

use crate::config::Config;
use crate::grpc::proto::search_service_server::SearchServiceServer;
use crate::grpc::SearchServiceImpl;
use crate::searcher::ConcurrentSearcher;

/// Start the gRPC server in front of `searcher`.
pub async fn start_grpc_server(
    config: &Config,
    searcher: Arc<ConcurrentSearcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.grpc_port).parse()?;

    tracing::info!("Starting gRPC search service on {}", addr);

    let service = SearchServiceImpl::new(searcher);

    Server::builder()
        .add_service(SearchServiceServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
