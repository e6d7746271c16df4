//! Remote search gateway: gRPC surface of the concurrent searcher and the
//! reconnecting client proxy.

pub mod client;
pub mod conversions;
pub mod server;
pub mod service;

pub use client::RemoteSearcher;
pub use server::start_grpc_server;
pub use service::SearchServiceImpl;

// Include generated proto code
pub mod proto {
    tonic::include_proto!("searchgate");
}
