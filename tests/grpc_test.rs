//! End-to-end tests for the remote gateway: gRPC service in front of the
//! concurrent searcher, reconnecting client proxy in front of the service.

use searchgate::grpc::proto::search_service_server::SearchServiceServer;
use searchgate::grpc::{RemoteSearcher, SearchServiceImpl};
use searchgate::searcher::{ConcurrentSearcher, RankingConfig, SearchRequest};
use searchgate::SearchError;
use std::sync::Arc;
use std::time::Duration;
use tantivy::schema::{Schema, FAST, INDEXED, STORED, TEXT};
use tantivy::{doc, Index, IndexWriter};
use tempfile::TempDir;

fn build_index(dir: &TempDir) -> (Index, IndexWriter) {
    let mut builder = Schema::builder();
    builder.add_text_field("title", TEXT | STORED);
    builder.add_text_field("body", TEXT | STORED);
    builder.add_u64_field("views", FAST | INDEXED | STORED);
    let index = Index::create_in_dir(dir.path(), builder.build()).unwrap();
    let writer: IndexWriter = index.writer(15_000_000).unwrap();
    (index, writer)
}

fn add_doc(index: &Index, writer: &mut IndexWriter, title_text: &str, views_count: u64) {
    let schema = index.schema();
    let title = schema.get_field("title").unwrap();
    let body = schema.get_field("body").unwrap();
    let views = schema.get_field("views").unwrap();
    writer
        .add_document(doc!(
            title => title_text,
            body => "diagnostic detail",
            views => views_count,
        ))
        .unwrap();
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Serve the searcher on a fresh port; returns the port and the server task.
fn spawn_server(searcher: Arc<ConcurrentSearcher>) -> (u16, tokio::task::JoinHandle<()>) {
    let port = free_port();
    let addr = format!("127.0.0.1:{port}").parse().unwrap();
    let handle = tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(SearchServiceServer::new(SearchServiceImpl::new(searcher)))
            .serve(addr)
            .await
            .unwrap();
    });
    (port, handle)
}

/// The server binds asynchronously; poll until the proxy gets through.
async fn await_ready(proxy: &RemoteSearcher) {
    for _ in 0..100 {
        if proxy.info().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("server did not become ready");
}

fn proxy(port: u16) -> RemoteSearcher {
    RemoteSearcher::with_connect_timeout("127.0.0.1", port, Duration::from_millis(500)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_call_without_server_is_transport_error() {
    let port = free_port();
    let remote = proxy(port);

    let err = remote.info().await.unwrap_err();
    assert!(err.is_transport());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_proxy_recovers_once_server_appears() {
    let dir = TempDir::new().unwrap();
    let (index, mut writer) = build_index(&dir);
    add_doc(&index, &mut writer, "disk failure", 7);
    writer.commit().unwrap();

    let ranking = RankingConfig::new(vec!["title".to_string(), "body".to_string()]);
    let searcher = Arc::new(ConcurrentSearcher::open(dir.path(), ranking).unwrap());

    let port = free_port();
    let remote = proxy(port);

    // Nothing listening yet: transport failure, not a search failure.
    assert!(remote.info().await.unwrap_err().is_transport());

    let addr = format!("127.0.0.1:{port}").parse().unwrap();
    let server_searcher = Arc::clone(&searcher);
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(SearchServiceServer::new(SearchServiceImpl::new(
                server_searcher,
            )))
            .serve(addr)
            .await
            .unwrap();
    });

    // The same proxy, untouched, works as soon as the server is up.
    await_ready(&remote).await;
    let info = remote.info().await.unwrap();
    assert_eq!(info.num_docs, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_search_and_fetch() {
    let dir = TempDir::new().unwrap();
    let (index, mut writer) = build_index(&dir);
    add_doc(&index, &mut writer, "disk failure", 7);
    add_doc(&index, &mut writer, "disk almost full", 3);
    writer.commit().unwrap();

    let ranking = RankingConfig::new(vec!["title".to_string(), "body".to_string()]);
    let searcher = Arc::new(ConcurrentSearcher::open(dir.path(), ranking).unwrap());
    let (port, _server) = spawn_server(searcher);
    let remote = proxy(port);
    await_ready(&remote).await;

    let response = remote.search(&SearchRequest::new("disk")).await.unwrap();
    assert_eq!(response.hits.len(), 2);

    let sorted = remote
        .search(&SearchRequest::new("disk").with_sort("views"))
        .await
        .unwrap();
    let keys: Vec<u64> = sorted.hits.iter().map(|h| h.sort_key.unwrap()).collect();
    assert_eq!(keys, vec![7, 3]);

    let doc = remote
        .fetch_doc(response.hits[0].address, &[])
        .await
        .unwrap();
    assert!(doc.get("title").is_some());

    let title_only = remote
        .fetch_doc(response.hits[0].address, &["title".to_string()])
        .await
        .unwrap();
    assert!(title_only.get("title").is_some());
    assert!(title_only.get("body").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_errors_keep_their_kind() {
    let dir = TempDir::new().unwrap();
    let (index, mut writer) = build_index(&dir);
    add_doc(&index, &mut writer, "disk failure", 7);
    writer.commit().unwrap();

    let ranking = RankingConfig::new(vec!["title".to_string(), "body".to_string()]);
    let searcher = Arc::new(ConcurrentSearcher::open(dir.path(), ranking).unwrap());
    let (port, _server) = spawn_server(searcher);
    let remote = proxy(port);
    await_ready(&remote).await;

    // Execution errors cross the wire as themselves, not as transport
    // failures.
    let err = remote
        .search(&SearchRequest::new("disk").with_limit(0))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidArgument(_)));

    let err = remote
        .search(&SearchRequest::new("disk").with_deadline(Duration::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Timeout(_)));

    let err = remote
        .fetch_doc(tantivy::DocAddress::new(9, 0), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::NotFound(_)));

    // The connection is still healthy after execution errors.
    assert_eq!(remote.info().await.unwrap().num_docs, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_doc_freq_ranking_and_refresh() {
    let dir = TempDir::new().unwrap();
    let (index, mut writer) = build_index(&dir);
    add_doc(&index, &mut writer, "disk failure", 7);
    writer.commit().unwrap();

    let ranking = RankingConfig::new(vec!["title".to_string(), "body".to_string()]);
    let searcher = Arc::new(ConcurrentSearcher::open(dir.path(), ranking).unwrap());
    let (port, _server) = spawn_server(searcher);
    let remote = proxy(port);
    await_ready(&remote).await;

    assert_eq!(remote.doc_freq("title", "disk").await.unwrap(), 1);
    assert_eq!(
        remote
            .doc_freqs(&[
                ("title".to_string(), "disk".to_string()),
                ("title".to_string(), "zebra".to_string()),
            ])
            .await
            .unwrap(),
        vec![1, 0]
    );

    let boosted = remote.ranking().await.unwrap().with_boost("title", 2.0);
    let applied = remote.set_ranking(boosted.clone()).await.unwrap();
    assert_eq!(applied, boosted);
    assert_eq!(remote.ranking().await.unwrap(), boosted);

    // External commit becomes visible through a remote refresh.
    add_doc(&index, &mut writer, "disk replaced", 1);
    writer.commit().unwrap();

    assert_eq!(remote.search(&SearchRequest::new("disk")).await.unwrap().hits.len(), 1);
    assert!(remote.refresh().await.unwrap());
    assert_eq!(remote.search(&SearchRequest::new("disk")).await.unwrap().hits.len(), 2);
    assert!(!remote.refresh().await.unwrap());

    // Ranking survived the refresh on the server side.
    assert_eq!(remote.ranking().await.unwrap(), boosted);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_explicit_disconnect_then_reconnect() {
    let dir = TempDir::new().unwrap();
    let (index, mut writer) = build_index(&dir);
    add_doc(&index, &mut writer, "disk failure", 7);
    writer.commit().unwrap();

    let ranking = RankingConfig::new(vec!["title".to_string(), "body".to_string()]);
    let searcher = Arc::new(ConcurrentSearcher::open(dir.path(), ranking).unwrap());
    let (port, _server) = spawn_server(searcher);
    let remote = proxy(port);
    await_ready(&remote).await;

    remote.disconnect().await;
    assert_eq!(remote.info().await.unwrap().num_docs, 1);
}
