//! Connection pool and aggregator behavior over the mock fleet

mod common;

use common::{dist, init_test_env, pool_with, MockConn, Node};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use vectorgate::client::AgentRpc;
use vectorgate::core::config::{FailurePolicy, SearchDefaults};
use vectorgate::core::error::GatewayError;
use vectorgate::proto::payload::{SearchConfig, SearchRequest};
use vectorgate::search::Aggregator;

fn shard_search(
    addr: String,
    conn: MockConn,
) -> impl std::future::Future<Output = vectorgate::Result<vectorgate::proto::payload::SearchResponse>> {
    async move {
        conn.search(SearchRequest::default())
            .await
            .map_err(|status| GatewayError::rpc(addr, status))
    }
}

#[tokio::test]
async fn test_concurrent_broadcasts_share_one_connection_per_address() {
    init_test_env();
    let (pool, fleet) = pool_with(vec![
        ("s1:8081", Node::default()),
        ("s2:8081", Node::default()),
    ])
    .await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            pool.broadcast(&CancellationToken::new(), |addr, conn: MockConn| async move {
                shard_search(addr, conn).await.map(|_| ())
            })
            .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(fleet.dials("s1:8081"), 1);
    assert_eq!(fleet.dials("s2:8081"), 1);
    assert_eq!(fleet.total_calls("search"), 32);
}

#[tokio::test]
async fn test_transport_failure_triggers_redial() {
    init_test_env();
    let (pool, fleet) = pool_with(vec![("s1:8081", Node::failing(Code::Unavailable))]).await;
    let cancel = CancellationToken::new();

    let err = pool
        .do_call(&cancel, "s1:8081", shard_search)
        .await
        .unwrap_err();
    assert!(err.is_transport_failure());

    fleet.add("s1:8081", Node::with_results(vec![dist("a", 0.1)]));
    let res = pool.do_call(&cancel, "s1:8081", shard_search).await.unwrap();
    assert_eq!(res.results.len(), 1);
    assert_eq!(fleet.dials("s1:8081"), 2);
}

#[tokio::test]
async fn test_aggregator_over_fleet() {
    init_test_env();
    let (pool, _fleet) = pool_with(vec![
        ("s1:8081", Node::with_results(vec![dist("a", 0.3), dist("b", 0.5), dist("c", 0.7)])),
        ("s2:8081", Node::with_results(vec![dist("a", 0.3), dist("d", 0.4), dist("e", 0.6)])),
        ("s3:8081", Node::failing(Code::Internal).delayed(Duration::from_millis(5))),
    ])
    .await;

    let aggregator = Aggregator::new(pool, &SearchDefaults::default()).with_policy(FailurePolicy::BestEffort);
    let config = SearchConfig {
        request_id: "agg-1".into(),
        num: 4,
        ..Default::default()
    };
    let aggregated = aggregator
        .search(&CancellationToken::new(), &config, shard_search)
        .await
        .unwrap();

    let ids: Vec<&str> = aggregated.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "d", "b", "e"]);
    assert_eq!(aggregated.shard_errors.len(), 1);
    assert_eq!(aggregated.shard_errors[0].addr, "s3:8081");
}
