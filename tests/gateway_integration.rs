//! Filter pipeline gateway over an in-process shard fleet

mod common;

use common::{dist, init_test_env, vector, Fleet, MetaConnector, MockConnector, Node};
use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::Code;

use vectorgate::core::config::{FailurePolicy, GatewayConfig, MetaConfig};
use vectorgate::core::error::GatewayError;
use vectorgate::gateway::{Gateway, MetaBackend, ShardBackend, StreamResponse};
use vectorgate::meta::{KvStore, MetaBridge};
use vectorgate::net::ConnectionPool;
use vectorgate::proto::payload::{
    FilterConfig, FilterTarget, GetObjectRequest, ObjectBlob, ObjectId, RemoveRequest,
    SearchConfig, SearchIdRequest, SearchObjectRequest, SearchRequest, WriteConfig,
    WriteObjectRequest, WriteRequest,
};

struct Harness {
    gateway: Gateway<MockConnector>,
    fleet: Arc<Fleet>,
}

async fn harness(shards: Vec<(&str, Node)>, filters: Vec<(&str, Node)>, config: GatewayConfig) -> Harness {
    init_test_env();
    let connector = MockConnector::default();
    let fleet = connector.fleet.clone();
    let agents = ConnectionPool::new(connector.clone());
    let filter_pool = ConnectionPool::new(connector);

    for (addr, node) in shards {
        fleet.add(addr, node);
        agents.connect(addr).await.unwrap();
    }
    for (addr, node) in filters {
        fleet.add(addr, node);
        filter_pool.connect(addr).await.unwrap();
    }

    let backend = Arc::new(ShardBackend::new(agents, &config));
    Harness {
        gateway: Gateway::new(backend, filter_pool, &config),
        fleet,
    }
}

/// Gateway whose backend translates caller ids through an in-memory meta store
async fn meta_harness(shards: Vec<(&str, Node)>) -> (Harness, MetaConnector) {
    let config = GatewayConfig::default();
    let plain = harness(shards, vec![], config.clone()).await;
    let meta = MetaConnector::default();
    let bridge = MetaBridge::new(
        ConnectionPool::new(meta.clone()),
        &MetaConfig {
            addr: Some("meta:8081".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let backend = MetaBackend::wrap(plain.gateway.backend().clone(), Some(bridge));
    let gateway = Gateway::new(backend, plain.gateway.filter_pool().clone(), &config);
    (
        Harness {
            gateway,
            fleet: plain.fleet,
        },
        meta,
    )
}

fn search_req(values: &[f32], num: u32) -> SearchRequest {
    SearchRequest {
        vector: values.to_vec(),
        config: Some(SearchConfig {
            num,
            ..Default::default()
        }),
    }
}

fn write_req(id: &str, values: &[f32], skip: bool) -> WriteRequest {
    WriteRequest {
        vector: Some(vector(id, values)),
        config: Some(WriteConfig {
            skip_strict_exist_check: skip,
            ..Default::default()
        }),
    }
}

fn remove_req(id: &str) -> RemoveRequest {
    RemoveRequest {
        id: Some(ObjectId { id: id.to_string() }),
        config: None,
    }
}

fn ids(results: &[vectorgate::proto::payload::ObjectDistance]) -> Vec<&str> {
    results.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn test_search_merges_shards_into_ranked_top_k() {
    let h = harness(
        vec![
            ("s1:8081", Node::with_results(vec![dist("a", 0.4), dist("b", 0.1), dist("c", 0.9)])),
            ("s2:8081", Node::with_results(vec![dist("b", 0.1), dist("d", 0.2), dist("e", 0.05)])),
            ("s3:8081", Node::with_results(vec![dist("f", 0.3)])),
        ],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let res = h
        .gateway
        .search(&CancellationToken::new(), search_req(&[0.1, 0.2], 3))
        .await
        .unwrap();

    assert_eq!(ids(&res.results), vec!["e", "b", "d"]);
    assert!(!res.request_id.is_empty());
    assert_eq!(h.fleet.total_calls("search"), 3);
}

#[tokio::test]
async fn test_linear_search_by_id_with_unlimited_num() {
    let h = harness(
        vec![
            ("s1:8081", Node::with_results(vec![dist("a", 0.3), dist("b", 0.5)])),
            ("s2:8081", Node::with_results(vec![dist("a", 0.3), dist("c", 0.1)])),
        ],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let res = h
        .gateway
        .linear_search_by_id(
            &CancellationToken::new(),
            SearchIdRequest {
                id: "q".into(),
                config: Some(SearchConfig {
                    request_id: "req-7".into(),
                    ..Default::default()
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(ids(&res.results), vec!["c", "a", "b"]);
    assert_eq!(res.request_id, "req-7");
    assert_eq!(h.fleet.total_calls("linear_search_by_id"), 2);
}

#[tokio::test]
async fn test_search_does_not_check_query_dimension() {
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.1)]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let res = h
        .gateway
        .search(&CancellationToken::new(), search_req(&[0.1], 10))
        .await
        .unwrap();

    assert_eq!(ids(&res.results), vec!["a"]);
    assert_eq!(h.fleet.total_calls("search"), 1);
}

#[tokio::test]
async fn test_search_by_empty_id_is_invalid() {
    let h = harness(vec![("s1:8081", Node::default())], vec![], GatewayConfig::default()).await;
    let err = h
        .gateway
        .search_by_id(&CancellationToken::new(), SearchIdRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_search_shard_failure_policies() {
    let shards = || {
        vec![
            ("s1:8081", Node::with_results(vec![dist("a", 0.1), dist("b", 0.2)])),
            ("s2:8081", Node::failing(Code::Unavailable)),
        ]
    };

    let h = harness(shards(), vec![], GatewayConfig::default()).await;
    let err = h
        .gateway
        .search(&CancellationToken::new(), search_req(&[0.1, 0.2], 10))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
    assert!(err.to_string().contains("s2:8081"));

    let mut config = GatewayConfig::default();
    config.search.failure_policy = FailurePolicy::BestEffort;
    let h = harness(shards(), vec![], config).await;
    let res = h
        .gateway
        .search(&CancellationToken::new(), search_req(&[0.1, 0.2], 10))
        .await
        .unwrap();
    assert_eq!(ids(&res.results), vec!["a", "b"]);
}

#[tokio::test]
async fn test_search_deadline() {
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.1)]).delayed(Duration::from_millis(500)))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let mut req = search_req(&[0.1, 0.2], 10);
    if let Some(config) = req.config.as_mut() {
        config.timeout_ms = 20;
    }
    let err = h.gateway.search(&CancellationToken::new(), req).await.unwrap_err();
    assert_eq!(err.code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn test_egress_filter_rewrites_every_result() {
    let mut config = GatewayConfig::default();
    config.filters.distance_filters = vec!["rerank:9000".into()];
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.25), dist("b", 0.5)]))],
        vec![("rerank:9000", Node::filter(1.0))],
        config,
    )
    .await;

    let res = h
        .gateway
        .search(&CancellationToken::new(), search_req(&[0.1, 0.2], 10))
        .await
        .unwrap();

    assert_eq!(ids(&res.results), vec!["a", "b"]);
    assert_eq!(res.results[0].distance, 1.25);
    assert_eq!(res.results[1].distance, 1.5);
    assert_eq!(h.fleet.calls("rerank:9000", "filter_distance"), 2);
}

#[tokio::test]
async fn test_egress_failure_fails_whole_response_as_internal() {
    let mut config = GatewayConfig::default();
    config.filters.distance_filters = vec!["rerank:9000".into()];
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.25), dist("b", 0.5)]))],
        vec![("rerank:9000", Node::failing(Code::Unavailable))],
        config,
    )
    .await;

    let err = h
        .gateway
        .search(&CancellationToken::new(), search_req(&[0.1, 0.2], 10))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Code::Internal);
    assert!(matches!(err.root(), GatewayError::Rpc { addr, .. } if addr == "rerank:9000"));
}

#[tokio::test]
async fn test_insert_existing_id_is_rejected_without_write() {
    let h = harness(
        vec![("s1:8081", Node::holding("x", vec![1.0, 2.0]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let err = h
        .gateway
        .insert(&CancellationToken::new(), write_req("x", &[3.0, 4.0], false))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Code::AlreadyExists);
    assert_eq!(h.fleet.total_calls("insert"), 0);
    assert_eq!(h.fleet.object("s1:8081", "x"), Some(vec![1.0, 2.0]));
}

#[tokio::test]
async fn test_insert_proceeds_when_a_shard_cannot_answer_the_existence_check() {
    let h = harness(
        vec![("s1:8081", Node::default()), ("s2:8081", Node::failing(Code::Unavailable))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let location = h
        .gateway
        .insert(&CancellationToken::new(), write_req("new-id", &[1.0, 2.0], false))
        .await
        .unwrap();

    assert_eq!(location.ips, vec!["s1:8081"]);
    assert_eq!(h.fleet.calls("s2:8081", "exists"), 1);
    assert_eq!(h.fleet.object("s1:8081", "new-id"), Some(vec![1.0, 2.0]));
}

#[tokio::test]
async fn test_upsert_proceeds_when_the_lookup_fails() {
    let h = harness(
        vec![("s1:8081", Node::default()), ("s2:8081", Node::failing(Code::Internal))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let location = h
        .gateway
        .upsert(&CancellationToken::new(), write_req("y", &[3.0, 4.0], false))
        .await
        .unwrap();

    assert_eq!(location.uuid, "y");
    assert_eq!(h.fleet.calls("s2:8081", "get_object"), 1);
    assert_eq!(h.fleet.object("s1:8081", "y"), Some(vec![3.0, 4.0]));
}

#[tokio::test]
async fn test_insert_with_skip_check_writes_directly() {
    let h = harness(vec![("s1:8081", Node::default())], vec![], GatewayConfig::default()).await;

    let location = h
        .gateway
        .insert(&CancellationToken::new(), write_req("x", &[3.0, 4.0], true))
        .await
        .unwrap();

    assert_eq!(location.uuid, "x");
    assert_eq!(location.ips, vec!["s1:8081"]);
    assert_eq!(h.fleet.total_calls("exists"), 0);
    assert_eq!(h.fleet.object("s1:8081", "x"), Some(vec![3.0, 4.0]));
}

#[tokio::test]
async fn test_insert_filters_run_in_order_and_keep_id() {
    let mut config = GatewayConfig::default();
    config.filters.insert_filters = vec!["f1:9000".into(), "f2:9000".into()];
    let mut dropping = Node::filter(1.0);
    dropping.drop_id = true;
    let h = harness(
        vec![("s1:8081", Node::default())],
        vec![("f1:9000", dropping), ("f2:9000", Node::filter(10.0)), ("f3:9000", Node::filter(100.0))],
        config,
    )
    .await;

    let mut req = write_req("x", &[0.0, 1.0], false);
    if let Some(config) = req.config.as_mut() {
        config.filters = Some(FilterConfig {
            targets: vec![FilterTarget {
                host: "f3".into(),
                port: 9000,
            }],
        });
    }
    h.gateway.insert(&CancellationToken::new(), req).await.unwrap();

    for addr in ["f1:9000", "f2:9000", "f3:9000"] {
        assert_eq!(h.fleet.calls(addr, "ingress_filter_vector"), 1);
    }
    assert_eq!(h.fleet.object("s1:8081", "x"), Some(vec![111.0, 112.0]));
}

#[tokio::test]
async fn test_update_with_identical_vector_is_duplicate() {
    let h = harness(
        vec![("s1:8081", Node::holding("x", vec![1.0, 2.0]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;
    let cancel = CancellationToken::new();

    let err = h
        .gateway
        .update(&cancel, write_req("x", &[1.0, 2.0], false))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);
    assert!(matches!(err.root(), GatewayError::DuplicateData(_)));
    assert_eq!(h.fleet.total_calls("update"), 0);

    h.gateway
        .update(&cancel, write_req("x", &[5.0, 6.0], false))
        .await
        .unwrap();
    assert_eq!(h.fleet.object("s1:8081", "x"), Some(vec![5.0, 6.0]));
}

#[tokio::test]
async fn test_upsert_of_missing_id_writes() {
    let h = harness(vec![("s1:8081", Node::default())], vec![], GatewayConfig::default()).await;
    h.gateway
        .upsert(&CancellationToken::new(), write_req("fresh", &[0.5, 0.5], false))
        .await
        .unwrap();
    assert_eq!(h.fleet.object("s1:8081", "fresh"), Some(vec![0.5, 0.5]));
}

#[tokio::test]
async fn test_replica_fan_out() {
    let mut config = GatewayConfig::default();
    config.replica = 2;
    let h = harness(
        vec![("s1:8081", Node::default()), ("s2:8081", Node::default()), ("s3:8081", Node::default())],
        vec![],
        config,
    )
    .await;

    let location = h
        .gateway
        .insert(&CancellationToken::new(), write_req("x", &[1.0, 1.0], true))
        .await
        .unwrap();

    assert_eq!(location.ips.len(), 2);
    for addr in &location.ips {
        assert_eq!(h.fleet.object(addr, "x"), Some(vec![1.0, 1.0]));
    }
}

#[tokio::test]
async fn test_remove() {
    let h = harness(
        vec![
            ("s1:8081", Node::holding("x", vec![1.0, 2.0])),
            ("s2:8081", Node::holding("x", vec![1.0, 2.0])),
            ("s3:8081", Node::default()),
        ],
        vec![],
        GatewayConfig::default(),
    )
    .await;
    let cancel = CancellationToken::new();

    let err = h.gateway.remove(&cancel, remove_req("missing")).await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(h.fleet.total_calls("remove"), 0);

    let location = h.gateway.remove(&cancel, remove_req("x")).await.unwrap();
    assert_eq!(location.ips, vec!["s1:8081", "s2:8081"]);
    assert!(h.fleet.object("s1:8081", "x").is_none());
    assert!(h.fleet.object("s2:8081", "x").is_none());

    let err = h.gateway.remove(&cancel, remove_req("")).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_get_object_runs_object_filters() {
    let mut config = GatewayConfig::default();
    config.filters.object_filters = vec!["mask:9000".into()];
    let h = harness(
        vec![("s1:8081", Node::default()), ("s2:8081", Node::holding("x", vec![1.0, 2.0]))],
        vec![("mask:9000", Node::filter(0.5))],
        config,
    )
    .await;
    let cancel = CancellationToken::new();

    let object = h
        .gateway
        .get_object(
            &cancel,
            GetObjectRequest {
                id: Some(ObjectId { id: "x".into() }),
                filters: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(object.id, "x");
    assert_eq!(object.vector, vec![1.5, 2.5]);
    assert_eq!(h.fleet.calls("mask:9000", "egress_filter_vector"), 1);

    let found = h.gateway.exists(&cancel, ObjectId { id: "x".into() }).await.unwrap();
    assert_eq!(found.id, "x");
    let err = h
        .gateway
        .exists(&cancel, ObjectId { id: "nope".into() })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}

#[tokio::test]
async fn test_search_object_uses_configured_vectorizer() {
    let mut config = GatewayConfig::default();
    config.filters.vectorizer = Some("vec:9000".into());
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.1)]))],
        vec![("vec:9000", Node::default())],
        config,
    )
    .await;

    let res = h
        .gateway
        .search_object(
            &CancellationToken::new(),
            SearchObjectRequest {
                object: vec![3, 4],
                config: None,
                vectorizer: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(ids(&res.results), vec!["a"]);
    assert_eq!(h.fleet.calls("vec:9000", "gen_vector"), 1);
}

#[tokio::test]
async fn test_object_writes_need_a_vectorizer() {
    let h = harness(vec![("s1:8081", Node::default())], vec![], GatewayConfig::default()).await;
    let cancel = CancellationToken::new();
    let req = WriteObjectRequest {
        object: Some(ObjectBlob {
            id: "doc".into(),
            object: vec![1, 2],
        }),
        config: None,
        vectorizer: None,
    };

    let err = h.gateway.insert_object(&cancel, req.clone()).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let mut with_target = req;
    with_target.vectorizer = Some(FilterTarget {
        host: "vec".into(),
        port: 0,
    });
    let err = h.gateway.upsert_object(&cancel, with_target).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn test_search_object_never_sends_objects_to_other_filters() {
    let mut config = GatewayConfig::default();
    config.filters.distance_filters = vec!["rerank:9100".into()];
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.1)]))],
        vec![("rerank:9100", Node::filter(0.0))],
        config,
    )
    .await;
    let cancel = CancellationToken::new();

    h.gateway.search(&cancel, search_req(&[0.1, 0.2], 1)).await.unwrap();
    assert_eq!(h.fleet.calls("rerank:9100", "filter_distance"), 1);

    let err = h
        .gateway
        .search_object(
            &cancel,
            SearchObjectRequest {
                object: vec![1, 2],
                config: None,
                vectorizer: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(h.fleet.total_calls("gen_vector"), 0);
}

#[tokio::test]
async fn test_insert_object_through_request_vectorizer() {
    let h = harness(
        vec![("s1:8081", Node::default())],
        vec![("vec:9000", Node::default())],
        GatewayConfig::default(),
    )
    .await;

    let location = h
        .gateway
        .insert_object(
            &CancellationToken::new(),
            WriteObjectRequest {
                object: Some(ObjectBlob {
                    id: "doc".into(),
                    object: vec![7, 8, 9],
                }),
                config: None,
                vectorizer: Some(FilterTarget {
                    host: "vec".into(),
                    port: 9000,
                }),
            },
        )
        .await
        .unwrap();

    assert_eq!(location.uuid, "doc");
    assert_eq!(h.fleet.object("s1:8081", "doc"), Some(vec![7.0, 8.0, 9.0]));
}

#[tokio::test]
async fn test_multi_insert_keeps_slots_and_joins_errors() {
    let h = harness(
        vec![("s1:8081", Node::holding("taken", vec![1.0, 1.0]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let batch = h
        .gateway
        .multi_insert(
            &CancellationToken::new(),
            vec![
                write_req("fresh", &[1.0, 2.0], false),
                write_req("taken", &[3.0, 4.0], false),
                write_req("short", &[1.0], false),
            ],
        )
        .await;

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.items[0].as_ref().map(|l| l.uuid.as_str()), Some("fresh"));
    assert!(batch.items[1].is_none() && batch.items[2].is_none());

    let err = batch.error.unwrap();
    let msg = err.to_string();
    assert!(msg.find("item 1").unwrap() < msg.find("item 2").unwrap());
    assert!(matches!(err, GatewayError::Joined(ref errors) if errors.len() == 2));
}

#[tokio::test]
async fn test_multi_search_all_succeed() {
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.1), dist("b", 0.2)]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let results = h
        .gateway
        .multi_search(
            &CancellationToken::new(),
            vec![search_req(&[0.1, 0.2], 1), search_req(&[0.3, 0.4], 2)],
        )
        .await
        .into_result()
        .unwrap();

    assert_eq!(ids(&results[0].results), vec!["a"]);
    assert_eq!(ids(&results[1].results), vec!["a", "b"]);
}

#[tokio::test]
async fn test_stream_search_reports_failures_inline() {
    let h = harness(
        vec![("s1:8081", Node::with_results(vec![dist("a", 0.1)]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let mut unknown_filter = search_req(&[0.3, 0.3], 1);
    if let Some(config) = unknown_filter.config.as_mut() {
        config.ingress_filters = Some(FilterConfig {
            targets: vec![FilterTarget {
                host: "gone".into(),
                port: 9999,
            }],
        });
    }
    let inbound = stream::iter(vec![
        Ok::<_, tonic::Status>(search_req(&[0.1, 0.2], 1)),
        Ok(unknown_filter),
        Ok(search_req(&[0.5, 0.5], 1)),
    ]);
    let replies: Vec<_> = h
        .gateway
        .stream_search(&CancellationToken::new(), inbound)
        .collect()
        .await;

    assert_eq!(replies.len(), 3);
    let mut responses = 0;
    let mut statuses = Vec::new();
    for reply in replies {
        match reply.unwrap() {
            StreamResponse::Response(res) => {
                assert_eq!(ids(&res.results), vec!["a"]);
                responses += 1;
            }
            StreamResponse::Status(status) => statuses.push(status.code),
        }
    }
    assert_eq!(responses, 2);
    assert_eq!(statuses, vec![Code::Internal]);
}

#[tokio::test]
async fn test_stream_get_object() {
    let h = harness(
        vec![("s1:8081", Node::holding("x", vec![1.0, 2.0]))],
        vec![],
        GatewayConfig::default(),
    )
    .await;

    let inbound = stream::iter(vec![
        Ok::<_, tonic::Status>(GetObjectRequest {
            id: Some(ObjectId { id: "x".into() }),
            filters: None,
        }),
        Ok(GetObjectRequest {
            id: Some(ObjectId { id: "y".into() }),
            filters: None,
        }),
    ]);
    let mut found = Vec::new();
    let mut missing = 0;
    let mut replies = h.gateway.stream_get_object(&CancellationToken::new(), inbound);
    while let Some(reply) = replies.next().await {
        match reply.unwrap().into_result() {
            Ok(object) => found.push(object.id),
            Err(status) => {
                assert_eq!(status.code, Code::NotFound);
                missing += 1;
            }
        }
    }
    assert_eq!(found, vec!["x"]);
    assert_eq!(missing, 1);
}

#[tokio::test]
async fn test_backend_dials_configured_agents() {
    init_test_env();
    let connector = MockConnector::default();
    let fleet = connector.fleet.clone();
    fleet.add("s1:8081", Node::with_results(vec![dist("a", 0.1)]));
    fleet.add("s2:8081", Node::default());
    fleet.refuse("s2:8081");

    let mut config = GatewayConfig::default();
    config.pool.agent_addrs = vec!["s1:8081".into(), "s2:8081".into()];
    let shutdown = CancellationToken::new();
    let backend = ShardBackend::connect(ConnectionPool::new(connector.clone()), &config, shutdown.clone())
        .await
        .unwrap();
    assert_eq!(backend.pool().addrs().0, vec!["s1:8081"]);

    let gateway = Gateway::new(Arc::new(backend), ConnectionPool::new(connector.clone()), &config);
    let res = gateway
        .search(&CancellationToken::new(), search_req(&[0.1, 0.2], 1))
        .await
        .unwrap();
    assert_eq!(ids(&res.results), vec!["a"]);

    config.pool.agent_addrs = vec!["s2:8081".into()];
    let err = ShardBackend::connect(ConnectionPool::new(connector), &config, shutdown.clone())
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), Code::Unavailable);
    shutdown.cancel();
}

#[tokio::test]
async fn test_meta_backend_translates_ids_through_writes_and_reads() {
    let (h, meta) = meta_harness(vec![("s1:8081", Node::default())]).await;
    let store = meta.service.store().clone();
    let cancel = CancellationToken::new();

    let location = h
        .gateway
        .insert(&cancel, write_req("doc-1", &[1.0, 2.0], false))
        .await
        .unwrap();
    assert_eq!(location.name, "doc-1");
    assert_ne!(location.uuid, "doc-1");
    assert_eq!(store.get(&location.uuid).await.unwrap().as_deref(), Some("doc-1"));
    assert_eq!(h.fleet.object("s1:8081", &location.uuid), Some(vec![1.0, 2.0]));
    assert!(h.fleet.object("s1:8081", "doc-1").is_none());

    let err = h
        .gateway
        .insert(&cancel, write_req("doc-1", &[5.0, 6.0], true))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);
    assert_eq!(h.fleet.total_calls("insert"), 1);

    let object = h
        .gateway
        .get_object(
            &cancel,
            GetObjectRequest {
                id: Some(ObjectId { id: "doc-1".into() }),
                filters: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(object.id, "doc-1");
    assert_eq!(object.vector, vec![1.0, 2.0]);

    let removed = h.gateway.remove(&cancel, remove_req("doc-1")).await.unwrap();
    assert_eq!(removed.name, "doc-1");
    assert_eq!(removed.uuid, location.uuid);
    assert!(store.get(&location.uuid).await.unwrap().is_none());
    assert!(h.fleet.object("s1:8081", &location.uuid).is_none());

    let err = h
        .gateway
        .update(&cancel, write_req("ghost", &[1.0, 1.0], true))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(h.fleet.total_calls("update"), 0);
}

#[tokio::test]
async fn test_meta_backend_maps_search_results_to_caller_ids() {
    let (h, meta) = meta_harness(vec![(
        "s1:8081",
        Node::with_results(vec![dist("uuid-a", 0.1), dist("uuid-z", 0.2)]),
    )])
    .await;
    meta.service.store().set("uuid-a", "doc-a").await.unwrap();
    let cancel = CancellationToken::new();

    let res = h.gateway.search(&cancel, search_req(&[0.1, 0.2], 2)).await.unwrap();
    // unmapped uuids come back as they are
    assert_eq!(ids(&res.results), vec!["doc-a", "uuid-z"]);

    let res = h
        .gateway
        .search_by_id(
            &cancel,
            SearchIdRequest {
                id: "doc-a".into(),
                config: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(ids(&res.results), vec!["doc-a", "uuid-z"]);

    let err = h
        .gateway
        .search_by_id(
            &cancel,
            SearchIdRequest {
                id: "doc-unknown".into(),
                config: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
    assert_eq!(h.fleet.total_calls("search_by_id"), 1);
}
