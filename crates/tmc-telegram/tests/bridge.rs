//! Integration tests for `BridgeTransport` using wiremock HTTP mocks.

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tmc_core::{
    config::{default_terms, ClientProfile},
    domain::{ChannelHandle, ChannelId, Dialog, DialogKind, MessageEvent},
    errors::Error,
    export::ExportPaths,
    pipeline::{Pipeline, PipelineSettings, PipelineState},
    ports::{MessageFilter, SearchQuery, TransportPort},
};
use tmc_telegram::{BridgeSettings, BridgeTransport};

const SESSION: &str = "/v1/sessions/crawler";

fn test_transport(base_url: &str) -> BridgeTransport {
    BridgeTransport::new(BridgeSettings {
        base_url: base_url.to_string(),
        api_id: 12345,
        api_hash: "hash".to_string(),
        session_name: "crawler".to_string(),
        profile: ClientProfile::default(),
        request_timeout: Duration::from_secs(5),
    })
    .expect("transport construction should not fail")
}

fn message(id: i64, channel: i64, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "peer_id": {"channel_id": channel},
        "message": text,
        "views": 100,
        "forwards": 10,
        "replies": {"replies": 5},
        "date": "2023-01-01T12:00:00Z"
    })
}

fn search(term: &str, limit: usize) -> SearchQuery {
    SearchQuery {
        term: term.to_string(),
        limit,
        filter: MessageFilter::Empty,
    }
}

fn handle(id: i64) -> ChannelHandle {
    ChannelHandle {
        id: ChannelId(id),
        access_hash: Some(99),
        title: None,
    }
}

#[tokio::test]
async fn connect_sends_credentials_and_profile() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/connect")))
        .and(body_partial_json(json!({
            "api_id": 12345,
            "api_hash": "hash",
            "device_model": "Desktop",
            "system_version": "Windows 10",
            "app_version": "2.0",
            "lang_code": "en",
            "system_lang_code": "en-US"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"authorized": true, "user": "me"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    test_transport(&server.uri()).connect().await.expect("connect");
}

#[tokio::test]
async fn connect_rejects_unauthorized_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/connect")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authorized": false})))
        .mount(&server)
        .await;

    let err = test_transport(&server.uri()).connect().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}

#[tokio::test]
async fn dialogs_are_paged_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/dialogs")))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dialogs": [
                {"id": 1, "name": "a", "kind": "channel"},
                {"id": 2, "name": "b", "kind": "user"}
            ],
            "next_offset": 2
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/dialogs")))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dialogs": [{"id": 3, "name": "c", "kind": "group"}],
            "next_offset": null
        })))
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let dialogs: Vec<Dialog> = transport.stream_dialogs().try_collect().await.unwrap();

    let kinds: Vec<(i64, DialogKind)> = dialogs.iter().map(|d| (d.id, d.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (1, DialogKind::Channel),
            (2, DialogKind::User),
            (3, DialogKind::Group)
        ]
    );
}

#[tokio::test]
async fn messages_follow_offset_and_stop_at_limit() {
    let server = MockServer::start().await;
    let messages_path = format!("{SESSION}/channels/7/messages");

    Mock::given(method("GET"))
        .and(path(messages_path.clone()))
        .and(query_param("q", "мгу"))
        .and(query_param("filter", "empty"))
        .and(query_param("access_hash", "99"))
        .and(query_param_is_missing("offset_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [message(30, 7, "мгу 1"), message(29, 7, "мгу 2")],
            "next_offset_id": 29
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(messages_path))
        .and(query_param("offset_id", "29"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [message(12, 7, "мгу 3"), message(11, 7, "мгу 4")],
            "next_offset_id": 11
        })))
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let got: Vec<MessageEvent> = transport
        .stream_messages(handle(7), search("мгу", 3))
        .try_collect()
        .await
        .unwrap();

    let texts: Vec<&str> = got.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, vec!["мгу 1", "мгу 2", "мгу 3"]);
    assert_eq!(got[0].channel_id, Some(ChannelId(7)));
}

#[tokio::test]
async fn bridge_error_status_surfaces_as_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/channels/7/full")))
        .respond_with(ResponseTemplate::new(400).set_body_string("CHANNEL_PRIVATE"))
        .mount(&server)
        .await;

    let err = test_transport(&server.uri())
        .fetch_full_channel(&handle(7))
        .await
        .unwrap_err();
    match err {
        Error::Transport(msg) => assert!(msg.contains("CHANNEL_PRIVATE")),
        other => panic!("unexpected error: {other}"),
    }
}

async fn mount_discovery(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("{SESSION}/connect")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authorized": true})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/dialogs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dialogs": [
                {"id": 1, "name": "big", "kind": "channel"},
                {"id": 2, "name": "private", "kind": "channel"},
                {"id": 3, "name": "small", "kind": "channel"}
            ]
        })))
        .mount(server)
        .await;
    for id in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("{SESSION}/entities/{id}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": id, "access_hash": 99})),
            )
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/channels/1/full")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"participants_count": 1000})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/channels/2/full")))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/channels/3/full")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"participants_count": 100})))
        .mount(server)
        .await;
}

fn scratch_paths(name: &str) -> (std::path::PathBuf, ExportPaths) {
    let dir = std::env::temp_dir().join(format!("tmc-bridge-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let paths = ExportPaths::in_dir(&dir);
    (dir, paths)
}

#[tokio::test]
async fn pipeline_over_bridge_counts_every_alias() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    // Every search in the one eligible channel returns the same message.
    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/channels/1/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [message(1, 1, "Тестовое сообщение с упоминанием СПбГУ")]
        })))
        .expect(8)
        .mount(&server)
        .await;

    let (dir, paths) = scratch_paths("run");
    let mut pipeline = Pipeline::new(
        Arc::new(test_transport(&server.uri())),
        PipelineSettings {
            entities: default_terms(),
            limit: 10,
            participant_threshold: 100,
        },
    );
    let summary = pipeline.run(&paths).await.unwrap();
    let raw = std::fs::read_to_string(&paths.raw_messages).unwrap();
    let _ = std::fs::remove_dir_all(&dir);

    assert_eq!(summary.channels, 1);
    let stats = pipeline.stats();
    assert_eq!(stats.total_posts, 8);
    assert_eq!(stats.unique_channel_count(), 1);
    assert_eq!(stats.total_views, 800);
    assert_eq!(stats.total_forwards, 80);
    assert_eq!(stats.total_replies, 40);
    assert_eq!(stats.mentions_of("спбгу"), 5);
    assert_eq!(stats.mentions_of("мгу"), 3);
    assert_eq!(raw.lines().count(), 9);
}

#[tokio::test]
async fn pipeline_aborts_on_stream_failure() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{SESSION}/channels/1/messages")))
        .respond_with(ResponseTemplate::new(420).set_body_string("FLOOD_WAIT_60"))
        .mount(&server)
        .await;

    let (dir, paths) = scratch_paths("abort");
    let mut pipeline = Pipeline::new(
        Arc::new(test_transport(&server.uri())),
        PipelineSettings {
            entities: default_terms(),
            limit: 10,
            participant_threshold: 100,
        },
    );
    let err = pipeline.run(&paths).await.unwrap_err();
    let exported = paths.stats.exists();
    let _ = std::fs::remove_dir_all(&dir);

    match err {
        Error::Stream { term, channel, reason } => {
            assert_eq!(term, "spbgu");
            assert_eq!(channel, ChannelId(1));
            assert!(reason.contains("FLOOD_WAIT_60"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(pipeline.state(), PipelineState::Crawling);
    assert!(!exported);
}
