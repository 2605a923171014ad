//! Face and Logic Core talking over loopback, with the model server mocked.

use crate::helpers::{addr_of, expect_reply, face, loopback, peer};
use lilith::logic_core::LogicCore;
use lilith::logic_core::backend::OpenAiBackend;
use lilith::{LilithConfig, Transport};
use serde_json::json;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    }))
}

async fn logic_core(config: &LilithConfig) -> LogicCore {
    let backend = OpenAiBackend::new(&config.core).expect("backend");
    let transport = Transport::bind(config.network.core_addr, Duration::from_millis(100))
        .await
        .expect("bind core");
    LogicCore::new(config, transport, Box::new(backend))
}

#[tokio::test]
async fn face_turn_is_answered_by_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": "llama3", "stream": false })))
        .respond_with(completion("  Nice to meet you.  "))
        .expect(1)
        .mount(&server)
        .await;

    let mut face = face(|_| {}).await;
    // Hand the Core's port over to a real Logic Core.
    drop(face.core.take());
    let mut config = face.config.clone();
    config.core.api_url = server.uri();
    let mut core = logic_core(&config).await;

    let cancel = CancellationToken::new();
    let core_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { core.run(cancel).await }
    });

    let mouth = peer().await;
    face.router
        .handle_datagram("hello, I'm Sam", addr_of(&mouth))
        .await;
    assert_eq!(expect_reply(&mouth).await, "Nice to meet you.");
    assert_eq!(face.router.history().len(), 2);

    cancel.cancel();
    core_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn model_failure_becomes_offline_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let mut face = face(|_| {}).await;
    drop(face.core.take());
    let mut config = face.config.clone();
    config.core.api_url = server.uri();
    let mut core = logic_core(&config).await;

    let cancel = CancellationToken::new();
    let core_task = tokio::spawn({
        let cancel = cancel.clone();
        async move { core.run(cancel).await }
    });

    let mouth = peer().await;
    face.router.handle_datagram("hello", addr_of(&mouth)).await;
    let answer = expect_reply(&mouth).await;
    assert!(answer.starts_with("My brain is offline. (<ERROR"), "{answer}");
    assert!(face.router.history().is_empty());

    cancel.cancel();
    core_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn bare_prompt_is_accepted_by_the_core() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{ "role": "user", "content": "2+2?" }]
        })))
        .respond_with(completion("4"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = LilithConfig::default();
    config.core.api_url = server.uri();
    config.network.core_addr = loopback();
    let core = logic_core(&config).await;

    let client = peer().await;
    core.answer("2+2?", addr_of(&client)).await;
    assert_eq!(expect_reply(&client).await, "4");
}

#[tokio::test]
async fn changed_source_is_reviewed_and_sent_to_the_face() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(completion("Missing semicolon on line 3."))
        .expect(1)
        .mount(&server)
        .await;

    let watched = tempfile::tempdir().unwrap();
    let source = watched.path().join("Player.cs");
    std::fs::write(&source, "class Player {}").unwrap();

    let face_peer = peer().await;
    let mut config = LilithConfig::default();
    config.core.api_url = server.uri();
    config.core.watch_dir = Some(watched.path().to_path_buf());
    config.network.core_addr = loopback();
    config.network.face_addr = addr_of(&face_peer);
    let mut core = logic_core(&config).await;

    let start = Instant::now();
    core.watch_tick(start).await;

    std::fs::write(&source, "class Player { int hp }").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&source)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
    core.watch_tick(start + Duration::from_secs(10)).await;

    assert_eq!(
        expect_reply(&face_peer).await,
        "[SYSTEM_EVENT: Code Watcher]: Missing semicolon on line 3."
    );
}
