//! Long-term memory feeding later turns.

use crate::helpers::{addr_of, expect_reply, face_with, peer};
use lilith::Collaborators;
use lilith::memory::SqliteMemory;

#[tokio::test]
async fn earlier_exchange_is_recalled_into_the_prompt() {
    let store = tempfile::tempdir().unwrap();
    let memory = SqliteMemory::open(store.path()).unwrap();
    let collaborators = Collaborators {
        memory: Box::new(memory),
        ..Collaborators::offline()
    };
    let mut face = face_with(|_| {}, collaborators).await;
    let mut core = face.script_core(|_| "What a lovely name.".to_owned());
    let mouth = peer().await;

    face.router
        .handle_datagram("my cat is named Pixel", addr_of(&mouth))
        .await;
    expect_reply(&mouth).await;

    face.router
        .handle_datagram("tell me about Pixel", addr_of(&mouth))
        .await;
    expect_reply(&mouth).await;

    let requests = core.drain();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].user, "my cat is named Pixel");

    let second = &requests[1].user;
    assert!(second.starts_with("### RECALLED MEMORIES ###\n"), "{second}");
    assert!(second.contains("- User: my cat is named Pixel\nSYNZ: What a lovely name."));
    assert!(second.ends_with("\n\ntell me about Pixel"));
}

#[tokio::test]
async fn internal_turns_are_not_remembered() {
    let store = tempfile::tempdir().unwrap();
    let collaborators = Collaborators {
        memory: Box::new(SqliteMemory::open(store.path()).unwrap()),
        ..Collaborators::offline()
    };
    let mut face = face_with(|_| {}, collaborators).await;
    let core_addr = face.core_addr;
    let _core = face.script_core(|_| "Got it, reviewing now.".to_owned());
    let body = peer().await;

    face.router
        .handle_datagram("unity connected", addr_of(&body))
        .await;
    expect_reply(&body).await;
    face.router
        .handle_datagram("[SYSTEM_EVENT: Code Watcher]: looks fine", core_addr)
        .await;
    expect_reply(&body).await;

    let reopened = SqliteMemory::open(store.path()).unwrap();
    assert!(reopened.is_empty().unwrap());
}
