//! Face router behavior over loopback UDP with a scripted Core.

use crate::helpers::{FakeTts, addr_of, expect_reply, expect_silence, face, face_with, peer};
use lilith::Collaborators;
use lilith::protocol::{ACK, AUDIO_PREFIX};
use lilith::router::feedback::{DISCARDED, NOTHING_TO_REINFORCE, REINFORCED};
use lilith::router::reply::ECHO_FILLER;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn chat_turn_round_trips_through_the_core() {
    let mut face = face(|_| {}).await;
    let mut core = face.script_core(|_| "Hello there, human.".to_owned());
    let mouth = peer().await;

    face.router.handle_datagram("hi", addr_of(&mouth)).await;

    assert_eq!(expect_reply(&mouth).await, "Hello there, human.");
    let requests = core.drain();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user, "hi");
    assert!(requests[0].system.contains("SYNZ"));
    assert_eq!(face.router.history().len(), 2);
    assert!(face.router.feedback().is_complete());
}

#[tokio::test]
async fn echoed_reply_is_replaced() {
    let mut face = face(|_| {}).await;
    let _core = face.script_core(|request| format!("  {}  ", request.user.to_uppercase()));
    let mouth = peer().await;

    face.router
        .handle_datagram("What time is it", addr_of(&mouth))
        .await;

    assert_eq!(expect_reply(&mouth).await, ECHO_FILLER);
}

#[tokio::test]
async fn body_announcement_is_acknowledged_in_any_casing() {
    let mut face = face(|_| {}).await;
    let mut core = face.script_core(|_| "unused".to_owned());
    let body = peer().await;

    face.router
        .handle_datagram("hello, UNITY CONNECTED!", addr_of(&body))
        .await;

    assert_eq!(expect_reply(&body).await, ACK);
    assert_eq!(face.router.body_addr(), Some(addr_of(&body)));
    assert!(core.drain().is_empty());
    assert!(face.router.history().is_empty());
}

#[tokio::test]
async fn history_keeps_only_the_newest_exchanges() {
    let mut face = face(|config| config.router.history_exchanges = 2).await;
    let mut core = face.script_core(|request| format!("reply to {}", request.user));
    let mouth = peer().await;

    for text in ["one", "two", "three"] {
        face.router.handle_datagram(text, addr_of(&mouth)).await;
        expect_reply(&mouth).await;
    }

    let turns: Vec<_> = face.router.history().iter().map(|t| t.text.clone()).collect();
    assert_eq!(turns, ["two", "reply to two", "three", "reply to three"]);

    // The last request carried the two exchanges before it.
    let last = core.drain().pop().unwrap();
    assert_eq!(last.user, "three");
    assert_eq!(last.history.len(), 4);
    assert_eq!(last.history[0].content, "one");
}

#[tokio::test]
async fn good_persists_the_last_exchange_once() {
    let mut face = face(|_| {}).await;
    let _core = face.script_core(|_| "Seven, obviously.".to_owned());
    let mouth = peer().await;
    let log = face.config.feedback.training_log.clone();

    face.router.handle_datagram("!good", addr_of(&mouth)).await;
    assert_eq!(expect_reply(&mouth).await, NOTHING_TO_REINFORCE);
    assert!(!log.exists());

    face.router
        .handle_datagram("pick a number", addr_of(&mouth))
        .await;
    expect_reply(&mouth).await;

    face.router.handle_datagram("!good", addr_of(&mouth)).await;
    assert_eq!(expect_reply(&mouth).await, REINFORCED);
    assert_eq!(
        std::fs::read_to_string(&log).unwrap(),
        "\nUser: pick a number\nSYNZ: Seven, obviously.\n"
    );

    face.router.handle_datagram("!good", addr_of(&mouth)).await;
    assert_eq!(expect_reply(&mouth).await, NOTHING_TO_REINFORCE);
    assert_eq!(
        std::fs::read_to_string(&log).unwrap(),
        "\nUser: pick a number\nSYNZ: Seven, obviously.\n"
    );
}

#[tokio::test]
async fn write_then_read_inside_the_sandbox() {
    let mut face = face(|_| {}).await;
    let mut core = face.script_core(|_| "unused".to_owned());
    let mouth = peer().await;

    face.router
        .handle_datagram("!write notes.txt|remember the milk", addr_of(&mouth))
        .await;
    let status = expect_reply(&mouth).await;
    assert!(status.starts_with("[SUCCESS] Wrote 17 bytes to notes.txt."), "{status}");

    face.router
        .handle_datagram("!read notes.txt", addr_of(&mouth))
        .await;
    assert_eq!(expect_reply(&mouth).await, "remember the milk");

    face.router
        .handle_datagram("!write notes.txt|v2", addr_of(&mouth))
        .await;
    let status = expect_reply(&mouth).await;
    assert!(status.contains("Backup saved to"), "{status}");

    assert!(core.drain().is_empty());
    assert!(face.router.history().is_empty());
}

#[tokio::test]
async fn paths_outside_the_sandbox_are_refused() {
    let mut face = face(|_| {}).await;
    let _core = face.script_core(|_| "unused".to_owned());
    let mouth = peer().await;
    let outside = face.dir.path().join("outside.txt");
    std::fs::write(&outside, "secret").unwrap();

    face.router
        .handle_datagram("!read ../outside.txt", addr_of(&mouth))
        .await;
    let answer = expect_reply(&mouth).await;
    assert!(answer.starts_with("[ERR] Access Denied"), "{answer}");

    face.router
        .handle_datagram("!write ../outside.txt|pwned", addr_of(&mouth))
        .await;
    let answer = expect_reply(&mouth).await;
    assert!(answer.starts_with("[ERR] Access Denied"), "{answer}");
    assert_eq!(std::fs::read_to_string(&outside).unwrap(), "secret");
}

#[tokio::test]
async fn malformed_write_gets_usage() {
    let mut face = face(|_| {}).await;
    let mouth = peer().await;

    face.router
        .handle_datagram("!write notes.txt", addr_of(&mouth))
        .await;
    assert_eq!(
        expect_reply(&mouth).await,
        "[ERR] Usage: !write filename|content"
    );
}

#[tokio::test]
async fn silent_core_falls_back_and_restores_the_heartbeat() {
    let mut face = face(|config| {
        config.router.core_timeout_secs = 1;
        config.router.heartbeat_ms = 200;
    })
    .await;
    let mouth = peer().await;
    let heartbeat = face.router.transport().heartbeat();

    let started = Instant::now();
    face.router
        .handle_datagram("are you there?", addr_of(&mouth))
        .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(
        expect_reply(&mouth).await,
        "My brain is offline. (<ERROR: Logic Brain Timed Out>)"
    );
    assert_eq!(face.router.transport().read_timeout(), heartbeat);

    // The next ordinary receive waits one heartbeat, not the Core timeout.
    let waited = Instant::now();
    let next = face.router.transport().recv().await.unwrap();
    assert!(next.is_none());
    assert!(waited.elapsed() < heartbeat + Duration::from_millis(400));
    // Offline answers are not remembered.
    assert!(face.router.history().is_empty());
    assert!(!face.router.feedback().is_complete());
}

#[tokio::test]
async fn agency_fires_once_after_silence() {
    let mut face = face(|config| {
        config.agency.enabled = true;
        config.agency.idle_threshold_secs = 60;
        config.agency.prompts = vec!["Hey. You went quiet on me.".to_owned()];
    })
    .await;
    let mut core = face.script_core(|_| "unused".to_owned());
    let body = peer().await;

    face.router
        .handle_datagram("unity connected", addr_of(&body))
        .await;
    assert_eq!(expect_reply(&body).await, ACK);

    let later = Instant::now() + Duration::from_secs(61);
    face.router.tick_agency(later).await;
    assert_eq!(expect_reply(&body).await, "Hey. You went quiet on me.");

    face.router.tick_agency(later).await;
    expect_silence(&body, Duration::from_millis(300)).await;

    assert!(core.drain().is_empty());
    assert!(face.router.history().is_empty());
}

#[tokio::test]
async fn agency_without_a_body_stays_quiet() {
    let mut face = face(|config| {
        config.agency.enabled = true;
        config.agency.idle_threshold_secs = 60;
    })
    .await;
    let mouth = peer().await;

    face.router
        .tick_agency(Instant::now() + Duration::from_secs(61))
        .await;
    expect_silence(&mouth, Duration::from_millis(300)).await;
}

#[cfg(unix)]
#[tokio::test]
async fn failed_run_reenters_as_a_reflex_turn() {
    let mut face = face(|_| {}).await;
    let mut core = face.script_core(|_| "Oops, typo on line 1. Fixing it.".to_owned());
    let mouth = peer().await;

    face.router
        .handle_datagram("!write broken.sh|echo boom >&2; exit 3", addr_of(&mouth))
        .await;
    expect_reply(&mouth).await;

    face.router
        .handle_datagram("!run broken.sh", addr_of(&mouth))
        .await;
    assert_eq!(
        expect_reply(&mouth).await,
        "Oops, typo on line 1. Fixing it."
    );

    let requests = core.drain();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user.contains("SYSTEM_EVENT: I ran 'broken.sh'"));
    assert!(requests[0].user.contains("boom"));
    // Internal turns leave the conversation untouched.
    assert!(face.router.history().is_empty());
    expect_silence(&face.ears, Duration::from_millis(200)).await;
}

#[cfg(unix)]
#[tokio::test]
async fn successful_run_answers_directly() {
    let mut face = face(|_| {}).await;
    let mut core = face.script_core(|_| "unused".to_owned());
    let mouth = peer().await;

    face.router
        .handle_datagram("!write ok.sh|echo all good", addr_of(&mouth))
        .await;
    expect_reply(&mouth).await;

    face.router
        .handle_datagram("!run ok.sh", addr_of(&mouth))
        .await;
    let answer = expect_reply(&mouth).await;
    assert!(answer.starts_with("[OK]"), "{answer}");
    assert!(answer.contains("all good"));
    assert!(core.drain().is_empty());
}

#[tokio::test]
async fn core_events_are_spoken_to_the_body() {
    let mut face = face(|_| {}).await;
    let core_addr = face.core_addr;
    let mut core = face.script_core(|_| "I noticed you changed main.cs.".to_owned());
    let body = peer().await;

    face.router
        .handle_datagram("unity connected", addr_of(&body))
        .await;
    expect_reply(&body).await;

    face.router
        .handle_datagram("[SYSTEM_EVENT: Code Watcher]: main.cs changed", core_addr)
        .await;

    assert_eq!(
        expect_reply(&body).await,
        "I noticed you changed main.cs."
    );
    let requests = core.drain();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].user.starts_with("[SYSTEM_EVENT: Code Watcher]"));
    assert!(face.router.history().is_empty());
}

#[tokio::test]
async fn core_events_without_a_body_are_dropped() {
    let mut face = face(|_| {}).await;
    let core_addr = face.core_addr;
    let mut core = face.script_core(|_| "unused".to_owned());

    face.router
        .handle_datagram("[SYSTEM_EVENT: Code Watcher]: main.cs changed", core_addr)
        .await;
    face.router.handle_datagram("!good", core_addr).await;

    assert!(core.drain().is_empty());
}

#[tokio::test]
async fn spoken_reply_mutes_the_ears_and_signals_audio() {
    let collaborators = Collaborators {
        tts: Box::new(FakeTts),
        ..Collaborators::offline()
    };
    let mut face = face_with(|_| {}, collaborators).await;
    let _core = face.script_core(|_| "*smiles* Good morning to you too.".to_owned());
    let mouth = peer().await;
    let body = peer().await;

    face.router
        .handle_datagram("unity connected", addr_of(&body))
        .await;
    expect_reply(&body).await;

    face.router
        .handle_datagram("good morning", addr_of(&mouth))
        .await;

    let mute = expect_reply(&face.ears).await;
    assert!(mute.starts_with("MUTE "), "{mute}");

    assert_eq!(
        expect_reply(&mouth).await,
        "*smiles* Good morning to you too."
    );
    let signal = expect_reply(&mouth).await;
    assert!(signal.starts_with(AUDIO_PREFIX), "{signal}");
    assert!(signal.ends_with("response.mp3"));
    assert_eq!(expect_reply(&body).await, signal);
}

#[tokio::test]
async fn offline_turn_leaves_nothing_to_reinforce() {
    let mut face = face(|config| config.router.core_timeout_secs = 1).await;
    let answering = Arc::new(AtomicBool::new(true));
    let _core = face.script_core_or_silent({
        let answering = Arc::clone(&answering);
        move |_| {
            answering
                .load(Ordering::SeqCst)
                .then(|| "Paris is the capital.".to_owned())
        }
    });
    let mouth = peer().await;
    let log = face.config.feedback.training_log.clone();

    face.router
        .handle_datagram("capital of france", addr_of(&mouth))
        .await;
    assert_eq!(expect_reply(&mouth).await, "Paris is the capital.");
    assert!(face.router.feedback().is_complete());

    answering.store(false, Ordering::SeqCst);
    face.router
        .handle_datagram("tell me a joke", addr_of(&mouth))
        .await;
    let offline = expect_reply(&mouth).await;
    assert!(offline.starts_with("My brain is offline."), "{offline}");
    assert!(!face.router.feedback().is_complete());

    face.router.handle_datagram("!good", addr_of(&mouth)).await;
    assert_eq!(expect_reply(&mouth).await, NOTHING_TO_REINFORCE);
    assert!(!log.exists());
}

#[tokio::test]
async fn internal_turn_clears_the_pending_exchange() {
    let mut face = face(|_| {}).await;
    let core_addr = face.core_addr;
    let _core = face.script_core(|_| "Noted, all good here.".to_owned());
    let mouth = peer().await;
    let body = peer().await;

    face.router
        .handle_datagram("unity connected", addr_of(&body))
        .await;
    expect_reply(&body).await;

    face.router
        .handle_datagram("how are you", addr_of(&mouth))
        .await;
    expect_reply(&mouth).await;
    assert!(face.router.feedback().is_complete());

    face.router
        .handle_datagram("[SYSTEM_EVENT: Log Watcher]: shader warning", core_addr)
        .await;
    expect_reply(&body).await;

    face.router.handle_datagram("!good", addr_of(&mouth)).await;
    assert_eq!(expect_reply(&mouth).await, NOTHING_TO_REINFORCE);
}

#[tokio::test]
async fn run_loop_serves_packets_checks_in_and_stops_on_cancel() {
    let started = Instant::now();
    let mut face = face(|config| {
        config.router.heartbeat_ms = 100;
        config.agency.enabled = true;
        config.agency.idle_threshold_secs = 1;
        config.agency.prompts = vec!["Still with me?".to_owned()];
    })
    .await;
    let mouth = peer().await;
    let body = peer().await;

    face.router
        .handle_datagram("unity connected", addr_of(&body))
        .await;
    assert_eq!(expect_reply(&body).await, ACK);

    let face_addr = addr_of(face.router.transport());
    let cancel = CancellationToken::new();
    let driver = async {
        mouth
            .send_text("!bad", face_addr)
            .await
            .unwrap();
        let discarded = expect_reply(&mouth).await;

        let check_in = tokio::time::timeout(Duration::from_secs(4), expect_reply(&body))
            .await
            .expect("check-in while idle");
        let fired_after = started.elapsed();

        cancel.cancel();
        (discarded, check_in, fired_after)
    };

    let router = &mut face.router;
    let (served, (discarded, check_in, fired_after)) =
        tokio::join!(router.run(cancel.clone()), driver);

    served.unwrap();
    assert_eq!(discarded, DISCARDED);
    assert_eq!(check_in, "Still with me?");
    assert!(fired_after >= Duration::from_secs(1));
    // Only one check-in per idle period.
    expect_silence(&body, Duration::from_millis(300)).await;
}


#[tokio::test]
async fn packets_arriving_during_the_core_wait_are_discarded() {
    let mut face = face(|_| {}).await;
    let _core = face.script_core(|_| "Here I am.".to_owned());
    let mouth = peer().await;
    let body = peer().await;
    let face_addr = addr_of(face.router.transport());

    // Queued before the turn starts, so it is read while waiting for the Core.
    body.send_text("unity connected", face_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    face.router.handle_datagram("hello?", addr_of(&mouth)).await;

    assert_eq!(expect_reply(&mouth).await, "Here I am.");
    assert_eq!(face.router.body_addr(), None);
    expect_silence(&body, Duration::from_millis(200)).await;
}
