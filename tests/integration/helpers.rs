//! Shared helpers for integration tests: a throwaway Face wired to loopback
//! peers and a scripted Core.

use async_trait::async_trait;
use lilith::protocol::CoreRequest;
use lilith::tts::SpeechSynth;
use lilith::{Collaborators, LilithConfig, Router, Transport};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long a peer waits for an expected reply.
pub(crate) const REPLY_WAIT: Duration = Duration::from_secs(5);

pub(crate) fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().expect("loopback address")
}

/// A loopback socket standing in for the Mouth, the Body or the Ears.
pub(crate) async fn peer() -> Transport {
    Transport::bind(loopback(), REPLY_WAIT)
        .await
        .expect("bind peer")
}

pub(crate) fn addr_of(transport: &Transport) -> SocketAddr {
    transport.local_addr().expect("local addr")
}

/// Next datagram text, failing the test when nothing arrives.
pub(crate) async fn expect_reply(transport: &Transport) -> String {
    let (text, _) = transport
        .recv()
        .await
        .expect("receive")
        .expect("reply within the wait window");
    text
}

/// Assert that nothing arrives within `window`.
pub(crate) async fn expect_silence(transport: &Transport, window: Duration) {
    let deadline = tokio::time::Instant::now() + window;
    let received = transport.recv_until(deadline).await.expect("receive");
    assert!(received.is_none(), "unexpected datagram: {received:?}");
}

/// A Face router built around loopback sockets and a temp directory.
pub(crate) struct TestFace {
    pub router: Router,
    /// The Core's socket; take it to script the Core or leave it silent.
    pub core: Option<Transport>,
    pub core_addr: SocketAddr,
    pub ears: Transport,
    pub config: LilithConfig,
    pub dir: tempfile::TempDir,
}

/// Config pointing every path into `dir` with all collaborators off.
pub(crate) fn test_config(dir: &Path) -> LilithConfig {
    let mut config = LilithConfig::default();
    config.router.core_timeout_secs = 3;
    config.router.history_exchanges = 10;
    config.agency.enabled = false;
    config.feedback.training_log = dir.join("data").join("training_data.txt");
    config.sandbox.root = dir.join("sandbox");
    config.sandbox.run_timeout_secs = 5;
    config.memory.enabled = false;
    config.memory.root_dir = dir.join("memory");
    config.search.enabled = false;
    config.vision.enabled = false;
    config.tts.enabled = false;
    config.tts.output_path = dir.join("data").join("response.mp3");
    config.logging.file_enabled = false;
    config
}

/// Build a Face with offline collaborators.
pub(crate) async fn face(tweak: impl FnOnce(&mut LilithConfig)) -> TestFace {
    face_with(tweak, Collaborators::offline()).await
}

pub(crate) async fn face_with(
    tweak: impl FnOnce(&mut LilithConfig),
    collaborators: Collaborators,
) -> TestFace {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir_all(dir.path().join("sandbox")).expect("sandbox dir");

    let core = peer().await;
    let ears = peer().await;
    let mut config = test_config(dir.path());
    config.network.core_addr = addr_of(&core);
    config.network.ears_addr = addr_of(&ears);
    tweak(&mut config);

    let transport = Transport::bind(loopback(), config.router.heartbeat())
        .await
        .expect("bind face");
    config.network.face_addr = addr_of(&transport);
    config.validate().expect("valid test config");

    let router = Router::new(&config, transport, collaborators).expect("router");
    TestFace {
        router,
        core_addr: addr_of(&core),
        core: Some(core),
        ears,
        config,
        dir,
    }
}

impl TestFace {
    /// Start a scripted Core on this face's Core socket.
    pub(crate) fn script_core<F>(&mut self, answer: F) -> ScriptedCore
    where
        F: Fn(&CoreRequest) -> String + Send + 'static,
    {
        self.script_core_or_silent(move |request| Some(answer(request)))
    }

    /// Like [`script_core`](Self::script_core); `None` leaves a request
    /// unanswered.
    pub(crate) fn script_core_or_silent<F>(&mut self, answer: F) -> ScriptedCore
    where
        F: Fn(&CoreRequest) -> Option<String> + Send + 'static,
    {
        let core = self.core.take().expect("core socket still available");
        ScriptedCore::spawn(core, answer)
    }
}

/// A fake Logic Core answering each request with `answer(request)`, if any.
pub(crate) struct ScriptedCore {
    pub requests: mpsc::UnboundedReceiver<CoreRequest>,
    task: JoinHandle<()>,
}

impl ScriptedCore {
    fn spawn<F>(core: Transport, answer: F) -> Self
    where
        F: Fn(&CoreRequest) -> Option<String> + Send + 'static,
    {
        let (tx, requests) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            loop {
                match core.recv().await {
                    Ok(Some((payload, from))) => {
                        let request = CoreRequest::parse_wire(&payload);
                        let reply = answer(&request);
                        let _ = tx.send(request);
                        if let Some(reply) = reply
                            && core.send_text(&reply, from).await.is_err()
                        {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(_) => break,
                }
            }
        });
        Self { requests, task }
    }

    /// Requests received so far.
    pub(crate) fn drain(&mut self) -> Vec<CoreRequest> {
        let mut out = Vec::new();
        while let Ok(request) = self.requests.try_recv() {
            out.push(request);
        }
        out
    }
}

impl Drop for ScriptedCore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Speech synthesizer that writes a fixed payload to the output path.
pub(crate) struct FakeTts;

#[async_trait]
impl SpeechSynth for FakeTts {
    async fn synthesize(&self, _text: &str, output: &Path) -> bool {
        std::fs::write(output, b"ID3fake-mp3").is_ok()
    }
}
