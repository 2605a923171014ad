//! The Logic Core: answers Face requests with a language model, watches
//! source files for changes worth a review and tails the editor log for new
//! errors.
//!
//! One request per datagram. The payload is the JSON envelope produced by
//! the Face or, for older clients, a bare prompt. The reply goes back to the
//! sender; failures are reported as `<ERROR: ...>` so the Face can fall back.

pub mod backend;
pub mod log_watcher;
pub mod watcher;

use crate::config::LilithConfig;
use crate::error::Result;
use crate::protocol::CoreRequest;
use crate::transport::Transport;
use backend::CoreBackend;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use log_watcher::{LogWatcher, error_event, error_prompt};
use tokio_util::sync::CancellationToken;
use watcher::{CodeWatcher, review_event, review_prompt};

pub struct LogicCore {
    transport: Transport,
    backend: Box<dyn CoreBackend>,
    face_addr: SocketAddr,
    watcher: Option<CodeWatcher>,
    log_watcher: Option<LogWatcher>,
    watch_interval: Duration,
    last_scan: Option<Instant>,
}

impl LogicCore {
    pub fn new(
        config: &LilithConfig,
        transport: Transport,
        backend: Box<dyn CoreBackend>,
    ) -> Self {
        let watcher = config.core.watch_dir.as_ref().map(|dir| {
            tracing::info!(dir = %dir.display(), "code watcher enabled");
            CodeWatcher::new(dir, &config.core.watch_extensions)
        });
        let log_watcher = config.core.watch_log.as_ref().map(|log| {
            tracing::info!(log = %log.display(), "log watcher enabled");
            LogWatcher::new(log, &config.core.log_keywords)
        });
        Self {
            transport,
            backend,
            face_addr: config.network.face_addr,
            watcher,
            log_watcher,
            watch_interval: Duration::from_millis(config.core.watch_interval_ms),
            last_scan: None,
        }
    }

    /// Bind `config.network.core_addr`.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound.
    pub async fn bind(config: &LilithConfig, backend: Box<dyn CoreBackend>) -> Result<Self> {
        let heartbeat = Duration::from_millis(config.core.watch_interval_ms.clamp(100, 1000));
        let transport = Transport::bind(config.network.core_addr, heartbeat).await?;
        Ok(Self::new(config, transport, backend))
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Serve until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(addr = %self.transport.local_addr()?, "logic core listening");
        loop {
            let received = tokio::select! {
                () = cancel.cancelled() => break,
                received = self.transport.recv() => received,
            };
            match received {
                Ok(Some((payload, from))) => self.answer(&payload, from).await,
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "receive failed"),
            }
            self.watch_tick(Instant::now()).await;
        }
        tracing::info!("logic core shutting down");
        Ok(())
    }

    /// Answer one request datagram.
    pub async fn answer(&self, payload: &str, from: SocketAddr) {
        let request = CoreRequest::parse_wire(payload);
        tracing::info!(
            peer = %from,
            history = request.history.len(),
            structured = !request.system.is_empty(),
            "request"
        );
        let reply = match self.backend.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "model call failed");
                format!("<ERROR: {e}>")
            }
        };
        if let Err(e) = self.transport.send_text(&reply, from).await {
            tracing::warn!(peer = %from, error = %e, "reply not sent");
        }
    }

    /// When the interval has passed, review changed sources and react to
    /// new log errors, forwarding each answer to the Face.
    pub async fn watch_tick(&mut self, now: Instant) {
        if self.watcher.is_none() && self.log_watcher.is_none() {
            return;
        }
        if self
            .last_scan
            .is_some_and(|last| now.saturating_duration_since(last) < self.watch_interval)
        {
            return;
        }
        self.last_scan = Some(now);

        self.review_changed_code().await;
        self.react_to_log_errors().await;
    }

    async fn review_changed_code(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        let changed = watcher.scan();
        if changed.is_empty() {
            return;
        }
        for (path, _) in &changed {
            tracing::info!(path = %path.display(), "code changed");
        }
        let code = changed
            .iter()
            .map(|(_, code)| code.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        self.forward(&review_prompt(&code), review_event, "code review")
            .await;
    }

    async fn react_to_log_errors(&mut self) {
        let Some(fresh) = self.log_watcher.as_mut().and_then(LogWatcher::poll) else {
            return;
        };
        tracing::info!(bytes = fresh.len(), "error in editor log");
        self.forward(&error_prompt(&fresh), error_event, "log reaction")
            .await;
    }

    /// Ask the model and send its answer to the Face as an event.
    async fn forward(&self, prompt: &str, event: fn(&str) -> String, what: &str) {
        let request = CoreRequest {
            system: String::new(),
            history: Vec::new(),
            user: prompt.to_owned(),
        };
        match self.backend.complete(&request).await {
            Ok(answer) => {
                if let Err(e) = self.transport.send_text(&event(&answer), self.face_addr).await {
                    tracing::warn!(error = %e, what, "event not delivered");
                }
            }
            Err(e) => tracing::warn!(error = %e, what, "model call failed"),
        }
    }
}
