//! The Face: dialogue router between the user-facing processes and the
//! Logic Core.
//!
//! One [`Router`] owns the socket and all conversational state. Each inbound
//! datagram is classified (first match wins):
//!
//! 1. Body announcement: remember the sender as the Body, answer `ACK`.
//! 2. `!good` / `!bad`: reinforce or discard the last exchange.
//! 3. `!read` / `!write` / `!run`: sandbox tools, answered directly. A failed
//!    `!run` re-enters as an internal reflex turn instead.
//! 4. Packets from the Core address: system events spoken to the Body.
//! 5. Everything else: an ordinary turn.
//!
//! A turn is enriched, sent to the Core, post-processed and delivered. Only
//! user turns the Core answered are recorded in history, feedback state and
//! long-term memory; every other turn clears the feedback state. Only user
//! turns are voiced.

pub mod agency;
pub mod context;
pub mod feedback;
pub mod history;
pub mod reply;
pub mod voice;

use crate::config::{LilithConfig, RouterConfig};
use crate::error::Result;
use crate::memory::{self, LongTermMemory, MemoryMetadata};
use crate::protocol::{self, ACK, Inbound};
use crate::sandbox::Sandbox;
use crate::search::{self, WebSearch};
use crate::transport::{Transport, truncate_chars};
use crate::tts::{self, SpeechSynth};
use crate::vision::{self, Vision};
use agency::AgencyTimer;
use context::EnrichLimits;
use feedback::{FeedbackState, TrainingLog};
use history::History;
use reply::Correction;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Optional collaborators, each with a neutral stand-in.
pub struct Collaborators {
    pub memory: Box<dyn LongTermMemory>,
    pub search: Box<dyn WebSearch>,
    pub vision: Box<dyn Vision>,
    pub tts: Box<dyn SpeechSynth>,
}

impl Collaborators {
    /// Real implementations where configured and available.
    pub fn from_config(config: &LilithConfig) -> Self {
        Self {
            memory: memory::from_config(&config.memory),
            search: search::from_config(&config.search),
            vision: vision::from_config(&config.vision),
            tts: tts::from_config(&config.tts),
        }
    }

    /// No memory, no search, blind and silent.
    pub fn offline() -> Self {
        Self {
            memory: Box::new(memory::NoMemory),
            search: Box::new(search::NoSearch),
            vision: Box::new(vision::Blind),
            tts: Box::new(tts::SilentTts),
        }
    }
}

/// Where a turn came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOrigin {
    /// Someone talking to the agent.
    User,
    /// `[SYSTEM_EVENT ...]` text or an unsolicited Core packet.
    SystemEvent,
    /// The agent reacting to its own failed `!run`.
    Reflex,
    /// A proactive check-in after silence.
    Agency,
}

impl TurnOrigin {
    pub fn is_internal(self) -> bool {
        self != Self::User
    }
}

/// A message headed for context assembly and the Core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub text: String,
    pub origin: TurnOrigin,
    pub reply_to: SocketAddr,
}

/// Outcome of one classification step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Fully handled; nothing more to do.
    Done,
    /// Classify this internal input again as a fresh turn.
    Reenter { input: String, reply_to: SocketAddr },
    /// Run the full turn pipeline.
    Turn(Turn),
}

pub struct Router {
    transport: Transport,
    settings: RouterConfig,
    core_addr: SocketAddr,
    ears_addr: SocketAddr,
    body_addr: Option<SocketAddr>,
    history: History,
    feedback: FeedbackState,
    training_log: TrainingLog,
    agency: AgencyTimer,
    sandbox: Sandbox,
    max_read_chars: usize,
    limits: EnrichLimits,
    audio_path: PathBuf,
    collaborators: Collaborators,
}

impl Router {
    /// Build a router around an already bound transport.
    ///
    /// # Errors
    ///
    /// Fails when the sandbox root cannot be prepared.
    pub fn new(
        config: &LilithConfig,
        transport: Transport,
        collaborators: Collaborators,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            settings: config.router.clone(),
            core_addr: config.network.core_addr,
            ears_addr: config.network.ears_addr,
            body_addr: None,
            history: History::new(config.router.history_exchanges),
            feedback: FeedbackState::default(),
            training_log: TrainingLog::new(&config.feedback.training_log),
            agency: AgencyTimer::new(&config.agency, Instant::now()),
            sandbox: Sandbox::new(&config.sandbox)?,
            max_read_chars: config.sandbox.max_read_chars,
            limits: EnrichLimits {
                recall: config.memory.recall_limit,
                search_results: config.search.max_results,
            },
            audio_path: config.tts.output_path.clone(),
            collaborators,
        })
    }

    /// Bind `config.network.face_addr` and build the router.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound or the sandbox is unusable.
    pub async fn bind(config: &LilithConfig, collaborators: Collaborators) -> Result<Self> {
        let transport =
            Transport::bind(config.network.face_addr, config.router.heartbeat()).await?;
        Self::new(config, transport, collaborators)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn body_addr(&self) -> Option<SocketAddr> {
        self.body_addr
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn feedback(&self) -> &FeedbackState {
        &self.feedback
    }

    /// Serve until `cancel` fires. One datagram and one agency check per
    /// cycle; errors are logged and the loop carries on.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            addr = %self.transport.local_addr()?,
            core = %self.core_addr,
            "face listening"
        );
        loop {
            let received = tokio::select! {
                () = cancel.cancelled() => break,
                received = self.transport.recv() => received,
            };
            match received {
                Ok(Some((text, from))) => self.handle_datagram(&text, from).await,
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "receive failed"),
            }
            self.tick_agency(Instant::now()).await;
        }
        tracing::info!("face shutting down");
        Ok(())
    }

    /// Classify and fully process one inbound datagram.
    pub async fn handle_datagram(&mut self, text: &str, from: SocketAddr) {
        let mut dispatch = self.classify(text, from).await;
        loop {
            match dispatch {
                Dispatch::Done => return,
                Dispatch::Reenter { input, reply_to } => {
                    tracing::info!("reflex: reacting to tool failure");
                    dispatch = Dispatch::Turn(Turn {
                        text: input,
                        origin: TurnOrigin::Reflex,
                        reply_to,
                    });
                }
                Dispatch::Turn(turn) => {
                    self.process_turn(turn).await;
                    return;
                }
            }
        }
    }

    /// Fire a proactive check-in when the idle threshold has passed.
    pub async fn tick_agency(&mut self, now: Instant) {
        let Some(prompt) = self.agency.poll(now) else {
            return;
        };
        let Some(body) = self.body_addr else {
            tracing::warn!("check-in due but no body connected");
            return;
        };
        tracing::info!(prompt = %prompt, "proactive check-in");
        self.process_turn(Turn {
            text: prompt,
            origin: TurnOrigin::Agency,
            reply_to: body,
        })
        .await;
    }

    async fn classify(&mut self, text: &str, from: SocketAddr) -> Dispatch {
        let from_core = from == self.core_addr;
        let inbound = protocol::parse_inbound(text);

        if inbound == Inbound::BodyAnnouncement {
            if from_core {
                tracing::warn!("ignoring body announcement from the core address");
                return Dispatch::Done;
            }
            tracing::info!(peer = %from, "body connected");
            self.body_addr = Some(from);
            self.send(ACK, from).await;
            return Dispatch::Done;
        }

        // Never answer the Core itself.
        let reply_to = if from_core {
            match self.body_addr {
                Some(body) => body,
                None => {
                    tracing::warn!(text = %text.trim(), "core event dropped: no body connected");
                    return Dispatch::Done;
                }
            }
        } else {
            from
        };

        match inbound {
            Inbound::BodyAnnouncement => Dispatch::Done,
            Inbound::Feedback(verdict) => {
                let answer = feedback::apply(verdict, &mut self.feedback, &self.training_log);
                self.send(&answer, reply_to).await;
                Dispatch::Done
            }
            Inbound::Read(path) => {
                tracing::info!(path = %path, "hands: read");
                let answer = match self.sandbox.read(&path) {
                    Ok(content) if content.chars().count() > self.max_read_chars => format!(
                        "[FILE CONTENT]:\n{}...",
                        truncate_chars(&content, self.max_read_chars)
                    ),
                    Ok(content) => content,
                    Err(e) => format!("[ERR] {e}"),
                };
                self.send(&answer, reply_to).await;
                Dispatch::Done
            }
            Inbound::Write { path, content } => {
                tracing::info!(path = %path, "hands: write");
                let answer = match self.sandbox.write(&path, &content) {
                    Ok(status) => status,
                    Err(e) => format!("[ERR] {e}"),
                };
                self.send(&answer, reply_to).await;
                Dispatch::Done
            }
            Inbound::MalformedWrite => {
                self.send("[ERR] Usage: !write filename|content", reply_to)
                    .await;
                Dispatch::Done
            }
            Inbound::Run(path) => {
                tracing::info!(path = %path, "hands: run");
                match self.sandbox.run(&path).await {
                    Ok(outcome) if outcome.success => {
                        self.send(&outcome.text, reply_to).await;
                        Dispatch::Done
                    }
                    Ok(outcome) => Dispatch::Reenter {
                        input: reflex_prompt(&path, &outcome.text),
                        reply_to,
                    },
                    Err(e) => {
                        self.send(&format!("[ERR] {e}"), reply_to).await;
                        Dispatch::Done
                    }
                }
            }
            Inbound::SystemEvent(text) => Dispatch::Turn(Turn {
                text,
                origin: TurnOrigin::SystemEvent,
                reply_to,
            }),
            Inbound::Chat(text) => Dispatch::Turn(Turn {
                text,
                origin: if from_core {
                    TurnOrigin::SystemEvent
                } else {
                    TurnOrigin::User
                },
                reply_to,
            }),
        }
    }

    async fn process_turn(&mut self, turn: Turn) {
        tracing::info!(origin = ?turn.origin, peer = %turn.reply_to, "turn");

        let reply = if turn.origin == TurnOrigin::Agency {
            reply::postprocess(&turn.text, "", self.settings.min_reply_chars)
        } else {
            let context =
                context::gather(&turn.text, &self.settings, &self.collaborators, self.limits).await;
            let request = context::build_request(
                &self.settings.system_prompt,
                &self.history,
                &context,
                &turn.text,
            );
            let raw = self.ask_core(&request).await;
            reply::postprocess(&raw, &turn.text, self.settings.min_reply_chars)
        };
        if let Some(correction) = reply.correction {
            tracing::debug!(?correction, "reply corrected");
        }

        self.agency.touch(Instant::now());

        let remembered = turn.origin == TurnOrigin::User
            && reply.correction != Some(Correction::CoreOffline);
        if remembered {
            self.history.push_exchange(&turn.text, &reply.text);
            self.feedback.record(&turn.text, &reply.text);
            let exchange = format!("User: {}\nSYNZ: {}", turn.text, reply.text);
            if let Err(e) = self
                .collaborators
                .memory
                .remember(&exchange, MemoryMetadata::now("conversation"))
            {
                tracing::warn!(error = %e, "memory write failed");
            }
        } else {
            // An older pair must not be reinforced after this turn.
            self.feedback.clear();
        }

        let audio = if !turn.origin.is_internal() {
            voice::speak(
                &reply.text,
                self.collaborators.tts.as_ref(),
                &self.transport,
                self.ears_addr,
                &self.audio_path,
            )
            .await
        } else {
            tracing::debug!("internal turn, voice muted");
            None
        };

        self.send(&reply.text, turn.reply_to).await;
        if let Some(path) = audio {
            let signal = protocol::audio_signal(&path);
            self.send(&signal, turn.reply_to).await;
            if let Some(body) = self.body_addr
                && body != turn.reply_to
            {
                self.send(&signal, body).await;
            }
        }
    }

    /// Send a request and wait for the Core's answer under the extended
    /// timeout. Packets from anyone else are discarded meanwhile. Failures
    /// come back as `<ERROR: ...>` text.
    async fn ask_core(&mut self, request: &protocol::CoreRequest) -> String {
        let core = self.core_addr;
        let timeout = self.settings.core_timeout();
        let transport = self.transport.extend_timeout(timeout);

        if let Err(e) = transport.send_text(&request.to_wire(), core).await {
            return format!("<ERROR: {e}>");
        }
        let deadline = tokio::time::Instant::now() + transport.read_timeout();
        loop {
            match transport.recv_until(deadline).await {
                Ok(Some((text, from))) if from == core => return text,
                Ok(Some((dropped, from))) => {
                    tracing::warn!(
                        peer = %from,
                        text = %truncate_chars(dropped.trim(), 120),
                        "discarding packet while waiting for the core"
                    );
                }
                Ok(None) if tokio::time::Instant::now() >= deadline => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "core timed out");
                    return "<ERROR: Logic Brain Timed Out>".to_owned();
                }
                Ok(None) => {}
                Err(e) => return format!("<ERROR: {e}>"),
            }
        }
    }

    async fn send(&self, text: &str, to: SocketAddr) {
        if let Err(e) = self.transport.send_text(text, to).await {
            tracing::warn!(peer = %to, error = %e, "send failed");
        }
    }
}

/// Internal prompt asking the agent to explain and fix a failed run.
pub fn reflex_prompt(file: &str, output: &str) -> String {
    format!(
        "SYSTEM_EVENT: I ran '{file}' but it failed with this output:\n{output}\n\n\
         TASK: Explain the error simply to the user (like a teacher) and immediately use !write to fix it."
    )
}
